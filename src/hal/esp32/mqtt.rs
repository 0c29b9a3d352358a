//! MQTT client on the ESP-IDF MQTT stack.
//!
//! The ESP-IDF client reconnects by itself, waiting the configured retry
//! interval between attempts, so [`MqttClient::reconnect`] is a no-op here.
//! Connection state is tracked from the event stream, which a background
//! thread drains into a channel for `try_recv`.

use crate::config::MqttConfig;
use crate::traits::{MqttClient, MqttMessage};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Error type for ESP32 MQTT operations.
#[derive(Debug, Error)]
#[error("MQTT error: {0}")]
pub struct Esp32MqttError(pub String);

/// MQTT client implementing [`MqttClient`].
pub struct Esp32Mqtt {
    client: EspMqttClient<'static>,
    messages: Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Create the client. Connecting happens in the background, retried
    /// every `retry_ms` while the broker is unreachable.
    pub fn new(config: &MqttConfig, client_id: &str, retry_ms: u64) -> anyhow::Result<Self> {
        let broker_url = format!("mqtt://{}:{}", config.host.as_str(), config.port);

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id),
            username: config.has_auth().then(|| config.username.as_str()),
            password: config.has_auth().then(|| config.password.as_str()),
            keep_alive_interval: Some(Duration::from_secs(config.keep_alive_secs as u64)),
            reconnect_timeout: Some(Duration::from_millis(retry_ms)),
            ..Default::default()
        };

        let (tx, messages) = channel();
        let connected = Arc::new(AtomicBool::new(false));

        let (client, mut connection) = EspMqttClient::new(&broker_url, &mqtt_config)?;

        let flag = connected.clone();
        thread::Builder::new()
            .name("mqtt-events".into())
            .stack_size(6 * 1024)
            .spawn(move || pump_events(&mut connection, tx, flag))?;

        tracing::info!(broker = %broker_url, client_id, retry_ms, "MQTT client started");

        Ok(Self {
            client,
            messages,
            connected,
        })
    }
}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        match self.messages.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connected.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn pump_events(
    connection: &mut EspMqttConnection,
    tx: Sender<MqttMessage>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match connection.next() {
            // The stream only errors once the client is gone
            Err(e) => {
                tracing::info!(error = ?e, "MQTT connection closed");
                connected.store(false, Ordering::Relaxed);
                return;
            }
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    tracing::info!("MQTT connected");
                    connected.store(true, Ordering::Relaxed);
                }
                EventPayload::Disconnected => {
                    tracing::warn!("MQTT disconnected");
                    connected.store(false, Ordering::Relaxed);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    if tx.send(MqttMessage::new(topic, data)).is_err() {
                        return;
                    }
                }
                _ => {}
            },
        }
    }
}
