//! Desktop MQTT client on `rumqttc`.
//!
//! Uses the blocking `rumqttc::Client`. A background thread drives the
//! connection, tracks connect/disconnect, and forwards incoming publishes to
//! a channel so [`MqttClient::try_recv`] never blocks. `rumqttc` reconnects
//! on its own when the connection is polled again after an error; the event
//! thread waits [`MqttRuntimeConfig::retry_ms`] between those attempts, so
//! [`MqttClient::reconnect`] has nothing to do.
//!
//! ```ignore
//! use rfid_warden::bus::EventBus;
//! use rfid_warden::services::{MqttRuntimeConfig, RumqttClient};
//!
//! let runtime = MqttRuntimeConfig::from_config(&config.mqtt, "sim")
//!     .with_retry_ms(config.timing.bus_retry_ms);
//! let client = RumqttClient::connect(runtime)?;
//! let bus = EventBus::new(client, config.topics.clone(), config.timing.bus_retry_ms);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use thiserror::Error;

use crate::config::MqttConfig;
use crate::traits::{MqttClient, MqttMessage};

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// Uses owned `String`s; build one from [`crate::config::MqttConfig`] with
/// [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Optional username and password
    pub credentials: Option<(String, String)>,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Pause after a connection error before reconnecting, in milliseconds
    pub retry_ms: u64,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "esp32-rfid-desktop".to_string(),
            credentials: None,
            keep_alive_secs: 30,
            retry_ms: 2_000,
        }
    }
}

impl MqttRuntimeConfig {
    /// Create from the shared config and a device id.
    pub fn from_config(config: &MqttConfig, device_id: &str) -> Self {
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id(device_id).as_str().to_string(),
            credentials: config.has_auth().then(|| {
                (
                    config.username.as_str().to_string(),
                    config.password.as_str().to_string(),
                )
            }),
            keep_alive_secs: config.keep_alive_secs,
            ..Self::default()
        }
    }

    /// Set the reconnect interval (usually `timing.bus_retry_ms`).
    pub fn with_retry_ms(mut self, ms: u64) -> Self {
        self.retry_ms = ms;
        self
    }

    /// Pause between reconnect attempts.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(5) as u64));
        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user, pass);
        }
        options
    }
}

// ============================================================================
// Client
// ============================================================================

/// MQTT errors.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Publish rejected by the client (queue full or closed)
    #[error("publish failed: {0}")]
    Publish(String),
    /// Subscribe rejected by the client
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    /// Event thread could not be started
    #[error("event thread: {0}")]
    Spawn(String),
}

/// [`MqttClient`] backed by `rumqttc`.
pub struct RumqttClient {
    client: Client,
    messages: Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
}

impl RumqttClient {
    /// Start the client and its event thread. Returns immediately; the
    /// connection comes up in the background.
    pub fn connect(config: MqttRuntimeConfig) -> Result<Self, MqttError> {
        let (client, connection) = Client::new(config.options(), 16);
        let (tx, messages) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&connected);
        let backoff = config.retry_backoff();
        thread::Builder::new()
            .name("mqtt-events".into())
            .spawn(move || pump_events(connection, tx, flag, backoff))
            .map_err(|e| MqttError::Spawn(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            retry_ms = config.retry_ms,
            "MQTT client started"
        );

        Ok(Self {
            client,
            messages,
            connected,
        })
    }
}

impl MqttClient for RumqttClient {
    type Error = MqttError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MqttError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| MqttError::Subscribe(e.to_string()))
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

    fn reconnect(&mut self) -> Result<(), MqttError> {
        Ok(())
    }
}

fn pump_events(
    mut connection: Connection,
    tx: Sender<MqttMessage>,
    connected: Arc<AtomicBool>,
    backoff: Duration,
) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("MQTT connected");
                connected.store(true, Ordering::Relaxed);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = MqttMessage::new(publish.topic, publish.payload.to_vec());
                if tx.send(msg).is_err() {
                    return;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(e) => {
                if connected.swap(false, Ordering::Relaxed) {
                    tracing::warn!(error = %e, "MQTT connection lost");
                } else {
                    tracing::debug!(error = %e, "MQTT connect failed");
                }
                thread::sleep(backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;

    #[test]
    fn runtime_config_from_shared() {
        let shared = MqttConfig::default()
            .with_host("broker.lan")
            .with_port(5653)
            .with_auth("station", "pw");
        let config = MqttRuntimeConfig::from_config(&shared, "a1b2c3");
        assert_eq!(config.host, "broker.lan");
        assert_eq!(config.port, 5653);
        assert_eq!(config.client_id, "esp32-rfid-a1b2c3");
        assert_eq!(
            config.credentials,
            Some(("station".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn runtime_config_without_auth() {
        let config = MqttRuntimeConfig::from_config(&MqttConfig::default(), "x");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn retry_interval_follows_timing_config() {
        let timing = TimingConfig::default().with_bus_retry_ms(4_500);
        let config = MqttRuntimeConfig::from_config(&MqttConfig::default(), "x")
            .with_retry_ms(timing.bus_retry_ms);
        assert_eq!(config.retry_backoff(), Duration::from_millis(4_500));

        let default = MqttRuntimeConfig::from_config(&MqttConfig::default(), "x");
        assert_eq!(default.retry_ms, TimingConfig::default().bus_retry_ms);
    }
}
