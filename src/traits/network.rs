//! Network abstraction trait for the MQTT event bus.
//!
//! The station reports access and enrollment events to a backend over MQTT
//! and listens on one broadcast topic for a shared token.
//!
//! ```text
//! microlab/random     <- shared token (inbound, cached)
//! db/append/userlog   -> ["<UID>","now","<token>"]
//! db/append/users     -> ["<UID>","now","<group>","#RRGGBB"]
//! ```
//!
//! The trait is small enough that the controller runs against
//! [`MockMqtt`](crate::hal::MockMqtt) in tests, ESP-IDF on the device, and
//! `rumqttc` on desktop.

use alloc::string::String;
use alloc::vec::Vec;

/// MQTT client trait for pub/sub messaging.
///
/// This trait uses a **sync-first design** that works on both ESP32 (blocking I/O)
/// and desktop (a background thread drives the connection).
///
/// # Implementation Notes
///
/// - `publish` and `subscribe` must not block for long; fire-and-forget is fine
/// - `try_recv` is non-blocking for polling patterns
/// - `reconnect` is called by the event bus at a bounded rate while
///   `is_connected` is false; clients that reconnect on their own may treat
///   it as a no-op
///
/// # Example
///
/// ```rust,ignore
/// use rfid_warden::traits::MqttClient;
///
/// fn announce<M: MqttClient>(client: &mut M) {
///     client.publish("station/online", b"1", true).ok();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    ///
    /// Returns `None` if no message is available. This should never block.
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;

    /// Start a connection attempt if not connected.
    fn reconnect(&mut self) -> Result<(), Self::Error>;
}

/// Client type for builds without any network stack.
///
/// Uninhabited; use it as `Option<NoClient>`, which is always `None`.
#[derive(Debug)]
pub enum NoClient {}

impl MqttClient for NoClient {
    type Error = core::convert::Infallible;

    fn publish(&mut self, _topic: &str, _payload: &[u8], _retain: bool) -> Result<(), Self::Error> {
        match *self {}
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), Self::Error> {
        match *self {}
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        match *self {}
    }

    fn is_connected(&self) -> bool {
        match *self {}
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }
}

/// No client at all: permanently offline.
///
/// Lets a station without network support run the same
/// [`EventBus`](crate::bus::EventBus) code path; every event is dropped.
impl<C: MqttClient> MqttClient for Option<C> {
    type Error = C::Error;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        match self {
            Some(client) => client.publish(topic, payload, retain),
            None => Ok(()),
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        match self {
            Some(client) => client.subscribe(topic),
            None => Ok(()),
        }
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        self.as_mut().and_then(MqttClient::try_recv)
    }

    fn is_connected(&self) -> bool {
        self.as_ref().is_some_and(MqttClient::is_connected)
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        match self {
            Some(client) => client.reconnect(),
            None => Ok(()),
        }
    }
}

/// An MQTT message received from a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}
