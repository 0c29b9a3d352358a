//! Network services for desktop builds.
//!
//! - `mqtt` feature: event bus client on `rumqttc`
//!
//! On ESP32 the equivalent client lives in `hal::esp32` because it is built
//! on the ESP-IDF MQTT stack.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
