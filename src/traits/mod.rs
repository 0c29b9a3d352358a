//! Trait definitions for hardware, storage, and network collaborators.
//!
//! The controller core never talks to a driver directly. Everything it needs
//! from the outside world goes through one of these traits, which lets the
//! same state machine run on ESP32, on a desktop simulator, and in tests.
//!
//! # Submodules
//!
//! - `hardware`: card reader, buttons, indicator, operator console, clock, restart
//! - `storage`: durable key-value store for the registry
//! - `network`: MQTT client for the event bus

pub mod hardware;
pub mod network;
pub mod storage;

pub use hardware::*;
pub use network::*;
pub use storage::*;
