//! # rfid-warden
//!
//! Access-control firmware for a single RFID reader station: one admin
//! card, interactively enrolled user cards, and access events reported over
//! MQTT.
//!
//! ## Features
//!
//! - **Mode state machine**: FIRST_BOOT, SLEEP, IDLE, WAITING, ADMIN with
//!   timeouts and a factory-reset override
//! - **Debounced buttons** and **same-card cooldown** on the reader
//! - **Durable registry** of the admin card and enrolled users that survives
//!   corrupted storage
//! - **Interactive enrollment** over a line console
//! - **Event bus** adapter with rate-limited reconnect and a cached shared token
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, storage, and network abstractions
//! - `machine` - Pure transition function returning effects as data
//! - `controller` - Poll loop that gathers inputs and executes effects
//! - `registry` - Admin and user records, written through to storage
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rfid_warden::{
//!     bus::EventBus,
//!     controller::{AccessController, Station},
//!     hal::*,
//!     Config, Mode, Registry, Uid,
//! };
//!
//! let config = Config::default();
//! let registry = Registry::load(MockStore::new());
//! let bus = EventBus::new(MockMqtt::new(), config.topics.clone(), config.timing.bus_retry_ms);
//! let mut controller = AccessController::new(registry, bus, config.timing.clone(), 0);
//!
//! let mut station = Station {
//!     reader: MockReader::new(),
//!     admin_button: MockButton::new(),
//!     reset_button: MockButton::new(),
//!     indicator: MockIndicator::new(),
//!     console: MockConsole::new(),
//!     system: MockSystem::new(),
//!     clock: MockClock::new(),
//! };
//!
//! // First card ever seen becomes the admin card
//! station.reader.present(Uid::from_hex("A1B2").unwrap());
//! controller.poll(&mut station);
//! assert_eq!(controller.mode(), Mode::Sleep);
//!
//! // Call poll from your main loop
//! station.clock.advance(10);
//! controller.poll(&mut station);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Event bus adapter: topics, reconnect policy, token cache feed.
pub mod bus;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Poll loop: input gathering, effect execution, indicator.
pub mod controller;
/// Card UIDs and RGB colors as validated types.
pub mod credential;
/// Button debouncing.
pub mod debounce;
/// Same-card read cooldown.
pub mod dedup;
/// Interactive enrollment dialogue.
pub mod enrollment;
/// All error types in one place.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Mode transition function.
pub mod machine;
/// Outbound event payloads.
pub mod messages;
/// Operating modes.
pub mod mode;
/// Durable admin and user registry.
pub mod registry;
/// Desktop network services.
#[cfg(feature = "std")]
pub mod services;
/// Core traits for hardware, storage, and network abstraction.
pub mod traits;

// Re-exports for convenience
pub use bus::EventBus;
pub use config::{Config, DeviceConfig, MqttConfig, TimingConfig, TopicConfig, WifiConfig};
pub use controller::{AccessController, ControllerState, Station};
pub use credential::{HexColor, Uid};
pub use mode::Mode;
pub use registry::{Registry, UserEntry};
pub use traits::IndicatorColor;
