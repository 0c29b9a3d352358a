//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `store`, `console`: file-backed storage and stdin/stdout console (requires `std`)
//! - `gpio`: `embedded-hal` buttons and RGB LED (requires `gpio` feature)
//! - `esp32`: MFRC522 reader, NVS, WiFi, MQTT on ESP-IDF (requires `esp32` feature)

pub mod mock;

#[cfg(feature = "std")]
pub mod console;
#[cfg(feature = "std")]
pub mod store;

#[cfg(feature = "gpio")]
pub mod gpio;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use mock::*;

#[cfg(feature = "std")]
pub use console::StdioConsole;
#[cfg(feature = "std")]
pub use store::FileStore;

#[cfg(feature = "gpio")]
pub use gpio::{GpioButton, RgbIndicator};

#[cfg(feature = "esp32")]
pub use esp32::*;
