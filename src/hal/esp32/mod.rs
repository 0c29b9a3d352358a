//! ESP32 hardware abstraction layer for the reader station.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32 (Xtensa dual core, ESP-IDF)
//! - **Reader**: MFRC522 13.56 MHz RFID module on VSPI
//! - **Indicator**: common-anode RGB LED (active-low)
//! - **Buttons**: admin trigger and factory reset, internal pull-down
//!
//! # Pin Assignments
//!
//! See the [`pins`] module.

mod reader;
mod store;
mod system;

pub use reader::Mfrc522Reader;
pub use store::NvsStore;
pub use system::{factory_mac_hex, Esp32Clock, Esp32System};

#[cfg(feature = "esp32-net")]
mod mqtt;
#[cfg(feature = "esp32-net")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

#[cfg(feature = "esp32-net")]
mod wifi;
#[cfg(feature = "esp32-net")]
pub use wifi::Esp32Wifi;

/// Pin assignments for the station board.
pub mod pins {
    // =========================================================================
    // RFID reader (MFRC522, SPI)
    // =========================================================================

    /// SPI chip select (SDA on the module)
    pub const RFID_SS: i32 = 5;

    /// Reader reset line
    pub const RFID_RST: i32 = 21;

    /// SPI clock
    pub const SPI_SCK: i32 = 18;

    /// SPI MISO
    pub const SPI_MISO: i32 = 19;

    /// SPI MOSI
    pub const SPI_MOSI: i32 = 23;

    // =========================================================================
    // RGB LED (common anode)
    // =========================================================================

    /// Red channel
    pub const LED_R: i32 = 17;

    /// Green channel
    pub const LED_G: i32 = 4;

    /// Blue channel
    pub const LED_B: i32 = 22;

    // =========================================================================
    // Buttons (active high, internal pull-down)
    // =========================================================================

    /// Admin trigger
    pub const BTN_ADMIN: i32 = 15;

    /// Factory reset
    pub const BTN_RESET: i32 = 16;
}
