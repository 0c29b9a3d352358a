//! MFRC522 card reader over SPI.
//!
//! Wraps the `mfrc522` driver: request, anticollision/select, then halt the
//! card so it is not selected again until it leaves and re-enters the field.
//!
//! # Example
//!
//! ```ignore
//! use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig, config::Config};
//! use rfid_warden::hal::esp32::Mfrc522Reader;
//!
//! let bus = SpiDriver::new(p.spi2, sck, mosi, Some(miso), &SpiDriverConfig::new())?;
//! let spi = SpiDeviceDriver::new(bus, Some(ss), &Config::new())?;
//! let reader = Mfrc522Reader::new(spi)?;
//! ```

use embedded_hal::spi::SpiDevice;
use mfrc522::comm::blocking::spi::SpiInterface;
use mfrc522::{Initialized, Mfrc522};

use crate::credential::Uid;
use crate::traits::CardReader;

/// RFID reader backed by an MFRC522 on an `embedded-hal` SPI device.
pub struct Mfrc522Reader<SPI: SpiDevice> {
    driver: Mfrc522<SpiInterface<SPI>, Initialized>,
}

impl<SPI: SpiDevice> Mfrc522Reader<SPI> {
    /// Initialize the chip.
    pub fn new(spi: SPI) -> anyhow::Result<Self> {
        let mut driver = Mfrc522::new(SpiInterface::new(spi))
            .init()
            .map_err(|e| anyhow::anyhow!("MFRC522 init failed: {:?}", e))?;

        match driver.version() {
            Ok(version) => tracing::info!(version, "MFRC522 ready"),
            Err(e) => tracing::warn!(error = ?e, "MFRC522 version unreadable"),
        }

        Ok(Self { driver })
    }
}

impl<SPI: SpiDevice> CardReader for Mfrc522Reader<SPI> {
    fn try_read_uid(&mut self) -> Option<Uid> {
        let atqa = self.driver.new_card_present().ok()?;
        let selected = self.driver.select(&atqa);

        // Release the card whether or not select worked
        let _ = self.driver.hlta();
        let _ = self.driver.stop_crypto1();

        let uid = match selected {
            Ok(uid) => uid,
            Err(e) => {
                tracing::debug!(error = ?e, "card select failed");
                return None;
            }
        };

        match Uid::from_bytes(uid.as_bytes()) {
            Ok(uid) => Some(uid),
            Err(e) => {
                tracing::debug!(error = %e, "unusable card uid");
                None
            }
        }
    }
}
