//! ESP-IDF clock, restart, and device identity.

use crate::traits::{Clock, System};

/// Clock backed by the ESP-IDF high-resolution timer.
///
/// `esp_timer_get_time()` returns microseconds since boot and never wraps in
/// practice, so the value is monotonic.
#[derive(Debug, Default, Clone, Copy)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a clock.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Safe: plain read of the system timer
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}

/// Restart through the ESP-IDF reset API.
#[derive(Debug, Default, Clone, Copy)]
pub struct Esp32System;

impl Esp32System {
    /// Creates the system handle.
    pub fn new() -> Self {
        Self
    }
}

impl System for Esp32System {
    fn restart(&mut self) {
        tracing::warn!("restarting");
        esp_idf_hal::reset::restart();
    }
}

/// Factory MAC address as lowercase hex, used as the device id.
///
/// Returns an empty string if the eFuse read fails.
pub fn factory_mac_hex() -> String {
    let mut mac = [0u8; 6];
    // Safe: the buffer is the 6 bytes the API writes
    let read = esp_idf_sys::esp!(unsafe {
        esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr())
    });
    if let Err(e) = read {
        tracing::warn!(error = %e, "factory MAC unavailable");
        return String::new();
    }
    mac.iter().map(|b| format!("{:02x}", b)).collect()
}
