//! WiFi station for the reader.
//!
//! The station keeps working offline, so a failed connect is not fatal: the
//! first attempt is made at startup, bounded by
//! [`WifiConfig::connect_timeout_ms`], and [`Esp32Wifi::maintain`] retries
//! from the poll loop at a fixed interval.

use crate::config::WifiConfig;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};

/// How often the startup connect checks for a link.
const LINK_POLL: Duration = Duration::from_millis(100);

/// WiFi connection manager.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    retry_ms: u64,
    last_attempt_ms: u64,
}

impl<'a> Esp32Wifi<'a> {
    /// Configure station mode and try to connect once.
    ///
    /// # Errors
    ///
    /// Only driver setup failures are errors. A failed connection attempt is
    /// logged and left to [`maintain`](Self::maintain).
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
        retry_ms: u64,
        now_ms: u64,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());
        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            ..Default::default()
        }))?;
        wifi.start()?;

        let timeout = config.connect_timeout();
        tracing::info!(
            ssid = %config.ssid,
            timeout_ms = config.connect_timeout_ms,
            "WiFi connecting"
        );
        match connect_within(&mut wifi, timeout) {
            Ok(true) => {
                if let Ok(info) = wifi.wifi().sta_netif().get_ip_info() {
                    tracing::info!(ip = %info.ip, "WiFi connected");
                }
            }
            Ok(false) => tracing::warn!("WiFi connect timed out, will retry"),
            Err(e) => tracing::warn!(error = ?e, "WiFi not connected, will retry"),
        }

        Ok(Self {
            wifi,
            retry_ms,
            last_attempt_ms: now_ms,
        })
    }

    /// Start a reconnect if the link is down and the retry interval passed.
    ///
    /// Does not wait for the association to complete.
    pub fn maintain(&mut self, now_ms: u64) {
        if self.is_connected() || now_ms.saturating_sub(self.last_attempt_ms) < self.retry_ms {
            return;
        }
        self.last_attempt_ms = now_ms;
        tracing::info!("WiFi reconnecting");
        if let Err(e) = self.wifi.wifi_mut().connect() {
            tracing::warn!(error = ?e, "WiFi reconnect failed");
        }
    }

    /// Current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    /// True if associated with the access point.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

/// Start associating and wait up to `timeout` for the interface to come up.
fn connect_within(
    wifi: &mut BlockingWifi<EspWifi<'_>>,
    timeout: Duration,
) -> Result<bool, EspError> {
    wifi.wifi_mut().connect()?;
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if wifi.is_up()? {
            return Ok(true);
        }
        thread::sleep(LINK_POLL);
    }
    Ok(false)
}
