//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::config::{Config, MqttConfig, TimingConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.timing.cooldown_ms, 900);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_timing(TimingConfig::default().with_cooldown_ms(1500));
//! ```

use alloc::format;
use alloc::string::String;
use core::time::Duration;

use heapless::String as HString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics, paths)
pub const MAX_LONG_STRING: usize = 128;

/// Maximum accepted length of one operator console line, in characters.
pub const MAX_LINE_CHARS: usize = 120;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

/// Configuration loading failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or has wrong field types.
    #[error("invalid config: {0}")]
    Parse(String),
}

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Byte length of the longest prefix of `s` that fits in `max` bytes
/// without splitting a character.
fn fit_prefix(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Create a ShortString from a &str, truncating if too long.
///
/// Only the builders truncate. [`Config::from_json`] rejects a document
/// with an over-long string instead.
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let _ = hs.push_str(&s[..fit_prefix(s, MAX_SHORT_STRING)]);
    hs
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    let mut hs = LongString::new();
    let _ = hs.push_str(&s[..fit_prefix(s, MAX_LONG_STRING)]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Event bus topics
    pub topics: TopicConfig,
    /// Timeouts and windows
    pub timing: TimingConfig,
    /// Device identification and storage
    pub device: DeviceConfig,
}

impl Config {
    /// Parse a JSON config document. Missing fields keep their defaults.
    ///
    /// Strings are not truncated here: a value longer than
    /// [`MAX_SHORT_STRING`] bytes (hosts, credentials, ids) or
    /// [`MAX_LONG_STRING`] bytes (topics) fails the whole document with
    /// [`ConfigError::Parse`].
    ///
    /// ```
    /// use rfid_warden::Config;
    ///
    /// let config = Config::from_json(br#"{"mqtt": {"host": "broker.lan"}}"#).unwrap();
    /// assert_eq!(config.mqtt.host.as_str(), "broker.lan");
    /// assert_eq!(config.mqtt.port, 1883);
    /// ```
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(format!("{}", e)))
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set topic configuration
    pub fn with_topics(mut self, topics: TopicConfig) -> Self {
        self.topics = topics;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID prefix; the device id is appended
    pub client_id_prefix: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id_prefix: short_string("esp32-rfid-"),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID prefix
    pub fn with_client_id_prefix(mut self, prefix: &str) -> Self {
        self.client_id_prefix = short_string(prefix);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Client id for this device: prefix followed by `device_id`.
    pub fn client_id(&self, device_id: &str) -> ShortString {
        let mut id = self.client_id_prefix.clone();
        let room = MAX_SHORT_STRING - id.len();
        let _ = id.push_str(&device_id[..fit_prefix(device_id, room)]);
        id
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Topic Config
// ============================================================================

/// Event bus topics
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Inbound shared token broadcast
    pub token: LongString,
    /// Outbound user-log events
    pub user_log: LongString,
    /// Outbound new-user events
    pub new_user: LongString,
    /// Outbound admin-set events (empty = disabled)
    pub admin_set: LongString,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            token: long_string("microlab/random"),
            user_log: long_string("db/append/userlog"),
            new_user: long_string("db/append/users"),
            admin_set: LongString::new(),
        }
    }
}

impl TopicConfig {
    /// Set the inbound token topic
    pub fn with_token(mut self, topic: &str) -> Self {
        self.token = long_string(topic);
        self
    }

    /// Set the user-log topic
    pub fn with_user_log(mut self, topic: &str) -> Self {
        self.user_log = long_string(topic);
        self
    }

    /// Set the new-user topic
    pub fn with_new_user(mut self, topic: &str) -> Self {
        self.new_user = long_string(topic);
        self
    }

    /// Set the admin-set topic; an empty topic disables the event
    pub fn with_admin_set(mut self, topic: &str) -> Self {
        self.admin_set = long_string(topic);
        self
    }

    /// Admin-set topic, if enabled
    pub fn admin_set_topic(&self) -> Option<&str> {
        if self.admin_set.is_empty() {
            None
        } else {
            Some(self.admin_set.as_str())
        }
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Timeouts and windows, all in milliseconds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Button debounce window
    pub debounce_ms: u64,
    /// Same-card read cooldown
    pub cooldown_ms: u64,
    /// WAITING gives up after this long without the admin card
    pub admin_confirm_timeout_ms: u64,
    /// ADMIN gives up after this long without a new card
    pub enroll_timeout_ms: u64,
    /// Per-prompt timeout during enrollment
    pub prompt_timeout_ms: u64,
    /// Minimum interval between bus reconnect attempts
    pub bus_retry_ms: u64,
    /// Minimum interval between WiFi reconnect attempts
    pub wifi_retry_ms: u64,
    /// Feedback flash duration
    pub flash_ms: u64,
    /// Main loop poll interval
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 40,
            cooldown_ms: 900,
            admin_confirm_timeout_ms: 5_000,
            enroll_timeout_ms: 5_000,
            prompt_timeout_ms: 15_000,
            bus_retry_ms: 2_000,
            wifi_retry_ms: 3_000,
            flash_ms: 120,
            poll_interval_ms: 10,
        }
    }
}

impl TimingConfig {
    /// Set the debounce window
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the card cooldown
    pub fn with_cooldown_ms(mut self, ms: u64) -> Self {
        self.cooldown_ms = ms;
        self
    }

    /// Set the WAITING timeout
    pub fn with_admin_confirm_timeout_ms(mut self, ms: u64) -> Self {
        self.admin_confirm_timeout_ms = ms;
        self
    }

    /// Set the ADMIN timeout
    pub fn with_enroll_timeout_ms(mut self, ms: u64) -> Self {
        self.enroll_timeout_ms = ms;
        self
    }

    /// Set the enrollment prompt timeout
    pub fn with_prompt_timeout_ms(mut self, ms: u64) -> Self {
        self.prompt_timeout_ms = ms;
        self
    }

    /// Set the bus retry interval
    pub fn with_bus_retry_ms(mut self, ms: u64) -> Self {
        self.bus_retry_ms = ms;
        self
    }

    /// Set the feedback flash duration
    pub fn with_flash_ms(mut self, ms: u64) -> Self {
        self.flash_ms = ms;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// How long the startup connect may block, in milliseconds
    pub connect_timeout_ms: u32,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 15_000,
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the startup connect timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// WiFi should be started: enabled and configured.
    pub fn should_connect(&self) -> bool {
        self.enabled && self.is_configured()
    }

    /// Upper bound on the blocking connect at startup.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.connect_timeout_ms))
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification and storage
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device id appended to the MQTT client id prefix
    /// (empty = derive from hardware, e.g. the MAC address)
    pub id: ShortString,
    /// Storage namespace for the registry
    pub storage_namespace: ShortString,
    /// Indicator LED is wired common-anode (lit when the pin is low)
    pub indicator_active_low: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: ShortString::new(),
            storage_namespace: short_string("rfidapp"),
            indicator_active_low: true,
        }
    }
}

impl DeviceConfig {
    /// Set the device ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }

    /// Set the storage namespace
    pub fn with_storage_namespace(mut self, namespace: &str) -> Self {
        self.storage_namespace = short_string(namespace);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
