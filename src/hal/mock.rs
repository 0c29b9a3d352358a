//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware, storage, and network
//! traits, enabling development and testing on desktop without a reader
//! station.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockReader`] | [`CardReader`] | Queued card reads |
//! | [`MockButton`] | [`ButtonInput`] | Settable raw level |
//! | [`MockIndicator`] | [`Indicator`] | Records every color shown |
//! | [`MockConsole`] | [`OperatorConsole`] | Scripted answers, captured prompts |
//! | [`MockSystem`] | [`System`] | Counts restarts |
//! | [`MockStore`] | [`KeyValueStore`] | In-memory map with failure injection |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::hal::{MockConsole, MockStore};
//! use rfid_warden::traits::{KeyValueStore, OperatorConsole};
//!
//! let mut store = MockStore::new();
//! store.put("admin_uid", b"A1B2").unwrap();
//! assert_eq!(store.get("admin_uid").unwrap().as_deref(), Some(&b"A1B2"[..]));
//!
//! let mut console = MockConsole::with_replies(["ops"]);
//! console.write_line("Enter group name:");
//! assert_eq!(console.read_line(1_000).as_deref(), Some("ops"));
//! assert_eq!(console.read_line(1_000), None);
//! ```

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::credential::Uid;
use crate::traits::{
    ButtonInput, CardReader, Clock, Indicator, IndicatorColor, KeyValueStore, MqttClient,
    MqttMessage, OperatorConsole, System,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock clock for deterministic time-based testing.
///
/// # Example
///
/// ```rust
/// use rfid_warden::hal::MockClock;
/// use rfid_warden::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock card reader.
///
/// Each [`present`](Self::present) queues one successful read; every call to
/// `try_read_uid` consumes one.
#[derive(Debug, Default)]
pub struct MockReader {
    queued: VecDeque<Uid>,
    /// Number of read attempts made.
    pub reads: usize,
}

impl MockReader {
    /// Creates a reader with no card in the field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one read of `uid`.
    pub fn present(&mut self, uid: Uid) {
        self.queued.push_back(uid);
    }

    /// Number of reads still queued.
    pub fn pending(&self) -> usize {
        self.queued.len()
    }
}

impl CardReader for MockReader {
    fn try_read_uid(&mut self) -> Option<Uid> {
        self.reads += 1;
        self.queued.pop_front()
    }
}

/// Mock push button. The level stays where it was set.
#[derive(Debug, Default)]
pub struct MockButton {
    /// Current raw level, `true` = pressed.
    pub level: bool,
    /// Number of samples taken.
    pub samples: usize,
}

impl MockButton {
    /// Creates a released button.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the button down.
    pub fn press(&mut self) {
        self.level = true;
    }

    /// Let go of the button.
    pub fn release(&mut self) {
        self.level = false;
    }
}

impl ButtonInput for MockButton {
    fn raw_level(&mut self) -> bool {
        self.samples += 1;
        self.level
    }
}

/// Mock status indicator.
///
/// Records every color set, in order.
#[derive(Debug, Default)]
pub struct MockIndicator {
    history: Vec<IndicatorColor>,
    /// Make `set_indicator` fail.
    pub fail: bool,
}

impl MockIndicator {
    /// Creates an indicator that has never been set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last color set, if any.
    pub fn current(&self) -> Option<IndicatorColor> {
        self.history.last().copied()
    }

    /// Every color set so far.
    pub fn history(&self) -> &[IndicatorColor] {
        &self.history
    }
}

impl Indicator for MockIndicator {
    type Error = ();

    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.history.push(color);
        Ok(())
    }
}

/// Mock operator console.
///
/// Answers `read_line` from a script; an exhausted script behaves like the
/// operator not typing anything before the timeout.
#[derive(Debug, Default)]
pub struct MockConsole {
    replies: VecDeque<String>,
    output: Vec<String>,
    timeouts: Vec<u64>,
}

impl MockConsole {
    /// Creates a console with no scripted answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console that answers with `replies`, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Queue one more answer.
    pub fn push_reply(&mut self, reply: impl Into<String>) {
        self.replies.push_back(reply.into());
    }

    /// Lines written to the operator.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// True if any written line contains `needle`.
    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }

    /// Timeout passed to each `read_line` call.
    pub fn timeouts(&self) -> &[u64] {
        &self.timeouts
    }
}

impl OperatorConsole for MockConsole {
    fn write_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn read_line(&mut self, timeout_ms: u64) -> Option<String> {
        self.timeouts.push(timeout_ms);
        self.replies.pop_front().map(|line| line.trim().to_string())
    }
}

/// Mock system services.
#[derive(Debug, Default)]
pub struct MockSystem {
    /// Number of restarts requested.
    pub restarts: usize,
}

impl MockSystem {
    /// Creates a system that has not restarted.
    pub fn new() -> Self {
        Self::default()
    }
}

impl System for MockSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// ============================================================================
// Storage Mock
// ============================================================================

/// Error returned by [`MockStore`] when failure injection is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStoreError;

/// In-memory key-value store.
///
/// # Example
///
/// ```rust
/// use rfid_warden::hal::MockStore;
/// use rfid_warden::traits::KeyValueStore;
///
/// let mut store = MockStore::new();
/// store.fail_writes = true;
/// assert!(store.put("k", b"v").is_err());
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockStore {
    entries: BTreeMap<String, Vec<u8>>,
    /// Make `put` and `clear_all` fail.
    pub fail_writes: bool,
    /// Make `get` fail.
    pub fail_reads: bool,
    /// Number of successful writes.
    pub writes: usize,
}

impl MockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes, bypassing failure injection.
    pub fn insert_raw(&mut self, key: &str, value: &[u8]) {
        self.entries.insert(key.to_string(), value.to_vec());
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// True if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MockStore {
    type Error = MockStoreError;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MockStoreError> {
        if self.fail_reads {
            return Err(MockStoreError);
        }
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), MockStoreError> {
        if self.fail_writes {
            return Err(MockStoreError);
        }
        self.entries.insert(key.to_string(), value.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), MockStoreError> {
        if self.fail_writes {
            return Err(MockStoreError);
        }
        self.entries.clear();
        Ok(())
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Records all publish/subscribe operations and allows injecting
/// incoming messages and connection loss.
///
/// # Example
///
/// ```rust
/// use rfid_warden::hal::MockMqtt;
/// use rfid_warden::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("microlab/random", "abc");
/// assert_eq!(mqtt.try_recv().unwrap().payload_str(), Some("abc"));
///
/// mqtt.publish("db/append/userlog", b"[]", false).unwrap();
/// assert_eq!(mqtt.published_to("db/append/userlog").len(), 1);
/// ```
#[derive(Debug)]
pub struct MockMqtt {
    published: Vec<MqttMessage>,
    subscriptions: Vec<String>,
    incoming: VecDeque<MqttMessage>,
    connected: bool,
    reconnect_attempts: usize,
    /// `reconnect` brings the connection back immediately.
    pub connect_on_reconnect: bool,
    /// Make `publish` fail.
    pub fail_publish: bool,
}

impl Default for MockMqtt {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            published: Vec::new(),
            subscriptions: Vec::new(),
            incoming: VecDeque::new(),
            connected: true,
            reconnect_attempts: 0,
            connect_on_reconnect: true,
            fail_publish: false,
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push_back(MqttMessage::new(topic, payload));
    }

    /// Simulate connection loss or recovery.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Every subscribe call, in order.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Every accepted publish, in order.
    pub fn published(&self) -> &[MqttMessage] {
        &self.published
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&MqttMessage> {
        self.published.iter().filter(|m| m.topic == topic).collect()
    }

    /// Number of reconnect calls.
    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts
    }
}

impl MqttClient for MockMqtt {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], _retain: bool) -> Result<(), ()> {
        if self.fail_publish {
            return Err(());
        }
        self.published.push(MqttMessage::new(topic, payload));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        self.incoming.pop_front()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ()> {
        self.reconnect_attempts += 1;
        if self.connect_on_reconnect {
            self.connected = true;
        }
        Ok(())
    }
}
