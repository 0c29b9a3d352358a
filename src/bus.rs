//! Event bus adapter.
//!
//! Wraps an [`MqttClient`] with the station's topics and the two rules the
//! controller relies on:
//!
//! - connectivity is maintained from the poll loop, with reconnect attempts
//!   rate-limited to one per `bus_retry_ms`, and the token topic is
//!   subscribed again after every (re)connect
//! - publishing is fire-and-forget: failures are logged and the event is
//!   dropped, never queued or retried
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::bus::EventBus;
//! use rfid_warden::config::TopicConfig;
//! use rfid_warden::hal::MockMqtt;
//! use rfid_warden::Uid;
//!
//! let mut bus = EventBus::new(MockMqtt::new(), TopicConfig::default(), 2_000);
//! bus.maintain(0);
//! assert!(bus.client().is_subscribed("microlab/random"));
//!
//! let uid = Uid::from_hex("C3D4").unwrap();
//! assert!(bus.publish_user_log(&uid, "t0k3n"));
//! ```

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use thiserror::Error;

use crate::config::TopicConfig;
use crate::credential::Uid;
use crate::messages::{AdminSet, NewUser, UserLog};
use crate::registry::UserEntry;
use crate::traits::MqttClient;

/// Why an event could not be handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Not connected to the broker.
    #[error("bus offline")]
    Offline,
    /// The payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
    /// The client rejected the publish.
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Station-level view of the message bus.
pub struct EventBus<C: MqttClient> {
    client: C,
    topics: TopicConfig,
    retry_ms: u64,
    last_attempt_ms: Option<u64>,
    subscribed: bool,
}

impl<C: MqttClient> EventBus<C> {
    /// Wrap `client`. Nothing is sent until the first [`maintain`](Self::maintain).
    pub fn new(client: C, topics: TopicConfig, retry_ms: u64) -> Self {
        Self {
            client,
            topics,
            retry_ms,
            last_attempt_ms: None,
            subscribed: false,
        }
    }

    /// Keep the connection alive. Call once per poll.
    ///
    /// Idempotent: a connected, subscribed bus does nothing.
    pub fn maintain(&mut self, now_ms: u64) {
        if !self.client.is_connected() {
            self.subscribed = false;
            let due = self
                .last_attempt_ms
                .map_or(true, |at| now_ms.saturating_sub(at) >= self.retry_ms);
            if !due {
                return;
            }
            self.last_attempt_ms = Some(now_ms);
            if let Err(e) = self.client.reconnect() {
                tracing::warn!(error = ?e, "bus reconnect failed");
                return;
            }
        }

        if self.client.is_connected() && !self.subscribed {
            match self.client.subscribe(self.topics.token.as_str()) {
                Ok(()) => {
                    self.subscribed = true;
                    tracing::info!(topic = %self.topics.token, "bus connected, token subscribed");
                }
                Err(e) => tracing::warn!(error = ?e, "token subscribe failed"),
            }
        }
    }

    /// Drain inbound messages and return the newest token, if any arrived.
    ///
    /// Tokens are trimmed. Non-UTF-8 payloads and other topics are ignored.
    pub fn poll_token(&mut self) -> Option<String> {
        let mut latest = None;
        while let Some(msg) = self.client.try_recv() {
            if msg.topic != self.topics.token.as_str() {
                tracing::debug!(topic = %msg.topic, "ignoring message on unexpected topic");
                continue;
            }
            match msg.payload_str() {
                Some(text) => latest = Some(text.trim().to_string()),
                None => tracing::debug!("ignoring non-text token payload"),
            }
        }
        if let Some(token) = &latest {
            tracing::debug!(token = %token, "shared token updated");
        }
        latest
    }

    /// Report a recognized card. Returns `true` if handed to the client.
    pub fn publish_user_log(&mut self, uid: &Uid, token: &str) -> bool {
        let topic = self.topics.user_log.clone();
        let payload = UserLog { uid, token }.to_json();
        self.publish_logged("user-log", topic.as_str(), payload)
    }

    /// Report an enrollment. Returns `true` if handed to the client.
    pub fn publish_new_user(&mut self, entry: &UserEntry) -> bool {
        let topic = self.topics.new_user.clone();
        let payload = NewUser {
            uid: &entry.uid,
            group: &entry.group,
            color: entry.color,
        }
        .to_json();
        self.publish_logged("new-user", topic.as_str(), payload)
    }

    /// Report the admin card being set. Skipped when no topic is configured.
    pub fn publish_admin_set(&mut self, uid: &Uid) -> bool {
        let Some(topic) = self.topics.admin_set_topic().map(String::from) else {
            return false;
        };
        let payload = AdminSet { uid }.to_json();
        self.publish_logged("admin-set", &topic, payload)
    }

    /// True if the client reports a live connection.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Borrow the client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Mutably borrow the client.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn publish_logged(
        &mut self,
        kind: &'static str,
        topic: &str,
        payload: Result<Vec<u8>, serde_json::Error>,
    ) -> bool {
        let result = payload
            .map_err(|e| BusError::Encode(format!("{}", e)))
            .and_then(|bytes| self.send(topic, &bytes));
        match result {
            Ok(()) => {
                tracing::debug!(kind, topic, "event published");
                true
            }
            Err(e) => {
                tracing::warn!(kind, topic, error = %e, "event dropped");
                false
            }
        }
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if !self.client.is_connected() {
            return Err(BusError::Offline);
        }
        self.client
            .publish(topic, payload, false)
            .map_err(|e| BusError::Publish(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::HexColor;
    use crate::hal::MockMqtt;

    fn bus() -> EventBus<MockMqtt> {
        EventBus::new(MockMqtt::new(), TopicConfig::default(), 2_000)
    }

    fn uid(s: &str) -> Uid {
        Uid::from_hex(s).unwrap()
    }

    #[test]
    fn maintain_subscribes_once() {
        let mut bus = bus();
        bus.maintain(0);
        bus.maintain(10);
        assert_eq!(bus.client().subscriptions(), &["microlab/random"]);
    }

    #[test]
    fn reconnect_is_rate_limited() {
        let mut mqtt = MockMqtt::new();
        mqtt.set_connected(false);
        mqtt.connect_on_reconnect = false;
        let mut bus = EventBus::new(mqtt, TopicConfig::default(), 2_000);

        bus.maintain(0);
        bus.maintain(500);
        bus.maintain(1_999);
        assert_eq!(bus.client().reconnect_attempts(), 1);

        bus.maintain(2_000);
        assert_eq!(bus.client().reconnect_attempts(), 2);
    }

    #[test]
    fn resubscribes_after_reconnect() {
        let mut bus = bus();
        bus.maintain(0);

        bus.client_mut().set_connected(false);
        bus.maintain(100);
        // MockMqtt reconnects immediately by default
        assert_eq!(
            bus.client().subscriptions(),
            &["microlab/random", "microlab/random"]
        );
    }

    #[test]
    fn poll_token_keeps_latest_trimmed() {
        let mut bus = bus();
        bus.client_mut()
            .queue_message("microlab/random", "first");
        bus.client_mut()
            .queue_message("microlab/random", "  second \r\n");
        assert_eq!(bus.poll_token().as_deref(), Some("second"));
        assert_eq!(bus.poll_token(), None);
    }

    #[test]
    fn poll_token_ignores_other_topics_and_binary() {
        let mut bus = bus();
        bus.client_mut()
            .queue_message("db/append/userlog", "nope");
        bus.client_mut()
            .queue_message("microlab/random", alloc::vec![0xffu8, 0xfe]);
        assert_eq!(bus.poll_token(), None);
    }

    #[test]
    fn publishes_user_log() {
        let mut bus = bus();
        assert!(bus.publish_user_log(&uid("C3D4"), "tok"));
        let sent = bus.client().published();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "db/append/userlog");
        assert_eq!(sent[0].payload, br#"["C3D4","now","tok"]"#);
    }

    #[test]
    fn publishes_new_user() {
        let mut bus = bus();
        let entry =
            UserEntry::new(uid("E5F6"), "ops", HexColor::parse("ff00aa").unwrap()).unwrap();
        assert!(bus.publish_new_user(&entry));
        let sent = bus.client().published();
        assert_eq!(sent[0].topic, "db/append/users");
        assert_eq!(sent[0].payload, br##"["E5F6","now","ops","#FF00AA"]"##);
    }

    #[test]
    fn admin_set_disabled_by_default() {
        let mut bus = bus();
        assert!(!bus.publish_admin_set(&uid("A1B2")));
        assert!(bus.client().published().is_empty());

        let topics = TopicConfig::default().with_admin_set("db/append/admin");
        let mut bus = EventBus::new(MockMqtt::new(), topics, 2_000);
        assert!(bus.publish_admin_set(&uid("A1B2")));
        assert_eq!(bus.client().published()[0].payload, br#"["A1B2","now"]"#);
    }

    #[test]
    fn offline_publish_is_dropped() {
        let mut bus = bus();
        bus.client_mut().set_connected(false);
        assert!(!bus.publish_user_log(&uid("C3D4"), ""));
        assert!(bus.client().published().is_empty());
    }

    #[test]
    fn rejected_publish_is_dropped() {
        let mut bus = bus();
        bus.client_mut().fail_publish = true;
        assert!(!bus.publish_user_log(&uid("C3D4"), ""));
        assert!(bus.client().published().is_empty());
    }
}
