//! Repeat-read suppression for the card reader.
//!
//! A card held against the antenna is detected on every poll. The
//! [`ReadDeduplicator`] lets the first detection through and drops repeats of
//! the same UID for a cooldown window. A different card is always accepted.

use crate::credential::Uid;

/// Cooldown filter keyed on the last accepted UID.
///
/// ```rust
/// use rfid_warden::{dedup::ReadDeduplicator, Uid};
///
/// let mut dedup = ReadDeduplicator::new(900);
/// let card = Uid::from_hex("A1B2").unwrap();
/// let other = Uid::from_hex("C3D4").unwrap();
///
/// assert!(dedup.accept(&card, 0));
/// assert!(!dedup.accept(&card, 500));   // same card, inside cooldown
/// assert!(dedup.accept(&other, 600));   // different card, always accepted
/// assert!(dedup.accept(&card, 700));    // last accepted was `other`
/// ```
#[derive(Clone, Debug)]
pub struct ReadDeduplicator {
    cooldown_ms: u64,
    last: Option<(Uid, u64)>,
}

impl ReadDeduplicator {
    /// Create a filter with the given cooldown.
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last: None,
        }
    }

    /// Returns `false` if `uid` was the last accepted card and less than the
    /// cooldown has passed since then. Otherwise records the sighting and
    /// returns `true`.
    pub fn accept(&mut self, uid: &Uid, now_ms: u64) -> bool {
        if let Some((last_uid, at)) = &self.last {
            if last_uid == uid && now_ms.saturating_sub(*at) < self.cooldown_ms {
                return false;
            }
        }
        self.last = Some((uid.clone(), now_ms));
        true
    }

    /// Forget the last sighting.
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Configured cooldown.
    #[inline]
    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }
}
