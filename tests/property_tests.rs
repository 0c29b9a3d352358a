//! Property-based tests for the input filters and the registry.
//!
//! These use proptest to drive the debounce filter, the read deduplicator,
//! and the registry's persistence with random inputs, checking the
//! guarantees the controller relies on.

use proptest::prelude::*;
use rfid_warden::debounce::{DebounceFilter, Edge};
use rfid_warden::dedup::ReadDeduplicator;
use rfid_warden::hal::MockStore;
use rfid_warden::registry::KEY_USERS;
use rfid_warden::{HexColor, Registry, Uid, UserEntry};

const WINDOW_MS: u64 = 40;

/// Strategy for card UIDs (1-10 raw bytes).
fn any_uid() -> impl Strategy<Value = Uid> {
    prop::collection::vec(any::<u8>(), 1..=10)
        .prop_map(|bytes| Uid::from_bytes(&bytes).expect("1-10 bytes is a valid uid"))
}

/// Strategy for raw button samples: (ms since previous sample, level).
fn samples() -> impl Strategy<Value = Vec<(u64, bool)>> {
    prop::collection::vec((0u64..60, any::<bool>()), 0..200)
}

/// Strategy for enrolled users with distinct UIDs, in enrollment order.
fn user_list() -> impl Strategy<Value = Vec<UserEntry>> {
    prop::collection::vec(
        (any_uid(), "[a-z][a-z0-9_-]{0,15}", any::<[u8; 3]>()),
        0..12,
    )
    .prop_map(|rows| {
        let mut users: Vec<UserEntry> = Vec::new();
        for (uid, group, [r, g, b]) in rows {
            if users.iter().all(|u| u.uid != uid) {
                let entry = UserEntry::new(uid, &group, HexColor::new(r, g, b))
                    .expect("generated group is never blank");
                users.push(entry);
            }
        }
        users
    })
}

/// Strategy for a user record the loader must skip.
fn bad_record() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::json!(42)),
        Just(serde_json::json!({"uid": "", "group": "eng", "color": "#000000"})),
        Just(serde_json::json!({"group": "eng", "color": "#000000"})),
        Just(serde_json::json!({"uid": "XYZ", "group": "eng", "color": "#000000"})),
        Just(serde_json::json!({"uid": "C3D4", "group": "   ", "color": "#000000"})),
        Just(serde_json::json!({"uid": "C3D4", "group": "eng", "color": "green"})),
    ]
}

fn enroll_all(users: &[UserEntry]) -> Registry<MockStore> {
    let mut registry = Registry::load(MockStore::new());
    for user in users {
        registry.add_user(user.clone()).expect("distinct uids enroll");
    }
    registry
}

// ============================================================================
// Debounce
// ============================================================================

proptest! {
    /// A rising edge needs a raw high level that has been steady for the
    /// whole window, and a second one needs a stable low in between.
    #[test]
    fn prop_rising_edge_only_after_steady_window(raw_samples in samples()) {
        let mut filter = DebounceFilter::new(WINDOW_MS, false, 0);
        let mut now = 0u64;
        let mut raw_last = false;
        let mut last_change = 0u64;
        let mut armed = true;

        for (dt, raw) in raw_samples {
            now += dt;
            if raw != raw_last {
                raw_last = raw;
                last_change = now;
            }

            if filter.update(raw, now) == Edge::Rising {
                prop_assert!(raw);
                prop_assert!(now - last_change >= WINDOW_MS);
                prop_assert!(armed, "two rising edges without a stable low at {}", now);
                armed = false;
            }
            if !filter.stable() {
                armed = true;
            }
        }
    }

    /// Whatever noise came before, a clean release followed by a steady
    /// press yields exactly one rising edge.
    #[test]
    fn prop_steady_press_fires_once(noise in samples(), hold_polls in 5u64..50) {
        let mut filter = DebounceFilter::new(WINDOW_MS, false, 0);
        let mut now = 0u64;
        for (dt, raw) in noise {
            now += dt;
            filter.update(raw, now);
        }

        for _ in 0..10 {
            now += 10;
            filter.update(false, now);
        }
        prop_assert!(!filter.stable());

        let mut rising = 0;
        for _ in 0..hold_polls {
            now += 10;
            if filter.update(true, now) == Edge::Rising {
                rising += 1;
            }
        }
        prop_assert_eq!(rising, 1);
    }
}

// ============================================================================
// Read Deduplication
// ============================================================================

proptest! {
    /// A repeat of the same card is accepted exactly when the cooldown has
    /// fully elapsed.
    #[test]
    fn prop_same_card_respects_cooldown(
        uid in any_uid(),
        start in 0u64..(u64::MAX / 2),
        cooldown in 1u64..5_000,
        elapsed in 0u64..10_000,
    ) {
        let mut dedup = ReadDeduplicator::new(cooldown);
        prop_assert!(dedup.accept(&uid, start));
        prop_assert_eq!(dedup.accept(&uid, start + elapsed), elapsed >= cooldown);
    }

    /// A different card is never held back.
    #[test]
    fn prop_other_card_always_accepted(
        first in any_uid(),
        second in any_uid(),
        start in 0u64..(u64::MAX / 2),
        elapsed in 0u64..10_000,
    ) {
        prop_assume!(first != second);
        let mut dedup = ReadDeduplicator::new(900);
        prop_assert!(dedup.accept(&first, start));
        prop_assert!(dedup.accept(&second, start + elapsed));
    }
}

// ============================================================================
// Registry Persistence
// ============================================================================

proptest! {
    /// Enrolled users survive a reload, in enrollment order.
    #[test]
    fn prop_users_round_trip_in_order(users in user_list()) {
        let registry = enroll_all(&users);
        let reloaded = Registry::load(registry.into_store());
        prop_assert_eq!(reloaded.users(), &users[..]);
    }

    /// One damaged record is skipped; every other user still loads.
    #[test]
    fn prop_bad_record_is_skipped(
        users in user_list(),
        bad in bad_record(),
        slot in any::<prop::sample::Index>(),
    ) {
        let registry = enroll_all(&users);
        let mut store = registry.into_store();

        let raw = store.raw(KEY_USERS).unwrap_or(&b"[]"[..]).to_vec();
        let mut records: Vec<serde_json::Value> = serde_json::from_slice(&raw).unwrap();
        records.insert(slot.index(records.len() + 1), bad);
        store.insert_raw(KEY_USERS, &serde_json::to_vec(&records).unwrap());

        let reloaded = Registry::load(store);
        prop_assert_eq!(reloaded.users(), &users[..]);
    }
}
