//! End-to-end scenarios for the station controller, driven through mocks.

use rfid_warden::bus::EventBus;
use rfid_warden::controller::{AccessController, Station};
use rfid_warden::hal::*;
use rfid_warden::registry::{KEY_ADMIN, KEY_USERS};
use rfid_warden::{IndicatorColor, Mode, Registry, TimingConfig, TopicConfig, Uid};

type TestStation =
    Station<MockReader, MockButton, MockButton, MockIndicator, MockConsole, MockSystem, MockClock>;

/// Poll cadence used by the rig.
const TICK: u64 = 10;

struct Rig {
    controller: AccessController<MockStore, MockMqtt>,
    station: TestStation,
}

impl Rig {
    fn new(store: MockStore) -> Self {
        Self::with_topics(store, TopicConfig::default())
    }

    fn with_topics(store: MockStore, topics: TopicConfig) -> Self {
        let bus = EventBus::new(MockMqtt::new(), topics, 2_000);
        let controller =
            AccessController::new(Registry::load(store), bus, TimingConfig::default(), 0);
        let mut rig = Self {
            controller,
            station: Station {
                reader: MockReader::new(),
                admin_button: MockButton::new(),
                reset_button: MockButton::new(),
                indicator: MockIndicator::new(),
                console: MockConsole::new(),
                system: MockSystem::new(),
                clock: MockClock::new(),
            },
        };
        // Seeds the button filters with released buttons
        rig.controller.poll(&mut rig.station);
        rig
    }

    fn poll(&mut self) {
        self.station.clock.advance(TICK);
        self.controller.poll(&mut self.station);
    }

    fn wait(&mut self, ms: u64) {
        self.station.clock.advance(ms);
        self.controller.poll(&mut self.station);
    }

    fn tap(&mut self, hex: &str) {
        self.station.reader.present(uid(hex));
        self.poll();
    }

    fn press_admin(&mut self) {
        self.station.admin_button.press();
        self.poll();
        self.wait(40);
        self.station.admin_button.release();
        self.poll();
        self.wait(40);
    }

    fn press_reset(&mut self) {
        self.station.reset_button.press();
        self.poll();
        self.wait(40);
        self.station.reset_button.release();
        self.poll();
        self.wait(40);
    }

    fn mode(&self) -> Mode {
        self.controller.mode()
    }

    fn mqtt(&self) -> &MockMqtt {
        self.controller.bus().client()
    }
}

fn uid(hex: &str) -> Uid {
    Uid::from_hex(hex).unwrap()
}

/// Admin `A1B2`, one user `C3D4` in group `eng`.
fn provisioned() -> MockStore {
    let mut store = MockStore::new();
    store.insert_raw(KEY_ADMIN, b"A1B2");
    store.insert_raw(
        KEY_USERS,
        br##"[{"uid":"C3D4","group":"eng","color":"#00FF00"}]"##,
    );
    store
}

/// Provisioned station already unlocked into IDLE.
fn idle_rig() -> Rig {
    let mut rig = Rig::new(provisioned());
    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Idle);
    // Leave the admin card's cooldown behind
    rig.wait(1_000);
    rig
}

// ============================================================================
// First boot
// ============================================================================

#[test]
fn empty_store_starts_in_first_boot() {
    let rig = Rig::new(MockStore::new());
    assert_eq!(rig.mode(), Mode::FirstBoot);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Purple));
}

#[test]
fn first_card_becomes_admin() {
    let mut rig = Rig::new(MockStore::new());
    rig.tap("A1B2");

    assert_eq!(rig.mode(), Mode::Sleep);
    assert_eq!(rig.controller.registry().admin(), Some(&uid("A1B2")));
    assert_eq!(rig.controller.registry().store().raw(KEY_ADMIN), Some(&b"A1B2"[..]));
    assert!(rig.station.console.printed("Admin card set: A1B2"));
    assert!(rig.station.console.printed("Mode: SLEEP"));
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Red));
}

#[test]
fn admin_set_not_published_without_topic() {
    let mut rig = Rig::new(MockStore::new());
    rig.tap("A1B2");
    assert!(rig.mqtt().published().is_empty());
}

#[test]
fn admin_set_published_when_topic_configured() {
    let topics = TopicConfig::default().with_admin_set("db/append/admin");
    let mut rig = Rig::with_topics(MockStore::new(), topics);
    rig.tap("A1B2");

    let sent = rig.mqtt().published_to("db/append/admin");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, br#"["A1B2","now"]"#);
}

#[test]
fn first_boot_ignores_admin_button() {
    let mut rig = Rig::new(MockStore::new());
    rig.press_admin();
    assert_eq!(rig.mode(), Mode::FirstBoot);
}

// ============================================================================
// Sleep and Idle
// ============================================================================

#[test]
fn provisioned_store_starts_asleep() {
    let rig = Rig::new(provisioned());
    assert_eq!(rig.mode(), Mode::Sleep);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Red));
}

#[test]
fn sleep_ignores_user_cards_and_button() {
    let mut rig = Rig::new(provisioned());
    rig.tap("C3D4");
    rig.tap("FFFF");
    rig.press_admin();
    assert_eq!(rig.mode(), Mode::Sleep);
    assert!(rig.mqtt().published().is_empty());
}

#[test]
fn admin_card_toggles_sleep_and_idle() {
    let mut rig = Rig::new(provisioned());
    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Idle);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Green));

    rig.wait(1_000);
    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Sleep);
}

#[test]
fn held_admin_card_does_not_toggle_back() {
    let mut rig = Rig::new(provisioned());
    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Idle);

    // Reader keeps seeing the same card for a while
    for _ in 0..5 {
        rig.tap("A1B2");
    }
    assert_eq!(rig.mode(), Mode::Idle);
}

#[test]
fn enrolled_card_logs_access_with_token() {
    let mut rig = idle_rig();
    rig.controller
        .bus_mut()
        .client_mut()
        .queue_message("microlab/random", "t0k3n");
    rig.poll();

    rig.tap("C3D4");

    assert_eq!(rig.mode(), Mode::Idle);
    let sent = rig.mqtt().published_to("db/append/userlog");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, br#"["C3D4","now","t0k3n"]"#);
    assert!(rig.station.console.printed("Access: C3D4 (eng)"));
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::White));

    rig.wait(200);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Green));
}

#[test]
fn access_before_any_token_sends_empty_token() {
    let mut rig = idle_rig();
    rig.tap("C3D4");
    let sent = rig.mqtt().published_to("db/append/userlog");
    assert_eq!(sent[0].payload, br#"["C3D4","now",""]"#);
}

#[test]
fn unknown_card_in_idle_is_ignored() {
    let mut rig = idle_rig();
    rig.tap("FFFF");
    assert_eq!(rig.mode(), Mode::Idle);
    assert!(rig.mqtt().published().is_empty());
}

#[test]
fn repeat_access_needs_cooldown() {
    let mut rig = idle_rig();
    rig.tap("C3D4");
    rig.tap("C3D4");
    assert_eq!(rig.mqtt().published_to("db/append/userlog").len(), 1);

    rig.wait(900);
    rig.tap("C3D4");
    assert_eq!(rig.mqtt().published_to("db/append/userlog").len(), 2);
}

// ============================================================================
// Enrollment
// ============================================================================

#[test]
fn full_enrollment_flow() {
    let mut rig = idle_rig();

    rig.press_admin();
    assert_eq!(rig.mode(), Mode::Waiting);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Yellow));
    assert!(rig.station.console.printed("Present the admin card to confirm."));

    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Admin);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Blue));

    rig.station.console.push_reply("ops");
    rig.station.console.push_reply("ff00aa");
    rig.tap("E5F6");

    assert_eq!(rig.mode(), Mode::Idle);
    let users = rig.controller.registry().users();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1].uid, uid("E5F6"));
    assert_eq!(users[1].group, "ops");
    assert_eq!(users[1].color.to_string(), "#FF00AA");

    let sent = rig.mqtt().published_to("db/append/users");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, br##"["E5F6","now","ops","#FF00AA"]"##);
    assert!(rig.station.console.printed("Registered E5F6 group=ops color=#FF00AA"));

    // Success flash, then back to the IDLE color
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Blue));
    rig.wait(200);
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Green));
}

#[test]
fn enrolled_user_persists_across_restart() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");
    rig.station.console.push_reply("ops");
    rig.station.console.push_reply("#123456");
    rig.tap("E5F6");

    let (registry, _bus) = rig.controller.into_parts();
    let reloaded = Registry::load(registry.into_store());
    assert_eq!(reloaded.admin(), Some(&uid("A1B2")));
    assert_eq!(reloaded.users().len(), 2);
    assert!(reloaded.find_user(&uid("E5F6")).is_some());
}

#[test]
fn admin_card_in_admin_mode_prompts_for_new_card() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");
    rig.wait(1_000);

    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Admin);
    assert!(rig
        .station
        .console
        .printed("That is the admin card. Present a NEW card to enroll."));
}

#[test]
fn known_card_in_admin_mode_is_reported() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");

    rig.tap("C3D4");
    assert_eq!(rig.mode(), Mode::Admin);
    assert!(rig.station.console.printed("Card C3D4 is already registered."));
    assert_eq!(rig.controller.registry().users().len(), 1);
}

#[test]
fn aborted_enrollment_returns_to_idle() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");

    rig.station.console.push_reply("ops");
    rig.station.console.push_reply("purple");
    rig.tap("E5F6");

    assert_eq!(rig.mode(), Mode::Idle);
    assert_eq!(rig.controller.registry().users().len(), 1);
    assert!(rig.mqtt().published_to("db/append/users").is_empty());
    assert!(rig.station.console.printed("Enrollment aborted"));
}

#[test]
fn silent_operator_times_out_enrollment() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");

    rig.tap("E5F6");

    assert_eq!(rig.mode(), Mode::Idle);
    assert_eq!(rig.station.console.timeouts(), &[15_000]);
    assert!(rig.station.console.printed("timed out waiting for group"));
}

#[test]
fn button_press_outside_idle_is_discarded() {
    let mut rig = idle_rig();
    rig.press_admin();
    assert_eq!(rig.mode(), Mode::Waiting);

    // Second press while WAITING does nothing, and is not replayed later
    rig.press_admin();
    assert_eq!(rig.mode(), Mode::Waiting);
    rig.wait(5_000);
    assert_eq!(rig.mode(), Mode::Idle);
    rig.poll();
    assert_eq!(rig.mode(), Mode::Idle);
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn waiting_times_out_to_idle() {
    let mut rig = idle_rig();
    rig.press_admin();
    assert_eq!(rig.mode(), Mode::Waiting);

    rig.wait(5_000);
    assert_eq!(rig.mode(), Mode::Idle);
}

#[test]
fn admin_mode_times_out_to_idle() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");
    assert_eq!(rig.mode(), Mode::Admin);

    rig.wait(5_000);
    assert_eq!(rig.mode(), Mode::Idle);
}

#[test]
fn non_admin_card_does_not_confirm() {
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("C3D4");
    assert_eq!(rig.mode(), Mode::Waiting);
}

// ============================================================================
// Factory reset
// ============================================================================

#[test]
fn factory_reset_wipes_and_restarts() {
    let mut rig = idle_rig();
    rig.press_reset();

    assert_eq!(rig.mode(), Mode::FirstBoot);
    assert_eq!(rig.station.system.restarts, 1);
    assert!(rig.controller.registry().admin().is_none());
    assert!(rig.controller.registry().users().is_empty());
    assert!(rig.controller.registry().store().is_empty());
    assert!(rig.station.console.printed("Factory reset. Restarting..."));
    assert_eq!(rig.station.indicator.current(), Some(IndicatorColor::Purple));
}

#[test]
fn factory_reset_works_from_every_mode() {
    // SLEEP
    let mut rig = Rig::new(provisioned());
    rig.press_reset();
    assert_eq!(rig.mode(), Mode::FirstBoot);

    // WAITING
    let mut rig = idle_rig();
    rig.press_admin();
    rig.press_reset();
    assert_eq!(rig.mode(), Mode::FirstBoot);

    // ADMIN
    let mut rig = idle_rig();
    rig.press_admin();
    rig.tap("A1B2");
    rig.press_reset();
    assert_eq!(rig.mode(), Mode::FirstBoot);

    // FIRST_BOOT
    let mut rig = Rig::new(MockStore::new());
    rig.press_reset();
    assert_eq!(rig.mode(), Mode::FirstBoot);
    assert_eq!(rig.station.system.restarts, 1);
}

#[test]
fn after_reset_next_card_becomes_admin() {
    let mut rig = idle_rig();
    rig.press_reset();

    // Any card, including a former user's
    rig.tap("C3D4");
    assert_eq!(rig.mode(), Mode::Sleep);
    assert_eq!(rig.controller.registry().admin(), Some(&uid("C3D4")));
}

// ============================================================================
// Event bus
// ============================================================================

#[test]
fn subscribes_to_token_topic() {
    let rig = Rig::new(MockStore::new());
    assert!(rig.mqtt().is_subscribed("microlab/random"));
}

#[test]
fn latest_token_wins() {
    let mut rig = idle_rig();
    let mqtt = rig.controller.bus_mut().client_mut();
    mqtt.queue_message("microlab/random", "first");
    mqtt.queue_message("microlab/random", "second");
    rig.poll();
    assert_eq!(rig.controller.state().token(), "second");

    rig.tap("C3D4");
    let sent = rig.mqtt().published_to("db/append/userlog");
    assert_eq!(sent[0].payload, br#"["C3D4","now","second"]"#);
}
