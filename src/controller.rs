//! Access controller: the poll loop body.
//!
//! [`AccessController::poll`] runs one iteration of the station's
//! cooperative loop:
//!
//! 1. sample the factory-reset button; a rising edge wipes everything and
//!    restarts, skipping all other work
//! 2. maintain the event bus and pick up a new shared token
//! 3. sample the admin button
//! 4. try one card read, filtered by the same-card cooldown
//! 5. run [`machine::transition`] and execute its effects
//! 6. show the mode color (or an active feedback flash) on the indicator
//!
//! All hardware is borrowed through a [`Station`] so the same controller runs
//! against ESP32 drivers, the desktop simulator, and the mocks in
//! [`crate::hal::mock`].

use alloc::format;
use alloc::string::String;

use crate::bus::EventBus;
use crate::config::TimingConfig;
use crate::credential::Uid;
use crate::debounce::{DebounceFilter, Edge};
use crate::dedup::ReadDeduplicator;
use crate::enrollment;
use crate::machine::{self, Effect, Inputs, Notice};
use crate::mode::Mode;
use crate::registry::Registry;
use crate::traits::{
    ButtonInput, CardReader, Clock, Indicator, IndicatorColor, KeyValueStore, MqttClient,
    OperatorConsole, System,
};

/// Hardware the controller drives, borrowed for each poll.
pub struct Station<R, A, X, I, L, Y, K> {
    /// Card reader
    pub reader: R,
    /// Admin-trigger button
    pub admin_button: A,
    /// Factory-reset button
    pub reset_button: X,
    /// Status indicator
    pub indicator: I,
    /// Operator console for enrollment
    pub console: L,
    /// Restart hook
    pub system: Y,
    /// Time source
    pub clock: K,
}

/// Everything the poll loop owns and mutates.
pub struct ControllerState<S: KeyValueStore> {
    mode: Mode,
    entered_at_ms: u64,
    registry: Registry<S>,
    token: String,
    dedup: ReadDeduplicator,
    admin_filter: Option<DebounceFilter>,
    reset_filter: Option<DebounceFilter>,
    flash: Option<(IndicatorColor, u64)>,
    shown: Option<IndicatorColor>,
}

impl<S: KeyValueStore> ControllerState<S> {
    /// Fresh state around a loaded registry.
    ///
    /// Starts in FIRST_BOOT when no admin is stored, SLEEP otherwise. Button
    /// filters are seeded on the first poll.
    pub fn new(registry: Registry<S>, timing: &TimingConfig, now_ms: u64) -> Self {
        let mode = Mode::initial(registry.admin().is_some());
        Self {
            mode,
            entered_at_ms: now_ms,
            registry,
            token: String::new(),
            dedup: ReadDeduplicator::new(timing.cooldown_ms),
            admin_filter: None,
            reset_filter: None,
            flash: None,
            shown: None,
        }
    }

    /// Current mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// When the current mode was entered.
    #[inline]
    pub fn mode_entered_at(&self) -> u64 {
        self.entered_at_ms
    }

    /// The registry.
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Cached shared token (empty until one arrives).
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Color last sent to the indicator.
    pub fn shown_indicator(&self) -> Option<IndicatorColor> {
        self.shown
    }

    fn enter(&mut self, next: Mode, now_ms: u64) {
        let prev = self.mode;
        self.mode = next;
        self.entered_at_ms = now_ms.max(self.entered_at_ms + 1);
        tracing::info!(from = %prev, to = %next, "mode changed");
    }

    fn wipe(&mut self) {
        if let Err(e) = self.registry.reset_all() {
            tracing::warn!(error = %e, "storage not fully cleared");
        }
        self.token.clear();
        self.dedup.clear();
    }
}

/// Station controller: mode state, event bus, and timing.
///
/// # Example
///
/// ```rust
/// use rfid_warden::controller::{AccessController, Station};
/// use rfid_warden::bus::EventBus;
/// use rfid_warden::config::{TimingConfig, TopicConfig};
/// use rfid_warden::hal::*;
/// use rfid_warden::{Mode, Registry, Uid};
///
/// let registry = Registry::load(MockStore::new());
/// let bus = EventBus::new(MockMqtt::new(), TopicConfig::default(), 2_000);
/// let mut controller = AccessController::new(registry, bus, TimingConfig::default(), 0);
/// let mut station = Station {
///     reader: MockReader::new(),
///     admin_button: MockButton::new(),
///     reset_button: MockButton::new(),
///     indicator: MockIndicator::new(),
///     console: MockConsole::new(),
///     system: MockSystem::new(),
///     clock: MockClock::new(),
/// };
///
/// assert_eq!(controller.mode(), Mode::FirstBoot);
/// station.reader.present(Uid::from_hex("A1B2").unwrap());
/// station.clock.advance(10);
/// controller.poll(&mut station);
/// assert_eq!(controller.mode(), Mode::Sleep);
/// ```
pub struct AccessController<S: KeyValueStore, C: MqttClient> {
    state: ControllerState<S>,
    bus: EventBus<C>,
    timing: TimingConfig,
}

impl<S: KeyValueStore, C: MqttClient> AccessController<S, C> {
    /// Build a controller. The indicator is set on the first poll.
    pub fn new(
        registry: Registry<S>,
        bus: EventBus<C>,
        timing: TimingConfig,
        now_ms: u64,
    ) -> Self {
        let state = ControllerState::new(registry, &timing, now_ms);
        tracing::info!(mode = %state.mode, "controller started");
        Self { state, bus, timing }
    }

    /// Current mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Loop-owned state.
    pub fn state(&self) -> &ControllerState<S> {
        &self.state
    }

    /// The registry.
    pub fn registry(&self) -> &Registry<S> {
        &self.state.registry
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus<C> {
        &self.bus
    }

    /// Mutable event bus access.
    pub fn bus_mut(&mut self) -> &mut EventBus<C> {
        &mut self.bus
    }

    /// Timing in use.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Give back the registry and bus, dropping all loop state.
    ///
    /// Used by hosts that emulate a restart: reload the registry from its
    /// store and build a fresh controller around the same bus.
    pub fn into_parts(self) -> (Registry<S>, EventBus<C>) {
        (self.state.registry, self.bus)
    }

    /// Run one loop iteration.
    pub fn poll<R, A, X, I, L, Y, K>(&mut self, station: &mut Station<R, A, X, I, L, Y, K>)
    where
        R: CardReader,
        A: ButtonInput,
        X: ButtonInput,
        I: Indicator,
        I::Error: core::fmt::Debug,
        L: OperatorConsole,
        Y: System,
        K: Clock,
    {
        let now = station.clock.now_ms();

        let reset_level = station.reset_button.raw_level();
        let reset_pressed =
            sample(&mut self.state.reset_filter, reset_level, now, self.timing.debounce_ms);

        let inputs = if reset_pressed {
            Inputs {
                reset_pressed,
                ..Inputs::default()
            }
        } else {
            self.bus.maintain(now);
            if let Some(token) = self.bus.poll_token() {
                self.state.token = token;
            }

            let admin_level = station.admin_button.raw_level();
            let admin_pressed =
                sample(&mut self.state.admin_filter, admin_level, now, self.timing.debounce_ms);

            Inputs {
                reset_pressed,
                admin_pressed,
                card: self.read_card(&mut station.reader, now),
            }
        };

        let step = machine::transition(
            self.state.mode,
            self.state.entered_at_ms,
            now,
            &inputs,
            &self.state.registry,
            &self.timing,
        );

        // A flash from the previous mode must not outlive it; this step's
        // effects may set a new one
        if step.next.is_some() {
            self.state.flash = None;
        }

        let mut vetoed = false;
        for effect in step.effects {
            vetoed |= !self.apply(effect, station);
        }

        // Enrollment may have blocked for a while
        let now = station.clock.now_ms();

        if let Some(next) = step.next {
            if vetoed {
                tracing::warn!(mode = %self.state.mode, target = %next, "transition vetoed");
            } else {
                self.state.enter(next, now);
                station.console.write_line(&format!("Mode: {}", next));
                if let Some(hint) = mode_hint(next) {
                    station.console.write_line(hint);
                }
            }
        }

        self.refresh_indicator(&mut station.indicator, now);
    }

    fn read_card<R: CardReader>(&mut self, reader: &mut R, now: u64) -> Option<Uid> {
        let uid = reader.try_read_uid()?;
        if self.state.dedup.accept(&uid, now) {
            tracing::debug!(uid = %uid, mode = %self.state.mode, "card read");
            Some(uid)
        } else {
            tracing::debug!(uid = %uid, "repeat read within cooldown");
            None
        }
    }

    /// Execute one effect. Returns `false` if the pending transition must
    /// not happen.
    fn apply<R, A, X, I, L, Y, K>(
        &mut self,
        effect: Effect,
        station: &mut Station<R, A, X, I, L, Y, K>,
    ) -> bool
    where
        L: OperatorConsole,
        Y: System,
        K: Clock,
    {
        match effect {
            Effect::FactoryReset => {
                tracing::warn!("factory reset requested");
                station.console.write_line("Factory reset. Restarting...");
                self.state.wipe();
                station.system.restart();
                true
            }

            Effect::AssignAdmin(uid) => match self.state.registry.set_admin(uid.clone()) {
                Ok(()) => {
                    tracing::info!(uid = %uid, "admin card set");
                    station.console.write_line(&format!("Admin card set: {}", uid));
                    self.bus.publish_admin_set(&uid);
                    true
                }
                Err(e) => {
                    tracing::warn!(uid = %uid, error = %e, "admin card not stored");
                    station
                        .console
                        .write_line(&format!("Could not store admin card: {}", e));
                    false
                }
            },

            Effect::LogAccess(uid) => {
                let group = self
                    .state
                    .registry
                    .find_user(&uid)
                    .map(|i| self.state.registry.users()[i].group.clone())
                    .unwrap_or_default();
                tracing::info!(uid = %uid, group = %group, "access granted");
                station
                    .console
                    .write_line(&format!("Access: {} ({})", uid, group));
                self.bus.publish_user_log(&uid, &self.state.token);
                self.flash(IndicatorColor::White, station.clock.now_ms());
                true
            }

            Effect::Enroll(uid) => {
                let result = enrollment::run(
                    &uid,
                    &mut station.console,
                    &mut self.state.registry,
                    self.timing.prompt_timeout_ms,
                );
                if let Ok(entry) = result {
                    self.bus.publish_new_user(&entry);
                    self.flash(IndicatorColor::Blue, station.clock.now_ms());
                }
                true
            }

            Effect::Notify(Notice::PresentNewCard) => {
                station
                    .console
                    .write_line("That is the admin card. Present a NEW card to enroll.");
                true
            }

            Effect::Notify(Notice::AlreadyRegistered(uid)) => {
                tracing::debug!(uid = %uid, "card already registered");
                station
                    .console
                    .write_line(&format!("Card {} is already registered.", uid));
                true
            }
        }
    }

    fn flash(&mut self, color: IndicatorColor, now: u64) {
        self.state.flash = Some((color, now + self.timing.flash_ms));
    }

    fn refresh_indicator<I>(&mut self, indicator: &mut I, now: u64)
    where
        I: Indicator,
        I::Error: core::fmt::Debug,
    {
        if matches!(self.state.flash, Some((_, until)) if now >= until) {
            self.state.flash = None;
        }
        let wanted = match self.state.flash {
            Some((color, _)) => color,
            None => self.state.mode.indicator(),
        };
        if self.state.shown == Some(wanted) {
            return;
        }
        if let Err(e) = indicator.set_indicator(wanted) {
            tracing::warn!(color = wanted.as_str(), error = ?e, "indicator update failed");
        }
        self.state.shown = Some(wanted);
    }
}

/// Debounce one button sample. The filter is seeded from the first sample so
/// a button held during boot does not fire.
fn sample(filter: &mut Option<DebounceFilter>, level: bool, now: u64, window_ms: u64) -> bool {
    filter
        .get_or_insert_with(|| DebounceFilter::new(window_ms, level, now))
        .update(level, now)
        == Edge::Rising
}

fn mode_hint(mode: Mode) -> Option<&'static str> {
    match mode {
        Mode::FirstBoot => Some("Present a card to make it the admin card."),
        Mode::Waiting => Some("Present the admin card to confirm."),
        Mode::Admin => Some("Present a NEW card to enroll."),
        Mode::Sleep | Mode::Idle => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicConfig;
    use crate::hal::*;

    type TestStation =
        Station<MockReader, MockButton, MockButton, MockIndicator, MockConsole, MockSystem, MockClock>;

    fn station() -> TestStation {
        Station {
            reader: MockReader::new(),
            admin_button: MockButton::new(),
            reset_button: MockButton::new(),
            indicator: MockIndicator::new(),
            console: MockConsole::new(),
            system: MockSystem::new(),
            clock: MockClock::new(),
        }
    }

    fn controller(store: MockStore) -> AccessController<MockStore, MockMqtt> {
        let bus = EventBus::new(MockMqtt::new(), TopicConfig::default(), 2_000);
        AccessController::new(Registry::load(store), bus, TimingConfig::default(), 0)
    }

    fn uid(s: &str) -> Uid {
        Uid::from_hex(s).unwrap()
    }

    #[test]
    fn first_poll_shows_mode_color() {
        let mut c = controller(MockStore::new());
        let mut st = station();
        c.poll(&mut st);
        assert_eq!(st.indicator.current(), Some(IndicatorColor::Purple));
    }

    #[test]
    fn indicator_only_written_on_change() {
        let mut c = controller(MockStore::new());
        let mut st = station();
        for _ in 0..5 {
            st.clock.advance(10);
            c.poll(&mut st);
        }
        assert_eq!(st.indicator.history().len(), 1);
    }

    #[test]
    fn entered_at_strictly_increases() {
        let mut c = controller(MockStore::new());
        let mut st = station();
        st.reader.present(uid("A1B2"));
        c.poll(&mut st); // now = 0, FIRST_BOOT -> SLEEP
        let first = c.state().mode_entered_at();
        assert!(first > 0);

        st.clock.advance(900);
        st.reader.present(uid("A1B2"));
        c.poll(&mut st);
        assert_eq!(c.mode(), Mode::Idle);
        assert!(c.state().mode_entered_at() > first);
    }

    #[test]
    fn flash_restores_mode_color() {
        let mut store = MockStore::new();
        store.insert_raw(crate::registry::KEY_ADMIN, b"A1B2");
        store.insert_raw(
            crate::registry::KEY_USERS,
            br##"[{"uid":"C3D4","group":"eng","color":"#00FF00"}]"##,
        );
        let mut c = controller(store);
        let mut st = station();

        st.reader.present(uid("A1B2"));
        c.poll(&mut st);
        st.clock.advance(1_000);
        st.reader.present(uid("C3D4"));
        c.poll(&mut st);
        assert_eq!(st.indicator.current(), Some(IndicatorColor::White));

        st.clock.advance(119);
        c.poll(&mut st);
        assert_eq!(st.indicator.current(), Some(IndicatorColor::White));

        st.clock.advance(1);
        c.poll(&mut st);
        assert_eq!(st.indicator.current(), Some(IndicatorColor::Green));
    }

    #[test]
    fn token_cached_from_bus() {
        let mut c = controller(MockStore::new());
        let mut st = station();
        c.bus_mut()
            .client_mut()
            .queue_message("microlab/random", " 42 ");
        c.poll(&mut st);
        assert_eq!(c.state().token(), "42");
    }
}
