//! Mode transition function.
//!
//! The whole access policy lives in [`transition`]: given the current mode,
//! how long it has been active, and what the inputs reported this poll, it
//! returns the next mode and the side effects to perform. It does no I/O, so
//! every row of the table below is tested directly.
//!
//! | Mode | Trigger | Effect | Next |
//! |------|---------|--------|------|
//! | any | reset button | [`Effect::FactoryReset`] | `FirstBoot` |
//! | `FirstBoot` | any card | [`Effect::AssignAdmin`] | `Sleep` |
//! | `Sleep` | admin card | | `Idle` |
//! | `Idle` | admin button | | `Waiting` |
//! | `Idle` | admin card | | `Sleep` |
//! | `Idle` | enrolled card | [`Effect::LogAccess`] | `Idle` |
//! | `Waiting` | confirm timeout | | `Idle` |
//! | `Waiting` | admin card | | `Admin` |
//! | `Admin` | enroll timeout | | `Idle` |
//! | `Admin` | admin card | [`Effect::Notify`] | `Admin` |
//! | `Admin` | enrolled card | [`Effect::Notify`] | `Admin` |
//! | `Admin` | new card | [`Effect::Enroll`] | `Idle` |
//!
//! Anything not listed is ignored. At most one transition happens per call.
//!
//! ```rust
//! use rfid_warden::machine::{transition, CredentialLookup, Effect, Inputs};
//! use rfid_warden::{Mode, TimingConfig, Uid};
//!
//! struct NoAdmin;
//! impl CredentialLookup for NoAdmin {
//!     fn is_admin(&self, _: &Uid) -> bool { false }
//!     fn is_enrolled(&self, _: &Uid) -> bool { false }
//! }
//!
//! let card = Uid::from_hex("A1B2").unwrap();
//! let inputs = Inputs { card: Some(card.clone()), ..Inputs::default() };
//! let step = transition(Mode::FirstBoot, 0, 10, &inputs, &NoAdmin, &TimingConfig::default());
//!
//! assert_eq!(step.next, Some(Mode::Sleep));
//! assert_eq!(step.effects.as_slice(), &[Effect::AssignAdmin(card)]);
//! ```

use crate::config::TimingConfig;
use crate::credential::Uid;
use crate::mode::Mode;
use crate::registry::Registry;
use crate::traits::KeyValueStore;

/// Read-only credential checks the transition function needs.
pub trait CredentialLookup {
    /// True if `uid` is the admin card.
    fn is_admin(&self, uid: &Uid) -> bool;
    /// True if `uid` belongs to an enrolled user.
    fn is_enrolled(&self, uid: &Uid) -> bool;
}

impl<S: KeyValueStore> CredentialLookup for Registry<S> {
    fn is_admin(&self, uid: &Uid) -> bool {
        Registry::is_admin(self, uid)
    }

    fn is_enrolled(&self, uid: &Uid) -> bool {
        self.find_user(uid).is_some()
    }
}

/// Inputs gathered during one poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    /// Factory-reset button produced a rising edge.
    pub reset_pressed: bool,
    /// Admin button produced a rising edge.
    pub admin_pressed: bool,
    /// A card passed the cooldown filter.
    pub card: Option<Uid>,
}

/// Operator-facing notices that do not change the mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Admin card presented while waiting for a card to enroll.
    PresentNewCard,
    /// Card to enroll is already registered.
    AlreadyRegistered(Uid),
}

/// Side effect requested by a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Wipe the registry and shared token, then restart.
    FactoryReset,
    /// Store this card as the admin credential.
    AssignAdmin(Uid),
    /// Publish a user-log event for this card with the cached token.
    LogAccess(Uid),
    /// Run the enrollment dialogue for this card.
    Enroll(Uid),
    /// Tell the operator something.
    Notify(Notice),
}

/// Maximum effects one transition can request.
pub const MAX_EFFECTS: usize = 2;

/// Result of one transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// Mode to enter, or `None` to stay.
    pub next: Option<Mode>,
    /// Effects to perform, in order, before entering `next`.
    pub effects: heapless::Vec<Effect, MAX_EFFECTS>,
}

impl Step {
    /// Stay in the current mode, no effects.
    pub fn stay() -> Self {
        Self::default()
    }

    /// Move to `mode`.
    pub fn to(mode: Mode) -> Self {
        Self {
            next: Some(mode),
            effects: heapless::Vec::new(),
        }
    }

    /// Add an effect.
    pub fn with(mut self, effect: Effect) -> Self {
        // Capacity covers every row of the table
        let _ = self.effects.push(effect);
        self
    }

    /// True if nothing happens.
    pub fn is_noop(&self) -> bool {
        self.next.is_none() && self.effects.is_empty()
    }
}

/// Compute the next mode and effects.
///
/// # Arguments
///
/// * `mode` - Current mode
/// * `entered_at_ms` - When `mode` was entered
/// * `now_ms` - Current time
/// * `inputs` - Debounced button edges and the accepted card, if any
/// * `lookup` - Admin / enrolled checks
/// * `timing` - Timeout configuration
pub fn transition(
    mode: Mode,
    entered_at_ms: u64,
    now_ms: u64,
    inputs: &Inputs,
    lookup: &impl CredentialLookup,
    timing: &TimingConfig,
) -> Step {
    // Reset wins over everything else in the same poll
    if inputs.reset_pressed {
        return Step::to(Mode::FirstBoot).with(Effect::FactoryReset);
    }

    let elapsed = now_ms.saturating_sub(entered_at_ms);
    let card = inputs.card.as_ref();

    match mode {
        Mode::FirstBoot => match card {
            Some(uid) => Step::to(Mode::Sleep).with(Effect::AssignAdmin(uid.clone())),
            None => Step::stay(),
        },

        Mode::Sleep => match card {
            Some(uid) if lookup.is_admin(uid) => Step::to(Mode::Idle),
            Some(uid) => {
                tracing::debug!(uid = %uid, "non-admin card ignored while locked");
                Step::stay()
            }
            None => Step::stay(),
        },

        Mode::Idle => {
            if inputs.admin_pressed {
                return Step::to(Mode::Waiting);
            }
            match card {
                Some(uid) if lookup.is_admin(uid) => Step::to(Mode::Sleep),
                Some(uid) if lookup.is_enrolled(uid) => {
                    Step::stay().with(Effect::LogAccess(uid.clone()))
                }
                Some(uid) => {
                    tracing::debug!(uid = %uid, "unknown card ignored");
                    Step::stay()
                }
                None => Step::stay(),
            }
        }

        Mode::Waiting => {
            if elapsed >= timing.admin_confirm_timeout_ms {
                return Step::to(Mode::Idle);
            }
            match card {
                Some(uid) if lookup.is_admin(uid) => Step::to(Mode::Admin),
                Some(uid) => {
                    tracing::debug!(uid = %uid, "non-admin card ignored while waiting");
                    Step::stay()
                }
                None => Step::stay(),
            }
        }

        Mode::Admin => {
            if elapsed >= timing.enroll_timeout_ms {
                return Step::to(Mode::Idle);
            }
            match card {
                Some(uid) if lookup.is_admin(uid) => {
                    Step::stay().with(Effect::Notify(Notice::PresentNewCard))
                }
                Some(uid) if lookup.is_enrolled(uid) => Step::stay()
                    .with(Effect::Notify(Notice::AlreadyRegistered(uid.clone()))),
                Some(uid) => Step::to(Mode::Idle).with(Effect::Enroll(uid.clone())),
                None => Step::stay(),
            }
        }
    }
}
