//! Station operating modes.

use crate::traits::IndicatorColor;

/// Operating mode of the reader station.
///
/// Exactly one mode is active at a time. See [`crate::machine`] for the
/// transition table.
///
/// | Mode | Indicator | Meaning |
/// |------|-----------|---------|
/// | [`FirstBoot`](Self::FirstBoot) | purple | No admin yet; the next card becomes admin |
/// | [`Sleep`](Self::Sleep) | red | Locked; only the admin card wakes it |
/// | [`Idle`](Self::Idle) | green | Normal operation; user cards are logged |
/// | [`Waiting`](Self::Waiting) | yellow | Admin button pressed; waiting for admin card |
/// | [`Admin`](Self::Admin) | blue | Enrollment armed; waiting for a new card |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// No admin credential stored.
    FirstBoot,
    /// Locked.
    Sleep,
    /// Unlocked, logging user cards.
    Idle,
    /// Admin button pressed, waiting for admin confirmation.
    Waiting,
    /// Admin confirmed, waiting for a card to enroll.
    Admin,
}

impl Mode {
    /// Mode to start in, given whether an admin credential is stored.
    pub const fn initial(has_admin: bool) -> Self {
        if has_admin {
            Mode::Sleep
        } else {
            Mode::FirstBoot
        }
    }

    /// Indicator color shown while in this mode. Distinct for every mode.
    pub const fn indicator(&self) -> IndicatorColor {
        match self {
            Mode::FirstBoot => IndicatorColor::Purple,
            Mode::Sleep => IndicatorColor::Red,
            Mode::Idle => IndicatorColor::Green,
            Mode::Waiting => IndicatorColor::Yellow,
            Mode::Admin => IndicatorColor::Blue,
        }
    }

    /// Uppercase name, as shown on the console.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Mode::FirstBoot => "FIRST_BOOT",
            Mode::Sleep => "SLEEP",
            Mode::Idle => "IDLE",
            Mode::Waiting => "WAITING",
            Mode::Admin => "ADMIN",
        }
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
