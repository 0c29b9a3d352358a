//! Hardware abstraction traits for the reader station.
//!
//! This module defines the narrow interfaces the controller uses to talk to
//! the physical world. Each has a mock in [`crate::hal::mock`] and, with the
//! `esp32` feature, a real implementation in `hal::esp32`.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`CardReader`] | Non-blocking UID read from the RFID reader |
//! | [`ButtonInput`] | Raw level of a momentary push button |
//! | [`Indicator`] | RGB status light |
//! | [`OperatorConsole`] | Line-oriented prompts and answers for enrollment |
//! | [`System`] | Process restart after factory reset |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::traits::{CardReader, Indicator, IndicatorColor};
//! use rfid_warden::hal::{MockIndicator, MockReader};
//! use rfid_warden::Uid;
//!
//! let mut reader = MockReader::new();
//! reader.present(Uid::from_hex("A1B2").unwrap());
//! assert!(reader.try_read_uid().is_some());
//! assert!(reader.try_read_uid().is_none());
//!
//! let mut led = MockIndicator::new();
//! led.set_indicator(IndicatorColor::Green).unwrap();
//! assert_eq!(led.current(), Some(IndicatorColor::Green));
//! ```

use alloc::string::String;

use crate::credential::Uid;

/// Logical colors the status indicator can show.
///
/// # Default
///
/// Defaults to [`Off`](Self::Off).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum IndicatorColor {
    /// All channels off.
    #[default]
    Off,
    /// Red only.
    Red,
    /// Green only.
    Green,
    /// Blue only.
    Blue,
    /// Red + green.
    Yellow,
    /// Red + blue.
    Purple,
    /// All channels on.
    White,
}

impl IndicatorColor {
    /// Channel states as `(red, green, blue)`, `true` = lit.
    ///
    /// ```
    /// use rfid_warden::traits::IndicatorColor;
    ///
    /// assert_eq!(IndicatorColor::Yellow.channels(), (true, true, false));
    /// assert_eq!(IndicatorColor::Off.channels(), (false, false, false));
    /// ```
    pub const fn channels(&self) -> (bool, bool, bool) {
        match self {
            IndicatorColor::Off => (false, false, false),
            IndicatorColor::Red => (true, false, false),
            IndicatorColor::Green => (false, true, false),
            IndicatorColor::Blue => (false, false, true),
            IndicatorColor::Yellow => (true, true, false),
            IndicatorColor::Purple => (true, false, true),
            IndicatorColor::White => (true, true, true),
        }
    }

    /// Lowercase name, for logs and JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            IndicatorColor::Off => "off",
            IndicatorColor::Red => "red",
            IndicatorColor::Green => "green",
            IndicatorColor::Blue => "blue",
            IndicatorColor::Yellow => "yellow",
            IndicatorColor::Purple => "purple",
            IndicatorColor::White => "white",
        }
    }
}

/// RFID card reader.
///
/// Anti-collision, selection and crypto are the driver's business. The
/// controller only asks whether a card is in the field right now.
///
/// # Implementation Notes
///
/// - Must never block; return `None` when no card is present
/// - Read failures are reported as `None` (the controller cannot act on them)
/// - Implementations should halt the card after a successful read
pub trait CardReader {
    /// Try to read the UID of a card currently in the field.
    fn try_read_uid(&mut self) -> Option<Uid>;
}

/// Raw momentary button input.
///
/// No debouncing here; the controller runs samples through a
/// [`DebounceFilter`](crate::debounce::DebounceFilter).
pub trait ButtonInput {
    /// Returns the current raw level, `true` = pressed.
    fn raw_level(&mut self) -> bool;
}

/// Status indicator (RGB LED).
pub trait Indicator {
    /// Error type for indicator operations.
    type Error;

    /// Show a color.
    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), Self::Error>;
}

/// Line-oriented operator console used for the enrollment dialogue.
///
/// On hardware this is the serial port; on desktop, stdin/stdout.
pub trait OperatorConsole {
    /// Write one line of text to the operator.
    fn write_line(&mut self, text: &str);

    /// Wait up to `timeout_ms` for one line of input.
    ///
    /// Returns the trimmed line, or `None` if nothing complete arrived before
    /// the deadline. This is the only blocking call the controller makes.
    fn read_line(&mut self, timeout_ms: u64) -> Option<String>;
}

/// Platform services.
pub trait System {
    /// Restart the device. On hardware this does not return.
    fn restart(&mut self);
}

/// Time source trait for `no_std` compatibility.
///
/// # Example
///
/// ```rust
/// use rfid_warden::traits::Clock;
/// use rfid_warden::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
