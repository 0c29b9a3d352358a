//! Validated credential and color types.
//!
//! Card identifiers and user colors travel through the system as text in
//! storage and on the bus, but inside the crate they are always one of the
//! newtypes defined here. Format rules are enforced once, at construction.
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::{HexColor, Uid};
//!
//! let uid = Uid::from_hex("a1b2").unwrap();
//! assert_eq!(uid.to_string(), "A1B2");
//!
//! let color = HexColor::parse(" ff00aa ").unwrap();
//! assert_eq!(color.to_string(), "#FF00AA");
//! ```

use core::fmt;

use thiserror::Error;

/// Maximum UID length in bytes (ISO 14443 triple-size UID).
pub const MAX_UID_LEN: usize = 10;

/// Errors from parsing a [`Uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// No bytes (or an empty hex string).
    #[error("credential is empty")]
    Empty,
    /// More than [`MAX_UID_LEN`] bytes.
    #[error("credential longer than {MAX_UID_LEN} bytes")]
    TooLong,
    /// Hex text with an odd number of digits.
    #[error("credential hex has odd length")]
    OddLength,
    /// Hex text containing a non-hex character.
    #[error("credential contains a non-hex digit")]
    InvalidHex,
}

/// Card identifier as read from the reader.
///
/// Equality is byte-exact. The canonical text form is uppercase hex with two
/// digits per byte and no separators (`"04A1B2C3"`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uid(heapless::Vec<u8, MAX_UID_LEN>);

impl Uid {
    /// Build a UID from raw reader bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        if bytes.is_empty() {
            return Err(CredentialError::Empty);
        }
        heapless::Vec::from_slice(bytes)
            .map(Self)
            .map_err(|_| CredentialError::TooLong)
    }

    /// Parse the hex text form. Case-insensitive, surrounding whitespace is ignored.
    pub fn from_hex(text: &str) -> Result<Self, CredentialError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CredentialError::Empty);
        }
        if text.len() % 2 != 0 {
            return Err(CredentialError::OddLength);
        }
        if text.len() / 2 > MAX_UID_LEN {
            return Err(CredentialError::TooLong);
        }

        let mut bytes = heapless::Vec::new();
        for pair in text.as_bytes().chunks(2) {
            let hi = hex_value(pair[0]).ok_or(CredentialError::InvalidHex)?;
            let lo = hex_value(pair[1]).ok_or(CredentialError::InvalidHex)?;
            bytes
                .push((hi << 4) | lo)
                .map_err(|_| CredentialError::TooLong)?;
        }
        Ok(Self(bytes))
    }

    /// Raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed UID; provided for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

impl core::str::FromStr for Uid {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Errors from parsing a [`HexColor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Not exactly six hex digits after the optional `#`.
    #[error("color must have exactly 6 hex digits")]
    WrongLength,
    /// A digit outside `0-9a-fA-F`.
    #[error("color contains a non-hex digit")]
    InvalidHex,
}

/// 24-bit RGB color, rendered as `#RRGGBB` in uppercase.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor([u8; 3]);

impl HexColor {
    /// Create from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Parse operator input: six hex digits, optionally prefixed with `#`.
    ///
    /// Whitespace around the value is ignored and case does not matter.
    ///
    /// ```
    /// use rfid_warden::HexColor;
    ///
    /// assert!(HexColor::parse("#00ff00").is_ok());
    /// assert!(HexColor::parse("00FF00").is_ok());
    /// assert!(HexColor::parse("zzzzzz").is_err());
    /// assert!(HexColor::parse("#12345").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ColorError> {
        let text = text.trim();
        let digits = text.strip_prefix('#').unwrap_or(text);
        if digits.len() != 6 {
            return Err(ColorError::WrongLength);
        }

        let mut rgb = [0u8; 3];
        for (slot, pair) in rgb.iter_mut().zip(digits.as_bytes().chunks(2)) {
            let hi = hex_value(pair[0]).ok_or(ColorError::InvalidHex)?;
            let lo = hex_value(pair[1]).ok_or(ColorError::InvalidHex)?;
            *slot = (hi << 4) | lo;
        }
        Ok(Self(rgb))
    }

    /// Red channel.
    pub const fn r(&self) -> u8 {
        self.0[0]
    }

    /// Green channel.
    pub const fn g(&self) -> u8 {
        self.0[1]
    }

    /// Blue channel.
    pub const fn b(&self) -> u8 {
        self.0[2]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Debug for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexColor({})", self)
    }
}

impl core::str::FromStr for HexColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
