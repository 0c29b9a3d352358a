//! Outbound event payloads.
//!
//! The backend appends each message as a row, so every event is a flat JSON
//! array rather than an object. The second element is always the literal
//! timestamp marker `"now"`; the backend substitutes its own clock.
//!
//! | Event | Payload |
//! |-------|---------|
//! | [`UserLog`] | `["<UID>","now","<token>"]` |
//! | [`NewUser`] | `["<UID>","now","<group>","#RRGGBB"]` |
//! | [`AdminSet`] | `["<UID>","now"]` |
//!
//! # Example
//!
//! ```
//! use rfid_warden::messages::UserLog;
//! use rfid_warden::Uid;
//!
//! let uid = Uid::from_hex("C3D4").unwrap();
//! let event = UserLog { uid: &uid, token: "t0k3n" };
//! assert_eq!(event.to_json().unwrap(), br#"["C3D4","now","t0k3n"]"#);
//! ```

use alloc::string::ToString;
use alloc::vec::Vec;

use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::credential::{HexColor, Uid};

/// Timestamp placeholder the backend replaces with its own time.
pub const TIMESTAMP_MARKER: &str = "now";

/// A recognized user presented their card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserLog<'a> {
    /// Card that was read
    pub uid: &'a Uid,
    /// Cached shared token, possibly empty
    pub token: &'a str,
}

/// A user was enrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUser<'a> {
    /// Enrolled card
    pub uid: &'a Uid,
    /// Group name
    pub group: &'a str,
    /// Normalized color
    pub color: HexColor,
}

/// The admin credential was set on first boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSet<'a> {
    /// New admin card
    pub uid: &'a Uid,
}

impl Serialize for UserLog<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(3)?;
        row.serialize_element(&self.uid.to_string())?;
        row.serialize_element(TIMESTAMP_MARKER)?;
        row.serialize_element(self.token)?;
        row.end()
    }
}

impl Serialize for NewUser<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(4)?;
        row.serialize_element(&self.uid.to_string())?;
        row.serialize_element(TIMESTAMP_MARKER)?;
        row.serialize_element(self.group)?;
        row.serialize_element(&self.color.to_string())?;
        row.end()
    }
}

impl Serialize for AdminSet<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_tuple(2)?;
        row.serialize_element(&self.uid.to_string())?;
        row.serialize_element(TIMESTAMP_MARKER)?;
        row.end()
    }
}

macro_rules! impl_to_json {
    ($($ty:ident),*) => {$(
        impl $ty<'_> {
            /// Serialize to the wire payload.
            pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
                serde_json::to_vec(self)
            }
        }
    )*};
}

impl_to_json!(UserLog, NewUser, AdminSet);

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> Uid {
        Uid::from_hex(s).unwrap()
    }

    #[test]
    fn user_log_payload() {
        let u = uid("c3d4");
        let json = UserLog { uid: &u, token: "abc123" }.to_json().unwrap();
        assert_eq!(json, br#"["C3D4","now","abc123"]"#);
    }

    #[test]
    fn user_log_with_empty_token() {
        let u = uid("C3D4");
        let json = UserLog { uid: &u, token: "" }.to_json().unwrap();
        assert_eq!(json, br#"["C3D4","now",""]"#);
    }

    #[test]
    fn user_log_token_is_escaped() {
        let u = uid("C3D4");
        let json = UserLog { uid: &u, token: "a\"b" }.to_json().unwrap();
        assert_eq!(json, br#"["C3D4","now","a\"b"]"#);
    }

    #[test]
    fn new_user_payload() {
        let u = uid("E5F6");
        let event = NewUser {
            uid: &u,
            group: "ops",
            color: HexColor::parse("ff00aa").unwrap(),
        };
        assert_eq!(event.to_json().unwrap(), br##"["E5F6","now","ops","#FF00AA"]"##);
    }

    #[test]
    fn admin_set_payload() {
        let u = uid("A1B2");
        assert_eq!(AdminSet { uid: &u }.to_json().unwrap(), br#"["A1B2","now"]"#);
    }
}
