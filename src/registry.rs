//! Durable registry of the admin card and enrolled users.
//!
//! The [`Registry`] is the single source of truth for authorization. It
//! keeps its state in memory and writes through to a [`KeyValueStore`] on
//! every mutation, so a power cut never leaves memory and flash disagreeing.
//!
//! # Persisted layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `admin_uid` | admin UID as uppercase hex text |
//! | `users_json` | JSON array of `{"uid","group","color"}` objects |
//!
//! Loading is forgiving: a missing key is a first boot, an unreadable
//! document is an empty registry, and individual malformed user records are
//! skipped. The device must stay bootable with corrupted storage.
//!
//! # Example
//!
//! ```rust
//! use rfid_warden::{HexColor, Registry, Uid, UserEntry};
//! use rfid_warden::hal::MockStore;
//!
//! let mut registry = Registry::load(MockStore::new());
//! assert!(registry.admin().is_none());
//!
//! registry.set_admin(Uid::from_hex("A1B2").unwrap()).unwrap();
//!
//! let entry = UserEntry::new(
//!     Uid::from_hex("C3D4").unwrap(),
//!     "eng",
//!     HexColor::parse("#00FF00").unwrap(),
//! ).unwrap();
//! registry.add_user(entry).unwrap();
//!
//! // Reloading from the same store yields the same state
//! let reloaded = Registry::load(registry.into_store());
//! assert_eq!(reloaded.users().len(), 1);
//! ```

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::{HexColor, Uid};
use crate::traits::KeyValueStore;

/// Storage key holding the admin UID.
pub const KEY_ADMIN: &str = "admin_uid";

/// Storage key holding the serialized user list.
pub const KEY_USERS: &str = "users_json";

/// Registry operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A user with this UID is already enrolled.
    #[error("uid {0} is already registered")]
    DuplicateUid(Uid),
    /// The UID belongs to the admin card.
    #[error("uid {0} is the admin credential")]
    AdminCredential(Uid),
    /// An admin card is already set; only a full reset clears it.
    #[error("admin credential already set")]
    AdminAlreadySet,
    /// Group name is empty after trimming.
    #[error("group name is empty")]
    EmptyGroup,
    /// The backing store rejected a write.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// One enrolled user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntry {
    /// Card identifier.
    pub uid: Uid,
    /// Group name (never empty).
    pub group: String,
    /// Display color.
    pub color: HexColor,
}

impl UserEntry {
    /// Build an entry. The group is trimmed and must not be empty.
    pub fn new(uid: Uid, group: &str, color: HexColor) -> Result<Self, RegistryError> {
        let group = group.trim();
        if group.is_empty() {
            return Err(RegistryError::EmptyGroup);
        }
        Ok(Self {
            uid,
            group: group.to_string(),
            color,
        })
    }
}

/// On-flash record shape. Every field is optional so one bad record cannot
/// fail the whole document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredUser {
    #[serde(default)]
    uid: String,
    #[serde(default)]
    group: String,
    #[serde(default)]
    color: String,
}

impl From<&UserEntry> for StoredUser {
    fn from(entry: &UserEntry) -> Self {
        Self {
            uid: entry.uid.to_string(),
            group: entry.group.clone(),
            color: entry.color.to_string(),
        }
    }
}

impl StoredUser {
    fn into_entry(self) -> Option<UserEntry> {
        if self.uid.trim().is_empty() {
            return None;
        }
        let uid = Uid::from_hex(&self.uid).ok()?;
        let color = HexColor::parse(&self.color).ok()?;
        UserEntry::new(uid, &self.group, color).ok()
    }
}

/// Admin credential plus the ordered list of enrolled users.
pub struct Registry<S: KeyValueStore> {
    store: S,
    admin: Option<Uid>,
    users: Vec<UserEntry>,
}

impl<S: KeyValueStore> Registry<S> {
    /// Load the registry from storage.
    ///
    /// Never fails: read and parse errors degrade to an empty registry and
    /// are logged.
    pub fn load(store: S) -> Self {
        let admin = load_admin(&store);
        let users = load_users(&store);

        tracing::info!(
            admin = admin.is_some(),
            users = users.len(),
            "registry loaded"
        );

        Self {
            store,
            admin,
            users,
        }
    }

    /// The admin credential, if one has been set.
    #[inline]
    pub fn admin(&self) -> Option<&Uid> {
        self.admin.as_ref()
    }

    /// True if `uid` is the admin card.
    pub fn is_admin(&self, uid: &Uid) -> bool {
        self.admin.as_ref() == Some(uid)
    }

    /// Set and persist the admin credential.
    ///
    /// Only allowed while no admin exists. On a storage failure the
    /// in-memory state is left unchanged.
    pub fn set_admin(&mut self, uid: Uid) -> Result<(), RegistryError> {
        if self.admin.is_some() {
            return Err(RegistryError::AdminAlreadySet);
        }
        let text = uid.to_string();
        self.store
            .put(KEY_ADMIN, text.as_bytes())
            .map_err(|e| RegistryError::Storage(format!("{:?}", e)))?;
        self.admin = Some(uid);
        Ok(())
    }

    /// Index of the first user with this UID.
    pub fn find_user(&self, uid: &Uid) -> Option<usize> {
        self.users.iter().position(|u| &u.uid == uid)
    }

    /// Enrolled users, in enrollment order.
    #[inline]
    pub fn users(&self) -> &[UserEntry] {
        &self.users
    }

    /// Append a user and rewrite the persisted list.
    ///
    /// Rejects duplicates and the admin card. The list is only updated in
    /// memory once the store accepted the new document.
    pub fn add_user(&mut self, entry: UserEntry) -> Result<(), RegistryError> {
        if self.find_user(&entry.uid).is_some() {
            return Err(RegistryError::DuplicateUid(entry.uid));
        }
        if self.is_admin(&entry.uid) {
            return Err(RegistryError::AdminCredential(entry.uid));
        }

        let stored: Vec<StoredUser> = self
            .users
            .iter()
            .chain(core::iter::once(&entry))
            .map(StoredUser::from)
            .collect();
        let json = serde_json::to_vec(&stored)
            .map_err(|e| RegistryError::Storage(format!("{}", e)))?;
        self.store
            .put(KEY_USERS, &json)
            .map_err(|e| RegistryError::Storage(format!("{:?}", e)))?;

        self.users.push(entry);
        Ok(())
    }

    /// Forget everything: admin, users, and all persisted keys.
    ///
    /// Memory is cleared even if the store fails; the error is returned so
    /// the caller can log it.
    pub fn reset_all(&mut self) -> Result<(), RegistryError> {
        self.admin = None;
        self.users.clear();
        self.store
            .clear_all()
            .map_err(|e| RegistryError::Storage(format!("{:?}", e)))
    }

    /// Borrow the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the backing store.
    pub fn into_store(self) -> S {
        self.store
    }
}

fn load_admin<S: KeyValueStore>(store: &S) -> Option<Uid> {
    let raw = match store.get(KEY_ADMIN) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = ?e, "admin credential unreadable, treating as unset");
            return None;
        }
    };

    let text = match core::str::from_utf8(&raw) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => return None,
        Err(_) => {
            tracing::warn!("admin credential is not text, treating as unset");
            return None;
        }
    };

    match Uid::from_hex(text) {
        Ok(uid) => Some(uid),
        Err(e) => {
            tracing::warn!(error = %e, "admin credential malformed, treating as unset");
            None
        }
    }
}

fn load_users<S: KeyValueStore>(store: &S) -> Vec<UserEntry> {
    let raw = match store.get(KEY_USERS) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = ?e, "user list unreadable, starting empty");
            return Vec::new();
        }
    };

    let records: Vec<serde_json::Value> = match serde_json::from_slice(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "user list corrupt, starting empty");
            return Vec::new();
        }
    };

    let total = records.len();
    let mut users: Vec<UserEntry> = Vec::with_capacity(total);
    for record in records {
        let entry = serde_json::from_value::<StoredUser>(record)
            .ok()
            .and_then(StoredUser::into_entry);
        match entry {
            Some(entry) if users.iter().all(|u| u.uid != entry.uid) => users.push(entry),
            _ => {}
        }
    }

    if users.len() != total {
        tracing::warn!(
            skipped = total - users.len(),
            kept = users.len(),
            "skipped malformed user records"
        );
    }
    users
}
