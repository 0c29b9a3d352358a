//! Persistent key-value storage abstraction.
//!
//! The registry writes its whole state through this trait. On ESP32 it is
//! backed by an NVS namespace; on desktop by a directory of files; in tests
//! by [`MockStore`](crate::hal::MockStore).

use alloc::vec::Vec;

/// Durable key-value store.
///
/// # Implementation Notes
///
/// - `get` on a missing key returns `Ok(None)`, not an error
/// - `put` must be durable when it returns `Ok`
/// - `clear_all` removes every key this store owns
pub trait KeyValueStore {
    /// Error type for storage operations.
    type Error: core::fmt::Debug;

    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Write a value, replacing any previous one.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Remove all keys.
    fn clear_all(&mut self) -> Result<(), Self::Error>;
}
