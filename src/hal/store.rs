//! Directory-backed key-value store for desktop runs.
//!
//! Each key is one file in the store directory. Writes go to a temporary
//! file that is renamed over the old value, so a crash leaves either the old
//! or the new value, never a torn one.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::traits::KeyValueStore;

/// Key-value store in a directory on disk.
///
/// # Example
///
/// ```rust,no_run
/// use rfid_warden::hal::FileStore;
/// use rfid_warden::traits::KeyValueStore;
///
/// let mut store = FileStore::open("./station-data").unwrap();
/// store.put("admin_uid", b"A1B2").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create, if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the values.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid key {:?}", key),
            ));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    type Error = io::Error;

    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        let path = self.path(key)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)
    }

    fn clear_all(&mut self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> FileStore {
        let dir = std::env::temp_dir().join(format!(
            "rfid-warden-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        FileStore::open(dir).unwrap()
    }

    #[test]
    fn missing_key_is_none() {
        let store = temp_store("missing");
        assert_eq!(store.get("admin_uid").unwrap(), None);
    }

    #[test]
    fn put_then_get() {
        let mut store = temp_store("put");
        store.put("users_json", b"[]").unwrap();
        store.put("users_json", b"[1]").unwrap();
        assert_eq!(store.get("users_json").unwrap().as_deref(), Some(&b"[1]"[..]));
        assert!(!store.dir().join("users_json.tmp").exists());
    }

    #[test]
    fn clear_all_removes_everything() {
        let mut store = temp_store("clear");
        store.put("admin_uid", b"A1B2").unwrap();
        store.put("users_json", b"[]").unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.get("admin_uid").unwrap(), None);
        assert_eq!(store.get("users_json").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_keys() {
        let mut store = temp_store("keys");
        assert!(store.put("../escape", b"x").is_err());
        assert!(store.get("").is_err());
    }
}
