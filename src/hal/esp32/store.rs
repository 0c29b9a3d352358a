//! Registry storage in an NVS namespace.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

use crate::registry::{KEY_ADMIN, KEY_USERS};
use crate::traits::KeyValueStore;

/// Keys removed by a factory reset.
const OWNED_KEYS: [&str; 2] = [KEY_ADMIN, KEY_USERS];

/// Key-value store on the default NVS partition.
///
/// Values are stored as blobs under a single namespace (`rfidapp` by
/// default). Keys written as NVS strings by older firmware are still read,
/// and are replaced by a blob on the next write.
pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    /// Open `namespace` read-write.
    pub fn open(partition: EspDefaultNvsPartition, namespace: &str) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, namespace, true)?;
        tracing::info!(namespace, "NVS namespace opened");
        Ok(Self { nvs })
    }

    fn get_legacy_str(&self, key: &str) -> Result<Option<Vec<u8>>, EspError> {
        let Some(len) = self.nvs.str_len(key)? else {
            return Ok(None);
        };
        // Length includes the terminating NUL
        let mut buf = vec![0u8; len + 1];
        Ok(self
            .nvs
            .get_str(key, &mut buf)?
            .map(|text| text.as_bytes().to_vec()))
    }
}

impl KeyValueStore for NvsStore {
    type Error = EspError;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EspError> {
        if let Some(len) = self.nvs.blob_len(key)? {
            let mut buf = vec![0u8; len];
            return Ok(self.nvs.get_blob(key, &mut buf)?.map(<[u8]>::to_vec));
        }
        self.get_legacy_str(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), EspError> {
        if self.nvs.str_len(key)?.is_some() {
            tracing::info!(key, "replacing string entry with blob");
            self.nvs.remove(key)?;
        }
        self.nvs.set_blob(key, value)
    }

    fn clear_all(&mut self) -> Result<(), EspError> {
        for key in OWNED_KEYS {
            self.nvs.remove(key)?;
        }
        Ok(())
    }
}
