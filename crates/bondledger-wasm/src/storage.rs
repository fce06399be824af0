//! `localStorage` ledger store

use bondledger_core::store::{decode_records, encode_records};
use bondledger_core::{Bond, LedgerStore, StoreError};
use tracing::debug;
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// Store keeping the whole ledger as one JSON string under `namespace`
#[derive(Clone, Debug)]
pub struct LocalStorageStore {
    namespace: String,
}

impl LocalStorageStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn storage() -> Result<Storage, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".into()))
    }
}

impl LedgerStore for LocalStorageStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self) -> Result<Option<Vec<Bond>>, StoreError> {
        let Some(text) = Self::storage()?.get_item(&self.namespace).map_err(unavailable)? else {
            return Ok(None);
        };
        let bonds = decode_records(&text)?;
        debug!(namespace = %self.namespace, records = bonds.len(), "loaded ledger");
        Ok(Some(bonds))
    }

    fn save(&mut self, bonds: &[Bond]) -> Result<(), StoreError> {
        let payload = encode_records(bonds)?;
        Self::storage()?
            .set_item(&self.namespace, &payload)
            .map_err(unavailable)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(&self.namespace)
            .map_err(unavailable)
    }
}

fn unavailable(err: JsValue) -> StoreError {
    StoreError::Unavailable(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}
