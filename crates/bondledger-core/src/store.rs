//! Whole-ledger persistence
//!
//! A [`LedgerStore`] saves and loads the complete record set under a fixed
//! namespace. Records are encoded as JSON in the same shape as [`Bond`]'s
//! serde representation. There is no per-record persistence.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::ledger::LedgerObserver;
use crate::record::Bond;
use crate::StoreError;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "bonds";

/// Key-value persistence of the full record set
pub trait LedgerStore {
    /// Key the ledger is stored under
    fn namespace(&self) -> &str;

    /// Load the saved ledger; `None` when nothing has been saved
    fn load(&self) -> Result<Option<Vec<Bond>>, StoreError>;

    /// Replace the saved ledger
    fn save(&mut self, bonds: &[Bond]) -> Result<(), StoreError>;

    /// Remove the saved ledger entirely
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Encode records for storage
pub fn encode_records(bonds: &[Bond]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(bonds)?)
}

/// Decode stored records
pub fn decode_records(text: &str) -> Result<Vec<Bond>, StoreError> {
    Ok(serde_json::from_str(text)?)
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-process store, keyed by namespace
///
/// Holds the encoded text rather than the records so that loading exercises
/// the same decoding path as a real store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    namespace: String,
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: HashMap::new(),
        }
    }

    /// Seed the store with an already encoded payload
    pub fn with_raw(mut self, payload: impl Into<String>) -> Self {
        self.entries.insert(self.namespace.clone(), payload.into());
        self
    }

    /// Encoded payload currently saved, if any
    pub fn raw(&self) -> Option<&str> {
        self.entries.get(&self.namespace).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.raw().is_none()
    }
}

impl LedgerStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self) -> Result<Option<Vec<Bond>>, StoreError> {
        self.raw().map(decode_records).transpose()
    }

    fn save(&mut self, bonds: &[Bond]) -> Result<(), StoreError> {
        let payload = encode_records(bonds)?;
        self.entries.insert(self.namespace.clone(), payload);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.remove(&self.namespace);
        Ok(())
    }
}

// ============================================================================
// JSON File Store
// ============================================================================

/// Store writing `<dir>/<namespace>.json`
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    namespace: String,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.into(),
        }
    }

    /// Path of the ledger file
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.namespace))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LedgerStore for JsonFileStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self) -> Result<Option<Vec<Bond>>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let bonds = decode_records(&text)?;
        debug!(path = %path.display(), records = bonds.len(), "loaded ledger");
        Ok(Some(bonds))
    }

    fn save(&mut self, bonds: &[Bond]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let payload = encode_records(bonds)?;

        // Unique temp file in the same directory, synced, then renamed over
        // the ledger file
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(payload.as_bytes())?;
        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;
        temp.persist(self.path()).map_err(|e| e.error)?;
        debug!(path = %self.path().display(), records = bonds.len(), "saved ledger");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "removed ledger");
        }
        Ok(())
    }
}

// ============================================================================
// Persistence Hook
// ============================================================================

/// Observer that writes every committed snapshot to a store
#[derive(Debug)]
pub struct Persist<S> {
    store: S,
}

impl<S: LedgerStore> Persist<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: LedgerStore> LedgerObserver for Persist<S> {
    fn committed(&mut self, bonds: &[Bond]) -> Result<(), StoreError> {
        self.store.save(bonds)
    }

    fn cleared(&mut self) -> Result<(), StoreError> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Bond> {
        vec![Bond::new("Acme"), Bond::new("Globex")]
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new(DEFAULT_NAMESPACE);
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(store.raw().unwrap().contains("\"Globex\""));

        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested"), "bonds");
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert!(store.path().ends_with("bonds.json"));
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path(), "bonds");
        store.save(&sample()).unwrap();
        store.save(&[]).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["bonds.json".to_string()]);
        assert_eq!(store.load().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn concurrent_writers_never_publish_a_mixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let big: Vec<Bond> = (0..200).map(|i| Bond::new(format!("Bond {i}"))).collect();
        let small = sample();

        std::thread::scope(|scope| {
            for payload in [&big, &small] {
                let path = dir.path().to_path_buf();
                scope.spawn(move || {
                    let mut store = JsonFileStore::new(path, "bonds");
                    for _ in 0..20 {
                        store.save(payload).unwrap();
                    }
                });
            }
        });

        let store = JsonFileStore::new(dir.path(), "bonds");
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded == big || loaded == small);
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "bonds");
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));

        let seeded = MemoryStore::new("bonds").with_raw("[1, 2");
        assert!(matches!(seeded.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = JsonFileStore::new(dir.path(), "a");
        let b = JsonFileStore::new(dir.path(), "b");
        a.save(&sample()).unwrap();
        assert_eq!(b.load().unwrap(), None);
        assert_eq!(a.namespace(), "a");
    }
}
