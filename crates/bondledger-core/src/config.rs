//! TOML configuration
//!
//! ```toml
//! [window]
//! start_year = 2022
//! start_month = 1
//! months = 96
//!
//! [storage]
//! namespace = "bonds"
//! dir = ".bondledger"
//!
//! [export]
//! sheet_name = "BondTracker"
//! use_formulas = true
//! freeze_panes = true
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::schema::{Schema, TrackingWindow};
use crate::store::DEFAULT_NAMESPACE;
use crate::ConfigError;

/// Default config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "bondledger.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub window: TrackingWindow,
    pub storage: StorageConfig,
    pub export: ExportConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Key the ledger is saved under
    pub namespace: String,
    /// Directory of the file store
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            dir: PathBuf::from(".bondledger"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub sheet_name: String,
    /// Write `SUM` formulas in the TOTAL row instead of literal values
    pub use_formulas: bool,
    /// Freeze the header row and master columns
    pub freeze_panes: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: "BondTracker".to_string(),
            use_formulas: true,
            freeze_panes: true,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, else `bondledger.toml` in `dir` if present,
    /// else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export.sheet_name.trim().is_empty() {
            return Err(ConfigError::Invalid("export.sheet_name must not be empty".into()));
        }
        if self.storage.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.namespace must not be empty".into()));
        }
        self.schema().map(|_| ())
    }

    pub fn schema(&self) -> Result<Schema, ConfigError> {
        Schema::new(self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.storage.namespace, "bonds");
        assert_eq!(config.export.sheet_name, "BondTracker");
        assert_eq!(config.schema().unwrap().months().len(), 96);
    }

    #[test]
    fn partial_sections() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [window]
            start_year = 2024
            months = 12

            [export]
            use_formulas = false
            "#,
        )
        .unwrap();
        assert_eq!(config.window, TrackingWindow::new(2024, 1, 12));
        assert!(!config.export.use_formulas);
        assert!(config.export.freeze_panes);
        assert_eq!(config.schema().unwrap().last_month().label(), "Dec-2024");
    }

    #[test]
    fn invalid_window() {
        let err = LedgerConfig::from_toml_str("[window]\nstart_month = 13\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow(_)));
        let err = LedgerConfig::from_toml_str("[window]\nmonths = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow(_)));
        let err = LedgerConfig::from_toml_str("[window]\nmonths = 20000\n").unwrap_err();
        assert!(err.to_string().contains("do not fit in one worksheet"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = LedgerConfig::from_toml_str("[storage]\nnamespcae = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn discover_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            LedgerConfig::discover(None, dir.path()).unwrap(),
            LedgerConfig::default()
        );

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[storage]\nnamespace = \"local\"\n",
        )
        .unwrap();
        let found = LedgerConfig::discover(None, dir.path()).unwrap();
        assert_eq!(found.storage.namespace, "local");

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[storage]\nnamespace = \"other\"\n").unwrap();
        let chosen = LedgerConfig::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(chosen.storage.namespace, "other");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            LedgerConfig::discover(Some(&missing), dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }
}
