use crate::core::{CatalogError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_JOURNAL_FILE: &str = "catalog.journal";
pub const DATA_DIR_ENV: &str = "CONTEXTMAP_DATA_DIR";
pub const DURABILITY_ENV: &str = "CONTEXTMAP_DURABILITY";

/// How hard an append pushes the journal to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Flush and fsync before the append returns.
    #[default]
    Sync,
    /// Flush to the OS only.
    Async,
    /// Keep the log in memory; nothing is written.
    None,
}

impl FromStr for DurabilityMode {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(DurabilityMode::Sync),
            "async" => Ok(DurabilityMode::Async),
            "none" => Ok(DurabilityMode::None),
            other => Err(CatalogError::Config(format!(
                "Unknown durability mode '{}', expected sync|async|none",
                other
            ))),
        }
    }
}

/// Event store configuration
///
/// An in-memory store keeps nothing across restarts; a file-backed store
/// replays its journal on open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the journal; `None` for an in-memory store
    pub data_dir: Option<PathBuf>,

    /// Journal file name inside `data_dir`
    pub journal_file: String,

    pub durability: DurabilityMode,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            journal_file: DEFAULT_JOURNAL_FILE.to_string(),
            durability: DurabilityMode::None,
        }
    }

    pub fn file_backed<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().to_path_buf()),
            journal_file: DEFAULT_JOURNAL_FILE.to_string(),
            durability: DurabilityMode::Sync,
        }
    }

    /// Set the durability mode
    pub fn durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Set the journal file name
    pub fn journal_file(mut self, name: &str) -> Self {
        self.journal_file = name.to_string();
        self
    }

    /// Reads `CONTEXTMAP_DATA_DIR` and `CONTEXTMAP_DURABILITY`.
    ///
    /// Without a data dir the store is in-memory.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(DATA_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => Self::file_backed(dir.trim()),
            None => Self::in_memory(),
        };
        if let Some(mode) = lookup(DURABILITY_ENV) {
            config.durability = mode.parse()?;
        }
        Ok(config)
    }

    /// Path of the journal, if the store writes one.
    pub fn journal_path(&self) -> Option<PathBuf> {
        if self.durability == DurabilityMode::None {
            return None;
        }
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(&self.journal_file))
    }

    pub fn validate(&self) -> Result<()> {
        if self.journal_file.trim().is_empty() {
            return Err(CatalogError::Config(
                "journal_file must not be empty".to_string(),
            ));
        }
        if self.data_dir.is_none() && self.durability != DurabilityMode::None {
            return Err(CatalogError::Config(format!(
                "durability {:?} requires a data directory",
                self.durability
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_is_in_memory() {
        let config = StoreConfig::default();
        assert_eq!(config.data_dir, None);
        assert_eq!(config.journal_path(), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_file_backed_defaults_to_sync() {
        let config = StoreConfig::file_backed("/tmp/catalog").journal_file("events.jsonl");
        assert_eq!(config.durability, DurabilityMode::Sync);
        assert_eq!(
            config.journal_path(),
            Some(PathBuf::from("/tmp/catalog/events.jsonl"))
        );
    }

    #[test]
    fn test_from_lookup() {
        let config = StoreConfig::from_lookup(lookup(&[
            (DATA_DIR_ENV, "/var/lib/catalog"),
            (DURABILITY_ENV, "Async"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/catalog")));
        assert_eq!(config.durability, DurabilityMode::Async);

        let empty = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(empty, StoreConfig::in_memory());
    }

    #[test]
    fn test_invalid_durability_is_config_error() {
        let result = StoreConfig::from_lookup(lookup(&[(DURABILITY_ENV, "eventually")]));
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_sync_without_dir_is_invalid() {
        let config = StoreConfig::in_memory().durability(DurabilityMode::Sync);
        assert!(config.validate().is_err());
    }
}
