use super::envelope::EventEnvelope;
use crate::aggregate::CatalogEvent;
use crate::core::{CatalogError, Result, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The complete event log of a catalog, used to seed a fresh store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub format_version: u32,
    pub created_at: Timestamp,
    pub events: Vec<EventEnvelope<CatalogEvent>>,
}

impl CatalogSnapshot {
    pub fn new(events: Vec<EventEnvelope<CatalogEvent>>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            events,
        }
    }

    /// Writes to a sibling temp file, syncs, then renames over `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                CatalogError::Io(format!("Failed to create snapshot directory: {}", err))
            })?;
        }

        let tmp_path = path.with_extension("tmp");
        let file = File::create(&tmp_path)
            .map_err(|err| CatalogError::Io(format!("Failed to create temp file: {}", err)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|err| {
            CatalogError::Serialization(format!("Failed to serialize snapshot: {}", err))
        })?;
        writer
            .flush()
            .map_err(|err| CatalogError::Io(format!("Failed to flush snapshot: {}", err)))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|err| CatalogError::Io(format!("Failed to sync snapshot: {}", err)))?;
        fs::rename(&tmp_path, path)
            .map_err(|err| CatalogError::Io(format!("Failed to rename snapshot: {}", err)))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| {
            CatalogError::Io(format!("Failed to read snapshot {}: {}", path.display(), err))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_slice(&data).map_err(|err| {
            CatalogError::Serialization(format!("Failed to deserialize snapshot: {}", err))
        })?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CatalogError::Serialization(format!(
                "Unsupported snapshot format version {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }
}
