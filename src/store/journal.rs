//! JSON-lines journal backing a file-backed event store.
//!
//! One line per envelope, in append order. Replaying the file in `seq` order
//! rebuilds the log exactly.

use super::config::DurabilityMode;
use super::envelope::EventEnvelope;
use crate::aggregate::{CatalogEvent, EventKind};
use crate::core::{AggregateId, CatalogError, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub seq: u64,
    pub stream: EventKind,
    pub event_type: String,
    pub source_id: AggregateId,
    pub recorded_at: Timestamp,
    pub payload: serde_json::Value,
}

impl JournalRecord {
    pub fn from_envelope(seq: u64, envelope: &EventEnvelope<CatalogEvent>) -> Result<Self> {
        Ok(Self {
            seq,
            stream: envelope.event.kind(),
            event_type: envelope.event.event_type().to_string(),
            source_id: envelope.source(),
            recorded_at: envelope.recorded_at(),
            payload: envelope.event.to_payload()?,
        })
    }

    /// Decodes the payload, checking it against the recorded event type.
    pub fn into_envelope(self) -> Result<EventEnvelope<CatalogEvent>> {
        let event = CatalogEvent::from_payload(self.stream, self.payload)?;
        if event.event_type() != self.event_type {
            return Err(CatalogError::ProjectionInvariant(format!(
                "journal record {} is tagged '{}' but holds a '{}' event",
                self.seq,
                self.event_type,
                event.event_type()
            )));
        }
        Ok(EventEnvelope::new(self.source_id, self.recorded_at, event))
    }
}

pub struct Journal {
    path: PathBuf,
    file: File,
    durability: DurabilityMode,
    next_seq: u64,
    /// File length covering every acknowledged batch.
    committed_len: u64,
}

impl Journal {
    /// Opens `path` for appending. Records written from here on start at
    /// `next_seq`.
    pub fn open<P: AsRef<Path>>(path: P, durability: DurabilityMode, next_seq: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                CatalogError::Io(format!(
                    "Failed to create journal directory {}: {}",
                    parent.display(),
                    err
                ))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                CatalogError::Io(format!("Failed to open journal {}: {}", path.display(), err))
            })?;
        let committed_len = file
            .metadata()
            .map_err(|err| {
                CatalogError::Io(format!("Failed to stat journal {}: {}", path.display(), err))
            })?
            .len();

        Ok(Self {
            path,
            file,
            durability,
            next_seq,
            committed_len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Writes one batch and makes it durable per the configured mode.
    ///
    /// The batch is encoded before anything is written, so a serialization
    /// failure leaves the file untouched. A failed write or sync truncates the
    /// file back to its last acknowledged length, so a rejected batch never
    /// resurfaces ahead of a later one.
    pub fn append(&mut self, envelopes: &[EventEnvelope<CatalogEvent>]) -> Result<()> {
        if self.durability == DurabilityMode::None || envelopes.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for (offset, envelope) in envelopes.iter().enumerate() {
            let record = JournalRecord::from_envelope(self.next_seq + offset as u64, envelope)?;
            lines.push_str(&serde_json::to_string(&record)?);
            lines.push('\n');
        }

        if let Err(err) = self.write_batch(lines.as_bytes()) {
            self.rollback();
            return Err(err);
        }

        self.committed_len += lines.len() as u64;
        self.next_seq += envelopes.len() as u64;
        Ok(())
    }

    fn write_batch(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .map_err(|err| CatalogError::Io(format!("Failed to write journal: {}", err)))?;
        if self.durability == DurabilityMode::Sync {
            self.file
                .sync_data()
                .map_err(|err| CatalogError::Io(format!("Failed to sync journal: {}", err)))?;
        }
        Ok(())
    }

    /// Drops whatever part of a failed batch reached the file.
    fn rollback(&mut self) {
        if let Err(err) = self.file.set_len(self.committed_len) {
            event!(
                Level::ERROR,
                path = %self.path.display(),
                committed_len = self.committed_len,
                error = %err,
                "journal rollback failed"
            );
        }
    }

    /// Reads every record in file order. A missing file is an empty journal.
    ///
    /// Sequence numbers must be strictly increasing; anything else means the
    /// file no longer reflects append order.
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<JournalRecord>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(|err| {
            CatalogError::Io(format!("Failed to open journal {}: {}", path.display(), err))
        })?;

        let mut records: Vec<JournalRecord> = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .map_err(|err| CatalogError::Io(format!("Failed to read journal: {}", err)))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: JournalRecord = serde_json::from_str(&line).map_err(|err| {
                CatalogError::Serialization(format!(
                    "Invalid journal record on line {}: {}",
                    index + 1,
                    err
                ))
            })?;
            if let Some(previous) = records.last() {
                if record.seq <= previous.seq {
                    return Err(CatalogError::ProjectionInvariant(format!(
                        "journal sequence goes from {} to {} on line {}",
                        previous.seq,
                        record.seq,
                        index + 1
                    )));
                }
            }
            records.push(record);
        }
        Ok(records)
    }
}
