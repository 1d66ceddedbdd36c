//! Append-only event store with optional JSON-lines journal.

pub mod config;
pub mod envelope;
pub mod event_store;
pub mod journal;
pub mod snapshot;

pub use config::{DurabilityMode, StoreConfig};
pub use envelope::{EventEnvelope, EventMetadata};
pub use event_store::{EventStore, SharedEnvelope, Subscriber};
pub use journal::{Journal, JournalRecord};
pub use snapshot::CatalogSnapshot;
