use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Identifies the stream an envelope belongs to.
pub type AggregateId = Uuid;

pub type DomainId = Uuid;
pub type BoundedContextId = Uuid;
pub type NamespaceId = Uuid;
pub type LabelId = Uuid;
pub type CollaborationId = Uuid;
pub type NamespaceTemplateId = Uuid;

pub type Timestamp = DateTime<Utc>;

/// Source of `RecordedAt` values for appended envelopes.
///
/// Command layers pass a clock into every append so tests can pin time.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Wall-clock time.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A clock that always reports `at`.
pub fn fixed_clock(at: Timestamp) -> Clock {
    Arc::new(move || at)
}
