use crate::core::{AggregateId, Timestamp};
use serde::{Deserialize, Serialize};

/// Stream membership and recording time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// The aggregate stream the event belongs to.
    pub source: AggregateId,
    pub recorded_at: Timestamp,
}

/// An event plus its metadata. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event: E,
    pub metadata: EventMetadata,
}

impl<E> EventEnvelope<E> {
    pub fn new(source: AggregateId, recorded_at: Timestamp, event: E) -> Self {
        Self {
            event,
            metadata: EventMetadata {
                source,
                recorded_at,
            },
        }
    }

    pub fn source(&self) -> AggregateId {
        self.metadata.source
    }

    pub fn recorded_at(&self) -> Timestamp {
        self.metadata.recorded_at
    }

    pub fn map<U, F>(self, f: F) -> EventEnvelope<U>
    where
        F: FnOnce(E) -> U,
    {
        EventEnvelope {
            event: f(self.event),
            metadata: self.metadata,
        }
    }
}
