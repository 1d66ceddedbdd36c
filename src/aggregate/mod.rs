//! Aggregate event sets, snapshot projections and command handlers.
//!
//! Every aggregate owns a closed event enum. [`CatalogEvent`] is the sum of
//! all of them and is what the event store persists; [`AggregateEvent`] moves
//! a typed event in and out of that sum and names its storage partition.

pub mod bounded_context;
pub mod collaboration;
pub mod domain;
pub mod namespace;
pub mod template;

pub use bounded_context::{
    BoundedContext, BoundedContextAggregate, BoundedContextCommand, BoundedContextEvent,
    BusinessDecision, BusinessModel, DomainRole, DomainType, Evolution, LanguageTerm, Messages,
    StrategicClassification,
};
pub use collaboration::{
    Collaboration, CollaborationAggregate, CollaborationCommand, CollaborationEvent, Collaborator,
    DownstreamRole, Relationship, UpstreamRole,
};
pub use domain::{Domain, DomainAggregate, DomainCommand, DomainEvent};
pub use namespace::{
    Label, LabelDefinition, Namespace, NamespaceAggregate, NamespaceCommand, NamespaceEvent,
};
pub use template::{
    NamespaceTemplate, NamespaceTemplateAggregate, NamespaceTemplateCommand,
    NamespaceTemplateEvent, TemplateLabel,
};

use crate::core::{AggregateId, CatalogError, CommandError, Result};
use crate::projection::Projection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage partition of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Domain,
    BoundedContext,
    Namespace,
    Collaboration,
    NamespaceTemplate,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Domain,
        EventKind::BoundedContext,
        EventKind::Namespace,
        EventKind::Collaboration,
        EventKind::NamespaceTemplate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Domain => "domain",
            EventKind::BoundedContext => "bounded_context",
            EventKind::Namespace => "namespace",
            EventKind::Collaboration => "collaboration",
            EventKind::NamespaceTemplate => "namespace_template",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every event the catalog records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogEvent {
    Domain(DomainEvent),
    BoundedContext(BoundedContextEvent),
    Namespace(NamespaceEvent),
    Collaboration(CollaborationEvent),
    NamespaceTemplate(NamespaceTemplateEvent),
}

impl CatalogEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CatalogEvent::Domain(_) => EventKind::Domain,
            CatalogEvent::BoundedContext(_) => EventKind::BoundedContext,
            CatalogEvent::Namespace(_) => EventKind::Namespace,
            CatalogEvent::Collaboration(_) => EventKind::Collaboration,
            CatalogEvent::NamespaceTemplate(_) => EventKind::NamespaceTemplate,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::Domain(event) => event.event_type(),
            CatalogEvent::BoundedContext(event) => event.event_type(),
            CatalogEvent::Namespace(event) => event.event_type(),
            CatalogEvent::Collaboration(event) => event.event_type(),
            CatalogEvent::NamespaceTemplate(event) => event.event_type(),
        }
    }

    /// Serializes the inner aggregate event without the partition tag.
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            CatalogEvent::Domain(event) => serde_json::to_value(event),
            CatalogEvent::BoundedContext(event) => serde_json::to_value(event),
            CatalogEvent::Namespace(event) => serde_json::to_value(event),
            CatalogEvent::Collaboration(event) => serde_json::to_value(event),
            CatalogEvent::NamespaceTemplate(event) => serde_json::to_value(event),
        };
        value.map_err(|err| {
            CatalogError::Serialization(format!("Failed to serialize {} event: {}", self.kind(), err))
        })
    }

    /// Inverse of [`to_payload`](Self::to_payload).
    pub fn from_payload(kind: EventKind, payload: serde_json::Value) -> Result<Self> {
        let decoded = match kind {
            EventKind::Domain => serde_json::from_value(payload).map(CatalogEvent::Domain),
            EventKind::BoundedContext => {
                serde_json::from_value(payload).map(CatalogEvent::BoundedContext)
            }
            EventKind::Namespace => serde_json::from_value(payload).map(CatalogEvent::Namespace),
            EventKind::Collaboration => {
                serde_json::from_value(payload).map(CatalogEvent::Collaboration)
            }
            EventKind::NamespaceTemplate => {
                serde_json::from_value(payload).map(CatalogEvent::NamespaceTemplate)
            }
        };
        decoded.map_err(|err| {
            CatalogError::Serialization(format!("Failed to deserialize {} event: {}", kind, err))
        })
    }
}

/// A typed aggregate event that can live inside [`CatalogEvent`].
pub trait AggregateEvent: Clone + Send + Sync + 'static {
    const KIND: EventKind;

    fn event_type(&self) -> &'static str;

    fn from_catalog(event: &CatalogEvent) -> Option<&Self>;

    fn into_catalog(self) -> CatalogEvent;
}

macro_rules! catalog_event {
    ($event:ty, $variant:ident) => {
        impl AggregateEvent for $event {
            const KIND: EventKind = EventKind::$variant;

            fn event_type(&self) -> &'static str {
                <$event>::event_type(self)
            }

            fn from_catalog(event: &CatalogEvent) -> Option<&Self> {
                match event {
                    CatalogEvent::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_catalog(self) -> CatalogEvent {
                CatalogEvent::$variant(self)
            }
        }

        impl From<$event> for CatalogEvent {
            fn from(event: $event) -> Self {
                CatalogEvent::$variant(event)
            }
        }
    };
}

catalog_event!(DomainEvent, Domain);
catalog_event!(BoundedContextEvent, BoundedContext);
catalog_event!(NamespaceEvent, Namespace);
catalog_event!(CollaborationEvent, Collaboration);
catalog_event!(NamespaceTemplateEvent, NamespaceTemplate);

/// Command-side contract of an aggregate.
///
/// `handle` sees the state folded from the aggregate's own stream and either
/// rejects the command or returns the events to append.
pub trait Aggregate {
    type Event: AggregateEvent;
    type Command;
    type State: Clone;

    fn projection() -> Projection<Self::State, Self::Event>;

    fn handle(
        id: AggregateId,
        state: &Self::State,
        command: Self::Command,
    ) -> std::result::Result<Vec<Self::Event>, CommandError>;
}

/// Trims `name`, rejecting blank input.
pub(crate) fn required_name(name: &str) -> std::result::Result<String, CommandError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(CommandError::EmptyName)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank optional text collapses to `None`.
pub(crate) fn optional_text(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `None` clears a key; a blank key is rejected.
pub(crate) fn optional_key(
    key: Option<String>,
) -> std::result::Result<Option<String>, CommandError> {
    match key {
        None => Ok(None),
        Some(key) if key.trim().is_empty() => Err(CommandError::EmptyKey),
        Some(key) => Ok(Some(key.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_payload_round_trip_keeps_event_type() {
        let event = CatalogEvent::Domain(DomainEvent::DomainCreated {
            domain_id: Uuid::new_v4(),
            name: "Sales".to_string(),
        });
        let payload = event.to_payload().unwrap();
        assert!(payload.get("DomainCreated").is_some());

        let decoded = CatalogEvent::from_payload(EventKind::Domain, payload).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.event_type(), "DomainCreated");
    }

    #[test]
    fn test_payload_under_wrong_kind_fails() {
        let event = CatalogEvent::Domain(DomainEvent::DomainRemoved {
            domain_id: Uuid::new_v4(),
        });
        let payload = event.to_payload().unwrap();
        assert!(CatalogEvent::from_payload(EventKind::Collaboration, payload).is_err());
    }

    #[test]
    fn test_from_catalog_filters_by_kind() {
        let event: CatalogEvent = DomainEvent::DomainRemoved {
            domain_id: Uuid::new_v4(),
        }
        .into();
        assert!(DomainEvent::from_catalog(&event).is_some());
        assert!(NamespaceEvent::from_catalog(&event).is_none());
    }

    #[test]
    fn test_required_name_trims() {
        assert_eq!(required_name("  Sales ").unwrap(), "Sales");
        assert_eq!(required_name("  "), Err(CommandError::EmptyName));
        assert_eq!(optional_key(Some(" ".to_string())), Err(CommandError::EmptyKey));
        assert_eq!(optional_text(Some(" ".to_string())), None);
    }
}
