use super::index::{KeyIndex, NameIndex};
use crate::aggregate::DomainEvent;
use crate::core::DomainId;
use crate::projection::Projection;
use crate::search::{Lookup, SearchPhrase, SearchResult, combine_results_with_and};
use crate::store::EventMetadata;
use im::OrdSet;
use tracing::{Level, event};

/// Domain finder: by name and by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainIndex {
    pub by_name: NameIndex<DomainId>,
    pub by_key: KeyIndex<DomainId>,
    live: OrdSet<DomainId>,
}

impl DomainIndex {
    /// Events for a domain that was never created, or was already removed,
    /// are reported and leave the index unchanged.
    pub fn apply(self, metadata: &EventMetadata, event: &DomainEvent) -> Self {
        match event {
            DomainEvent::DomainImported { domain } => Self {
                by_name: self.by_name.with(domain.id, &domain.name),
                by_key: self.by_key.assign(domain.id, domain.key.as_deref()),
                live: self.live.update(domain.id),
            },
            DomainEvent::DomainCreated { domain_id, name }
            | DomainEvent::SubDomainCreated {
                domain_id, name, ..
            } => Self {
                by_name: self.by_name.with(*domain_id, name),
                live: self.live.update(*domain_id),
                ..self
            },
            DomainEvent::DomainRenamed { domain_id, name } => {
                if !self.is_live(domain_id, metadata, event) {
                    return self;
                }
                Self {
                    by_name: self.by_name.with(*domain_id, name),
                    ..self
                }
            }
            DomainEvent::KeyAssigned { domain_id, key } => {
                if !self.is_live(domain_id, metadata, event) {
                    return self;
                }
                Self {
                    by_key: self.by_key.assign(*domain_id, key.as_deref()),
                    ..self
                }
            }
            DomainEvent::DomainRemoved { domain_id } => Self {
                by_name: self.by_name.without(domain_id),
                by_key: self.by_key.without(domain_id),
                live: self.live.without(domain_id),
            },
            DomainEvent::CategorizedAsSubdomain { .. }
            | DomainEvent::PromotedToDomain { .. }
            | DomainEvent::VisionRefined { .. } => self,
        }
    }

    fn is_live(
        &self,
        domain_id: &DomainId,
        metadata: &EventMetadata,
        event: &DomainEvent,
    ) -> bool {
        let live = self.live.contains(domain_id);
        if !live {
            event!(
                Level::WARN,
                domain_id = %domain_id,
                source = %metadata.source,
                event_type = event.event_type(),
                "event for unknown domain ignored"
            );
        }
        live
    }

    /// Domains matching every supplied filter.
    pub fn find(
        &self,
        name: Option<&SearchPhrase>,
        key: Option<&SearchPhrase>,
    ) -> SearchResult<DomainId> {
        combine_results_with_and([self.by_name.by_optional(name), self.by_key.by_optional(key)])
    }
}

pub fn projection() -> Projection<DomainIndex, DomainEvent> {
    Projection::new(DomainIndex::default(), |index, envelope| {
        index.apply(&envelope.metadata, &envelope.event)
    })
}
