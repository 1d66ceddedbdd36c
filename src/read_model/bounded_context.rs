use super::index::{KeyIndex, NameIndex, add_to_bucket, remove_from_bucket};
use crate::aggregate::BoundedContextEvent;
use crate::core::{BoundedContextId, DomainId};
use crate::projection::Projection;
use crate::search::{Lookup, SearchPhrase, SearchResult, combine_results_with_and};
use crate::store::EventMetadata;
use im::{OrdMap, OrdSet};
use tracing::{Level, event};

/// Bounded-context finder: by name, by key and by owning domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedContextIndex {
    pub by_name: NameIndex<BoundedContextId>,
    pub by_key: KeyIndex<BoundedContextId>,
    by_domain: OrdMap<DomainId, OrdSet<BoundedContextId>>,
    domain_of: OrdMap<BoundedContextId, DomainId>,
    removed: OrdSet<BoundedContextId>,
}

impl BoundedContextIndex {
    /// Events for a context that was never created, or was already removed,
    /// are reported and leave the index unchanged.
    pub fn apply(self, metadata: &EventMetadata, event: &BoundedContextEvent) -> Self {
        match event {
            BoundedContextEvent::BoundedContextImported { bounded_context } => {
                let index = self.moved(bounded_context.id, bounded_context.domain_id);
                Self {
                    by_name: index.by_name.with(bounded_context.id, &bounded_context.name),
                    by_key: index
                        .by_key
                        .assign(bounded_context.id, bounded_context.key.as_deref()),
                    removed: index.removed.without(&bounded_context.id),
                    ..index
                }
            }
            BoundedContextEvent::BoundedContextCreated {
                bounded_context_id,
                domain_id,
                name,
            } => {
                let index = self.moved(*bounded_context_id, *domain_id);
                Self {
                    by_name: index.by_name.with(*bounded_context_id, name),
                    removed: index.removed.without(bounded_context_id),
                    ..index
                }
            }
            BoundedContextEvent::BoundedContextRenamed {
                bounded_context_id,
                name,
            } => {
                if !self.is_live(bounded_context_id, metadata, event) {
                    return self;
                }
                Self {
                    by_name: self.by_name.with(*bounded_context_id, name),
                    ..self
                }
            }
            BoundedContextEvent::KeyAssigned {
                bounded_context_id,
                key,
            } => {
                if !self.is_live(bounded_context_id, metadata, event) {
                    return self;
                }
                Self {
                    by_key: self.by_key.assign(*bounded_context_id, key.as_deref()),
                    ..self
                }
            }
            BoundedContextEvent::BoundedContextMovedToDomain {
                bounded_context_id,
                domain_id,
            } => {
                if !self.is_live(bounded_context_id, metadata, event) {
                    return self;
                }
                self.moved(*bounded_context_id, *domain_id)
            }
            BoundedContextEvent::BoundedContextRemoved {
                bounded_context_id, ..
            } => {
                let index = self.unlinked(bounded_context_id);
                Self {
                    by_name: index.by_name.without(bounded_context_id),
                    by_key: index.by_key.without(bounded_context_id),
                    removed: index.removed.update(*bounded_context_id),
                    ..index
                }
            }
            BoundedContextEvent::BoundedContextReclassified { .. }
            | BoundedContextEvent::DescriptionChanged { .. }
            | BoundedContextEvent::BusinessDecisionsUpdated { .. }
            | BoundedContextEvent::UbiquitousLanguageUpdated { .. }
            | BoundedContextEvent::DomainRolesUpdated { .. }
            | BoundedContextEvent::MessagesUpdated { .. } => self,
        }
    }

    fn moved(self, id: BoundedContextId, domain_id: DomainId) -> Self {
        let index = self.unlinked(&id);
        Self {
            by_domain: add_to_bucket(index.by_domain, domain_id, id),
            domain_of: index.domain_of.update(id, domain_id),
            ..index
        }
    }

    fn unlinked(self, id: &BoundedContextId) -> Self {
        match self.domain_of.get(id).copied() {
            Some(domain_id) => Self {
                by_domain: remove_from_bucket(self.by_domain, &domain_id, id),
                domain_of: self.domain_of.without(id),
                ..self
            },
            None => self,
        }
    }

    fn is_live(
        &self,
        id: &BoundedContextId,
        metadata: &EventMetadata,
        event: &BoundedContextEvent,
    ) -> bool {
        let live = self.domain_of.contains_key(id);
        if !live {
            event!(
                Level::WARN,
                bounded_context_id = %id,
                source = %metadata.source,
                event_type = event.event_type(),
                "event for unknown bounded context ignored"
            );
        }
        live
    }

    /// Whether `id` was removed and not created again since.
    pub fn is_removed(&self, id: &BoundedContextId) -> bool {
        self.removed.contains(id)
    }

    pub fn domain_of(&self, id: &BoundedContextId) -> Option<DomainId> {
        self.domain_of.get(id).copied()
    }

    /// Contexts owned by `domain_id`; an evaluated filter, never `NotUsed`.
    pub fn in_domain(&self, domain_id: &DomainId) -> SearchResult<BoundedContextId> {
        SearchResult::from_results(
            self.by_domain
                .get(domain_id)
                .into_iter()
                .flat_map(|bucket| bucket.iter().copied()),
        )
    }

    /// Contexts matching every supplied filter.
    pub fn find(
        &self,
        name: Option<&SearchPhrase>,
        key: Option<&SearchPhrase>,
        domain_id: Option<&DomainId>,
    ) -> SearchResult<BoundedContextId> {
        let domain = match domain_id {
            Some(domain_id) => self.in_domain(domain_id),
            None => SearchResult::NotUsed,
        };
        combine_results_with_and([
            self.by_name.by_optional(name),
            self.by_key.by_optional(key),
            domain,
        ])
    }
}

pub fn projection() -> Projection<BoundedContextIndex, BoundedContextEvent> {
    Projection::new(BoundedContextIndex::default(), |index, envelope| {
        index.apply(&envelope.metadata, &envelope.event)
    })
}
