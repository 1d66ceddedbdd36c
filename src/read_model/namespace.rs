use super::index::{NameIndex, add_to_bucket, remove_from_bucket};
use crate::aggregate::NamespaceEvent;
use crate::core::{BoundedContextId, NamespaceId};
use crate::projection::Projection;
use crate::search::{Lookup, SearchPhrase, SearchResult};
use crate::store::EventMetadata;
use im::{OrdMap, OrdSet};

/// Namespace finder: by name, with each namespace's owning context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceIndex {
    pub by_name: NameIndex<NamespaceId>,
    owners: OrdMap<NamespaceId, BoundedContextId>,
    by_owner: OrdMap<BoundedContextId, OrdSet<NamespaceId>>,
}

impl NamespaceIndex {
    pub fn apply(self, _metadata: &EventMetadata, event: &NamespaceEvent) -> Self {
        match event {
            NamespaceEvent::NamespaceAdded {
                namespace_id,
                bounded_context_id,
                name,
                ..
            }
            | NamespaceEvent::NamespaceImported {
                namespace_id,
                bounded_context_id,
                name,
                ..
            } => {
                let index = self.removed(namespace_id);
                Self {
                    by_name: index.by_name.with(*namespace_id, name),
                    owners: index.owners.update(*namespace_id, *bounded_context_id),
                    by_owner: add_to_bucket(index.by_owner, *bounded_context_id, *namespace_id),
                }
            }
            NamespaceEvent::NamespaceRemoved { namespace_id } => self.removed(namespace_id),
            NamespaceEvent::LabelAdded { .. } | NamespaceEvent::LabelRemoved { .. } => self,
        }
    }

    fn removed(self, namespace_id: &NamespaceId) -> Self {
        let by_owner = match self.owners.get(namespace_id) {
            Some(owner) => remove_from_bucket(self.by_owner, owner, namespace_id),
            None => self.by_owner,
        };
        Self {
            by_name: self.by_name.without(namespace_id),
            owners: self.owners.without(namespace_id),
            by_owner,
        }
    }

    /// Drops every namespace owned by a removed context.
    pub fn without_context(self, bounded_context_id: &BoundedContextId) -> Self {
        self.namespaces_of(bounded_context_id)
            .iter()
            .fold(self, |index, namespace_id| index.removed(namespace_id))
    }

    pub fn owner_of(&self, namespace_id: &NamespaceId) -> Option<BoundedContextId> {
        self.owners.get(namespace_id).copied()
    }

    pub fn namespaces_of(&self, bounded_context_id: &BoundedContextId) -> OrdSet<NamespaceId> {
        self.by_owner
            .get(bounded_context_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Maps a namespace result onto the contexts owning those namespaces.
    pub fn owning_contexts(
        &self,
        namespaces: SearchResult<NamespaceId>,
    ) -> SearchResult<BoundedContextId> {
        match namespaces {
            SearchResult::Results(ids) => SearchResult::from_results(
                ids.iter().filter_map(|namespace_id| self.owner_of(namespace_id)),
            ),
            SearchResult::NoResult => SearchResult::NoResult,
            SearchResult::NotUsed => SearchResult::NotUsed,
        }
    }
}

impl Lookup<NamespaceId> for NamespaceIndex {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<NamespaceId> {
        self.by_name.by_exact_or_pattern(phrase)
    }
}

pub fn projection() -> Projection<NamespaceIndex, NamespaceEvent> {
    Projection::new(NamespaceIndex::default(), |index, envelope| {
        index.apply(&envelope.metadata, &envelope.event)
    })
}
