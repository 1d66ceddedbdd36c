//! Label finder.
//!
//! Two parallel multi-maps, by normalized label name and by normalized label
//! value, hold `(namespace, label)` occurrences. Per-namespace label records
//! let label and namespace removals patch exactly the affected entries.

use super::index::{add_to_bucket, remove_from_bucket};
use crate::aggregate::{LabelDefinition, NamespaceEvent};
use crate::core::{BoundedContextId, LabelId, NamespaceId};
use crate::projection::Projection;
use crate::search::{
    Lookup, SearchPhrase, SearchResult, combine_results_with_and, find_by_key, normalize,
};
use crate::store::EventMetadata;
use im::{OrdMap, OrdSet};
use tracing::{Level, event};

/// One label on one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelOccurrence {
    pub namespace_id: NamespaceId,
    pub label_id: LabelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceLabels {
    pub bounded_context_id: BoundedContextId,
    pub labels: OrdMap<LabelId, LabelEntry>,
}

type Buckets = OrdMap<String, OrdSet<LabelOccurrence>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelIndex {
    namespaces: OrdMap<NamespaceId, NamespaceLabels>,
    by_name: Buckets,
    by_value: Buckets,
}

impl LabelIndex {
    pub fn apply(self, metadata: &EventMetadata, event: &NamespaceEvent) -> Self {
        match event {
            NamespaceEvent::NamespaceAdded {
                namespace_id,
                bounded_context_id,
                labels,
                ..
            }
            | NamespaceEvent::NamespaceImported {
                namespace_id,
                bounded_context_id,
                labels,
                ..
            } => self
                .purged(namespace_id)
                .registered(*namespace_id, *bounded_context_id, labels),
            NamespaceEvent::NamespaceRemoved { namespace_id } => self.purged(namespace_id),
            NamespaceEvent::LabelAdded {
                label_id,
                namespace_id,
                name,
                value,
                ..
            } => {
                if !self.namespaces.contains_key(namespace_id) {
                    event!(
                        Level::WARN,
                        namespace_id = %namespace_id,
                        bounded_context_id = %metadata.source,
                        "label added to unknown namespace"
                    );
                    return self;
                }
                let occurrence = LabelOccurrence {
                    namespace_id: *namespace_id,
                    label_id: *label_id,
                };
                self.without_label(occurrence).with_label(occurrence, name, value)
            }
            NamespaceEvent::LabelRemoved {
                label_id,
                namespace_id,
            } => self.without_label(LabelOccurrence {
                namespace_id: *namespace_id,
                label_id: *label_id,
            }),
        }
    }

    fn registered(
        self,
        namespace_id: NamespaceId,
        bounded_context_id: BoundedContextId,
        labels: &[LabelDefinition],
    ) -> Self {
        let index = Self {
            namespaces: self.namespaces.update(
                namespace_id,
                NamespaceLabels {
                    bounded_context_id,
                    labels: OrdMap::new(),
                },
            ),
            ..self
        };
        labels.iter().fold(index, |index, label| {
            let occurrence = LabelOccurrence {
                namespace_id,
                label_id: label.label_id,
            };
            index
                .without_label(occurrence)
                .with_label(occurrence, &label.name, &label.value)
        })
    }

    fn with_label(self, occurrence: LabelOccurrence, name: &str, value: &str) -> Self {
        let Some(record) = self.namespaces.get(&occurrence.namespace_id) else {
            return self;
        };
        let entry = LabelEntry {
            name: normalize(name),
            value: normalize(value),
        };
        let record = NamespaceLabels {
            bounded_context_id: record.bounded_context_id,
            labels: record.labels.update(occurrence.label_id, entry.clone()),
        };
        Self {
            namespaces: self.namespaces.update(occurrence.namespace_id, record),
            by_name: add_to_bucket(self.by_name, entry.name, occurrence),
            by_value: add_to_bucket(self.by_value, entry.value, occurrence),
        }
    }

    /// Removes one label, leaving sibling labels and namespaces untouched.
    fn without_label(self, occurrence: LabelOccurrence) -> Self {
        let Some(record) = self.namespaces.get(&occurrence.namespace_id) else {
            return self;
        };
        let Some(entry) = record.labels.get(&occurrence.label_id).cloned() else {
            return self;
        };
        let record = NamespaceLabels {
            bounded_context_id: record.bounded_context_id,
            labels: record.labels.without(&occurrence.label_id),
        };
        Self {
            namespaces: self.namespaces.update(occurrence.namespace_id, record),
            by_name: remove_from_bucket(self.by_name, &entry.name, &occurrence),
            by_value: remove_from_bucket(self.by_value, &entry.value, &occurrence),
        }
    }

    /// Removes a namespace and every label entry it contributed.
    fn purged(self, namespace_id: &NamespaceId) -> Self {
        let Some(record) = self.namespaces.get(namespace_id).cloned() else {
            return self;
        };
        let index = record.labels.keys().fold(self, |index, label_id| {
            index.without_label(LabelOccurrence {
                namespace_id: *namespace_id,
                label_id: *label_id,
            })
        });
        Self {
            namespaces: index.namespaces.without(namespace_id),
            ..index
        }
    }

    /// Drops every namespace recorded under a removed context, with its
    /// labels.
    pub fn without_context(self, bounded_context_id: &BoundedContextId) -> Self {
        let owned: Vec<NamespaceId> = self
            .namespaces
            .iter()
            .filter(|(_, record)| record.bounded_context_id == *bounded_context_id)
            .map(|(namespace_id, _)| *namespace_id)
            .collect();
        owned
            .iter()
            .fold(self, |index, namespace_id| index.purged(namespace_id))
    }

    pub fn labels_of(&self, namespace_id: &NamespaceId) -> Option<&NamespaceLabels> {
        self.namespaces.get(namespace_id)
    }

    pub fn bounded_context_of(&self, namespace_id: &NamespaceId) -> Option<BoundedContextId> {
        self.namespaces
            .get(namespace_id)
            .map(|record| record.bounded_context_id)
    }

    /// Occurrences indexed under each normalized label name.
    pub fn name_buckets(&self) -> &OrdMap<String, OrdSet<LabelOccurrence>> {
        &self.by_name
    }

    /// Occurrences indexed under each normalized label value.
    pub fn value_buckets(&self) -> &OrdMap<String, OrdSet<LabelOccurrence>> {
        &self.by_value
    }

    pub fn by_name(&self) -> LabelNameIndex<'_> {
        LabelNameIndex { index: self }
    }

    pub fn by_value(&self) -> LabelValueIndex<'_> {
        LabelValueIndex { index: self }
    }

    /// Namespaces carrying a single label whose name and value both match.
    pub fn find(
        &self,
        name: Option<&SearchPhrase>,
        value: Option<&SearchPhrase>,
    ) -> SearchResult<NamespaceId> {
        let name = match name {
            Some(phrase) => occurrences(&self.by_name, phrase),
            None => SearchResult::NotUsed,
        };
        let value = match value {
            Some(phrase) => occurrences(&self.by_value, phrase),
            None => SearchResult::NotUsed,
        };
        combine_results_with_and([name, value]).map(|occurrence| occurrence.namespace_id)
    }
}

fn occurrences(buckets: &Buckets, phrase: &SearchPhrase) -> SearchResult<LabelOccurrence> {
    SearchResult::from_results(
        find_by_key(buckets, phrase)
            .into_iter()
            .flat_map(|bucket| bucket.iter().copied()),
    )
}

/// Label-name view of a [`LabelIndex`].
#[derive(Debug, Clone, Copy)]
pub struct LabelNameIndex<'a> {
    index: &'a LabelIndex,
}

impl LabelNameIndex<'_> {
    pub fn occurrences(&self, phrase: &SearchPhrase) -> SearchResult<LabelOccurrence> {
        occurrences(&self.index.by_name, phrase)
    }
}

impl Lookup<NamespaceId> for LabelNameIndex<'_> {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<NamespaceId> {
        self.occurrences(phrase)
            .map(|occurrence| occurrence.namespace_id)
    }
}

/// Label-value view of a [`LabelIndex`].
#[derive(Debug, Clone, Copy)]
pub struct LabelValueIndex<'a> {
    index: &'a LabelIndex,
}

impl LabelValueIndex<'_> {
    pub fn occurrences(&self, phrase: &SearchPhrase) -> SearchResult<LabelOccurrence> {
        occurrences(&self.index.by_value, phrase)
    }
}

impl Lookup<NamespaceId> for LabelValueIndex<'_> {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<NamespaceId> {
        self.occurrences(phrase)
            .map(|occurrence| occurrence.namespace_id)
    }
}

pub fn projection() -> Projection<LabelIndex, NamespaceEvent> {
    Projection::new(LabelIndex::default(), |index, envelope| {
        index.apply(&envelope.metadata, &envelope.event)
    })
}
