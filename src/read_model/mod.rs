//! Denormalized lookup structures folded from the event log.
//!
//! Every index is a pure fold and can be thrown away and rebuilt from the
//! store at any time. [`LiveReadModels`] keeps one current incrementally.

pub mod bounded_context;
pub mod domain;
pub mod index;
pub mod label;
pub mod namespace;
pub mod template;

pub use bounded_context::BoundedContextIndex;
pub use domain::DomainIndex;
pub use index::{KeyIndex, NameIndex};
pub use label::{
    LabelEntry, LabelIndex, LabelNameIndex, LabelOccurrence, LabelValueIndex, NamespaceLabels,
};
pub use namespace::NamespaceIndex;
pub use template::TemplateIndex;

use crate::aggregate::{BoundedContextEvent, CatalogEvent, NamespaceEvent};
use crate::core::{BoundedContextId, Result};
use crate::store::{EventEnvelope, EventStore, SharedEnvelope};
use std::sync::{Arc, Mutex};
use tracing::{Level, event};

/// Every read-model index of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadModels {
    pub domains: DomainIndex,
    pub bounded_contexts: BoundedContextIndex,
    pub namespaces: NamespaceIndex,
    pub labels: LabelIndex,
    pub templates: TemplateIndex,
}

impl ReadModels {
    /// Folds every index over the whole log, in append order.
    pub fn rebuild(store: &EventStore) -> Result<Self> {
        let log = store.all()?;
        Ok(Self::default().apply_all(log.iter().map(|envelope| &**envelope)))
    }

    /// Folds one envelope of any kind into the indices it concerns.
    pub fn apply(self, envelope: &EventEnvelope<CatalogEvent>) -> Self {
        let metadata = &envelope.metadata;
        match &envelope.event {
            CatalogEvent::Domain(event) => Self {
                domains: self.domains.apply(metadata, event),
                ..self
            },
            CatalogEvent::BoundedContext(event) => {
                let models = Self {
                    bounded_contexts: self.bounded_contexts.apply(metadata, event),
                    ..self
                };
                match event {
                    BoundedContextEvent::BoundedContextRemoved {
                        bounded_context_id, ..
                    } => models.without_context(bounded_context_id),
                    _ => models,
                }
            }
            CatalogEvent::Namespace(event) => {
                if let Some(bounded_context_id) = added_to(event) {
                    if self.bounded_contexts.is_removed(&bounded_context_id) {
                        event!(
                            Level::WARN,
                            bounded_context_id = %bounded_context_id,
                            event_type = event.event_type(),
                            "namespace added to removed bounded context ignored"
                        );
                        return self;
                    }
                }
                Self {
                    namespaces: self.namespaces.apply(metadata, event),
                    labels: self.labels.apply(metadata, event),
                    templates: self.templates.apply_namespace(metadata, event),
                    ..self
                }
            }
            CatalogEvent::NamespaceTemplate(event) => Self {
                templates: self.templates.apply_template(metadata, event),
                ..self
            },
            CatalogEvent::Collaboration(_) => self,
        }
    }

    /// Namespaces live and die with their bounded context.
    fn without_context(self, bounded_context_id: &BoundedContextId) -> Self {
        let owned = self.namespaces.namespaces_of(bounded_context_id);
        Self {
            namespaces: self.namespaces.without_context(bounded_context_id),
            labels: self.labels.without_context(bounded_context_id),
            templates: self.templates.without_namespaces(&owned),
            ..self
        }
    }

    pub fn apply_all<'a, I>(self, envelopes: I) -> Self
    where
        I: IntoIterator<Item = &'a EventEnvelope<CatalogEvent>>,
    {
        envelopes
            .into_iter()
            .fold(self, |models, envelope| models.apply(envelope))
    }
}

fn added_to(event: &NamespaceEvent) -> Option<BoundedContextId> {
    match event {
        NamespaceEvent::NamespaceAdded {
            bounded_context_id, ..
        }
        | NamespaceEvent::NamespaceImported {
            bounded_context_id, ..
        } => Some(*bounded_context_id),
        NamespaceEvent::NamespaceRemoved { .. }
        | NamespaceEvent::LabelAdded { .. }
        | NamespaceEvent::LabelRemoved { .. } => None,
    }
}

struct LiveState {
    models: ReadModels,
    /// Number of log envelopes folded so far.
    position: usize,
}

impl LiveState {
    fn receive(&mut self, first_position: usize, batch: &[SharedEnvelope]) {
        let end = first_position + batch.len();
        if end <= self.position {
            return;
        }
        if first_position > self.position {
            event!(
                Level::WARN,
                expected = self.position,
                received = first_position,
                "gap in live read model feed"
            );
            return;
        }
        let fresh = &batch[self.position - first_position..];
        let models = std::mem::take(&mut self.models);
        self.models = models.apply_all(fresh.iter().map(|envelope| &**envelope));
        self.position = end;
    }
}

/// Read models kept current by a store subscription.
///
/// At every point the content equals [`ReadModels::rebuild`] over the prefix
/// of the log it has seen.
#[derive(Clone)]
pub struct LiveReadModels {
    state: Arc<Mutex<LiveState>>,
}

impl LiveReadModels {
    /// Subscribes to `store` and catches up on its existing history.
    ///
    /// The state lock is held across subscribe and catch-up, so a batch
    /// appended meanwhile is either part of the catch-up or delivered after
    /// it; batches already covered are skipped by position.
    pub fn attach(store: &EventStore) -> Result<Self> {
        let state = Arc::new(Mutex::new(LiveState {
            models: ReadModels::default(),
            position: 0,
        }));

        {
            let mut guard = state.lock()?;
            let sink = Arc::clone(&state);
            store.subscribe(Arc::new(move |first_position: usize, batch: &[SharedEnvelope]| {
                match sink.lock() {
                    Ok(mut live) => live.receive(first_position, batch),
                    Err(err) => {
                        event!(Level::ERROR, error = %err, "live read models lock poisoned")
                    }
                }
            }))?;

            let history = store.all()?;
            guard.models = ReadModels::default()
                .apply_all(history.iter().map(|envelope| &**envelope));
            guard.position = history.len();
            event!(Level::DEBUG, position = guard.position, "live read models attached");
        }

        Ok(Self { state })
    }

    pub fn current(&self) -> Result<ReadModels> {
        Ok(self.state.lock()?.models.clone())
    }

    pub fn position(&self) -> Result<usize> {
        Ok(self.state.lock()?.position)
    }
}
