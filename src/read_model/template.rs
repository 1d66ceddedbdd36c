use super::index::{NameIndex, add_to_bucket, remove_from_bucket};
use crate::aggregate::{NamespaceEvent, NamespaceTemplateEvent};
use crate::core::{NamespaceId, NamespaceTemplateId};
use crate::projection::Projection;
use crate::search::{Lookup, SearchPhrase, SearchResult};
use crate::store::EventMetadata;
use im::{OrdMap, OrdSet};

/// Template to the namespaces instantiated from it.
///
/// Template names come from template events and the template links from
/// namespace events. The two never touch the same fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateIndex {
    pub by_name: NameIndex<NamespaceTemplateId>,
    namespaces: OrdMap<NamespaceTemplateId, OrdSet<NamespaceId>>,
    template_of: OrdMap<NamespaceId, NamespaceTemplateId>,
}

impl TemplateIndex {
    pub fn apply_template(self, _metadata: &EventMetadata, event: &NamespaceTemplateEvent) -> Self {
        match event {
            NamespaceTemplateEvent::NamespaceTemplateImported { template } => Self {
                by_name: self.by_name.with(template.id, &template.name),
                ..self
            },
            NamespaceTemplateEvent::NamespaceTemplateAdded {
                template_id, name, ..
            } => Self {
                by_name: self.by_name.with(*template_id, name),
                ..self
            },
            NamespaceTemplateEvent::NamespaceTemplateRemoved { template_id } => Self {
                by_name: self.by_name.without(template_id),
                ..self
            },
            NamespaceTemplateEvent::TemplateLabelAdded { .. }
            | NamespaceTemplateEvent::TemplateLabelRemoved { .. } => self,
        }
    }

    pub fn apply_namespace(self, _metadata: &EventMetadata, event: &NamespaceEvent) -> Self {
        match event {
            NamespaceEvent::NamespaceAdded {
                namespace_id,
                template,
                ..
            }
            | NamespaceEvent::NamespaceImported {
                namespace_id,
                template,
                ..
            } => {
                let index = self.unlinked(namespace_id);
                match template {
                    Some(template_id) => Self {
                        namespaces: add_to_bucket(index.namespaces, *template_id, *namespace_id),
                        template_of: index.template_of.update(*namespace_id, *template_id),
                        ..index
                    },
                    None => index,
                }
            }
            NamespaceEvent::NamespaceRemoved { namespace_id } => self.unlinked(namespace_id),
            NamespaceEvent::LabelAdded { .. } | NamespaceEvent::LabelRemoved { .. } => self,
        }
    }

    fn unlinked(self, namespace_id: &NamespaceId) -> Self {
        match self.template_of.get(namespace_id).copied() {
            Some(template_id) => Self {
                namespaces: remove_from_bucket(self.namespaces, &template_id, namespace_id),
                template_of: self.template_of.without(namespace_id),
                ..self
            },
            None => self,
        }
    }

    /// Unlinks namespaces whose owning context was removed.
    pub fn without_namespaces<'a, I>(self, namespace_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a NamespaceId>,
    {
        namespace_ids
            .into_iter()
            .fold(self, |index, namespace_id| index.unlinked(namespace_id))
    }

    pub fn template_of(&self, namespace_id: &NamespaceId) -> Option<NamespaceTemplateId> {
        self.template_of.get(namespace_id).copied()
    }

    pub fn namespaces_of(&self, template_id: &NamespaceTemplateId) -> SearchResult<NamespaceId> {
        SearchResult::from_results(
            self.namespaces
                .get(template_id)
                .into_iter()
                .flat_map(|bucket| bucket.iter().copied()),
        )
    }
}

/// Namespaces instantiated from any template whose name matches.
impl Lookup<NamespaceId> for TemplateIndex {
    fn by_exact_or_pattern(&self, phrase: &SearchPhrase) -> SearchResult<NamespaceId> {
        match self.by_name.by_exact_or_pattern(phrase) {
            SearchResult::Results(templates) => SearchResult::from_results(
                templates
                    .iter()
                    .filter_map(|template_id| self.namespaces.get(template_id))
                    .flat_map(|bucket| bucket.iter().copied()),
            ),
            SearchResult::NoResult => SearchResult::NoResult,
            SearchResult::NotUsed => SearchResult::NotUsed,
        }
    }
}

pub fn template_projection() -> Projection<TemplateIndex, NamespaceTemplateEvent> {
    Projection::new(TemplateIndex::default(), |index, envelope| {
        index.apply_template(&envelope.metadata, &envelope.event)
    })
}

pub fn namespace_projection() -> Projection<TemplateIndex, NamespaceEvent> {
    Projection::new(TemplateIndex::default(), |index, envelope| {
        index.apply_namespace(&envelope.metadata, &envelope.event)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventEnvelope;
    use chrono::Utc;
    use uuid::Uuid;

    fn template_added(id: Uuid, name: &str) -> EventEnvelope<NamespaceTemplateEvent> {
        EventEnvelope::new(
            id,
            Utc::now(),
            NamespaceTemplateEvent::NamespaceTemplateAdded {
                template_id: id,
                name: name.to_string(),
                description: None,
                labels: Vec::new(),
            },
        )
    }

    fn namespace_added(namespace: Uuid, template: Option<Uuid>) -> EventEnvelope<NamespaceEvent> {
        let context = Uuid::new_v4();
        EventEnvelope::new(
            context,
            Utc::now(),
            NamespaceEvent::NamespaceAdded {
                namespace_id: namespace,
                bounded_context_id: context,
                template,
                name: "team".to_string(),
                labels: Vec::new(),
            },
        )
    }

    #[test]
    fn test_template_lookup_returns_namespaces() {
        let team = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let untemplated = Uuid::new_v4();

        let index = template_projection().project(&[template_added(team, "Team")]);
        let index = namespace_projection().project_from(
            index,
            &[
                namespace_added(first, Some(team)),
                namespace_added(second, Some(team)),
                namespace_added(untemplated, None),
            ],
        );

        let phrase = SearchPhrase::from_input("te*").unwrap();
        assert_eq!(
            index.by_exact_or_pattern(&phrase),
            SearchResult::from_results([first, second])
        );
        assert_eq!(index.template_of(&untemplated), None);
    }

    #[test]
    fn test_removed_namespace_unlinks_template() {
        let team = Uuid::new_v4();
        let namespace = Uuid::new_v4();
        let removed = EventEnvelope::new(
            Uuid::new_v4(),
            Utc::now(),
            NamespaceEvent::NamespaceRemoved {
                namespace_id: namespace,
            },
        );
        let index = namespace_projection().project(&[namespace_added(namespace, Some(team)), removed]);
        assert_eq!(index.namespaces_of(&team), SearchResult::NoResult);
        assert_eq!(index, TemplateIndex::default());
    }
}
