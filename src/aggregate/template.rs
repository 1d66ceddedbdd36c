use super::{Aggregate, optional_text, required_name};
use crate::core::{AggregateId, CommandError, LabelId, NamespaceTemplateId};
use crate::projection::Projection;
use crate::store::EventEnvelope;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLabel {
    pub id: LabelId,
    pub name: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
}

impl TemplateLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            placeholder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTemplate {
    pub id: NamespaceTemplateId,
    pub name: String,
    pub description: Option<String>,
    pub labels: Vec<TemplateLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceTemplateEvent {
    NamespaceTemplateImported {
        template: NamespaceTemplate,
    },
    NamespaceTemplateAdded {
        template_id: NamespaceTemplateId,
        name: String,
        description: Option<String>,
        labels: Vec<TemplateLabel>,
    },
    TemplateLabelAdded {
        template_id: NamespaceTemplateId,
        label: TemplateLabel,
    },
    TemplateLabelRemoved {
        template_id: NamespaceTemplateId,
        label_id: LabelId,
    },
    NamespaceTemplateRemoved {
        template_id: NamespaceTemplateId,
    },
}

impl NamespaceTemplateEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            NamespaceTemplateEvent::NamespaceTemplateImported { .. } => "NamespaceTemplateImported",
            NamespaceTemplateEvent::NamespaceTemplateAdded { .. } => "NamespaceTemplateAdded",
            NamespaceTemplateEvent::TemplateLabelAdded { .. } => "TemplateLabelAdded",
            NamespaceTemplateEvent::TemplateLabelRemoved { .. } => "TemplateLabelRemoved",
            NamespaceTemplateEvent::NamespaceTemplateRemoved { .. } => "NamespaceTemplateRemoved",
        }
    }

    pub fn template_id(&self) -> NamespaceTemplateId {
        match self {
            NamespaceTemplateEvent::NamespaceTemplateImported { template } => template.id,
            NamespaceTemplateEvent::NamespaceTemplateAdded { template_id, .. }
            | NamespaceTemplateEvent::TemplateLabelAdded { template_id, .. }
            | NamespaceTemplateEvent::TemplateLabelRemoved { template_id, .. }
            | NamespaceTemplateEvent::NamespaceTemplateRemoved { template_id } => *template_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceTemplateCommand {
    NewNamespaceTemplate {
        name: String,
        description: Option<String>,
        labels: Vec<TemplateLabel>,
    },
    AddTemplateLabel {
        label: TemplateLabel,
    },
    RemoveTemplateLabel {
        label_id: LabelId,
    },
    RemoveTemplate,
}

pub fn evolve(
    state: Option<NamespaceTemplate>,
    event: &NamespaceTemplateEvent,
) -> Option<NamespaceTemplate> {
    match event {
        NamespaceTemplateEvent::NamespaceTemplateImported { template } => Some(template.clone()),
        NamespaceTemplateEvent::NamespaceTemplateAdded {
            template_id,
            name,
            description,
            labels,
        } => Some(NamespaceTemplate {
            id: *template_id,
            name: name.clone(),
            description: description.clone(),
            labels: labels.clone(),
        }),
        NamespaceTemplateEvent::TemplateLabelAdded { label, .. } => {
            state.map(|mut template| {
                template.labels.retain(|existing| existing.id != label.id);
                template.labels.push(label.clone());
                template
            })
        }
        NamespaceTemplateEvent::TemplateLabelRemoved { label_id, .. } => {
            state.map(|mut template| {
                template.labels.retain(|existing| existing.id != *label_id);
                template
            })
        }
        NamespaceTemplateEvent::NamespaceTemplateRemoved { .. } => None,
    }
}

pub fn projection() -> Projection<Option<NamespaceTemplate>, NamespaceTemplateEvent> {
    Projection::new(None, |state, envelope| evolve(state, &envelope.event))
}

pub fn all_templates()
-> Projection<OrdMap<NamespaceTemplateId, NamespaceTemplate>, NamespaceTemplateEvent> {
    Projection::new(OrdMap::new(), apply_to_all)
}

fn apply_to_all(
    templates: OrdMap<NamespaceTemplateId, NamespaceTemplate>,
    envelope: &EventEnvelope<NamespaceTemplateEvent>,
) -> OrdMap<NamespaceTemplateId, NamespaceTemplate> {
    let id = envelope.event.template_id();
    match evolve(templates.get(&id).cloned(), &envelope.event) {
        Some(template) => templates.update(id, template),
        None => templates.without(&id),
    }
}

pub struct NamespaceTemplateAggregate;

impl Aggregate for NamespaceTemplateAggregate {
    type Event = NamespaceTemplateEvent;
    type Command = NamespaceTemplateCommand;
    type State = Option<NamespaceTemplate>;

    fn projection() -> Projection<Self::State, Self::Event> {
        projection()
    }

    fn handle(
        id: AggregateId,
        state: &Option<NamespaceTemplate>,
        command: NamespaceTemplateCommand,
    ) -> Result<Vec<NamespaceTemplateEvent>, CommandError> {
        match command {
            NamespaceTemplateCommand::NewNamespaceTemplate {
                name,
                description,
                labels,
            } => {
                if state.is_some() {
                    return Err(CommandError::AlreadyExists(id));
                }
                let labels = labels
                    .into_iter()
                    .map(validated_label)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(vec![NamespaceTemplateEvent::NamespaceTemplateAdded {
                    template_id: id,
                    name: required_name(&name)?,
                    description: optional_text(description),
                    labels,
                }])
            }
            NamespaceTemplateCommand::AddTemplateLabel { label } => {
                state.as_ref().ok_or(CommandError::NotFound(id))?;
                Ok(vec![NamespaceTemplateEvent::TemplateLabelAdded {
                    template_id: id,
                    label: validated_label(label)?,
                }])
            }
            NamespaceTemplateCommand::RemoveTemplateLabel { label_id } => {
                let template = state.as_ref().ok_or(CommandError::NotFound(id))?;
                if !template.labels.iter().any(|label| label.id == label_id) {
                    return Err(CommandError::LabelNotFound {
                        owner_id: id,
                        label_id,
                    });
                }
                Ok(vec![NamespaceTemplateEvent::TemplateLabelRemoved {
                    template_id: id,
                    label_id,
                }])
            }
            NamespaceTemplateCommand::RemoveTemplate => {
                state.as_ref().ok_or(CommandError::NotFound(id))?;
                Ok(vec![NamespaceTemplateEvent::NamespaceTemplateRemoved {
                    template_id: id,
                }])
            }
        }
    }
}

fn validated_label(label: TemplateLabel) -> Result<TemplateLabel, CommandError> {
    Ok(TemplateLabel {
        name: required_name(&label.name)?,
        description: optional_text(label.description),
        placeholder: optional_text(label.placeholder),
        ..label
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn envelope(event: NamespaceTemplateEvent) -> EventEnvelope<NamespaceTemplateEvent> {
        EventEnvelope::new(event.template_id(), Utc::now(), event)
    }

    #[test]
    fn test_template_labels() {
        let id = Uuid::new_v4();
        let owner = TemplateLabel::new("owner");
        let tier = TemplateLabel::new("tier");
        let history = vec![
            envelope(NamespaceTemplateEvent::NamespaceTemplateAdded {
                template_id: id,
                name: "service".to_string(),
                description: None,
                labels: vec![owner.clone()],
            }),
            envelope(NamespaceTemplateEvent::TemplateLabelAdded {
                template_id: id,
                label: tier.clone(),
            }),
            envelope(NamespaceTemplateEvent::TemplateLabelRemoved {
                template_id: id,
                label_id: owner.id,
            }),
        ];

        let template = projection().project(&history).unwrap();
        assert_eq!(template.labels, vec![tier]);
    }

    #[test]
    fn test_removed_template_leaves_all_templates() {
        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = |id: Uuid, name: &str| {
            envelope(NamespaceTemplateEvent::NamespaceTemplateAdded {
                template_id: id,
                name: name.to_string(),
                description: None,
                labels: Vec::new(),
            })
        };
        let history = vec![
            added(kept, "kept"),
            added(removed, "removed"),
            envelope(NamespaceTemplateEvent::NamespaceTemplateRemoved { template_id: removed }),
        ];
        let templates = all_templates().project(&history);
        assert_eq!(templates.len(), 1);
        assert!(templates.contains_key(&kept));
    }

    #[test]
    fn test_blank_template_label_rejected() {
        let id = Uuid::new_v4();
        let result = NamespaceTemplateAggregate::handle(
            id,
            &None,
            NamespaceTemplateCommand::NewNamespaceTemplate {
                name: "service".to_string(),
                description: None,
                labels: vec![TemplateLabel::new("  ")],
            },
        );
        assert_eq!(result, Err(CommandError::EmptyName));
    }
}
