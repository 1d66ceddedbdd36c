//! Namespaces and their labels.
//!
//! Namespaces live in the stream of their owning bounded context, so the
//! snapshot of that stream is the whole list of the context's namespaces.
//! Removal is structural: a removed namespace or label simply leaves the list.

use super::{Aggregate, required_name};
use crate::core::{AggregateId, BoundedContextId, CommandError, LabelId, NamespaceId, NamespaceTemplateId};
use crate::projection::Projection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub value: String,
    /// Template label this label was filled in from.
    pub template: Option<LabelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: NamespaceId,
    pub template: Option<NamespaceTemplateId>,
    pub name: String,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDefinition {
    pub label_id: LabelId,
    pub name: String,
    pub value: String,
    pub template: Option<LabelId>,
}

impl LabelDefinition {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label_id: Uuid::new_v4(),
            name: name.into(),
            value: value.into(),
            template: None,
        }
    }

    pub fn from_template(mut self, template_label: LabelId) -> Self {
        self.template = Some(template_label);
        self
    }

    fn to_label(&self) -> Label {
        Label {
            id: self.label_id,
            name: self.name.clone(),
            value: self.value.clone(),
            template: self.template,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceEvent {
    NamespaceAdded {
        namespace_id: NamespaceId,
        bounded_context_id: BoundedContextId,
        template: Option<NamespaceTemplateId>,
        name: String,
        labels: Vec<LabelDefinition>,
    },
    NamespaceImported {
        namespace_id: NamespaceId,
        bounded_context_id: BoundedContextId,
        template: Option<NamespaceTemplateId>,
        name: String,
        labels: Vec<LabelDefinition>,
    },
    NamespaceRemoved {
        namespace_id: NamespaceId,
    },
    LabelAdded {
        label_id: LabelId,
        namespace_id: NamespaceId,
        name: String,
        value: String,
        template: Option<LabelId>,
    },
    LabelRemoved {
        label_id: LabelId,
        namespace_id: NamespaceId,
    },
}

impl NamespaceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            NamespaceEvent::NamespaceAdded { .. } => "NamespaceAdded",
            NamespaceEvent::NamespaceImported { .. } => "NamespaceImported",
            NamespaceEvent::NamespaceRemoved { .. } => "NamespaceRemoved",
            NamespaceEvent::LabelAdded { .. } => "LabelAdded",
            NamespaceEvent::LabelRemoved { .. } => "LabelRemoved",
        }
    }

    pub fn namespace_id(&self) -> NamespaceId {
        match self {
            NamespaceEvent::NamespaceAdded { namespace_id, .. }
            | NamespaceEvent::NamespaceImported { namespace_id, .. }
            | NamespaceEvent::NamespaceRemoved { namespace_id }
            | NamespaceEvent::LabelAdded { namespace_id, .. }
            | NamespaceEvent::LabelRemoved { namespace_id, .. } => *namespace_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceCommand {
    NewNamespace {
        namespace_id: NamespaceId,
        name: String,
        template: Option<NamespaceTemplateId>,
        labels: Vec<LabelDefinition>,
    },
    RemoveNamespace {
        namespace_id: NamespaceId,
    },
    AddLabel {
        namespace_id: NamespaceId,
        label: LabelDefinition,
    },
    RemoveLabel {
        namespace_id: NamespaceId,
        label_id: LabelId,
    },
}

impl NamespaceCommand {
    /// A new namespace with a fresh id.
    pub fn new_namespace(name: impl Into<String>, labels: Vec<LabelDefinition>) -> Self {
        NamespaceCommand::NewNamespace {
            namespace_id: Uuid::new_v4(),
            name: name.into(),
            template: None,
            labels,
        }
    }
}

/// Folds one event into the namespace list of a bounded context.
pub fn evolve(mut namespaces: Vec<Namespace>, event: &NamespaceEvent) -> Vec<Namespace> {
    match event {
        NamespaceEvent::NamespaceAdded {
            namespace_id,
            template,
            name,
            labels,
            ..
        }
        | NamespaceEvent::NamespaceImported {
            namespace_id,
            template,
            name,
            labels,
            ..
        } => {
            namespaces.retain(|namespace| namespace.id != *namespace_id);
            namespaces.push(Namespace {
                id: *namespace_id,
                template: *template,
                name: name.clone(),
                labels: labels.iter().map(LabelDefinition::to_label).collect(),
            });
        }
        NamespaceEvent::NamespaceRemoved { namespace_id } => {
            namespaces.retain(|namespace| namespace.id != *namespace_id);
        }
        NamespaceEvent::LabelAdded {
            label_id,
            namespace_id,
            name,
            value,
            template,
        } => {
            if let Some(namespace) = namespaces.iter_mut().find(|ns| ns.id == *namespace_id) {
                namespace.labels.retain(|label| label.id != *label_id);
                namespace.labels.push(Label {
                    id: *label_id,
                    name: name.clone(),
                    value: value.clone(),
                    template: *template,
                });
            }
        }
        NamespaceEvent::LabelRemoved {
            label_id,
            namespace_id,
        } => {
            if let Some(namespace) = namespaces.iter_mut().find(|ns| ns.id == *namespace_id) {
                namespace.labels.retain(|label| label.id != *label_id);
            }
        }
    }
    namespaces
}

pub fn projection() -> Projection<Vec<Namespace>, NamespaceEvent> {
    Projection::new(Vec::new(), |state, envelope| evolve(state, &envelope.event))
}

pub struct NamespaceAggregate;

impl Aggregate for NamespaceAggregate {
    type Event = NamespaceEvent;
    type Command = NamespaceCommand;
    type State = Vec<Namespace>;

    fn projection() -> Projection<Self::State, Self::Event> {
        projection()
    }

    /// `id` is the owning bounded context.
    fn handle(
        id: AggregateId,
        state: &Vec<Namespace>,
        command: NamespaceCommand,
    ) -> Result<Vec<NamespaceEvent>, CommandError> {
        let find = |namespace_id: NamespaceId| {
            state
                .iter()
                .find(|namespace| namespace.id == namespace_id)
                .ok_or(CommandError::NotFound(namespace_id))
        };

        match command {
            NamespaceCommand::NewNamespace {
                namespace_id,
                name,
                template,
                labels,
            } => {
                if state.iter().any(|namespace| namespace.id == namespace_id) {
                    return Err(CommandError::AlreadyExists(namespace_id));
                }
                let labels = labels
                    .into_iter()
                    .map(validated_label)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(vec![NamespaceEvent::NamespaceAdded {
                    namespace_id,
                    bounded_context_id: id,
                    template,
                    name: required_name(&name)?,
                    labels,
                }])
            }
            NamespaceCommand::RemoveNamespace { namespace_id } => {
                find(namespace_id)?;
                Ok(vec![NamespaceEvent::NamespaceRemoved { namespace_id }])
            }
            NamespaceCommand::AddLabel {
                namespace_id,
                label,
            } => {
                find(namespace_id)?;
                let label = validated_label(label)?;
                Ok(vec![NamespaceEvent::LabelAdded {
                    label_id: label.label_id,
                    namespace_id,
                    name: label.name,
                    value: label.value,
                    template: label.template,
                }])
            }
            NamespaceCommand::RemoveLabel {
                namespace_id,
                label_id,
            } => {
                let namespace = find(namespace_id)?;
                if !namespace.labels.iter().any(|label| label.id == label_id) {
                    return Err(CommandError::LabelNotFound {
                        owner_id: namespace_id,
                        label_id,
                    });
                }
                Ok(vec![NamespaceEvent::LabelRemoved {
                    label_id,
                    namespace_id,
                }])
            }
        }
    }
}

fn validated_label(label: LabelDefinition) -> Result<LabelDefinition, CommandError> {
    Ok(LabelDefinition {
        name: required_name(&label.name)?,
        value: label.value.trim().to_string(),
        ..label
    })
}
