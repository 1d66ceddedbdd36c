use super::{Aggregate, optional_text};
use crate::core::{AggregateId, BoundedContextId, CollaborationId, CommandError, DomainId};
use crate::projection::Projection;
use crate::store::EventEnvelope;
use im::OrdMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collaborator {
    BoundedContext(BoundedContextId),
    Domain(DomainId),
    ExternalSystem(String),
    Frontend(String),
    UserInteraction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamRole {
    Upstream,
    PublishedLanguage,
    OpenHost,
    Supplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownstreamRole {
    Downstream,
    AntiCorruptionLayer,
    Conformist,
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Partnership,
    SharedKernel,
    SeparateWays,
    BigBallOfMud,
    UpstreamDownstream {
        upstream: UpstreamRole,
        downstream: DownstreamRole,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: CollaborationId,
    pub description: Option<String>,
    pub initiator: Collaborator,
    pub recipient: Collaborator,
    pub relationship: Option<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaborationEvent {
    CollaborationImported {
        collaboration: Collaboration,
    },
    ConnectionDefined {
        collaboration_id: CollaborationId,
        description: Option<String>,
        initiator: Collaborator,
        recipient: Collaborator,
    },
    RelationshipDefined {
        collaboration_id: CollaborationId,
        relationship: Option<Relationship>,
    },
    ConnectionRemoved {
        collaboration_id: CollaborationId,
    },
}

impl CollaborationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CollaborationEvent::CollaborationImported { .. } => "CollaborationImported",
            CollaborationEvent::ConnectionDefined { .. } => "ConnectionDefined",
            CollaborationEvent::RelationshipDefined { .. } => "RelationshipDefined",
            CollaborationEvent::ConnectionRemoved { .. } => "ConnectionRemoved",
        }
    }

    pub fn collaboration_id(&self) -> CollaborationId {
        match self {
            CollaborationEvent::CollaborationImported { collaboration } => collaboration.id,
            CollaborationEvent::ConnectionDefined {
                collaboration_id, ..
            }
            | CollaborationEvent::RelationshipDefined {
                collaboration_id, ..
            }
            | CollaborationEvent::ConnectionRemoved { collaboration_id } => *collaboration_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaborationCommand {
    DefineConnection {
        description: Option<String>,
        initiator: Collaborator,
        recipient: Collaborator,
    },
    DefineRelationship {
        relationship: Option<Relationship>,
    },
    RemoveConnection,
}

pub fn evolve(state: Option<Collaboration>, event: &CollaborationEvent) -> Option<Collaboration> {
    match event {
        CollaborationEvent::CollaborationImported { collaboration } => Some(collaboration.clone()),
        CollaborationEvent::ConnectionDefined {
            collaboration_id,
            description,
            initiator,
            recipient,
        } => Some(Collaboration {
            id: *collaboration_id,
            description: description.clone(),
            initiator: initiator.clone(),
            recipient: recipient.clone(),
            relationship: None,
        }),
        CollaborationEvent::RelationshipDefined { relationship, .. } => {
            state.map(|collaboration| Collaboration {
                relationship: *relationship,
                ..collaboration
            })
        }
        CollaborationEvent::ConnectionRemoved { .. } => None,
    }
}

pub fn projection() -> Projection<Option<Collaboration>, CollaborationEvent> {
    Projection::new(None, |state, envelope| evolve(state, &envelope.event))
}

pub fn all_collaborations() -> Projection<OrdMap<CollaborationId, Collaboration>, CollaborationEvent>
{
    Projection::new(OrdMap::new(), apply_to_all)
}

fn apply_to_all(
    collaborations: OrdMap<CollaborationId, Collaboration>,
    envelope: &EventEnvelope<CollaborationEvent>,
) -> OrdMap<CollaborationId, Collaboration> {
    let id = envelope.event.collaboration_id();
    match evolve(collaborations.get(&id).cloned(), &envelope.event) {
        Some(collaboration) => collaborations.update(id, collaboration),
        None => collaborations.without(&id),
    }
}

/// Collaborations where `collaborator` is initiator or recipient.
pub fn collaborations_of<'a>(
    collaborations: &'a OrdMap<CollaborationId, Collaboration>,
    collaborator: &Collaborator,
) -> Vec<&'a Collaboration> {
    collaborations
        .values()
        .filter(|collaboration| {
            collaboration.initiator == *collaborator || collaboration.recipient == *collaborator
        })
        .collect()
}

pub struct CollaborationAggregate;

impl Aggregate for CollaborationAggregate {
    type Event = CollaborationEvent;
    type Command = CollaborationCommand;
    type State = Option<Collaboration>;

    fn projection() -> Projection<Self::State, Self::Event> {
        projection()
    }

    fn handle(
        id: AggregateId,
        state: &Option<Collaboration>,
        command: CollaborationCommand,
    ) -> Result<Vec<CollaborationEvent>, CommandError> {
        match command {
            CollaborationCommand::DefineConnection {
                description,
                initiator,
                recipient,
            } => {
                if state.is_some() {
                    return Err(CommandError::AlreadyExists(id));
                }
                Ok(vec![CollaborationEvent::ConnectionDefined {
                    collaboration_id: id,
                    description: optional_text(description),
                    initiator,
                    recipient,
                }])
            }
            CollaborationCommand::DefineRelationship { relationship } => {
                state.as_ref().ok_or(CommandError::NotFound(id))?;
                Ok(vec![CollaborationEvent::RelationshipDefined {
                    collaboration_id: id,
                    relationship,
                }])
            }
            CollaborationCommand::RemoveConnection => {
                state.as_ref().ok_or(CommandError::NotFound(id))?;
                Ok(vec![CollaborationEvent::ConnectionRemoved {
                    collaboration_id: id,
                }])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn envelope(event: CollaborationEvent) -> EventEnvelope<CollaborationEvent> {
        EventEnvelope::new(event.collaboration_id(), Utc::now(), event)
    }

    #[test]
    fn test_relationship_refines_connection() {
        let id = Uuid::new_v4();
        let ordering = Collaborator::BoundedContext(Uuid::new_v4());
        let billing = Collaborator::BoundedContext(Uuid::new_v4());
        let relationship = Relationship::UpstreamDownstream {
            upstream: UpstreamRole::OpenHost,
            downstream: DownstreamRole::AntiCorruptionLayer,
        };
        let history = vec![
            envelope(CollaborationEvent::ConnectionDefined {
                collaboration_id: id,
                description: None,
                initiator: ordering.clone(),
                recipient: billing.clone(),
            }),
            envelope(CollaborationEvent::RelationshipDefined {
                collaboration_id: id,
                relationship: Some(relationship),
            }),
        ];

        let collaboration = projection().project(&history).unwrap();
        assert_eq!(collaboration.relationship, Some(relationship));

        let all = all_collaborations().project(&history);
        assert_eq!(collaborations_of(&all, &billing).len(), 1);
        assert!(collaborations_of(&all, &Collaborator::Frontend("web".into())).is_empty());
    }

    #[test]
    fn test_removed_connection_is_gone() {
        let id = Uuid::new_v4();
        let history = vec![
            envelope(CollaborationEvent::ConnectionDefined {
                collaboration_id: id,
                description: Some("orders".to_string()),
                initiator: Collaborator::ExternalSystem("ERP".to_string()),
                recipient: Collaborator::Domain(Uuid::new_v4()),
            }),
            envelope(CollaborationEvent::ConnectionRemoved { collaboration_id: id }),
        ];
        assert_eq!(projection().project(&history), None);
        assert!(all_collaborations().project(&history).is_empty());
    }

    #[test]
    fn test_relationship_requires_connection() {
        let id = Uuid::new_v4();
        assert_eq!(
            CollaborationAggregate::handle(
                id,
                &None,
                CollaborationCommand::DefineRelationship { relationship: None }
            ),
            Err(CommandError::NotFound(id))
        );
    }
}
