use super::{Aggregate, optional_key, optional_text, required_name};
use crate::core::{AggregateId, BoundedContextId, CommandError, DomainId};
use crate::projection::Projection;
use crate::search::normalize;
use crate::store::EventEnvelope;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainType {
    Core,
    Supporting,
    Generic,
    OtherDomainType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessModel {
    Revenue,
    Engagement,
    Compliance,
    CostReduction,
    OtherBusinessModel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evolution {
    Genesis,
    CustomBuilt,
    Product,
    Commodity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicClassification {
    pub domain_type: Option<DomainType>,
    pub business_model: Vec<BusinessModel>,
    pub evolution: Option<Evolution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDecision {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTerm {
    pub term: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRole {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    pub commands_handled: Vec<String>,
    pub commands_sent: Vec<String>,
    pub events_handled: Vec<String>,
    pub events_published: Vec<String>,
    pub queries_handled: Vec<String>,
    pub queries_invoked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedContext {
    pub id: BoundedContextId,
    pub domain_id: DomainId,
    pub key: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub classification: StrategicClassification,
    pub business_decisions: Vec<BusinessDecision>,
    /// Keyed by the term's normalized spelling.
    pub ubiquitous_language: BTreeMap<String, LanguageTerm>,
    pub domain_roles: Vec<DomainRole>,
    pub messages: Messages,
}

impl BoundedContext {
    fn created(id: BoundedContextId, domain_id: DomainId, name: String) -> Self {
        Self {
            id,
            domain_id,
            key: None,
            name,
            description: None,
            classification: StrategicClassification::default(),
            business_decisions: Vec::new(),
            ubiquitous_language: BTreeMap::new(),
            domain_roles: Vec::new(),
            messages: Messages::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundedContextEvent {
    BoundedContextImported {
        bounded_context: BoundedContext,
    },
    BoundedContextCreated {
        bounded_context_id: BoundedContextId,
        domain_id: DomainId,
        name: String,
    },
    BoundedContextRenamed {
        bounded_context_id: BoundedContextId,
        name: String,
    },
    KeyAssigned {
        bounded_context_id: BoundedContextId,
        key: Option<String>,
    },
    BoundedContextReclassified {
        bounded_context_id: BoundedContextId,
        classification: StrategicClassification,
    },
    DescriptionChanged {
        bounded_context_id: BoundedContextId,
        description: Option<String>,
    },
    BusinessDecisionsUpdated {
        bounded_context_id: BoundedContextId,
        business_decisions: Vec<BusinessDecision>,
    },
    UbiquitousLanguageUpdated {
        bounded_context_id: BoundedContextId,
        ubiquitous_language: BTreeMap<String, LanguageTerm>,
    },
    DomainRolesUpdated {
        bounded_context_id: BoundedContextId,
        domain_roles: Vec<DomainRole>,
    },
    MessagesUpdated {
        bounded_context_id: BoundedContextId,
        messages: Messages,
    },
    BoundedContextMovedToDomain {
        bounded_context_id: BoundedContextId,
        domain_id: DomainId,
    },
    BoundedContextRemoved {
        bounded_context_id: BoundedContextId,
        domain_id: DomainId,
    },
}

impl BoundedContextEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BoundedContextEvent::BoundedContextImported { .. } => "BoundedContextImported",
            BoundedContextEvent::BoundedContextCreated { .. } => "BoundedContextCreated",
            BoundedContextEvent::BoundedContextRenamed { .. } => "BoundedContextRenamed",
            BoundedContextEvent::KeyAssigned { .. } => "KeyAssigned",
            BoundedContextEvent::BoundedContextReclassified { .. } => "BoundedContextReclassified",
            BoundedContextEvent::DescriptionChanged { .. } => "DescriptionChanged",
            BoundedContextEvent::BusinessDecisionsUpdated { .. } => "BusinessDecisionsUpdated",
            BoundedContextEvent::UbiquitousLanguageUpdated { .. } => "UbiquitousLanguageUpdated",
            BoundedContextEvent::DomainRolesUpdated { .. } => "DomainRolesUpdated",
            BoundedContextEvent::MessagesUpdated { .. } => "MessagesUpdated",
            BoundedContextEvent::BoundedContextMovedToDomain { .. } => {
                "BoundedContextMovedToDomain"
            }
            BoundedContextEvent::BoundedContextRemoved { .. } => "BoundedContextRemoved",
        }
    }

    pub fn bounded_context_id(&self) -> BoundedContextId {
        match self {
            BoundedContextEvent::BoundedContextImported { bounded_context } => bounded_context.id,
            BoundedContextEvent::BoundedContextCreated {
                bounded_context_id, ..
            }
            | BoundedContextEvent::BoundedContextRenamed {
                bounded_context_id, ..
            }
            | BoundedContextEvent::KeyAssigned {
                bounded_context_id, ..
            }
            | BoundedContextEvent::BoundedContextReclassified {
                bounded_context_id, ..
            }
            | BoundedContextEvent::DescriptionChanged {
                bounded_context_id, ..
            }
            | BoundedContextEvent::BusinessDecisionsUpdated {
                bounded_context_id, ..
            }
            | BoundedContextEvent::UbiquitousLanguageUpdated {
                bounded_context_id, ..
            }
            | BoundedContextEvent::DomainRolesUpdated {
                bounded_context_id, ..
            }
            | BoundedContextEvent::MessagesUpdated {
                bounded_context_id, ..
            }
            | BoundedContextEvent::BoundedContextMovedToDomain {
                bounded_context_id, ..
            }
            | BoundedContextEvent::BoundedContextRemoved {
                bounded_context_id, ..
            } => *bounded_context_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundedContextCommand {
    CreateBoundedContext { domain_id: DomainId, name: String },
    RenameBoundedContext { name: String },
    AssignKey { key: Option<String> },
    ReclassifyBoundedContext { classification: StrategicClassification },
    ChangeDescription { description: Option<String> },
    UpdateBusinessDecisions { business_decisions: Vec<BusinessDecision> },
    UpdateUbiquitousLanguage { terms: Vec<LanguageTerm> },
    UpdateDomainRoles { domain_roles: Vec<DomainRole> },
    UpdateMessages { messages: Messages },
    MoveBoundedContextToDomain { domain_id: DomainId },
    RemoveBoundedContext,
}

pub fn evolve(state: Option<BoundedContext>, event: &BoundedContextEvent) -> Option<BoundedContext> {
    use BoundedContextEvent as E;

    match event {
        E::BoundedContextImported { bounded_context } => Some(bounded_context.clone()),
        E::BoundedContextCreated {
            bounded_context_id,
            domain_id,
            name,
        } => Some(BoundedContext::created(
            *bounded_context_id,
            *domain_id,
            name.clone(),
        )),
        E::BoundedContextRenamed { name, .. } => state.map(|context| BoundedContext {
            name: name.clone(),
            ..context
        }),
        E::KeyAssigned { key, .. } => state.map(|context| BoundedContext {
            key: key.clone(),
            ..context
        }),
        E::BoundedContextReclassified { classification, .. } => {
            state.map(|context| BoundedContext {
                classification: classification.clone(),
                ..context
            })
        }
        E::DescriptionChanged { description, .. } => state.map(|context| BoundedContext {
            description: description.clone(),
            ..context
        }),
        E::BusinessDecisionsUpdated {
            business_decisions, ..
        } => state.map(|context| BoundedContext {
            business_decisions: business_decisions.clone(),
            ..context
        }),
        E::UbiquitousLanguageUpdated {
            ubiquitous_language,
            ..
        } => state.map(|context| BoundedContext {
            ubiquitous_language: ubiquitous_language.clone(),
            ..context
        }),
        E::DomainRolesUpdated { domain_roles, .. } => state.map(|context| BoundedContext {
            domain_roles: domain_roles.clone(),
            ..context
        }),
        E::MessagesUpdated { messages, .. } => state.map(|context| BoundedContext {
            messages: messages.clone(),
            ..context
        }),
        E::BoundedContextMovedToDomain { domain_id, .. } => state.map(|context| BoundedContext {
            domain_id: *domain_id,
            ..context
        }),
        E::BoundedContextRemoved { .. } => None,
    }
}

pub fn projection() -> Projection<Option<BoundedContext>, BoundedContextEvent> {
    Projection::new(None, |state, envelope| evolve(state, &envelope.event))
}

/// Every live bounded context; keys stay unique across all of them.
pub fn all_bounded_contexts()
-> Projection<OrdMap<BoundedContextId, BoundedContext>, BoundedContextEvent> {
    Projection::new(OrdMap::new(), apply_to_all)
}

fn apply_to_all(
    contexts: OrdMap<BoundedContextId, BoundedContext>,
    envelope: &EventEnvelope<BoundedContextEvent>,
) -> OrdMap<BoundedContextId, BoundedContext> {
    let event = &envelope.event;
    let id = event.bounded_context_id();

    let contexts = match event {
        BoundedContextEvent::KeyAssigned { .. } if !contexts.contains_key(&id) => {
            event!(
                Level::WARN,
                bounded_context_id = %id,
                "key assigned to unknown bounded context ignored"
            );
            return contexts;
        }
        BoundedContextEvent::KeyAssigned { key: Some(key), .. } => {
            release_key(contexts, id, key)
        }
        BoundedContextEvent::BoundedContextImported {
            bounded_context: BoundedContext { key: Some(key), .. },
        } => release_key(contexts, id, key),
        _ => contexts,
    };

    match evolve(contexts.get(&id).cloned(), event) {
        Some(context) => contexts.update(id, context),
        None => contexts.without(&id),
    }
}

fn release_key(
    contexts: OrdMap<BoundedContextId, BoundedContext>,
    owner: BoundedContextId,
    key: &str,
) -> OrdMap<BoundedContextId, BoundedContext> {
    let key = normalize(key);
    let holders: Vec<BoundedContextId> = contexts
        .iter()
        .filter(|(id, context)| {
            **id != owner
                && context.key.as_deref().map(normalize).as_deref() == Some(key.as_str())
        })
        .map(|(id, _)| *id)
        .collect();

    holders
        .into_iter()
        .fold(contexts, |contexts, id| match contexts.get(&id).cloned() {
            Some(context) => contexts.update(id, BoundedContext { key: None, ..context }),
            None => contexts,
        })
}

pub fn bounded_contexts_of(
    contexts: &OrdMap<BoundedContextId, BoundedContext>,
    domain_id: DomainId,
) -> Vec<&BoundedContext> {
    contexts
        .values()
        .filter(|context| context.domain_id == domain_id)
        .collect()
}

pub struct BoundedContextAggregate;

impl Aggregate for BoundedContextAggregate {
    type Event = BoundedContextEvent;
    type Command = BoundedContextCommand;
    type State = Option<BoundedContext>;

    fn projection() -> Projection<Self::State, Self::Event> {
        projection()
    }

    fn handle(
        id: AggregateId,
        state: &Option<BoundedContext>,
        command: BoundedContextCommand,
    ) -> Result<Vec<BoundedContextEvent>, CommandError> {
        use BoundedContextCommand as C;
        use BoundedContextEvent as E;

        if !matches!(command, C::CreateBoundedContext { .. }) && state.is_none() {
            return Err(CommandError::NotFound(id));
        }

        let event = match command {
            C::CreateBoundedContext { domain_id, name } => {
                if state.is_some() {
                    return Err(CommandError::AlreadyExists(id));
                }
                E::BoundedContextCreated {
                    bounded_context_id: id,
                    domain_id,
                    name: required_name(&name)?,
                }
            }
            C::RenameBoundedContext { name } => E::BoundedContextRenamed {
                bounded_context_id: id,
                name: required_name(&name)?,
            },
            C::AssignKey { key } => E::KeyAssigned {
                bounded_context_id: id,
                key: optional_key(key)?,
            },
            C::ReclassifyBoundedContext { classification } => E::BoundedContextReclassified {
                bounded_context_id: id,
                classification,
            },
            C::ChangeDescription { description } => E::DescriptionChanged {
                bounded_context_id: id,
                description: optional_text(description),
            },
            C::UpdateBusinessDecisions { business_decisions } => {
                for decision in &business_decisions {
                    required_name(&decision.name)?;
                }
                E::BusinessDecisionsUpdated {
                    bounded_context_id: id,
                    business_decisions,
                }
            }
            C::UpdateUbiquitousLanguage { terms } => {
                let mut ubiquitous_language = BTreeMap::new();
                for term in terms {
                    let spelling = required_name(&term.term)?;
                    ubiquitous_language.insert(
                        normalize(&spelling),
                        LanguageTerm {
                            term: spelling,
                            description: optional_text(term.description),
                        },
                    );
                }
                E::UbiquitousLanguageUpdated {
                    bounded_context_id: id,
                    ubiquitous_language,
                }
            }
            C::UpdateDomainRoles { domain_roles } => {
                for role in &domain_roles {
                    required_name(&role.name)?;
                }
                E::DomainRolesUpdated {
                    bounded_context_id: id,
                    domain_roles,
                }
            }
            C::UpdateMessages { messages } => E::MessagesUpdated {
                bounded_context_id: id,
                messages,
            },
            C::MoveBoundedContextToDomain { domain_id } => E::BoundedContextMovedToDomain {
                bounded_context_id: id,
                domain_id,
            },
            C::RemoveBoundedContext => match state {
                Some(context) => E::BoundedContextRemoved {
                    bounded_context_id: id,
                    domain_id: context.domain_id,
                },
                None => return Err(CommandError::NotFound(id)),
            },
        };
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn envelope(event: BoundedContextEvent) -> EventEnvelope<BoundedContextEvent> {
        EventEnvelope::new(event.bounded_context_id(), Utc::now(), event)
    }

    fn created(id: BoundedContextId, domain_id: DomainId, name: &str) -> BoundedContextEvent {
        BoundedContextEvent::BoundedContextCreated {
            bounded_context_id: id,
            domain_id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_field_events_replace_only_their_field() {
        let id = Uuid::new_v4();
        let domain = Uuid::new_v4();
        let classification = StrategicClassification {
            domain_type: Some(DomainType::Core),
            business_model: vec![BusinessModel::Revenue],
            evolution: Some(Evolution::CustomBuilt),
        };
        let history = vec![
            envelope(created(id, domain, "Ordering")),
            envelope(BoundedContextEvent::DescriptionChanged {
                bounded_context_id: id,
                description: Some("Takes orders".to_string()),
            }),
            envelope(BoundedContextEvent::BoundedContextReclassified {
                bounded_context_id: id,
                classification: classification.clone(),
            }),
            envelope(BoundedContextEvent::BoundedContextRenamed {
                bounded_context_id: id,
                name: "Order Taking".to_string(),
            }),
        ];

        let context = projection().project(&history).unwrap();
        assert_eq!(context.name, "Order Taking");
        assert_eq!(context.description.as_deref(), Some("Takes orders"));
        assert_eq!(context.classification, classification);
        assert_eq!(context.domain_id, domain);
    }

    #[test]
    fn test_move_and_remove() {
        let id = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let history = vec![
            envelope(created(id, first, "Billing")),
            envelope(BoundedContextEvent::BoundedContextMovedToDomain {
                bounded_context_id: id,
                domain_id: second,
            }),
        ];
        let contexts = all_bounded_contexts().project(&history);
        assert!(bounded_contexts_of(&contexts, first).is_empty());
        assert_eq!(bounded_contexts_of(&contexts, second).len(), 1);

        let removed = all_bounded_contexts().project_from(
            contexts,
            &[envelope(BoundedContextEvent::BoundedContextRemoved {
                bounded_context_id: id,
                domain_id: second,
            })],
        );
        assert!(removed.is_empty());
    }

    #[test]
    fn test_key_is_released_by_previous_holder() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let domain = Uuid::new_v4();
        let history = vec![
            envelope(created(a, domain, "A")),
            envelope(created(b, domain, "B")),
            envelope(BoundedContextEvent::KeyAssigned {
                bounded_context_id: a,
                key: Some("BC-1".to_string()),
            }),
            envelope(BoundedContextEvent::KeyAssigned {
                bounded_context_id: b,
                key: Some("BC-1".to_string()),
            }),
        ];
        let contexts = all_bounded_contexts().project(&history);
        assert_eq!(contexts[&a].key, None);
        assert_eq!(contexts[&b].key.as_deref(), Some("BC-1"));
    }

    #[test]
    fn test_ubiquitous_language_is_keyed_by_normalized_term() {
        let id = Uuid::new_v4();
        let state = Some(BoundedContext::created(id, Uuid::new_v4(), "Ordering".to_string()));
        let events = BoundedContextAggregate::handle(
            id,
            &state,
            BoundedContextCommand::UpdateUbiquitousLanguage {
                terms: vec![LanguageTerm {
                    term: " Order Line ".to_string(),
                    description: Some("".to_string()),
                }],
            },
        )
        .unwrap();

        match &events[0] {
            BoundedContextEvent::UbiquitousLanguageUpdated {
                ubiquitous_language,
                ..
            } => {
                let term = &ubiquitous_language["order line"];
                assert_eq!(term.term, "Order Line");
                assert_eq!(term.description, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_remove_records_owning_domain() {
        let id = Uuid::new_v4();
        let domain = Uuid::new_v4();
        let state = Some(BoundedContext::created(id, domain, "Billing".to_string()));
        let events =
            BoundedContextAggregate::handle(id, &state, BoundedContextCommand::RemoveBoundedContext)
                .unwrap();
        assert_eq!(
            events,
            vec![BoundedContextEvent::BoundedContextRemoved {
                bounded_context_id: id,
                domain_id: domain,
            }]
        );
    }

    #[test]
    fn test_key_for_unknown_context_keeps_live_holder() {
        let live = Uuid::new_v4();
        let history = vec![
            envelope(created(live, Uuid::new_v4(), "Billing")),
            envelope(BoundedContextEvent::KeyAssigned {
                bounded_context_id: live,
                key: Some("BIL".to_string()),
            }),
            envelope(BoundedContextEvent::KeyAssigned {
                bounded_context_id: Uuid::new_v4(),
                key: Some("BIL".to_string()),
            }),
        ];
        let contexts = all_bounded_contexts().project(&history);
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[&live].key.as_deref(), Some("BIL"));
    }
}
