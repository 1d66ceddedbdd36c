use super::{Aggregate, optional_key, optional_text, required_name};
use crate::core::{AggregateId, CommandError, DomainId};
use crate::projection::Projection;
use crate::search::normalize;
use crate::store::EventEnvelope;
use im::OrdMap;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub parent_domain_id: Option<DomainId>,
    pub key: Option<String>,
    pub name: String,
    pub vision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    DomainImported {
        domain: Domain,
    },
    DomainCreated {
        domain_id: DomainId,
        name: String,
    },
    SubDomainCreated {
        domain_id: DomainId,
        parent_domain_id: DomainId,
        name: String,
    },
    DomainRenamed {
        domain_id: DomainId,
        name: String,
    },
    CategorizedAsSubdomain {
        domain_id: DomainId,
        parent_domain_id: DomainId,
    },
    PromotedToDomain {
        domain_id: DomainId,
    },
    VisionRefined {
        domain_id: DomainId,
        vision: Option<String>,
    },
    KeyAssigned {
        domain_id: DomainId,
        key: Option<String>,
    },
    DomainRemoved {
        domain_id: DomainId,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::DomainImported { .. } => "DomainImported",
            DomainEvent::DomainCreated { .. } => "DomainCreated",
            DomainEvent::SubDomainCreated { .. } => "SubDomainCreated",
            DomainEvent::DomainRenamed { .. } => "DomainRenamed",
            DomainEvent::CategorizedAsSubdomain { .. } => "CategorizedAsSubdomain",
            DomainEvent::PromotedToDomain { .. } => "PromotedToDomain",
            DomainEvent::VisionRefined { .. } => "VisionRefined",
            DomainEvent::KeyAssigned { .. } => "KeyAssigned",
            DomainEvent::DomainRemoved { .. } => "DomainRemoved",
        }
    }

    pub fn domain_id(&self) -> DomainId {
        match self {
            DomainEvent::DomainImported { domain } => domain.id,
            DomainEvent::DomainCreated { domain_id, .. }
            | DomainEvent::SubDomainCreated { domain_id, .. }
            | DomainEvent::DomainRenamed { domain_id, .. }
            | DomainEvent::CategorizedAsSubdomain { domain_id, .. }
            | DomainEvent::PromotedToDomain { domain_id }
            | DomainEvent::VisionRefined { domain_id, .. }
            | DomainEvent::KeyAssigned { domain_id, .. }
            | DomainEvent::DomainRemoved { domain_id } => *domain_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainCommand {
    CreateDomain { name: String },
    CreateSubdomain { parent_domain_id: DomainId, name: String },
    RenameDomain { name: String },
    MoveDomain { parent_domain_id: Option<DomainId> },
    RefineVision { vision: Option<String> },
    AssignKey { key: Option<String> },
    RemoveDomain,
}

/// Folds one event into a single domain's snapshot.
pub fn evolve(state: Option<Domain>, event: &DomainEvent) -> Option<Domain> {
    match event {
        DomainEvent::DomainImported { domain } => Some(domain.clone()),
        DomainEvent::DomainCreated { domain_id, name } => Some(Domain {
            id: *domain_id,
            parent_domain_id: None,
            key: None,
            name: name.clone(),
            vision: None,
        }),
        DomainEvent::SubDomainCreated {
            domain_id,
            parent_domain_id,
            name,
        } => Some(Domain {
            id: *domain_id,
            parent_domain_id: Some(*parent_domain_id),
            key: None,
            name: name.clone(),
            vision: None,
        }),
        DomainEvent::DomainRenamed { name, .. } => state.map(|domain| Domain {
            name: name.clone(),
            ..domain
        }),
        DomainEvent::CategorizedAsSubdomain {
            parent_domain_id, ..
        } => state.map(|domain| Domain {
            parent_domain_id: Some(*parent_domain_id),
            ..domain
        }),
        DomainEvent::PromotedToDomain { .. } => state.map(|domain| Domain {
            parent_domain_id: None,
            ..domain
        }),
        DomainEvent::VisionRefined { vision, .. } => state.map(|domain| Domain {
            vision: vision.clone(),
            ..domain
        }),
        DomainEvent::KeyAssigned { key, .. } => state.map(|domain| Domain {
            key: key.clone(),
            ..domain
        }),
        DomainEvent::DomainRemoved { .. } => None,
    }
}

/// Snapshot of one domain, folded over its own stream.
pub fn projection() -> Projection<Option<Domain>, DomainEvent> {
    Projection::new(None, |state, envelope| evolve(state, &envelope.event))
}

/// Every live domain, folded over all domain events.
///
/// Assigning a key first strips it from whichever domain held it before.
pub fn all_domains() -> Projection<OrdMap<DomainId, Domain>, DomainEvent> {
    Projection::new(OrdMap::new(), apply_to_all)
}

fn apply_to_all(
    domains: OrdMap<DomainId, Domain>,
    envelope: &EventEnvelope<DomainEvent>,
) -> OrdMap<DomainId, Domain> {
    let event = &envelope.event;
    let id = event.domain_id();

    let domains = match event {
        DomainEvent::KeyAssigned { .. } if !domains.contains_key(&id) => {
            event!(
                Level::WARN,
                domain_id = %id,
                "key assigned to unknown domain ignored"
            );
            return domains;
        }
        DomainEvent::KeyAssigned { key: Some(key), .. } => release_key(domains, id, key),
        DomainEvent::DomainImported {
            domain: Domain { key: Some(key), .. },
        } => release_key(domains, id, key),
        _ => domains,
    };

    match evolve(domains.get(&id).cloned(), event) {
        Some(domain) => domains.update(id, domain),
        None => domains.without(&id),
    }
}

fn release_key(
    domains: OrdMap<DomainId, Domain>,
    owner: DomainId,
    key: &str,
) -> OrdMap<DomainId, Domain> {
    let key = normalize(key);
    let holders: Vec<DomainId> = domains
        .iter()
        .filter(|(id, domain)| {
            **id != owner && domain.key.as_deref().map(normalize).as_deref() == Some(key.as_str())
        })
        .map(|(id, _)| *id)
        .collect();

    holders.into_iter().fold(domains, |domains, id| {
        match domains.get(&id).cloned() {
            Some(domain) => domains.update(id, Domain { key: None, ..domain }),
            None => domains,
        }
    })
}

/// Direct children of `parent`.
pub fn subdomains_of(domains: &OrdMap<DomainId, Domain>, parent: DomainId) -> Vec<&Domain> {
    domains
        .values()
        .filter(|domain| domain.parent_domain_id == Some(parent))
        .collect()
}

pub struct DomainAggregate;

impl Aggregate for DomainAggregate {
    type Event = DomainEvent;
    type Command = DomainCommand;
    type State = Option<Domain>;

    fn projection() -> Projection<Self::State, Self::Event> {
        projection()
    }

    fn handle(
        id: AggregateId,
        state: &Option<Domain>,
        command: DomainCommand,
    ) -> Result<Vec<DomainEvent>, CommandError> {
        let exists = state.is_some();
        match command {
            DomainCommand::CreateDomain { name } => {
                if exists {
                    return Err(CommandError::AlreadyExists(id));
                }
                Ok(vec![DomainEvent::DomainCreated {
                    domain_id: id,
                    name: required_name(&name)?,
                }])
            }
            DomainCommand::CreateSubdomain {
                parent_domain_id,
                name,
            } => {
                if exists {
                    return Err(CommandError::AlreadyExists(id));
                }
                if parent_domain_id == id {
                    return Err(CommandError::InvalidParent(
                        "a domain cannot be its own parent".to_string(),
                    ));
                }
                Ok(vec![DomainEvent::SubDomainCreated {
                    domain_id: id,
                    parent_domain_id,
                    name: required_name(&name)?,
                }])
            }
            DomainCommand::RenameDomain { name } => {
                require(state, id)?;
                Ok(vec![DomainEvent::DomainRenamed {
                    domain_id: id,
                    name: required_name(&name)?,
                }])
            }
            DomainCommand::MoveDomain { parent_domain_id } => {
                require(state, id)?;
                match parent_domain_id {
                    Some(parent) if parent == id => Err(CommandError::InvalidParent(
                        "a domain cannot be its own parent".to_string(),
                    )),
                    Some(parent) => Ok(vec![DomainEvent::CategorizedAsSubdomain {
                        domain_id: id,
                        parent_domain_id: parent,
                    }]),
                    None => Ok(vec![DomainEvent::PromotedToDomain { domain_id: id }]),
                }
            }
            DomainCommand::RefineVision { vision } => {
                require(state, id)?;
                Ok(vec![DomainEvent::VisionRefined {
                    domain_id: id,
                    vision: optional_text(vision),
                }])
            }
            DomainCommand::AssignKey { key } => {
                require(state, id)?;
                Ok(vec![DomainEvent::KeyAssigned {
                    domain_id: id,
                    key: optional_key(key)?,
                }])
            }
            DomainCommand::RemoveDomain => {
                require(state, id)?;
                Ok(vec![DomainEvent::DomainRemoved { domain_id: id }])
            }
        }
    }
}

fn require(state: &Option<Domain>, id: DomainId) -> Result<&Domain, CommandError> {
    state.as_ref().ok_or(CommandError::NotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn envelope(event: DomainEvent) -> EventEnvelope<DomainEvent> {
        EventEnvelope::new(event.domain_id(), Utc::now(), event)
    }

    #[test]
    fn test_snapshot_follows_field_changes() {
        let id = Uuid::new_v4();
        let history = vec![
            envelope(DomainEvent::DomainCreated {
                domain_id: id,
                name: "Sales".to_string(),
            }),
            envelope(DomainEvent::DomainRenamed {
                domain_id: id,
                name: "Selling".to_string(),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: id,
                key: Some("SAL".to_string()),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: id,
                key: Some("SEL".to_string()),
            }),
        ];

        let domain = projection().project(&history).unwrap();
        assert_eq!(domain.name, "Selling");
        assert_eq!(domain.key.as_deref(), Some("SEL"));
        assert_eq!(domain.vision, None);
    }

    #[test]
    fn test_removed_domain_projects_to_none() {
        let id = Uuid::new_v4();
        let history = vec![
            envelope(DomainEvent::DomainCreated {
                domain_id: id,
                name: "Sales".to_string(),
            }),
            envelope(DomainEvent::DomainRemoved { domain_id: id }),
        ];
        assert_eq!(projection().project(&history), None);
    }

    #[test]
    fn test_key_moves_between_domains() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let history = vec![
            envelope(DomainEvent::DomainCreated {
                domain_id: a,
                name: "A".to_string(),
            }),
            envelope(DomainEvent::DomainCreated {
                domain_id: b,
                name: "B".to_string(),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: a,
                key: Some("K".to_string()),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: b,
                key: Some("k".to_string()),
            }),
        ];

        let domains = all_domains().project(&history);
        assert_eq!(domains[&a].key, None);
        assert_eq!(domains[&b].key.as_deref(), Some("k"));
    }

    #[test]
    fn test_subdomains() {
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let history = vec![
            envelope(DomainEvent::DomainCreated {
                domain_id: parent,
                name: "Parent".to_string(),
            }),
            envelope(DomainEvent::SubDomainCreated {
                domain_id: child,
                parent_domain_id: parent,
                name: "Child".to_string(),
            }),
        ];
        let domains = all_domains().project(&history);
        let children = subdomains_of(&domains, parent);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child);

        let promoted = all_domains().project_from(
            domains,
            &[envelope(DomainEvent::PromotedToDomain { domain_id: child })],
        );
        assert!(subdomains_of(&promoted, parent).is_empty());
    }

    #[test]
    fn test_handle_rejects_invalid_commands() {
        let id = Uuid::new_v4();
        assert_eq!(
            DomainAggregate::handle(id, &None, DomainCommand::RenameDomain { name: "x".into() }),
            Err(CommandError::NotFound(id))
        );
        assert_eq!(
            DomainAggregate::handle(id, &None, DomainCommand::CreateDomain { name: " ".into() }),
            Err(CommandError::EmptyName)
        );

        let existing = Some(Domain {
            id,
            parent_domain_id: None,
            key: None,
            name: "Sales".to_string(),
            vision: None,
        });
        assert_eq!(
            DomainAggregate::handle(
                id,
                &existing,
                DomainCommand::CreateDomain { name: "Sales".into() }
            ),
            Err(CommandError::AlreadyExists(id))
        );
        assert!(matches!(
            DomainAggregate::handle(
                id,
                &existing,
                DomainCommand::MoveDomain {
                    parent_domain_id: Some(id)
                }
            ),
            Err(CommandError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_key_for_removed_domain_keeps_live_holder() {
        let removed = Uuid::new_v4();
        let live = Uuid::new_v4();
        let history = vec![
            envelope(DomainEvent::DomainCreated {
                domain_id: removed,
                name: "Sales".to_string(),
            }),
            envelope(DomainEvent::DomainRemoved { domain_id: removed }),
            envelope(DomainEvent::DomainCreated {
                domain_id: live,
                name: "Billing".to_string(),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: live,
                key: Some("BIL".to_string()),
            }),
            envelope(DomainEvent::KeyAssigned {
                domain_id: removed,
                key: Some("bil".to_string()),
            }),
        ];
        let domains = all_domains().project(&history);
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[&live].key.as_deref(), Some("BIL"));
    }
}
