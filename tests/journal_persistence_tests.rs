//! Journal persistence tests
//!
//! File-backed stores replay their journal on open; snapshots seed empty
//! stores.
//! Run with: cargo test --test journal_persistence_tests

use chrono::{TimeZone, Utc};
use contextmap::aggregate::{
    CollaborationEvent, Collaborator, DomainEvent, LabelDefinition, NamespaceEvent,
};
use contextmap::read_model::ReadModels;
use contextmap::store::{Journal, JournalRecord};
use contextmap::{
    CatalogError, Clock, DurabilityMode, EventKind, EventStore, StoreConfig, fixed_clock,
};
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn clock() -> Clock {
    fixed_clock(Utc.with_ymd_and_hms(2024, 7, 1, 8, 30, 0).unwrap())
}

fn populate(store: &EventStore) -> (Uuid, Uuid) {
    let domain_id = Uuid::new_v4();
    let context = Uuid::new_v4();
    store
        .append(
            domain_id,
            vec![
                DomainEvent::DomainCreated {
                    domain_id,
                    name: "Sales".to_string(),
                },
                DomainEvent::KeyAssigned {
                    domain_id,
                    key: Some("SAL".to_string()),
                },
            ],
            &clock(),
        )
        .unwrap();
    store
        .append(
            context,
            vec![NamespaceEvent::NamespaceAdded {
                namespace_id: Uuid::new_v4(),
                bounded_context_id: context,
                template: None,
                name: "team".to_string(),
                labels: vec![LabelDefinition::new("owner", "sales")],
            }],
            &clock(),
        )
        .unwrap();
    let collaboration = Uuid::new_v4();
    store
        .append(
            collaboration,
            vec![CollaborationEvent::ConnectionDefined {
                collaboration_id: collaboration,
                description: Some("orders".to_string()),
                initiator: Collaborator::BoundedContext(context),
                recipient: Collaborator::Domain(domain_id),
            }],
            &clock(),
        )
        .unwrap();
    (domain_id, context)
}

#[test]
fn test_reopen_replays_journal() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path());

    let (domain_id, context) = {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store)
    };

    let reopened = EventStore::open(config).unwrap();
    assert_eq!(reopened.len().unwrap(), 4);
    assert_eq!(reopened.stream(domain_id).unwrap().len(), 2);
    assert_eq!(reopened.stream(context).unwrap().len(), 1);
    assert_eq!(
        reopened.stream(domain_id).unwrap()[0].recorded_at(),
        Utc.with_ymd_and_hms(2024, 7, 1, 8, 30, 0).unwrap()
    );

    let models = ReadModels::rebuild(&reopened).unwrap();
    assert_eq!(models.domains.by_key.owner("sal"), Some(&domain_id));
}

#[test]
fn test_appends_after_reopen_continue_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path());
    {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store);
    }
    {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store);
    }

    let path = config.journal_path().unwrap();
    let records = Journal::read_all(&path).unwrap();
    let seqs: Vec<u64> = records.iter().map(|record| record.seq).collect();
    assert_eq!(seqs, (0..8).collect::<Vec<u64>>());
    assert_eq!(records[0].stream, EventKind::Domain);
    assert_eq!(records[0].event_type, "DomainCreated");

    assert_eq!(EventStore::open(config).unwrap().len().unwrap(), 8);
}

#[test]
fn test_journal_lines_are_json_records() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path()).journal_file("events.jsonl");
    let store = EventStore::open(config).unwrap();
    populate(&store);

    let content = fs::read_to_string(temp_dir.path().join("events.jsonl")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    let record: JournalRecord = serde_json::from_str(lines[3]).unwrap();
    assert_eq!(record.stream, EventKind::Collaboration);
    assert_eq!(record.event_type, "ConnectionDefined");
}

#[test]
fn test_async_durability_still_persists() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path()).durability(DurabilityMode::Async);
    {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store);
    }
    assert_eq!(EventStore::open(config).unwrap().len().unwrap(), 4);
}

#[test]
fn test_none_durability_keeps_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path()).durability(DurabilityMode::None);
    {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store);
        assert_eq!(store.len().unwrap(), 4);
    }
    assert!(EventStore::open(config).unwrap().is_empty().unwrap());
}

#[test]
fn test_tampered_event_type_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path());
    {
        let store = EventStore::open(config.clone()).unwrap();
        populate(&store);
    }

    let path = config.journal_path().unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let tampered = content.replacen("\"event_type\":\"DomainCreated\"", "\"event_type\":\"DomainRemoved\"", 1);
    assert_ne!(content, tampered);
    fs::write(&path, tampered).unwrap();

    assert!(matches!(
        EventStore::open(config),
        Err(CatalogError::ProjectionInvariant(_))
    ));
}

#[test]
fn test_corrupt_line_is_serialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::file_backed(temp_dir.path());
    fs::write(config.journal_path().unwrap(), "{not json}\n").unwrap();

    assert!(matches!(
        EventStore::open(config),
        Err(CatalogError::Serialization(_))
    ));
}

#[test]
fn test_unwritable_journal_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "file, not a directory").unwrap();
    let config = StoreConfig::file_backed(blocker.join("nested"));

    assert!(matches!(EventStore::open(config), Err(CatalogError::Io(_))));
}

#[test]
fn test_snapshot_export_and_import() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("seed.json");

    let source = EventStore::in_memory();
    let (domain_id, _) = populate(&source);
    assert_eq!(source.export_snapshot(&snapshot_path).unwrap(), 4);

    let data_dir = temp_dir.path().join("data");
    let config = StoreConfig::file_backed(&data_dir);
    let imported = EventStore::import_snapshot(&snapshot_path, config.clone()).unwrap();
    assert_eq!(imported.len().unwrap(), 4);
    assert_eq!(
        imported.stream(domain_id).unwrap(),
        source.stream(domain_id).unwrap()
    );
    drop(imported);

    // The journal now holds the seed, so a second import is a plain reopen.
    let reopened = EventStore::import_snapshot(&snapshot_path, config).unwrap();
    assert_eq!(reopened.len().unwrap(), 4);
}

#[test]
fn test_in_memory_import_seeds_store() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot_path = temp_dir.path().join("seed.json");
    let source = EventStore::in_memory();
    populate(&source);
    source.export_snapshot(&snapshot_path).unwrap();

    let store = EventStore::import_snapshot(&snapshot_path, StoreConfig::in_memory()).unwrap();
    assert_eq!(
        ReadModels::rebuild(&store).unwrap(),
        ReadModels::rebuild(&source).unwrap()
    );
}
