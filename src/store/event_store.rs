use super::config::StoreConfig;
use super::envelope::EventEnvelope;
use super::journal::Journal;
use super::snapshot::CatalogSnapshot;
use crate::aggregate::{Aggregate, AggregateEvent, CatalogEvent, EventKind};
use crate::core::{AggregateId, Clock, Result};
use im::{OrdMap, Vector};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{Level, event, info_span};

/// An appended envelope, shared between the log partitions.
pub type SharedEnvelope = Arc<EventEnvelope<CatalogEvent>>;

/// Called after every successful append with the global position of the
/// first new envelope and the batch itself.
///
/// Subscribers run on the appending thread while appends are serialized, so
/// they observe batches in log order. A subscriber must not append to the
/// store it is subscribed to. A panicking subscriber is logged and skipped;
/// the batch stays appended and later appends are unaffected.
pub type Subscriber = Arc<dyn Fn(usize, &[SharedEnvelope]) + Send + Sync>;

/// Append-only log partitioned by [`EventKind`] and indexed by source.
#[derive(Clone, Default)]
struct EventLog {
    all: Vector<SharedEnvelope>,
    by_kind: OrdMap<EventKind, Vector<SharedEnvelope>>,
    by_source: OrdMap<AggregateId, Vector<SharedEnvelope>>,
}

impl EventLog {
    fn push(&mut self, envelope: SharedEnvelope) {
        self.by_kind
            .entry(envelope.event.kind())
            .or_insert_with(Vector::new)
            .push_back(envelope.clone());
        self.by_source
            .entry(envelope.source())
            .or_insert_with(Vector::new)
            .push_back(envelope.clone());
        self.all.push_back(envelope);
    }
}

/// The catalog's single source of truth.
///
/// Appends are serialized through one writer lock; readers clone the
/// persistent log structures and never wait on journal I/O.
pub struct EventStore {
    config: StoreConfig,
    log: RwLock<EventLog>,
    writer: Mutex<Option<Journal>>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventStore {
    pub fn in_memory() -> Self {
        Self::from_parts(StoreConfig::in_memory(), EventLog::default(), None)
    }

    /// An in-memory store seeded with `history`.
    pub fn with_history(history: Vec<EventEnvelope<CatalogEvent>>) -> Self {
        let mut log = EventLog::default();
        for envelope in history {
            log.push(Arc::new(envelope));
        }
        Self::from_parts(StoreConfig::in_memory(), log, None)
    }

    /// Opens a store, replaying its journal when the config names one.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let Some(path) = config.journal_path() else {
            event!(Level::INFO, "opened in-memory event store");
            return Ok(Self::from_parts(config, EventLog::default(), None));
        };

        let span = info_span!("catalog.store.open", journal = %path.display());
        let _enter = span.enter();

        let records = Journal::read_all(&path)?;
        let next_seq = records.last().map(|record| record.seq + 1).unwrap_or(0);
        let mut log = EventLog::default();
        for record in records {
            log.push(Arc::new(record.into_envelope()?));
        }
        event!(Level::INFO, events = log.all.len(), "journal replayed");

        let journal = Journal::open(&path, config.durability, next_seq)?;
        Ok(Self::from_parts(config, log, Some(journal)))
    }

    /// Opens a store and seeds it from a catalog snapshot.
    ///
    /// The snapshot is only applied when the store is empty, so reopening a
    /// file-backed store that was seeded before leaves its journal alone.
    pub fn import_snapshot<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let store = Self::open(config)?;
        if !store.is_empty()? {
            event!(
                Level::INFO,
                snapshot = %path.as_ref().display(),
                "store already holds events; snapshot not imported"
            );
            return Ok(store);
        }

        let snapshot = CatalogSnapshot::load(path.as_ref())?;
        let count = snapshot.events.len();
        store.append_envelopes(snapshot.events)?;
        event!(
            Level::INFO,
            snapshot = %path.as_ref().display(),
            events = count,
            "catalog snapshot imported"
        );
        Ok(store)
    }

    fn from_parts(config: StoreConfig, log: EventLog, journal: Option<Journal>) -> Self {
        Self {
            config,
            log: RwLock::new(log),
            writer: Mutex::new(journal),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Wraps each event in an envelope stamped by `clock` and appends them in
    /// order to `source`'s stream.
    pub fn append<E: AggregateEvent>(
        &self,
        source: AggregateId,
        events: Vec<E>,
        clock: &Clock,
    ) -> Result<()> {
        let envelopes = events
            .into_iter()
            .map(|event| EventEnvelope::new(source, clock(), event.into_catalog()))
            .collect();
        self.append_envelopes(envelopes)
    }

    /// Appends prepared envelopes in order.
    ///
    /// Nothing becomes visible to readers unless the journal write succeeded.
    pub fn append_envelopes(&self, envelopes: Vec<EventEnvelope<CatalogEvent>>) -> Result<()> {
        if envelopes.is_empty() {
            return Ok(());
        }

        let mut writer = self.writer.lock()?;
        if let Some(journal) = writer.as_mut() {
            journal.append(&envelopes).inspect_err(|err| {
                event!(Level::ERROR, error = %err, "journal append failed");
            })?;
        }

        let batch: Vec<SharedEnvelope> = envelopes.into_iter().map(Arc::new).collect();
        let mut next = self.log.read()?.clone();
        let first_position = next.all.len();
        for envelope in &batch {
            next.push(envelope.clone());
        }
        *self.log.write()? = next;
        event!(
            Level::DEBUG,
            position = first_position,
            count = batch.len(),
            "events appended"
        );

        let subscribers = self.subscribers.read()?.clone();
        for subscriber in subscribers {
            let delivered = catch_unwind(AssertUnwindSafe(|| subscriber(first_position, &batch)));
            if delivered.is_err() {
                event!(
                    Level::ERROR,
                    position = first_position,
                    count = batch.len(),
                    "subscriber panicked"
                );
            }
        }
        drop(writer);
        Ok(())
    }

    /// Every envelope whose payload is an `E`, in global append order.
    pub fn get<E: AggregateEvent>(&self) -> Result<Vec<EventEnvelope<E>>> {
        let partition = self.log.read()?.by_kind.get(&E::KIND).cloned();
        Ok(partition.map(|envelopes| typed(&envelopes)).unwrap_or_default())
    }

    /// Every envelope of one aggregate stream, in append order.
    pub fn stream(&self, source: AggregateId) -> Result<Vec<EventEnvelope<CatalogEvent>>> {
        let stream = self.log.read()?.by_source.get(&source).cloned();
        Ok(stream
            .map(|envelopes| envelopes.iter().map(|envelope| (**envelope).clone()).collect())
            .unwrap_or_default())
    }

    /// The `E` events of one aggregate stream.
    pub fn stream_of<E: AggregateEvent>(&self, source: AggregateId) -> Result<Vec<EventEnvelope<E>>> {
        let stream = self.log.read()?.by_source.get(&source).cloned();
        Ok(stream.map(|envelopes| typed(&envelopes)).unwrap_or_default())
    }

    /// A snapshot of the whole log.
    pub fn all(&self) -> Result<Vector<SharedEnvelope>> {
        Ok(self.log.read()?.all.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.log.read()?.all.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Source ids of every stream of `kind`, in order of first appearance.
    pub fn sources(&self, kind: EventKind) -> Result<Vec<AggregateId>> {
        let partition = self.log.read()?.by_kind.get(&kind).cloned();
        let mut seen = im::OrdSet::new();
        let mut sources = Vec::new();
        for envelope in partition.iter().flatten() {
            if seen.insert(envelope.source()).is_none() {
                sources.push(envelope.source());
            }
        }
        Ok(sources)
    }

    pub fn subscribe(&self, subscriber: Subscriber) -> Result<()> {
        self.subscribers.write()?.push(subscriber);
        Ok(())
    }

    /// Folds the aggregate's stream, runs the command handler and appends
    /// whatever it emits.
    pub fn execute<A: Aggregate>(
        &self,
        id: AggregateId,
        command: A::Command,
        clock: &Clock,
    ) -> Result<Vec<A::Event>> {
        let kind = <A::Event as AggregateEvent>::KIND;
        let span = info_span!("catalog.command", kind = %kind, aggregate = %id);
        let _enter = span.enter();

        let state = A::projection().project(&self.stream_of::<A::Event>(id)?);
        let events = A::handle(id, &state, command).inspect_err(|err| {
            event!(Level::WARN, error = %err, "command rejected");
        })?;
        self.append(id, events.clone(), clock)?;
        event!(Level::DEBUG, count = events.len(), "command applied");
        Ok(events)
    }

    /// Writes the whole log to `path` as a catalog snapshot.
    pub fn export_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let events: Vec<_> = self
            .all()?
            .iter()
            .map(|envelope| (**envelope).clone())
            .collect();
        let count = events.len();
        CatalogSnapshot::new(events).save(path.as_ref())?;
        event!(
            Level::INFO,
            snapshot = %path.as_ref().display(),
            events = count,
            "catalog snapshot exported"
        );
        Ok(count)
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn typed<E: AggregateEvent>(envelopes: &Vector<SharedEnvelope>) -> Vec<EventEnvelope<E>> {
    envelopes
        .iter()
        .filter_map(|envelope| {
            E::from_catalog(&envelope.event).map(|event| EventEnvelope {
                event: event.clone(),
                metadata: envelope.metadata,
            })
        })
        .collect()
}
