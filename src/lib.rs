// ============================================================================
// contextmap Library
// ============================================================================

//! Event-sourced catalog of domains, bounded contexts, namespaces and their
//! collaborations.
//!
//! The [`EventStore`] is the only source of truth. Aggregate snapshots and
//! read-model indices are pure folds over it and can be rebuilt at any time.
//!
//! ```
//! use contextmap::aggregate::{DomainAggregate, DomainCommand};
//! use contextmap::read_model::ReadModels;
//! use contextmap::search::{Lookup, SearchPhrase, SearchResult};
//! use contextmap::{EventStore, system_clock};
//! use uuid::Uuid;
//!
//! # fn main() -> contextmap::Result<()> {
//! let store = EventStore::in_memory();
//! let sales = Uuid::new_v4();
//! store.execute::<DomainAggregate>(
//!     sales,
//!     DomainCommand::CreateDomain { name: "Sales".to_string() },
//!     &system_clock(),
//! )?;
//!
//! let models = ReadModels::rebuild(&store)?;
//! let phrase = SearchPhrase::from_input("sal*").expect("non-empty phrase");
//! assert_eq!(
//!     models.domains.by_name.by_exact_or_pattern(&phrase),
//!     SearchResult::from_results([sales])
//! );
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod core;
pub mod projection;
pub mod read_model;
pub mod search;
pub mod store;

// Re-export main types for convenience
pub use aggregate::{Aggregate, AggregateEvent, CatalogEvent, EventKind};
pub use core::{
    AggregateId, CatalogError, Clock, CommandError, Result, Timestamp, fixed_clock, system_clock,
};
pub use projection::Projection;
pub use read_model::{LiveReadModels, ReadModels};
pub use search::{SearchPhrase, SearchResult};
pub use store::{DurabilityMode, EventEnvelope, EventStore, StoreConfig};
