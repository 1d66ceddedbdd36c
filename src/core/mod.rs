pub mod error;
pub mod types;

pub use error::{CatalogError, CommandError, Result};
pub use types::{
    AggregateId, BoundedContextId, Clock, CollaborationId, DomainId, LabelId, NamespaceId,
    NamespaceTemplateId, Timestamp, fixed_clock, system_clock,
};
