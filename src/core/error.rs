use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Projection invariant violated: {0}")]
    ProjectionInvariant(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command rejected: {0}")]
    Command(#[from] CommandError),
}

/// Rejections raised by command handlers before any event is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("key must not be empty")]
    EmptyKey,

    #[error("aggregate '{0}' does not exist")]
    NotFound(Uuid),

    #[error("aggregate '{0}' already exists")]
    AlreadyExists(Uuid),

    #[error("label '{label_id}' not found on '{owner_id}'")]
    LabelNotFound { owner_id: Uuid, label_id: Uuid },

    #[error("invalid parent: {0}")]
    InvalidParent(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl<T> From<std::sync::PoisonError<T>> for CatalogError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
