//! Application-level errors (wraps domain errors)

use thiserror::Error;
use uuid::Uuid;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("skill {parent} references {child}, which is not part of the tree")]
    DanglingChild { parent: String, child: Uuid },

    #[error("cannot serialize skills tree {code}: {source}")]
    Serialization {
        code: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown skill: {0}")]
    UnknownSkill(Uuid),

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("publishing {code} failed: {message}")]
    Publish { code: String, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
