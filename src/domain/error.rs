//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Domain errors represent structural problems in a skills directory.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("skills set path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("no yaml definition found for skill directory: {0}")]
    MissingDefinition(PathBuf),

    #[error("ambiguous skill definition in {dir}: {candidates:?}")]
    AmbiguousDefinition {
        dir: PathBuf,
        candidates: Vec<String>,
    },

    #[error("invalid skill definition {path}: {message}")]
    InvalidDefinition { path: PathBuf, message: String },

    #[error("identifier {id} assigned to both {first} and {second}")]
    DuplicateIdentifier {
        id: Uuid,
        first: String,
        second: String,
    },

    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}
