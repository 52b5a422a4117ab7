//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{failed} skill area(s) could not be updated")]
    PartialUpdate { failed: usize },

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::PartialUpdate { .. } => exitcode::DATAERR,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Database { .. } => exitcode::UNAVAILABLE,
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(d) => match d {
            DomainError::FileNotFound(_) | DomainError::NotADirectory(_) => exitcode::NOINPUT,
            DomainError::Unreadable { .. } => exitcode::IOERR,
            DomainError::MissingDefinition(_)
            | DomainError::AmbiguousDefinition { .. }
            | DomainError::InvalidDefinition { .. }
            | DomainError::DuplicateIdentifier { .. } => exitcode::DATAERR,
        },
        ApplicationError::UnknownSkill(_) => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::Storage { .. } => exitcode::UNAVAILABLE,
        ApplicationError::Publish { .. } => exitcode::CANTCREAT,
        ApplicationError::DanglingChild { .. }
        | ApplicationError::Serialization { .. }
        | ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
    }
}
