//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(err: ApplicationError) -> Self {
        Self::Infra(InfraError::Application(err))
    }
}

impl From<DomainError> for CliError {
    fn from(err: DomainError) -> Self {
        Self::Infra(InfraError::from(err))
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                    crate::exitcode::NOINPUT
                }
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Serialization { .. } => crate::exitcode::DATAERR,
                InfraError::Application(ApplicationError::Config { .. }) => {
                    crate::exitcode::CONFIG
                }
                InfraError::Application(ApplicationError::Domain(d)) => match d {
                    DomainError::InvalidRegistry(_) => crate::exitcode::CONFIG,
                    DomainError::ValidationFailed { .. } => crate::exitcode::DATAERR,
                    DomainError::TargetNotFound(_) | DomainError::NodeNotFound(_) => {
                        crate::exitcode::DATAERR
                    }
                    DomainError::UnknownType(_) => crate::exitcode::USAGE,
                    DomainError::PlacementRejected { .. }
                    | DomainError::CyclicMove { .. }
                    | DomainError::SelfDrop(_)
                    | DomainError::DuplicateId(_) => crate::exitcode::DATAERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeId;

    #[test]
    fn given_validation_failure_when_exit_code_then_dataerr() {
        let err = CliError::from(DomainError::ValidationFailed {
            errors: vec!["root[0]: bad".into()],
        });
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_missing_file_when_exit_code_then_noinput() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CliError::from(InfraError::io("read page.json", io));
        assert_eq!(err.exit_code(), crate::exitcode::NOINPUT);
    }

    #[test]
    fn given_unknown_node_when_exit_code_then_dataerr() {
        let err = CliError::from(DomainError::NodeNotFound(NodeId::from("x")));
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_duplicate_id_when_exit_code_then_dataerr() {
        let err = CliError::from(DomainError::DuplicateId(NodeId::from("x")));
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }
}
