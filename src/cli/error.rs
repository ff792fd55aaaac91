//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    /// Command ran but reported problems (unformatted files, failed checks).
    #[error("{0}")]
    Failed(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Failed(_) => crate::exitcode::FAILED,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Catalog { .. } => crate::exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(_) => crate::exitcode::DATAERR,
                    ApplicationError::AlreadyExists(_) => crate::exitcode::CANTCREAT,
                    ApplicationError::NotADirectory(_) => crate::exitcode::NOINPUT,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::OperationFailed { source, .. } => {
                        if source.is::<std::io::Error>() {
                            crate::exitcode::IOERR
                        } else {
                            crate::exitcode::SOFTWARE
                        }
                    }
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_existing_file_error_when_exit_code_then_cantcreat() {
        let err = CliError::from(ApplicationError::AlreadyExists(PathBuf::from("a.yaml")));
        assert_eq!(err.exit_code(), crate::exitcode::CANTCREAT);
    }

    #[test]
    fn given_io_operation_failure_when_exit_code_then_ioerr() {
        let err = CliError::from(ApplicationError::OperationFailed {
            context: "read flow: a.yaml".into(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")),
        });
        assert_eq!(err.exit_code(), crate::exitcode::IOERR);
    }

    #[test]
    fn given_failed_checks_when_exit_code_then_one() {
        assert_eq!(CliError::Failed("2 problems".into()).exit_code(), 1);
    }
}
