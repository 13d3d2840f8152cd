//! CLI-specific error types and exit code mapping

use workbench_pod_verifier::{ErrorKind, VerifierError};
use workbench_probe_core::error::WorkbenchError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Bad input or an unmet target precondition.
    #[error("{0}")]
    Precondition(String),

    /// Verification ran and found failures (packages, snippets, resources).
    #[error("verification failed: {0}")]
    Verification(String),

    /// A wait or the overall deadline ran out.
    #[error("{0}")]
    Timeout(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from workbench-probe-core.
    #[error("{0}")]
    Core(#[from] WorkbenchError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 4    | Invalid input or unmet precondition      |
    /// | 5    | Verification found failures              |
    /// | 6    | Timed out waiting                        |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Precondition(_) => 4,
            Self::Verification(_) => 5,
            Self::Timeout(_) => 6,
            Self::Io(_) => 10,
            Self::Core(WorkbenchError::Config(_)) => 2,
            Self::Core(WorkbenchError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<VerifierError> for CliError {
    fn from(e: VerifierError) -> Self {
        match e.kind() {
            ErrorKind::Validation | ErrorKind::Precondition => Self::Precondition(e.to_string()),
            ErrorKind::Timeout | ErrorKind::Readiness => Self::Timeout(e.to_string()),
            ErrorKind::Config => Self::Config(e.to_string()),
            ErrorKind::Execution
            | ErrorKind::DiagnosticCollection
            | ErrorKind::Api
            | ErrorKind::Connection => Self::Command(e.to_string()),
        }
    }
}
