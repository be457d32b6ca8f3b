//! CLI-specific error types and exit code mapping

use scaudit_core::error::ScauditError;
use scaudit_sca::ScaError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The audit reported vulnerabilities or one or more scan units failed.
    #[error("audit failed: {0}")]
    Audit(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from scaudit-core.
    #[error("{0}")]
    Core(#[from] ScauditError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                        |
    /// |------|------------------------------------------------|
    /// | 0    | Success                                        |
    /// | 1    | General / command error                        |
    /// | 2    | Configuration error                            |
    /// | 4    | Vulnerabilities found or scan units failed     |
    /// | 10   | IO error                                       |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ScauditError::Config(_)) => 2,
            Self::Audit(_) => 4,
            Self::Io(_) | Self::Core(ScauditError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ScaError> for CliError {
    fn from(e: ScaError) -> Self {
        match e {
            ScaError::Config { .. } => Self::Config(e.to_string()),
            ScaError::Io { source, .. } => Self::Io(source),
            other => Self::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaudit_core::error::{ConfigError, ScaFailure};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::Core(ScauditError::Config(ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_audit_error() {
        let err = CliError::Audit("found 3 vulnerabilities".to_owned());
        assert_eq!(err.exit_code(), 4, "audit failure should return exit code 4");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);
    }

    #[test]
    fn test_exit_code_core_sca_failure() {
        let err = CliError::Core(ScauditError::Sca(ScaFailure::Scan("503".to_owned())));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_from_sca_config_error() {
        let sca = ScaError::Config {
            field: "scan_timeout".to_owned(),
            reason: "must be 1-3600 seconds".to_owned(),
        };
        let err: CliError = sca.into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("scan_timeout"));
    }

    #[test]
    fn test_from_sca_other_error_is_command() {
        let err: CliError = ScaError::Cancelled.into();
        assert!(matches!(err, CliError::Command(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_audit() {
        let err = CliError::Audit("found 5 vulnerabilities".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("audit failed"));
        assert!(display_str.contains("found 5 vulnerabilities"));
    }
}
