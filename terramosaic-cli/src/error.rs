//! CLI error type.

use std::fmt;

use terramosaic::config::ConfigFileError;

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem (unknown key, bad value, unreadable file).
    Config(String),
    /// An argument could not be parsed or a referenced file read.
    InvalidArgument(String),
    /// The assembly pipeline failed.
    Assembly { stage: String, error: String },
    /// Scratch directory problem.
    Workdir(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Assembly { stage, error } => {
                write!(f, "Assembly failed at stage {}: {}", stage, error)
            }
            CliError::Workdir(msg) => write!(f, "Working directory error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_display() {
        let err = CliError::Assembly {
            stage: "compositing".to_string(),
            error: "merge failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Assembly failed at stage compositing: merge failed"
        );
    }
}
