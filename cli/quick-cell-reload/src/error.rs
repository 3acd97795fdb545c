//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

/// Errors raised while talking to the scheduler or driving an update.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ReloadError {
    /// Create an API error from response details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the scheduler refused the write because the job moved on.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(reload_err) = err.downcast_ref::<ReloadError>() {
        match reload_err {
            ReloadError::Api { status: 403, .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Check the ACL token (NOMAD_TOKEN or --token).".yellow()
                );
            }
            ReloadError::Conflict(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: The job changed while it was being updated. Run the command again."
                        .yellow()
                );
            }
            ReloadError::Network(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and NOMAD_ADDR.".yellow()
                );
            }
            ReloadError::Cancelled => {
                eprintln!(
                    "\n{}",
                    "Hint: The run hit its --timeout or received a shutdown signal.".yellow()
                );
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_includes_status() {
        let err = ReloadError::api(500, "rpc error: no leader");
        assert_eq!(err.to_string(), "API error (500): rpc error: no leader");
    }

    #[test]
    fn conflict_is_detected() {
        assert!(ReloadError::Conflict("index 4".to_string()).is_conflict());
        assert!(!ReloadError::NotFound("job".to_string()).is_conflict());
    }
}
