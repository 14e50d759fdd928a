//! Errors reported by the shell.
//!
//! The `Display` text of every variant is exactly what the user sees on
//! standard error, so callers print these with `{}` and nothing else.

use std::path::PathBuf;

/// Every condition the shell reports to the user.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Wrong number of command-line arguments.
    #[error("Usage: mysh [batchFile]")]
    Usage,

    /// The batch script could not be opened.
    #[error("Error: Cannot open file {}", path.display())]
    OpenBatchFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to create a child process.
    #[error("Error: Fork failed")]
    Fork(#[source] std::io::Error),

    /// The program named by the first token cannot be located or invoked.
    #[error("{0}: Command not found")]
    CommandNotFound(String),

    /// An input line exceeded the maximum length.
    #[error("Error: Command line too long")]
    LineTooLong,

    /// `myw` was given an id that was never issued. Holds the argument as typed.
    #[error("Invalid jid {0}")]
    InvalidJid(String),
}

impl ShellError {
    /// Fatal errors end the session with exit status 1.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Usage | ShellError::OpenBatchFile { .. } | ShellError::Fork(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn messages_match_user_visible_format() {
        assert_eq!(ShellError::Usage.to_string(), "Usage: mysh [batchFile]");
        assert_eq!(
            ShellError::OpenBatchFile {
                path: PathBuf::from("missing.sh"),
                source: io::Error::from(io::ErrorKind::NotFound),
            }
            .to_string(),
            "Error: Cannot open file missing.sh"
        );
        assert_eq!(
            ShellError::Fork(io::Error::from(io::ErrorKind::OutOfMemory)).to_string(),
            "Error: Fork failed"
        );
        assert_eq!(
            ShellError::CommandNotFound("lss".into()).to_string(),
            "lss: Command not found"
        );
        assert_eq!(
            ShellError::LineTooLong.to_string(),
            "Error: Command line too long"
        );
        assert_eq!(ShellError::InvalidJid("abc".into()).to_string(), "Invalid jid abc");
    }

    #[test]
    fn only_startup_and_fork_failures_are_fatal() {
        assert!(ShellError::Usage.is_fatal());
        assert!(ShellError::Fork(io::Error::from(io::ErrorKind::Other)).is_fatal());
        assert!(!ShellError::CommandNotFound("x".into()).is_fatal());
        assert!(!ShellError::InvalidJid("0".into()).is_fatal());
        assert!(!ShellError::LineTooLong.is_fatal());
    }
}
