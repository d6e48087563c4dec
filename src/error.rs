use std::io;
use thiserror::Error;

/// Custom error type for procwatch
#[derive(Error, Debug)]
pub enum ProcwatchError {
    #[error("process {pid} is gone")]
    ProcessGone { pid: u32 },

    #[error("access denied to process {pid}: {detail}")]
    AccessDenied { pid: u32, detail: String },

    #[error("query of {field} for process {pid} timed out")]
    QueryTimeout { pid: u32, field: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Launch error: {0}")]
    Launch(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for procwatch
pub type Result<T> = std::result::Result<T, ProcwatchError>;

/// Failure classes the sampler reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    ProcessGone,
    AccessDenied,
    QueryTimeout,
    ConfigError,
    Other,
}

impl ErrorKind {
    /// Fatal kinds end the session immediately. A timeout only becomes fatal
    /// after it repeats, which the sampler tracks itself.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::QueryTimeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::ProcessGone => "ProcessGone",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::QueryTimeout => "QueryTimeout",
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

impl ProcwatchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Config(msg.into())
    }

    /// Create a launch error
    pub fn launch<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Launch(msg.into())
    }

    /// Create an access denied error
    pub fn access_denied<S: Into<String>>(pid: u32, detail: S) -> Self {
        ProcwatchError::AccessDenied {
            pid,
            detail: detail.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Other(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcwatchError::ProcessGone { .. } => ErrorKind::ProcessGone,
            ProcwatchError::AccessDenied { .. } => ErrorKind::AccessDenied,
            ProcwatchError::QueryTimeout { .. } => ErrorKind::QueryTimeout,
            ProcwatchError::Config(_) | ProcwatchError::Launch(_) => ErrorKind::ConfigError,
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ProcwatchError::ProcessGone { pid: 1 }.kind(),
            ErrorKind::ProcessGone
        );
        assert_eq!(
            ProcwatchError::access_denied(1, "nope").kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            ProcwatchError::QueryTimeout { pid: 1, field: "io" }.kind(),
            ErrorKind::QueryTimeout
        );
        assert_eq!(
            ProcwatchError::config("bad interval").kind(),
            ErrorKind::ConfigError
        );
        assert_eq!(
            ProcwatchError::launch("missing").kind(),
            ErrorKind::ConfigError
        );
    }

    #[test]
    fn test_only_timeout_is_transient() {
        assert!(ErrorKind::ProcessGone.is_fatal());
        assert!(ErrorKind::AccessDenied.is_fatal());
        assert!(ErrorKind::Other.is_fatal());
        assert!(!ErrorKind::QueryTimeout.is_fatal());
    }

    #[test]
    fn test_display_includes_pid() {
        let err = ProcwatchError::QueryTimeout {
            pid: 42,
            field: "threads",
        };
        assert_eq!(err.to_string(), "query of threads for process 42 timed out");
    }
}
