use std::path::PathBuf;

use thiserror::Error;

/// Bad meeting input. Reported inline; the conversation continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Meeting title cannot be empty")]
    EmptyTitle,

    #[error("Could not understand the time '{0}'")]
    UnparseableTime(String),

    #[error("No date or time found in '{0}'")]
    MissingTime(String),
}

/// A JSON document could not be read or written.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Disk full while writing {path}")]
    DiskFull { path: PathBuf },
}

impl StorageError {
    /// Wraps an I/O error, promoting out-of-space conditions to `DiskFull`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::StorageFull {
            StorageError::DiskFull { path }
        } else {
            StorageError::Io { path, source }
        }
    }

    /// Only a full disk is unrecoverable; everything else fails open.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::DiskFull { .. })
    }
}

/// The remote model could not produce a reply.
#[derive(Error, Debug)]
pub enum RemoteCallError {
    #[error("No API key configured (set GROQ_API_KEY)")]
    MissingApiKey,

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),
}

/// Configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Umbrella error for assistant operations
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for assistant operations
pub type AssistantResult<T> = Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_storage_full_is_fatal() {
        let err = StorageError::io("/tmp/x.json", io::Error::from(io::ErrorKind::StorageFull));
        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_other_io_errors_fail_open() {
        let err = StorageError::io(
            "/tmp/x.json",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: AssistantError = ValidationError::EmptyTitle.into();
        assert!(matches!(err, AssistantError::Validation(ValidationError::EmptyTitle)));
        assert_eq!(err.to_string(), "Meeting title cannot be empty");
    }
}
