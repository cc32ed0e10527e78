use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process ID {owner} has a lock on {}. Cannot save.", path.display())]
    LockHeld { owner: String, path: PathBuf },

    #[error("Format error: {0}")]
    Format(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProxyError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProxyError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Format-class failures: unreadable content, whether malformed or undecryptable.
    pub fn is_format(&self) -> bool {
        matches!(self, ProxyError::Format(_) | ProxyError::Decryption(_))
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
