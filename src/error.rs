use serde::Serialize;

/// Error taxonomy shared by the repository, bundle store, generator and HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum LocalizationError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("AI provider error: {0}")]
    UpstreamProvider(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocalizationError>;

/// Coarse classification used in batch error lists and audit details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    UpstreamProvider,
    Unauthorized,
    Forbidden,
    Internal,
}

impl LocalizationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::UpstreamProvider(_) => ErrorKind::UpstreamProvider,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Storage failures worth another attempt: dropped connections, pool
    /// exhaustion and SQLite busy/locked.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(sqlx::Error::Io(_))
            | Self::Storage(sqlx::Error::PoolTimedOut)
            | Self::Storage(sqlx::Error::WorkerCrashed) => true,
            Self::Storage(sqlx::Error::Database(db)) => {
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
                matches!(
                    db.code().and_then(|c| c.parse::<i32>().ok()).map(|c| c & 0xff),
                    Some(5) | Some(6)
                )
            }
            _ => false,
        }
    }
}

/// Outcome of a batch operation (import, bulk generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    Complete,
    PartialBatchFailure,
    Failed,
}

impl BatchOutcome {
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => Self::Complete,
            (0, _) => Self::Failed,
            _ => Self::PartialBatchFailure,
        }
    }
}

/// One failed entry of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntryError {
    pub entry: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl BatchEntryError {
    pub fn new(entry: impl Into<String>, error: &LocalizationError) -> Self {
        Self {
            entry: entry.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
