use icon_types::{IconFileKey, IconName};

/// Errors from metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// No row exists for the icon.
    #[error("icon not found: {0}")]
    IconNotFound(IconName),

    /// The icon exists but has no file with this key.
    #[error("icon {name} has no file {key}")]
    FileNotFound { name: IconName, key: IconFileKey },

    /// The icon already has a file with this key.
    #[error("icon {name} already has file {key}")]
    AlreadyExists { name: IconName, key: IconFileKey },

    /// A stored row could not be decoded.
    #[error("corrupt metadata row: {0}")]
    Corrupt(String),

    /// The backing database could not be reached or used.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// Error reported by SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MetaError {
    /// Returns `true` for the "row does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IconNotFound(_) | Self::FileNotFound { .. })
    }
}

/// Result alias for metadata store operations.
pub type MetaResult<T> = Result<T, MetaError>;
