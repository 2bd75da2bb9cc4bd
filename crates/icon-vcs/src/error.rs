use crate::hash::ObjectId;

/// Errors from blob version store operations.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// No file is committed at this path.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Stored object bytes no longer hash to their ID.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// The commit log names an object that is not in the object directory.
    #[error("missing object {0}")]
    MissingObject(ObjectId),

    /// A commit does not follow the current tip of the history.
    #[error("broken history: {0}")]
    BrokenHistory(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store cannot currently serve requests.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for blob version store operations.
pub type VcsResult<T> = Result<T, VcsError>;
