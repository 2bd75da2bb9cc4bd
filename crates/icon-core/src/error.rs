use icon_meta::MetaError;
use icon_types::{Privilege, TypeError};
use icon_vcs::VcsError;

/// Failures of coordinator operations.
///
/// The first five variants are expected outcomes of a well-formed request.
/// `StorageInconsistency` means the two stores may disagree and an operator
/// has to look; `AdapterUnavailable` is transient and may be retried.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("user {user} lacks privilege {required}")]
    Forbidden { user: String, required: Privilege },

    #[error("format {format:?} with size {size:?} is not allowed")]
    InvalidFormatOrSize { format: String, size: String },

    #[error("{0}")]
    InvalidName(String),

    #[error("storage inconsistency: {0}")]
    StorageInconsistency(String),

    #[error("storage adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

impl CoreError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidFormatOrSize { .. } => "invalid_format_or_size",
            Self::InvalidName(_) => "invalid_name",
            Self::StorageInconsistency(_) => "storage_inconsistency",
            Self::AdapterUnavailable(_) => "adapter_unavailable",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<TypeError> for CoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::FormatOrSizeNotAllowed { format, size } => {
                Self::InvalidFormatOrSize { format, size }
            }
            other => Self::InvalidName(other.to_string()),
        }
    }
}

impl From<MetaError> for CoreError {
    fn from(err: MetaError) -> Self {
        match err {
            MetaError::IconNotFound(_) | MetaError::FileNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            MetaError::AlreadyExists { .. } => Self::AlreadyExists(err.to_string()),
            MetaError::Corrupt(_) => Self::StorageInconsistency(err.to_string()),
            MetaError::Unavailable(_) | MetaError::Sqlite(_) => {
                Self::AdapterUnavailable(err.to_string())
            }
        }
    }
}

impl From<VcsError> for CoreError {
    fn from(err: VcsError) -> Self {
        match err {
            VcsError::PathNotFound(_) => Self::NotFound(err.to_string()),
            VcsError::CorruptObject { .. }
            | VcsError::MissingObject(_)
            | VcsError::BrokenHistory(_) => Self::StorageInconsistency(err.to_string()),
            VcsError::Serialization(_) | VcsError::Io(_) | VcsError::Unavailable(_) => {
                Self::AdapterUnavailable(err.to_string())
            }
        }
    }
}

/// Result alias for coordinator operations.
pub type CoreResult<T> = Result<T, CoreError>;
