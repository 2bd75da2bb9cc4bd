use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid icon name {name:?}: {reason}")]
    InvalidIconName { name: String, reason: String },

    #[error("format {format:?} with size {size:?} is not allowed")]
    FormatOrSizeNotAllowed { format: String, size: String },

    #[error("unknown privilege: {0}")]
    UnknownPrivilege(String),
}
