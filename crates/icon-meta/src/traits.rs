use async_trait::async_trait;

use icon_types::{IconFileKey, IconName};

use crate::error::MetaResult;
use crate::record::{FileRemoval, IconRecord};

/// Relational index of icons and their files.
///
/// All implementations must satisfy these invariants:
/// - Each method is atomic: it either applies completely or not at all.
/// - `(name, format, size)` is unique.
/// - An icon row exists exactly while it has at least one file.
/// - Implementations never issue work spanning more than one call.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read one icon's row.
    ///
    /// Returns `Ok(None)` if the icon does not exist.
    async fn get_icon(&self, name: &IconName) -> MetaResult<Option<IconRecord>>;

    /// Every icon, in creation order.
    async fn list_icons(&self) -> MetaResult<Vec<IconRecord>>;

    /// Record a file for `name`, creating the icon row if absent.
    ///
    /// Fails with `AlreadyExists` if the icon already has this key.
    async fn insert_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<()>;

    /// Remove a file row, and the icon row too if this was its last file.
    ///
    /// Fails with `IconNotFound` or `FileNotFound` when there is nothing to
    /// remove.
    async fn delete_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<FileRemoval>;

    /// Drop every row. Used when the repository is configured to start empty.
    async fn reset(&self) -> MetaResult<()>;
}
