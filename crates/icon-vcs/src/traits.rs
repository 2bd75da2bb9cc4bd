use async_trait::async_trait;

use crate::commit::{Commit, CommitMessage, CommitRef};
use crate::error::VcsResult;

/// Path-addressed file store in which every mutation is a commit.
///
/// All implementations must satisfy these invariants:
/// - Each `write_file` / `delete_file` produces exactly one new commit on top
///   of the current head, or fails without producing one.
/// - File bytes are durable before the commit that names them.
/// - Commits are never rewritten or removed, except by `reset`.
/// - Reads observe only committed state.
#[async_trait]
pub trait BlobVersionStore: Send + Sync {
    /// Store `content` at `path` and commit the change.
    ///
    /// Overwriting an existing path is allowed and produces a new commit.
    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &CommitMessage,
    ) -> VcsResult<CommitRef>;

    /// Read the bytes currently committed at `path`.
    ///
    /// Returns `Ok(None)` if no file is committed there.
    async fn read_file(&self, path: &str) -> VcsResult<Option<Vec<u8>>>;

    /// Remove `path` from the tree and commit the removal.
    ///
    /// Fails with `PathNotFound` if nothing is committed at `path`.
    async fn delete_file(&self, path: &str, message: &CommitMessage) -> VcsResult<CommitRef>;

    /// Every path in the current tree, sorted.
    async fn list_paths(&self) -> VcsResult<Vec<String>>;

    /// Up to `limit` commits, newest first.
    async fn history(&self, limit: usize) -> VcsResult<Vec<Commit>>;

    /// Paths in the current tree whose stored bytes are missing or no longer
    /// hash to the object their commit names. Sorted.
    async fn damaged_paths(&self) -> VcsResult<Vec<String>>;

    /// The newest commit, if any.
    async fn head(&self) -> VcsResult<Option<CommitRef>> {
        Ok(self.history(1).await?.first().map(|c| c.id))
    }

    /// Discard all files and history.
    async fn reset(&self) -> VcsResult<()>;
}
