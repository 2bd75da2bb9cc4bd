//! In-memory blob version store for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::commit::{Change, Commit, CommitMessage, CommitRef};
use crate::error::{VcsError, VcsResult};
use crate::hash::{ContentHasher, ObjectId};
use crate::snapshot::Snapshot;
use crate::traits::BlobVersionStore;

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectId, Vec<u8>>,
    snapshot: Snapshot,
}

/// An in-memory implementation of [`BlobVersionStore`].
///
/// Objects and the commit history are held behind one `RwLock`, so each
/// mutation is applied atomically. Objects are never dropped, matching the
/// retention of the on-disk store.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    state: RwLock<State>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct objects held.
    pub fn object_count(&self) -> usize {
        self.state.read().map(|s| s.objects.len()).unwrap_or(0)
    }

    /// Number of commits recorded.
    pub fn commit_count(&self) -> usize {
        self.state
            .read()
            .map(|s| s.snapshot.commit_count())
            .unwrap_or(0)
    }

    fn read(&self) -> VcsResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| VcsError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> VcsResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| VcsError::Unavailable(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl BlobVersionStore for InMemoryBlobStore {
    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &CommitMessage,
    ) -> VcsResult<CommitRef> {
        let object = ContentHasher::BLOB.hash(content);
        let mut state = self.write()?;
        let commit = Commit::new(
            state.snapshot.tip(),
            message,
            Change::Write {
                path: path.to_string(),
                object,
                size: content.len() as u64,
            },
        )?;
        let id = commit.id;
        state.objects.entry(object).or_insert_with(|| content.to_vec());
        state.snapshot.apply(commit)?;
        debug!(path, commit = %id.short(), "blob written");
        Ok(id)
    }

    async fn read_file(&self, path: &str) -> VcsResult<Option<Vec<u8>>> {
        let state = self.read()?;
        match state.snapshot.object_at(path) {
            None => Ok(None),
            Some(id) => state
                .objects
                .get(id)
                .cloned()
                .map(Some)
                .ok_or(VcsError::MissingObject(*id)),
        }
    }

    async fn delete_file(&self, path: &str, message: &CommitMessage) -> VcsResult<CommitRef> {
        let mut state = self.write()?;
        if state.snapshot.object_at(path).is_none() {
            return Err(VcsError::PathNotFound(path.to_string()));
        }
        let commit = Commit::new(
            state.snapshot.tip(),
            message,
            Change::Delete {
                path: path.to_string(),
            },
        )?;
        let id = commit.id;
        state.snapshot.apply(commit)?;
        debug!(path, commit = %id.short(), "blob deleted");
        Ok(id)
    }

    async fn list_paths(&self) -> VcsResult<Vec<String>> {
        Ok(self.read()?.snapshot.paths())
    }

    async fn history(&self, limit: usize) -> VcsResult<Vec<Commit>> {
        Ok(self.read()?.snapshot.history(limit))
    }

    async fn damaged_paths(&self) -> VcsResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .snapshot
            .entries()
            .filter(|(_, id)| {
                state
                    .objects
                    .get(*id)
                    .map_or(true, |data| !ContentHasher::BLOB.verify(data, id))
            })
            .map(|(path, _)| path.to_string())
            .collect())
    }

    async fn reset(&self) -> VcsResult<()> {
        *self.write()? = State::default();
        Ok(())
    }
}
