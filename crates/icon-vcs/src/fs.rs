//! On-disk blob version store.
//!
//! Layout under the root directory:
//!
//! ```text
//! objects/ab/cdef0123...   file bytes, named by BLAKE3 hash
//! commits.log              CRC-framed append-only commit log
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use crate::commit::{Change, Commit, CommitMessage, CommitRef};
use crate::error::{VcsError, VcsResult};
use crate::hash::{ContentHasher, ObjectId};
use crate::log::CommitLog;
use crate::snapshot::Snapshot;
use crate::traits::BlobVersionStore;

const OBJECTS_DIR: &str = "objects";
const LOG_FILE: &str = "commits.log";

/// A [`BlobVersionStore`] persisted to a directory.
///
/// Mutations are serialized by a writer lock; reads go through the in-memory
/// snapshot rebuilt from the log on open and never wait for a writer's I/O.
pub struct FsBlobStore {
    root: PathBuf,
    writer: AsyncMutex<()>,
    log: Arc<Mutex<CommitLog>>,
    snapshot: RwLock<Snapshot>,
}

impl FsBlobStore {
    /// Open (or create) a store rooted at `root`, replaying its commit log.
    pub async fn open(root: impl Into<PathBuf>) -> VcsResult<Self> {
        let root = root.into();
        let log_root = root.clone();
        let (log, commits) = blocking(move || {
            fs::create_dir_all(log_root.join(OBJECTS_DIR))?;
            CommitLog::open(&log_root.join(LOG_FILE))
        })
        .await?;
        let snapshot = Snapshot::replay(commits)?;
        info!(
            root = %root.display(),
            commits = snapshot.commit_count(),
            files = snapshot.file_count(),
            "blob store opened"
        );
        Ok(Self {
            root,
            writer: AsyncMutex::new(()),
            log: Arc::new(Mutex::new(log)),
            snapshot: RwLock::new(snapshot),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append `commit` to the log, then make it visible to readers.
    async fn commit(&self, commit: Commit) -> VcsResult<CommitRef> {
        self.snapshot.read().await.check(&commit)?;
        let log = Arc::clone(&self.log);
        let frame = commit.clone();
        blocking(move || {
            let mut log = log
                .lock()
                .map_err(|e| VcsError::Unavailable(format!("lock poisoned: {e}")))?;
            log.append(&frame)
        })
        .await?;
        let id = commit.id;
        self.snapshot.write().await.apply(commit)?;
        Ok(id)
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlobVersionStore for FsBlobStore {
    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        message: &CommitMessage,
    ) -> VcsResult<CommitRef> {
        let _writer = self.writer.lock().await;

        let object = ContentHasher::BLOB.hash(content);
        let root = self.root.clone();
        let data = content.to_vec();
        blocking(move || write_object(&root, &object, &data)).await?;

        let tip = self.snapshot.read().await.tip();
        let commit = Commit::new(
            tip,
            message,
            Change::Write {
                path: path.to_string(),
                object,
                size: content.len() as u64,
            },
        )?;
        let id = self.commit(commit).await?;
        debug!(path, object = %object.short_hex(), commit = %id.short(), "blob written");
        Ok(id)
    }

    async fn read_file(&self, path: &str) -> VcsResult<Option<Vec<u8>>> {
        let Some(id) = self.snapshot.read().await.object_at(path).copied() else {
            return Ok(None);
        };
        let root = self.root.clone();
        blocking(move || read_object(&root, &id)).await.map(Some)
    }

    async fn delete_file(&self, path: &str, message: &CommitMessage) -> VcsResult<CommitRef> {
        let _writer = self.writer.lock().await;

        let tip = {
            let snapshot = self.snapshot.read().await;
            if snapshot.object_at(path).is_none() {
                return Err(VcsError::PathNotFound(path.to_string()));
            }
            snapshot.tip()
        };
        let commit = Commit::new(
            tip,
            message,
            Change::Delete {
                path: path.to_string(),
            },
        )?;
        let id = self.commit(commit).await?;
        debug!(path, commit = %id.short(), "blob deleted");
        Ok(id)
    }

    async fn list_paths(&self) -> VcsResult<Vec<String>> {
        Ok(self.snapshot.read().await.paths())
    }

    async fn history(&self, limit: usize) -> VcsResult<Vec<Commit>> {
        Ok(self.snapshot.read().await.history(limit))
    }

    /// Re-reads and re-hashes every object the current tree references.
    async fn damaged_paths(&self) -> VcsResult<Vec<String>> {
        let entries: Vec<(String, ObjectId)> = self
            .snapshot
            .read()
            .await
            .entries()
            .map(|(path, id)| (path.to_string(), *id))
            .collect();
        let root = self.root.clone();
        let damaged = blocking(move || {
            let mut damaged = Vec::new();
            for (path, id) in entries {
                match read_object(&root, &id) {
                    Ok(_) => {}
                    Err(e @ (VcsError::MissingObject(_) | VcsError::CorruptObject { .. })) => {
                        warn!(%path, error = %e, "damaged object");
                        damaged.push(path);
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(damaged)
        })
        .await?;
        debug!(damaged = damaged.len(), "object check complete");
        Ok(damaged)
    }

    async fn reset(&self) -> VcsResult<()> {
        let _writer = self.writer.lock().await;
        let mut snapshot = self.snapshot.write().await;

        let root = self.root.clone();
        let log = Arc::clone(&self.log);
        blocking(move || {
            let mut log = log
                .lock()
                .map_err(|e| VcsError::Unavailable(format!("lock poisoned: {e}")))?;
            log.truncate()?;
            let objects = root.join(OBJECTS_DIR);
            match fs::remove_dir_all(&objects) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            fs::create_dir_all(&objects)?;
            Ok(())
        })
        .await?;

        *snapshot = Snapshot::new();
        info!(root = %self.root.display(), "blob store reset");
        Ok(())
    }
}

/// Run filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> VcsResult<T>
where
    F: FnOnce() -> VcsResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VcsError::Unavailable(format!("blocking task failed: {e}")))?
}

fn object_path(root: &Path, id: &ObjectId) -> PathBuf {
    let hex = id.to_hex();
    root.join(OBJECTS_DIR).join(&hex[..2]).join(&hex[2..])
}

/// Write an object unless it is already present.
///
/// Bytes go to a temporary sibling first and are renamed into place, so a
/// crash never leaves a partial object under its final name.
fn write_object(root: &Path, id: &ObjectId, data: &[u8]) -> VcsResult<()> {
    let path = object_path(root, id);
    if path.exists() {
        return Ok(());
    }
    let dir = path
        .parent()
        .ok_or_else(|| VcsError::Unavailable(format!("bad object path {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, &path)?;
    Ok(())
}

fn read_object(root: &Path, id: &ObjectId) -> VcsResult<Vec<u8>> {
    let data = match fs::read(object_path(root, id)) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(VcsError::MissingObject(*id)),
        Err(e) => return Err(e.into()),
    };
    if !ContentHasher::BLOB.verify(&data, id) {
        return Err(VcsError::CorruptObject {
            id: *id,
            reason: "content hash mismatch".into(),
        });
    }
    Ok(data)
}
