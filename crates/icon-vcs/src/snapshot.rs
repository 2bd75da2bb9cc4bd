use std::collections::BTreeMap;

use crate::commit::{Change, Commit, CommitRef};
use crate::error::{VcsError, VcsResult};
use crate::hash::ObjectId;

/// The tree and history obtained by replaying commits in order.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    files: BTreeMap<String, ObjectId>,
    commits: Vec<Commit>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a snapshot from a full commit sequence, oldest first.
    pub fn replay<I>(commits: I) -> VcsResult<Self>
    where
        I: IntoIterator<Item = Commit>,
    {
        let mut snapshot = Self::new();
        for commit in commits {
            snapshot.apply(commit)?;
        }
        Ok(snapshot)
    }

    /// Check that `commit` can be appended on top of the current tip.
    pub fn check(&self, commit: &Commit) -> VcsResult<()> {
        if commit.parent != self.tip() {
            return Err(VcsError::BrokenHistory(format!(
                "commit {} has parent {:?}, tip is {:?}",
                commit.id.short(),
                commit.parent,
                self.tip()
            )));
        }
        if let Change::Delete { path } = &commit.change {
            if !self.files.contains_key(path) {
                return Err(VcsError::PathNotFound(path.clone()));
            }
        }
        Ok(())
    }

    /// Append a commit, updating the tree.
    pub fn apply(&mut self, commit: Commit) -> VcsResult<()> {
        self.check(&commit)?;
        match &commit.change {
            Change::Write { path, object, .. } => {
                self.files.insert(path.clone(), *object);
            }
            Change::Delete { path } => {
                self.files.remove(path);
            }
        }
        self.commits.push(commit);
        Ok(())
    }

    pub fn tip(&self) -> Option<CommitRef> {
        self.commits.last().map(|c| c.id)
    }

    pub fn object_at(&self, path: &str) -> Option<&ObjectId> {
        self.files.get(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Up to `limit` commits, newest first.
    pub fn history(&self, limit: usize) -> Vec<Commit> {
        self.commits.iter().rev().take(limit).cloned().collect()
    }

    /// Every path in the current tree with the object it points at, by path.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ObjectId)> {
        self.files.iter().map(|(path, id)| (path.as_str(), id))
    }
}
