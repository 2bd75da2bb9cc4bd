use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VcsError, VcsResult};
use crate::hash::{ContentHasher, ObjectId};

/// Identifier of a commit: the hash of its contents, parent included.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitRef(ObjectId);

impl CommitRef {
    pub fn object_id(&self) -> &ObjectId {
        &self.0
    }

    pub fn short(&self) -> String {
        self.0.short_hex()
    }
}

impl fmt::Debug for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitRef({})", self.0.short_hex())
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is committing, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub author: String,
    pub message: String,
}

impl CommitMessage {
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
        }
    }
}

/// The single path change a commit records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Write {
        path: String,
        object: ObjectId,
        size: u64,
    },
    Delete {
        path: String,
    },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Self::Write { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// An entry in the append-only history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitRef,
    pub parent: Option<CommitRef>,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub change: Change,
}

/// The hashed portion of a commit: everything except its own ID.
#[derive(Serialize)]
struct CommitBody<'a> {
    parent: &'a Option<CommitRef>,
    author: &'a str,
    message: &'a str,
    timestamp: &'a DateTime<Utc>,
    change: &'a Change,
}

fn compute_id(
    parent: &Option<CommitRef>,
    author: &str,
    message: &str,
    timestamp: &DateTime<Utc>,
    change: &Change,
) -> VcsResult<CommitRef> {
    let body = CommitBody {
        parent,
        author,
        message,
        timestamp,
        change,
    };
    let bytes = bincode::serialize(&body).map_err(|e| VcsError::Serialization(e.to_string()))?;
    Ok(CommitRef(ContentHasher::COMMIT.hash(&bytes)))
}

impl Commit {
    /// Create a commit on top of `parent`, timestamped now.
    pub fn new(parent: Option<CommitRef>, message: &CommitMessage, change: Change) -> VcsResult<Self> {
        let timestamp = Utc::now();
        let id = compute_id(&parent, &message.author, &message.message, &timestamp, &change)?;
        Ok(Self {
            id,
            parent,
            author: message.author.clone(),
            message: message.message.clone(),
            timestamp,
            change,
        })
    }

    /// Recompute the ID from the contents and compare.
    pub fn verify_id(&self) -> bool {
        compute_id(
            &self.parent,
            &self.author,
            &self.message,
            &self.timestamp,
            &self.change,
        )
        .is_ok_and(|id| id == self.id)
    }

    pub fn path(&self) -> &str {
        self.change.path()
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.change, Change::Delete { .. })
    }
}
