//! Versioned blob store for icon files.
//!
//! File bytes are kept as immutable, content-addressed objects (BLAKE3,
//! domain-separated). Every mutation of a path -- a write or a delete -- is
//! recorded as a [`Commit`] appended to a linear history. Commits are never
//! rewritten or removed, so the full history of every icon file is retained.
//!
//! There is no staging area: each `write_file` / `delete_file` call is one
//! independent commit touching exactly one path.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobVersionStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- map-based store for tests and embedding
//! - [`FsBlobStore`] -- `objects/` directory plus a CRC-framed `commits.log`
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; the same bytes always map to the
//!    same [`ObjectId`].
//! 2. Write-then-commit: the object is durable before the commit naming it.
//! 3. The current tree is derived by replaying commits, never stored apart.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod commit;
pub mod error;
pub mod fs;
pub mod hash;
pub mod log;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use commit::{Change, Commit, CommitMessage, CommitRef};
pub use error::{VcsError, VcsResult};
pub use fs::FsBlobStore;
pub use hash::{ContentHasher, ObjectId};
pub use memory::InMemoryBlobStore;
pub use snapshot::Snapshot;
pub use traits::BlobVersionStore;
