//! Metadata index for the icon repository.
//!
//! The metadata store is the relational projection of the repository: for
//! every icon, the ordered list of `(format, size)` pairs it has files for.
//! It never holds file bytes; those live in the blob version store.
//!
//! # Storage Backends
//!
//! All backends implement the [`MetadataStore`] trait:
//!
//! - [`InMemoryMetadataStore`] -- `IndexMap`-based store for tests and embedding
//! - [`SqliteMetadataStore`] -- SQLite database, one transaction per call
//!
//! # Design Rules
//!
//! 1. Every trait method is one self-contained atomic unit.
//! 2. An icon row exists iff it has at least one file row.
//! 3. Icons list in creation order; files list in insertion order.
//! 4. Constraint violations surface as typed errors, never as generic failures.

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use error::{MetaError, MetaResult};
pub use memory::InMemoryMetadataStore;
pub use record::{FileRemoval, IconRecord};
pub use sqlite::SqliteMetadataStore;
pub use traits::MetadataStore;
