//! Icon storage coordinator.
//!
//! An icon exists only while both of these hold:
//!
//! - the metadata index ([`icon_meta::MetadataStore`]) has a row for it, and
//! - the blob version store ([`icon_vcs::BlobVersionStore`]) has a committed
//!   file at each of its canonical paths.
//!
//! [`IconStorageCoordinator`] is the only component that changes either
//! store. It checks the caller's privileges, validates names and
//! `(format, size)` keys against the [`AllowList`](icon_types::AllowList),
//! serializes mutations per icon name, and undoes a half-applied mutation
//! when its second step fails.
//!
//! # Example
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use icon_core::IconStorageCoordinator;
//! use icon_meta::InMemoryMetadataStore;
//! use icon_types::{AllowList, Caller, PrivilegeSet};
//! use icon_vcs::InMemoryBlobStore;
//!
//! let coordinator = IconStorageCoordinator::new(
//!     Arc::new(InMemoryMetadataStore::new()),
//!     Arc::new(InMemoryBlobStore::new()),
//!     AllowList::default(),
//! );
//! let caller = Caller::new("ux", PrivilegeSet::all());
//!
//! coordinator
//!     .create_icon("attach", "svg", "24px", Bytes::from_static(b"<svg/>"), &caller)
//!     .await
//!     .unwrap();
//! let bytes = coordinator
//!     .get_icon_file_content("attach", "svg", "24px")
//!     .await
//!     .unwrap();
//! assert_eq!(&bytes[..], b"<svg/>");
//! # });
//! ```

pub mod coordinator;
pub mod error;
pub mod locks;
pub mod report;

pub use coordinator::{IconFile, IconStorageCoordinator};
pub use error::{CoreError, CoreResult};
pub use locks::{NameGuard, NameLocks};
pub use report::ConsistencyReport;
