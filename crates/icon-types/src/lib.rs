//! Foundation types for the icon repository.
//!
//! This crate provides the vocabulary shared by every other crate in the
//! workspace: validated icon names, `(format, size)` file keys, the canonical
//! retrieval paths derived from them, icon descriptors as served to clients,
//! the closed set of privileges, and the configured format/size allow-list.
//!
//! # Key Types
//!
//! - [`IconName`] — validated, case-sensitive icon name
//! - [`IconFileKey`] — `(format, size)` pair identifying one file of an icon
//! - [`IconDescriptor`] — an icon's name and its format → size → path map
//! - [`Privilege`] / [`PrivilegeSet`] — capabilities required by mutations
//! - [`Caller`] — authenticated user name plus granted privileges
//! - [`AllowList`] — the allowed `(format, size)` combinations

pub mod allow_list;
pub mod descriptor;
pub mod error;
pub mod file;
pub mod name;
pub mod privilege;

pub use allow_list::{AllowList, AllowListSummary};
pub use descriptor::IconDescriptor;
pub use error::TypeError;
pub use file::{icon_file_path, IconFileKey};
pub use name::{validate_icon_name, IconName};
pub use privilege::{Caller, Privilege, PrivilegeSet};
