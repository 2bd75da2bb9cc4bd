use std::fmt;

use serde::{Deserialize, Serialize};

use crate::name::IconName;

/// Identifies one file of an icon: a `(format, size)` pair.
///
/// Keys are unique within one icon. Whether a key is acceptable at all is
/// decided by the [`AllowList`](crate::AllowList), not by this type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IconFileKey {
    pub format: String,
    pub size: String,
}

impl IconFileKey {
    pub fn new(format: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            size: size.into(),
        }
    }
}

impl fmt::Display for IconFileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.format, self.size)
    }
}

/// Canonical retrieval path of an icon file.
///
/// The same string is the path under which the file's bytes are committed to
/// the blob version store, so readers and writers agree on it by
/// construction.
pub fn icon_file_path(name: &IconName, key: &IconFileKey) -> String {
    format!(
        "/icons/{}/formats/{}/sizes/{}",
        name, key.format, key.size
    )
}
