use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::file::{icon_file_path, IconFileKey};
use crate::name::IconName;

/// Client-facing description of an icon.
///
/// `paths` maps format → (size → retrieval path). Both levels keep the order
/// in which the files were added to the icon.
///
/// ```text
/// { "name": "zazie",
///   "paths": { "french": { "great": "/icons/zazie/formats/french/sizes/great" } } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDescriptor {
    pub name: String,
    pub paths: IndexMap<String, IndexMap<String, String>>,
}

impl IconDescriptor {
    /// Build a descriptor from an icon's file keys, in insertion order.
    pub fn new<'a>(name: &IconName, files: impl IntoIterator<Item = &'a IconFileKey>) -> Self {
        let mut paths: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        for key in files {
            paths
                .entry(key.format.clone())
                .or_default()
                .insert(key.size.clone(), icon_file_path(name, key));
        }
        Self {
            name: name.to_string(),
            paths,
        }
    }

    /// Look up the retrieval path of one file.
    pub fn path(&self, format: &str, size: &str) -> Option<&str> {
        self.paths.get(format)?.get(size).map(String::as_str)
    }

    /// Total number of files described.
    pub fn file_count(&self) -> usize {
        self.paths.values().map(IndexMap::len).sum()
    }
}
