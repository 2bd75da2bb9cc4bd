//! The configured set of acceptable `(format, size)` combinations.
//!
//! The allow-list is read once at startup and never changes for the lifetime
//! of the process. Sizes are scoped per format: `24px` may be valid for
//! `svg` while being rejected for `png`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::file::IconFileKey;

/// Allowed icon sizes, keyed by file format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(IndexMap<String, Vec<String>>);

impl AllowList {
    pub fn new(formats: IndexMap<String, Vec<String>>) -> Self {
        Self(formats)
    }

    /// Build from `(format, [sizes])` pairs.
    pub fn from_pairs<F, S, I>(pairs: impl IntoIterator<Item = (F, I)>) -> Self
    where
        F: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(format, sizes)| (format.into(), sizes.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }

    pub fn is_allowed(&self, format: &str, size: &str) -> bool {
        self.0
            .get(format)
            .is_some_and(|sizes| sizes.iter().any(|s| s == size))
    }

    /// Check a file key against the list.
    pub fn validate(&self, key: &IconFileKey) -> Result<(), TypeError> {
        if self.is_allowed(&key.format, &key.size) {
            Ok(())
        } else {
            Err(TypeError::FormatOrSizeNotAllowed {
                format: key.format.clone(),
                size: key.size.clone(),
            })
        }
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn sizes(&self, format: &str) -> Option<&[String]> {
        self.0.get(format).map(Vec::as_slice)
    }

    /// Flattened view served to clients: every format, then every size
    /// across all formats without duplicates.
    pub fn summary(&self) -> AllowListSummary {
        let mut sizes: Vec<String> = Vec::new();
        for size in self.0.values().flatten() {
            if !sizes.contains(size) {
                sizes.push(size.clone());
            }
        }
        AllowListSummary {
            allowed_file_formats: self.0.keys().cloned().collect(),
            allowed_icon_sizes: sizes,
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::from_pairs([
            ("svg", vec!["18px", "24px", "48px"]),
            ("png", vec!["18dp", "24dp", "36dp", "48dp", "144dp"]),
        ])
    }
}

/// Client-facing, flattened form of the [`AllowList`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListSummary {
    pub allowed_file_formats: Vec<String>,
    pub allowed_icon_sizes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_allows_svg_and_png_sizes() {
        let list = AllowList::default();
        assert!(list.is_allowed("svg", "24px"));
        assert!(list.is_allowed("png", "144dp"));
        assert!(!list.is_allowed("png", "24px"));
        assert!(!list.is_allowed("gif", "24px"));
    }

    #[test]
    fn validate_reports_rejected_key() {
        let list = AllowList::default();
        let err = list.validate(&IconFileKey::new("svg", "36dp")).unwrap_err();
        assert_eq!(
            err,
            TypeError::FormatOrSizeNotAllowed {
                format: "svg".into(),
                size: "36dp".into()
            }
        );
    }

    #[test]
    fn default_summary_matches_client_contract() {
        let summary = AllowList::default().summary();
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({
                "allowedFileFormats": ["svg", "png"],
                "allowedIconSizes": ["18px", "24px", "48px", "18dp", "24dp", "36dp", "48dp", "144dp"]
            })
        );
    }

    #[test]
    fn summary_deduplicates_shared_sizes() {
        let list = AllowList::from_pairs([("a", vec!["1", "2"]), ("b", vec!["2", "3"])]);
        assert_eq!(list.summary().allowed_icon_sizes, vec!["1", "2", "3"]);
    }

    #[test]
    fn deserializes_from_toml_like_table() {
        let list: AllowList = serde_json::from_value(json!({ "french": ["great", "big"] })).unwrap();
        assert!(list.is_allowed("french", "big"));
        assert_eq!(list.formats().collect::<Vec<_>>(), vec!["french"]);
        assert_eq!(list.sizes("french").unwrap().len(), 2);
    }
}
