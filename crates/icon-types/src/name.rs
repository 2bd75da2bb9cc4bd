//! Icon name validation.
//!
//! Icon names become a path segment of every blob stored for the icon, so
//! they are restricted to what is safe inside a single path component:
//! - Must be non-empty
//! - Must not contain `/` or `\`
//! - Must not be `.` or `..`
//! - Must not contain control characters
//!
//! Names are otherwise opaque and case-sensitive: `Zazie` and `zazie` are
//! different icons.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that would split the name into more than one path segment.
const SEPARATORS: &[char] = &['/', '\\'];

/// Validate an icon name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use icon_types::name::validate_icon_name;
///
/// assert!(validate_icon_name("zazie").is_ok());
/// assert!(validate_icon_name("").is_err());
/// assert!(validate_icon_name("a/b").is_err());
/// ```
pub fn validate_icon_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidIconName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("icon name must not be empty"));
    }

    if let Some(ch) = name.chars().find(|c| SEPARATORS.contains(c)) {
        return Err(TypeError::InvalidIconName {
            name: name.to_string(),
            reason: format!("contains path separator {ch:?}"),
        });
    }

    if name == "." || name == ".." {
        return Err(invalid("must not be a relative path component"));
    }

    if name.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }

    Ok(())
}

/// A validated icon name.
///
/// Construction goes through [`IconName::new`], so holding an `IconName`
/// means the name is safe to embed in a storage path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IconName(String);

impl IconName {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_icon_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for IconName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IconName> for String {
    fn from(name: IconName) -> Self {
        name.0
    }
}

impl AsRef<str> for IconName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IconName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IconName({})", self.0)
    }
}

impl fmt::Display for IconName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
