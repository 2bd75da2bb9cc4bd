use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A named capability required by a mutating icon operation.
///
/// The set is closed: privileges are checked by membership, never by string
/// comparison at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    /// Create a new icon together with its first file.
    CreateIcon,
    /// Add a file to an existing icon.
    AddIconFile,
    /// Remove a single file, or a whole icon file by file.
    RemoveIconFile,
}

impl Privilege {
    /// Every privilege, in declaration order.
    pub const ALL: [Privilege; 3] = [
        Privilege::CreateIcon,
        Privilege::AddIconFile,
        Privilege::RemoveIconFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIcon => "CREATE_ICON",
            Self::AddIconFile => "ADD_ICON_FILE",
            Self::RemoveIconFile => "REMOVE_ICON_FILE",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TypeError::UnknownPrivilege(s.to_string()))
    }
}

/// The privileges granted to one caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeSet(BTreeSet<Privilege>);

impl PrivilegeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A set holding every privilege.
    pub fn all() -> Self {
        Self(Privilege::ALL.into_iter().collect())
    }

    pub fn contains(&self, privilege: Privilege) -> bool {
        self.0.contains(&privilege)
    }

    pub fn insert(&mut self, privilege: Privilege) -> bool {
        self.0.insert(privilege)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Privilege> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Privilege> for PrivilegeSet {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Privilege; N]> for PrivilegeSet {
    fn from(privileges: [Privilege; N]) -> Self {
        privileges.into_iter().collect()
    }
}

/// An authenticated caller: who they are and what they may do.
///
/// The user name is recorded as the author of every commit the caller's
/// mutations produce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user: String,
    pub privileges: PrivilegeSet,
}

impl Caller {
    pub fn new(user: impl Into<String>, privileges: impl Into<PrivilegeSet>) -> Self {
        Self {
            user: user.into(),
            privileges: privileges.into(),
        }
    }

    /// Caller with no privileges; sufficient for read-only operations.
    pub fn anonymous() -> Self {
        Self::new("anonymous", PrivilegeSet::empty())
    }
}
