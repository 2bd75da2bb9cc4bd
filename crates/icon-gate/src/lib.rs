//! Authorization gate for the icon repository.
//!
//! Every mutating operation names the [`Privilege`] it requires and asks the
//! [`AuthorizationChecker`] before touching either store. The check is a pure
//! set-membership test with no I/O, so a denied request never causes a store
//! access.
//!
//! # Quick Start
//!
//! ```rust
//! use icon_gate::{AuthorizationChecker, Decision};
//! use icon_types::{Privilege, PrivilegeSet};
//!
//! let granted = PrivilegeSet::from([Privilege::AddIconFile]);
//! assert!(AuthorizationChecker::check(Privilege::AddIconFile, &granted).is_allowed());
//! assert_eq!(
//!     AuthorizationChecker::check(Privilege::CreateIcon, &granted),
//!     Decision::Denied { missing: Privilege::CreateIcon },
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use icon_types::{Caller, Privilege, PrivilegeSet};

/// Outcome of an authorization check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allowed,
    /// The caller lacks the named privilege.
    Denied { missing: Privilege },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "Allowed"),
            Self::Denied { missing } => write!(f, "Denied: missing {missing}"),
        }
    }
}

/// Privilege membership check.
pub struct AuthorizationChecker;

impl AuthorizationChecker {
    /// Allow iff `required` is among `granted`.
    pub fn check(required: Privilege, granted: &PrivilegeSet) -> Decision {
        if granted.contains(required) {
            Decision::Allowed
        } else {
            Decision::Denied { missing: required }
        }
    }

    /// Check on behalf of a caller, logging denials.
    pub fn check_caller(required: Privilege, caller: &Caller) -> Decision {
        let decision = Self::check(required, &caller.privileges);
        if decision.is_denied() {
            tracing::debug!(user = %caller.user, privilege = %required, "authorization denied");
        }
        decision
    }
}
