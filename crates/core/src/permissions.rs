//! Notebook access levels and the capability check consulted by every
//! notebook and chapter handler.
//!
//! Access to a notebook is resolved once per request into an [`Access`]
//! value, then each operation asks [`can`] (or [`require`]) whether that
//! access grants the [`Capability`] it needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Permission levels
// ---------------------------------------------------------------------------

pub const LEVEL_ADMIN: &str = "admin";
pub const LEVEL_EDITOR: &str = "editor";
pub const LEVEL_VIEW_ONLY: &str = "view-only";

/// A level stored in a notebook's (or chapter snapshot's) permission list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionLevel {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "editor")]
    Editor,
    #[serde(rename = "view-only")]
    ViewOnly,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::Admin => LEVEL_ADMIN,
            PermissionLevel::Editor => LEVEL_EDITOR,
            PermissionLevel::ViewOnly => LEVEL_VIEW_ONLY,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            LEVEL_ADMIN => Ok(PermissionLevel::Admin),
            LEVEL_EDITOR => Ok(PermissionLevel::Editor),
            LEVEL_VIEW_ONLY => Ok(PermissionLevel::ViewOnly),
            other => Err(format!(
                "Invalid permission level '{other}'. Must be one of: admin, editor, view-only"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Access and capabilities
// ---------------------------------------------------------------------------

/// How the current user relates to a notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Granted(PermissionLevel),
    None,
}

/// An operation on a notebook or one of its chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Update,
    Delete,
    AddChapter,
    Share,
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Capability::Read => "view",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::AddChapter => "add chapters to",
            Capability::Share => "share",
        }
    }
}

/// Resolve the caller's access from the owner id and any stored grant.
pub fn resolve_access(owner_id: DbId, user_id: DbId, granted: Option<PermissionLevel>) -> Access {
    if owner_id == user_id {
        Access::Owner
    } else {
        granted.map_or(Access::None, Access::Granted)
    }
}

/// The capability table.
///
/// The owner holds every capability. Grantees of any level may read; the
/// levels are recorded but do not yet unlock writes.
pub fn can(access: Access, capability: Capability) -> bool {
    match access {
        Access::Owner => true,
        Access::Granted(_) => matches!(capability, Capability::Read),
        Access::None => false,
    }
}

/// [`can`] as a `Result`, producing a `Forbidden` error naming the operation.
pub fn require(access: Access, capability: Capability, entity: &str) -> Result<(), CoreError> {
    if can(access, capability) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "You do not have permission to {} this {entity}",
            capability.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Capability; 5] = [
        Capability::Read,
        Capability::Update,
        Capability::Delete,
        Capability::AddChapter,
        Capability::Share,
    ];

    #[test]
    fn owner_has_every_capability() {
        for cap in ALL {
            assert!(can(Access::Owner, cap), "{cap:?}");
        }
    }

    #[test]
    fn grantees_only_read() {
        for level in [
            PermissionLevel::Admin,
            PermissionLevel::Editor,
            PermissionLevel::ViewOnly,
        ] {
            assert!(can(Access::Granted(level), Capability::Read));
            assert!(!can(Access::Granted(level), Capability::Update));
            assert!(!can(Access::Granted(level), Capability::Delete));
        }
    }

    #[test]
    fn strangers_have_nothing() {
        for cap in ALL {
            assert!(!can(Access::None, cap));
        }
    }

    #[test]
    fn resolve_access_prefers_ownership() {
        assert_eq!(
            resolve_access(7, 7, Some(PermissionLevel::ViewOnly)),
            Access::Owner
        );
        assert_eq!(
            resolve_access(7, 8, Some(PermissionLevel::Editor)),
            Access::Granted(PermissionLevel::Editor)
        );
        assert_eq!(resolve_access(7, 8, None), Access::None);
    }

    #[test]
    fn require_reports_forbidden() {
        let err = require(Access::None, Capability::Delete, "notebook").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert!(err.to_string().contains("delete this notebook"));
    }

    #[test]
    fn level_parses_wire_names() {
        assert_eq!("view-only".parse::<PermissionLevel>(), Ok(PermissionLevel::ViewOnly));
        assert_eq!("admin".parse::<PermissionLevel>(), Ok(PermissionLevel::Admin));
        assert!("owner".parse::<PermissionLevel>().is_err());
    }
}
