//! # Roles and Permissions
//!
//! An immutable lookup table from organization role to allowed actions.
//!
//! ```text
//! ┌────────────┬──────┬────────┬───────┬────────┬─────────┬───────┬──────┐
//! │ Role       │ view │ manage │ reset │ delete │ doctype │ issue │ docs │
//! ├────────────┼──────┼────────┼───────┼────────┼─────────┼───────┼──────┤
//! │ owner      │  ✓   │   ✓    │   ✓   │   ✓    │    ✓    │   ✓   │  ✓   │
//! │ admin      │  ✓   │   ✓    │   ✓   │   ✓    │    ✓    │   ✓   │  ✓   │
//! │ accountant │  ✓   │        │   ✓   │        │         │   ✓   │  ✓   │
//! │ seller     │  ✓   │        │       │        │         │   ✓   │  ✓   │
//! │ viewer     │  ✓   │        │       │        │         │       │  ✓   │
//! └────────────┴──────┴────────┴───────┴────────┴─────────┴───────┴──────┘
//! ```
//!
//! Owners and admins currently share the same grants; owners differ only in
//! organization administration, which lives outside this workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Permission
// =============================================================================

/// An action guarded by the role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewSequences,
    ManageSequences,
    ResetSequences,
    DeleteSequences,
    ManageDocumentTypes,
    IssueDocuments,
    ViewDocuments,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewSequences => "view_sequences",
            Permission::ManageSequences => "manage_sequences",
            Permission::ResetSequences => "reset_sequences",
            Permission::DeleteSequences => "delete_sequences",
            Permission::ManageDocumentTypes => "manage_document_types",
            Permission::IssueDocuments => "issue_documents",
            Permission::ViewDocuments => "view_documents",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Role
// =============================================================================

/// A member's role inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Accountant,
    Seller,
    Viewer,
}

const ALL: &[Permission] = &[
    Permission::ViewSequences,
    Permission::ManageSequences,
    Permission::ResetSequences,
    Permission::DeleteSequences,
    Permission::ManageDocumentTypes,
    Permission::IssueDocuments,
    Permission::ViewDocuments,
];

const ACCOUNTANT: &[Permission] = &[
    Permission::ViewSequences,
    Permission::ResetSequences,
    Permission::IssueDocuments,
    Permission::ViewDocuments,
];

const SELLER: &[Permission] = &[
    Permission::ViewSequences,
    Permission::IssueDocuments,
    Permission::ViewDocuments,
];

const VIEWER: &[Permission] = &[Permission::ViewSequences, Permission::ViewDocuments];

impl Role {
    /// Every permission granted to this role.
    pub const fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Owner | Role::Admin => ALL,
            Role::Accountant => ACCOUNTANT,
            Role::Seller => SELLER,
            Role::Viewer => VIEWER,
        }
    }

    /// Whether this role grants `permission`.
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Like [`Role::can`], but as an error for `?` chains.
    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: *self,
                permission,
            })
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Accountant => "accountant",
            Role::Seller => "seller",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "accountant" => Ok(Role::Accountant),
            "seller" => Ok(Role::Seller),
            "viewer" => Ok(Role::Viewer),
            other => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("unknown role '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_can_do_everything() {
        for permission in ALL {
            assert!(Role::Owner.can(*permission));
            assert!(Role::Admin.can(*permission));
        }
    }

    #[test]
    fn test_accountant_can_reset_but_not_manage() {
        assert!(Role::Accountant.can(Permission::ResetSequences));
        assert!(!Role::Accountant.can(Permission::ManageSequences));
        assert!(!Role::Accountant.can(Permission::DeleteSequences));
    }

    #[test]
    fn test_seller_issues_documents() {
        assert!(Role::Seller.can(Permission::IssueDocuments));
        assert!(!Role::Seller.can(Permission::ResetSequences));
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Role::Viewer.require(Permission::ViewSequences).is_ok());
        assert!(matches!(
            Role::Viewer.require(Permission::IssueDocuments),
            Err(CoreError::PermissionDenied {
                role: Role::Viewer,
                permission: Permission::IssueDocuments
            })
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Owner".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!(" seller ".parse::<Role>().unwrap(), Role::Seller);
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_matches_display() {
        let json = serde_json::to_string(&Role::Accountant).unwrap();
        assert_eq!(json, format!("\"{}\"", Role::Accountant));
    }
}
