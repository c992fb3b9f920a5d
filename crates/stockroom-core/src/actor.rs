//! # Actor
//!
//! The verified identity an authentication layer hands to the ledger.
//!
//! Credential checking happens outside this workspace. Callers pass an
//! explicit `Actor` (or its id) into every mutating call; there is no
//! process-wide "current user".

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::User;

/// What an actor may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Browse the catalog and transaction history.
    Read,
    /// Ring up sales.
    Transact,
    /// See revenue reports.
    ViewRevenue,
    /// Manage users and reset the store. Root admin only.
    Administer,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Read => "read",
            Capability::Transact => "transact",
            Capability::ViewRevenue => "view_revenue",
            Capability::Administer => "administer",
        };
        f.write_str(name)
    }
}

/// A verified actor and its capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub is_root_admin: bool,
    pub can_read: bool,
    pub can_transact: bool,
    pub can_view_revenue: bool,
}

impl Actor {
    /// Whether the actor holds `capability`. Root admins hold all of them.
    pub fn has(&self, capability: Capability) -> bool {
        if self.is_root_admin {
            return true;
        }

        match capability {
            Capability::Read => self.can_read,
            Capability::Transact => self.can_transact,
            Capability::ViewRevenue => self.can_view_revenue,
            Capability::Administer => false,
        }
    }

    /// Fails with `PermissionDenied` unless the actor holds `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), ValidationError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(ValidationError::PermissionDenied {
                capability: capability.to_string(),
            })
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id.clone(),
            is_root_admin: user.is_root_admin,
            can_read: user.can_read,
            can_transact: user.can_transact,
            can_view_revenue: user.can_view_revenue,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cashier() -> Actor {
        Actor {
            id: "cashier".to_string(),
            is_root_admin: false,
            can_read: true,
            can_transact: true,
            can_view_revenue: false,
        }
    }

    #[test]
    fn test_capability_flags() {
        let actor = cashier();
        assert!(actor.has(Capability::Read));
        assert!(actor.has(Capability::Transact));
        assert!(!actor.has(Capability::ViewRevenue));
        assert!(!actor.has(Capability::Administer));
    }

    #[test]
    fn test_root_admin_has_everything() {
        let root = Actor {
            is_root_admin: true,
            can_read: false,
            can_transact: false,
            can_view_revenue: false,
            ..cashier()
        };
        assert!(root.require(Capability::Administer).is_ok());
        assert!(root.require(Capability::ViewRevenue).is_ok());
    }

    #[test]
    fn test_require_reports_missing_capability() {
        let err = cashier().require(Capability::ViewRevenue).unwrap_err();
        assert_eq!(err.to_string(), "permission denied: view_revenue required");
    }
}
