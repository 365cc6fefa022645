//! # Permission Gate
//!
//! Role ranking and the actor context.
//!
//! ## Who May Do What
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Role ranks:  admin(3) > manager(2) > cashier(1)                 │
//! │                                                                  │
//! │  cashier+  : create sale, create return                          │
//! │  manager+  : update/delete bills and items, adjust/transfer      │
//! │              stock, product & customer mutation                  │
//! │  admin     : user management, product hard-delete                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating engine call takes an explicit [`Actor`] - there is no
//! ambient session state. An unauthenticated request never produces an
//! `Actor` and is rejected by the hosting layer before business logic
//! runs.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Role
// =============================================================================

/// Staff role, ordered by rank.
///
/// Discriminants are the numeric ranks used for comparison; `Ord` on the
/// enum therefore matches the business ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Front-desk staff: may record sales and returns.
    Cashier = 1,
    /// Supervises billing: may correct and delete bills, move stock.
    Manager = 2,
    /// Full control, including user management.
    Admin = 3,
}

impl Role {
    /// Numeric rank used for permission comparison.
    #[inline]
    pub const fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Cashier => "cashier",
            Role::Manager => "manager",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The authenticated staff member performing an operation.
///
/// Passed explicitly into every Bill Engine and Stock Ledger call;
/// `created_by` columns record `actor.id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id of the staff member.
    pub id: String,
    /// The actor's role.
    pub role: Role,
}

impl Actor {
    /// Creates a new actor context.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor { id: id.into(), role }
    }

    /// Returns true iff this actor's rank meets or exceeds `required`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::permission::{Actor, Role};
    ///
    /// let manager = Actor::new("u-7", Role::Manager);
    /// assert!(manager.can(Role::Cashier));
    /// assert!(manager.can(Role::Manager));
    /// assert!(!manager.can(Role::Admin));
    /// ```
    #[inline]
    pub fn can(&self, required: Role) -> bool {
        self.role.rank() >= required.rank()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
