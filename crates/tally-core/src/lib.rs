//! # tally-core: Pure Business Logic for Tally
//!
//! Tally is the back office behind a point-of-sale: staff create sales
//! bills, process returns, adjust inventory and keep customer statistics.
//! This crate is the I/O-free heart of that system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Tally Architecture                          │
//! │                                                                 │
//! │  Request layer (HTTP/CLI/whatever hosts this)                   │
//! │       │                                                         │
//! │  ┌────▼────────────────────────────────────────────────────┐    │
//! │  │            ★ tally-core (THIS CRATE) ★                  │    │
//! │  │                                                         │    │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────────┐  │    │
//! │  │  │  types  │ │  money  │ │ permission │ │ validation │  │    │
//! │  │  │ Bill    │ │  Money  │ │ Role/Actor │ │   rules    │  │    │
//! │  │  │ Product │ │ cents   │ │  ranking   │ │   checks   │  │    │
//! │  │  └─────────┘ └─────────┘ └────────────┘ └────────────┘  │    │
//! │  │                                                         │    │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS     │    │
//! │  └────┬────────────────────────────────────────────────────┘    │
//! │       │                                                         │
//! │  ┌────▼────────────────────────────────────────────────────┐    │
//! │  │              tally-db (Database Layer)                  │    │
//! │  │   SQLite repositories, Bill Engine, Stock Ledger        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Bill, BillItem, Product, StockMovement, ...)
//! - [`money`] - Money type with integer-cent arithmetic (no floats!)
//! - [`permission`] - Role ranking and the actor context
//! - [`error`] - Validation error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database and network access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod permission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use money::Money;
pub use permission::{Actor, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Customer name recorded on a bill when no customer info is supplied.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Bill number prefix for sales.
pub const SALE_BILL_PREFIX: &str = "BILL-";

/// Bill number prefix for return bills.
pub const RETURN_BILL_PREFIX: &str = "RET-";

/// Maximum line items allowed on a single bill.
///
/// ## Business Reason
/// Prevents runaway carts and keeps transactions reviewable.
pub const MAX_BILL_ITEMS: usize = 100;

/// Maximum quantity for a single line item.
///
/// ## Business Reason
/// Guards against fat-finger quantities (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
