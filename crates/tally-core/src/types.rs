//! # Domain Types
//!
//! Core domain types for the billing back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                             │
//! │                                                                  │
//! │  ┌────────────┐  ┌─────────────┐  ┌──────────────────┐           │
//! │  │  Product   │  │  Customer   │  │      Bill        │           │
//! │  │ ────────── │  │ ─────────── │  │ ──────────────── │           │
//! │  │ id (UUID)  │  │ id (UUID)   │  │ id (UUID)        │           │
//! │  │ price      │  │ aggregates  │  │ bill_number      │           │
//! │  │ stock      │  │ (orders,    │  │ money fields     │           │
//! │  │ state      │  │  spent)     │  │ is_return        │           │
//! │  └────────────┘  └─────────────┘  └───────┬──────────┘           │
//! │                                           │ owns                 │
//! │  ┌───────────────┐  ┌─────────────┐  ┌────▼────────┐             │
//! │  │ StockMovement │  │ BillPayment │  │  BillItem   │             │
//! │  │ append-only   │  │ partial     │  │ snapshot of │             │
//! │  │ audit trail   │  │ payments    │  │ product     │             │
//! │  └───────────────┘  └─────────────┘  └─────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` for relations plus, where humans need a
//! handle, a business identifier (`bill_number`).
//!
//! ## Snapshot Pattern
//! Bills capture customer contact fields and bill items capture product
//! name/price at sale time. History stays truthful when the live rows
//! change later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Lifecycle State
// =============================================================================

/// Lifecycle state for products and customers.
///
/// Replaces the classic `is_active` boolean: retirement is a first-class
/// state, and listing queries say explicitly which states they show.
/// Retired rows are never hard-deleted while bills reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    /// Visible in listings, usable on new bills.
    Active,
    /// Soft-deleted; kept for historical references.
    Retired,
}

impl Default for EntityState {
    fn default() -> Self {
        EntityState::Active
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on bills.
    pub name: String,

    /// Unit price in cents. Always positive for an active product.
    pub price_cents: i64,

    /// Current stock count. Sales may push it negative (see the stock
    /// ledger notes); manual adjustments may not.
    pub stock: i64,

    /// Free-form category label.
    pub category: String,

    /// Lifecycle state (active / retired).
    pub state: EntityState,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// `total_orders` and `total_spent_cents` are derived aggregates updated
/// incrementally on each completed sale attributed to the customer; they
/// are never recomputed from bill history at read time, so they must be
/// written in the same transaction as the bill that changes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Required for a named customer.
    pub phone: String,
    pub email: String,
    pub address: String,
    /// Count of sales attributed to this customer.
    pub total_orders: i64,
    /// Running sum of attributed sale totals, in cents.
    pub total_spent_cents: i64,
    pub state: EntityState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the running spend as Money.
    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

// =============================================================================
// Payment Enums
// =============================================================================

/// How a bill was (or will be) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Credit,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// Settlement state of a bill.
///
/// `Paid` and `Refunded` are terminal for everything except further
/// status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Partial,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Paid
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A completed sale or return transaction header.
///
/// Monetary invariant: `total = subtotal - discount + tax + shipping`,
/// within rounding tolerance. Returns carry `is_return = true` and point
/// back at the original bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    /// Human-readable number: `BILL-YYYYMMDD-NNNN` (`RET-` for returns).
    /// Random suffix; not guaranteed globally unique.
    pub bill_number: String,
    /// Registered customer, or None for a walk-in sale.
    pub customer_id: Option<String>,
    /// Customer snapshot, captured at sale time.
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub customer_address: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub is_return: bool,
    /// Set iff `is_return`.
    pub original_bill_id: Option<String>,
    pub return_reason: Option<String>,
    pub notes: Option<String>,
    /// Actor id that created the bill.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// One line within a bill.
///
/// Snapshot pattern: product name and unit price are frozen at sale
/// time. `product_id` is None for manual (unregistered) items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub product_id: Option<String>,
    /// Product name at sale time (frozen).
    pub product_name: String,
    /// Units sold (or returned). Always positive.
    pub quantity: i64,
    /// Unit price at sale time (frozen), in cents.
    pub unit_price_cents: i64,
    /// Line discount in basis points (1000 = 10%).
    pub discount_percent_bps: i64,
    /// Line discount amount in cents.
    pub discount_cents: i64,
    /// Line subtotal = quantity x unit price less discount, in cents.
    pub subtotal_cents: i64,
    /// This line's proportional share of the bill tax, captured at sale
    /// time. Basis for the tax recomputation when a line is deleted.
    pub tax_cents: i64,
    pub is_return: bool,
    /// Set iff `is_return`: the sale line being reversed.
    pub original_item_id: Option<String>,
}

impl BillItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Bill Payment
// =============================================================================

/// A partial payment recorded against a bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillPayment {
    pub id: String,
    pub bill_id: String,
    pub amount_cents: i64,
    /// Copied from the bill at the time the payment was recorded.
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The cause of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock left the shelf with a sale (negative delta).
    Sale,
    /// Stock came back with a return (positive delta).
    Return,
    /// Manual correction; the only type with a negativity guard.
    Adjustment,
    /// Credit side of a transfer between products.
    TransferIn,
    /// Debit side of a transfer between products.
    TransferOut,
}

/// An immutable record of a single stock quantity change.
///
/// Append-only audit trail: rows are never updated or deleted.
/// Invariant: `new_stock = previous_stock + quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    /// Signed delta; positive means stock increased.
    pub quantity: i64,
    pub movement_type: MovementType,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Short tag tying the movement to its cause (bill number, MANUAL,
    /// TRANSFER).
    pub reference: String,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Bill Identity
// =============================================================================

/// The minimal handle returned by bill-creating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillIdentity {
    pub bill_id: String,
    pub bill_number: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_state_default() {
        assert_eq!(EntityState::default(), EntityState::Active);
    }

    #[test]
    fn test_payment_defaults() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Paid);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_enum_serde_names() {
        assert_eq!(serde_json::to_string(&MovementType::TransferOut).unwrap(), "\"transfer_out\"");
        assert_eq!(serde_json::to_string(&PaymentStatus::Refunded).unwrap(), "\"refunded\"");
        assert_eq!(serde_json::to_string(&EntityState::Retired).unwrap(), "\"retired\"");
    }
}
