//! # Validation Module
//!
//! Business rule validation for bill and stock operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                           │
//! │                                                                  │
//! │  Layer 1: Typed request structs (deserialization)                │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Layer 2: THIS MODULE - business rule validation, run by the     │
//! │           Bill Engine BEFORE any transaction is opened           │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Layer 3: Database constraints (NOT NULL, foreign keys)          │
//! │                                                                  │
//! │  Defense in depth: different layers catch different mistakes     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::{MAX_BILL_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// Zero is allowed: free or promotional lines exist.
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price",
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a line discount in basis points (0% to 100%).
pub fn validate_discount_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent",
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a non-negative monetary field (discount, tax, shipping).
pub fn validate_non_negative(field: &'static str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange { field, min: 0, max: i64::MAX });
    }

    Ok(())
}

/// Validates that the bill monetary fields balance.
///
/// `total = subtotal - discount + tax + shipping`, with one cent of
/// tolerance for callers that rounded line-by-line.
pub fn validate_totals_balance(
    subtotal: i64,
    discount: i64,
    tax: i64,
    shipping: i64,
    total: i64,
) -> ValidationResult<()> {
    let expected = subtotal - discount + tax + shipping;
    if (expected - total).abs() > 1 {
        return Err(ValidationError::Unbalanced { expected, actual: total });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, non-empty text field.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_required_text;
///
/// assert!(validate_required_text("product_name", "Soap Bar").is_ok());
/// assert!(validate_required_text("product_name", "   ").is_err());
/// ```
pub fn validate_required_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }

    if value.len() > 200 {
        return Err(ValidationError::TooLong { field, max: 200 });
    }

    Ok(())
}

/// Validates a UUID-format entity id.
pub fn validate_uuid(field: &'static str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line item list of a bill.
///
/// ## Rules
/// - Must not be empty
/// - Must not exceed MAX_BILL_ITEMS (100)
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required { field: "items" });
    }

    if count > MAX_BILL_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items",
            min: 1,
            max: MAX_BILL_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(0).is_ok()); // free item
        assert!(validate_unit_price(1099).is_ok());
        assert!(validate_unit_price(-100).is_err());
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(10_000).is_ok()); // 100%
        assert!(validate_discount_bps(10_001).is_err());
        assert!(validate_discount_bps(-1).is_err());
    }

    #[test]
    fn test_validate_totals_balance() {
        // 300 - 0 + 30 + 0 = 330
        assert!(validate_totals_balance(30000, 0, 3000, 0, 33000).is_ok());
        // one cent of rounding slack is fine
        assert!(validate_totals_balance(30000, 0, 3000, 0, 33001).is_ok());
        // two cents is not
        assert!(validate_totals_balance(30000, 0, 3000, 0, 33002).is_err());
        assert!(validate_totals_balance(30000, 5000, 3000, 0, 33000).is_err());
    }

    #[test]
    fn test_validate_required_text() {
        assert!(validate_required_text("name", "Soap Bar").is_ok());
        assert!(validate_required_text("name", "").is_err());
        assert!(validate_required_text("name", "   ").is_err());
        assert!(validate_required_text("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(validate_item_count(100).is_ok());
        assert!(validate_item_count(0).is_err());
        assert!(validate_item_count(101).is_err());
    }
}
