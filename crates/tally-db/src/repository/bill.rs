//! # Bill Repository
//!
//! Read-side access to bills, their items and their payments.
//!
//! All writes to these tables go through [`crate::engine::BillEngine`],
//! which owns the transactional invariants (stock, movements, customer
//! aggregates). Keeping the write path in one place is what makes the
//! invariants auditable.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Bill, BillItem, BillPayment};

pub(crate) const BILL_COLUMNS: &str = "id, bill_number, customer_id, customer_name, customer_phone, \
     customer_email, customer_address, subtotal_cents, discount_cents, tax_cents, \
     shipping_cents, total_cents, payment_method, payment_status, is_return, \
     original_bill_id, return_reason, notes, created_by, created_at";

pub(crate) const ITEM_COLUMNS: &str = "id, bill_id, product_id, product_name, quantity, \
     unit_price_cents, discount_percent_bps, discount_cents, subtotal_cents, \
     tax_cents, is_return, original_item_id";

/// Repository for bill read operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill =
            sqlx::query_as::<_, Bill>(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(bill)
    }

    /// Gets bills by bill number.
    ///
    /// Returns a Vec: the number's random suffix makes collisions
    /// possible, and lookups must not silently pick one of them.
    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE bill_number = ?1 ORDER BY created_at"
        ))
        .bind(bill_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Gets all line items for a bill, in insertion order.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY rowid"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all recorded payments for a bill.
    pub async fn get_payments(&self, bill_id: &str) -> DbResult<Vec<BillPayment>> {
        let payments = sqlx::query_as::<_, BillPayment>(
            r#"
            SELECT id, bill_id, amount_cents, payment_method, created_at
            FROM bill_payments
            WHERE bill_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sums recorded payments for a bill, in cents.
    pub async fn total_paid(&self, bill_id: &str) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM bill_payments WHERE bill_id = ?1")
                .bind(bill_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(0))
    }

    /// Lists the most recent bills.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Bill>> {
        debug!(limit = %limit, "listing recent bills");

        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists bills for a customer, most recent first.
    pub async fn list_for_customer(&self, customer_id: &str, limit: u32) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS} FROM bills
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#
        ))
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists the returns raised against an original bill.
    pub async fn list_returns_for(&self, original_bill_id: &str) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS} FROM bills
            WHERE is_return = 1 AND original_bill_id = ?1
            ORDER BY created_at
            "#
        ))
        .bind(original_bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Counts all bills (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
