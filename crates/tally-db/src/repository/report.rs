//! # Report Repository
//!
//! Read-only aggregation queries for the back-office dashboard.
//!
//! Reports are computed from bill history at query time. They do NOT use
//! the customer aggregate columns, which are incremental counters with
//! their own (sale-only) semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::Money;

/// Sales totals over a period. Returns are negative contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(sqlx::FromRow)]
pub struct SalesSummary {
    /// Number of sale bills in the period.
    pub sale_count: i64,
    /// Number of return bills in the period.
    pub return_count: i64,
    /// Sum of sale totals, in cents.
    pub gross_cents: i64,
    /// Sum of return totals, in cents.
    pub refunded_cents: i64,
}

impl SalesSummary {
    /// Gross sales minus refunds.
    pub fn net(&self) -> Money {
        Money::from_cents(self.gross_cents - self.refunded_cents)
    }
}

/// Units and revenue for one product over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Bill count and takings per payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(sqlx::FromRow)]
pub struct PaymentBreakdown {
    pub payment_method: String,
    pub bill_count: i64,
    pub total_cents: i64,
}

/// One day's sales in a daily series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(sqlx::FromRow)]
pub struct DailySales {
    /// Calendar day, `YYYY-MM-DD` (UTC).
    pub day: String,
    pub sale_count: i64,
    pub total_cents: i64,
}

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Summarizes sales and returns between two instants.
    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        debug!(%from, %to, "computing sales summary");

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_return = 0 THEN 1 ELSE 0 END), 0) AS sale_count,
                COALESCE(SUM(CASE WHEN is_return = 1 THEN 1 ELSE 0 END), 0) AS return_count,
                COALESCE(SUM(CASE WHEN is_return = 0 THEN total_cents ELSE 0 END), 0) AS gross_cents,
                COALESCE(SUM(CASE WHEN is_return = 1 THEN total_cents ELSE 0 END), 0) AS refunded_cents
            FROM bills
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Top products by units sold between two instants.
    ///
    /// Manual items (no product_id) are excluded; return lines subtract
    /// from the totals of the product they reverse.
    pub async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                i.product_id AS product_id,
                i.product_name AS product_name,
                COALESCE(SUM(CASE WHEN b.is_return = 1 THEN -i.quantity ELSE i.quantity END), 0)
                    AS units_sold,
                COALESCE(SUM(CASE WHEN b.is_return = 1 THEN -i.subtotal_cents ELSE i.subtotal_cents END), 0)
                    AS revenue_cents
            FROM bill_items i
            JOIN bills b ON b.id = i.bill_id
            WHERE i.product_id IS NOT NULL
              AND b.created_at >= ?1 AND b.created_at < ?2
            GROUP BY i.product_id, i.product_name
            ORDER BY units_sold DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Takings per payment method between two instants (sales only).
    pub async fn payment_breakdown(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<PaymentBreakdown>> {
        let rows = sqlx::query_as::<_, PaymentBreakdown>(
            r#"
            SELECT
                payment_method,
                COUNT(*) AS bill_count,
                COALESCE(SUM(total_cents), 0) AS total_cents
            FROM bills
            WHERE is_return = 0 AND created_at >= ?1 AND created_at < ?2
            GROUP BY payment_method
            ORDER BY total_cents DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sale totals grouped by calendar day between two instants.
    ///
    /// Days with no sales produce no row; the caller fills gaps if the
    /// chart needs a continuous axis.
    pub async fn daily_sales(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DailySales>> {
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                DATE(created_at) AS day,
                COUNT(*) AS sale_count,
                COALESCE(SUM(total_cents), 0) AS total_cents
            FROM bills
            WHERE is_return = 0 AND created_at >= ?1 AND created_at < ?2
            GROUP BY DATE(created_at)
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
