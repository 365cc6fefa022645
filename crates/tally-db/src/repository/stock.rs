//! # Stock Movement Repository
//!
//! Read access to the append-only stock audit trail.
//!
//! Movement rows are only ever *inserted*, and only by the engine and
//! the stock ledger. There is no update or delete here on purpose.

use sqlx::SqlitePool;

use crate::error::DbResult;
use tally_core::StockMovement;

const MOVEMENT_COLUMNS: &str = "id, product_id, quantity, movement_type, previous_stock, \
     new_stock, reference, notes, created_by, created_at";

/// Repository for stock movement reads.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    /// Creates a new StockMovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    /// Gets the movement history for a product, most recent first.
    pub async fn history_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Gets movements that reference a given tag (e.g. a bill number).
    pub async fn by_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE reference = ?1
            ORDER BY created_at, rowid
            "#
        ))
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Lists the most recent movements across all products.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Counts movements for a product (for diagnostics).
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
