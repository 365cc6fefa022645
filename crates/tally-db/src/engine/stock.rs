//! # Stock Ledger
//!
//! Stock-level changes paired with the append-only movement trail.
//!
//! ## The One Write Path
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     apply_delta (this module)                    │
//! │                                                                  │
//! │  1. SELECT stock FROM products WHERE id = ?   (inside the txn)   │
//! │  2. new_stock = previous + delta                                 │
//! │  3. guard: adjustment / transfer-out may not go below zero       │
//! │     (sales may: overselling is recorded, not rejected)           │
//! │  4. UPDATE products SET stock = new_stock                        │
//! │  5. INSERT stock_movements (prev, delta, new, reference, actor)  │
//! │                                                                  │
//! │  Every engine stock write funnels through here, so the trail     │
//! │  replays: new_stock = previous_stock + quantity, always.         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The asymmetric guard is deliberate. A sale at the till must never be
//! blocked by a stale count, so it records the truth even when the
//! truth is negative. A manual correction has no such urgency and is
//! held to the zero floor.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::require_role;
use tally_core::validation::{validate_required_text, validate_uuid};
use tally_core::{Actor, MovementType, Role, ValidationError};

/// Reference tag for manual adjustments.
pub const REFERENCE_MANUAL: &str = "MANUAL";
/// Reference tag for both sides of a transfer.
pub const REFERENCE_TRANSFER: &str = "TRANSFER";

// =============================================================================
// Requests
// =============================================================================

/// A manual stock correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: String,
    /// Signed change: positive adds stock, negative removes it.
    pub delta: i64,
    /// Why the correction was made (required, goes on the movement row).
    pub reason: String,
}

/// Moves quantity from one product's stock to another's.
///
/// Used when stock was received or counted against the wrong variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStockRequest {
    pub from_product_id: String,
    pub to_product_id: String,
    pub quantity: i64,
    pub reason: String,
}

// =============================================================================
// Shared Delta Application
// =============================================================================

/// Applies a stock delta and appends the matching movement row.
///
/// Takes the transaction's connection so the read-modify-write and the
/// movement insert share the caller's atomicity.
///
/// ## Returns
/// `(previous_stock, new_stock)`
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    movement_type: MovementType,
    reference: &str,
    notes: &str,
    actor_id: &str,
) -> EngineResult<(i64, i64)> {
    let previous: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    let previous = previous.ok_or_else(|| EngineError::not_found("Product", product_id))?;
    let new_stock = previous + delta;

    // Guarded types may not push stock below zero. Sale and Return are
    // exempt (oversell is recorded; returns only add).
    let guarded = matches!(movement_type, MovementType::Adjustment | MovementType::TransferOut);
    if guarded && new_stock < 0 {
        return Err(EngineError::InsufficientStock {
            product_id: product_id.to_string(),
            available: previous,
            requested: -delta,
        });
    }

    let now = Utc::now();

    sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(new_stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, quantity, movement_type,
            previous_stock, new_stock, reference, notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(delta)
    .bind(movement_type)
    .bind(previous)
    .bind(new_stock)
    .bind(reference)
    .bind(notes)
    .bind(actor_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %product_id,
        delta = %delta,
        previous = %previous,
        new = %new_stock,
        "stock delta applied"
    );

    Ok((previous, new_stock))
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Manual stock operations: adjustments and transfers.
///
/// Both require the Manager role and run as single transactions.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Applies a manual stock correction.
    ///
    /// ## Rules
    /// - Manager role required
    /// - `delta` must be non-zero, `reason` must be given
    /// - The correction may not push stock below zero
    ///
    /// ## Returns
    /// The new stock level.
    pub async fn adjust_stock(&self, actor: &Actor, request: AdjustStockRequest) -> EngineResult<i64> {
        require_role(actor, Role::Manager)?;

        validate_uuid("product_id", &request.product_id)?;
        validate_required_text("reason", &request.reason)?;
        if request.delta == 0 {
            return Err(ValidationError::MustBePositive { field: "delta" }.into());
        }

        let mut tx = self.pool.begin().await?;

        let (previous, new_stock) = apply_delta(
            &mut tx,
            &request.product_id,
            request.delta,
            MovementType::Adjustment,
            REFERENCE_MANUAL,
            &request.reason,
            &actor.id,
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %request.product_id,
            delta = %request.delta,
            previous = %previous,
            new = %new_stock,
            by = %actor.id,
            "stock adjusted"
        );

        Ok(new_stock)
    }

    /// Transfers quantity between two products.
    ///
    /// Conservation: the debit and credit commit together or not at
    /// all, so the summed stock of the pair never changes.
    ///
    /// ## Rules
    /// - Manager role required
    /// - Source and destination must differ
    /// - The source may not go below zero
    ///
    /// ## Returns
    /// `(source_new_stock, destination_new_stock)`
    pub async fn transfer_stock(
        &self,
        actor: &Actor,
        request: TransferStockRequest,
    ) -> EngineResult<(i64, i64)> {
        require_role(actor, Role::Manager)?;

        validate_uuid("from_product_id", &request.from_product_id)?;
        validate_uuid("to_product_id", &request.to_product_id)?;
        validate_required_text("reason", &request.reason)?;
        if request.quantity <= 0 {
            return Err(ValidationError::MustBePositive { field: "quantity" }.into());
        }
        if request.from_product_id == request.to_product_id {
            return Err(ValidationError::MustDiffer {
                field: "to_product_id",
                other: "from_product_id",
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        // Names for the cross-reference notes on each side's movement.
        let from_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM products WHERE id = ?1")
                .bind(&request.from_product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let from_name =
            from_name.ok_or_else(|| EngineError::not_found("Product", &request.from_product_id))?;

        let to_name: Option<String> = sqlx::query_scalar("SELECT name FROM products WHERE id = ?1")
            .bind(&request.to_product_id)
            .fetch_optional(&mut *tx)
            .await?;
        let to_name =
            to_name.ok_or_else(|| EngineError::not_found("Product", &request.to_product_id))?;

        let (_, from_new) = apply_delta(
            &mut tx,
            &request.from_product_id,
            -request.quantity,
            MovementType::TransferOut,
            REFERENCE_TRANSFER,
            &format!("{} (To: {})", request.reason, to_name),
            &actor.id,
        )
        .await?;

        let (_, to_new) = apply_delta(
            &mut tx,
            &request.to_product_id,
            request.quantity,
            MovementType::TransferIn,
            REFERENCE_TRANSFER,
            &format!("{} (From: {})", request.reason, from_name),
            &actor.id,
        )
        .await?;

        tx.commit().await?;

        info!(
            from = %request.from_product_id,
            to = %request.to_product_id,
            quantity = %request.quantity,
            by = %actor.id,
            "stock transferred"
        );

        Ok((from_new, to_new))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use tally_core::{EntityState, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, stock: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            price_cents: 10_000,
            stock,
            category: "general".to_string(),
            state: EntityState::Active,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product.id
    }

    fn manager() -> Actor {
        Actor::new("mgr-1", Role::Manager)
    }

    #[tokio::test]
    async fn test_adjust_adds_stock_and_records_movement() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Rice 5kg", 10).await;

        let new_stock = db
            .stock_ledger()
            .adjust_stock(
                &manager(),
                AdjustStockRequest {
                    product_id: product_id.clone(),
                    delta: 5,
                    reason: "supplier delivery".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(new_stock, 15);

        let movements = db.stock_movements().history_for_product(&product_id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, 5);
        assert_eq!(movements[0].previous_stock, 10);
        assert_eq!(movements[0].new_stock, 15);
        assert_eq!(movements[0].movement_type, MovementType::Adjustment);
        assert_eq!(movements[0].reference, REFERENCE_MANUAL);
        assert_eq!(movements[0].notes, "supplier delivery");
    }

    #[tokio::test]
    async fn test_adjust_below_zero_rejected_and_state_unchanged() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Rice 5kg", 3).await;

        let err = db
            .stock_ledger()
            .adjust_stock(
                &manager(),
                AdjustStockRequest {
                    product_id: product_id.clone(),
                    delta: -5,
                    reason: "damage write-off".to_string(),
                },
            )
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing written
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 3);
        assert_eq!(db.stock_movements().count_for_product(&product_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_requires_manager() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Rice 5kg", 10).await;

        let cashier = Actor::new("cash-1", Role::Cashier);
        let err = db
            .stock_ledger()
            .adjust_stock(
                &cashier,
                AdjustStockRequest {
                    product_id,
                    delta: 1,
                    reason: "count fix".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Forbidden { required: Role::Manager }));
    }

    #[tokio::test]
    async fn test_adjust_rejects_zero_delta_and_empty_reason() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Rice 5kg", 10).await;

        let zero = db
            .stock_ledger()
            .adjust_stock(
                &manager(),
                AdjustStockRequest {
                    product_id: product_id.clone(),
                    delta: 0,
                    reason: "noop".to_string(),
                },
            )
            .await;
        assert!(matches!(zero, Err(EngineError::Validation(_))));

        let blank = db
            .stock_ledger()
            .adjust_stock(
                &manager(),
                AdjustStockRequest { product_id, delta: 1, reason: "  ".to_string() },
            )
            .await;
        assert!(matches!(blank, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_transfer_conserves_total_stock() {
        let db = test_db().await;
        let from = seed_product(&db, "Tea 100g", 20).await;
        let to = seed_product(&db, "Tea 250g", 5).await;

        let (from_new, to_new) = db
            .stock_ledger()
            .transfer_stock(
                &manager(),
                TransferStockRequest {
                    from_product_id: from.clone(),
                    to_product_id: to.clone(),
                    quantity: 8,
                    reason: "repack".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(from_new, 12);
        assert_eq!(to_new, 13);

        let from_product = db.products().get_by_id(&from).await.unwrap().unwrap();
        let to_product = db.products().get_by_id(&to).await.unwrap().unwrap();
        assert_eq!(from_product.stock, 12);
        assert_eq!(to_product.stock, 13);
        assert_eq!(from_product.stock + to_product.stock, 25);

        // Both sides of the trail, cross-referenced by name
        let out = db.stock_movements().history_for_product(&from, 10).await.unwrap();
        assert_eq!(out[0].movement_type, MovementType::TransferOut);
        assert_eq!(out[0].quantity, -8);
        assert_eq!(out[0].reference, REFERENCE_TRANSFER);
        assert_eq!(out[0].notes, "repack (To: Tea 250g)");

        let inc = db.stock_movements().history_for_product(&to, 10).await.unwrap();
        assert_eq!(inc[0].movement_type, MovementType::TransferIn);
        assert_eq!(inc[0].quantity, 8);
        assert_eq!(inc[0].notes, "repack (From: Tea 100g)");
    }

    #[tokio::test]
    async fn test_transfer_insufficient_source_leaves_both_unchanged() {
        let db = test_db().await;
        let from = seed_product(&db, "Tea 100g", 2).await;
        let to = seed_product(&db, "Tea 250g", 5).await;

        let err = db
            .stock_ledger()
            .transfer_stock(
                &manager(),
                TransferStockRequest {
                    from_product_id: from.clone(),
                    to_product_id: to.clone(),
                    quantity: 10,
                    reason: "repack".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InsufficientStock { .. }));

        assert_eq!(db.products().get_by_id(&from).await.unwrap().unwrap().stock, 2);
        assert_eq!(db.products().get_by_id(&to).await.unwrap().unwrap().stock, 5);
        assert_eq!(db.stock_movements().count_for_product(&from).await.unwrap(), 0);
        assert_eq!(db.stock_movements().count_for_product(&to).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_same_product_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Tea 100g", 20).await;

        let err = db
            .stock_ledger()
            .transfer_stock(
                &manager(),
                TransferStockRequest {
                    from_product_id: product_id.clone(),
                    to_product_id: product_id,
                    quantity: 5,
                    reason: "repack".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(ValidationError::MustDiffer { .. })));
    }

    #[tokio::test]
    async fn test_transfer_missing_destination_rolls_back_source() {
        let db = test_db().await;
        let from = seed_product(&db, "Tea 100g", 20).await;

        let err = db
            .stock_ledger()
            .transfer_stock(
                &manager(),
                TransferStockRequest {
                    from_product_id: from.clone(),
                    to_product_id: Uuid::new_v4().to_string(),
                    quantity: 5,
                    reason: "repack".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotFound { .. }));
        assert_eq!(db.products().get_by_id(&from).await.unwrap().unwrap().stock, 20);
    }
}
