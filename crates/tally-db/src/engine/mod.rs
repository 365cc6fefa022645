//! # Bill Engine
//!
//! The transactional heart of Tally: turns a validated cart into a
//! persisted bill while keeping three things in agreement at all times:
//!
//! 1. bill rows (header + items + payments)
//! 2. product stock and the movement audit trail
//! 3. customer purchase aggregates
//!
//! ## Operation Map
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        BillEngine                                │
//! │                                                                  │
//! │  create_sale ──────── cart → bill + items − stock + aggregates   │
//! │  create_return ────── RET bill + items + stock (prorated)        │
//! │  update_bill ──────── header edit, total recomputed              │
//! │  update_payment_status ─ status + optional partial payment       │
//! │  delete_bill ──────── remove bill, hand stock back               │
//! │  delete_bill_item ─── remove one line from a pending bill        │
//! │                                                                  │
//! │  Every operation: validate → require role → one transaction      │
//! │  → commit or roll back everything.                               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ground Rules
//!
//! - Validation runs BEFORE the transaction opens. A request that fails
//!   validation never touches the database.
//! - All stock changes made by sales and returns go through
//!   [`stock::apply_delta`], which appends the movement row in the same
//!   transaction.
//! - Customer aggregates move on sales only. Returns and deletions do
//!   not unwind them; the aggregates answer "how much business has this
//!   customer brought", not "net of refunds".

pub mod error;
pub mod stock;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::repository::bill::{BILL_COLUMNS, ITEM_COLUMNS};
use tally_core::validation::{
    validate_discount_bps, validate_item_count, validate_non_negative, validate_quantity,
    validate_required_text, validate_totals_balance, validate_unit_price, validate_uuid,
};
use tally_core::{
    Actor, Bill, BillIdentity, BillItem, Money, MovementType, PaymentMethod, PaymentStatus, Role,
    ValidationError, RETURN_BILL_PREFIX, SALE_BILL_PREFIX, WALK_IN_CUSTOMER,
};

pub use error::{EngineError, EngineResult};

// =============================================================================
// Requests
// =============================================================================

/// One cart line in a sale request.
///
/// The caller prices the line (the till shows the numbers before they
/// are submitted); the engine re-validates and re-balances the totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    /// Catalog product, or None for a manual (unregistered) line.
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Line discount percentage in basis points (1000 = 10%).
    pub discount_percent_bps: i64,
    pub discount_cents: i64,
    /// Line subtotal after discount, in cents.
    pub subtotal_cents: i64,
}

/// A complete sale to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaleRequest {
    /// Registered customer; when None the `customer_*` fields (or the
    /// walk-in default) provide the snapshot.
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub items: Vec<SaleLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Defaults to Paid when absent.
    pub payment_status: Option<PaymentStatus>,
    /// Recorded as a payment row when the status is Partial.
    pub paid_amount_cents: Option<i64>,
    pub notes: Option<String>,
}

/// One line of a return: which sale line, and how many units come back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub original_item_id: String,
    pub quantity: i64,
}

/// A return raised against an existing sale bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReturnRequest {
    pub original_bill_id: String,
    pub reason: String,
    pub items: Vec<ReturnLine>,
}

/// Header-level edits to an existing sale bill. All fields optional;
/// absent fields keep their stored value. The total is recomputed from
/// the stored subtotal and the effective discount/tax/shipping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBillRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub discount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub shipping_cents: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// What happened to the bill after a line was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemOutcome {
    /// True when the deleted line was the last one and the bill was
    /// removed with it. The totals below are zero in that case.
    pub bill_deleted: bool,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Checks the actor's role against the operation's requirement.
pub(crate) fn require_role(actor: &Actor, required: Role) -> EngineResult<()> {
    if actor.can(required) {
        Ok(())
    } else {
        warn!(actor = %actor.id, role = %actor.role, required = %required, "permission denied");
        Err(EngineError::Forbidden { required })
    }
}

/// Generates a bill number: `<prefix>YYYYMMDD-NNNN`.
///
/// The suffix is random, not sequential, so numbers leak nothing about
/// volume. Collisions within a day are possible and tolerated; lookups
/// by number return every match.
fn generate_bill_number(prefix: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: u32 = rand::thread_rng().gen_range(1..=9999);
    format!("{prefix}{date}-{suffix:04}")
}

// =============================================================================
// Bill Engine
// =============================================================================

/// Transactional bill operations.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.bill_engine();
/// let identity = engine.create_sale(&actor, request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BillEngine {
    pool: SqlitePool,
}

impl BillEngine {
    /// Creates a new BillEngine.
    pub fn new(pool: SqlitePool) -> Self {
        BillEngine { pool }
    }

    // -------------------------------------------------------------------------
    // create_sale
    // -------------------------------------------------------------------------

    /// Persists a complete sale.
    ///
    /// ## What Happens (one transaction)
    /// 1. Customer snapshot is resolved (registered row or walk-in)
    /// 2. Bill header and every line item are inserted
    /// 3. Per-line tax share is captured: each line gets the bill tax
    ///    scaled by its share of the subtotal
    /// 4. Stock is decremented per catalog line, movement rows appended
    /// 5. A Partial status records the paid amount as a payment row
    /// 6. Registered customer aggregates are incremented
    ///
    /// Stock is NOT guarded here: a sale records reality even when the
    /// count was already wrong, so stock can go negative.
    pub async fn create_sale(
        &self,
        actor: &Actor,
        request: CreateSaleRequest,
    ) -> EngineResult<BillIdentity> {
        require_role(actor, Role::Cashier)?;
        Self::validate_sale(&request)?;

        let mut tx = self.pool.begin().await?;

        // Customer snapshot: registered row wins over inline fields.
        let (customer_id, name, phone, email, address) = match &request.customer_id {
            Some(id) => {
                let row: Option<(String, String, String, String)> = sqlx::query_as(
                    "SELECT name, phone, email, address FROM customers WHERE id = ?1",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

                let (name, phone, email, address) =
                    row.ok_or_else(|| EngineError::not_found("Customer", id))?;
                (Some(id.clone()), name, phone, email, address)
            }
            None => {
                let name = request
                    .customer_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());
                (
                    None,
                    name,
                    request.customer_phone.clone().unwrap_or_default(),
                    request.customer_email.clone().unwrap_or_default(),
                    request.customer_address.clone().unwrap_or_default(),
                )
            }
        };

        let bill_id = Uuid::new_v4().to_string();
        let bill_number = generate_bill_number(SALE_BILL_PREFIX);
        let payment_status = request.payment_status.unwrap_or_default();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_id,
                customer_name, customer_phone, customer_email, customer_address,
                subtotal_cents, discount_cents, tax_cents, shipping_cents, total_cents,
                payment_method, payment_status, is_return,
                original_bill_id, return_reason, notes, created_by, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, 0, NULL, NULL, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&bill_id)
        .bind(&bill_number)
        .bind(&customer_id)
        .bind(&name)
        .bind(&phone)
        .bind(&email)
        .bind(&address)
        .bind(request.subtotal_cents)
        .bind(request.discount_cents)
        .bind(request.tax_cents)
        .bind(request.shipping_cents)
        .bind(request.total_cents)
        .bind(request.payment_method)
        .bind(payment_status)
        .bind(&request.notes)
        .bind(&actor.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let bill_subtotal = Money::from_cents(request.subtotal_cents);
        let bill_tax = Money::from_cents(request.tax_cents);

        for line in &request.items {
            // Stock moves first: the lookup inside rejects a line whose
            // product id matches nothing as NotFound, before the item
            // row would trip the foreign key.
            if let Some(product_id) = &line.product_id {
                stock::apply_delta(
                    &mut tx,
                    product_id,
                    -line.quantity,
                    MovementType::Sale,
                    &bill_number,
                    "",
                    &actor.id,
                )
                .await?;
            }

            // Each line carries its proportional share of the bill tax,
            // frozen now so later line-level edits can re-derive the rate.
            let line_tax = Money::from_cents(line.subtotal_cents).scale_by(bill_tax, bill_subtotal);

            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, product_id, product_name, quantity,
                    unit_price_cents, discount_percent_bps, discount_cents,
                    subtotal_cents, tax_cents, is_return, original_item_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, NULL)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill_id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.discount_percent_bps)
            .bind(line.discount_cents)
            .bind(line.subtotal_cents)
            .bind(line_tax.cents())
            .execute(&mut *tx)
            .await?;
        }

        if payment_status == PaymentStatus::Partial {
            if let Some(amount) = request.paid_amount_cents.filter(|a| *a > 0) {
                sqlx::query(
                    r#"
                    INSERT INTO bill_payments (id, bill_id, amount_cents, payment_method, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&bill_id)
                .bind(amount)
                .bind(request.payment_method)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(id) = &customer_id {
            sqlx::query(
                r#"
                UPDATE customers SET
                    total_orders = total_orders + 1,
                    total_spent_cents = total_spent_cents + ?2,
                    updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(request.total_cents)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            bill_number = %bill_number,
            total_cents = request.total_cents,
            items = request.items.len(),
            by = %actor.id,
            "sale created"
        );

        Ok(BillIdentity { bill_id, bill_number })
    }

    fn validate_sale(request: &CreateSaleRequest) -> EngineResult<()> {
        validate_item_count(request.items.len())?;

        for line in &request.items {
            validate_required_text("product_name", &line.product_name)?;
            validate_quantity(line.quantity)?;
            validate_unit_price(line.unit_price_cents)?;
            validate_discount_bps(line.discount_percent_bps)?;
            validate_non_negative("line_discount", line.discount_cents)?;
            validate_non_negative("line_subtotal", line.subtotal_cents)?;
        }

        validate_non_negative("subtotal", request.subtotal_cents)?;
        validate_non_negative("discount", request.discount_cents)?;
        validate_non_negative("tax", request.tax_cents)?;
        validate_non_negative("shipping", request.shipping_cents)?;

        if request.total_cents <= 0 {
            return Err(ValidationError::MustBePositive { field: "total" }.into());
        }

        validate_totals_balance(
            request.subtotal_cents,
            request.discount_cents,
            request.tax_cents,
            request.shipping_cents,
            request.total_cents,
        )?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // create_return
    // -------------------------------------------------------------------------

    /// Raises a return against an existing sale bill.
    ///
    /// ## Proration
    /// Refund amounts are derived from the original lines, never from
    /// the caller: returning k of n units refunds k/n of the line's
    /// subtotal and tax share, rounded half-up. Line subtotals are
    /// already net of their discount, so the refund is
    /// `subtotal + tax` and the header discount is zero. Returning a
    /// line in parts always sums to the original to the cent.
    ///
    /// ## Lenient Line Matching
    /// Lines that don't match an original item, or ask for more units
    /// than were sold, are skipped rather than failing the whole
    /// return. A return where every line was skipped is a Conflict.
    ///
    /// Customer aggregates are NOT reversed (see module docs).
    pub async fn create_return(
        &self,
        actor: &Actor,
        request: CreateReturnRequest,
    ) -> EngineResult<BillIdentity> {
        require_role(actor, Role::Cashier)?;

        validate_uuid("original_bill_id", &request.original_bill_id)?;
        validate_required_text("reason", &request.reason)?;
        if request.items.is_empty() {
            return Err(ValidationError::Required { field: "items" }.into());
        }

        let mut tx = self.pool.begin().await?;

        let original: Option<Bill> =
            sqlx::query_as(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(&request.original_bill_id)
                .fetch_optional(&mut *tx)
                .await?;
        let original =
            original.ok_or_else(|| EngineError::not_found("Bill", &request.original_bill_id))?;

        if original.is_return {
            return Err(EngineError::Conflict(
                "a return bill cannot itself be returned".to_string(),
            ));
        }

        let original_items: Vec<BillItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY rowid"
        ))
        .bind(&original.id)
        .fetch_all(&mut *tx)
        .await?;

        // Resolve and prorate the valid lines; skip the rest.
        let mut accepted: Vec<(&BillItem, i64, Money, Money, Money)> = Vec::new();
        let mut subtotal = Money::zero();
        let mut tax = Money::zero();

        for line in &request.items {
            let Some(orig) = original_items.iter().find(|i| i.id == line.original_item_id) else {
                warn!(item_id = %line.original_item_id, "return line does not match the bill, skipping");
                continue;
            };
            if line.quantity <= 0 || line.quantity > orig.quantity {
                warn!(
                    item_id = %orig.id,
                    requested = line.quantity,
                    sold = orig.quantity,
                    "return quantity out of range, skipping"
                );
                continue;
            }

            let line_subtotal = orig.subtotal().prorate(line.quantity, orig.quantity);
            let line_discount =
                Money::from_cents(orig.discount_cents).prorate(line.quantity, orig.quantity);
            let line_tax = Money::from_cents(orig.tax_cents).prorate(line.quantity, orig.quantity);

            subtotal += line_subtotal;
            tax += line_tax;
            accepted.push((orig, line.quantity, line_subtotal, line_discount, line_tax));
        }

        if accepted.is_empty() {
            return Err(EngineError::Conflict("no valid return lines".to_string()));
        }

        // Line subtotals are net of their discounts already, so the
        // refund carries no header discount of its own.
        let total = subtotal + tax;
        let bill_id = Uuid::new_v4().to_string();
        let bill_number = generate_bill_number(RETURN_BILL_PREFIX);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_id,
                customer_name, customer_phone, customer_email, customer_address,
                subtotal_cents, discount_cents, tax_cents, shipping_cents, total_cents,
                payment_method, payment_status, is_return,
                original_bill_id, return_reason, notes, created_by, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                0, ?11, ?12, ?13, 1, ?14, ?15, NULL, ?16, ?17
            )
            "#,
        )
        .bind(&bill_id)
        .bind(&bill_number)
        .bind(&original.customer_id)
        .bind(&original.customer_name)
        .bind(&original.customer_phone)
        .bind(&original.customer_email)
        .bind(&original.customer_address)
        .bind(subtotal.cents())
        .bind(0i64)
        .bind(tax.cents())
        .bind(total.cents())
        .bind(original.payment_method)
        .bind(PaymentStatus::Refunded)
        .bind(&original.id)
        .bind(&request.reason)
        .bind(&actor.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (orig, quantity, line_subtotal, line_discount, line_tax) in &accepted {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, product_id, product_name, quantity,
                    unit_price_cents, discount_percent_bps, discount_cents,
                    subtotal_cents, tax_cents, is_return, original_item_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill_id)
            .bind(&orig.product_id)
            .bind(&orig.product_name)
            .bind(quantity)
            .bind(orig.unit_price_cents)
            .bind(orig.discount_percent_bps)
            .bind(line_discount.cents())
            .bind(line_subtotal.cents())
            .bind(line_tax.cents())
            .bind(&orig.id)
            .execute(&mut *tx)
            .await?;

            if let Some(product_id) = &orig.product_id {
                stock::apply_delta(
                    &mut tx,
                    product_id,
                    *quantity,
                    MovementType::Return,
                    &bill_number,
                    "",
                    &actor.id,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(
            bill_number = %bill_number,
            original = %original.bill_number,
            refund_cents = total.cents(),
            lines = accepted.len(),
            by = %actor.id,
            "return created"
        );

        Ok(BillIdentity { bill_id, bill_number })
    }

    // -------------------------------------------------------------------------
    // update_bill
    // -------------------------------------------------------------------------

    /// Edits header fields of a sale bill.
    ///
    /// The total is recomputed as
    /// `stored subtotal - discount + tax + shipping` using the
    /// effective values. Line items are not editable here; see
    /// [`Self::delete_bill_item`].
    ///
    /// Manager role required. Return bills are immutable.
    pub async fn update_bill(
        &self,
        actor: &Actor,
        bill_id: &str,
        request: UpdateBillRequest,
    ) -> EngineResult<()> {
        require_role(actor, Role::Manager)?;
        validate_uuid("bill_id", bill_id)?;

        if let Some(name) = &request.customer_name {
            validate_required_text("customer_name", name)?;
        }
        if let Some(discount) = request.discount_cents {
            validate_non_negative("discount", discount)?;
        }
        if let Some(tax) = request.tax_cents {
            validate_non_negative("tax", tax)?;
        }
        if let Some(shipping) = request.shipping_cents {
            validate_non_negative("shipping", shipping)?;
        }

        let mut tx = self.pool.begin().await?;

        let bill: Option<Bill> =
            sqlx::query_as(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(bill_id)
                .fetch_optional(&mut *tx)
                .await?;
        let bill = bill.ok_or_else(|| EngineError::not_found("Bill", bill_id))?;

        if bill.is_return {
            return Err(EngineError::Conflict("return bills cannot be edited".to_string()));
        }

        let discount = request.discount_cents.unwrap_or(bill.discount_cents);
        let tax = request.tax_cents.unwrap_or(bill.tax_cents);
        let shipping = request.shipping_cents.unwrap_or(bill.shipping_cents);
        let total = bill.subtotal_cents - discount + tax + shipping;

        sqlx::query(
            r#"
            UPDATE bills SET
                customer_name = ?2,
                customer_phone = ?3,
                customer_email = ?4,
                customer_address = ?5,
                discount_cents = ?6,
                tax_cents = ?7,
                shipping_cents = ?8,
                total_cents = ?9,
                payment_method = ?10,
                payment_status = ?11,
                notes = ?12
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .bind(request.customer_name.as_ref().unwrap_or(&bill.customer_name))
        .bind(request.customer_phone.as_ref().unwrap_or(&bill.customer_phone))
        .bind(request.customer_email.as_ref().unwrap_or(&bill.customer_email))
        .bind(request.customer_address.as_ref().unwrap_or(&bill.customer_address))
        .bind(discount)
        .bind(tax)
        .bind(shipping)
        .bind(total)
        .bind(request.payment_method.unwrap_or(bill.payment_method))
        .bind(request.payment_status.unwrap_or(bill.payment_status))
        .bind(request.notes.as_ref().or(bill.notes.as_ref()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(bill_id = %bill_id, total_cents = total, by = %actor.id, "bill updated");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // update_payment_status
    // -------------------------------------------------------------------------

    /// Changes a bill's payment status.
    ///
    /// A Partial status with an amount also records a payment row, so
    /// the running paid total is queryable later.
    pub async fn update_payment_status(
        &self,
        actor: &Actor,
        bill_id: &str,
        status: PaymentStatus,
        paid_amount_cents: Option<i64>,
    ) -> EngineResult<()> {
        require_role(actor, Role::Cashier)?;
        validate_uuid("bill_id", bill_id)?;
        if let Some(amount) = paid_amount_cents {
            validate_non_negative("paid_amount", amount)?;
        }

        let mut tx = self.pool.begin().await?;

        let bill: Option<Bill> =
            sqlx::query_as(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(bill_id)
                .fetch_optional(&mut *tx)
                .await?;
        let bill = bill.ok_or_else(|| EngineError::not_found("Bill", bill_id))?;

        sqlx::query("UPDATE bills SET payment_status = ?2 WHERE id = ?1")
            .bind(bill_id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        if status == PaymentStatus::Partial {
            if let Some(amount) = paid_amount_cents.filter(|a| *a > 0) {
                sqlx::query(
                    r#"
                    INSERT INTO bill_payments (id, bill_id, amount_cents, payment_method, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(bill_id)
                .bind(amount)
                .bind(bill.payment_method)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        info!(bill_id = %bill_id, status = ?status, by = %actor.id, "payment status updated");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // delete_bill
    // -------------------------------------------------------------------------

    /// Deletes a bill outright and hands its stock back.
    ///
    /// Manager role required: this erases history and is meant for
    /// bills entered in error, not for reversing a sale (that is what
    /// returns are for).
    ///
    /// Only non-return lines restore stock, with direct updates and no
    /// movement rows; deleting a bill leaves a gap in the trail by
    /// design of the operation, which removes the reference the rows
    /// would point at. Customer aggregates are not unwound.
    pub async fn delete_bill(&self, actor: &Actor, bill_id: &str) -> EngineResult<()> {
        require_role(actor, Role::Manager)?;
        validate_uuid("bill_id", bill_id)?;

        let mut tx = self.pool.begin().await?;

        let bill: Option<Bill> =
            sqlx::query_as(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(bill_id)
                .fetch_optional(&mut *tx)
                .await?;
        let bill = bill.ok_or_else(|| EngineError::not_found("Bill", bill_id))?;

        let items: Vec<BillItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1"
        ))
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            // Sale lines gave stock away, so deletion hands it back.
            // Return lines restore nothing: deleting a return bill
            // keeps the returned units on the shelf.
            if item.is_return {
                continue;
            }
            let Some(product_id) = &item.product_id else { continue };

            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(product_id)
                .bind(item.quantity)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        // Items and payments go with the bill (ON DELETE CASCADE).
        sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            bill_number = %bill.bill_number,
            items = items.len(),
            by = %actor.id,
            "bill deleted"
        );

        Ok(())
    }

    // -------------------------------------------------------------------------
    // delete_bill_item
    // -------------------------------------------------------------------------

    /// Removes one line from a pending sale bill.
    ///
    /// ## Recalculation
    /// The new tax keeps the deleted line's effective rate:
    /// `new_tax = new_subtotal x (deleted tax / deleted subtotal)`, and
    /// the new total is `new_subtotal + new_tax`. Discount and shipping
    /// are not carried forward; a bill edited this way is re-priced
    /// from its remaining items.
    ///
    /// Deleting the last line deletes the bill.
    ///
    /// Manager role required; only Pending bills can be edited.
    pub async fn delete_bill_item(
        &self,
        actor: &Actor,
        bill_id: &str,
        item_id: &str,
    ) -> EngineResult<DeleteItemOutcome> {
        require_role(actor, Role::Manager)?;
        validate_uuid("bill_id", bill_id)?;
        validate_uuid("item_id", item_id)?;

        let mut tx = self.pool.begin().await?;

        let bill: Option<Bill> =
            sqlx::query_as(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"))
                .bind(bill_id)
                .fetch_optional(&mut *tx)
                .await?;
        let bill = bill.ok_or_else(|| EngineError::not_found("Bill", bill_id))?;

        if bill.payment_status != PaymentStatus::Pending {
            return Err(EngineError::Conflict(
                "only pending bills can have items removed".to_string(),
            ));
        }

        let item: Option<BillItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE id = ?1 AND bill_id = ?2"
        ))
        .bind(item_id)
        .bind(bill_id)
        .fetch_optional(&mut *tx)
        .await?;
        let item = item.ok_or_else(|| EngineError::not_found("Bill item", item_id))?;

        sqlx::query("DELETE FROM bill_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        if !item.is_return {
            if let Some(product_id) = &item.product_id {
                // Direct restore, same audit posture as delete_bill.
                sqlx::query(
                    "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
                )
                .bind(product_id)
                .bind(item.quantity)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bill_items WHERE bill_id = ?1")
                .bind(bill_id)
                .fetch_one(&mut *tx)
                .await?;

        if remaining == 0 {
            sqlx::query("DELETE FROM bills WHERE id = ?1")
                .bind(bill_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            info!(bill_number = %bill.bill_number, by = %actor.id, "last item removed, bill deleted");

            return Ok(DeleteItemOutcome {
                bill_deleted: true,
                subtotal_cents: 0,
                tax_cents: 0,
                total_cents: 0,
            });
        }

        let new_subtotal: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(subtotal_cents), 0) FROM bill_items WHERE bill_id = ?1",
        )
        .bind(bill_id)
        .fetch_one(&mut *tx)
        .await?;

        let new_tax = Money::from_cents(new_subtotal)
            .scale_by(Money::from_cents(item.tax_cents), Money::from_cents(item.subtotal_cents));
        let new_total = new_subtotal + new_tax.cents();

        sqlx::query(
            r#"
            UPDATE bills SET subtotal_cents = ?2, tax_cents = ?3, total_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(bill_id)
        .bind(new_subtotal)
        .bind(new_tax.cents())
        .bind(new_total)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            bill_number = %bill.bill_number,
            item_id = %item_id,
            new_total_cents = new_total,
            by = %actor.id,
            "bill item deleted"
        );

        Ok(DeleteItemOutcome {
            bill_deleted: false,
            subtotal_cents: new_subtotal,
            tax_cents: new_tax.cents(),
            total_cents: new_total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::generate_customer_id;
    use crate::repository::product::generate_product_id;
    use tally_core::{Customer, EntityState, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cashier() -> Actor {
        Actor::new("cash-1", Role::Cashier)
    }

    fn manager() -> Actor {
        Actor::new("mgr-1", Role::Manager)
    }

    fn admin() -> Actor {
        Actor::new("adm-1", Role::Admin)
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            price_cents,
            stock,
            category: "general".to_string(),
            state: EntityState::Active,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product.id
    }

    async fn seed_customer(db: &Database, name: &str) -> String {
        let now = Utc::now();
        let customer = Customer {
            id: generate_customer_id(),
            name: name.to_string(),
            phone: "0300-0000000".to_string(),
            email: "x@example.com".to_string(),
            address: "12 Mall Road".to_string(),
            total_orders: 0,
            total_spent_cents: 0,
            state: EntityState::Active,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await.unwrap();
        customer.id
    }

    /// Single-line sale: qty x unit price, 10% tax, no discount/shipping.
    fn simple_sale(product_id: &str, quantity: i64, unit_price_cents: i64) -> CreateSaleRequest {
        let subtotal = quantity * unit_price_cents;
        let tax = subtotal / 10;
        CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![SaleLine {
                product_id: Some(product_id.to_string()),
                product_name: "Test Product".to_string(),
                quantity,
                unit_price_cents,
                discount_percent_bps: 0,
                discount_cents: 0,
                subtotal_cents: subtotal,
            }],
            subtotal_cents: subtotal,
            discount_cents: 0,
            tax_cents: tax,
            shipping_cents: 0,
            total_cents: subtotal + tax,
            payment_method: PaymentMethod::Cash,
            payment_status: None,
            paid_amount_cents: None,
            notes: None,
        }
    }

    // -------------------------------------------------------------------------
    // create_sale
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_sale_decrements_stock_and_records_movement() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let identity = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 3, 10_000))
            .await
            .unwrap();

        assert!(identity.bill_number.starts_with("BILL-"));

        let bill = db.bills().get_by_id(&identity.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.subtotal_cents, 30_000);
        assert_eq!(bill.tax_cents, 3_000);
        assert_eq!(bill.total_cents, 33_000);
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
        assert!(!bill.is_return);
        assert_eq!(bill.customer_name, WALK_IN_CUSTOMER);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);

        let movements = db.stock_movements().by_reference(&identity.bill_number).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, -3);
        assert_eq!(movements[0].previous_stock, 10);
        assert_eq!(movements[0].new_stock, 7);
        assert_eq!(movements[0].movement_type, MovementType::Sale);
        assert_eq!(movements[0].created_by, "cash-1");
    }

    #[tokio::test]
    async fn test_create_sale_captures_per_line_tax_share() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 10_000, 10).await;
        let b = seed_product(&db, "B", 30_000, 10).await;

        let request = CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![
                SaleLine {
                    product_id: Some(a),
                    product_name: "A".to_string(),
                    quantity: 1,
                    unit_price_cents: 10_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 10_000,
                },
                SaleLine {
                    product_id: Some(b),
                    product_name: "B".to_string(),
                    quantity: 1,
                    unit_price_cents: 30_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 30_000,
                },
            ],
            subtotal_cents: 40_000,
            discount_cents: 0,
            tax_cents: 4_000,
            shipping_cents: 0,
            total_cents: 44_000,
            payment_method: PaymentMethod::Card,
            payment_status: None,
            paid_amount_cents: None,
            notes: None,
        };

        let identity = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let items = db.bills().get_items(&identity.bill_id).await.unwrap();

        // Tax split 1:3, matching the subtotal split
        assert_eq!(items[0].tax_cents, 1_000);
        assert_eq!(items[1].tax_cents, 3_000);
    }

    #[tokio::test]
    async fn test_create_sale_with_registered_customer() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;
        let customer_id = seed_customer(&db, "Ayesha Khan").await;

        let mut request = simple_sale(&product_id, 2, 10_000);
        request.customer_id = Some(customer_id.clone());

        let identity = db.bill_engine().create_sale(&cashier(), request).await.unwrap();

        // Snapshot taken from the customer row
        let bill = db.bills().get_by_id(&identity.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.customer_name, "Ayesha Khan");
        assert_eq!(bill.customer_id.as_deref(), Some(customer_id.as_str()));

        // Aggregates moved in the same transaction
        let customer = db.customers().get_by_id(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.total_spent_cents, 22_000);
    }

    #[tokio::test]
    async fn test_create_sale_empty_cart_rejected() {
        let db = test_db().await;

        let request = CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![],
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            shipping_cents: 0,
            total_cents: 0,
            payment_method: PaymentMethod::Cash,
            payment_status: None,
            paid_amount_cents: None,
            notes: None,
        };

        let err = db.bill_engine().create_sale(&cashier(), request).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(db.bills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_sale_unbalanced_totals_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let mut request = simple_sale(&product_id, 1, 10_000);
        request.total_cents += 500;

        let err = db.bill_engine().create_sale(&cashier(), request).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::Unbalanced { .. })));

        // Nothing written, stock untouched
        assert_eq!(db.bills().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_create_sale_unknown_product_rolls_back_everything() {
        let db = test_db().await;
        let real = seed_product(&db, "Real", 10_000, 10).await;

        let request = CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![
                SaleLine {
                    product_id: Some(real.clone()),
                    product_name: "Real".to_string(),
                    quantity: 2,
                    unit_price_cents: 10_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 20_000,
                },
                SaleLine {
                    product_id: Some(Uuid::new_v4().to_string()),
                    product_name: "Ghost".to_string(),
                    quantity: 1,
                    unit_price_cents: 5_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 5_000,
                },
            ],
            subtotal_cents: 25_000,
            discount_cents: 0,
            tax_cents: 0,
            shipping_cents: 0,
            total_cents: 25_000,
            payment_method: PaymentMethod::Cash,
            payment_status: None,
            paid_amount_cents: None,
            notes: None,
        };

        let err = db.bill_engine().create_sale(&cashier(), request).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        // The first line's stock decrement rolled back with the bill
        assert_eq!(db.bills().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_id(&real).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_create_sale_can_oversell() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 2).await;

        db.bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 5, 10_000))
            .await
            .unwrap();

        // Sales record reality, even negative
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, -3);
    }

    #[tokio::test]
    async fn test_create_sale_partial_payment_recorded() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let mut request = simple_sale(&product_id, 3, 10_000);
        request.payment_status = Some(PaymentStatus::Partial);
        request.paid_amount_cents = Some(20_000);

        let identity = db.bill_engine().create_sale(&cashier(), request).await.unwrap();

        let bill = db.bills().get_by_id(&identity.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Partial);

        let payments = db.bills().get_payments(&identity.bill_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 20_000);
        assert_eq!(db.bills().total_paid(&identity.bill_id).await.unwrap(), 20_000);
    }

    // -------------------------------------------------------------------------
    // create_return
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_return_round_trip() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;
        let customer_id = seed_customer(&db, "Ayesha Khan").await;

        let mut request = simple_sale(&product_id, 3, 10_000);
        request.customer_id = Some(customer_id.clone());
        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let sale_items = db.bills().get_items(&sale.bill_id).await.unwrap();

        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id.clone(),
                    reason: "damaged packaging".to_string(),
                    items: vec![ReturnLine {
                        original_item_id: sale_items[0].id.clone(),
                        quantity: 3,
                    }],
                },
            )
            .await
            .unwrap();

        assert!(ret.bill_number.starts_with("RET-"));

        // Full return refunds exactly the original amounts
        let ret_bill = db.bills().get_by_id(&ret.bill_id).await.unwrap().unwrap();
        assert!(ret_bill.is_return);
        assert_eq!(ret_bill.subtotal_cents, 30_000);
        assert_eq!(ret_bill.tax_cents, 3_000);
        assert_eq!(ret_bill.total_cents, 33_000);
        assert_eq!(ret_bill.payment_status, PaymentStatus::Refunded);
        assert_eq!(ret_bill.original_bill_id.as_deref(), Some(sale.bill_id.as_str()));
        assert_eq!(ret_bill.return_reason.as_deref(), Some("damaged packaging"));

        // Stock back where it started, with a Return movement
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        let movements = db.stock_movements().by_reference(&ret.bill_number).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, 3);
        assert_eq!(movements[0].movement_type, MovementType::Return);

        // Aggregates keep the original sale
        let customer = db.customers().get_by_id(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.total_spent_cents, 33_000);

        // Discoverable from the original
        let returns = db.bills().list_returns_for(&sale.bill_id).await.unwrap();
        assert_eq!(returns.len(), 1);
    }

    #[tokio::test]
    async fn test_return_of_discounted_line_refunds_the_paid_amount() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        // One unit at 10000 with a 10% line discount: net 9000 + 900 tax
        let request = CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![SaleLine {
                product_id: Some(product_id.clone()),
                product_name: "Soap Bar".to_string(),
                quantity: 1,
                unit_price_cents: 10_000,
                discount_percent_bps: 1_000,
                discount_cents: 1_000,
                subtotal_cents: 9_000,
            }],
            subtotal_cents: 9_000,
            discount_cents: 0,
            tax_cents: 900,
            shipping_cents: 0,
            total_cents: 9_900,
            payment_method: PaymentMethod::Cash,
            payment_status: None,
            paid_amount_cents: None,
            notes: None,
        };

        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id,
                    reason: "wrong scent".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id, quantity: 1 }],
                },
            )
            .await
            .unwrap();

        // The line subtotal is already net of its discount; the refund
        // must not deduct it a second time.
        let ret_bill = db.bills().get_by_id(&ret.bill_id).await.unwrap().unwrap();
        assert_eq!(ret_bill.subtotal_cents, 9_000);
        assert_eq!(ret_bill.discount_cents, 0);
        assert_eq!(ret_bill.tax_cents, 900);
        assert_eq!(ret_bill.total_cents, 9_900);
    }

    #[tokio::test]
    async fn test_partial_returns_sum_to_the_original_cent_exact() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Odd Priced", 3_337, 10).await;

        // 3 x 3337 = 10011 subtotal, 1001 tax: neither divides by 3
        let mut request = simple_sale(&product_id, 3, 3_337);
        request.tax_cents = 1_001;
        request.total_cents = 10_011 + 1_001;
        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let first = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id.clone(),
                    reason: "one unit faulty".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id.clone(), quantity: 1 }],
                },
            )
            .await
            .unwrap();

        let second = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id.clone(),
                    reason: "rest came back too".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id, quantity: 2 }],
                },
            )
            .await
            .unwrap();

        let first_bill = db.bills().get_by_id(&first.bill_id).await.unwrap().unwrap();
        let second_bill = db.bills().get_by_id(&second.bill_id).await.unwrap().unwrap();

        // Parts rounded half-up, but the parts sum to the whole
        assert_eq!(first_bill.subtotal_cents + second_bill.subtotal_cents, 10_011);
        assert_eq!(first_bill.tax_cents + second_bill.tax_cents, 1_001);

        // All stock back
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_return_skips_invalid_lines() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 3, 10_000))
            .await
            .unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id.clone(),
                    reason: "mixed request".to_string(),
                    items: vec![
                        // unknown line: skipped
                        ReturnLine {
                            original_item_id: Uuid::new_v4().to_string(),
                            quantity: 1,
                        },
                        // over-quantity: skipped
                        ReturnLine { original_item_id: item_id.clone(), quantity: 99 },
                        // valid
                        ReturnLine { original_item_id: item_id, quantity: 1 },
                    ],
                },
            )
            .await
            .unwrap();

        let items = db.bills().get_items(&ret.bill_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_return_with_no_valid_lines_is_a_conflict() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 3, 10_000))
            .await
            .unwrap();

        let err = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id,
                    reason: "nothing matches".to_string(),
                    items: vec![ReturnLine {
                        original_item_id: Uuid::new_v4().to_string(),
                        quantity: 1,
                    }],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Conflict(_)));
        // Only the sale exists
        assert_eq!(db.bills().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cannot_return_a_return() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 2, 10_000))
            .await
            .unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id,
                    reason: "change of mind".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id, quantity: 1 }],
                },
            )
            .await
            .unwrap();

        let ret_item_id = db.bills().get_items(&ret.bill_id).await.unwrap()[0].id.clone();
        let err = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: ret.bill_id,
                    reason: "return the return".to_string(),
                    items: vec![ReturnLine { original_item_id: ret_item_id, quantity: 1 }],
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Conflict(_)));
    }

    // -------------------------------------------------------------------------
    // update_bill / update_payment_status
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_bill_recomputes_total() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 3, 10_000))
            .await
            .unwrap();

        db.bill_engine()
            .update_bill(
                &manager(),
                &sale.bill_id,
                UpdateBillRequest {
                    discount_cents: Some(2_000),
                    shipping_cents: Some(500),
                    notes: Some("loyalty discount".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let bill = db.bills().get_by_id(&sale.bill_id).await.unwrap().unwrap();
        // 30000 - 2000 + 3000 + 500
        assert_eq!(bill.total_cents, 31_500);
        assert_eq!(bill.notes.as_deref(), Some("loyalty discount"));
        // Untouched fields keep their values
        assert_eq!(bill.tax_cents, 3_000);
    }

    #[tokio::test]
    async fn test_update_bill_forbidden_for_cashier() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 1, 10_000))
            .await
            .unwrap();

        let err = db
            .bill_engine()
            .update_bill(&cashier(), &sale.bill_id, UpdateBillRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Forbidden { required: Role::Manager }));
    }

    #[tokio::test]
    async fn test_update_bill_rejects_returns() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 2, 10_000))
            .await
            .unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();
        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id,
                    reason: "damaged".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id, quantity: 2 }],
                },
            )
            .await
            .unwrap();

        let err = db
            .bill_engine()
            .update_bill(&manager(), &ret.bill_id, UpdateBillRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_payment_status_with_partial_amount() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let mut request = simple_sale(&product_id, 3, 10_000);
        request.payment_status = Some(PaymentStatus::Pending);
        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();

        db.bill_engine()
            .update_payment_status(&cashier(), &sale.bill_id, PaymentStatus::Partial, Some(10_000))
            .await
            .unwrap();
        db.bill_engine()
            .update_payment_status(&cashier(), &sale.bill_id, PaymentStatus::Partial, Some(5_000))
            .await
            .unwrap();

        let bill = db.bills().get_by_id(&sale.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Partial);
        assert_eq!(db.bills().total_paid(&sale.bill_id).await.unwrap(), 15_000);

        db.bill_engine()
            .update_payment_status(&cashier(), &sale.bill_id, PaymentStatus::Paid, None)
            .await
            .unwrap();
        let bill = db.bills().get_by_id(&sale.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
    }

    // -------------------------------------------------------------------------
    // delete_bill / delete_bill_item
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_bill_restores_stock_without_movements() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 4, 10_000))
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 6);

        db.bill_engine().delete_bill(&manager(), &sale.bill_id).await.unwrap();

        // Stock handed back, bill and items gone
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);
        assert!(db.bills().get_by_id(&sale.bill_id).await.unwrap().is_none());
        assert!(db.bills().get_items(&sale.bill_id).await.unwrap().is_empty());

        // Only the original sale movement remains; the restore is silent
        assert_eq!(db.stock_movements().count_for_product(&product_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_bill_requires_manager() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 1, 10_000))
            .await
            .unwrap();

        let err = db.bill_engine().delete_bill(&cashier(), &sale.bill_id).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { required: Role::Manager }));
        assert!(db.bills().get_by_id(&sale.bill_id).await.unwrap().is_some());

        // Admin outranks manager and may delete too
        db.bill_engine().delete_bill(&admin(), &sale.bill_id).await.unwrap();
        assert!(db.bills().get_by_id(&sale.bill_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_return_bill_keeps_returned_stock() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 3, 10_000))
            .await
            .unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();
        let ret = db
            .bill_engine()
            .create_return(
                &cashier(),
                CreateReturnRequest {
                    original_bill_id: sale.bill_id,
                    reason: "damaged".to_string(),
                    items: vec![ReturnLine { original_item_id: item_id, quantity: 3 }],
                },
            )
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);

        db.bill_engine().delete_bill(&manager(), &ret.bill_id).await.unwrap();

        // Return lines restore nothing on deletion; shelf count stands
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);
        assert!(db.bills().get_by_id(&ret.bill_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_bill_item_requires_pending_status() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        // Paid by default
        let sale = db
            .bill_engine()
            .create_sale(&cashier(), simple_sale(&product_id, 2, 10_000))
            .await
            .unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let err = db
            .bill_engine()
            .delete_bill_item(&manager(), &sale.bill_id, &item_id)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_bill_item_recomputes_with_the_deleted_lines_rate() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 10_000, 10).await;
        let b = seed_product(&db, "B", 30_000, 10).await;

        let request = CreateSaleRequest {
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            customer_address: None,
            items: vec![
                SaleLine {
                    product_id: Some(a.clone()),
                    product_name: "A".to_string(),
                    quantity: 2,
                    unit_price_cents: 10_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 20_000,
                },
                SaleLine {
                    product_id: Some(b),
                    product_name: "B".to_string(),
                    quantity: 1,
                    unit_price_cents: 30_000,
                    discount_percent_bps: 0,
                    discount_cents: 0,
                    subtotal_cents: 30_000,
                },
            ],
            subtotal_cents: 50_000,
            discount_cents: 0,
            tax_cents: 5_000,
            shipping_cents: 0,
            total_cents: 55_000,
            payment_method: PaymentMethod::Cash,
            payment_status: Some(PaymentStatus::Pending),
            paid_amount_cents: None,
            notes: None,
        };

        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let items = db.bills().get_items(&sale.bill_id).await.unwrap();
        let line_a = items.iter().find(|i| i.product_name == "A").unwrap();

        let outcome = db
            .bill_engine()
            .delete_bill_item(&manager(), &sale.bill_id, &line_a.id)
            .await
            .unwrap();

        assert!(!outcome.bill_deleted);
        assert_eq!(outcome.subtotal_cents, 30_000);
        // Line A carried 2000 tax on 20000 subtotal: a 10% effective
        // rate, applied to the remaining 30000
        assert_eq!(outcome.tax_cents, 3_000);
        assert_eq!(outcome.total_cents, 33_000);

        let bill = db.bills().get_by_id(&sale.bill_id).await.unwrap().unwrap();
        assert_eq!(bill.subtotal_cents, 30_000);
        assert_eq!(bill.tax_cents, 3_000);
        assert_eq!(bill.total_cents, 33_000);

        // Line A's stock came back
        assert_eq!(db.products().get_by_id(&a).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_delete_last_bill_item_deletes_the_bill() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Soap Bar", 10_000, 10).await;

        let mut request = simple_sale(&product_id, 3, 10_000);
        request.payment_status = Some(PaymentStatus::Pending);
        let sale = db.bill_engine().create_sale(&cashier(), request).await.unwrap();
        let item_id = db.bills().get_items(&sale.bill_id).await.unwrap()[0].id.clone();

        let outcome = db
            .bill_engine()
            .delete_bill_item(&manager(), &sale.bill_id, &item_id)
            .await
            .unwrap();

        assert!(outcome.bill_deleted);
        assert!(db.bills().get_by_id(&sale.bill_id).await.unwrap().is_none());
        assert_eq!(db.products().get_by_id(&product_id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_bill_number_format() {
        let number = generate_bill_number(SALE_BILL_PREFIX);
        // BILL-YYYYMMDD-NNNN
        assert!(number.starts_with("BILL-"));
        let parts: Vec<&str> = number.splitn(2, '-').nth(1).unwrap().split('-').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 4);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    }
}
