//! # Tally Database Layer
//!
//! SQLite persistence for the Tally billing back office, plus the two
//! transactional components that own the money/stock invariants.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         tally-db                                │
//! │                                                                 │
//! │  ┌───────────┐   ┌──────────────────────────────────────────┐   │
//! │  │ Database  │──▶│ engine::BillEngine                       │   │
//! │  │ (pool.rs) │   │   create_sale / create_return            │   │
//! │  │           │   │   update_bill / update_payment_status    │   │
//! │  │           │   │   delete_bill / delete_bill_item         │   │
//! │  │           │   ├──────────────────────────────────────────┤   │
//! │  │           │──▶│ engine::stock::StockLedger               │   │
//! │  │           │   │   adjust_stock / transfer_stock          │   │
//! │  │           │   ├──────────────────────────────────────────┤   │
//! │  │           │──▶│ repository::* (plain CRUD + reads)       │   │
//! │  └───────────┘   └──────────────────────────────────────────┘   │
//! │         │                                                       │
//! │         ▼                                                       │
//! │  ┌───────────┐   ┌────────────┐                                 │
//! │  │ SQLite    │   │ migrations │  (embedded, run on connect)     │
//! │  │ (WAL)     │   │ (sqlx)     │                                 │
//! │  └───────────┘   └────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating engine operation runs inside a single SQLite
//! transaction: the bill header, its items, the stock updates, the
//! movement rows and the customer aggregates commit together or not at
//! all.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let actor = Actor::new("user-1", Role::Cashier);
//! let identity = db.bill_engine().create_sale(&actor, request).await?;
//! ```

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// Re-export main types at crate root
pub use engine::stock::{AdjustStockRequest, StockLedger, TransferStockRequest};
pub use engine::{
    BillEngine, CreateReturnRequest, CreateSaleRequest, DeleteItemOutcome, EngineError,
    EngineResult, ReturnLine, SaleLine, UpdateBillRequest,
};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Re-export tally-core so callers don't need a direct dependency
pub use tally_core;
