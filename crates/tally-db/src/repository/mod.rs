//! # Repository Layer
//!
//! One repository per aggregate, each a thin wrapper around the shared
//! `SqlitePool`. Repositories are plain reads and single-row writes;
//! anything that must hold several tables in agreement lives in the
//! [`crate::engine`] module instead.

pub mod bill;
pub mod customer;
pub mod product;
pub mod report;
pub mod stock;

pub use bill::BillRepository;
pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use stock::StockMovementRepository;
