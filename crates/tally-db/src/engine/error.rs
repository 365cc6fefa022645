//! # Engine Error Taxonomy
//!
//! One error surface for every engine and ledger operation. Callers can
//! match on the variant to decide what to show; raw datastore detail
//! stays inside [`DbError`] and is logged, never rendered to the till.

use thiserror::Error;

use crate::error::DbError;
use tally_core::{Role, ValidationError};

/// Errors surfaced by engine and ledger operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A request field failed validation. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The actor's role is below what the operation requires.
    #[error("operation requires {required} role")]
    Forbidden { required: Role },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not valid for the entity's current state
    /// (e.g. deleting a line from a paid bill).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A guarded stock operation would push stock negative.
    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound { entity, id: id.into() }
    }
}

/// Lets engine code use `?` directly on sqlx calls inside transactions.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
