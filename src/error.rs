use thiserror::Error;

use crate::statement::BatchOutcome;

/// Errors surfaced by the statement, cursor, and translation layers.
#[derive(Debug, Error)]
pub enum SqlDriverError {
    /// Malformed escape clause or an unterminated literal/comment/bracket.
    /// The offset is a character position into the original statement text,
    /// suitable for caret-style diagnostics.
    #[error("syntax error in statement at offset {offset}")]
    Syntax { offset: usize },

    /// Access after close. `close` itself and `is_closed` stay callable.
    #[error("object is already closed")]
    ObjectClosed,

    /// A row-level operation was attempted while not positioned on a row.
    #[error("no data is available: {0}")]
    NoData(String),

    /// Insert-row protocol violation, or the mutation gateway reports the
    /// result as not updatable.
    #[error("not on an updatable row: {0}")]
    NotUpdatable(String),

    /// Out-of-range column index, negative fetch size, bad typed-get target,
    /// and similar caller mistakes.
    #[error("invalid value for {param}: {value}")]
    InvalidValue { param: &'static str, value: String },

    /// Column name lookup failed against both aliases and table.column pairs.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Explicitly enumerated unimplemented surface; never silently ignored.
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Failure reported by the engine while preparing or running a command.
    #[error("execution error: {0}")]
    Execution(String),

    /// Aggregate batch failure; carries per-slot outcomes and the error chain.
    #[error(transparent)]
    Batch(#[from] Box<BatchUpdateError>),
}

impl SqlDriverError {
    pub(crate) fn invalid_value(param: &'static str, value: impl ToString) -> Self {
        SqlDriverError::InvalidValue {
            param,
            value: value.to_string(),
        }
    }
}

/// Raised by `execute_batch` when at least one queued statement failed.
///
/// The batch keeps running past failures, so `outcomes` always has one slot
/// per queued statement and `errors` chains every underlying failure in
/// queue order.
#[derive(Debug, Error)]
#[error("batch execution failed for {} of {} statement(s)", errors.len(), outcomes.len())]
pub struct BatchUpdateError {
    pub outcomes: Vec<BatchOutcome>,
    pub errors: Vec<SqlDriverError>,
}
