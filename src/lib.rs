//! Client-side execution and result-access layer for a SQL engine.
//!
//! This crate sits between application code and a storage/compiler engine
//! reached through the traits in [`engine`]. It owns four concerns:
//!
//! - [`translation`]: vendor-neutral `{...}` escape clauses rewritten into
//!   plain SQL without moving any other character.
//! - [`statement`]: the execute lifecycle with exclusive session locking,
//!   cross-thread cancellation, and at most one live result per statement.
//! - [`cursor`]: absolute/relative navigation over forward-only row streams,
//!   typed cell access, and staged insert/update/delete mutations.
//! - Fail-soft batches with per-slot accounting.
//!
//! The engine side is pluggable; [`test_utils`] ships scripted doubles for
//! driving the whole stack in tests.

pub mod cursor;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod test_utils;
pub mod translation;
pub mod types;

pub use cursor::Cursor;
pub use error::{BatchUpdateError, SqlDriverError};
pub use results::{ColumnInfo, MemoryResult};
pub use statement::{
    BatchOutcome, CancelHandle, EXECUTE_FAILED, ExecuteOutcome, SUCCESS_NO_INFO, Statement,
    StatementOptions,
};
pub use translation::translate_escapes;
pub use types::{CellValue, GeneratedKeysRequest};
