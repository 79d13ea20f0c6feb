//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::cursor::Cursor;
pub use crate::engine::{
    CommandInterface, QueryResult, RowMutationGateway, RowStream, SessionInterface, UpdateResult,
};
pub use crate::error::{BatchUpdateError, SqlDriverError};
pub use crate::results::{ColumnInfo, MemoryResult};
pub use crate::statement::{
    BatchOutcome, CancelHandle, EXECUTE_FAILED, ExecuteOutcome, SUCCESS_NO_INFO, Statement,
    StatementOptions,
};
pub use crate::translation::translate_escapes;
pub use crate::types::{CellValue, GeneratedKeysRequest};
