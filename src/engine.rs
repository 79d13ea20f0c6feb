//! Traits at the boundary to the statement compiler and storage engine.
//!
//! Everything below this seam is an external collaborator: this crate only
//! prepares text, drives the command lifecycle, and navigates the returned
//! row streams.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::SqlDriverError;
use crate::types::{CellValue, GeneratedKeysRequest};

/// A prepared, executable unit owned by the engine.
///
/// All methods take `&self` and the object is `Send + Sync`: a second thread
/// must be able to call [`CommandInterface::cancel`] while the first is
/// blocked inside an execute call. The engine owns whatever locking that
/// requires.
pub trait CommandInterface: Send + Sync {
    /// Whether executing this command yields a row stream (query) or an
    /// update count. Classified at execution time by the statement executor.
    fn is_query(&self) -> bool;

    /// Run as a query. `max_rows` of 0 means unlimited; `scrollable` asks the
    /// engine for a stream that supports `reset`.
    fn execute_query(
        &self,
        max_rows: u64,
        scrollable: bool,
    ) -> Result<QueryResult, SqlDriverError>;

    /// Run as an update, optionally returning generated keys.
    fn execute_update(
        &self,
        generated_keys: &GeneratedKeysRequest,
    ) -> Result<UpdateResult, SqlDriverError>;

    /// Cooperatively interrupt a run in progress. Must not block.
    fn cancel(&self);

    /// Stop producing rows for a lazily streamed result.
    fn stop(&self);

    /// Release the prepared command. Idempotent.
    fn close(&self);
}

/// Result of [`CommandInterface::execute_query`].
pub struct QueryResult {
    pub stream: Box<dyn RowStream>,
    /// A lazy stream is produced on demand; the statement keeps the command
    /// registered for cancellation until the cursor over it closes.
    pub lazy: bool,
}

/// Result of [`CommandInterface::execute_update`].
pub struct UpdateResult {
    pub update_count: u64,
    /// Generated keys, when the request asked for them and the command
    /// produced any. `None` is normalized to an empty stream by the
    /// statement executor.
    pub generated_keys: Option<Box<dyn RowStream>>,
}

/// An ordered, replayable sequence of rows with known row count and a single
/// advancing position. The cursor engine imposes absolute/relative
/// addressing on top; internally the stream is only ever advanced forward or
/// reset to before-first.
pub trait RowStream: Send {
    /// Advance to the next row. Returns false once exhausted; after that
    /// [`RowStream::row_id`] reports `row_count`.
    fn next(&mut self) -> Result<bool, SqlDriverError>;

    /// Rewind to before the first row for replay.
    fn reset(&mut self);

    /// 0-based id of the current row; -1 before the first row, `row_count`
    /// after the last.
    fn row_id(&self) -> i64;

    fn row_count(&self) -> u64;

    fn column_count(&self) -> usize;

    /// Values of the current row. Only valid while positioned on a row.
    fn current_row(&self) -> &[CellValue];

    /// Display alias of column `i` (0-based).
    fn alias(&self, i: usize) -> &str;

    /// Underlying table name of column `i`, when the column maps to one.
    fn table_name(&self, i: usize) -> Option<&str>;

    /// Underlying source column name of column `i`.
    fn column_name(&self, i: usize) -> Option<&str>;

    /// Release engine resources. Idempotent.
    fn close(&mut self);
}

/// Turns staged row changes into physical mutations.
///
/// For updates and deletes the gateway receives the row's current full value
/// snapshot as well; it may need the complete row to physically locate it.
pub trait RowMutationGateway: Send {
    fn is_updatable(&self) -> bool;

    fn insert_row(&mut self, row: &[CellValue]) -> Result<(), SqlDriverError>;

    /// `touched` has one slot per column: `None` means untouched, while
    /// `Some(CellValue::Null)` is an explicit null write.
    fn update_row(
        &mut self,
        current: &[CellValue],
        touched: &[Option<CellValue>],
    ) -> Result<(), SqlDriverError>;

    fn delete_row(&mut self, current: &[CellValue]) -> Result<(), SqlDriverError>;

    /// Re-read the row identified by `current` and return its fresh values.
    fn refresh_row(&mut self, current: &[CellValue]) -> Result<Vec<CellValue>, SqlDriverError>;
}

/// The per-session slice of the engine a statement needs.
pub trait SessionInterface: Send + Sync {
    /// Parse and prepare a statement. The text has already been through
    /// escape translation.
    fn prepare_command(
        &self,
        sql: &str,
        fetch_size: u32,
    ) -> Result<Arc<dyn CommandInterface>, SqlDriverError>;

    /// The session's exclusive execution lock. Held around prepare + invoke
    /// only, never across row fetches, and never taken by cancellation.
    fn execution_lock(&self) -> &Mutex<()>;

    /// Build a mutation gateway for the given stream's source rows.
    fn mutation_gateway(
        &self,
        stream: &dyn RowStream,
    ) -> Result<Box<dyn RowMutationGateway>, SqlDriverError>;

    /// Forward a configured timeout; all timeout behavior lives in the engine.
    fn set_query_timeout(&self, _timeout: Option<Duration>) {}

    fn is_closed(&self) -> bool;
}
