//! Navigable, optionally mutable cursor over an engine row stream.
//!
//! The cursor imposes absolute/relative addressing on a forward-only stream,
//! exposes typed cell access with the shared was-null flag, and stages row
//! mutations (insert/update) before flushing them through the mutation
//! gateway.

mod access;
mod position;
mod staged;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::engine::{CommandInterface, RowMutationGateway, RowStream};
use crate::error::SqlDriverError;
use crate::statement::ExecutingSlot;
use crate::types::CellValue;

pub(crate) use staged::StagedRow;

/// A navigable cursor over a result row stream.
///
/// Created by a successful execute call, closed by an explicit `close`, by
/// the owning statement closing, or by the next execute call on the same
/// statement (at most one live result per statement). Positions are 1-based
/// externally with before-first and after-last sentinels.
pub struct Cursor {
    pub(crate) inner: Arc<Mutex<CursorInner>>,
}

pub(crate) struct CursorInner {
    pub(crate) stream: Box<dyn RowStream>,
    pub(crate) gateway: Option<Box<dyn RowMutationGateway>>,
    /// Command retained for a lazily streamed result; closing the cursor
    /// closes it and clears the statement's cancellation registration.
    pub(crate) command: Option<Arc<dyn CommandInterface>>,
    pub(crate) executing: Option<Arc<ExecutingSlot>>,
    pub(crate) row_count: u64,
    pub(crate) column_count: usize,
    pub(crate) was_null: bool,
    pub(crate) insert_mode: bool,
    pub(crate) staged: Option<StagedRow>,
    /// Rows rewritten locally by update_row/refresh_row, keyed by row id.
    pub(crate) patched: HashMap<i64, Vec<CellValue>>,
    /// Lazily built uppercase alias -> 0-based index map, first-wins.
    pub(crate) label_map: Option<HashMap<String, usize>>,
    /// When set, closing this cursor marks the owning statement closed
    /// (implicit companion results, close-on-completion).
    pub(crate) owner_closed: Option<Arc<AtomicBool>>,
    pub(crate) closed: bool,
}

impl Cursor {
    /// Build a cursor directly over a stream, outside any statement. This is
    /// the entry point for engine integrations and test doubles; statements
    /// construct their cursors internally.
    #[must_use]
    pub fn over(
        stream: Box<dyn RowStream>,
        gateway: Option<Box<dyn RowMutationGateway>>,
    ) -> Self {
        Cursor {
            inner: Arc::new(Mutex::new(CursorInner::new(stream, gateway))),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CursorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the most recently read cell was NULL. Reflects only the last
    /// typed read on this cursor, by design.
    pub fn was_null(&self) -> Result<bool, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.was_null)
    }

    pub fn column_count(&self) -> Result<usize, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.column_count)
    }

    pub fn row_count(&self) -> Result<u64, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.row_count)
    }

    /// Close the cursor and release its stream. Idempotent.
    pub fn close(&self) {
        self.lock().close_internal();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl CursorInner {
    pub(crate) fn new(
        stream: Box<dyn RowStream>,
        gateway: Option<Box<dyn RowMutationGateway>>,
    ) -> Self {
        let row_count = stream.row_count();
        let column_count = stream.column_count();
        CursorInner {
            stream,
            gateway,
            command: None,
            executing: None,
            row_count,
            column_count,
            was_null: false,
            insert_mode: false,
            staged: None,
            patched: HashMap::new(),
            label_map: None,
            owner_closed: None,
            closed: false,
        }
    }

    pub(crate) fn check_closed(&self) -> Result<(), SqlDriverError> {
        if self.closed {
            Err(SqlDriverError::ObjectClosed)
        } else {
            Ok(())
        }
    }

    /// 1-based position; 0 before the first row, row_count + 1 after the last.
    pub(crate) fn position(&self) -> u64 {
        (self.stream.row_id() + 1) as u64
    }

    pub(crate) fn on_valid_row(&self) -> bool {
        let id = self.stream.row_id();
        id >= 0 && (id as u64) < self.row_count
    }

    pub(crate) fn close_internal(&mut self) {
        if self.closed {
            return;
        }
        debug!("closing cursor");
        self.closed = true;
        self.staged = None;
        self.insert_mode = false;
        self.patched.clear();
        self.stream.close();
        if let Some(slot) = self.executing.take() {
            slot.deregister();
        }
        if let Some(command) = self.command.take() {
            command.stop();
            command.close();
        }
        if let Some(owner) = self.owner_closed.take() {
            owner.store(true, Ordering::Release);
        }
    }
}
