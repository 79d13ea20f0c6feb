//! Staged row mutations: insert buffer, sparse update buffer, and the flush
//! paths through the mutation gateway.

use tracing::debug;

use super::{Cursor, CursorInner};
use crate::error::SqlDriverError;
use crate::types::CellValue;

/// A pending local change that has not reached the gateway yet.
pub(crate) enum StagedRow {
    /// Dense buffer for a new row, one slot per column, all starting NULL.
    Insert(Vec<CellValue>),
    /// Sparse buffer over the current row: `None` means untouched, while
    /// `Some(CellValue::Null)` is an explicit null write.
    Update(Vec<Option<CellValue>>),
}

impl Cursor {
    /// Enter insert mode: subsequent `update_value` calls write into a fresh
    /// all-NULL row buffer instead of the current row. Any pending update
    /// stage is discarded.
    pub fn move_to_insert_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        inner.insert_mode = true;
        inner.staged = Some(StagedRow::Insert(vec![
            CellValue::Null;
            inner.column_count
        ]));
        Ok(())
    }

    /// Leave insert mode and drop any staged values, insert or update.
    pub fn move_to_current_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.insert_mode = false;
        inner.staged = None;
        Ok(())
    }

    /// Stage a value for the 1-based `column`. In insert mode this fills the
    /// insert buffer; otherwise it starts (or extends) an update stage over
    /// the current row.
    pub fn update_value(&self, column: usize, value: CellValue) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        let index = inner.check_column(column)?;
        if inner.insert_mode {
            if let Some(StagedRow::Insert(row)) = &mut inner.staged {
                row[index] = value;
            }
            return Ok(());
        }
        if !inner.on_valid_row() {
            return Err(SqlDriverError::NoData(
                "cursor is not positioned on a row".into(),
            ));
        }
        let column_count = inner.column_count;
        match &mut inner.staged {
            Some(StagedRow::Update(touched)) => touched[index] = Some(value),
            _ => {
                let mut touched = vec![None; column_count];
                touched[index] = Some(value);
                inner.staged = Some(StagedRow::Update(touched));
            }
        }
        Ok(())
    }

    /// Stage a value by column name.
    pub fn update_value_named(&self, name: &str, value: CellValue) -> Result<(), SqlDriverError> {
        let column = self.find_column(name)?;
        self.update_value(column, value)
    }

    /// Flush the insert buffer through the gateway as a new row, then reset
    /// the buffer so another row can be staged without leaving insert mode.
    pub fn insert_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        if !inner.insert_mode {
            return Err(SqlDriverError::NotUpdatable(
                "insert_row called outside insert mode".into(),
            ));
        }
        let column_count = inner.column_count;
        let row = match inner.staged.take() {
            Some(StagedRow::Insert(row)) => row,
            _ => vec![CellValue::Null; column_count],
        };
        debug!("flushing staged insert row");
        let result = inner.gateway_mut()?.insert_row(&row);
        inner.staged = Some(StagedRow::Insert(vec![CellValue::Null; column_count]));
        result
    }

    /// Flush the update stage through the gateway, then patch the merged row
    /// locally so later reads at this position see the new values.
    pub fn update_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        if inner.insert_mode {
            return Err(SqlDriverError::NotUpdatable(
                "update_row called in insert mode".into(),
            ));
        }
        if !inner.on_valid_row() {
            return Err(SqlDriverError::NoData(
                "cursor is not positioned on a row".into(),
            ));
        }
        let Some(StagedRow::Update(touched)) = inner.staged.take() else {
            // nothing staged
            return Ok(());
        };
        let current = inner.current_row_snapshot();
        debug!("flushing staged update row");
        inner.gateway_mut()?.update_row(&current, &touched)?;
        let merged: Vec<CellValue> = current
            .into_iter()
            .zip(touched)
            .map(|(old, new)| new.unwrap_or(old))
            .collect();
        let row_id = inner.stream.row_id();
        inner.patched.insert(row_id, merged);
        Ok(())
    }

    /// Delete the current row through the gateway.
    pub fn delete_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        if inner.insert_mode {
            return Err(SqlDriverError::NotUpdatable(
                "delete_row called in insert mode".into(),
            ));
        }
        if !inner.on_valid_row() {
            return Err(SqlDriverError::NoData(
                "cursor is not positioned on a row".into(),
            ));
        }
        let current = inner.current_row_snapshot();
        inner.staged = None;
        inner.gateway_mut()?.delete_row(&current)
    }

    /// Re-read the current row from the gateway, replacing any local patch
    /// and dropping the update stage.
    pub fn refresh_row(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.check_updatable()?;
        if inner.insert_mode {
            return Err(SqlDriverError::NoData(
                "refresh_row called in insert mode".into(),
            ));
        }
        if !inner.on_valid_row() {
            return Err(SqlDriverError::NoData(
                "cursor is not positioned on a row".into(),
            ));
        }
        let current = inner.current_row_snapshot();
        inner.staged = None;
        let fresh = inner.gateway_mut()?.refresh_row(&current)?;
        let row_id = inner.stream.row_id();
        inner.patched.insert(row_id, fresh);
        Ok(())
    }

    /// Drop a pending update stage without flushing it.
    pub fn cancel_row_updates(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        if inner.insert_mode {
            return Err(SqlDriverError::NotUpdatable(
                "cancel_row_updates called in insert mode".into(),
            ));
        }
        inner.discard_update_stage();
        Ok(())
    }

    /// Whether this cursor can stage and flush mutations.
    pub fn is_updatable(&self) -> bool {
        let inner = self.lock();
        !inner.closed
            && inner
                .gateway
                .as_ref()
                .is_some_and(|gateway| gateway.is_updatable())
    }
}

impl CursorInner {
    /// Drop an update stage when the position changes; an insert stage stays
    /// alive across navigation because it is not tied to a row.
    pub(crate) fn discard_update_stage(&mut self) {
        if matches!(self.staged, Some(StagedRow::Update(_))) {
            self.staged = None;
        }
    }

    pub(crate) fn check_updatable(&self) -> Result<(), SqlDriverError> {
        let updatable = self
            .gateway
            .as_ref()
            .is_some_and(|gateway| gateway.is_updatable());
        if updatable {
            Ok(())
        } else {
            Err(SqlDriverError::NotUpdatable(
                "result is read-only".into(),
            ))
        }
    }

    fn gateway_mut(&mut self) -> Result<&mut Box<dyn crate::engine::RowMutationGateway>, SqlDriverError> {
        self.gateway.as_mut().ok_or_else(|| {
            SqlDriverError::NotUpdatable("result is read-only".into())
        })
    }
}
