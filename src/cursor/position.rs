//! Position state machine over a forward-only stream.

use super::{Cursor, CursorInner};
use crate::error::SqlDriverError;

impl Cursor {
    /// Advance to the next row. Returns true while positioned on a real row.
    pub fn next(&self) -> Result<bool, SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.next_row()
    }

    /// Move to the row before the current one.
    pub fn previous(&self) -> Result<bool, SqlDriverError> {
        self.relative(-1)
    }

    /// Move to the first row: reset and advance once.
    pub fn first(&self) -> Result<bool, SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.reset_stream();
        inner.next_row()
    }

    /// Move to the last row.
    pub fn last(&self) -> Result<bool, SqlDriverError> {
        self.absolute(-1)
    }

    /// Move to a specific row. 1 is the first row; negative counts from the
    /// end, so -1 is the last row. Out-of-range targets park the cursor on
    /// the matching sentinel. Returns true iff the final position is a real
    /// row.
    pub fn absolute(&self, row_number: i64) -> Result<bool, SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        let row_count = inner.row_count as i64;
        let mut target = if row_number < 0 {
            row_count + row_number + 1
        } else {
            row_number
        };
        if target > row_count + 1 {
            target = row_count + 1;
        }
        if target < 0 {
            target = 0;
        }
        inner.seek(target as u64)
    }

    /// Move relative to the current position; 0 re-reports current validity.
    pub fn relative(&self, offset: i64) -> Result<bool, SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        let row_count = inner.row_count as i64;
        let mut target = inner.position() as i64 + offset;
        if target > row_count + 1 {
            target = row_count + 1;
        }
        if target < 0 {
            target = 0;
        }
        inner.seek(target as u64)
    }

    /// Park before the first row.
    pub fn before_first(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        inner.reset_stream();
        Ok(())
    }

    /// Park after the last row.
    pub fn after_last(&self) -> Result<(), SqlDriverError> {
        let mut inner = self.lock();
        inner.check_closed()?;
        while inner.next_row()? {}
        Ok(())
    }

    pub fn is_before_first(&self) -> Result<bool, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.position() == 0 && inner.row_count > 0)
    }

    pub fn is_after_last(&self) -> Result<bool, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.row_count == 0 || inner.position() == inner.row_count + 1)
    }

    pub fn is_first(&self) -> Result<bool, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.row_count > 0 && inner.position() == 1)
    }

    pub fn is_last(&self) -> Result<bool, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        Ok(inner.row_count > 0 && inner.position() == inner.row_count)
    }

    /// Current 1-based row number; 0 at either sentinel.
    pub fn row(&self) -> Result<u64, SqlDriverError> {
        let inner = self.lock();
        inner.check_closed()?;
        if inner.on_valid_row() {
            Ok(inner.position())
        } else {
            Ok(0)
        }
    }
}

impl CursorInner {
    pub(crate) fn next_row(&mut self) -> Result<bool, SqlDriverError> {
        self.discard_update_stage();
        self.stream.next()
    }

    pub(crate) fn reset_stream(&mut self) {
        self.discard_update_stage();
        self.stream.reset();
    }

    /// Move to a 1-based target position (0 = before-first, row_count + 1 =
    /// after-last). The stream is forward-only, so a target at or before the
    /// current position replays from the start.
    pub(crate) fn seek(&mut self, target: u64) -> Result<bool, SqlDriverError> {
        self.discard_update_stage();
        if target <= self.position() {
            self.stream.reset();
        }
        while self.position() < target {
            if !self.stream.next()? {
                break;
            }
        }
        Ok(self.on_valid_row())
    }
}
