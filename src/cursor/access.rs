//! Typed cell access and column name resolution.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use super::{Cursor, CursorInner};
use crate::error::SqlDriverError;
use crate::types::CellValue;

impl Cursor {
    /// Fetch the cell at the 1-based `column` of the current row.
    ///
    /// Overwrites the shared was-null flag with this cell's nullness.
    pub fn get_value(&self, column: usize) -> Result<CellValue, SqlDriverError> {
        self.lock().get(column)
    }

    /// Fetch a cell by case-insensitive column name.
    pub fn get_value_named(&self, name: &str) -> Result<CellValue, SqlDriverError> {
        let mut inner = self.lock();
        let column = inner.find_column(name)?;
        inner.get(column)
    }

    /// NULL reads as 0 with the was-null flag set.
    pub fn get_i64(&self, column: usize) -> Result<i64, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(0);
        }
        value
            .as_int()
            .copied()
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    /// NULL reads as 0.0 with the was-null flag set.
    pub fn get_f64(&self, column: usize) -> Result<f64, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(0.0);
        }
        value
            .as_float()
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    /// NULL reads as false with the was-null flag set.
    pub fn get_bool(&self, column: usize) -> Result<bool, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(false);
        }
        value
            .as_bool()
            .copied()
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    pub fn get_string(&self, column: usize) -> Result<Option<String>, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_text()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    pub fn get_timestamp(&self, column: usize) -> Result<Option<NaiveDateTime>, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_timestamp()
            .map(Some)
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    pub fn get_blob(&self, column: usize) -> Result<Option<Vec<u8>>, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_blob()
            .map(|b| Some(b.to_vec()))
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    pub fn get_json(&self, column: usize) -> Result<Option<JsonValue>, SqlDriverError> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_json()
            .cloned()
            .map(Some)
            .ok_or_else(|| SqlDriverError::invalid_value("column value", describe(&value)))
    }

    /// Resolve a column name to its 1-based index.
    ///
    /// Matches case-insensitively against display aliases first; when that
    /// fails and the name is qualified as `table.column`, retries against the
    /// source columns with the table name matched case-sensitively and the
    /// column name case-insensitively.
    pub fn find_column(&self, name: &str) -> Result<usize, SqlDriverError> {
        self.lock().find_column(name)
    }
}

fn describe(value: &CellValue) -> String {
    format!("{value:?}")
}

impl CursorInner {
    pub(crate) fn get(&mut self, column: usize) -> Result<CellValue, SqlDriverError> {
        self.check_closed()?;
        let index = self.check_column(column)?;
        if !self.on_valid_row() {
            return Err(SqlDriverError::NoData(
                "cursor is not positioned on a row".into(),
            ));
        }
        let row_id = self.stream.row_id();
        let value = match self.patched.get(&row_id) {
            Some(patch) => patch[index].clone(),
            None => self.stream.current_row()[index].clone(),
        };
        self.was_null = value.is_null();
        Ok(value)
    }

    /// Validate a 1-based column index and return it 0-based.
    pub(crate) fn check_column(&self, column: usize) -> Result<usize, SqlDriverError> {
        if column < 1 || column > self.column_count {
            return Err(SqlDriverError::invalid_value("columnIndex", column));
        }
        Ok(column - 1)
    }

    pub(crate) fn find_column(&mut self, name: &str) -> Result<usize, SqlDriverError> {
        self.check_closed()?;
        if self.label_map.is_none() {
            let mut map = HashMap::with_capacity(self.column_count);
            for i in 0..self.column_count {
                // first mapping wins for duplicate aliases
                map.entry(self.stream.alias(i).to_ascii_uppercase()).or_insert(i);
            }
            self.label_map = Some(map);
        }
        if let Some(map) = &self.label_map
            && let Some(&index) = map.get(&name.to_ascii_uppercase())
        {
            return Ok(index + 1);
        }
        if let Some(dot) = name.find('.') {
            let (table, column) = (&name[..dot], &name[dot + 1..]);
            for i in 0..self.column_count {
                if self.stream.table_name(i) == Some(table)
                    && self
                        .stream
                        .column_name(i)
                        .is_some_and(|c| c.eq_ignore_ascii_case(column))
                {
                    return Ok(i + 1);
                }
            }
        }
        Err(SqlDriverError::ColumnNotFound(name.to_owned()))
    }

    /// The current row's values as the gateway needs to see them, honoring
    /// local patches.
    pub(crate) fn current_row_snapshot(&self) -> Vec<CellValue> {
        let row_id = self.stream.row_id();
        match self.patched.get(&row_id) {
            Some(patch) => patch.clone(),
            None => self.stream.current_row().to_vec(),
        }
    }
}
