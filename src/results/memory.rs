use crate::engine::RowStream;
use crate::error::SqlDriverError;
use crate::types::CellValue;

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// The display alias, as selected or aliased by the statement.
    pub alias: String,
    /// The underlying source column name, when the column maps to one.
    pub column_name: Option<String>,
    /// The underlying table name, when the column maps to one.
    pub table_name: Option<String>,
}

impl ColumnInfo {
    /// A column with only a display alias (computed expressions, literals).
    #[must_use]
    pub fn aliased(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column_name: None,
            table_name: None,
        }
    }

    /// A column sourced from `table.column`, displayed under `alias`.
    #[must_use]
    pub fn sourced(
        alias: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            column_name: Some(column_name.into()),
            table_name: Some(table_name.into()),
        }
    }
}

/// A fully materialized, replayable row stream.
///
/// This is the stream shape engines hand back when they buffer results, and
/// what the statement executor uses for the always-valid empty generated-keys
/// stream. Position advances forward one row at a time; `reset` rewinds to
/// before-first for replay.
#[derive(Debug)]
pub struct MemoryResult {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<CellValue>>,
    row_id: i64,
    closed: bool,
}

impl MemoryResult {
    #[must_use]
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            row_id: -1,
            closed: false,
        }
    }

    /// The zero-column, zero-row stream.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn add_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<CellValue>>) -> Self {
        for row in rows {
            self.add_row(row);
        }
        self
    }
}

impl RowStream for MemoryResult {
    fn next(&mut self) -> Result<bool, SqlDriverError> {
        if self.closed {
            return Err(SqlDriverError::ObjectClosed);
        }
        if self.row_id + 1 < self.rows.len() as i64 {
            self.row_id += 1;
            Ok(true)
        } else {
            self.row_id = self.rows.len() as i64;
            Ok(false)
        }
    }

    fn reset(&mut self) {
        self.row_id = -1;
    }

    fn row_id(&self) -> i64 {
        self.row_id
    }

    fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn current_row(&self) -> &[CellValue] {
        static EMPTY: [CellValue; 0] = [];
        if self.row_id < 0 || self.row_id >= self.rows.len() as i64 {
            return &EMPTY;
        }
        &self.rows[self.row_id as usize]
    }

    fn alias(&self, i: usize) -> &str {
        &self.columns[i].alias
    }

    fn table_name(&self, i: usize) -> Option<&str> {
        self.columns[i].table_name.as_deref()
    }

    fn column_name(&self, i: usize) -> Option<&str> {
        self.columns[i].column_name.as_deref()
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}
