//! Materialized result storage.

mod memory;

pub use memory::{ColumnInfo, MemoryResult};
