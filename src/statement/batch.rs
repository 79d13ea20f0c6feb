//! Fail-soft batch execution with per-slot accounting.

use tracing::debug;

use super::{Expect, ExecuteOutcome, Statement};
use crate::error::{BatchUpdateError, SqlDriverError};
use crate::types::GeneratedKeysRequest;

/// Slot value reporting a statement that succeeded without a known count.
pub const SUCCESS_NO_INFO: i32 = -2;
/// Slot value reporting a statement that failed; the batch kept going.
pub const EXECUTE_FAILED: i32 = -3;

/// Outcome of one queued batch statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    UpdateCount(u64),
    Failed,
}

impl Statement {
    /// Queue a statement for batch execution. Translation happens here, once,
    /// so executing the batch never re-scans the text.
    pub fn add_batch(&mut self, sql: &str) -> Result<(), SqlDriverError> {
        self.check_closed()?;
        let text = self.prepare_text(sql)?.into_owned();
        self.batch_mut().push(text);
        Ok(())
    }

    /// Drop all queued statements without running them.
    pub fn clear_batch(&mut self) -> Result<(), SqlDriverError> {
        self.check_closed()?;
        self.batch_mut().clear();
        Ok(())
    }

    /// Run every queued statement in order, continuing past failures.
    ///
    /// Counts above `i32::MAX` saturate; use
    /// [`Statement::execute_large_batch`] for full-width counts. Failed slots
    /// report [`EXECUTE_FAILED`]. When any slot failed the whole call returns
    /// a [`BatchUpdateError`] carrying every outcome and every underlying
    /// error in queue order.
    pub fn execute_batch(&mut self) -> Result<Vec<i32>, SqlDriverError> {
        let (outcomes, errors) = self.run_batch()?;
        let counts = outcomes
            .iter()
            .map(|outcome| match outcome {
                BatchOutcome::UpdateCount(n) => i32::try_from(*n).unwrap_or(i32::MAX),
                BatchOutcome::Failed => EXECUTE_FAILED,
            })
            .collect();
        if errors.is_empty() {
            Ok(counts)
        } else {
            Err(Box::new(BatchUpdateError { outcomes, errors }).into())
        }
    }

    /// [`Statement::execute_batch`] with 64-bit counts.
    pub fn execute_large_batch(&mut self) -> Result<Vec<i64>, SqlDriverError> {
        let (outcomes, errors) = self.run_batch()?;
        let counts = outcomes
            .iter()
            .map(|outcome| match outcome {
                BatchOutcome::UpdateCount(n) => i64::try_from(*n).unwrap_or(i64::MAX),
                BatchOutcome::Failed => i64::from(EXECUTE_FAILED),
            })
            .collect();
        if errors.is_empty() {
            Ok(counts)
        } else {
            Err(Box::new(BatchUpdateError { outcomes, errors }).into())
        }
    }

    fn run_batch(&mut self) -> Result<(Vec<BatchOutcome>, Vec<SqlDriverError>), SqlDriverError> {
        self.check_closed()?;
        let queued = std::mem::take(self.batch_mut());
        debug!(statements = queued.len(), "executing batch");
        let mut outcomes = Vec::with_capacity(queued.len());
        let mut errors = Vec::new();
        for text in &queued {
            match self.run(text, Expect::Update, &GeneratedKeysRequest::None) {
                Ok(ExecuteOutcome::Update(count)) => {
                    outcomes.push(BatchOutcome::UpdateCount(count));
                }
                Ok(ExecuteOutcome::Query(cursor)) => {
                    cursor.close();
                    outcomes.push(BatchOutcome::Failed);
                    errors.push(SqlDriverError::Execution(
                        "batched statement produced a result set".into(),
                    ));
                }
                Err(err) => {
                    outcomes.push(BatchOutcome::Failed);
                    errors.push(err);
                }
            }
        }
        Ok((outcomes, errors))
    }
}
