//! Statement executor: escape translation, command lifecycle, cancellation,
//! and the at-most-one-live-result rule.

mod batch;

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::cursor::{Cursor, CursorInner};
use crate::engine::{CommandInterface, SessionInterface};
use crate::error::SqlDriverError;
use crate::results::MemoryResult;
use crate::translation::translate_escapes;
use crate::types::GeneratedKeysRequest;

pub use batch::{BatchOutcome, EXECUTE_FAILED, SUCCESS_NO_INFO};

/// The command currently running on a statement, shared with cancel callers.
///
/// Registration happens under the session execution lock; cancellation
/// deliberately does not take that lock, so a blocked execute can be
/// interrupted from another thread.
pub(crate) struct ExecutingSlot {
    command: Mutex<Option<Arc<dyn CommandInterface>>>,
    cancelled: AtomicBool,
}

impl ExecutingSlot {
    fn new() -> Self {
        ExecutingSlot {
            command: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    fn register(&self, command: Arc<dyn CommandInterface>) {
        self.cancelled.store(false, Ordering::Release);
        *self.lock() = Some(command);
    }

    pub(crate) fn deregister(&self) {
        *self.lock() = None;
    }

    fn request_cancel(&self) {
        let command = self.lock().take();
        if let Some(command) = command {
            debug!("cancelling executing command");
            command.cancel();
            self.cancelled.store(true, Ordering::Release);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn CommandInterface>>> {
        self.command.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A cloneable, `Send` handle that can cancel whatever the statement is
/// executing at the moment of the call. Harmless when nothing is running.
#[derive(Clone)]
pub struct CancelHandle {
    slot: Arc<ExecutingSlot>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.slot.request_cancel();
    }

    /// Whether the last execute on the statement was interrupted by a cancel.
    pub fn is_cancelled(&self) -> bool {
        self.slot.is_cancelled()
    }
}

/// Per-statement execution knobs, fixed at the point each execute call runs.
#[derive(Debug, Clone)]
pub struct StatementOptions {
    /// Cap on rows a query returns; 0 means unlimited.
    pub max_rows: u64,
    /// Fetch hint forwarded to the engine; 0 lets the engine choose.
    pub fetch_size: u32,
    /// Ask the engine for resettable streams so the cursor can replay.
    pub scrollable: bool,
    /// Build a mutation gateway for query results.
    pub updatable: bool,
    /// Run escape-clause translation over statement text before execution.
    pub escape_processing: bool,
    /// Closing the result cursor closes the statement too.
    pub close_on_completion: bool,
    /// Forwarded to the session before each execute; `None` means no limit.
    pub query_timeout: Option<Duration>,
}

impl Default for StatementOptions {
    fn default() -> Self {
        StatementOptions {
            max_rows: 0,
            fetch_size: 0,
            scrollable: false,
            updatable: false,
            escape_processing: true,
            close_on_completion: false,
            query_timeout: None,
        }
    }
}

impl StatementOptions {
    #[must_use]
    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    #[must_use]
    pub fn updatable(mut self) -> Self {
        self.updatable = true;
        self
    }

    #[must_use]
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    #[must_use]
    pub fn with_close_on_completion(mut self) -> Self {
        self.close_on_completion = true;
        self
    }

    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

/// What a generic `execute` produced: a cursor or an update count.
pub enum ExecuteOutcome {
    Query(Cursor),
    Update(u64),
}

/// A statement bound to one session.
///
/// Each execute call translates the text, runs it under the session's
/// exclusive execution lock, and replaces any previous live result. Cancel
/// requests arrive through a [`CancelHandle`] from another thread.
pub struct Statement {
    session: Arc<dyn SessionInterface>,
    options: StatementOptions,
    executing: Arc<ExecutingSlot>,
    result_set: Option<Arc<Mutex<CursorInner>>>,
    generated_keys: Option<Arc<Mutex<CursorInner>>>,
    update_count: u64,
    batch: Vec<String>,
    closed: Arc<AtomicBool>,
}

enum Expect {
    Any,
    Query,
    Update,
}

impl Statement {
    #[must_use]
    pub fn new(session: Arc<dyn SessionInterface>, options: StatementOptions) -> Self {
        Statement {
            session,
            options,
            executing: Arc::new(ExecutingSlot::new()),
            result_set: None,
            generated_keys: None,
            update_count: 0,
            batch: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run a statement whose kind is not known up front.
    pub fn execute(&mut self, sql: &str) -> Result<ExecuteOutcome, SqlDriverError> {
        self.check_closed()?;
        let text = self.prepare_text(sql)?;
        self.run(&text, Expect::Any, &GeneratedKeysRequest::None)
    }

    /// Run a statement that must produce a row stream.
    pub fn execute_query(&mut self, sql: &str) -> Result<Cursor, SqlDriverError> {
        self.check_closed()?;
        let text = self.prepare_text(sql)?;
        match self.run(&text, Expect::Query, &GeneratedKeysRequest::None)? {
            ExecuteOutcome::Query(cursor) => Ok(cursor),
            ExecuteOutcome::Update(_) => unreachable!("query expectation enforced by run"),
        }
    }

    /// Run a statement that must produce an update count.
    pub fn execute_update(&mut self, sql: &str) -> Result<u64, SqlDriverError> {
        self.execute_update_with_keys(sql, &GeneratedKeysRequest::None)
    }

    /// Run an update, asking the engine for generated keys per `keys`.
    pub fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: &GeneratedKeysRequest,
    ) -> Result<u64, SqlDriverError> {
        self.check_closed()?;
        let text = self.prepare_text(sql)?;
        match self.run(&text, Expect::Update, keys)? {
            ExecuteOutcome::Update(count) => Ok(count),
            ExecuteOutcome::Query(_) => unreachable!("update expectation enforced by run"),
        }
    }

    /// Execute already-translated text. The full lifecycle: take the session
    /// execution lock, invalidate the previous results, prepare, register for
    /// cancellation, run, and release the registration unless a lazy stream
    /// keeps the command alive.
    fn run(
        &mut self,
        sql: &str,
        expect: Expect,
        keys: &GeneratedKeysRequest,
    ) -> Result<ExecuteOutcome, SqlDriverError> {
        debug!(sql, "executing statement");
        let session = Arc::clone(&self.session);
        let _guard = session
            .execution_lock()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.close_old_results();
        session.set_query_timeout(self.options.query_timeout);
        let command = session.prepare_command(sql, self.options.fetch_size)?;
        self.executing.register(Arc::clone(&command));
        let outcome = self.run_registered(&command, expect, keys);
        if outcome.is_err() {
            self.executing.deregister();
            command.close();
        }
        outcome
    }

    fn run_registered(
        &mut self,
        command: &Arc<dyn CommandInterface>,
        expect: Expect,
        keys: &GeneratedKeysRequest,
    ) -> Result<ExecuteOutcome, SqlDriverError> {
        if command.is_query() {
            if matches!(expect, Expect::Update) {
                return Err(SqlDriverError::Execution(
                    "statement produces a result set; use a query call".into(),
                ));
            }
            let result =
                command.execute_query(self.options.max_rows, self.options.scrollable)?;
            let gateway = if self.options.updatable {
                Some(self.session.mutation_gateway(result.stream.as_ref())?)
            } else {
                None
            };
            let mut inner = CursorInner::new(result.stream, gateway);
            if result.lazy {
                // the cursor owns the registration until it closes
                inner.command = Some(Arc::clone(command));
                inner.executing = Some(Arc::clone(&self.executing));
            } else {
                self.executing.deregister();
                command.close();
            }
            if self.options.close_on_completion {
                inner.owner_closed = Some(Arc::clone(&self.closed));
            }
            let shared = Arc::new(Mutex::new(inner));
            self.result_set = Some(Arc::clone(&shared));
            self.update_count = 0;
            Ok(ExecuteOutcome::Query(Cursor { inner: shared }))
        } else {
            if matches!(expect, Expect::Query) {
                return Err(SqlDriverError::Execution(
                    "statement does not produce a result set".into(),
                ));
            }
            let result = command.execute_update(keys)?;
            self.executing.deregister();
            command.close();
            let keys_stream = result
                .generated_keys
                .unwrap_or_else(|| Box::new(MemoryResult::empty()));
            let keys_inner = Arc::new(Mutex::new(CursorInner::new(keys_stream, None)));
            self.generated_keys = Some(keys_inner);
            self.update_count = result.update_count;
            Ok(ExecuteOutcome::Update(result.update_count))
        }
    }

    /// Generated keys from the last update, or the empty stream when the last
    /// execute produced none. Never absent on an open statement.
    pub fn generated_keys(&mut self) -> Result<Cursor, SqlDriverError> {
        self.check_closed()?;
        let inner = match &self.generated_keys {
            Some(existing) => Arc::clone(existing),
            None => {
                let empty = Arc::new(Mutex::new(CursorInner::new(
                    Box::new(MemoryResult::empty()),
                    None,
                )));
                self.generated_keys = Some(Arc::clone(&empty));
                empty
            }
        };
        Ok(Cursor { inner })
    }

    /// Update count from the last execute; 0 after a query.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// A handle another thread can use to interrupt this statement's current
    /// execute call.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            slot: Arc::clone(&self.executing),
        }
    }

    /// Cancel whatever is executing right now, if anything.
    pub fn cancel(&self) {
        self.executing.request_cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.executing.is_cancelled()
    }

    pub fn set_max_rows(&mut self, max_rows: i64) -> Result<(), SqlDriverError> {
        if max_rows < 0 {
            return Err(SqlDriverError::invalid_value("maxRows", max_rows));
        }
        self.options.max_rows = max_rows as u64;
        Ok(())
    }

    pub fn set_fetch_size(&mut self, fetch_size: i32) -> Result<(), SqlDriverError> {
        if fetch_size < 0 {
            return Err(SqlDriverError::invalid_value("fetchSize", fetch_size));
        }
        self.options.fetch_size = fetch_size as u32;
        Ok(())
    }

    pub fn set_escape_processing(&mut self, enabled: bool) {
        self.options.escape_processing = enabled;
    }

    pub fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.options.query_timeout = timeout;
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    /// Close the statement and any live results. Idempotent.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("closing statement");
        self.close_old_results();
        self.batch.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.session.is_closed()
    }

    pub(crate) fn check_closed(&self) -> Result<(), SqlDriverError> {
        if self.is_closed() {
            Err(SqlDriverError::ObjectClosed)
        } else {
            Ok(())
        }
    }

    /// Translate escape clauses unless the caller turned translation off.
    fn prepare_text<'a>(&self, sql: &'a str) -> Result<Cow<'a, str>, SqlDriverError> {
        if self.options.escape_processing {
            translate_escapes(sql)
        } else {
            Ok(Cow::Borrowed(sql))
        }
    }

    /// Invalidate the previous execute's results; each execute leaves at most
    /// one live result per statement.
    fn close_old_results(&mut self) {
        for slot in [self.result_set.take(), self.generated_keys.take()] {
            if let Some(inner) = slot {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .close_internal();
            }
        }
    }

    pub(crate) fn batch_mut(&mut self) -> &mut Vec<String> {
        &mut self.batch
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        self.close();
    }
}
