//! Scripted engine doubles for exercising the statement and cursor layers
//! without a real storage engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::engine::{
    CommandInterface, QueryResult, RowMutationGateway, RowStream, SessionInterface, UpdateResult,
};
use crate::error::SqlDriverError;
use crate::results::{ColumnInfo, MemoryResult};
use crate::types::{CellValue, GeneratedKeysRequest};

/// One scripted response for the next prepared command.
#[derive(Clone)]
pub enum CommandPlan {
    Query {
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<CellValue>>,
        lazy: bool,
    },
    Update {
        count: u64,
        keys: Option<(Vec<ColumnInfo>, Vec<Vec<CellValue>>)>,
    },
    Fail {
        message: String,
    },
}

impl CommandPlan {
    pub fn query(columns: Vec<ColumnInfo>, rows: Vec<Vec<CellValue>>) -> Self {
        CommandPlan::Query {
            columns,
            rows,
            lazy: false,
        }
    }

    pub fn lazy_query(columns: Vec<ColumnInfo>, rows: Vec<Vec<CellValue>>) -> Self {
        CommandPlan::Query {
            columns,
            rows,
            lazy: true,
        }
    }

    pub fn update(count: u64) -> Self {
        CommandPlan::Update { count, keys: None }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        CommandPlan::Fail {
            message: message.into(),
        }
    }
}

/// Everything the recording gateway observed.
#[derive(Default)]
pub struct GatewayLog {
    pub inserted: Vec<Vec<CellValue>>,
    pub updated: Vec<(Vec<CellValue>, Vec<Option<CellValue>>)>,
    pub deleted: Vec<Vec<CellValue>>,
}

/// A mutation gateway that records every flush into a shared log.
pub struct RecordingGateway {
    log: Arc<Mutex<GatewayLog>>,
    updatable: bool,
    /// When set, `refresh_row` returns this instead of echoing the current row.
    pub refreshed: Option<Vec<CellValue>>,
}

impl RecordingGateway {
    pub fn new(log: Arc<Mutex<GatewayLog>>, updatable: bool) -> Self {
        RecordingGateway {
            log,
            updatable,
            refreshed: None,
        }
    }

    fn log(&self) -> MutexGuard<'_, GatewayLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RowMutationGateway for RecordingGateway {
    fn is_updatable(&self) -> bool {
        self.updatable
    }

    fn insert_row(&mut self, row: &[CellValue]) -> Result<(), SqlDriverError> {
        self.log().inserted.push(row.to_vec());
        Ok(())
    }

    fn update_row(
        &mut self,
        current: &[CellValue],
        touched: &[Option<CellValue>],
    ) -> Result<(), SqlDriverError> {
        self.log().updated.push((current.to_vec(), touched.to_vec()));
        Ok(())
    }

    fn delete_row(&mut self, current: &[CellValue]) -> Result<(), SqlDriverError> {
        self.log().deleted.push(current.to_vec());
        Ok(())
    }

    fn refresh_row(&mut self, current: &[CellValue]) -> Result<Vec<CellValue>, SqlDriverError> {
        Ok(self
            .refreshed
            .clone()
            .unwrap_or_else(|| current.to_vec()))
    }
}

/// A command whose behavior was scripted when the session was built.
pub struct ScriptedCommand {
    plan: CommandPlan,
    cancelled: AtomicBool,
    stopped: AtomicBool,
    closed: AtomicBool,
}

impl ScriptedCommand {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl CommandInterface for ScriptedCommand {
    fn is_query(&self) -> bool {
        matches!(self.plan, CommandPlan::Query { .. })
    }

    fn execute_query(
        &self,
        max_rows: u64,
        _scrollable: bool,
    ) -> Result<QueryResult, SqlDriverError> {
        match &self.plan {
            CommandPlan::Query {
                columns,
                rows,
                lazy,
            } => {
                let mut kept = rows.clone();
                if max_rows > 0 && kept.len() as u64 > max_rows {
                    kept.truncate(max_rows as usize);
                }
                Ok(QueryResult {
                    stream: Box::new(MemoryResult::new(columns.clone()).with_rows(kept)),
                    lazy: *lazy,
                })
            }
            CommandPlan::Fail { message } => Err(SqlDriverError::Execution(message.clone())),
            CommandPlan::Update { .. } => Err(SqlDriverError::Execution(
                "scripted update executed as query".into(),
            )),
        }
    }

    fn execute_update(
        &self,
        _generated_keys: &GeneratedKeysRequest,
    ) -> Result<UpdateResult, SqlDriverError> {
        match &self.plan {
            CommandPlan::Update { count, keys } => Ok(UpdateResult {
                update_count: *count,
                generated_keys: keys.as_ref().map(|(columns, rows)| {
                    Box::new(MemoryResult::new(columns.clone()).with_rows(rows.clone()))
                        as Box<dyn RowStream>
                }),
            }),
            CommandPlan::Fail { message } => Err(SqlDriverError::Execution(message.clone())),
            CommandPlan::Query { .. } => Err(SqlDriverError::Execution(
                "scripted query executed as update".into(),
            )),
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// A session that serves prepared commands from a queue of [`CommandPlan`]s
/// and records what the statement layer sent down.
pub struct ScriptedSession {
    lock: Mutex<()>,
    plans: Mutex<VecDeque<CommandPlan>>,
    prepared: Mutex<Vec<String>>,
    commands: Mutex<Vec<Arc<ScriptedCommand>>>,
    timeouts: Mutex<Vec<Option<Duration>>>,
    gateway_log: Arc<Mutex<GatewayLog>>,
    updatable: AtomicBool,
    closed: AtomicBool,
}

impl ScriptedSession {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedSession {
            lock: Mutex::new(()),
            plans: Mutex::new(VecDeque::new()),
            prepared: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
            gateway_log: Arc::new(Mutex::new(GatewayLog::default())),
            updatable: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        })
    }

    pub fn expect(&self, plan: CommandPlan) {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(plan);
    }

    /// Statement texts as they arrived at `prepare_command`, post-translation.
    pub fn prepared(&self) -> Vec<String> {
        self.prepared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every command this session handed out, in prepare order.
    pub fn commands(&self) -> Vec<Arc<ScriptedCommand>> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn gateway_log(&self) -> Arc<Mutex<GatewayLog>> {
        Arc::clone(&self.gateway_log)
    }

    pub fn set_updatable(&self, updatable: bool) {
        self.updatable.store(updatable, Ordering::Release);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl SessionInterface for ScriptedSession {
    fn prepare_command(
        &self,
        sql: &str,
        _fetch_size: u32,
    ) -> Result<Arc<dyn CommandInterface>, SqlDriverError> {
        self.prepared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_owned());
        let plan = self
            .plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| SqlDriverError::Execution("no scripted plan left".into()))?;
        let command = Arc::new(ScriptedCommand {
            plan,
            cancelled: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&command));
        Ok(command)
    }

    fn execution_lock(&self) -> &Mutex<()> {
        &self.lock
    }

    fn mutation_gateway(
        &self,
        _stream: &dyn RowStream,
    ) -> Result<Box<dyn RowMutationGateway>, SqlDriverError> {
        Ok(Box::new(RecordingGateway::new(
            Arc::clone(&self.gateway_log),
            self.updatable.load(Ordering::Acquire),
        )))
    }

    fn set_query_timeout(&self, timeout: Option<Duration>) {
        self.timeouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timeout);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
