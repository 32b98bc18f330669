//! Query Dispatcher
//!
//! Entry point for running SQL text: determines the statement, then hands it
//! to the matching handler. Lock contention either fails fast (`execute`) or
//! waits for the table to be released and retries (`execute_when_free`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::handlers::{ExecutionContext, QueryResult, StatementHandler};
use crate::catalog::SystemCatalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::sql::{determine_statement, Statement};
use crate::storage::{BinaryWriter, DiskWriter, TableStore};
use crate::transaction::LockManager;

/// Query Dispatcher
pub struct QueryDispatcher {
    config: EngineConfig,
    locks: Arc<LockManager>,
    catalog: SystemCatalog,
    /// Table stores loaded so far (table_name -> store)
    tables: Mutex<HashMap<String, Arc<Mutex<TableStore>>>>,
    writer: Mutex<Box<dyn BinaryWriter>>,
}

impl QueryDispatcher {
    /// Open the engine on `config.data_dir`, creating the directory if needed
    pub fn open(config: EngineConfig) -> Result<Self> {
        let writer = Box::new(DiskWriter::new(&config.data_dir));
        Self::with_writer(config, Arc::new(LockManager::new()), writer)
    }

    /// Open the engine with an explicit lock registry and byte sink
    pub fn with_writer(
        config: EngineConfig,
        locks: Arc<LockManager>,
        writer: Box<dyn BinaryWriter>,
    ) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;
        let catalog = SystemCatalog::open(&config.data_dir)?;

        debug!(
            data_dir = %config.data_dir.display(),
            tables = catalog.list_tables().len(),
            "engine opened"
        );

        Ok(Self {
            config,
            locks,
            catalog,
            tables: Mutex::new(HashMap::new()),
            writer: Mutex::new(writer),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn catalog(&self) -> &SystemCatalog {
        &self.catalog
    }

    /// Run one SQL statement; a locked table fails with `TableAlreadyLocked`
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let statement = determine_statement(sql)?;
        self.execute_statement(&statement)
    }

    /// Run an already parsed statement
    pub fn execute_statement(&self, statement: &Statement) -> Result<QueryResult> {
        let ctx = ExecutionContext {
            locks: &self.locks,
            catalog: &self.catalog,
            tables: &self.tables,
            writer: &self.writer,
            data_dir: &self.config.data_dir,
            btree_order: self.config.btree_order,
        };

        match statement {
            Statement::Insert(s) => s.execute(&ctx),
            Statement::Select(s) => s.execute(&ctx),
            Statement::Delete(s) => s.execute(&ctx),
            Statement::Update(s) => s.execute(&ctx),
            Statement::CreateTable(s) => s.execute(&ctx),
        }
    }

    /// Run one SQL statement, waiting out lock contention.
    ///
    /// On `TableAlreadyLocked` this waits until the table is released and tries
    /// again; another caller may win the lock first, in which case it waits
    /// again. Each wait is bounded by the configured lock timeout.
    pub async fn execute_when_free(&self, sql: &str) -> Result<QueryResult> {
        let statement = determine_statement(sql)?;
        self.execute_statement_when_free(&statement).await
    }

    /// [`execute_when_free`](Self::execute_when_free) for a parsed statement
    pub async fn execute_statement_when_free(&self, statement: &Statement) -> Result<QueryResult> {
        loop {
            match self.execute_statement(statement) {
                Err(Error::TableAlreadyLocked(table)) => {
                    warn!(table = %table, "table locked, waiting");
                    match self.config.lock_wait_duration() {
                        Some(timeout) => self.locks.await_free_timeout(&table, timeout).await?,
                        None => self.locks.await_free(&table).await,
                    }
                }
                result => return result,
            }
        }
    }
}

impl Drop for QueryDispatcher {
    fn drop(&mut self) {
        self.writer
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .dispose();
    }
}
