//! Storage doubles shared by the unit tests

use super::error::StorageError;
use super::model::{LogEntry, NormalizedEntry};
use super::storage::{LogStorage, Row, SqliteStorage, Statement};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Wraps a real store and counts reads
pub struct CountingStorage {
    inner: SqliteStorage,
    reads: AtomicUsize,
    last_entries_statement: Mutex<Option<Statement>>,
}

impl CountingStorage {
    pub fn new(inner: SqliteStorage) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            last_entries_statement: Mutex::new(None),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn last_entries_statement(&self) -> Option<Statement> {
        self.last_entries_statement.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStorage for CountingStorage {
    async fn insert_batch(&self, entries: &[NormalizedEntry]) -> Result<u64, StorageError> {
        self.inner.insert_batch(entries).await
    }

    async fn select_entries(&self, stmt: &Statement) -> Result<Vec<LogEntry>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.last_entries_statement.lock().unwrap() = Some(stmt.clone());
        self.inner.select_entries(stmt).await
    }

    async fn select_rows(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.select_rows(stmt).await
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64, StorageError> {
        self.inner.execute(stmt).await
    }
}

fn unavailable() -> StorageError {
    StorageError::Database(sqlx::Error::PoolClosed)
}

/// Every call fails
pub struct FailingStorage;

#[async_trait]
impl LogStorage for FailingStorage {
    async fn insert_batch(&self, _entries: &[NormalizedEntry]) -> Result<u64, StorageError> {
        Err(unavailable())
    }

    async fn select_entries(&self, _stmt: &Statement) -> Result<Vec<LogEntry>, StorageError> {
        Err(unavailable())
    }

    async fn select_rows(&self, _stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        Err(unavailable())
    }

    async fn execute(&self, _stmt: &Statement) -> Result<u64, StorageError> {
        Err(unavailable())
    }
}

/// Reports fewer rows written than submitted
pub struct ShortWriteStorage {
    pub written: u64,
}

#[async_trait]
impl LogStorage for ShortWriteStorage {
    async fn insert_batch(&self, _entries: &[NormalizedEntry]) -> Result<u64, StorageError> {
        Ok(self.written)
    }

    async fn select_entries(&self, _stmt: &Statement) -> Result<Vec<LogEntry>, StorageError> {
        Ok(vec![])
    }

    async fn select_rows(&self, _stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        Ok(vec![])
    }

    async fn execute(&self, _stmt: &Statement) -> Result<u64, StorageError> {
        Ok(0)
    }
}
