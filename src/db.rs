use anyhow::{Context, Result};
use rusqlite::{ffi, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::BankingError;
use crate::schema::Catalog;

/// Path value that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Shared handle over the SQLite connection.
///
/// Cloned into every request; there is no process-wide connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = if path.as_os_str() == IN_MEMORY {
            Connection::open_in_memory().context("Failed to open in-memory database")?
        } else {
            Connection::open(path)
                .with_context(|| format!("Failed to open database at {}", path.display()))?
        };
        conn.busy_timeout(busy_timeout)?;
        info!(path = %path.display(), "database opened");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        // foreign references are the store's job, not ours
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run blocking store work off the async runtime.
    pub async fn run<F, T>(&self, work: F) -> crate::error::Result<T>
    where
        F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.with_conn(work))
            .await
            .map_err(|e| BankingError::Unavailable(format!("store task failed: {}", e)))?
    }

    /// Run store work on the current thread.
    pub fn with_conn<F, T>(&self, work: F) -> crate::error::Result<T>
    where
        F: FnOnce(&mut Connection) -> crate::error::Result<T>,
    {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| BankingError::Unavailable("store lock poisoned".to_string()))?;
        work(&mut guard)
    }

    pub fn setup(&self, catalog: &Catalog) -> Result<()> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        setup_database(&guard, catalog)
    }
}

// ============================================================================
// SCHEMA SETUP
// ============================================================================

pub fn setup_database(conn: &Connection, catalog: &Catalog) -> Result<()> {
    // WAL for file databases; in-memory ones keep their "memory" journal
    conn.pragma_update(None, "journal_mode", "WAL")?;

    for descriptor in catalog.descriptors() {
        conn.execute(&descriptor.create_table_sql(), [])
            .with_context(|| format!("Failed to create table {}", descriptor.table))?;
        debug!(table = descriptor.table, "table ready");
    }

    info!(variant = %catalog.variant(), tables = catalog.descriptors().len(), "schema ready");
    Ok(())
}

/// Row count per table, in catalog order
pub fn table_counts(conn: &Connection, catalog: &Catalog) -> Result<Vec<(&'static str, i64)>> {
    catalog
        .descriptors()
        .iter()
        .map(|d| {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", d.table), [], |row| {
                    row.get(0)
                })
                .with_context(|| format!("Failed to count {}", d.table))?;
            Ok((d.table, count))
        })
        .collect()
}

// ============================================================================
// CONSTRAINT CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// PRIMARY KEY or UNIQUE
    Unique,
    ForeignKey,
    NotNull,
}

/// Which constraint a failed write tripped, if any
pub fn constraint_violation(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                Some(Constraint::Unique)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
            ffi::SQLITE_CONSTRAINT_NOTNULL => Some(Constraint::NotNull),
            _ => None,
        },
        _ => None,
    }
}
