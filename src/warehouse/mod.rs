//! SQLite-backed price warehouse.
//!
//! - WAL mode
//! - Unix epoch seconds for sample timestamps
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use crate::errors::{AppError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Shared handle to the warehouse database.
#[derive(Clone)]
pub struct Warehouse {
    conn: Arc<Mutex<Connection>>,
}

impl Warehouse {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "[WAREHOUSE] opened database");
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create tables and views if missing.
    pub fn setup_schema(&self) -> Result<()> {
        self.with_conn(|conn| migrations::run(conn))
    }

    /// Run `f` against a clone of this handle on the blocking thread pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Warehouse) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let wh = self.clone();
        tokio::task::spawn_blocking(move || f(&wh))
            .await
            .map_err(|e| AppError::Other(format!("warehouse task failed: {e}")))?
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| AppError::Other("warehouse connection lock poisoned".into()))?;
        f(&mut guard)
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
