//! Temporary SQLite databases for tests.
//!
//! The database file lives inside a [`tempfile::TempDir`] owned by the
//! fixture, so clean-up happens when the fixture is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{CommonError, CommonResult};
use crate::storage::{SqlitePool, SqlitePoolConfig};

/// Temporary on-disk database with its own pool.
#[derive(Debug)]
pub struct TempSqliteDatabase {
    _temp_dir: TempDir,
    db_path: PathBuf,
    pool: SqlitePool,
}

impl TempSqliteDatabase {
    /// Create a database using the default pool configuration.
    pub fn new() -> CommonResult<Self> {
        Self::with_pool_config(SqlitePoolConfig::default())
    }

    /// Create a database with a custom pool configuration.
    pub fn with_pool_config(config: SqlitePoolConfig) -> CommonResult<Self> {
        let temp_dir = TempDir::new()
            .map_err(|e| CommonError::storage(format!("failed to create temp dir: {e}")))?;
        let db_path = temp_dir.path().join("relaygate-test.db");
        let pool = SqlitePool::new(&db_path, config)?;

        Ok(Self { _temp_dir: temp_dir, db_path, pool })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Pool bound to the database.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
