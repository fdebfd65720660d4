//! SQLite connection pool
//!
//! r2d2-based pooling over rusqlite. Pragmas from [`SqlitePoolConfig`] are
//! applied to every connection as it is opened.

use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// Pooled connection handed to repositories.
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// SQLite connection pool
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
    path: PathBuf,
}

impl SqlitePool {
    /// Open (or create) the database at `path` and build the pool.
    ///
    /// A test connection is acquired before returning so an unreadable path
    /// fails here rather than on first query.
    #[instrument(fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        if config.max_size == 0 {
            return Err(StorageError::InvalidConfig("pool size must be at least 1".into()));
        }

        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "failed to create connection pool");
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        {
            let _conn = pool.get()?;
            debug!("initial connection acquired");
        }

        info!(max_connections = config.max_size, "sqlite pool created");

        Ok(Self { pool, config, path: path.to_path_buf() })
    }

    /// Acquire a connection, mapping r2d2 timeouts to [`StorageError::Timeout`].
    pub fn get(&self) -> StorageResult<SqliteConnection> {
        self.pool.get().map_err(|e| {
            let message = e.to_string();
            if message.to_lowercase().contains("timed out") {
                warn!(timeout = ?self.config.connection_timeout, "connection timeout");
                StorageError::Timeout(self.config.connection_timeout.as_secs())
            } else {
                warn!(error = %message, "connection error");
                StorageError::Connection(format!("Failed to get connection: {message}"))
            }
        })
    }

    /// Maximum number of pooled connections.
    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
