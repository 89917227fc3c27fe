use std::path::Path;
use std::time::Duration;

use r2d2::{HandleError, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::error::Result;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can lend out a connection for the duration of a closure.
/// The connection is released when the closure returns, whatever the
/// outcome.
pub trait ConnectionSource: Send + Sync {
    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>;
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Read-only SQLite connections handed out by an `r2d2` pool.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: Pool<SqliteConnectionManager>,
}

impl ConnectionPool {
    /// No connection is opened here; the first checkout opens one, so an
    /// unreachable database only fails the requests that need it.
    pub fn open<P: AsRef<Path>>(path: P, options: PoolOptions) -> Self {
        let path = path.as_ref();
        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_init(move |conn| conn.busy_timeout(busy_timeout));
        let pool = Pool::builder()
            .max_size(options.max_connections.max(1))
            .min_idle(Some(0))
            .connection_timeout(options.acquire_timeout.max(Duration::from_millis(1)))
            .error_handler(Box::new(TracingErrorHandler))
            .build_unchecked(manager);
        debug!(
            path = %path.display(),
            max_connections = pool.max_size(),
            "connection pool configured"
        );
        Self { pool }
    }

    /// Connections currently open, idle or on loan.
    pub fn open_connections(&self) -> u32 {
        self.pool.state().connections
    }

    pub fn acquire(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl ConnectionSource for ConnectionPool {
    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.acquire()?;
        f(&conn)
    }
}

#[derive(Debug)]
struct TracingErrorHandler;

impl HandleError<rusqlite::Error> for TracingErrorHandler {
    fn handle_error(&self, error: rusqlite::Error) {
        warn!(%error, "failed to open pooled sqlite connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlossaryError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn sample_db(dir: &Path) -> PathBuf {
        let path = dir.join("pool.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        path
    }

    fn select_x(pool: &ConnectionPool) -> Result<i64> {
        pool.with_connection(|conn| Ok(conn.query_row("SELECT x FROM t", [], |r| r.get(0))?))
    }

    #[test]
    fn sequential_callers_reuse_one_connection() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(sample_db(dir.path()), PoolOptions::default());
        assert_eq!(pool.open_connections(), 0);
        for _ in 0..5 {
            assert_eq!(select_x(&pool).unwrap(), 1);
        }
        assert_eq!(pool.open_connections(), 1);
    }

    #[test]
    fn connection_is_released_on_error() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(
            sample_db(dir.path()),
            PoolOptions {
                max_connections: 1,
                acquire_timeout: Duration::from_millis(200),
                ..Default::default()
            },
        );
        let failed: Result<i64> = pool.with_connection(|conn| {
            Ok(conn.query_row("SELECT nope FROM t", [], |r| r.get(0))?)
        });
        assert!(matches!(failed, Err(GlossaryError::Sqlite(_))));
        assert_eq!(select_x(&pool).unwrap(), 1);
    }

    #[test]
    fn connections_are_read_only() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(sample_db(dir.path()), PoolOptions::default());
        let write = pool.with_connection(|conn| Ok(conn.execute("INSERT INTO t VALUES (2)", [])?));
        assert!(write.is_err());
    }

    #[test]
    fn checkout_times_out_when_exhausted() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(
            sample_db(dir.path()),
            PoolOptions {
                max_connections: 1,
                acquire_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        );
        let _held = pool.acquire().unwrap();
        assert!(matches!(pool.acquire(), Err(GlossaryError::Pool(_))));
    }

    #[test]
    fn missing_database_is_a_pool_error() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(
            dir.path().join("absent").join("glossary.sqlite"),
            PoolOptions {
                acquire_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        );
        assert!(matches!(select_x(&pool), Err(GlossaryError::Pool(_))));
    }

    #[test]
    fn callers_beyond_capacity_wait_and_succeed() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(
            sample_db(dir.path()),
            PoolOptions {
                max_connections: 2,
                ..Default::default()
            },
        );
        let done = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                let done = done.clone();
                thread::spawn(move || {
                    pool.with_connection(|conn| {
                        thread::sleep(Duration::from_millis(10));
                        let x: i64 = conn.query_row("SELECT x FROM t", [], |r| r.get(0))?;
                        Ok(x)
                    })
                    .unwrap();
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert!(pool.open_connections() <= 2);
    }
}
