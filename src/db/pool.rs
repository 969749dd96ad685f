// src/db/pool.rs
// DOCUMENTATION: Database connection pool lifecycle management
// PURPOSE: Build the pool once at startup, expose health/stats, shut down cleanly

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Postgres};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::config::AppSettings;
use crate::errors::PoolError;

/// Base time quantum for connection lifecycle settings.
/// Idle timeout, max lifetime, and keepalive are fixed multiples of this.
const POOL_TIME_QUANTUM: Duration = Duration::from_secs(60);

/// Deadline for validating a connection during a health check
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Threshold for slow-statement warnings in development mode
const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(10);

/// Minimum idle connections kept warm in the pool
fn min_idle(pool_size: u32) -> u32 {
    (pool_size / 2).max(2)
}

/// Point-in-time pool statistics, recomputed on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: u32,
    pub active: u32,
    pub idle: u32,
    /// Callers currently blocked waiting for a connection
    pub waiting: u32,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool[total={}, active={}, idle={}, waiting={}]",
            self.total, self.active, self.idle, self.waiting
        )
    }
}

/// Managed wrapper around the live connection pool.
/// DOCUMENTATION: Built once at startup via Database::initialize and handed
/// out by reference; owns the keepalive task and the closed flag.
pub struct PoolManager {
    pool: PgPool,
    settings: AppSettings,
    waiting: AtomicU32,
    closed: AtomicBool,
    keepalive: JoinHandle<()>,
}

impl PoolManager {
    /// Build and validate the connection pool from resolved settings.
    ///
    /// Pool sizing comes from the settings; connection lifecycle uses fixed
    /// multiples of the base quantum (idle 10x, lifetime 30x, keepalive 5x).
    /// Development mode turns on statement logging and slow-statement
    /// warnings so leaked or stuck connections show up in the logs.
    pub async fn connect(settings: &AppSettings) -> Result<Self, PoolError> {
        let mut options: PgConnectOptions =
            settings.database_url.parse().map_err(PoolError::Init)?;
        options = options
            .username(&settings.database_username)
            .password(&settings.database_password);

        if settings.environment.is_development() {
            options = options
                .log_statements(log::LevelFilter::Debug)
                .log_slow_statements(log::LevelFilter::Warn, SLOW_STATEMENT_THRESHOLD);
        }

        log::info!(
            "Initializing database pool: {} (max {} connections)",
            settings.database_url,
            settings.database_pool_size
        );

        let pool = PgPoolOptions::new()
            // Maximum concurrent connections
            .max_connections(settings.database_pool_size)
            .min_connections(min_idle(settings.database_pool_size))
            // Timeout waiting for connection from pool
            .acquire_timeout(Duration::from_millis(settings.database_connection_timeout_ms))
            // Connection idle timeout
            .idle_timeout(POOL_TIME_QUANTUM * 10)
            // Connection lifetime before recycle
            .max_lifetime(POOL_TIME_QUANTUM * 30)
            // Validate connections on the way out of the pool
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(PoolError::Init)?;

        // Verify connection works
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(PoolError::Init)?;

        let keepalive = spawn_keepalive(pool.clone(), POOL_TIME_QUANTUM * 5);

        log::info!("Database pool initialized successfully");

        Ok(Self {
            pool,
            settings: settings.clone(),
            waiting: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            keepalive,
        })
    }

    /// Borrow a connection from the pool.
    /// Waits up to the configured connection timeout; failures are logged and
    /// returned to the caller, never swallowed.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let _waiting = WaitingGuard::enter(&self.waiting);
        match self.pool.acquire().await {
            Ok(conn) => Ok(conn),
            Err(sqlx::Error::PoolTimedOut) => {
                log::error!(
                    "Timed out after {}ms waiting for a connection",
                    self.settings.database_connection_timeout_ms
                );
                Err(PoolError::AcquireTimeout)
            }
            Err(sqlx::Error::PoolClosed) => {
                log::error!("Connection requested from a closed pool");
                Err(PoolError::Closed)
            }
            Err(e) => {
                log::error!("Failed to acquire connection from pool: {}", e);
                Err(PoolError::Acquire(e))
            }
        }
    }

    /// The underlying pool handle, for code that runs its own queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The configuration snapshot this pool was built with
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Check the pool by acquiring and validating one connection.
    /// Returns false on any failure within the health deadline.
    pub async fn is_healthy(&self) -> bool {
        let check = async {
            let mut conn = self.pool.acquire().await?;
            sqlx::query("SELECT 1").execute(&mut *conn).await?;
            Ok::<(), sqlx::Error>(())
        };

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, check).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::warn!("Health check failed: {}", e);
                false
            }
            Err(_) => {
                log::warn!("Health check timed out after {:?}", HEALTH_CHECK_TIMEOUT);
                false
            }
        }
    }

    /// Snapshot of current pool usage
    pub fn stats(&self) -> PoolStats {
        let total = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        PoolStats {
            total,
            active: total.saturating_sub(idle),
            idle,
            waiting: self.waiting.load(Ordering::SeqCst),
        }
    }

    /// Close the pool and release all connections. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        log::info!("Shutting down database connection pool...");
        self.keepalive.abort();
        self.pool.close().await;
        log::info!("Database connection pool closed");
    }

    /// True once shutdown has completed (or begun)
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.pool.is_closed()
    }
}

/// Tracks a caller through the waiting count for the duration of an acquire,
/// including cancellation part-way through
struct WaitingGuard<'a>(&'a AtomicU32);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Periodic ping that keeps idle connections warm between requests
fn spawn_keepalive(pool: PgPool, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick fires immediately; skip it
        interval.tick().await;

        loop {
            interval.tick().await;
            if pool.is_closed() {
                break;
            }
            if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
                log::warn!("Keepalive ping failed: {}", e);
            }
        }
    })
}

/// Once-only construction point for the process-wide pool.
/// DOCUMENTATION: Built in main and threaded through by reference instead of
/// living in a global. Concurrent first-time initializers race safely to a
/// single PoolManager; later calls get that same handle back regardless of
/// the settings they pass.
pub struct Database {
    manager: OnceCell<Arc<PoolManager>>,
}

impl Database {
    pub fn new() -> Self {
        Self {
            manager: OnceCell::new(),
        }
    }

    /// Build the pool on first call; every later call returns the existing
    /// handle without reinitializing. A failed first attempt leaves the
    /// Database uninitialized so startup can retry or abort.
    pub async fn initialize(&self, settings: &AppSettings) -> Result<Arc<PoolManager>, PoolError> {
        self.manager
            .get_or_try_init(|| async { PoolManager::connect(settings).await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The live handle, or NotInitialized if no initialize call has succeeded
    pub fn handle(&self) -> Result<Arc<PoolManager>, PoolError> {
        self.manager.get().cloned().ok_or(PoolError::NotInitialized)
    }

    /// Close the pool if it was ever opened
    pub async fn shutdown(&self) {
        if let Some(manager) = self.manager.get() {
            manager.shutdown().await;
        }
    }

    /// True when never initialized or after shutdown
    pub fn is_closed(&self) -> bool {
        self.manager.get().map_or(true, |m| m.is_closed())
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
