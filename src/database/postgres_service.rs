// =============================================================================
// DATABASE SERVICE - PostgreSQL pool as the process data store
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Executor, PgPool};
use tokio::sync::RwLock;
use tracing::{debug, info, log::LevelFilter};

use crate::lifecycle::{DataStore, StoreOptions};

// =============================================================================
// DATABASE SERVICE
// =============================================================================

/// Database service managing a single PostgreSQL connection pool.
/// The pool is created by `connect` and released by `close`.
#[derive(Clone, Debug, Default)]
pub struct DatabaseService {
    pool: Arc<RwLock<Option<PgPool>>>,
}

impl DatabaseService {
    /// Creates a new DatabaseService instance.
    /// Note: no connection is made until `connect()` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an open pool is held.
    pub async fn is_connected(&self) -> bool {
        self.pool
            .read()
            .await
            .as_ref()
            .is_some_and(|pool| !pool.is_closed())
    }

    /// Returns a handle to the connection pool.
    /// Errors if the pool has not been connected or was already closed.
    pub async fn get_pool(&self) -> Result<PgPool> {
        self.pool
            .read()
            .await
            .as_ref()
            .filter(|pool| !pool.is_closed())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Database pool not connected"))
    }
}

#[async_trait]
impl DataStore for DatabaseService {
    async fn connect(&self, url: &str, options: &StoreOptions) -> Result<()> {
        info!("Connecting to database...");

        let connect_options: PgConnectOptions = create_connect_options(url, options)?;
        let pool: PgPool = create_pool_options(options)
            .connect_with(connect_options)
            .await
            .context("Failed to create database connection pool")?;

        // Round-trip once so a reachable but misconfigured server fails here
        pool.execute("SELECT 1")
            .await
            .context("Database did not answer the connection check")?;

        *self.pool.write().await = Some(pool);
        Ok(())
    }

    async fn close(&self, force: bool) -> Result<()> {
        if force {
            let Some(pool) = self.pool.write().await.take() else {
                debug!("Database pool was not connected, nothing to close");
                return Ok(());
            };

            // Release our handle without waiting for checked-out connections.
            // Closing carries on in the background and drops them as they come back.
            tokio::spawn(async move {
                pool.close().await;
                debug!("Forced database close finished");
            });
            return Ok(());
        }

        // The pool stays in its slot until it has closed, so a caller that gives up
        // waiting can still force it.
        let Some(pool) = self.pool.read().await.as_ref().cloned() else {
            debug!("Database pool was not connected, nothing to close");
            return Ok(());
        };

        pool.close().await;
        self.pool.write().await.take();
        Ok(())
    }
}

// =============================================================================
// INTERNAL HELPERS
// =============================================================================

/// Parses the URL and applies the options the driver takes per connection
fn create_connect_options(url: &str, options: &StoreOptions) -> Result<PgConnectOptions> {
    let connect_options: PgConnectOptions = PgConnectOptions::from_str(url)
        .context("Invalid DATABASE_URL")?
        .application_name(&options.application_name)
        .options([("timezone", "UTC")])
        .log_statements(LevelFilter::Debug);

    Ok(connect_options)
}

/// Builds pool options from the store options
fn create_pool_options(options: &StoreOptions) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(options.max_connections)
        .min_connections(options.min_connections)
        .acquire_timeout(options.acquire_timeout)
        .idle_timeout(options.idle_timeout)
}
