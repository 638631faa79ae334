// Startup sequencing and the single shutdown routine every trigger converges on

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::trigger::{Trigger, TriggerReceiver, EXIT_FAILURE};
use super::{DataStore, Listener, ListenerHandle, StoreOptions};

/// Everything the manager needs from configuration.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    pub database_url: String,
    pub store_options: StoreOptions,
    pub port: u16,
    /// Upper bound for each close step. `None` waits indefinitely.
    pub shutdown_timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database connection error: {0:#}")]
    Connect(anyhow::Error),
    #[error("Failed to start listener: {0:#}")]
    Listen(anyhow::Error),
    #[error("Shutdown began before the listener was registered")]
    Aborted,
}

enum Startup {
    Interrupted(Trigger),
    Finished(Result<SocketAddr, StartupError>),
}

/// Owns the store, the listener factory and the running listener, if any.
///
/// Built once in `main`; tests build as many independent instances as they need.
pub struct LifecycleManager<S, L: Listener> {
    store: S,
    listener: L,
    config: LifecycleConfig,
    // None until the listener binds, and again once shutdown has closed it.
    server: Mutex<Option<L::Handle>>,
    shutting_down: AtomicBool,
}

impl<S, L> LifecycleManager<S, L>
where
    S: DataStore,
    L: Listener,
{
    pub fn new(store: S, listener: L, config: LifecycleConfig) -> Self {
        Self {
            store,
            listener,
            config,
            server: Mutex::new(None),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Connects the store, then binds the listener on the configured port.
    /// The listener is never started if the connection fails.
    pub async fn start(&self) -> Result<SocketAddr, StartupError> {
        self.store
            .connect(&self.config.database_url, &self.config.store_options)
            .await
            .map_err(StartupError::Connect)?;
        info!("Connected to database");

        let handle: L::Handle = self
            .listener
            .listen(self.config.port)
            .await
            .map_err(StartupError::Listen)?;
        let addr: SocketAddr = handle.local_addr();

        {
            let mut server = self.server.lock().await;
            if !self.shutting_down.load(Ordering::SeqCst) {
                *server = Some(handle);
                info!(instance = %instance_name(), "Listening to port {}", addr.port());
                return Ok(addr);
            }
        }

        if let Err(err) = handle.close().await {
            error!("Error while closing late listener: {:#}", err);
        }
        Err(StartupError::Aborted)
    }

    /// Address of the active listener, if there is one.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(ListenerHandle::local_addr)
    }

    /// Runs startup, waits for a trigger and shuts down. Returns the process exit status.
    ///
    /// A trigger that arrives while startup is still in flight aborts it. A failed
    /// connection exits with status 1 straight away; a failed bind is handled as a fault.
    pub async fn run(&self, triggers: &mut TriggerReceiver) -> u8 {
        let startup: Startup = tokio::select! {
            biased;
            trigger = triggers.recv() => Startup::Interrupted(trigger),
            started = self.start() => Startup::Finished(started),
        };

        let trigger: Trigger = match startup {
            Startup::Interrupted(trigger) => trigger,
            Startup::Finished(Ok(_)) => triggers.recv().await,
            Startup::Finished(Err(StartupError::Connect(err))) => {
                error!("Database connection error: {:#}", err);
                return EXIT_FAILURE;
            }
            Startup::Finished(Err(err)) => Trigger::Fault(err.to_string()),
        };

        self.shutdown(&trigger)
            .await
            .unwrap_or_else(|| trigger.exit_code())
    }

    /// Closes the listener (if active) and then the store.
    ///
    /// Returns the exit status for `trigger`, or `None` if another shutdown is
    /// already running, in which case nothing is touched.
    pub async fn shutdown(&self, trigger: &Trigger) -> Option<u8> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            warn!("Shutdown already in progress, ignoring {}", trigger);
            return None;
        }

        trigger.log();

        let server: Option<L::Handle> = self.server.lock().await.take();
        if let Some(handle) = server {
            match self.bounded(handle.close()).await {
                Some(Ok(())) => info!("Server closed"),
                Some(Err(err)) => error!("Error while closing server: {:#}", err),
                None => warn!("Server did not drain in time, closing database anyway"),
            }
        }

        match self.bounded(self.store.close(false)).await {
            Some(Ok(())) => info!("Database connection closed"),
            Some(Err(err)) => error!("Error while closing database connection: {:#}", err),
            None => {
                warn!("Database did not close in time, forcing");
                match self.store.close(true).await {
                    Ok(()) => info!("Database connection closed"),
                    Err(err) => error!("Error while forcing database close: {:#}", err),
                }
            }
        }

        Some(trigger.exit_code())
    }

    async fn bounded<F: Future>(&self, step: F) -> Option<F::Output> {
        match self.config.shutdown_timeout {
            Some(limit) => tokio::time::timeout(limit, step).await.ok(),
            None => Some(step.await),
        }
    }
}

fn instance_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}
