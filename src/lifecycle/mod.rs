//! Process lifecycle: connect the store, start listening, shut down in order.
//!
//! ```text
//! Startup:
//!     connect(url, options) → listen(port) → wait for a trigger
//!
//! Shutdown (any trigger):
//!     close listener (drain) → close store (graceful) → exit status of the trigger
//! ```
//!
//! The store and the listener are reached through the [`DataStore`] and [`Listener`]
//! traits so the manager can be driven against recording doubles in tests.

pub mod manager;
pub mod signals;
pub mod trigger;

use std::net::SocketAddr;

use anyhow::Result;
use async_trait::async_trait;

pub use manager::{LifecycleConfig, LifecycleManager, StartupError};
pub use trigger::{Trigger, TriggerReceiver, TriggerSender, EXIT_FAILURE, EXIT_SUCCESS};

/// Options handed through to the store driver untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: std::time::Duration,
    pub idle_timeout: Option<std::time::Duration>,
    pub application_name: String,
}

/// The persistent data store the process depends on.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Opens the connection. Called at most once per process.
    async fn connect(&self, url: &str, options: &StoreOptions) -> Result<()>;

    /// Closes the connection. With `force == false` in-flight operations are allowed to
    /// finish. Closing a store that never connected is a no-op.
    async fn close(&self, force: bool) -> Result<()>;
}

/// Something that can bind a port and start accepting connections.
#[async_trait]
pub trait Listener: Send + Sync {
    type Handle: ListenerHandle;

    async fn listen(&self, port: u16) -> Result<Self::Handle>;
}

/// A running listener.
#[async_trait]
pub trait ListenerHandle: Send + Sync + 'static {
    fn local_addr(&self) -> SocketAddr;

    /// Stops accepting new connections and waits for in-flight ones to drain.
    async fn close(self) -> Result<()>;
}
