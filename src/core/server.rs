// Application server configuration and setup

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    error_handling::HandleErrorLayer, extract::DefaultBodyLimit, middleware::from_fn, serve,
    Router,
};
use listenfd::ListenFd;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tracing::debug;

use crate::api::{fallback::fallback_handler, health::health_routes};
use crate::config::state::AppState;
use crate::lifecycle::{Listener, ListenerHandle, TriggerSender};
use crate::utils::{error_handler::handle_global_error, response_handler::response_wrapper};

/// Creates and configures the application router with all middleware layers
pub fn create_app(state: AppState) -> Router {
    let env = &state.environment;

    Router::new()
        .merge(health_routes())
        .fallback(fallback_handler)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(response_wrapper))
                .layer(HandleErrorLayer::new(handle_global_error))
                .layer(TimeoutLayer::new(Duration::from_secs(env.default_timeout_seconds)))
                .layer(DefaultBodyLimit::max(env.max_request_body_size)),
        )
        .with_state(state)
}

/// Takes a socket passed in by the environment (systemfd, socket activation) or binds
/// `host:port`
pub async fn setup_listener(host: &str, port: u16) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd
        .take_tcp_listener(0)
        .context("Failed to take inherited socket")?
    {
        Some(std_listener) => {
            debug!("Using inherited TCP socket");
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?,
    };

    Ok(listener)
}

/// Starts the axum app on demand. A serve loop that fails is reported as an
/// unhandled rejection.
pub struct HttpListener {
    host: String,
    app: Router,
    triggers: TriggerSender,
}

impl HttpListener {
    pub fn new(host: impl Into<String>, app: Router, triggers: TriggerSender) -> Self {
        Self {
            host: host.into(),
            app,
            triggers,
        }
    }
}

#[async_trait]
impl Listener for HttpListener {
    type Handle = ServerHandle;

    async fn listen(&self, port: u16) -> Result<ServerHandle> {
        let listener: TcpListener = setup_listener(&self.host, port).await?;
        let addr: SocketAddr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        let (shutdown, stopped) = oneshot::channel::<()>();
        let app: Router = self.app.clone();

        let task: JoinHandle<()> = self.triggers.supervise("HTTP server", async move {
            serve(listener, app)
                .with_graceful_shutdown(async move {
                    // Sender sent or dropped: either way stop accepting
                    let _ = stopped.await;
                })
                .await
                .context("HTTP server stopped unexpectedly")
        });

        Ok(ServerHandle {
            addr,
            shutdown,
            task,
        })
    }
}

/// Handle to a running axum server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

#[async_trait]
impl ListenerHandle for ServerHandle {
    fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    async fn close(self) -> Result<()> {
        // The serve loop may already be gone if it failed; nothing to signal then
        let _ = self.shutdown.send(());
        self.task.await.context("HTTP server task panicked")
    }
}
