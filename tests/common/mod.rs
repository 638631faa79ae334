//! tests/common/mod.rs
//! Shared helpers: a recording data store and a manager wired to the real
//! axum listener on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;

use lifecycle_server::config::{AppState, EnvironmentVariables};
use lifecycle_server::core::server::{create_app, HttpListener};
use lifecycle_server::database::DatabaseService;
use lifecycle_server::lifecycle::{
    trigger, DataStore, LifecycleConfig, LifecycleManager, StoreOptions, TriggerReceiver,
    TriggerSender,
};

pub type Manager = LifecycleManager<RecordingStore, HttpListener>;

/// Ordered log of what happened, shared between the store and test routes.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Stands in for PostgreSQL.
pub struct RecordingStore {
    pub events: Events,
}

#[async_trait]
impl DataStore for RecordingStore {
    async fn connect(&self, url: &str, _options: &StoreOptions) -> Result<()> {
        self.events.push(format!("store connected to {url}"));
        Ok(())
    }

    async fn close(&self, force: bool) -> Result<()> {
        self.events.push(format!("store closed (force: {force})"));
        Ok(())
    }
}

pub fn test_environment() -> EnvironmentVariables {
    EnvironmentVariables::from_vars(HashMap::from([
        ("ENVIRONMENT".to_string(), "test".to_string()),
        ("PORT".to_string(), "0".to_string()),
        ("DATABASE_URL".to_string(), "postgres://test@localhost/test".to_string()),
        ("SHUTDOWN_TIMEOUT_SECONDS".to_string(), "5".to_string()),
    ]))
    .expect("test environment is valid")
}

/// The production router backed by a database that is never connected.
pub fn production_app() -> Router {
    let state: AppState = AppState::new(test_environment(), DatabaseService::new());
    create_app(state)
}

pub struct Harness {
    pub manager: Arc<Manager>,
    pub triggers: TriggerSender,
    pub receiver: TriggerReceiver,
    pub events: Events,
}

pub fn harness(app: Router, port: u16) -> Harness {
    harness_with_events(app, port, Events::default())
}

pub fn harness_with_events(app: Router, port: u16, events: Events) -> Harness {
    let (triggers, receiver) = trigger::channel();
    let mut config: LifecycleConfig = test_environment().lifecycle_config();
    config.port = port;

    let store = RecordingStore {
        events: events.clone(),
    };
    let listener = HttpListener::new("127.0.0.1", app, triggers.clone());

    Harness {
        manager: Arc::new(LifecycleManager::new(store, listener, config)),
        triggers,
        receiver,
        events,
    }
}

/// Polls until the manager reports an active listener.
pub async fn wait_until_listening(manager: &Manager) -> SocketAddr {
    for _ in 0..400 {
        if let Some(addr) = manager.local_addr().await {
            return addr;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("listener never became active");
}
