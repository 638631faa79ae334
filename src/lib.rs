// Library root for the lifecycle-managed Axum server

pub mod api;
pub mod config;
pub mod core;
pub mod database;
pub mod lifecycle;
pub mod utils;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::core::server::{create_app, HttpListener};
pub use crate::database::DatabaseService;
pub use crate::lifecycle::{LifecycleManager, Trigger};
