// Application state shared with the HTTP handlers

use std::sync::Arc;

use crate::config::environment::EnvironmentVariables;
use crate::database::DatabaseService;

#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub database: DatabaseService,
}

impl AppState {
    /// Builds the state from loaded configuration and the (not yet connected) database.
    /// The lifecycle manager connects the same `DatabaseService` before the
    /// listener is started, so handlers always see the live pool.
    pub fn new(environment: EnvironmentVariables, database: DatabaseService) -> Self {
        Self {
            environment: Arc::new(environment),
            database,
        }
    }
}
