// Start of file: src/main.rs

use std::process::ExitCode;

use tracing::error;

use lifecycle_server::config::{AppState, EnvironmentVariables};
use lifecycle_server::core::{logging::init_tracing, server::{create_app, HttpListener}};
use lifecycle_server::database::DatabaseService;
use lifecycle_server::lifecycle::{signals, trigger, LifecycleManager, EXIT_FAILURE};

#[tokio::main]
async fn main() -> ExitCode {
    // set up logging
    init_tracing();

    let environment: EnvironmentVariables = match EnvironmentVariables::load() {
        Ok(environment) => environment,
        Err(err) => {
            error!("Failed to load configuration: {:#}", err);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    // Every trigger source feeds the same channel; the manager acts on the first
    let (trigger_tx, mut triggers) = trigger::channel();
    signals::install_panic_hook(trigger_tx.clone());
    if let Err(err) = signals::install_signal_handlers(&trigger_tx) {
        error!("{:#}", err);
        return ExitCode::from(EXIT_FAILURE);
    }

    let database: DatabaseService = DatabaseService::new();
    let config = environment.lifecycle_config();
    let state: AppState = AppState::new(environment, database.clone());

    let listener: HttpListener = HttpListener::new(
        state.environment.host.to_string(),
        create_app(state),
        trigger_tx,
    );

    let manager = LifecycleManager::new(database, listener, config);
    ExitCode::from(manager.run(&mut triggers).await)
}

// End of file: src/main.rs
