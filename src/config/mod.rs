// Start of file: /src/config/mod.rs

/*
* Configuration loaded from the environment, and the state handed to request handlers.
*/

pub mod environment;
pub mod state;

pub use environment::EnvironmentVariables;
pub use state::AppState;

// End of file: /src/config/mod.rs
