// Start of file: /src/core/logging.rs

use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::fmt::format::FmtSpan;

const DEFAULT_FILTER: &str = "lifecycle_server=info,tower_http=info,sqlx=warn";

// Initialize the tracing subscriber, honoring RUST_LOG when it is set
pub fn init_tracing() {
    let env_filter: EnvFilter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: a subscriber installed earlier (e.g. by a test harness) wins
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::FULL)
        .try_init();
}

// End of file: /src/core/logging.rs
