//! Diagnostic logging. Normal output goes to stdout and warnings about targets are
//! printed with utils::warn, this is for seeing what the core file parser is doing.
use std::sync::Once;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// With debug the level is forced to debug, otherwise RUST_LOG is used (defaulting
/// to warn). Subsequent calls are ignored.
pub fn init_tracing(debug: bool) {
    INIT.call_once(|| {
        let env_filter = if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        };

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();

        debug!("pargs tracing initialized");
    });
}
