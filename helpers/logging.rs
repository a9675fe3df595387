//! Logging setup and operation-level log helpers
//!
//! Operator-facing messages are printed through [`Display`]; the helpers here
//! pair them with structured `tracing` events so a `--debug` run shows the
//! same story with context attached.

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::DeployError;
use crate::output::Display;

const DEFAULT_FILTER: &str = "deploy_validator=info,helpers=info,scripts=info,warn";
const DEBUG_FILTER: &str = "deploy_validator=debug,helpers=debug,scripts=debug,info";

/// Install the global subscriber. `RUST_LOG` wins over the defaults.
pub fn init_logging(debug: bool) {
    let fallback = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (e.g. from tests) is not an error worth reporting.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(env_filter)
        .try_init();
}

pub fn operation_start(operation: &str, context: &str) {
    info!(operation, context, "Operation started");
}

pub fn operation_complete(operation: &str, duration_ms: u64) {
    info!(operation, duration_ms, "Operation completed");
}

/// Report a failed step to the operator and the log.
pub fn operation_error(operation: &str, err: &DeployError) {
    Display::error(&format!("{operation} failed: {err}"));
    error!(
        operation,
        error = %err,
        transient = err.is_transient(),
        "Operation failed"
    );
}
