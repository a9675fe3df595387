use clap::Parser;
use helpers::logging::{init_logging, operation_error};
use scripts::{resolve_config, run_deployment, Cli};
use tracing::warn;

#[tokio::main]
async fn main() {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = match resolve_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(err) => {
            operation_error("Loading configuration", &err);
            return;
        }
    };

    // Failures were already reported; the process still exits 0.
    if let Err(err) = run_deployment(&config).await {
        warn!(error = %err, "Deployment aborted, no record written");
    }
}
