//! Deployment script for the escrow validator
//!
//! Checks the deployer wallet, derives the validator's script address, prints
//! a summary and saves `deployment-info.json`. Each step must succeed before
//! the next one runs; nothing is written to the record on failure.

use std::path::{Path, PathBuf};
use std::time::Instant;

use helpers::config::{ConfigOverrides, DeployConfig, Network};
use helpers::error::Result;
use helpers::logging::{operation_complete, operation_error, operation_start};
use helpers::output::Display;
use clap::Parser;
use helpers::{
    calculate_script_address, get_wallet_info, CardanoCli, DeploymentRecord, IndexerClient,
    ScriptAddress, WalletInfo,
};
use tracing::debug;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

#[derive(Parser, Debug)]
#[command(name = "deploy_validator")]
#[command(about = "Derive and record the script address of the escrow validator")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./deploy.toml when present)
    #[arg(long, env = "DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing payment.addr
    #[arg(long, env = "DEPLOY_KEY_DIR")]
    pub key_dir: Option<PathBuf>,

    /// Directory containing plutus.json
    #[arg(long, env = "DEPLOY_CONTRACT_DIR")]
    pub contract_dir: Option<PathBuf>,

    /// Target network: mainnet, preprod or preview
    #[arg(long, env = "DEPLOY_NETWORK")]
    pub network: Option<Network>,

    /// Indexer base URL (defaults to the public Koios endpoint of the network)
    #[arg(long, env = "DEPLOY_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// cardano-cli binary to invoke
    #[arg(long, env = "DEPLOY_CARDANO_CLI")]
    pub cardano_cli: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "DEPLOY_DEBUG")]
    pub debug: bool,
}

impl Cli {
    /// Flag and environment values to lay over the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            key_dir: self.key_dir.clone(),
            contract_dir: self.contract_dir.clone(),
            network: self.network,
            api_base_url: self.api_base_url.clone(),
            cardano_cli: self.cardano_cli.clone(),
        }
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub wallet: WalletInfo,
    pub script: ScriptAddress,
    pub record: DeploymentRecord,
    pub record_path: PathBuf,
}

/// Resolve the run configuration.
///
/// An explicit `config_path` must exist. Without one, `deploy.toml` in the
/// working directory is used if present, otherwise the built-in defaults.
/// `overrides` are applied last.
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<DeployConfig> {
    resolve_config_in(Path::new("."), config_path, overrides)
}

/// [`resolve_config`] with `working_dir` searched for `deploy.toml`.
pub fn resolve_config_in(
    working_dir: &Path,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<DeployConfig> {
    let fallback = working_dir.join(DEFAULT_CONFIG_FILE);
    let mut config = match config_path {
        Some(path) => DeployConfig::load(path)?,
        None if fallback.exists() => DeployConfig::load(&fallback)?,
        None => DeployConfig::default(),
    };
    config.apply_overrides(overrides)?;
    debug!(?config, "Resolved deployment configuration");
    Ok(config)
}

/// Labeled lines of the deployment summary, in display order.
pub fn summary_lines(
    wallet: &WalletInfo,
    script: &ScriptAddress,
    network: Network,
) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Network", network.display_name().to_string()),
        (
            "Validator",
            script.validator.plutus_version.validator_type().to_string(),
        ),
        ("Script Size", format!("{} bytes", script.validator.size_bytes())),
        ("Script File", script.script_file.display().to_string()),
        ("Your Balance", format!("{} ADA", wallet.balance_ada())),
    ];
    if let Some(hash) = &script.validator.blueprint_hash {
        lines.push(("Blueprint hash", hash.clone()));
    }
    lines
}

fn reported<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        operation_error(operation, err);
    }
    result
}

/// Run the full deployment workflow once.
pub async fn run_deployment(config: &DeployConfig) -> Result<DeploymentOutcome> {
    let started = Instant::now();
    operation_start("deploy", config.network.as_str());
    Display::banner(&format!("🚀 {} Deployment", config.contract_name));

    Display::step("Checking wallet...");
    let indexer = reported("Wallet check", IndexerClient::from_config(config))?;
    let wallet = reported("Wallet check", get_wallet_info(config, &indexer).await)?;
    Display::success(&format!("Wallet: {}", wallet.address));
    Display::success(&format!("Balance: {} ADA", wallet.balance_ada()));
    Display::success(&format!("UTXOs: {}", wallet.utxo_count()));
    println!();

    Display::step("Calculating script address...");
    let cli = CardanoCli::from_config(config);
    let script = reported(
        "Script address calculation",
        calculate_script_address(config, &cli).await,
    )?;
    Display::success(&format!("Script address: {}", script.address));

    Display::section("📋 Deployment Summary:");
    for (label, value) in summary_lines(&wallet, &script, config.network) {
        Display::kv(label, &value);
    }
    println!();
    Display::success("CONTRACT VALIDATION SUCCESSFUL!");

    Display::section("📍 Script Details:");
    Display::kv("Address", &script.address);
    Display::line("Can receive funds at this address");
    Display::line("Funds locked will be governed by escrow rules");

    let record = DeploymentRecord::new(
        &script.address,
        &script.validator,
        config.network,
        &wallet.address,
        &config.contract_name,
    );
    let record_path = config.record_path();
    reported("Saving deployment record", record.save(&record_path))?;
    println!();
    Display::success(&format!(
        "Deployment info saved to: {}",
        record_path.display()
    ));

    print_next_steps(config, &wallet.address, &script.address);
    operation_complete("deploy", started.elapsed().as_millis() as u64);

    Ok(DeploymentOutcome {
        wallet,
        script,
        record,
        record_path,
    })
}

fn print_next_steps(config: &DeployConfig, wallet_address: &str, script_address: &str) {
    println!();
    Display::success(&format!("🎉 {} is ready for use!", config.contract_name));
    Display::next_steps(&[
        "Share the script address with users",
        "Users can create escrows by sending ADA to the script address with proper datum",
        "Approvers can release funds by spending from the script with approval redeemer",
        "Creator can cancel escrows (if no approvals) with cancel redeemer",
    ]);
    println!();
    let explorer = config.network.explorer_base_url();
    Display::line(&format!("🔍 Explore your wallet: {explorer}/address/{wallet_address}"));
    Display::line(&format!(
        "🔍 Monitor script address: {explorer}/address/{script_address}"
    ));
}
