//! Deployment configuration
//!
//! Key locations, the target network and the indexer endpoint are supplied at
//! startup rather than baked into the script. Values come from an optional
//! TOML file and are then overlaid with command-line or environment
//! overrides (see [`ConfigOverrides`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::retry::RetryPolicy;

/// Name of the address file inside the key directory.
pub const ADDRESS_FILE: &str = "payment.addr";
/// Name of the compiled blueprint inside the contract directory.
pub const ARTIFACT_FILE: &str = "plutus.json";
/// Name of the script text envelope written for `cardano-cli`.
pub const SCRIPT_FILE: &str = "validator-script.plutus";

const DEFAULT_CONTRACT_DIR: &str = "contracts/escrow-aiken";
const DEFAULT_KEY_DIR_NAME: &str = "cardano-mainnet-keys";
const DEFAULT_CARDANO_CLI: &str = "cardano-cli";
const DEFAULT_CONTRACT_NAME: &str = "CardanoScrow Escrow Validator";
const DEFAULT_OUTPUT_FILE: &str = "deployment-info.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Cardano network the validator is deployed to.
///
/// Config files and command-line flags share the same case-insensitive parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Network {
    #[default]
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Preprod => "preprod",
            Network::Preview => "preview",
        }
    }

    /// Human-readable name used in the deployment summary.
    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Mainnet => "Cardano Mainnet",
            Network::Preprod => "Cardano Preprod",
            Network::Preview => "Cardano Preview",
        }
    }

    /// Network selector flags understood by `cardano-cli`.
    pub fn cli_args(&self) -> Vec<String> {
        match self {
            Network::Mainnet => vec!["--mainnet".to_string()],
            Network::Preprod => vec!["--testnet-magic".to_string(), "1".to_string()],
            Network::Preview => vec!["--testnet-magic".to_string(), "2".to_string()],
        }
    }

    /// Public Koios endpoint for this network.
    pub fn default_api_base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.koios.rest/api/v1",
            Network::Preprod => "https://preprod.koios.rest/api/v1",
            Network::Preview => "https://preview.koios.rest/api/v1",
        }
    }

    pub fn explorer_base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://cardanoscan.io",
            Network::Preprod => "https://preprod.cardanoscan.io",
            Network::Preview => "https://preview.cardanoscan.io",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "preprod" => Ok(Network::Preprod),
            "preview" => Ok(Network::Preview),
            other => Err(DeployError::InvalidConfig(format!(
                "unknown network '{other}', expected mainnet, preprod or preview"
            ))),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = DeployError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Plutus language version of the compiled validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PlutusVersion {
    V1,
    #[default]
    V2,
    V3,
}

impl PlutusVersion {
    /// Type tag of the text envelope consumed by `cardano-cli`.
    pub fn script_type(&self) -> &'static str {
        match self {
            PlutusVersion::V1 => "PlutusScriptV1",
            PlutusVersion::V2 => "PlutusScriptV2",
            PlutusVersion::V3 => "PlutusScriptV3",
        }
    }

    /// Label stored in the deployment record.
    pub fn validator_type(&self) -> &'static str {
        match self {
            PlutusVersion::V1 => "PlutusV1",
            PlutusVersion::V2 => "PlutusV2",
            PlutusVersion::V3 => "PlutusV3",
        }
    }
}

impl FromStr for PlutusVersion {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "v1" | "plutusv1" => Ok(PlutusVersion::V1),
            "v2" | "plutusv2" => Ok(PlutusVersion::V2),
            "v3" | "plutusv3" => Ok(PlutusVersion::V3),
            other => Err(DeployError::InvalidConfig(format!(
                "unknown plutus version '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for PlutusVersion {
    type Error = DeployError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Configuration for a single deployment run
#[derive(Debug, Clone, PartialEq, Deserialize)]
// Disallow unknown fields so typos in the config file are reported.
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Directory holding `payment.addr`.
    pub key_dir: PathBuf,
    /// Directory holding `plutus.json`; generated files are written here too.
    pub contract_dir: PathBuf,
    pub network: Network,
    /// Indexer base URL. Falls back to the public Koios endpoint of `network`.
    pub api_base_url: Option<String>,
    /// Path or name of the `cardano-cli` binary.
    pub cardano_cli: String,
    pub contract_name: String,
    /// Select a validator by blueprint title instead of taking the first one.
    pub validator_title: Option<String>,
    /// Used when the blueprint preamble does not state a Plutus version.
    pub default_plutus_version: PlutusVersion,
    /// File name of the deployment record inside `contract_dir`.
    pub output_file: String,
    pub http_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            contract_dir: PathBuf::from(DEFAULT_CONTRACT_DIR),
            network: Network::default(),
            api_base_url: None,
            cardano_cli: DEFAULT_CARDANO_CLI.to_string(),
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            validator_title: None,
            default_plutus_version: PlutusVersion::default(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_key_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_KEY_DIR_NAME)
}

impl DeployConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeployError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "Loaded deployment configuration");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DeployConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line or environment values on top of this config.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(key_dir) = overrides.key_dir {
            self.key_dir = key_dir;
        }
        if let Some(contract_dir) = overrides.contract_dir {
            self.contract_dir = contract_dir;
        }
        if let Some(network) = overrides.network {
            self.network = network;
        }
        if let Some(url) = overrides.api_base_url {
            self.api_base_url = Some(url);
        }
        if let Some(cli) = overrides.cardano_cli {
            self.cardano_cli = cli;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DeployError::InvalidConfig(format!(
                    "api_base_url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.cardano_cli.trim().is_empty() {
            return Err(DeployError::InvalidConfig(
                "cardano_cli must not be empty".to_string(),
            ));
        }
        if self.output_file.trim().is_empty() {
            return Err(DeployError::InvalidConfig(
                "output_file must not be empty".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 || self.command_timeout_secs == 0 {
            return Err(DeployError::InvalidConfig(
                "timeouts must be at least one second".to_string(),
            ));
        }
        self.retry.validate()
    }

    /// Indexer base URL without a trailing slash.
    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_api_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn address_file(&self) -> PathBuf {
        self.key_dir.join(ADDRESS_FILE)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.contract_dir.join(ARTIFACT_FILE)
    }

    pub fn script_file(&self) -> PathBuf {
        self.contract_dir.join(SCRIPT_FILE)
    }

    pub fn record_path(&self) -> PathBuf {
        self.contract_dir.join(&self.output_file)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub key_dir: Option<PathBuf>,
    pub contract_dir: Option<PathBuf>,
    pub network: Option<Network>,
    pub api_base_url: Option<String>,
    pub cardano_cli: Option<String>,
}
