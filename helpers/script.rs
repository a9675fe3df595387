//! Script-address calculator
//!
//! Loads the compiled validator from the Aiken blueprint (`plutus.json`),
//! writes the text envelope `cardano-cli` expects, and asks `cardano-cli` for
//! the script address on the configured network.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{DeployConfig, Network, PlutusVersion};
use crate::error::{DeployError, Result};
use crate::retry::RetryPolicy;

/// Number of hex characters kept as the record's validator identifier.
pub const VALIDATOR_ID_HEX_LEN: usize = 56;

#[derive(Debug, Deserialize)]
struct Blueprint {
    #[serde(default)]
    preamble: Option<Preamble>,
    #[serde(default)]
    validators: Vec<BlueprintValidator>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Preamble {
    #[serde(default)]
    plutus_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlueprintValidator {
    #[serde(default)]
    title: Option<String>,
    compiled_code: String,
    #[serde(default)]
    hash: Option<String>,
}

/// A compiled validator selected from the blueprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub title: Option<String>,
    /// Compiled bytecode, hex encoded.
    pub compiled_code: String,
    /// Script hash as reported by the blueprint, if any.
    pub blueprint_hash: Option<String>,
    pub plutus_version: PlutusVersion,
}

impl Validator {
    pub fn size_bytes(&self) -> usize {
        script_size_bytes(&self.compiled_code)
    }

    pub fn id_prefix(&self) -> &str {
        validator_id_prefix(&self.compiled_code)
    }
}

/// Size in bytes of hex-encoded bytecode.
pub fn script_size_bytes(compiled_code: &str) -> usize {
    compiled_code.len() / 2
}

/// Leading hex of the bytecode used as the record's validator identifier.
///
/// This is a prefix of the code, not a script hash.
pub fn validator_id_prefix(compiled_code: &str) -> &str {
    compiled_code
        .get(..VALIDATOR_ID_HEX_LEN)
        .unwrap_or(compiled_code)
}

/// Load a validator from a blueprint file.
///
/// Takes the first validator, or the first one titled `title` when given.
pub fn load_validator(
    artifact: &Path,
    title: Option<&str>,
    default_version: PlutusVersion,
) -> Result<Validator> {
    let contents = std::fs::read_to_string(artifact).map_err(|source| DeployError::ArtifactRead {
        path: artifact.to_path_buf(),
        source,
    })?;
    let blueprint: Blueprint = serde_json::from_str(&contents)?;

    let plutus_version: PlutusVersion = match blueprint.preamble.and_then(|p| p.plutus_version) {
        Some(version) => version.parse()?,
        None => default_version,
    };

    if blueprint.validators.is_empty() {
        return Err(DeployError::NoValidators(artifact.to_path_buf()));
    }
    let selected = match title {
        Some(title) => blueprint
            .validators
            .into_iter()
            .find(|v| v.title.as_deref() == Some(title))
            .ok_or_else(|| DeployError::ValidatorNotFound(title.to_string()))?,
        None => blueprint
            .validators
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::NoValidators(artifact.to_path_buf()))?,
    };

    let compiled_code = selected.compiled_code.trim().to_string();
    if compiled_code.is_empty() {
        return Err(DeployError::InvalidCompiledCode(
            "compiledCode is empty".to_string(),
        ));
    }
    hex::decode(&compiled_code).map_err(|e| DeployError::InvalidCompiledCode(e.to_string()))?;

    debug!(
        title = selected.title.as_deref().unwrap_or("<untitled>"),
        size_bytes = script_size_bytes(&compiled_code),
        "Loaded validator"
    );

    Ok(Validator {
        title: selected.title,
        compiled_code,
        blueprint_hash: selected.hash,
        plutus_version,
    })
}

/// Text envelope consumed by `cardano-cli --payment-script-file`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptDescriptor {
    #[serde(rename = "type")]
    pub script_type: String,
    pub description: String,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

impl ScriptDescriptor {
    pub fn new(validator: &Validator, description: &str) -> Self {
        Self {
            script_type: validator.plutus_version.script_type().to_string(),
            description: description.to_string(),
            cbor_hex: validator.compiled_code.clone(),
        }
    }
}

/// Write the script descriptor next to the blueprint. The file is left on disk.
pub fn write_script_descriptor(
    path: &Path,
    validator: &Validator,
    description: &str,
) -> Result<()> {
    let descriptor = ScriptDescriptor::new(validator, description);
    std::fs::write(path, serde_json::to_vec_pretty(&descriptor)?)?;
    debug!(path = %path.display(), "Wrote script descriptor");
    Ok(())
}

/// Wrapper around the `cardano-cli` binary
#[derive(Debug, Clone)]
pub struct CardanoCli {
    program: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl CardanoCli {
    pub fn new(program: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            program: program.into(),
            timeout,
            retry,
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(
            config.cardano_cli.clone(),
            config.command_timeout(),
            config.retry.clone(),
        )
    }

    /// Derive the script address for `script_file` on `network`.
    pub async fn build_script_address(
        &self,
        script_file: &Path,
        network: Network,
    ) -> Result<String> {
        self.retry
            .run("cardano-cli address build", || {
                self.build_script_address_once(script_file, network)
            })
            .await
    }

    async fn build_script_address_once(
        &self,
        script_file: &Path,
        network: Network,
    ) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("address")
            .arg("build")
            .arg("--payment-script-file")
            .arg(script_file)
            .args(network.cli_args())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(
            program = %self.program,
            script_file = %script_file.display(),
            %network,
            "Running address build"
        );

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => output.map_err(|source| DeployError::CommandSpawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(DeployError::Timeout {
                    operation: format!("{} address build", self.program),
                    after: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(DeployError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let address = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if address.is_empty() {
            return Err(DeployError::EmptyCommandOutput(self.program.clone()));
        }
        Ok(address)
    }
}

/// Result of the script-address step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAddress {
    pub address: String,
    pub validator: Validator,
    /// Text envelope written for `cardano-cli`; left on disk after the run.
    pub script_file: PathBuf,
}

/// Load the validator, write its descriptor and derive its address.
pub async fn calculate_script_address(
    config: &DeployConfig,
    cli: &CardanoCli,
) -> Result<ScriptAddress> {
    let validator = load_validator(
        &config.artifact_path(),
        config.validator_title.as_deref(),
        config.default_plutus_version,
    )?;

    let script_file = config.script_file();
    write_script_descriptor(&script_file, &validator, &config.contract_name)?;

    let address = cli
        .build_script_address(&script_file, config.network)
        .await?;
    info!(script_address = %address, "Script address derived");

    Ok(ScriptAddress {
        address,
        validator,
        script_file,
    })
}
