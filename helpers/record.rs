//! Deployment record persisted after a successful run

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Network;
use crate::error::Result;
use crate::script::Validator;

/// Format of `deployed_at`, e.g. `2024-05-01 12:30:00 UTC`.
pub const DEPLOYED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub script_address: String,
    /// Leading 56 hex characters of the compiled code. Not a script hash.
    pub validator_hash: String,
    pub network: String,
    pub deployed_at: String,
    pub wallet_address: String,
    pub validator_type: String,
    pub contract_name: String,
}

impl DeploymentRecord {
    /// Build a record stamped with the current UTC time.
    pub fn new(
        script_address: &str,
        validator: &Validator,
        network: Network,
        wallet_address: &str,
        contract_name: &str,
    ) -> Self {
        Self::at(
            Utc::now(),
            script_address,
            validator,
            network,
            wallet_address,
            contract_name,
        )
    }

    pub fn at(
        deployed_at: DateTime<Utc>,
        script_address: &str,
        validator: &Validator,
        network: Network,
        wallet_address: &str,
        contract_name: &str,
    ) -> Self {
        Self {
            script_address: script_address.to_string(),
            validator_hash: validator.id_prefix().to_string(),
            network: network.as_str().to_string(),
            deployed_at: deployed_at.format(DEPLOYED_AT_FORMAT).to_string(),
            wallet_address: wallet_address.to_string(),
            validator_type: validator.plutus_version.validator_type().to_string(),
            contract_name: contract_name.to_string(),
        }
    }

    /// Write the record as pretty JSON, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Deployment record saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
