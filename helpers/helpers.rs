//! Common helper functions for the validator deployment script and its tests

pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod record;
pub mod retry;
pub mod script;
pub mod wallet;

pub use config::{DeployConfig, Network, PlutusVersion};
pub use error::{DeployError, Result};
pub use record::DeploymentRecord;
pub use retry::RetryPolicy;
pub use script::{calculate_script_address, CardanoCli, ScriptAddress, Validator};
pub use wallet::{get_wallet_info, IndexerClient, WalletInfo};
