//! Shared fixtures for deployment tests: a scratch key/contract layout, a mock
//! Koios indexer and a stand-in `cardano-cli`.

use std::path::{Path, PathBuf};

use helpers::{DeployConfig, RetryPolicy};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WALLET_ADDRESS: &str =
    "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x";
pub const SCRIPT_ADDRESS: &str = "addr1w8t6lwnglugfmzh8tn6ly3j8zrqvktuwcmh6z3hadn6sdwsl3sfqz";
pub const INDEXER_PATH: &str = "/api/v1/address_info";

/// Scratch deployment environment
pub struct DeployFixture {
    pub dir: TempDir,
    pub server: MockServer,
    pub config: DeployConfig,
}

impl DeployFixture {
    /// Create key and contract directories and a mock indexer.
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let key_dir = dir.path().join("keys");
        let contract_dir = dir.path().join("contract");
        std::fs::create_dir_all(&key_dir)?;
        std::fs::create_dir_all(&contract_dir)?;
        std::fs::write(key_dir.join("payment.addr"), format!("{WALLET_ADDRESS}\n"))?;

        let server = MockServer::start().await;
        let config = DeployConfig {
            key_dir,
            contract_dir,
            api_base_url: Some(format!("{}/api/v1", server.uri())),
            http_timeout_secs: 5,
            command_timeout_secs: 5,
            retry: RetryPolicy {
                initial_delay_ms: 1,
                max_delay_ms: 4,
                coefficient: 2,
                max_attempts: 3,
            },
            ..Default::default()
        };

        Ok(Self {
            dir,
            server,
            config,
        })
    }

    pub fn record_path(&self) -> PathBuf {
        self.config.record_path()
    }

    /// Write a single-validator blueprint with the given compiled code.
    pub fn write_blueprint(&self, compiled_code: &str) -> anyhow::Result<()> {
        let blueprint = json!({
            "preamble": {
                "title": "cardanoscrow/escrow",
                "version": "0.0.0",
                "plutusVersion": "v2"
            },
            "validators": [
                { "title": "escrow.spend", "compiledCode": compiled_code }
            ]
        });
        std::fs::write(
            self.config.artifact_path(),
            serde_json::to_vec_pretty(&blueprint)?,
        )?;
        Ok(())
    }

    /// Mount an `/address_info` response.
    pub async fn mount_indexer(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(INDEXER_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Install a shell script as `cardano-cli`; every call touches `cli-called`.
    #[cfg(unix)]
    pub fn install_fake_cli(&mut self, body: &str) -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let program = self.dir.path().join("cardano-cli");
        let marker = self.cli_marker();
        std::fs::write(
            &program,
            format!("#!/bin/sh\ntouch {}\n{body}\n", marker.display()),
        )?;
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755))?;
        self.config.cardano_cli = program.to_string_lossy().into_owned();
        Ok(())
    }

    pub fn cli_marker(&self) -> PathBuf {
        self.dir.path().join("cli-called")
    }

    pub fn cli_was_called(&self) -> bool {
        self.cli_marker().exists()
    }
}

/// Koios `/address_info` payload for the fixture wallet.
pub fn address_info_response(balance: &str, utxo_count: usize) -> Value {
    let utxos: Vec<Value> = (0..utxo_count)
        .map(|i| {
            json!({
                "tx_hash": format!("{:064x}", i + 1),
                "tx_index": i,
                "value": "1000000",
                "asset_list": []
            })
        })
        .collect();
    json!([{
        "address": WALLET_ADDRESS,
        "balance": balance,
        "stake_address": null,
        "script_address": false,
        "utxo_set": utxos
    }])
}

/// Hex string of `bytes` bytes that looks like a Plutus script.
pub fn compiled_code(bytes: usize) -> String {
    let mut code = String::from("5901");
    while code.len() < bytes * 2 {
        code.push_str("0032");
    }
    code.truncate(bytes * 2);
    code
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}
