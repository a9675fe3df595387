//! Wallet reader: local address file plus balance and UTXOs from the Koios indexer

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::DeployConfig;
use crate::error::{DeployError, Result};
use crate::retry::RetryPolicy;

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Wallet state as reported by the indexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletInfo {
    pub address: String,
    /// Balance in lovelace.
    pub balance: u64,
    /// UTXO entries exactly as the indexer returned them.
    pub utxos: Vec<Value>,
}

impl WalletInfo {
    pub fn balance_ada(&self) -> String {
        lovelace_to_ada(self.balance)
    }

    pub fn utxo_count(&self) -> usize {
        self.utxos.len()
    }
}

/// Format lovelace as ADA with two decimals.
///
/// Formats the floating-point quotient, so values just below a half cent
/// round down (`15000` gives `0.01`).
pub fn lovelace_to_ada(lovelace: u64) -> String {
    format!("{:.2}", lovelace as f64 / LOVELACE_PER_ADA as f64)
}

/// Read the wallet address from the address file (`payment.addr`).
pub fn read_wallet_address(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| DeployError::AddressFile {
        path: path.to_path_buf(),
        source,
    })?;
    let address = raw.trim();
    if address.is_empty() {
        return Err(DeployError::EmptyAddress(path.to_path_buf()));
    }
    Ok(address.to_string())
}

/// One entry of the Koios `/address_info` response.
#[derive(Debug, Deserialize)]
struct AddressInfoEntry {
    balance: Value,
    #[serde(default)]
    utxo_set: Vec<Value>,
}

/// Koios reports lovelace as a decimal string; plain integers are accepted too.
fn parse_balance(value: &Value) -> Result<u64> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| DeployError::InvalidBalance(s.clone())),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| DeployError::InvalidBalance(n.to_string())),
        other => Err(DeployError::InvalidBalance(other.to_string())),
    }
}

/// HTTP client for the indexing service
#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            retry,
        })
    }

    pub fn from_config(config: &DeployConfig) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            config.http_timeout(),
            config.retry.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query balance and UTXO set for `address`, retrying transient failures.
    pub async fn address_info(&self, address: &str) -> Result<WalletInfo> {
        self.retry
            .run("address_info", || self.address_info_once(address))
            .await
    }

    async fn address_info_once(&self, address: &str) -> Result<WalletInfo> {
        let url = format!("{}/address_info", self.base_url);
        debug!(url = %url, address, "Requesting address info");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "_addresses": [address] }))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::IndexerStatus { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let entries: Vec<AddressInfoEntry> = serde_json::from_str(&body)?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::WalletNotIndexed(address.to_string()))?;

        Ok(WalletInfo {
            address: address.to_string(),
            balance: parse_balance(&entry.balance)?,
            utxos: entry.utxo_set,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> DeployError {
        if err.is_timeout() {
            DeployError::Timeout {
                operation: "address_info".to_string(),
                after: self.timeout,
            }
        } else {
            DeployError::Http(err)
        }
    }
}

/// Load the wallet address and fetch its balance and UTXOs.
pub async fn get_wallet_info(config: &DeployConfig, indexer: &IndexerClient) -> Result<WalletInfo> {
    let address = read_wallet_address(&config.address_file())?;
    info!(address = %address, indexer = indexer.base_url(), "Checking wallet");
    let wallet = indexer.address_info(&address).await?;
    info!(
        balance = wallet.balance,
        utxos = wallet.utxo_count(),
        "Wallet info retrieved"
    );
    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "addr1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";

    fn client_for(server: &MockServer, retry: RetryPolicy) -> IndexerClient {
        IndexerClient::new(
            format!("{}/api/v1", server.uri()),
            Duration::from_secs(5),
            retry,
        )
        .unwrap()
    }

    fn fast_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            coefficient: 2,
            max_attempts,
        }
    }

    #[test]
    fn test_lovelace_to_ada() {
        assert_eq!(lovelace_to_ada(5_000_000), "5.00");
        assert_eq!(lovelace_to_ada(0), "0.00");
        assert_eq!(lovelace_to_ada(1_234_567), "1.23");
        assert_eq!(lovelace_to_ada(999_999), "1.00");
        assert_eq!(lovelace_to_ada(12_345_678), "12.35");
    }

    #[test]
    fn test_lovelace_to_ada_half_cent_boundaries() {
        assert_eq!(lovelace_to_ada(15_000), "0.01");
        assert_eq!(lovelace_to_ada(125_000), "0.12");
        assert_eq!(lovelace_to_ada(1_005_000), "1.00");
        assert_eq!(lovelace_to_ada(2_675_000), "2.67");
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance(&json!("5000000")).unwrap(), 5_000_000);
        assert_eq!(parse_balance(&json!(42)).unwrap(), 42);
        assert!(matches!(
            parse_balance(&json!("-1")),
            Err(DeployError::InvalidBalance(_))
        ));
        assert!(parse_balance(&json!(null)).is_err());
    }

    #[test]
    fn test_read_wallet_address_trims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payment.addr");
        std::fs::write(&path, format!("  {ADDRESS}\n")).unwrap();
        assert_eq!(read_wallet_address(&path).unwrap(), ADDRESS);
    }

    #[test]
    fn test_read_wallet_address_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payment.addr");
        assert!(matches!(
            read_wallet_address(&path),
            Err(DeployError::AddressFile { .. })
        ));

        std::fs::write(&path, "\n").unwrap();
        assert!(matches!(
            read_wallet_address(&path),
            Err(DeployError::EmptyAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_address_info_parses_balance_and_utxos() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/address_info"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "_addresses": [ADDRESS] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "address": ADDRESS,
                "balance": "5000000",
                "utxo_set": [
                    { "tx_hash": "aa", "tx_index": 0, "value": "3000000" },
                    { "tx_hash": "bb", "tx_index": 1, "value": "2000000" }
                ]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let wallet = client_for(&server, RetryPolicy::no_retries())
            .address_info(ADDRESS)
            .await
            .unwrap();

        assert_eq!(wallet.address, ADDRESS);
        assert_eq!(wallet.balance, 5_000_000);
        assert_eq!(wallet.balance_ada(), "5.00");
        assert_eq!(wallet.utxo_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_address_returns_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/address_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client_for(&server, RetryPolicy::no_retries())
            .address_info(ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::WalletNotIndexed(a) if a == ADDRESS));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/address_info"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(3))
            .address_info(ADDRESS)
            .await
            .unwrap_err();

        match err {
            DeployError::RetriesExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(
                    *last_error,
                    DeployError::IndexerStatus { status: 503, ref body } if body == "overloaded"
                ));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/address_info"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid address"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(3))
            .address_info(ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::IndexerStatus { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/address_info"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!([{
                "balance": "5000000",
                "utxo_set": []
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, fast_retry(3))
            .address_info(ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::IndexerStatus { status: 202, .. }));
    }
}
