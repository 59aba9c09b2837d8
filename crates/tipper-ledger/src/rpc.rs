use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::erc20::{format_address, parse_address, transfer_calldata};
use crate::keystore;
use crate::signer::LocalSigner;
use crate::tx::LegacyTransaction;
use crate::{LedgerError, LedgerGateway};

/// Where to send transactions and which key signs them.
#[derive(Debug)]
pub struct LedgerConfig {
    pub endpoint: String,
    pub token_address: String,
    pub key_json: SecretString,
    pub passphrase: SecretString,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// ERC-20 transfers signed locally and submitted with
/// `eth_sendRawTransaction`.
pub struct JsonRpcLedger {
    http: reqwest::Client,
    endpoint: String,
    token: [u8; 20],
    signer: LocalSigner,
    chain_id: OnceCell<u64>,
    /// Held from nonce lookup to submission
    nonce_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Decrypts the keystore and validates the token address up front so a
    /// bad configuration fails at startup rather than on the first tip.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let signer = keystore::decrypt(&config.key_json, &config.passphrase)?;
        Self::with_signer(config.endpoint, &config.token_address, signer)
    }

    pub fn with_signer(
        endpoint: String,
        token_address: &str,
        signer: LocalSigner,
    ) -> Result<Self, LedgerError> {
        let token = parse_address(token_address)?;

        info!(
            "Ledger gateway ready: token {} from {}",
            format_address(&token),
            format_address(signer.address())
        );

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            token,
            signer,
            chain_id: OnceCell::new(),
            nonce_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        response
            .result
            .ok_or_else(|| LedgerError::MalformedResponse(format!("{} returned no result", method)))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, LedgerError> {
        let value = self.call(method, params).await?;
        value
            .as_str()
            .and_then(|raw| raw.strip_prefix("0x"))
            .and_then(|digits| u128::from_str_radix(digits, 16).ok())
            .ok_or_else(|| LedgerError::MalformedResponse(format!("{}: {}", method, value)))
    }

    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.quantity("eth_chainId", json!([])).await?;
                let id = u64::try_from(id)
                    .map_err(|_| LedgerError::MalformedResponse(format!("chain id {}", id)))?;
                debug!("Connected to chain {}", id);
                Ok::<_, LedgerError>(id)
            })
            .await
            .copied()
    }

    async fn submit(&self, data: Vec<u8>) -> Result<String, LedgerError> {
        let chain_id = self.chain_id().await?;
        let from = format_address(self.signer.address());
        let call = json!({
            "from": from,
            "to": format_address(&self.token),
            "data": format!("0x{}", hex::encode(&data)),
        });

        let _guard = self.nonce_lock.lock().await;

        let nonce = self
            .quantity("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
        let gas = self.quantity("eth_estimateGas", json!([call])).await?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas,
            to: self.token,
            value: 0,
            data,
        };
        let signature = self.signer.sign_hash(&tx.signing_hash(chain_id))?;
        let raw = tx.encode_signed(chain_id, &signature);

        let result = self
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;

        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LedgerError::MalformedResponse(result.to_string()))
    }
}

#[async_trait]
impl LedgerGateway for JsonRpcLedger {
    async fn transfer(&self, to_address: &str, amount: u128) -> Result<String, LedgerError> {
        let to = parse_address(to_address)?;

        debug!("Requesting transfer of {} to {}", amount, format_address(&to));

        let hash = self
            .submit(transfer_calldata(&to, amount))
            .await
            .inspect_err(|e| warn!("Failed to submit token transfer: {}", e))?;

        info!("Transfer pending: {}", hash);
        Ok(hash)
    }
}
