//! Solana SVM RPC Client Module
//!
//! Account reads go through a minimal JSON-RPC `getAccountInfo` client over
//! `reqwest`; transaction submission goes through `solana-client`. The resolver
//! only sees the [`AccountFetcher`] trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

// ============================================================================
// ACCOUNT FETCH INTERFACE
// ============================================================================

/// Raw on-chain account as returned by the RPC collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Reads a single account. `Ok(None)` means the account does not exist.
///
/// Implementations own connection lifecycle, commitment and any retry policy.
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, FetchError>;
}

// ============================================================================
// JSON-RPC TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    value: Option<RpcAccount>,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    data: (String, String),
    owner: String,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct SvmClient {
    client: Client,
    rpc_url: String,
    commitment: String,
    timeout: Duration,
}

impl SvmClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(rpc_url: &str, timeout: Duration, commitment: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            commitment: commitment.to_string(),
            timeout,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Read raw account data and owner for any Solana account.
    /// Returns None if the account doesn't exist.
    pub async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<RawAccount>, FetchError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: "getAccountInfo".to_string(),
            params: serde_json::json!([
                pubkey.to_string(),
                { "encoding": "base64", "commitment": self.commitment }
            ]),
            id: 1,
        };

        debug!("getAccountInfo {} via {}", pubkey, self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error("getAccountInfo", e))?;

        let response: JsonRpcResponse<AccountInfoResult> = response
            .json()
            .await
            .map_err(|e| self.transport_error("parse getAccountInfo response", e))?;

        if let Some(error) = response.error {
            return Err(FetchError::Rpc(format!("SVM RPC error: {}", error.message)));
        }

        let Some(result) = response.result else {
            return Ok(None);
        };

        let Some(account) = result.value else {
            return Ok(None);
        };

        let owner = Pubkey::from_str(&account.owner)
            .map_err(|e| FetchError::Rpc(format!("Invalid account owner in response: {e}")))?;
        let data = STANDARD
            .decode(&account.data.0)
            .map_err(|e| FetchError::Rpc(format!("Failed to decode base64 account data: {e}")))?;

        Ok(Some(RawAccount { owner, data }))
    }

    fn transport_error(&self, what: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Rpc(format!("Failed to {what} at {}: {error}", self.rpc_url))
        }
    }
}

#[async_trait]
impl AccountFetcher for SvmClient {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, FetchError> {
        self.get_account(address).await
    }
}

// ============================================================================
// TRANSACTION SUBMISSION
// ============================================================================

pub struct TransactionSubmitter {
    rpc_client: RpcClient,
}

impl TransactionSubmitter {
    pub fn new(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        Self {
            rpc_client: RpcClient::new_with_commitment(rpc_url.to_string(), commitment),
        }
    }

    /// Signs with `payer` plus any distinct extra signers and waits for
    /// confirmation.
    pub async fn submit(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let mut all_signers = Vec::with_capacity(signers.len() + 1);
        all_signers.push(payer);
        for signer in signers {
            if signer.pubkey() != payer.pubkey() {
                all_signers.push(*signer);
            }
        }

        let blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .await
            .context("Failed to get latest blockhash")?;
        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &all_signers,
            blockhash,
        );

        self.rpc_client
            .send_and_confirm_transaction(&tx)
            .await
            .context("Failed to send transaction")
    }
}
