//! Configuration Management Module
//!
//! Loads the client configuration from TOML. Unlike the long-running
//! services, a missing file is not an error: the built-in devnet defaults
//! apply and every value can still be overridden on the command line.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::instruction::FeePolicy;
use crate::pda::ProgramSet;

pub const CONFIG_PATH_ENV: &str = "LZ_VAULT_CLIENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/lz-vault-client.toml";
/// RPC endpoint used when `--rpc` is not given, as set by Anchor tooling.
pub const RPC_URL_ENV: &str = "ANCHOR_PROVIDER_URL";

const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_COMMITMENT: &str = "confirmed";
const DEFAULT_VAULT_PROGRAM_ID: &str = "GSPmsxkxd5qR5HG4fhUd5cBrVkWNJWi6pWUFQnYmTEc1";
const DEFAULT_OAPP_PROGRAM_ID: &str = "CV1qjq8phMMpxv62TExA9PpvTyZx58TNCqkFB2QQgJXH";
const DEFAULT_ENDPOINT_PROGRAM_ID: &str = "76y77prsiCMvXMjuoZ5VRrhG5qYBrUMYTE5WgHqgjEn6";
const DEFAULT_SEND_LIBRARY_PROGRAM_ID: &str = "2XgGZG4oP29U3w5h4nTk1V2LFHL23zKDPJjs3psGzLKQ";
const DEFAULT_PAYER_KEYPAIR_PATH: &str = "~/my_solana_wallet.json";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub programs: ProgramsConfig,
    #[serde(default)]
    pub fees: FeesConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    /// File the settings were read from; `None` when defaults are in use.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Upper bound for a single account read, in milliseconds
    pub request_timeout_ms: u64,
    /// One of `processed`, `confirmed`, `finalized`
    pub commitment: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            commitment: DEFAULT_COMMITMENT.to_string(),
        }
    }
}

/// Base58 program ids of the deposit call chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    pub vault_program_id: String,
    pub oapp_program_id: String,
    pub endpoint_program_id: String,
    pub send_library_program_id: String,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            vault_program_id: DEFAULT_VAULT_PROGRAM_ID.to_string(),
            oapp_program_id: DEFAULT_OAPP_PROGRAM_ID.to_string(),
            endpoint_program_id: DEFAULT_ENDPOINT_PROGRAM_ID.to_string(),
            send_library_program_id: DEFAULT_SEND_LIBRARY_PROGRAM_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    /// Native fee used when `--native-fee` is not given
    pub default_native_fee: Option<u64>,
    /// LZ token fee used when `--lz-token-fee` is not given
    pub default_lz_token_fee: Option<u64>,
    /// Accept an explicit native fee of 0 (encoded as "not set")
    pub allow_zero_native_fee: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub payer_keypair_path: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            payer_keypair_path: DEFAULT_PAYER_KEYPAIR_PATH.to_string(),
        }
    }
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Loads configuration from `path`, `LZ_VAULT_CLIENT_CONFIG_PATH`, or
    /// `config/lz-vault-client.toml`, in that order.
    ///
    /// An explicitly requested file that does not exist is an error; a missing
    /// default file yields the built-in defaults.
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let explicit = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());
        let config_path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !Path::new(&config_path).exists() {
            if explicit.is_some() {
                return Err(anyhow::anyhow!(
                    "Configuration file '{}' not found. Copy the template:\n\
                    cp config/lz-vault-client.template.toml {}",
                    config_path,
                    config_path
                ));
            }
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file '{}'", config_path))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", config_path))?;
        config.validate()?;
        config.source = Some(PathBuf::from(config_path));
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Configuration error: network.rpc_url is empty"));
        }
        if self.network.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: network.request_timeout_ms must be greater than 0"
            ));
        }
        parse_commitment(&self.network.commitment)?;

        let programs = self.program_set()?;
        let chain = [
            ("vault_program_id", programs.vault),
            ("oapp_program_id", programs.messaging_app),
            ("endpoint_program_id", programs.endpoint),
        ];
        for i in 0..chain.len() {
            for j in (i + 1)..chain.len() {
                if chain[i].1 == chain[j].1 {
                    return Err(anyhow::anyhow!(
                        "Configuration error: programs.{} and programs.{} are the same program {}",
                        chain[i].0,
                        chain[j].0,
                        chain[i].1
                    ));
                }
            }
        }

        if self.keys.payer_keypair_path.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: keys.payer_keypair_path is empty"
            ));
        }
        Ok(())
    }

    pub fn program_set(&self) -> anyhow::Result<ProgramSet> {
        Ok(ProgramSet {
            vault: parse_program_id("vault_program_id", &self.programs.vault_program_id)?,
            messaging_app: parse_program_id("oapp_program_id", &self.programs.oapp_program_id)?,
            endpoint: parse_program_id("endpoint_program_id", &self.programs.endpoint_program_id)?,
            send_library: parse_program_id(
                "send_library_program_id",
                &self.programs.send_library_program_id,
            )?,
        })
    }

    pub fn commitment(&self) -> anyhow::Result<CommitmentConfig> {
        parse_commitment(&self.network.commitment)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.network.request_timeout_ms)
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            default_native_fee: self.fees.default_native_fee,
            default_lz_token_fee: self.fees.default_lz_token_fee,
            allow_zero_native_fee: self.fees.allow_zero_native_fee,
        }
    }

    /// Picks the RPC endpoint: `--rpc`, then `ANCHOR_PROVIDER_URL`, then
    /// `network.rpc_url`. Empty values are ignored.
    pub fn apply_rpc_override(&mut self, flag: Option<&str>) {
        let env = std::env::var(RPC_URL_ENV).ok();
        if let Some(url) = select_rpc_url(flag, env.as_deref()) {
            self.network.rpc_url = url.to_string();
        }
    }

    /// Checks a `--program` flag against the configured vault program.
    ///
    /// With no config file loaded the flag replaces the default id.
    pub fn apply_program_override(&mut self, program: Option<&str>) -> anyhow::Result<()> {
        let Some(program) = program else {
            return Ok(());
        };
        let requested = parse_program_id("--program", program)?;
        let configured = parse_program_id("vault_program_id", &self.programs.vault_program_id)?;

        match &self.source {
            Some(source) if requested != configured => Err(anyhow::anyhow!(
                "--program {} does not match programs.vault_program_id {} in {}",
                requested,
                configured,
                source.display()
            )),
            Some(_) => Ok(()),
            None => {
                self.programs.vault_program_id = requested.to_string();
                self.validate()
            }
        }
    }
}

fn select_rpc_url<'a>(flag: Option<&'a str>, env: Option<&'a str>) -> Option<&'a str> {
    let present = |url: &&str| !url.trim().is_empty();
    flag.filter(present).or(env.filter(present)).map(str::trim)
}

fn parse_program_id(field: &str, value: &str) -> anyhow::Result<Pubkey> {
    Pubkey::from_str(value).map_err(|e| {
        anyhow::anyhow!("Configuration error: {} '{}' is not a valid base58 program id: {}", field, value, e)
    })
}

fn parse_commitment(value: &str) -> anyhow::Result<CommitmentConfig> {
    match value {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(anyhow::anyhow!(
            "Configuration error: network.commitment '{}' must be processed, confirmed or finalized",
            other
        )),
    }
}
