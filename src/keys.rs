//! Key file loading.
//!
//! Key files are the Solana CLI JSON format: an array of 64 bytes.

use anyhow::{Context, Result};
use solana_sdk::signature::{read_keypair_file, Keypair};

use crate::config::KeysConfig;

pub const ANCHOR_WALLET_ENV: &str = "ANCHOR_WALLET";

/// Expands `~` and environment variables in a key file path.
pub fn expand_path(path: &str) -> Result<String> {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .with_context(|| format!("Failed to expand key path '{}'", path))
}

pub fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_path(path)?;
    read_keypair_file(&expanded)
        .map_err(|e| anyhow::anyhow!("Failed to read keypair from '{}': {}", expanded, e))
}

/// Picks the payer key file: `--payer`, then `ANCHOR_WALLET`, then config.
pub fn payer_keypair_path(flag: Option<&str>, keys: &KeysConfig) -> String {
    flag.map(|p| p.to_string())
        .or_else(|| std::env::var(ANCHOR_WALLET_ENV).ok())
        .unwrap_or_else(|| keys.payer_keypair_path.clone())
}
