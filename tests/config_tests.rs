//! Unit tests for configuration module

use lz_vault_client::config::Config;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

fn load(file: &NamedTempFile) -> anyhow::Result<Config> {
    Config::load_from_path(Some(file.path().to_str().unwrap()))
}

// ============================================================================
// LOADING TESTS
// ============================================================================

/// What is tested: built-in defaults are valid and point at devnet
/// Why: the CLI must work without a config file
#[test]
fn test_defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.network.rpc_url, "https://api.devnet.solana.com");
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.keys.payer_keypair_path, "~/my_solana_wallet.json");

    let programs = config.program_set().unwrap();
    assert_eq!(
        programs.messaging_app,
        Pubkey::from_str("CV1qjq8phMMpxv62TExA9PpvTyZx58TNCqkFB2QQgJXH").unwrap()
    );
}

/// What is tested: a partial file overrides only the keys it sets
/// Why: every section and key is optional
#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[network]
rpc_url = "http://127.0.0.1:8899"
commitment = "finalized"

[fees]
default_native_fee = 7000
"#,
    );
    let config = load(&file).unwrap();

    assert_eq!(config.network.rpc_url, "http://127.0.0.1:8899");
    assert_eq!(config.commitment().unwrap(), CommitmentConfig::finalized());
    assert_eq!(config.network.request_timeout_ms, 30_000);
    assert_eq!(config.fee_policy().default_native_fee, Some(7000));
    assert!(!config.fee_policy().allow_zero_native_fee);
    assert_eq!(config.source.as_deref(), Some(file.path()));
}

/// What is tested: an explicitly requested file that does not exist is an error
/// Why: a typo in --config must not silently fall back to devnet
#[test]
fn test_explicit_missing_file_is_error() {
    let err = Config::load_from_path(Some("/nonexistent/lz-vault-client.toml")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

/// What is tested: validate() rejects a zero request timeout
/// Why: a zero timeout fails every peer read
#[test]
fn test_rejects_zero_timeout() {
    let file = write_config("[network]\nrequest_timeout_ms = 0\n");
    assert!(load(&file).is_err());
}

/// What is tested: validate() rejects an unparsable program id
/// Why: program ids feed every derivation
#[test]
fn test_rejects_bad_program_id() {
    let file = write_config("[programs]\noapp_program_id = \"not-a-pubkey\"\n");
    let err = load(&file).unwrap_err();
    assert!(format!("{err:#}").contains("oapp_program_id"));
}

/// What is tested: validate() rejects the same program in two roles
/// Why: the call chain spans three distinct programs
#[test]
fn test_rejects_duplicate_program_ids() {
    let mut config = Config::default();
    config.programs.endpoint_program_id = config.programs.oapp_program_id.clone();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("endpoint_program_id"));
}

/// What is tested: validate() rejects an unknown commitment level
/// Why: the RPC node would reject it on every request
#[test]
fn test_rejects_unknown_commitment() {
    let mut config = Config::default();
    config.network.commitment = "max".to_string();
    assert!(config.validate().is_err());
}

// ============================================================================
// PROGRAM OVERRIDE TESTS
// ============================================================================

/// What is tested: --program replaces the vault id when no file was loaded
/// Why: the CLI can target any deployment with flags alone
#[test]
fn test_program_override_without_file() {
    let mut config = Config::default();
    let program = Pubkey::new_unique();
    config
        .apply_program_override(Some(&program.to_string()))
        .unwrap();
    assert_eq!(config.program_set().unwrap().vault, program);
}

/// What is tested: --program must match the vault id of a loaded file
/// Why: a mismatch means the flag and the config target different deployments
#[test]
fn test_program_override_checked_against_file() {
    let file = write_config("[network]\ncommitment = \"confirmed\"\n");
    let mut config = load(&file).unwrap();

    let configured = config.programs.vault_program_id.clone();
    assert!(config.apply_program_override(Some(&configured)).is_ok());
    assert!(config
        .apply_program_override(Some(&Pubkey::new_unique().to_string()))
        .is_err());
}

// ============================================================================
// RPC OVERRIDE TESTS
// ============================================================================

/// What is tested: --rpc replaces the configured endpoint
/// Why: the flag takes precedence over ANCHOR_PROVIDER_URL and the config file
#[test]
fn test_rpc_flag_overrides_config() {
    let file = write_config("[network]\nrpc_url = \"http://127.0.0.1:8899\"\n");
    let mut config = load(&file).unwrap();
    config.apply_rpc_override(Some("https://api.mainnet-beta.solana.com"));
    assert_eq!(config.network.rpc_url, "https://api.mainnet-beta.solana.com");
}
