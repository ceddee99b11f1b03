//! Shared test helpers for lz-vault-client tests
//!
//! Dummy program ids, peer record builders and in-memory account fetchers.

#![allow(dead_code)]

use async_trait::async_trait;
use lz_vault_client::{
    error::FetchError,
    pda::ProgramSet,
    resolver::{ChainAccountResolver, DepositContext, OAppAccounts, ResolvedDeposit},
    svm_client::{AccountFetcher, RawAccount},
    token::{TokenProgram, TOKEN_PROGRAM_ID},
};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Destination endpoint id used across tests (be32 = 0x00009D35)
pub const DUMMY_DST_EID: u32 = 40245;

/// Dummy EVM token address (40 hex characters)
pub const DUMMY_DST_TOKEN_EVM: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

/// Dummy EVM merchant address (40 hex characters)
pub const DUMMY_MERCHANT_EVM: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb0";

/// Peer address stored in the dummy peer record
pub const DUMMY_PEER_ADDRESS: [u8; 32] = [0xAB; 32];

/// Record-kind tag stored in the dummy peer record
pub const DUMMY_PEER_TAG: [u8; 8] = [0x11; 8];

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn dummy_programs() -> ProgramSet {
    ProgramSet {
        vault: Pubkey::new_from_array([1u8; 32]),
        messaging_app: Pubkey::new_from_array([2u8; 32]),
        endpoint: Pubkey::new_from_array([3u8; 32]),
        send_library: Pubkey::new_from_array([4u8; 32]),
    }
}

pub fn dummy_user() -> Pubkey {
    Pubkey::new_from_array([5u8; 32])
}

pub fn dummy_mint() -> Pubkey {
    Pubkey::new_from_array([6u8; 32])
}

pub fn dummy_context() -> DepositContext {
    DepositContext {
        user: dummy_user(),
        mint: dummy_mint(),
        token_program: TokenProgram::Spl,
        dst_eid: DUMMY_DST_EID,
    }
}

// ============================================================================
// PEER RECORDS
// ============================================================================

/// Builds raw peer record bytes: tag, peer address, options, bump.
pub fn peer_record_bytes(peer_address: [u8; 32], options: &[u8], bump: u8) -> Vec<u8> {
    let mut data = DUMMY_PEER_TAG.to_vec();
    data.extend_from_slice(&peer_address);
    data.extend_from_slice(options);
    data.push(bump);
    data
}

// ============================================================================
// FETCHERS
// ============================================================================

/// Serves accounts from a map and records every requested address.
#[derive(Default)]
pub struct InMemoryFetcher {
    accounts: HashMap<Pubkey, RawAccount>,
    requested: Mutex<Vec<Pubkey>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Pubkey, owner: Pubkey, data: Vec<u8>) -> Self {
        self.accounts.insert(address, RawAccount { owner, data });
        self
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<Pubkey> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountFetcher for InMemoryFetcher {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, FetchError> {
        self.requested.lock().unwrap().push(*address);
        Ok(self.accounts.get(address).cloned())
    }
}

/// Never answers.
#[derive(Default)]
pub struct PendingFetcher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AccountFetcher for PendingFetcher {
    async fn fetch_account(&self, _address: &Pubkey) -> Result<Option<RawAccount>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Always fails with the given error.
pub struct FailingFetcher(pub FetchError);

#[async_trait]
impl AccountFetcher for FailingFetcher {
    async fn fetch_account(&self, _address: &Pubkey) -> Result<Option<RawAccount>, FetchError> {
        Err(self.0.clone())
    }
}

/// A fetcher holding the SPL mint and a peer record written with `bump`.
pub fn fetcher_with_peer_bump(programs: &ProgramSet, dst_eid: u32, bump: u8) -> InMemoryFetcher {
    let oapp = OAppAccounts::derive(programs, dst_eid).unwrap();
    InMemoryFetcher::new()
        .with_account(dummy_mint(), TOKEN_PROGRAM_ID, vec![0u8; 82])
        .with_account(
            oapp.peer.address,
            programs.messaging_app,
            peer_record_bytes(DUMMY_PEER_ADDRESS, &[0, 0, 0, 0], bump),
        )
}

/// A fetcher whose peer record carries the canonical bump.
pub fn configured_fetcher(programs: &ProgramSet, dst_eid: u32) -> InMemoryFetcher {
    let oapp = OAppAccounts::derive(programs, dst_eid).unwrap();
    fetcher_with_peer_bump(programs, dst_eid, oapp.peer.bump)
}

/// Resolves the dummy deposit against a correctly configured peer.
pub async fn resolve_dummy_deposit() -> ResolvedDeposit {
    let programs = dummy_programs();
    let resolver = ChainAccountResolver::new(
        programs,
        configured_fetcher(&programs, DUMMY_DST_EID),
        TEST_TIMEOUT,
    );
    resolver.resolve(&dummy_context()).await.unwrap()
}
