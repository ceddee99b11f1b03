//! Error definitions for account resolution and instruction assembly.
//!
//! Every variant that originates in a derivation or an account read names the
//! account family it was working on and the exact seeds used, so address drift
//! can be diagnosed from the message alone.

use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::pda::seeds::{AccountFamily, SeedSequence};

#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "No valid bump found deriving {} under program {program} with seeds {seeds}",
        step_label(.step)
    )]
    NoValidBumpFound {
        step: Option<AccountFamily>,
        program: Pubkey,
        seeds: SeedSequence,
    },

    #[error(
        "{step} account {address} not found on-chain (seeds {seeds}); \
         the {step} link must be configured before depositing"
    )]
    AccountNotFound {
        step: AccountFamily,
        address: Pubkey,
        seeds: SeedSequence,
    },

    #[error(
        "{step} account {address} does not match its seeds: expected address {expected_address} \
         with bump {expected_bump}, stored bump is {observed_bump} (seeds {seeds}); \
         the record was created against a different seed layout or program"
    )]
    PeerBumpMismatch {
        step: AccountFamily,
        address: Pubkey,
        expected_address: Pubkey,
        expected_bump: u8,
        observed_bump: u8,
        seeds: SeedSequence,
    },

    #[error("Timed out after {timeout:?} fetching {step} account {address}")]
    UpstreamTimeout {
        step: AccountRead,
        address: Pubkey,
        timeout: Duration,
    },

    #[error("RPC failure fetching {step} account {address}: {message}")]
    Rpc {
        step: AccountRead,
        address: Pubkey,
        message: String,
    },

    #[error("{step} account {address} is malformed: {reason}")]
    MalformedAccount {
        step: AccountFamily,
        address: Pubkey,
        reason: String,
    },

    #[error("Failed to encode instruction data: {0}")]
    Encode(String),
}

impl ResolveError {
    /// Only a timed-out read may be retried, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::UpstreamTimeout { .. })
    }

    /// The account family the failure is attributed to, if any. Reads of
    /// non-derived accounts such as the mint have no family.
    pub fn step(&self) -> Option<AccountFamily> {
        match self {
            ResolveError::NoValidBumpFound { step, .. } => *step,
            ResolveError::AccountNotFound { step, .. }
            | ResolveError::PeerBumpMismatch { step, .. }
            | ResolveError::MalformedAccount { step, .. } => Some(*step),
            ResolveError::UpstreamTimeout { step, .. } | ResolveError::Rpc { step, .. } => {
                step.family()
            }
            ResolveError::InvalidInput(_) | ResolveError::Encode(_) => None,
        }
    }
}

/// The account an on-chain read was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRead {
    /// A derived account of one schema family.
    Family(AccountFamily),
    /// The token mint named on the command line.
    Mint,
}

impl AccountRead {
    pub fn family(self) -> Option<AccountFamily> {
        match self {
            AccountRead::Family(family) => Some(family),
            AccountRead::Mint => None,
        }
    }
}

impl From<AccountFamily> for AccountRead {
    fn from(family: AccountFamily) -> Self {
        AccountRead::Family(family)
    }
}

impl PartialEq<AccountFamily> for AccountRead {
    fn eq(&self, other: &AccountFamily) -> bool {
        *self == AccountRead::Family(*other)
    }
}

impl fmt::Display for AccountRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRead::Family(family) => fmt::Display::fmt(family, f),
            AccountRead::Mint => f.write_str("Mint"),
        }
    }
}

/// Failure reported by the account-fetch collaborator, before the resolver
/// attributes it to a derivation step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Rpc(String),
}

impl FetchError {
    pub(crate) fn at(self, step: impl Into<AccountRead>, address: Pubkey) -> ResolveError {
        let step = step.into();
        match self {
            FetchError::Timeout(timeout) => ResolveError::UpstreamTimeout {
                step,
                address,
                timeout,
            },
            FetchError::Rpc(message) => ResolveError::Rpc {
                step,
                address,
                message,
            },
        }
    }
}

fn step_label(step: &Option<AccountFamily>) -> String {
    match step {
        Some(family) => family.to_string(),
        None => "ad-hoc address".to_string(),
    }
}
