//! Client library for vault deposits routed through a LayerZero OApp
//!
//! Derives every program-derived address the vault -> OApp -> endpoint call
//! chain needs, verifies the on-chain peer link, and assembles the ordered
//! account lists for the top-level instruction.

pub mod address;
pub mod config;
pub mod error;
pub mod instruction;
pub mod keys;
pub mod pda;
pub mod peer;
pub mod resolver;
pub mod svm_client;
pub mod token;

// Re-export public types for convenience
pub use address::{pad_evm_address, unpad_evm_address};
pub use config::Config;
pub use error::{AccountRead, FetchError, ResolveError};
pub use instruction::{
    CrossChainDepositRequest, DepositFees, DepositInstruction, FeeOverrides, FeePolicy,
    InstructionAssembler, PrimaryAccounts, RemainingAccounts,
};
pub use pda::{derive, derive_family, seeds::AccountFamily, DerivedAccount, ProgramSet};
pub use peer::{OnChainPeerRecord, PeerBindingVerifier, VerifiedPeer};
pub use resolver::{ChainAccountResolver, DepositContext, ResolvedDeposit, ResolvedLpDeposit};
pub use svm_client::{AccountFetcher, RawAccount, SvmClient, TransactionSubmitter};
pub use token::TokenProgram;
