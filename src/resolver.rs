//! Account resolution for a cross-chain vault deposit.
//!
//! Resolution is a fixed pipeline of typed stages. Each stage takes the stages
//! it depends on as arguments, so a derivation cannot run before its seed
//! material exists:
//!
//! ```text
//! VaultAccounts (Config -> VaultAuthority)
//! OAppAccounts  (Store -> Peer)
//!     -> SendLibraryAccounts (SendLibraryConfig, DefaultSendLibraryConfig, MessageLibInfo)
//!     -> fetch + verify peer record -> VerifiedPeer
//!         -> NonceAccount
//! ```

use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tracing::info;

use crate::error::{AccountRead, ResolveError};
use crate::instruction::{CrossChainDepositRequest, DepositInstruction, InstructionAssembler};
use crate::pda::{
    derive_family,
    seeds::{AccountFamily, SeedInputs},
    DerivedAccount, ProgramSet,
};
use crate::peer::{OnChainPeerRecord, PeerBindingVerifier, VerifiedPeer};
use crate::svm_client::AccountFetcher;
use crate::token::{associated_token_address, TokenProgram};

// ============================================================================
// PIPELINE STAGES
// ============================================================================

/// Vault program accounts shared by every vault instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAccounts {
    pub config: DerivedAccount,
    pub vault_authority: DerivedAccount,
}

impl VaultAccounts {
    pub fn derive(programs: &ProgramSet) -> Result<Self, ResolveError> {
        let config = derive_family(AccountFamily::Config, programs, &SeedInputs::new())?;
        let vault_authority = derive_family(
            AccountFamily::VaultAuthority,
            programs,
            &SeedInputs::new().with_address(AccountFamily::Config, config.address),
        )?;
        Ok(Self {
            config,
            vault_authority,
        })
    }
}

/// OApp accounts for one destination endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAppAccounts {
    pub dst_eid: u32,
    pub store: DerivedAccount,
    pub peer: DerivedAccount,
}

impl OAppAccounts {
    pub fn derive(programs: &ProgramSet, dst_eid: u32) -> Result<Self, ResolveError> {
        let store = derive_family(AccountFamily::Store, programs, &SeedInputs::new())?;
        let peer = derive_family(
            AccountFamily::Peer,
            programs,
            &SeedInputs::new()
                .with_address(AccountFamily::Store, store.address)
                .with_dst_eid(dst_eid),
        )?;
        Ok(Self {
            dst_eid,
            store,
            peer,
        })
    }
}

/// Endpoint accounts selecting the send library for (store, dst_eid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendLibraryAccounts {
    pub send_library_program: Pubkey,
    pub send_library_config: DerivedAccount,
    pub default_send_library_config: DerivedAccount,
    pub message_lib_info: DerivedAccount,
}

impl SendLibraryAccounts {
    pub fn derive(programs: &ProgramSet, oapp: &OAppAccounts) -> Result<Self, ResolveError> {
        let inputs = SeedInputs::new()
            .with_address(AccountFamily::Store, oapp.store.address)
            .with_dst_eid(oapp.dst_eid)
            .with_send_library_program(programs.send_library);

        Ok(Self {
            send_library_program: programs.send_library,
            send_library_config: derive_family(AccountFamily::SendLibraryConfig, programs, &inputs)?,
            default_send_library_config: derive_family(
                AccountFamily::DefaultSendLibraryConfig,
                programs,
                &inputs,
            )?,
            message_lib_info: derive_family(AccountFamily::MessageLibInfo, programs, &inputs)?,
        })
    }
}

/// The endpoint's outbound nonce for (store, dst_eid, peer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceAccount(pub DerivedAccount);

impl NonceAccount {
    pub fn derive(
        programs: &ProgramSet,
        oapp: &OAppAccounts,
        peer: &VerifiedPeer,
    ) -> Result<Self, ResolveError> {
        derive_family(
            AccountFamily::Nonce,
            programs,
            &SeedInputs::new()
                .with_address(AccountFamily::Store, oapp.store.address)
                .with_dst_eid(oapp.dst_eid)
                .with_peer_address(peer.peer_address()),
        )
        .map(NonceAccount)
    }

    pub fn address(&self) -> Pubkey {
        self.0.address
    }
}

/// The participant's and the vault's token accounts for one mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccounts {
    pub mint: Pubkey,
    pub token_program: TokenProgram,
    pub user_token: Pubkey,
    pub vault_token: Pubkey,
}

impl TokenAccounts {
    pub fn derive(
        user: &Pubkey,
        mint: &Pubkey,
        token_program: TokenProgram,
        vault: &VaultAccounts,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            mint: *mint,
            token_program,
            user_token: associated_token_address(user, mint, token_program)?,
            vault_token: associated_token_address(
                &vault.vault_authority.address,
                mint,
                token_program,
            )?,
        })
    }
}

// ============================================================================
// RESOLVED OUTPUTS
// ============================================================================

/// Per-request inputs to deposit resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositContext {
    pub user: Pubkey,
    pub mint: Pubkey,
    pub token_program: TokenProgram,
    pub dst_eid: u32,
}

/// Every account the deposit call chain needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeposit {
    pub programs: ProgramSet,
    pub user: Pubkey,
    pub vault: VaultAccounts,
    pub tokens: TokenAccounts,
    pub oapp: OAppAccounts,
    pub send_library: SendLibraryAccounts,
    pub peer: VerifiedPeer,
    pub nonce: NonceAccount,
}

/// Accounts for an LP deposit. No on-chain reads are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLpDeposit {
    pub vault_program: Pubkey,
    pub user: Pubkey,
    pub vault: VaultAccounts,
    pub tokens: TokenAccounts,
    pub liquidity_position: DerivedAccount,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Derives and verifies the deposit account set.
///
/// Holds no mutable state; concurrent `resolve` calls are independent. The
/// single peer read is bounded by `fetch_timeout` and never retried here.
pub struct ChainAccountResolver<F> {
    programs: ProgramSet,
    fetcher: F,
    fetch_timeout: Duration,
}

impl<F: AccountFetcher> ChainAccountResolver<F> {
    pub fn new(programs: ProgramSet, fetcher: F, fetch_timeout: Duration) -> Self {
        Self {
            programs,
            fetcher,
            fetch_timeout,
        }
    }

    pub fn programs(&self) -> &ProgramSet {
        &self.programs
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn resolve(&self, ctx: &DepositContext) -> Result<ResolvedDeposit, ResolveError> {
        info!(
            "Resolving deposit accounts: user={}, mint={}, dst_eid={}",
            ctx.user, ctx.mint, ctx.dst_eid
        );

        let vault = VaultAccounts::derive(&self.programs)?;
        let tokens = TokenAccounts::derive(&ctx.user, &ctx.mint, ctx.token_program, &vault)?;
        let oapp = OAppAccounts::derive(&self.programs, ctx.dst_eid)?;
        let send_library = SendLibraryAccounts::derive(&self.programs, &oapp)?;

        let peer = self.fetch_verified_peer(&oapp).await?;
        let nonce = NonceAccount::derive(&self.programs, &oapp, &peer)?;

        info!(
            "Resolved deposit accounts: peer={}, store={}, nonce={}",
            peer.address(),
            oapp.store.address,
            nonce.address()
        );

        Ok(ResolvedDeposit {
            programs: self.programs,
            user: ctx.user,
            vault,
            tokens,
            oapp,
            send_library,
            peer,
            nonce,
        })
    }

    /// Detects the mint's token program, resolves every account and assembles
    /// `deposit_from_user` for an already validated `request`.
    ///
    /// Taking the validated request means bad amounts, fees, or addresses are
    /// rejected before any on-chain read.
    pub async fn prepare_deposit(
        &self,
        user: &Pubkey,
        mint: &Pubkey,
        request: &CrossChainDepositRequest,
    ) -> Result<(ResolvedDeposit, DepositInstruction), ResolveError> {
        let token_program = self.detect_token_program(mint).await?;
        let ctx = DepositContext {
            user: *user,
            mint: *mint,
            token_program,
            dst_eid: request.dst_eid(),
        };
        let resolved = self.resolve(&ctx).await?;
        let ix = InstructionAssembler::assemble_deposit(&resolved, request)?;
        Ok((resolved, ix))
    }

    /// Reads the peer record for `oapp.peer` and checks its binding.
    pub async fn fetch_verified_peer(
        &self,
        oapp: &OAppAccounts,
    ) -> Result<VerifiedPeer, ResolveError> {
        let record = self.fetch_peer_record(&oapp.peer).await?;
        PeerBindingVerifier::bind(oapp.peer.clone(), &oapp.peer.address, record)
    }

    /// Reads and parses the peer record without verifying it.
    pub async fn fetch_peer_record(
        &self,
        peer: &DerivedAccount,
    ) -> Result<OnChainPeerRecord, ResolveError> {
        self.fetch_peer_record_at(peer, peer.address).await
    }

    /// Reads a peer record from `address`, which may differ from the derived
    /// `peer` account when an operator inspects a record found elsewhere.
    pub async fn fetch_peer_record_at(
        &self,
        peer: &DerivedAccount,
        address: Pubkey,
    ) -> Result<OnChainPeerRecord, ResolveError> {
        let fetch = self.fetcher.fetch_account(&address);
        let account = tokio::time::timeout(self.fetch_timeout, fetch)
            .await
            .map_err(|_| ResolveError::UpstreamTimeout {
                step: AccountFamily::Peer.into(),
                address,
                timeout: self.fetch_timeout,
            })?
            .map_err(|e| e.at(AccountFamily::Peer, address))?
            .ok_or_else(|| ResolveError::AccountNotFound {
                step: AccountFamily::Peer,
                address,
                seeds: peer.seeds.clone(),
            })?;

        OnChainPeerRecord::parse(&address, &account.data)
    }

    /// Chooses the token program from the owner of the mint account.
    ///
    /// A missing mint or a mint owned by neither token program is bad input.
    /// Timeouts and RPC failures keep their transport meaning so callers can
    /// retry them.
    pub async fn detect_token_program(&self, mint: &Pubkey) -> Result<TokenProgram, ResolveError> {
        let account = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_account(mint))
            .await
            .map_err(|_| ResolveError::UpstreamTimeout {
                step: AccountRead::Mint,
                address: *mint,
                timeout: self.fetch_timeout,
            })?
            .map_err(|e| e.at(AccountRead::Mint, *mint))?
            .ok_or_else(|| ResolveError::InvalidInput(format!("Mint {mint} not found on-chain")))?;

        let token_program = TokenProgram::from_mint_owner(mint, &account.owner)?;
        info!("Mint {} uses token program {}", mint, token_program.id());
        Ok(token_program)
    }

    /// Resolves the LP deposit accounts for `user` and `mint`.
    pub fn resolve_lp(
        &self,
        user: &Pubkey,
        mint: &Pubkey,
        token_program: TokenProgram,
    ) -> Result<ResolvedLpDeposit, ResolveError> {
        resolve_lp_deposit(&self.programs, user, mint, token_program)
    }
}

pub fn resolve_lp_deposit(
    programs: &ProgramSet,
    user: &Pubkey,
    mint: &Pubkey,
    token_program: TokenProgram,
) -> Result<ResolvedLpDeposit, ResolveError> {
    let vault = VaultAccounts::derive(programs)?;
    let tokens = TokenAccounts::derive(user, mint, token_program, &vault)?;
    let liquidity_position = derive_family(
        AccountFamily::LiquidityPosition,
        programs,
        &SeedInputs::new().with_participant(*user).with_mint(*mint),
    )?;

    Ok(ResolvedLpDeposit {
        vault_program: programs.vault,
        user: *user,
        vault,
        tokens,
        liquidity_position,
    })
}
