//! Instruction assembly for the vault program.
//!
//! `deposit_from_user` takes ten named accounts followed by five remaining
//! accounts that the vault forwards to the OApp and the OApp forwards to the
//! endpoint. The endpoint decodes the remaining accounts by position.
//!
//! The admin calls `initialize` and `set_allowed_caller` need only the vault
//! accounts.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use tracing::{debug, warn};

use crate::address::pad_evm_address;
use crate::error::ResolveError;
use crate::resolver::{
    NonceAccount, ResolvedDeposit, ResolvedLpDeposit, SendLibraryAccounts, VaultAccounts,
};

pub const DEPOSIT_FROM_USER_IX: &str = "deposit_from_user";
pub const LP_DEPOSIT_IX: &str = "lp_deposit";
pub const INITIALIZE_IX: &str = "initialize";
pub const SET_ALLOWED_CALLER_IX: &str = "set_allowed_caller";

/// The vault accepts between one and this many mints.
pub const MAX_ALLOWED_MINTS: usize = 3;

/// First 8 bytes of `sha256("global:<name>")`.
pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(b"global:");
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

fn encode<T: BorshSerialize>(name: &str, args: &T) -> Result<Vec<u8>, ResolveError> {
    let mut data = anchor_discriminator(name).to_vec();
    args.serialize(&mut data)
        .map_err(|e| ResolveError::Encode(format!("{name}: {e}")))?;
    Ok(data)
}

// ============================================================================
// FEES
// ============================================================================

/// Per-request fee values supplied on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeOverrides {
    pub native_fee: Option<u64>,
    pub lz_token_fee: Option<u64>,
}

/// Fees as they are encoded. `None` leaves the choice to the vault program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepositFees {
    pub native_fee: Option<u64>,
    pub lz_token_fee: Option<u64>,
}

/// How fee overrides fall back to configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeePolicy {
    pub default_native_fee: Option<u64>,
    pub default_lz_token_fee: Option<u64>,
    pub allow_zero_native_fee: bool,
}

impl FeePolicy {
    /// Applies overrides over defaults.
    ///
    /// An explicit zero native fee is rejected unless `allow_zero_native_fee`
    /// is set; when allowed it is encoded as `None`. A zero LZ token fee is
    /// always encoded as `None`.
    pub fn resolve(&self, overrides: FeeOverrides) -> Result<DepositFees, ResolveError> {
        let native_fee = match overrides.native_fee.or(self.default_native_fee) {
            Some(0) if !self.allow_zero_native_fee => {
                return Err(ResolveError::InvalidInput(
                    "native fee of 0 is not accepted; pass a quoted fee or set \
                     fees.allow_zero_native_fee"
                        .to_string(),
                ))
            }
            Some(0) => None,
            other => other,
        };

        if native_fee.is_none() {
            warn!("No native fee set; the vault program will apply its own default");
        }

        let lz_token_fee = overrides
            .lz_token_fee
            .or(self.default_lz_token_fee)
            .filter(|fee| *fee != 0);

        Ok(DepositFees {
            native_fee,
            lz_token_fee,
        })
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Borsh layout of the `deposit_from_user` argument.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DepositFromUserParams {
    pub amount: u64,
    pub dst_eid: u32,
    pub dst_token: [u8; 32],
    pub merchant: [u8; 32],
    pub options: Option<Vec<u8>>,
    pub native_fee: Option<u64>,
    pub lz_token_fee: Option<u64>,
}

/// A validated cross-chain deposit. Fields are fixed once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChainDepositRequest {
    amount: u64,
    dst_eid: u32,
    dst_token: [u8; 32],
    merchant: [u8; 32],
    options: Option<Vec<u8>>,
    fees: DepositFees,
}

impl CrossChainDepositRequest {
    /// Validates raw input. `dst_token` and `merchant` are 20-byte EVM
    /// addresses in hex.
    pub fn new(
        amount: u64,
        dst_eid: u32,
        dst_token: &str,
        merchant: &str,
        fees: DepositFees,
    ) -> Result<Self, ResolveError> {
        if amount == 0 {
            return Err(ResolveError::InvalidInput(
                "deposit amount must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            amount,
            dst_eid,
            dst_token: pad_evm_address(dst_token)?,
            merchant: pad_evm_address(merchant)?,
            options: None,
            fees,
        })
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn dst_eid(&self) -> u32 {
        self.dst_eid
    }

    pub fn dst_token(&self) -> &[u8; 32] {
        &self.dst_token
    }

    pub fn merchant(&self) -> &[u8; 32] {
        &self.merchant
    }

    pub fn fees(&self) -> DepositFees {
        self.fees
    }

    fn params(&self) -> DepositFromUserParams {
        DepositFromUserParams {
            amount: self.amount,
            dst_eid: self.dst_eid,
            dst_token: self.dst_token,
            merchant: self.merchant,
            options: self.options.clone(),
            native_fee: self.fees.native_fee,
            lz_token_fee: self.fees.lz_token_fee,
        }
    }
}

/// Borsh layout of the `initialize` arguments.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeParams {
    pub allowed_caller_authority: [u8; 32],
    pub allowed_mints: Vec<[u8; 32]>,
}

// ============================================================================
// ACCOUNT LISTS
// ============================================================================

/// The named accounts of `deposit_from_user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryAccounts {
    pub config: Pubkey,
    pub user: Pubkey,
    pub user_token: Pubkey,
    pub vault_authority: Pubkey,
    pub vault_token: Pubkey,
    pub mint: Pubkey,
    pub token_program: Pubkey,
    pub messaging_app_program: Pubkey,
    pub peer: Pubkey,
    pub store: Pubkey,
}

impl PrimaryAccounts {
    pub fn from_resolved(resolved: &ResolvedDeposit) -> Self {
        Self {
            config: resolved.vault.config.address,
            user: resolved.user,
            user_token: resolved.tokens.user_token,
            vault_authority: resolved.vault.vault_authority.address,
            vault_token: resolved.tokens.vault_token,
            mint: resolved.tokens.mint,
            token_program: resolved.tokens.token_program.id(),
            messaging_app_program: resolved.programs.messaging_app,
            peer: resolved.peer.address(),
            store: resolved.oapp.store.address,
        }
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new(self.user_token, false),
            AccountMeta::new_readonly(self.vault_authority, false),
            AccountMeta::new(self.vault_token, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.messaging_app_program, false),
            AccountMeta::new_readonly(self.peer, false),
            AccountMeta::new(self.store, false),
        ]
    }
}

pub const REMAINING_ACCOUNTS_LEN: usize = 5;

/// The accounts forwarded to the endpoint's send path.
///
/// Fields are private and the only constructor takes the resolved stages, so
/// the positional order below cannot be changed by callers:
/// send library program, send library config, default send library config,
/// message lib info, nonce. Only the nonce is writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingAccounts {
    send_library_program: Pubkey,
    send_library_config: Pubkey,
    default_send_library_config: Pubkey,
    message_lib_info: Pubkey,
    nonce: Pubkey,
}

impl RemainingAccounts {
    pub fn new(send_library: &SendLibraryAccounts, nonce: &NonceAccount) -> Self {
        Self {
            send_library_program: send_library.send_library_program,
            send_library_config: send_library.send_library_config.address,
            default_send_library_config: send_library.default_send_library_config.address,
            message_lib_info: send_library.message_lib_info.address,
            nonce: nonce.address(),
        }
    }

    pub fn to_account_metas(&self) -> [AccountMeta; REMAINING_ACCOUNTS_LEN] {
        [
            AccountMeta::new_readonly(self.send_library_program, false),
            AccountMeta::new_readonly(self.send_library_config, false),
            AccountMeta::new_readonly(self.default_send_library_config, false),
            AccountMeta::new_readonly(self.message_lib_info, false),
            AccountMeta::new(self.nonce, false),
        ]
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// An assembled `deposit_from_user` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositInstruction {
    pub program_id: Pubkey,
    pub primary: PrimaryAccounts,
    pub remaining: RemainingAccounts,
    pub data: Vec<u8>,
}

impl DepositInstruction {
    /// Primary accounts followed by the remaining accounts.
    pub fn account_metas(&self) -> Vec<AccountMeta> {
        let mut metas = self.primary.to_account_metas();
        metas.extend(self.remaining.to_account_metas());
        metas
    }

    pub fn to_instruction(&self) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: self.account_metas(),
            data: self.data.clone(),
        }
    }
}

pub struct InstructionAssembler;

impl InstructionAssembler {
    /// Builds `deposit_from_user` from resolved accounts and a validated request.
    ///
    /// The request's destination endpoint must be the one the accounts were
    /// resolved for.
    pub fn assemble_deposit(
        resolved: &ResolvedDeposit,
        request: &CrossChainDepositRequest,
    ) -> Result<DepositInstruction, ResolveError> {
        if request.dst_eid != resolved.oapp.dst_eid {
            return Err(ResolveError::InvalidInput(format!(
                "request targets endpoint {} but accounts were resolved for {}",
                request.dst_eid, resolved.oapp.dst_eid
            )));
        }

        let data = encode(DEPOSIT_FROM_USER_IX, &request.params())?;
        debug!(
            "Encoded {} ({} bytes): {}",
            DEPOSIT_FROM_USER_IX,
            data.len(),
            hex::encode(&data)
        );

        Ok(DepositInstruction {
            program_id: resolved.programs.vault,
            primary: PrimaryAccounts::from_resolved(resolved),
            remaining: RemainingAccounts::new(&resolved.send_library, &resolved.nonce),
            data,
        })
    }

    /// Builds `lp_deposit(amount)`.
    pub fn assemble_lp_deposit(
        resolved: &ResolvedLpDeposit,
        amount: u64,
    ) -> Result<Instruction, ResolveError> {
        if amount == 0 {
            return Err(ResolveError::InvalidInput(
                "deposit amount must be greater than 0".to_string(),
            ));
        }

        Ok(Instruction {
            program_id: resolved.vault_program,
            accounts: vec![
                AccountMeta::new_readonly(resolved.vault.config.address, false),
                AccountMeta::new(resolved.user, true),
                AccountMeta::new(resolved.liquidity_position.address, false),
                AccountMeta::new(resolved.tokens.user_token, false),
                AccountMeta::new_readonly(resolved.vault.vault_authority.address, false),
                AccountMeta::new(resolved.tokens.vault_token, false),
                AccountMeta::new_readonly(resolved.tokens.mint, false),
                AccountMeta::new_readonly(resolved.tokens.token_program.id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: encode(LP_DEPOSIT_IX, &amount)?,
        })
    }

    /// Builds `initialize(allowed_caller, allowed_mints)` with `admin` as the
    /// paying signer.
    ///
    /// `mints` must hold between 1 and [`MAX_ALLOWED_MINTS`] distinct mints.
    pub fn assemble_initialize(
        vault_program: &Pubkey,
        vault: &VaultAccounts,
        admin: &Pubkey,
        allowed_caller: &Pubkey,
        mints: &[Pubkey],
    ) -> Result<Instruction, ResolveError> {
        if mints.is_empty() || mints.len() > MAX_ALLOWED_MINTS {
            return Err(ResolveError::InvalidInput(format!(
                "between 1 and {MAX_ALLOWED_MINTS} allowed mints are required, got {}",
                mints.len()
            )));
        }
        if let Some((i, dup)) = mints
            .iter()
            .enumerate()
            .find(|(i, mint)| mints[..*i].contains(mint))
        {
            return Err(ResolveError::InvalidInput(format!(
                "mint {dup} is listed twice (position {i})"
            )));
        }

        let params = InitializeParams {
            allowed_caller_authority: allowed_caller.to_bytes(),
            allowed_mints: mints.iter().map(|mint| mint.to_bytes()).collect(),
        };

        Ok(Instruction {
            program_id: *vault_program,
            accounts: vec![
                AccountMeta::new(vault.config.address, false),
                AccountMeta::new_readonly(vault.vault_authority.address, false),
                AccountMeta::new(*admin, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: encode(INITIALIZE_IX, &params)?,
        })
    }

    /// Builds `set_allowed_caller(new_allowed_caller)`. Only the admin
    /// recorded in the config may sign it.
    pub fn assemble_set_allowed_caller(
        vault_program: &Pubkey,
        vault: &VaultAccounts,
        admin: &Pubkey,
        new_allowed_caller: &Pubkey,
    ) -> Result<Instruction, ResolveError> {
        Ok(Instruction {
            program_id: *vault_program,
            accounts: vec![
                AccountMeta::new(vault.config.address, false),
                AccountMeta::new(*admin, true),
            ],
            data: encode(SET_ALLOWED_CALLER_IX, &new_allowed_caller.to_bytes())?,
        })
    }
}
