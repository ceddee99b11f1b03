//! Token program identities and associated token account derivation.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program,
};

use crate::error::ResolveError;
use crate::pda::{self, seeds::SeedSequence};

// Well-known program IDs from Solana mainnet/devnet docs.
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Associated token program instruction index for `CreateIdempotent`.
const CREATE_IDEMPOTENT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProgram {
    Spl,
    Token2022,
}

impl TokenProgram {
    pub fn id(self) -> Pubkey {
        match self {
            TokenProgram::Spl => TOKEN_PROGRAM_ID,
            TokenProgram::Token2022 => TOKEN_2022_PROGRAM_ID,
        }
    }

    /// Picks the token program from the owner of a mint account.
    pub fn from_mint_owner(mint: &Pubkey, owner: &Pubkey) -> Result<Self, ResolveError> {
        if *owner == TOKEN_2022_PROGRAM_ID {
            Ok(TokenProgram::Token2022)
        } else if *owner == TOKEN_PROGRAM_ID {
            Ok(TokenProgram::Spl)
        } else {
            Err(ResolveError::InvalidInput(format!(
                "Mint {mint} is owned by {owner}, which is not a token program"
            )))
        }
    }
}

/// Derives the associated token account for `owner` and `mint`.
///
/// Seeds: `[owner, token_program, mint]` under the associated token program.
/// Off-curve owners (PDAs such as the vault authority) are allowed.
pub fn associated_token_address(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: TokenProgram,
) -> Result<Pubkey, ResolveError> {
    let seeds = SeedSequence::new(vec![
        owner.to_bytes().to_vec(),
        token_program.id().to_bytes().to_vec(),
        mint.to_bytes().to_vec(),
    ]);
    pda::derive(&ASSOCIATED_TOKEN_PROGRAM_ID, &seeds).map(|(address, _)| address)
}

/// Builds an idempotent CreateAssociatedTokenAccount instruction.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: TokenProgram,
) -> Result<Instruction, ResolveError> {
    let ata = associated_token_address(owner, mint, token_program)?;

    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(token_program.id(), false),
        ],
        data: vec![CREATE_IDEMPOTENT],
    })
}
