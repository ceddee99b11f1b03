//! Program-derived address derivation.
//!
//! Wraps `Pubkey::try_find_program_address`, which searches bumps downward
//! from 255 and rejects on-curve candidates. The curve check itself is not
//! reimplemented here.

pub mod seeds;

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::error::ResolveError;
use seeds::{AccountFamily, OwnerProgram, SeedInputs, SeedSequence};

/// The three program identities of the deposit call chain, plus the send
/// library the endpoint routes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSet {
    pub vault: Pubkey,
    pub messaging_app: Pubkey,
    pub endpoint: Pubkey,
    pub send_library: Pubkey,
}

impl ProgramSet {
    pub fn owner(&self, owner: OwnerProgram) -> Pubkey {
        match owner {
            OwnerProgram::Vault => self.vault,
            OwnerProgram::MessagingApp => self.messaging_app,
            OwnerProgram::Endpoint => self.endpoint,
        }
    }
}

/// A derived address together with everything that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccount {
    pub family: AccountFamily,
    pub program: Pubkey,
    pub address: Pubkey,
    pub bump: u8,
    pub seeds: SeedSequence,
}

/// Derives `(address, bump)` for `seeds` under `program`.
///
/// Pure: identical inputs always yield the identical result.
pub fn derive(program: &Pubkey, seeds: &SeedSequence) -> Result<(Pubkey, u8), ResolveError> {
    Pubkey::try_find_program_address(&seeds.as_slices(), program).ok_or_else(|| {
        ResolveError::NoValidBumpFound {
            step: None,
            program: *program,
            seeds: seeds.clone(),
        }
    })
}

/// Derives one schema family, drawing its seeds from `inputs`.
pub fn derive_family(
    family: AccountFamily,
    programs: &ProgramSet,
    inputs: &SeedInputs,
) -> Result<DerivedAccount, ResolveError> {
    let layout = family.layout();
    let program = programs.owner(layout.owner);
    let seeds = layout.materialize(inputs)?;

    let (address, bump) = derive(&program, &seeds).map_err(|e| match e {
        ResolveError::NoValidBumpFound { program, seeds, .. } => ResolveError::NoValidBumpFound {
            step: Some(family),
            program,
            seeds,
        },
        other => other,
    })?;

    debug!(
        "Derived {} = {} (bump {}) under {} from seeds {}",
        family, address, bump, program, seeds
    );

    Ok(DerivedAccount {
        family,
        program,
        address,
        bump,
        seeds,
    })
}
