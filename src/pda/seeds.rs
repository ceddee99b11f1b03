//! Seed layouts for every PDA family touched by a vault deposit.
//!
//! Each family is declared exactly once in [`SEED_SCHEMA`]. Derivation and peer
//! verification both materialize their seeds from this table, so the two call
//! sites cannot drift apart.

use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::error::ResolveError;

// ============================================================================
// SEED LITERALS
// ============================================================================

// Vault program
pub const CONFIG_SEED: &[u8] = b"config";
pub const VAULT_SEED: &[u8] = b"vault";
pub const LP_SEED: &[u8] = b"lp";

// OApp program. Capitalization must match the OApp exactly.
pub const STORE_SEED: &[u8] = b"Store";
pub const PEER_SEED: &[u8] = b"Peer";

// Endpoint program
pub const SEND_LIBRARY_CONFIG_SEED: &[u8] = b"SendLibraryConfig";
pub const MESSAGE_LIB_SEED: &[u8] = b"MessageLib";
pub const NONCE_SEED: &[u8] = b"Nonce";

// ============================================================================
// SCHEMA TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountFamily {
    Config,
    VaultAuthority,
    LiquidityPosition,
    Store,
    Peer,
    SendLibraryConfig,
    DefaultSendLibraryConfig,
    MessageLibInfo,
    Nonce,
}

impl AccountFamily {
    pub const ALL: [AccountFamily; 9] = [
        AccountFamily::Config,
        AccountFamily::VaultAuthority,
        AccountFamily::LiquidityPosition,
        AccountFamily::Store,
        AccountFamily::Peer,
        AccountFamily::SendLibraryConfig,
        AccountFamily::DefaultSendLibraryConfig,
        AccountFamily::MessageLibInfo,
        AccountFamily::Nonce,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AccountFamily::Config => "Config",
            AccountFamily::VaultAuthority => "VaultAuthority",
            AccountFamily::LiquidityPosition => "LiquidityPosition",
            AccountFamily::Store => "Store",
            AccountFamily::Peer => "Peer",
            AccountFamily::SendLibraryConfig => "SendLibraryConfig",
            AccountFamily::DefaultSendLibraryConfig => "DefaultSendLibraryConfig",
            AccountFamily::MessageLibInfo => "MessageLibInfo",
            AccountFamily::Nonce => "Nonce",
        }
    }

    /// Looks up this family's row in [`SEED_SCHEMA`].
    pub fn layout(self) -> &'static SeedLayout {
        // Rows are declared in `AccountFamily::ALL` order.
        &SEED_SCHEMA[self as usize]
    }
}

impl fmt::Display for AccountFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The program that owns (and derives) a family's addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerProgram {
    Vault,
    MessagingApp,
    Endpoint,
}

/// Where one seed's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// A static byte-string literal.
    Literal(&'static [u8]),
    /// The raw 32 bytes of another family's derived address.
    Address(AccountFamily),
    /// The destination endpoint id, big-endian.
    DstEidBe,
    /// The depositing participant's address.
    Participant,
    /// The token mint.
    Mint,
    /// The configured send-library program id.
    SendLibraryProgram,
    /// The remote peer address read from the on-chain peer record.
    PeerAddress,
}

#[derive(Debug)]
pub struct SeedLayout {
    pub family: AccountFamily,
    pub owner: OwnerProgram,
    pub seeds: &'static [SeedSource],
}

pub static SEED_SCHEMA: [SeedLayout; 9] = [
    SeedLayout {
        family: AccountFamily::Config,
        owner: OwnerProgram::Vault,
        seeds: &[SeedSource::Literal(CONFIG_SEED)],
    },
    SeedLayout {
        family: AccountFamily::VaultAuthority,
        owner: OwnerProgram::Vault,
        seeds: &[
            SeedSource::Literal(VAULT_SEED),
            SeedSource::Address(AccountFamily::Config),
        ],
    },
    SeedLayout {
        family: AccountFamily::LiquidityPosition,
        owner: OwnerProgram::Vault,
        seeds: &[
            SeedSource::Literal(LP_SEED),
            SeedSource::Participant,
            SeedSource::Mint,
        ],
    },
    SeedLayout {
        family: AccountFamily::Store,
        owner: OwnerProgram::MessagingApp,
        seeds: &[SeedSource::Literal(STORE_SEED)],
    },
    SeedLayout {
        family: AccountFamily::Peer,
        owner: OwnerProgram::MessagingApp,
        seeds: &[
            SeedSource::Literal(PEER_SEED),
            SeedSource::Address(AccountFamily::Store),
            SeedSource::DstEidBe,
        ],
    },
    SeedLayout {
        family: AccountFamily::SendLibraryConfig,
        owner: OwnerProgram::Endpoint,
        seeds: &[
            SeedSource::Literal(SEND_LIBRARY_CONFIG_SEED),
            SeedSource::Address(AccountFamily::Store),
            SeedSource::DstEidBe,
        ],
    },
    SeedLayout {
        family: AccountFamily::DefaultSendLibraryConfig,
        owner: OwnerProgram::Endpoint,
        seeds: &[
            SeedSource::Literal(SEND_LIBRARY_CONFIG_SEED),
            SeedSource::DstEidBe,
        ],
    },
    SeedLayout {
        family: AccountFamily::MessageLibInfo,
        owner: OwnerProgram::Endpoint,
        seeds: &[
            SeedSource::Literal(MESSAGE_LIB_SEED),
            SeedSource::SendLibraryProgram,
        ],
    },
    SeedLayout {
        family: AccountFamily::Nonce,
        owner: OwnerProgram::Endpoint,
        seeds: &[
            SeedSource::Literal(NONCE_SEED),
            SeedSource::Address(AccountFamily::Store),
            SeedSource::DstEidBe,
            SeedSource::PeerAddress,
        ],
    },
];

// ============================================================================
// SEED INPUTS
// ============================================================================

/// Dynamic values a layout may draw from.
///
/// The resolver stages fill in only what their family's layout needs; a layout
/// asking for a value that was not supplied is reported as invalid input.
#[derive(Debug, Clone, Default)]
pub struct SeedInputs {
    addresses: Vec<(AccountFamily, Pubkey)>,
    dst_eid: Option<u32>,
    participant: Option<Pubkey>,
    mint: Option<Pubkey>,
    send_library_program: Option<Pubkey>,
    peer_address: Option<[u8; 32]>,
}

impl SeedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, family: AccountFamily, address: Pubkey) -> Self {
        self.addresses.push((family, address));
        self
    }

    pub fn with_dst_eid(mut self, dst_eid: u32) -> Self {
        self.dst_eid = Some(dst_eid);
        self
    }

    pub fn with_participant(mut self, participant: Pubkey) -> Self {
        self.participant = Some(participant);
        self
    }

    pub fn with_mint(mut self, mint: Pubkey) -> Self {
        self.mint = Some(mint);
        self
    }

    pub fn with_send_library_program(mut self, program: Pubkey) -> Self {
        self.send_library_program = Some(program);
        self
    }

    pub fn with_peer_address(mut self, peer_address: [u8; 32]) -> Self {
        self.peer_address = Some(peer_address);
        self
    }

    fn address_of(&self, family: AccountFamily) -> Option<&Pubkey> {
        self.addresses
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, address)| address)
    }
}

impl SeedLayout {
    /// Builds the ordered seed byte-strings for this family from `inputs`.
    pub fn materialize(&self, inputs: &SeedInputs) -> Result<SeedSequence, ResolveError> {
        let mut seeds = Vec::with_capacity(self.seeds.len());
        for source in self.seeds {
            let bytes = match source {
                SeedSource::Literal(literal) => literal.to_vec(),
                SeedSource::Address(family) => inputs
                    .address_of(*family)
                    .map(|address| address.to_bytes().to_vec())
                    .ok_or_else(|| self.missing(&format!("{family} address")))?,
                SeedSource::DstEidBe => inputs
                    .dst_eid
                    .map(|eid| eid.to_be_bytes().to_vec())
                    .ok_or_else(|| self.missing("destination endpoint id"))?,
                SeedSource::Participant => inputs
                    .participant
                    .map(|p| p.to_bytes().to_vec())
                    .ok_or_else(|| self.missing("participant address"))?,
                SeedSource::Mint => inputs
                    .mint
                    .map(|m| m.to_bytes().to_vec())
                    .ok_or_else(|| self.missing("mint address"))?,
                SeedSource::SendLibraryProgram => inputs
                    .send_library_program
                    .map(|p| p.to_bytes().to_vec())
                    .ok_or_else(|| self.missing("send library program id"))?,
                SeedSource::PeerAddress => inputs
                    .peer_address
                    .map(|p| p.to_vec())
                    .ok_or_else(|| self.missing("peer address"))?,
            };
            seeds.push(bytes);
        }
        Ok(SeedSequence::new(seeds))
    }

    fn missing(&self, what: &str) -> ResolveError {
        ResolveError::InvalidInput(format!(
            "{} seeds require the {} but it was not supplied",
            self.family, what
        ))
    }
}

// ============================================================================
// SEED SEQUENCE
// ============================================================================

/// An ordered list of seed byte-strings. Order changes the derived address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedSequence(Vec<Vec<u8>>);

impl SeedSequence {
    pub fn new(seeds: Vec<Vec<u8>>) -> Self {
        Self(seeds)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Borrowed slices in the shape `find_program_address` expects.
    pub fn as_slices(&self) -> Vec<&[u8]> {
        self.iter().collect()
    }
}

/// Literal seeds render as quoted strings, everything else as 0x-hex.
impl fmt::Display for SeedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, seed) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if is_literal(seed) {
                write!(f, "\"{}\"", String::from_utf8_lossy(seed))?;
            } else {
                write!(f, "0x{}", hex::encode(seed))?;
            }
        }
        f.write_str("]")
    }
}

fn is_literal(seed: &[u8]) -> bool {
    seed.len() > 1 && seed.len() < 32 && seed.iter().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rows_follow_family_order() {
        for family in AccountFamily::ALL {
            assert_eq!(family.layout().family, family);
        }
    }

    #[test]
    fn test_oapp_literals_are_capitalized() {
        assert_eq!(STORE_SEED, b"Store");
        assert_eq!(PEER_SEED, b"Peer");
    }

    #[test]
    fn test_missing_input_names_the_family() {
        let err = AccountFamily::Peer
            .layout()
            .materialize(&SeedInputs::new().with_dst_eid(1))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Peer"));
        assert!(message.contains("Store address"));
    }

    #[test]
    fn test_seed_sequence_display() {
        let seeds = SeedSequence::new(vec![b"Peer".to_vec(), 40245u32.to_be_bytes().to_vec()]);
        assert_eq!(seeds.to_string(), "[\"Peer\", 0x00009d35]");
    }
}
