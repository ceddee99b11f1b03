//! OApp peer records and peer binding verification.
//!
//! A peer record is written by the OApp when a remote peer is configured for a
//! destination endpoint. Layout:
//!
//! ```text
//! [0, 8)        record-kind tag (Anchor discriminator)
//! [8, 40)       peer address on the destination chain
//! [40, len-1)   enforced options (variable length, not interpreted)
//! [len-1]       bump the OApp derived the record with
//! ```

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::pda::{seeds::AccountFamily, DerivedAccount};

pub const PEER_TAG_LEN: usize = 8;
pub const PEER_ADDRESS_LEN: usize = 32;
const PEER_ADDRESS_END: usize = PEER_TAG_LEN + PEER_ADDRESS_LEN;
/// Tag + peer address + bump, with an empty options section.
pub const MIN_PEER_RECORD_LEN: usize = PEER_ADDRESS_END + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainPeerRecord {
    pub tag: [u8; 8],
    pub peer_address: [u8; 32],
    pub enforced_options: Vec<u8>,
    pub bump: u8,
}

impl OnChainPeerRecord {
    /// Parses raw account data fetched from `address`.
    pub fn parse(address: &Pubkey, data: &[u8]) -> Result<Self, ResolveError> {
        if data.len() < MIN_PEER_RECORD_LEN {
            return Err(ResolveError::MalformedAccount {
                step: AccountFamily::Peer,
                address: *address,
                reason: format!(
                    "{} bytes is shorter than the {} byte minimum (tag + peer address + bump)",
                    data.len(),
                    MIN_PEER_RECORD_LEN
                ),
            });
        }

        let mut tag = [0u8; PEER_TAG_LEN];
        tag.copy_from_slice(&data[..PEER_TAG_LEN]);
        let mut peer_address = [0u8; PEER_ADDRESS_LEN];
        peer_address.copy_from_slice(&data[PEER_TAG_LEN..PEER_ADDRESS_END]);
        let last = data.len() - 1;

        Ok(Self {
            tag,
            peer_address,
            enforced_options: data[PEER_ADDRESS_END..last].to_vec(),
            bump: data[last],
        })
    }

    /// Serializes back to the on-chain layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_PEER_RECORD_LEN + self.enforced_options.len());
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.peer_address);
        out.extend_from_slice(&self.enforced_options);
        out.push(self.bump);
        out
    }
}

/// A peer record that has passed [`PeerBindingVerifier::bind`].
///
/// Only the verifier constructs this, so anything that consumes a
/// `VerifiedPeer` (the nonce derivation in particular) cannot run against an
/// unchecked record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPeer {
    account: DerivedAccount,
    record: OnChainPeerRecord,
}

impl VerifiedPeer {
    pub fn account(&self) -> &DerivedAccount {
        &self.account
    }

    pub fn address(&self) -> Pubkey {
        self.account.address
    }

    pub fn record(&self) -> &OnChainPeerRecord {
        &self.record
    }

    pub fn peer_address(&self) -> [u8; 32] {
        self.record.peer_address
    }
}

pub struct PeerBindingVerifier;

impl PeerBindingVerifier {
    /// Checks that the record fetched from `observed_address` with trailing
    /// bump `observed_bump` is the one `expected` was derived for.
    ///
    /// The OApp re-derives the peer account with the stored bump, so a stored
    /// bump differing from the canonical one fails the address constraint on
    /// chain. The resolver always reads `expected.address`, so for it only the
    /// bump comparison can fail. `observed_address` matters for records read
    /// from some other account (`check-peer --address`): a peer record of a
    /// different store, endpoint id, or seed literal may carry the same bump.
    pub fn verify(
        expected: &DerivedAccount,
        observed_address: &Pubkey,
        observed_bump: u8,
    ) -> Result<(), ResolveError> {
        if expected.address == *observed_address && expected.bump == observed_bump {
            debug!(
                "{} {} bound with bump {}",
                expected.family, expected.address, observed_bump
            );
            return Ok(());
        }

        warn!(
            "{} binding mismatch at {}: expected {} bump {}, stored bump {}",
            expected.family, observed_address, expected.address, expected.bump, observed_bump
        );
        Err(ResolveError::PeerBumpMismatch {
            step: expected.family,
            address: *observed_address,
            expected_address: expected.address,
            expected_bump: expected.bump,
            observed_bump,
            seeds: expected.seeds.clone(),
        })
    }

    /// Verifies `record` against `expected` and seals it as a [`VerifiedPeer`].
    pub fn bind(
        expected: DerivedAccount,
        observed_address: &Pubkey,
        record: OnChainPeerRecord,
    ) -> Result<VerifiedPeer, ResolveError> {
        Self::verify(&expected, observed_address, record.bump)?;
        Ok(VerifiedPeer {
            account: expected,
            record,
        })
    }
}
