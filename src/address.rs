//! Destination-chain address encoding.
//!
//! EVM addresses are 20 bytes; the vault program and the OApp carry them as
//! 32-byte words, left-padded with 12 zero bytes.

use crate::error::ResolveError;

pub const EVM_ADDRESS_LEN: usize = 20;
pub const PADDED_ADDRESS_LEN: usize = 32;
const PADDING_LEN: usize = PADDED_ADDRESS_LEN - EVM_ADDRESS_LEN;

/// Parses a 0x-prefixed (or bare) 40-hex-char EVM address into its 32-byte
/// padded form.
pub fn pad_evm_address(value: &str) -> Result<[u8; 32], ResolveError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    if stripped.len() != EVM_ADDRESS_LEN * 2 {
        return Err(ResolveError::InvalidInput(format!(
            "EVM address must be {} bytes ({} hex chars), got {} hex chars: {}",
            EVM_ADDRESS_LEN,
            EVM_ADDRESS_LEN * 2,
            stripped.len(),
            value
        )));
    }
    let bytes = hex::decode(stripped).map_err(|e| {
        ResolveError::InvalidInput(format!("EVM address is not valid hex ({e}): {value}"))
    })?;
    pad_address_bytes(&bytes)
}

/// Left-pads a raw 20-byte address to 32 bytes.
pub fn pad_address_bytes(bytes: &[u8]) -> Result<[u8; 32], ResolveError> {
    if bytes.len() != EVM_ADDRESS_LEN {
        return Err(ResolveError::InvalidInput(format!(
            "EVM address must be {} bytes, got {}",
            EVM_ADDRESS_LEN,
            bytes.len()
        )));
    }
    let mut out = [0u8; PADDED_ADDRESS_LEN];
    out[PADDING_LEN..].copy_from_slice(bytes);
    Ok(out)
}

/// Recovers the 20-byte address from its padded form. Fails if any of the
/// high 12 bytes is non-zero.
pub fn unpad_evm_address(padded: &[u8; 32]) -> Result<[u8; 20], ResolveError> {
    if padded[..PADDING_LEN].iter().any(|b| *b != 0) {
        return Err(ResolveError::InvalidInput(format!(
            "0x{} is not a left-padded 20-byte address",
            hex::encode(padded)
        )));
    }
    let mut out = [0u8; EVM_ADDRESS_LEN];
    out.copy_from_slice(&padded[PADDING_LEN..]);
    Ok(out)
}
