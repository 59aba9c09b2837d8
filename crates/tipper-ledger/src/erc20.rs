use crate::LedgerError;

/// First four bytes of keccak256("transfer(address,uint256)").
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Parse a 20-byte hex address, with or without the `0x` prefix.
/// Checksum casing is not verified.
pub fn parse_address(raw: &str) -> Result<[u8; 20], LedgerError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(LedgerError::InvalidAddress(raw.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| LedgerError::InvalidAddress(raw.to_string()))?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

/// ABI-encode `transfer(to, amount)` calldata.
pub fn transfer_calldata(to: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&TRANSFER_SELECTOR);

    // address: left-padded to 32 bytes
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to);

    // uint256: big-endian, left-padded
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());

    data
}
