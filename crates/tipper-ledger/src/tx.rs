use sha3::{Digest, Keccak256};

/// secp256k1 signature over a 32-byte hash, with the recovery bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

/// Pre-EIP-1559 transaction, signed with EIP-155 replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u128,
    pub gas_price: u128,
    pub gas: u128,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_uint(self.nonce),
            rlp_uint(self.gas_price),
            rlp_uint(self.gas),
            rlp_bytes(&self.to),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
        ]
    }

    /// RLP of the six fields followed by `chain_id, 0, 0`.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut fields = self.fields();
        fields.push(rlp_uint(chain_id.into()));
        fields.push(rlp_uint(0));
        fields.push(rlp_uint(0));
        rlp_list(&fields)
    }

    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        keccak256(&self.signing_payload(chain_id))
    }

    /// Raw bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, chain_id: u64, signature: &RecoverableSignature) -> Vec<u8> {
        let v = u128::from(signature.recovery_id) + u128::from(chain_id) * 2 + 35;

        let mut fields = self.fields();
        fields.push(rlp_uint(v));
        fields.push(rlp_bytes(strip_leading_zeros(&signature.r)));
        fields.push(rlp_bytes(strip_leading_zeros(&signature.s)));
        rlp_list(&fields)
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn rlp_uint(value: u128) -> Vec<u8> {
    rlp_bytes(strip_leading_zeros(&value.to_be_bytes()))
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if let [single] = bytes {
        if *single < 0x80 {
            return vec![*single];
        }
    }
    let mut out = length_prefix(bytes.len(), 0x80);
    out.extend_from_slice(bytes);
    out
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut out = length_prefix(payload.len(), 0xc0);
    out.extend_from_slice(&payload);
    out
}

fn length_prefix(len: usize, offset: u8) -> Vec<u8> {
    if len <= 55 {
        return vec![offset + len as u8];
    }
    let len_bytes = (len as u64).to_be_bytes();
    let len_bytes = strip_leading_zeros(&len_bytes);
    let mut out = vec![offset + 55 + len_bytes.len() as u8];
    out.extend_from_slice(len_bytes);
    out
}
