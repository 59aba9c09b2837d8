use std::fmt;

use k256::ecdsa::SigningKey;

use crate::LedgerError;
use crate::erc20::format_address;
use crate::tx::{RecoverableSignature, keccak256};

/// secp256k1 key held in process. Only the derived address is ever printed.
pub struct LocalSigner {
    key: SigningKey,
    address: [u8; 20],
}

impl LocalSigner {
    pub fn from_slice(secret: &[u8]) -> Result<Self, LedgerError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|_| LedgerError::Keystore("not a valid secp256k1 private key".into()))?;

        let point = key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);

        Ok(Self { key, address })
    }

    pub fn address(&self) -> &[u8; 20] {
        &self.address
    }

    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<RecoverableSignature, LedgerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash)
            .map_err(|e| LedgerError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &format_address(&self.address))
            .finish_non_exhaustive()
    }
}
