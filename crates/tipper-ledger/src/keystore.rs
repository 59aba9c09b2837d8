//! Web3 Secret Storage (V3 keystore) decryption.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::LedgerError;
use crate::erc20::{format_address, parse_address};
use crate::signer::LocalSigner;
use crate::tx::keccak256;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

#[derive(Deserialize)]
struct KeystoreFile {
    address: Option<String>,
    #[serde(alias = "Crypto")]
    crypto: CryptoSection,
}

#[derive(Deserialize)]
struct CryptoSection {
    cipher: String,
    cipherparams: CipherParams,
    ciphertext: String,
    kdf: String,
    kdfparams: KdfParams,
    mac: String,
}

#[derive(Deserialize)]
struct CipherParams {
    iv: String,
}

/// Union of the scrypt (`n`, `r`, `p`) and pbkdf2 (`c`, `prf`) parameters.
#[derive(Deserialize)]
struct KdfParams {
    dklen: usize,
    salt: String,
    n: Option<u64>,
    r: Option<u32>,
    p: Option<u32>,
    c: Option<u32>,
    prf: Option<String>,
}

fn invalid(reason: impl Into<String>) -> LedgerError {
    LedgerError::Keystore(reason.into())
}

fn unhex(field: &str, raw: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(raw.trim_start_matches("0x")).map_err(|_| invalid(format!("`{}` is not hex", field)))
}

/// Decrypt keystore JSON into an in-process signer.
///
/// Fails on a wrong passphrase, an unsupported cipher or KDF, or when the
/// decrypted key does not belong to the keystore's declared address.
pub fn decrypt(key_json: &SecretString, passphrase: &SecretString) -> Result<LocalSigner, LedgerError> {
    let file: KeystoreFile =
        serde_json::from_str(key_json.expose_secret()).map_err(|e| invalid(e.to_string()))?;
    let crypto = file.crypto;

    if crypto.cipher != "aes-128-ctr" {
        return Err(invalid(format!("unsupported cipher `{}`", crypto.cipher)));
    }

    let params = &crypto.kdfparams;
    if params.dklen < 32 {
        return Err(invalid("derived key shorter than 32 bytes"));
    }
    let salt = unhex("salt", &params.salt)?;
    let password = passphrase.expose_secret().as_bytes();
    let mut derived = Zeroizing::new(vec![0u8; params.dklen]);

    match crypto.kdf.as_str() {
        "scrypt" => {
            let (Some(n), Some(r), Some(p)) = (params.n, params.r, params.p) else {
                return Err(invalid("scrypt parameters incomplete"));
            };
            if !n.is_power_of_two() || n < 2 {
                return Err(invalid(format!("scrypt n={} is not a power of two", n)));
            }
            let params = scrypt::Params::new(n.trailing_zeros() as u8, r, p, params.dklen)
                .map_err(|e| invalid(format!("scrypt parameters rejected: {}", e)))?;
            scrypt::scrypt(password, &salt, &params, &mut derived)
                .map_err(|e| invalid(format!("scrypt failed: {}", e)))?;
        }
        "pbkdf2" => {
            if params.prf.as_deref() != Some("hmac-sha256") {
                return Err(invalid("pbkdf2 needs prf hmac-sha256"));
            }
            let rounds = params.c.ok_or_else(|| invalid("pbkdf2 iteration count missing"))?;
            pbkdf2::pbkdf2_hmac::<Sha256>(password, &salt, rounds, &mut derived);
        }
        other => return Err(invalid(format!("unsupported kdf `{}`", other))),
    }

    let ciphertext = unhex("ciphertext", &crypto.ciphertext)?;
    let expected_mac = unhex("mac", &crypto.mac)?;
    let mac = keccak256(&[&derived[16..32], ciphertext.as_slice()].concat());
    if mac.as_slice() != expected_mac.as_slice() {
        return Err(invalid("wrong passphrase or corrupt keystore"));
    }

    let iv = unhex("iv", &crypto.cipherparams.iv)?;
    let mut secret = Zeroizing::new(ciphertext);
    Aes128Ctr::new_from_slices(&derived[..16], &iv)
        .map_err(|_| invalid("iv must be 16 bytes"))?
        .apply_keystream(&mut secret);

    let signer = LocalSigner::from_slice(&secret)?;

    if let Some(declared) = file.address {
        let declared = parse_address(&declared)
            .map_err(|_| invalid(format!("bad address `{}`", declared)))?;
        if &declared != signer.address() {
            return Err(invalid(format!(
                "key belongs to {}, keystore says {}",
                format_address(signer.address()),
                format_address(&declared)
            )));
        }
    }

    Ok(signer)
}
