//! Mnemonic encryption at rest.
//!
//! Argon2id key derivation feeding AES-256-GCM. Every encryption draws a
//! fresh salt and nonce, so encrypting the same mnemonic twice yields
//! different ciphertexts.
//!
//! # Wire format
//! ```text
//! salt (32 bytes) || nonce (12 bytes) || ciphertext + auth_tag
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use sha2::{Digest, Sha256};

use crate::error::VaultError;

/// Argon2id parameters (OWASP recommended minimums).
const ARGON2_T_COST: u32 = 3;
const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_PARALLELISM: u32 = 4;

/// Derived key length in bytes.
const KEY_LEN: usize = 32;

/// Salt length in bytes.
const SALT_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Minimum encrypted payload size (salt + nonce + auth tag).
const MIN_ENCRYPTED_LEN: usize = SALT_LEN + NONCE_LEN + 16;

/// Domain tag for the passphrase verifier hash.
const VERIFIER_TAG: &[u8] = b"haze-vault-passphrase-verifier-v1";

/// Derive a 256-bit encryption key from a passphrase and salt with Argon2id.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN], VaultError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_PARALLELISM, Some(KEY_LEN))
        .map_err(|e| VaultError::Encryption(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;
    Ok(key)
}

/// Encrypt plaintext with a passphrase using AES-256-GCM.
///
/// Generates a random 32-byte salt and 12-byte nonce. Returns
/// `salt || nonce || ciphertext+tag`.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, VaultError> {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    let mut result = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt data that was encrypted with [`encrypt`].
///
/// Every failure mode returns [`VaultError::Decryption`]: a wrong
/// passphrase, a tampered ciphertext and a truncated payload are
/// indistinguishable to the caller.
pub fn decrypt(encrypted: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, VaultError> {
    if encrypted.len() < MIN_ENCRYPTED_LEN {
        return Err(VaultError::Decryption);
    }

    let salt = &encrypted[..SALT_LEN];
    let nonce_bytes = &encrypted[SALT_LEN..SALT_LEN + NONCE_LEN];
    let ciphertext = &encrypted[SALT_LEN + NONCE_LEN..];

    let key = derive_key(passphrase, salt).map_err(|_| VaultError::Decryption)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| VaultError::Decryption)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::Decryption)
}

/// One-way passphrase verifier.
///
/// Domain-tagged SHA-256 over the passphrase. Stored next to the
/// ciphertext and used as a fast equality check during passphrase
/// rotation; the AEAD tag on the ciphertext remains the real gate.
pub fn passphrase_hash(passphrase: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(VERIFIER_TAG);
    hasher.update(passphrase);
    hasher.finalize().to_vec()
}
