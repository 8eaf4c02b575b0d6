//! Vault error types.

use thiserror::Error;

use crate::derivation::Chain;

/// Errors that can occur during vault operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The operation needs the plaintext mnemonic but the vault is locked
    /// or has never been initialized.
    #[error("vault must be unlocked")]
    MustBeUnlocked,

    /// The operation requires the vault to be at rest. Passphrase rotation
    /// refuses to run while the plaintext mnemonic is held in memory.
    #[error("vault must be locked")]
    MustBeLocked,

    /// The supplied passphrase does not match the stored verifier.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// The cipher rejected the passphrase/ciphertext combination. A wrong
    /// passphrase and tampered or truncated ciphertext are deliberately
    /// indistinguishable.
    #[error("invalid passphrase or corrupted ciphertext")]
    Decryption,

    /// Encrypting the mnemonic failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// No account or derived address matches the lookup key.
    #[error("account not found")]
    AccountNotFound,

    /// The account index falls outside the hardened range `[0, 2^31)`.
    #[error("invalid account index: {0}")]
    InvalidAccountIndex(u32),

    /// Every index on the chain has already been allocated.
    #[error("address space exhausted for account {account} chain {chain}")]
    AddressSpaceExhausted {
        /// Account whose chain ran out.
        account: u32,
        /// Chain that ran out.
        chain: Chain,
    },

    /// The vault already holds an encrypted mnemonic.
    #[error("vault already initialized")]
    AlreadyInitialized,

    /// The phrase is not a valid BIP-39 mnemonic.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// The snapshot violates a vault invariant and was refused.
    #[error("corrupted snapshot: {0}")]
    CorruptedSnapshot(String),
}
