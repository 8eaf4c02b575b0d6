//! # haze-vault — the daemon's wallet core.
//!
//! A single deterministic wallet whose master secret (a BIP-39 mnemonic)
//! is held encrypted at rest and decrypted into memory only between an
//! explicit unlock and lock. Provides per-account derivation bookkeeping,
//! deterministic confidential address derivation with private blinding
//! keys, and a lossless persistence snapshot.
//!
//! # Modules
//!
//! - [`error`] — `VaultError` enum
//! - [`mnemonic`] — BIP-39 phrase wrapper, zeroized on drop
//! - [`secret`] — lifecycle-scoped holder for the decrypted mnemonic
//! - [`encryption`] — Argon2id + AES-256-GCM encryption at rest
//! - [`derivation`] — typed derivation paths and chains
//! - [`hd`] — BLAKE3 key tree: spend keys, blinding keys, addresses
//! - [`account`] — chain counters and the script reverse index
//! - [`vault`] — the lockable aggregate tying it all together
//! - [`snapshot`] — persistence shape with invariant validation

pub mod account;
pub mod derivation;
pub mod encryption;
pub mod error;
pub mod hd;
pub mod mnemonic;
pub mod secret;
pub mod snapshot;
pub mod vault;

// Re-exports for convenient access
pub use account::Account;
pub use derivation::{Chain, DerivationPath, PathError, HARDENED_OFFSET, MAX_INDEX};
pub use encryption::{decrypt, encrypt};
pub use error::VaultError;
pub use hd::{DerivedAddress, HdKeys};
pub use mnemonic::Mnemonic;
pub use secret::SecretStore;
pub use snapshot::{AccountSnapshot, VaultSnapshot};
pub use vault::{AddressEntry, AddressInfo, Vault};
