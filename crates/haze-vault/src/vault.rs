//! The vault: a lockable store for one HD wallet's master secret and its
//! derivation bookkeeping.
//!
//! The [`Vault`] struct ties together the encrypted mnemonic, the
//! passphrase verifier, per-account chain counters and the reverse indexes
//! for derived addresses. Operations that touch the plaintext mnemonic
//! require an explicit unlock; lookups and listings work on cached state
//! even while locked.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use haze_core::address::{ConfidentialAddress, Network};

use crate::account::Account;
use crate::derivation::{Chain, DerivationPath};
use crate::encryption;
use crate::error::VaultError;
use crate::hd::HdKeys;
use crate::mnemonic::Mnemonic;
use crate::secret::SecretStore;

/// Reverse-index entry for one derived address.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct AddressEntry {
    /// Account the address belongs to.
    pub account_index: u32,
    /// Private blinding key for outputs paying the address.
    pub blinding_key: Vec<u8>,
}

impl fmt::Debug for AddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressEntry")
            .field("account_index", &self.account_index)
            .field("blinding_key", &"[REDACTED]")
            .finish()
    }
}

/// Projection of one derived address handed to callers.
#[derive(Clone, PartialEq, Eq)]
pub struct AddressInfo {
    /// Account the address belongs to.
    pub account_index: u32,
    /// Encoded confidential address.
    pub address: String,
    /// Hex-encoded output script.
    pub script: String,
    /// Private blinding key for outputs paying the address.
    pub blinding_key: Vec<u8>,
    /// Path string, e.g. `"0'/0/14"`.
    pub derivation_path: String,
}

impl fmt::Debug for AddressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressInfo")
            .field("account_index", &self.account_index)
            .field("address", &self.address)
            .field("script", &self.script)
            .field("blinding_key", &"[REDACTED]")
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}

/// Lockable HD wallet state for the daemon.
///
/// Holds the mnemonic encrypted at rest, tracks accounts and their chain
/// counters, and derives confidential addresses with their private
/// blinding keys. The plaintext mnemonic lives only in the secret store
/// between [`unlock`](Vault::unlock) and [`lock`](Vault::lock).
pub struct Vault {
    pub(crate) encrypted_mnemonic: Vec<u8>,
    pub(crate) passphrase_hash: Vec<u8>,
    pub(crate) network: Network,
    /// Accounts by index.
    pub(crate) accounts: HashMap<u32, Account>,
    /// Reverse lookup: encoded address -> owning account and blinding key.
    pub(crate) address_index: HashMap<String, AddressEntry>,
    pub(crate) secret: SecretStore,
}

impl Vault {
    /// Create an empty, uninitialized vault.
    pub fn new(network: Network) -> Self {
        Self {
            encrypted_mnemonic: Vec::new(),
            passphrase_hash: Vec::new(),
            network,
            accounts: HashMap::new(),
            address_index: HashMap::new(),
            secret: SecretStore::new(),
        }
    }

    /// Create an initialized vault from a mnemonic and passphrase.
    ///
    /// Encrypts the phrase, stores the passphrase verifier and leaves the
    /// vault unlocked with the mnemonic in the secret store.
    pub fn create(mnemonic: Mnemonic, passphrase: &str, network: Network) -> Result<Self, VaultError> {
        let mut phrase = mnemonic.phrase();
        let encrypted = encryption::encrypt(phrase.as_bytes(), passphrase.as_bytes());
        phrase.zeroize();

        let mut vault = Self::new(network);
        vault.encrypted_mnemonic = encrypted?;
        vault.passphrase_hash = encryption::passphrase_hash(passphrase.as_bytes());
        vault.secret.set(mnemonic);
        tracing::info!("created vault for network {:?}", network);
        Ok(vault)
    }

    /// Adopt pre-encrypted material produced elsewhere. The vault stays
    /// locked; the mnemonic surfaces only after [`unlock`](Vault::unlock).
    ///
    /// Fails with [`VaultError::AlreadyInitialized`] once material is held.
    pub fn initialize(
        &mut self,
        encrypted_mnemonic: Vec<u8>,
        passphrase_hash: Vec<u8>,
    ) -> Result<(), VaultError> {
        if self.is_initialized() {
            return Err(VaultError::AlreadyInitialized);
        }
        self.encrypted_mnemonic = encrypted_mnemonic;
        self.passphrase_hash = passphrase_hash;
        Ok(())
    }

    /// True once the vault holds an encrypted mnemonic.
    pub fn is_initialized(&self) -> bool {
        !self.encrypted_mnemonic.is_empty()
    }

    /// True while the plaintext mnemonic is unavailable. An uninitialized
    /// vault reports locked.
    pub fn is_locked(&self) -> bool {
        !self.is_initialized() || !self.secret.is_set()
    }

    /// The network addresses are encoded for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The mnemonic ciphertext (for backup and persistence).
    pub fn encrypted_mnemonic(&self) -> &[u8] {
        &self.encrypted_mnemonic
    }

    /// The stored passphrase verifier.
    pub fn passphrase_hash(&self) -> &[u8] {
        &self.passphrase_hash
    }

    /// Decrypt the mnemonic into the secret store. No-op when already
    /// unlocked, so the passphrase is not re-checked in that case.
    pub fn unlock(&mut self, passphrase: &str) -> Result<(), VaultError> {
        if !self.is_locked() {
            return Ok(());
        }
        let plaintext = encryption::decrypt(&self.encrypted_mnemonic, passphrase.as_bytes())?;
        let mut phrase = String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)?;
        let mnemonic = Mnemonic::from_phrase(&phrase);
        phrase.zeroize();
        self.secret.set(mnemonic?);
        tracing::debug!("vault unlocked");
        Ok(())
    }

    /// Drop the plaintext mnemonic. No-op when already locked; never fails.
    pub fn lock(&mut self) {
        if self.secret.is_set() {
            self.secret.unset();
            tracing::debug!("vault locked");
        }
    }

    /// Re-encrypt the mnemonic under a new passphrase.
    ///
    /// Only allowed while locked, so a rotation can never race an open
    /// session holding the plaintext. Checks the verifier first, then the
    /// ciphertext itself; the stored material changes only after the
    /// re-encryption succeeded.
    pub fn change_passphrase(&mut self, current: &str, new: &str) -> Result<(), VaultError> {
        if !self.is_locked() {
            return Err(VaultError::MustBeLocked);
        }
        if encryption::passphrase_hash(current.as_bytes()) != self.passphrase_hash {
            return Err(VaultError::InvalidPassphrase);
        }

        let mut plaintext = encryption::decrypt(&self.encrypted_mnemonic, current.as_bytes())?;
        let reencrypted = encryption::encrypt(&plaintext, new.as_bytes());
        plaintext.zeroize();

        self.encrypted_mnemonic = reencrypted?;
        self.passphrase_hash = encryption::passphrase_hash(new.as_bytes());
        tracing::info!("vault passphrase rotated");
        Ok(())
    }

    /// Borrow the plaintext mnemonic. Fails while locked.
    pub fn mnemonic(&self) -> Result<&Mnemonic, VaultError> {
        self.secret.get().ok_or(VaultError::MustBeUnlocked)
    }

    /// Create an account with zeroed counters. Idempotent: an existing
    /// account is left untouched.
    pub fn init_account(&mut self, account_index: u32) -> Result<(), VaultError> {
        if self.accounts.contains_key(&account_index) {
            return Ok(());
        }
        self.accounts.insert(account_index, Account::new(account_index)?);
        tracing::debug!("initialized account {}", account_index);
        Ok(())
    }

    /// Look up an account by index.
    pub fn account_by_index(&self, account_index: u32) -> Result<&Account, VaultError> {
        self.accounts
            .get(&account_index)
            .ok_or(VaultError::AccountNotFound)
    }

    /// Resolve the account owning a previously derived address.
    pub fn account_by_address(&self, address: &str) -> Result<(&Account, u32), VaultError> {
        let entry = self
            .address_index
            .get(address)
            .ok_or(VaultError::AccountNotFound)?;
        let account = self
            .accounts
            .get(&entry.account_index)
            .ok_or(VaultError::AccountNotFound)?;
        Ok((account, entry.account_index))
    }

    /// Derive the next receiving address for an account.
    ///
    /// Creates the account on first use. Requires unlock.
    pub fn derive_next_external_address(
        &mut self,
        account_index: u32,
    ) -> Result<AddressInfo, VaultError> {
        self.derive_next_address(account_index, Chain::External)
    }

    /// Derive the next change address for an account.
    ///
    /// Creates the account on first use. Requires unlock.
    pub fn derive_next_internal_address(
        &mut self,
        account_index: u32,
    ) -> Result<AddressInfo, VaultError> {
        self.derive_next_address(account_index, Chain::Internal)
    }

    fn derive_next_address(
        &mut self,
        account_index: u32,
        chain: Chain,
    ) -> Result<AddressInfo, VaultError> {
        let mnemonic = self.secret.get().ok_or(VaultError::MustBeUnlocked)?;
        let hd = HdKeys::from_mnemonic(mnemonic);

        if !self.accounts.contains_key(&account_index) {
            self.accounts
                .insert(account_index, Account::new(account_index)?);
        }
        let account = self
            .accounts
            .get_mut(&account_index)
            .expect("account inserted above");

        // Exhaustion is checked before anything mutates: a failed
        // derivation leaves counters and indexes exactly as they were.
        if account.is_exhausted(chain) {
            return Err(VaultError::AddressSpaceExhausted {
                account: account_index,
                chain,
            });
        }

        let index = account.next_index(chain);
        let path = DerivationPath::new(account_index, chain, index)
            .expect("account and counter are kept inside the hardened range");
        let derived = hd.derive_address(&path, self.network);

        let script_hex = hex::encode(&derived.script);
        let path_string = path.to_string();
        let address = derived.address.encode();

        account.add_derivation_path(&script_hex, &path_string);
        account.advance_index(chain);
        self.address_index
            .entry(address.clone())
            .or_insert_with(|| AddressEntry {
                account_index,
                blinding_key: derived.blinding_key.to_vec(),
            });

        tracing::debug!(account = account_index, chain = %chain, index, "derived address");

        Ok(AddressInfo {
            account_index,
            address,
            script: script_hex,
            blinding_key: derived.blinding_key.to_vec(),
            derivation_path: path_string,
        })
    }

    /// Every address ever derived, across all accounts.
    ///
    /// Served from the cached reverse indexes, so it works while locked.
    /// Sorted by path string, which is lexicographic: `"0'/0/10"` sorts
    /// before `"0'/0/2"`. A stable listing convention, not a numeric
    /// ordering.
    pub fn all_derived_addresses_info(&self) -> Vec<AddressInfo> {
        let mut infos = Vec::with_capacity(self.address_index.len());
        for (address, entry) in &self.address_index {
            let account = self
                .accounts
                .get(&entry.account_index)
                .expect("address index entries always resolve to an account");
            let decoded = ConfidentialAddress::decode(address)
                .expect("address index keys are valid encodings");
            let script_hex = hex::encode(decoded.script());
            let derivation_path = account
                .derivation_path(&script_hex)
                .map(str::to_string)
                .unwrap_or_default();

            infos.push(AddressInfo {
                account_index: entry.account_index,
                address: address.clone(),
                script: script_hex,
                blinding_key: entry.blinding_key.clone(),
                derivation_path,
            });
        }
        infos.sort_by(|a, b| a.derivation_path.cmp(&b.derivation_path));
        infos
    }

    /// Re-derive every allocated address of one account from the mnemonic.
    ///
    /// A recovery and audit pass: nothing is read from the cached indexes,
    /// so it requires unlock. Walks the external chain from zero up to the
    /// counter, then the internal chain when `include_internal` is set.
    pub fn all_derived_addresses_info_for_account(
        &self,
        account_index: u32,
        include_internal: bool,
    ) -> Result<Vec<AddressInfo>, VaultError> {
        let mnemonic = self.secret.get().ok_or(VaultError::MustBeUnlocked)?;
        let account = self.account_by_index(account_index)?;
        let hd = HdKeys::from_mnemonic(mnemonic);

        let mut chains = vec![Chain::External];
        if include_internal {
            chains.push(Chain::Internal);
        }

        let mut infos = Vec::new();
        for chain in chains {
            for index in 0..account.next_index(chain) {
                let path = DerivationPath::new(account_index, chain, index)
                    .expect("stored counters stay inside the hardened range");
                let derived = hd.derive_address(&path, self.network);
                infos.push(AddressInfo {
                    account_index,
                    address: derived.address.encode(),
                    script: hex::encode(&derived.script),
                    blinding_key: derived.blinding_key.to_vec(),
                    derivation_path: path.to_string(),
                });
            }
        }
        Ok(infos)
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("network", &self.network)
            .field("initialized", &self.is_initialized())
            .field("locked", &self.is_locked())
            .field("accounts", &self.accounts.len())
            .field("addresses", &self.address_index.len())
            .finish()
    }
}
