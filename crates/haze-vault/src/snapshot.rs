//! Vault persistence shape.
//!
//! The storage layer decides where snapshots are written; this module
//! defines the lossless round-trip form and the invariant checks applied
//! when one is adopted. Snapshots never carry plaintext secret material,
//! so a restored vault always comes back locked.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use haze_core::address::{ConfidentialAddress, Network};

use crate::account::Account;
use crate::derivation::{Chain, HARDENED_OFFSET};
use crate::error::VaultError;
use crate::secret::SecretStore;
use crate::vault::{AddressEntry, Vault};

/// Serialized form of one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct AccountSnapshot {
    /// Account index in the wallet tree.
    pub account_index: u32,
    /// Next external (receiving) index to allocate.
    pub last_external_index: u32,
    /// Next internal (change) index to allocate.
    pub last_internal_index: u32,
    /// Reverse index: hex output script -> path string.
    pub derivation_path_by_script: HashMap<String, String>,
}

impl AccountSnapshot {
    /// Capture one account.
    pub fn from_account(account: &Account) -> Self {
        Self {
            account_index: account.index(),
            last_external_index: account.next_index(Chain::External),
            last_internal_index: account.next_index(Chain::Internal),
            derivation_path_by_script: account.derivation_paths().clone(),
        }
    }
}

/// Serialized form of a vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct VaultSnapshot {
    /// Mnemonic ciphertext (`salt || nonce || ciphertext+tag`).
    pub encrypted_mnemonic: Vec<u8>,
    /// Passphrase verifier hash.
    pub passphrase_hash: Vec<u8>,
    /// Network addresses are encoded for.
    pub network: Network,
    /// Accounts, sorted by index.
    pub accounts: Vec<AccountSnapshot>,
    /// Reverse lookup: encoded address -> owning account and blinding key.
    pub address_index: HashMap<String, AddressEntry>,
}

impl Vault {
    /// Capture the vault's persistent state.
    ///
    /// Accounts are emitted sorted by index so equal states serialize
    /// identically.
    pub fn snapshot(&self) -> VaultSnapshot {
        let mut accounts: Vec<AccountSnapshot> = self
            .accounts
            .values()
            .map(AccountSnapshot::from_account)
            .collect();
        accounts.sort_by_key(|a| a.account_index);

        VaultSnapshot {
            encrypted_mnemonic: self.encrypted_mnemonic.clone(),
            passphrase_hash: self.passphrase_hash.clone(),
            network: self.network,
            accounts,
            address_index: self.address_index.clone(),
        }
    }

    /// Rebuild a vault from a snapshot. The result is locked.
    ///
    /// Every invariant the vault maintains at runtime is re-checked before
    /// the data is adopted; violations fail with
    /// [`VaultError::CorruptedSnapshot`].
    pub fn restore(snapshot: VaultSnapshot) -> Result<Self, VaultError> {
        let mut accounts: HashMap<u32, Account> = HashMap::with_capacity(snapshot.accounts.len());
        for account in &snapshot.accounts {
            if account.account_index >= HARDENED_OFFSET {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "account index {} out of range",
                    account.account_index
                )));
            }
            if account.last_external_index > HARDENED_OFFSET
                || account.last_internal_index > HARDENED_OFFSET
            {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "account {} chain counters out of range",
                    account.account_index
                )));
            }
            let restored = Account::restore(
                account.account_index,
                account.last_external_index,
                account.last_internal_index,
                account.derivation_path_by_script.clone(),
            );
            if accounts.insert(account.account_index, restored).is_some() {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "duplicate account index {}",
                    account.account_index
                )));
            }
        }

        for (address, entry) in &snapshot.address_index {
            if !accounts.contains_key(&entry.account_index) {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "address entry points at unknown account {}",
                    entry.account_index
                )));
            }
            if entry.blinding_key.len() != 32 {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "blinding key for {address} has {} bytes, want 32",
                    entry.blinding_key.len()
                )));
            }
            let decoded = ConfidentialAddress::decode(address).map_err(|e| {
                VaultError::CorruptedSnapshot(format!("undecodable address {address}: {e}"))
            })?;
            if decoded.network() != snapshot.network {
                return Err(VaultError::CorruptedSnapshot(format!(
                    "address {address} does not belong to {:?}",
                    snapshot.network
                )));
            }
        }

        Ok(Vault {
            encrypted_mnemonic: snapshot.encrypted_mnemonic,
            passphrase_hash: snapshot.passphrase_hash,
            network: snapshot.network,
            accounts,
            address_index: snapshot.address_index,
            secret: SecretStore::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::Mnemonic;

    const PASSPHRASE: &str = "snapshot passphrase";

    fn populated_vault() -> Vault {
        let mut vault =
            Vault::create(Mnemonic::generate(), PASSPHRASE, Network::Regtest).unwrap();
        vault.derive_next_external_address(0).unwrap();
        vault.derive_next_external_address(0).unwrap();
        vault.derive_next_internal_address(0).unwrap();
        vault.derive_next_external_address(2).unwrap();
        vault
    }

    #[test]
    fn round_trip_preserves_state() {
        let vault = populated_vault();
        let restored = Vault::restore(vault.snapshot()).unwrap();

        assert!(restored.is_initialized());
        assert_eq!(restored.network(), Network::Regtest);
        assert_eq!(restored.encrypted_mnemonic(), vault.encrypted_mnemonic());
        assert_eq!(restored.passphrase_hash(), vault.passphrase_hash());

        let account = restored.account_by_index(0).unwrap();
        assert_eq!(account.next_index(Chain::External), 2);
        assert_eq!(account.next_index(Chain::Internal), 1);
        assert_eq!(restored.account_by_index(2).unwrap().next_index(Chain::External), 1);

        // cached listings survive the round trip exactly
        let original = vault.all_derived_addresses_info();
        let recovered = restored.all_derived_addresses_info();
        assert_eq!(recovered.len(), 4);
        for (a, b) in original.iter().zip(&recovered) {
            assert_eq!(a.address, b.address);
            assert_eq!(a.script, b.script);
            assert_eq!(a.blinding_key, b.blinding_key);
            assert_eq!(a.derivation_path, b.derivation_path);
        }
    }

    #[test]
    fn restored_vault_is_locked() {
        let vault = populated_vault();
        assert!(!vault.is_locked());

        let mut restored = Vault::restore(vault.snapshot()).unwrap();
        assert!(restored.is_locked());
        assert!(restored.mnemonic().is_err());

        // derivation continues where the counters left off after unlock
        restored.unlock(PASSPHRASE).unwrap();
        let info = restored.derive_next_external_address(0).unwrap();
        assert_eq!(info.derivation_path, "0'/0/2");
    }

    #[test]
    fn empty_vault_round_trip() {
        let restored = Vault::restore(Vault::new(Network::Mainnet).snapshot()).unwrap();
        assert!(!restored.is_initialized());
        assert!(restored.is_locked());
        assert!(restored.all_derived_addresses_info().is_empty());
    }

    #[test]
    fn accounts_sorted_by_index() {
        let mut vault =
            Vault::create(Mnemonic::generate(), PASSPHRASE, Network::Regtest).unwrap();
        vault.derive_next_external_address(2).unwrap();
        vault.derive_next_external_address(0).unwrap();
        vault.derive_next_external_address(1).unwrap();

        let snapshot = vault.snapshot();
        let indexes: Vec<u32> = snapshot.accounts.iter().map(|a| a.account_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn serde_json_round_trip() {
        let snapshot = populated_vault().snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: VaultSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn bincode_round_trip() {
        let snapshot = populated_vault().snapshot();
        let bytes = bincode::encode_to_vec(&snapshot, bincode::config::standard()).unwrap();
        let (decoded, consumed): (VaultSnapshot, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn rejects_duplicate_account_index() {
        let mut snapshot = populated_vault().snapshot();
        let copy = snapshot.accounts[0].clone();
        snapshot.accounts.push(copy);

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn rejects_out_of_range_account_index() {
        let mut snapshot = populated_vault().snapshot();
        snapshot.accounts[0].account_index = HARDENED_OFFSET;
        snapshot.address_index.clear();

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn rejects_out_of_range_counter() {
        let mut snapshot = populated_vault().snapshot();
        snapshot.accounts[0].last_external_index = HARDENED_OFFSET + 1;

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn exhausted_counter_is_still_valid() {
        let mut snapshot = populated_vault().snapshot();
        snapshot.accounts[0].last_internal_index = HARDENED_OFFSET;

        assert!(Vault::restore(snapshot).is_ok());
    }

    #[test]
    fn rejects_dangling_address_entry() {
        let mut snapshot = populated_vault().snapshot();
        for entry in snapshot.address_index.values_mut() {
            entry.account_index = 7; // no such account
        }

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn rejects_undecodable_address() {
        let mut snapshot = populated_vault().snapshot();
        snapshot.address_index.insert(
            "rhaze1notanaddress".to_string(),
            AddressEntry {
                account_index: 0,
                blinding_key: vec![0u8; 32],
            },
        );

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn rejects_foreign_network_address() {
        let mut snapshot = populated_vault().snapshot();
        // addresses were derived for Regtest
        snapshot.network = Network::Mainnet;

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }

    #[test]
    fn rejects_short_blinding_key() {
        let mut snapshot = populated_vault().snapshot();
        for entry in snapshot.address_index.values_mut() {
            entry.blinding_key = vec![0u8; 16];
        }

        let err = Vault::restore(snapshot).unwrap_err();
        assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }
}
