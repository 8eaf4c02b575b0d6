//! Lifecycle-scoped storage for the decrypted mnemonic.

use std::fmt;

use crate::mnemonic::Mnemonic;

/// Holds the plaintext mnemonic while the vault is unlocked.
///
/// Set on unlock, cleared on lock. Clearing drops the stored [`Mnemonic`],
/// which wipes its word buffers, so a locked vault keeps no plaintext in
/// memory. Never serialized.
#[derive(Default)]
pub struct SecretStore {
    mnemonic: Option<Mnemonic>,
}

impl SecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self { mnemonic: None }
    }

    /// Store the plaintext mnemonic.
    pub fn set(&mut self, mnemonic: Mnemonic) {
        self.mnemonic = Some(mnemonic);
    }

    /// Drop the plaintext mnemonic, wiping its buffers.
    pub fn unset(&mut self) {
        self.mnemonic = None;
    }

    /// Borrow the plaintext mnemonic, if present.
    pub fn get(&self) -> Option<&Mnemonic> {
        self.mnemonic.as_ref()
    }

    /// True while a mnemonic is held.
    pub fn is_set(&self) -> bool {
        self.mnemonic.is_some()
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("set", &self.is_set())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store = SecretStore::new();
        assert!(!store.is_set());
        assert!(store.get().is_none());
    }

    #[test]
    fn set_get_unset_cycle() {
        let mut store = SecretStore::new();
        let mnemonic = Mnemonic::generate();
        let phrase = mnemonic.phrase();

        store.set(mnemonic);
        assert!(store.is_set());
        assert_eq!(store.get().unwrap().phrase(), phrase);

        store.unset();
        assert!(!store.is_set());
        assert!(store.get().is_none());
    }

    #[test]
    fn debug_never_shows_words() {
        let mut store = SecretStore::new();
        let mnemonic = Mnemonic::from_phrase(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        store.set(mnemonic);
        let printed = format!("{store:?}");
        assert!(printed.contains("set: true"));
        assert!(!printed.contains("abandon"));
    }
}
