//! Per-account derivation bookkeeping.

use std::collections::HashMap;

use crate::derivation::{Chain, HARDENED_OFFSET, MAX_INDEX};
use crate::error::VaultError;

/// One HD account: chain counters plus the script reverse index.
///
/// A counter holds the next index to allocate on its chain. A counter that
/// has reached [`HARDENED_OFFSET`] means every index on that chain has been
/// handed out and further derivation fails; the counter never passes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    account_index: u32,
    last_external_index: u32,
    last_internal_index: u32,
    derivation_path_by_script: HashMap<String, String>,
}

impl Account {
    /// Create an account with zeroed counters and an empty reverse index.
    pub fn new(account_index: u32) -> Result<Self, VaultError> {
        if account_index > MAX_INDEX {
            return Err(VaultError::InvalidAccountIndex(account_index));
        }
        Ok(Self {
            account_index,
            last_external_index: 0,
            last_internal_index: 0,
            derivation_path_by_script: HashMap::new(),
        })
    }

    /// The account's index in the wallet tree (without the hardened offset).
    pub fn index(&self) -> u32 {
        self.account_index
    }

    /// Next address index to allocate on a chain.
    pub fn next_index(&self, chain: Chain) -> u32 {
        match chain {
            Chain::External => self.last_external_index,
            Chain::Internal => self.last_internal_index,
        }
    }

    /// True when every index on the chain has been allocated.
    pub fn is_exhausted(&self, chain: Chain) -> bool {
        self.next_index(chain) >= HARDENED_OFFSET
    }

    /// Advance a chain counter after a successful derivation.
    pub(crate) fn advance_index(&mut self, chain: Chain) {
        let counter = match chain {
            Chain::External => &mut self.last_external_index,
            Chain::Internal => &mut self.last_internal_index,
        };
        *counter = counter.saturating_add(1);
    }

    /// Record the derivation path for an output script.
    ///
    /// First writer wins: re-deriving a script never rewrites its path.
    pub(crate) fn add_derivation_path(&mut self, script_hex: &str, path: &str) {
        self.derivation_path_by_script
            .entry(script_hex.to_string())
            .or_insert_with(|| path.to_string());
    }

    /// Look up the derivation path recorded for an output script.
    pub fn derivation_path(&self, script_hex: &str) -> Option<&str> {
        self.derivation_path_by_script
            .get(script_hex)
            .map(String::as_str)
    }

    /// The full script to path reverse index.
    pub fn derivation_paths(&self) -> &HashMap<String, String> {
        &self.derivation_path_by_script
    }

    /// Rebuild an account from persisted fields, bypassing counter resets.
    pub(crate) fn restore(
        account_index: u32,
        last_external_index: u32,
        last_internal_index: u32,
        derivation_path_by_script: HashMap<String, String>,
    ) -> Self {
        Self {
            account_index,
            last_external_index,
            last_internal_index,
            derivation_path_by_script,
        }
    }
}
