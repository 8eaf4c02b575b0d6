//! Typed derivation paths.
//!
//! A path `"<account>'/<chain>/<index>"` names one key in the wallet tree:
//! hardened account, then chain (0 receiving, 1 change), then address
//! index. Parsing accepts an optional `m/` prefix and rejects anything
//! outside the hardened range `[0, 2^31)`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Hardened derivation offset (2^31).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Largest valid account or address index (2^31 - 1).
pub const MAX_INDEX: u32 = HARDENED_OFFSET - 1;

/// Errors from parsing or building a derivation path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("malformed derivation path")]
    Malformed,
    #[error("account index must be hardened")]
    UnhardenedAccount,
    #[error("account index out of range: {0}")]
    AccountOutOfRange(u32),
    #[error("address index out of range: {0}")]
    IndexOutOfRange(u32),
    #[error("invalid chain: {0}")]
    InvalidChain(String),
}

/// The two address chains of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chain {
    /// Receiving addresses (chain 0).
    External,
    /// Change addresses (chain 1).
    Internal,
}

impl Chain {
    /// Numeric chain value as it appears in path strings.
    pub fn index(&self) -> u32 {
        match self {
            Chain::External => 0,
            Chain::Internal => 1,
        }
    }

    /// Parse a numeric chain value.
    pub fn from_index(value: u32) -> Result<Self, PathError> {
        match value {
            0 => Ok(Chain::External),
            1 => Ok(Chain::Internal),
            other => Err(PathError::InvalidChain(other.to_string())),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::External => write!(f, "external"),
            Chain::Internal => write!(f, "internal"),
        }
    }
}

/// One coordinate in the wallet tree: hardened account, chain, index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    account: u32,
    chain: Chain,
    index: u32,
}

impl DerivationPath {
    /// Build a path, checking the hardened range on account and index.
    pub fn new(account: u32, chain: Chain, index: u32) -> Result<Self, PathError> {
        if account > MAX_INDEX {
            return Err(PathError::AccountOutOfRange(account));
        }
        if index > MAX_INDEX {
            return Err(PathError::IndexOutOfRange(index));
        }
        Ok(Self {
            account,
            chain,
            index,
        })
    }

    /// Account component (without the hardened offset).
    pub fn account(&self) -> u32 {
        self.account
    }

    /// Chain component.
    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Address index component.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for DerivationPath {
    /// Formats as `"<account>'/<chain>/<index>"`, e.g. `"0'/0/14"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'/{}/{}", self.account, self.chain.index(), self.index)
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, PathError> {
        let s = s.strip_prefix("m/").unwrap_or(s);
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(PathError::Malformed);
        }

        let account_str = parts[0]
            .strip_suffix('\'')
            .ok_or(PathError::UnhardenedAccount)?;
        let account: u32 = account_str.parse().map_err(|_| PathError::Malformed)?;
        if account > MAX_INDEX {
            return Err(PathError::AccountOutOfRange(account));
        }

        let chain_value: u32 = parts[1]
            .parse()
            .map_err(|_| PathError::InvalidChain(parts[1].to_string()))?;
        let chain = Chain::from_index(chain_value)?;

        let index: u32 = parts[2].parse().map_err(|_| PathError::Malformed)?;
        if index > MAX_INDEX {
            return Err(PathError::IndexOutOfRange(index));
        }

        Ok(Self {
            account,
            chain,
            index,
        })
    }
}
