//! Deterministic key and address derivation from the mnemonic.
//!
//! Uses BLAKE3 keyed derivation to produce Ed25519 keypairs from the
//! 64-byte BIP-39 seed. This is simpler than BIP-32 (which is incompatible
//! with Ed25519) while keeping the same deterministic, recoverable
//! properties. The seed expands into two independent roots: spend keys
//! bind the full account/chain/index coordinates, and blinding keys are
//! keyed hashes of the output script in the style of SLIP-77, so the same
//! script always yields the same blinding key.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use haze_core::address::{output_script, ConfidentialAddress, Network};
use haze_core::crypto::KeyPair;

use crate::derivation::{DerivationPath, HARDENED_OFFSET};
use crate::mnemonic::Mnemonic;

/// BLAKE3 KDF context for the spend-key root.
const SPEND_ROOT_CONTEXT: &str = "haze-vault-spend-root-v1";

/// BLAKE3 KDF context for the blinding-key root.
const BLINDING_ROOT_CONTEXT: &str = "haze-vault-blinding-root-v1";

/// BLAKE3 KDF context for child spend keys.
const CHILD_KEY_CONTEXT: &str = "haze-vault-child-key-v1";

/// Root key material expanded from a mnemonic.
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HdKeys {
    spend_root: [u8; 32],
    blinding_root: [u8; 32],
}

impl HdKeys {
    /// Expand the BIP-39 seed into independent spend and blinding roots.
    pub fn from_mnemonic(mnemonic: &Mnemonic) -> Self {
        let mut seed = mnemonic.to_seed();
        let keys = Self {
            spend_root: blake3::derive_key(SPEND_ROOT_CONTEXT, &seed),
            blinding_root: blake3::derive_key(BLINDING_ROOT_CONTEXT, &seed),
        };
        seed.zeroize();
        keys
    }

    /// Derive the spend keypair for a path.
    ///
    /// The KDF input commits to the hardened account, the chain and the
    /// address index, so every path yields an unrelated key.
    pub fn spend_keypair(&self, path: &DerivationPath) -> KeyPair {
        let mut ikm = Vec::with_capacity(44);
        ikm.extend_from_slice(&self.spend_root);
        ikm.extend_from_slice(&(path.account() | HARDENED_OFFSET).to_le_bytes());
        ikm.extend_from_slice(&path.chain().index().to_le_bytes());
        ikm.extend_from_slice(&path.index().to_le_bytes());
        let derived = blake3::derive_key(CHILD_KEY_CONTEXT, &ikm);
        ikm.zeroize();
        KeyPair::from_secret_bytes(derived)
    }

    /// Derive the private blinding key for an output script.
    ///
    /// Keyed BLAKE3 of the script under the blinding root: the same script
    /// always maps to the same key, with no per-script bookkeeping.
    pub fn blinding_secret(&self, script: &[u8]) -> [u8; 32] {
        *blake3::keyed_hash(&self.blinding_root, script).as_bytes()
    }

    /// Derive the blinding keypair for an output script.
    pub fn blinding_keypair(&self, script: &[u8]) -> KeyPair {
        KeyPair::from_secret_bytes(self.blinding_secret(script))
    }

    /// Derive the confidential address, output script and private blinding
    /// key for a path.
    pub fn derive_address(&self, path: &DerivationPath, network: Network) -> DerivedAddress {
        let spend = self.spend_keypair(path);
        let pubkey_hash = spend.public_key().pubkey_hash();
        let script = output_script(&pubkey_hash);

        let blinding_key = self.blinding_secret(&script);
        let blinding_pubkey = KeyPair::from_secret_bytes(blinding_key)
            .public_key()
            .to_bytes();

        let address = ConfidentialAddress::from_parts(blinding_pubkey, pubkey_hash, network);
        DerivedAddress {
            address,
            script,
            blinding_key,
        }
    }
}

impl fmt::Debug for HdKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdKeys")
            .field("spend_root", &"[REDACTED]")
            .field("blinding_root", &"[REDACTED]")
            .finish()
    }
}

/// Everything derived for one path.
pub struct DerivedAddress {
    /// The encodable confidential address.
    pub address: ConfidentialAddress,
    /// Output script the address pays to.
    pub script: Vec<u8>,
    /// Private blinding key for outputs paying the script.
    pub blinding_key: [u8; 32],
}

impl fmt::Debug for DerivedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedAddress")
            .field("address", &self.address)
            .field("script", &hex::encode(&self.script))
            .field("blinding_key", &"[REDACTED]")
            .finish()
    }
}
