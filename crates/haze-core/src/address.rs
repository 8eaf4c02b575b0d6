//! Confidential address encoding for the Haze network.
//!
//! Addresses use Bech32m encoding ([BIP-350]) with human-readable prefixes:
//! - Mainnet: `haze1...`
//! - Testnet: `thaze1...`
//! - Regtest: `rhaze1...`
//!
//! A confidential address encodes a version byte (currently 0), the
//! recipient's 32-byte public blinding key, and the 32-byte BLAKE3 pubkey
//! hash of the spending key. The output script committed on-chain is
//! `version || pubkey_hash`; the blinding key rides along in the address so
//! a sender can blind amounts and assets for the recipient without any
//! out-of-band exchange.
//!
//! [BIP-350]: https://github.com/bitcoin/bips/blob/master/bip-0350.mediawiki

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;
use crate::types::Hash256;

/// Bech32m checksum constant (BIP-350).
const BECH32M_CONST: u32 = 0x2bc830a3;

/// Bech32 character set for encoding 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Current address version.
pub const ADDRESS_VERSION: u8 = 0;

/// Confidential payload length: blinding pubkey (32) + pubkey hash (32).
const PAYLOAD_LEN: usize = 64;

/// Network identifier determining the address prefix.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
    bincode::Encode, bincode::Decode,
)]
pub enum Network {
    /// Mainnet (HRP: "haze", addresses start with `haze1`).
    Mainnet,
    /// Testnet (HRP: "thaze", addresses start with `thaze1`).
    Testnet,
    /// Regtest (HRP: "rhaze", addresses start with `rhaze1`).
    Regtest,
}

impl Network {
    /// Human-readable prefix for this network.
    pub fn hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "haze",
            Network::Testnet => "thaze",
            Network::Regtest => "rhaze",
        }
    }

    /// Look up network from a human-readable prefix.
    pub fn from_hrp(hrp: &str) -> Result<Self, AddressError> {
        match hrp {
            "haze" => Ok(Network::Mainnet),
            "thaze" => Ok(Network::Testnet),
            "rhaze" => Ok(Network::Regtest),
            _ => Err(AddressError::UnknownNetwork(hrp.to_string())),
        }
    }
}

/// Build the output script committed on-chain for a pubkey hash.
///
/// Layout: `version byte || 32-byte BLAKE3 pubkey hash`. The script is also
/// the input to deterministic blinding-key derivation, so its layout is
/// consensus-relevant and must not change within a version.
pub fn output_script(pubkey_hash: &Hash256) -> Vec<u8> {
    let mut script = Vec::with_capacity(1 + 32);
    script.push(ADDRESS_VERSION);
    script.extend_from_slice(pubkey_hash.as_bytes());
    script
}

/// A confidential Haze address: spending commitment plus public blinding key.
///
/// Human-readable form is `haze1...` / `thaze1...` / `rhaze1...`. Internally
/// stores the network, version byte, the recipient's public blinding key,
/// and the 32-byte BLAKE3 pubkey hash of the spending key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConfidentialAddress {
    network: Network,
    version: u8,
    blinding_pubkey: [u8; 32],
    pubkey_hash: Hash256,
}

impl ConfidentialAddress {
    /// Create an address from its parts.
    pub fn from_parts(blinding_pubkey: [u8; 32], pubkey_hash: Hash256, network: Network) -> Self {
        Self {
            network,
            version: ADDRESS_VERSION,
            blinding_pubkey,
            pubkey_hash,
        }
    }

    /// The recipient's public blinding key.
    pub fn blinding_pubkey(&self) -> &[u8; 32] {
        &self.blinding_pubkey
    }

    /// The BLAKE3 pubkey hash of the spending key.
    pub fn pubkey_hash(&self) -> Hash256 {
        self.pubkey_hash
    }

    /// The network this address belongs to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The address version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The output script this address pays to (`version || pubkey_hash`).
    pub fn script(&self) -> Vec<u8> {
        output_script(&self.pubkey_hash)
    }

    /// Encode this address as a Bech32m string.
    pub fn encode(&self) -> String {
        let hrp = self.network.hrp();

        // Convert the 64-byte confidential payload from 8-bit to 5-bit groups
        let mut bytes = Vec::with_capacity(PAYLOAD_LEN);
        bytes.extend_from_slice(&self.blinding_pubkey);
        bytes.extend_from_slice(self.pubkey_hash.as_bytes());
        let data_5bit = convert_bits(&bytes, 8, 5, true)
            .expect("valid 64-byte payload always converts to 5-bit");

        // Prepend version byte
        let mut payload = Vec::with_capacity(1 + data_5bit.len());
        payload.push(self.version);
        payload.extend_from_slice(&data_5bit);

        let checksum = bech32m_create_checksum(hrp, &payload);

        let mut result = String::with_capacity(hrp.len() + 1 + payload.len() + 6);
        result.push_str(hrp);
        result.push('1');
        for &d in &payload {
            result.push(CHARSET[d as usize] as char);
        }
        for &d in &checksum {
            result.push(CHARSET[d as usize] as char);
        }
        result
    }

    /// Decode a Bech32m confidential address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        // Reject mixed case (Bech32 spec: all alpha chars must be same case)
        let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }

        let s_lower = s.to_ascii_lowercase();

        // Find the last '1' separator
        let sep_pos = s_lower.rfind('1').ok_or(AddressError::MissingSeparator)?;

        if sep_pos == 0 {
            return Err(AddressError::InvalidHrp);
        }
        // Need at least 6 checksum chars + 1 version char after separator
        if sep_pos + 8 > s_lower.len() {
            return Err(AddressError::InvalidLength);
        }

        let hrp = &s_lower[..sep_pos];
        let data_part = &s_lower[sep_pos + 1..];

        // Decode characters from Bech32 charset
        let mut data = Vec::with_capacity(data_part.len());
        for c in data_part.chars() {
            let pos = CHARSET
                .iter()
                .position(|&ch| ch as char == c)
                .ok_or(AddressError::InvalidCharacter(c))?;
            data.push(pos as u8);
        }

        // Verify Bech32m checksum
        if !bech32m_verify_checksum(hrp, &data) {
            return Err(AddressError::InvalidChecksum);
        }

        // Remove 6-char checksum
        let payload = &data[..data.len() - 6];

        if payload.is_empty() {
            return Err(AddressError::InvalidLength);
        }

        // First value is version
        let version = payload[0];
        if version != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion(version));
        }

        // Convert remaining 5-bit data back to 8-bit
        let bytes = convert_bits(&payload[1..], 5, 8, false)
            .ok_or(AddressError::InvalidPadding)?;

        if bytes.len() != PAYLOAD_LEN {
            return Err(AddressError::InvalidLength);
        }

        let network = Network::from_hrp(hrp)?;

        let mut blinding_pubkey = [0u8; 32];
        blinding_pubkey.copy_from_slice(&bytes[..32]);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[32..]);

        Ok(Self {
            network,
            version,
            blinding_pubkey,
            pubkey_hash: Hash256(hash),
        })
    }
}

impl fmt::Display for ConfidentialAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for ConfidentialAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for ConfidentialAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for ConfidentialAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

// --- Bech32m internals ---

/// Compute the Bech32m polymod over a sequence of 5-bit values.
fn bech32m_polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
    let mut chk: u32 = 1;
    for &v in values {
        let b = chk >> 25;
        chk = ((chk & 0x1ffffff) << 5) ^ (v as u32);
        for (i, &g) in GEN.iter().enumerate() {
            if (b >> i) & 1 != 0 {
                chk ^= g;
            }
        }
    }
    chk
}

/// Expand the HRP for Bech32m checksum computation.
fn bech32m_hrp_expand(hrp: &str) -> Vec<u8> {
    let mut ret = Vec::with_capacity(hrp.len() * 2 + 1);
    for c in hrp.bytes() {
        ret.push(c >> 5);
    }
    ret.push(0);
    for c in hrp.bytes() {
        ret.push(c & 31);
    }
    ret
}

/// Create the 6-value Bech32m checksum for the given HRP and data.
fn bech32m_create_checksum(hrp: &str, data: &[u8]) -> Vec<u8> {
    let mut values = bech32m_hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    let polymod = bech32m_polymod(&values) ^ BECH32M_CONST;
    (0..6)
        .map(|i| ((polymod >> (5 * (5 - i))) & 31) as u8)
        .collect()
}

/// Verify the Bech32m checksum for the given HRP and data (including checksum).
fn bech32m_verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = bech32m_hrp_expand(hrp);
    values.extend_from_slice(data);
    bech32m_polymod(&values) == BECH32M_CONST
}

/// Convert between bit widths (e.g. 8-bit bytes to 5-bit Bech32 groups).
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = value as u32;
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}
