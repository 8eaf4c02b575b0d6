//! Property-based test suite for the vault.
//!
//! These tests attempt to break wallet invariants under randomized inputs,
//! with proptest shrinking to produce minimal failing examples.
//!
//! Properties exercised:
//! - Derivation path display/parse round trip and parser totality
//! - Key and address derivation determinism and injectivity
//! - Confidential address encode/decode round trip
//! - Single-character address corruption is always detected
//! - Vault allocation: paths are unique, counters move by exactly one
//! - Snapshot restore/capture identity and counter validation
//! - Ciphertext parsing totality with the unified decryption error
//! - Mnemonic parser totality and normalization

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use proptest::prelude::*;

use haze_core::address::{ConfidentialAddress, Network};
use haze_core::types::Hash256;
use haze_vault::{
    encryption, AccountSnapshot, Chain, DerivationPath, Mnemonic, Vault, VaultError,
    VaultSnapshot, HARDENED_OFFSET, MAX_INDEX,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bech32 character set, for generating valid single-character corruptions.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const FIXED_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn fixed_keys() -> haze_vault::HdKeys {
    haze_vault::HdKeys::from_mnemonic(&Mnemonic::from_phrase(FIXED_PHRASE).unwrap())
}

fn chain_from_bool(internal: bool) -> Chain {
    if internal {
        Chain::Internal
    } else {
        Chain::External
    }
}

/// One vault shared across property cases. Creating a vault runs the
/// passphrase KDF, so the suite pays that cost exactly once; counters
/// simply keep growing from case to case.
fn shared_vault() -> &'static Mutex<Vault> {
    static SHARED: OnceLock<Mutex<Vault>> = OnceLock::new();
    SHARED.get_or_init(|| {
        Mutex::new(Vault::create(Mnemonic::generate(), "prop pw", Network::Regtest).unwrap())
    })
}

// ---------------------------------------------------------------------------
// Property 1: path display/parse round trip
//
// Any in-range coordinate triple survives formatting and re-parsing
// unchanged.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn path_display_parse_round_trip(
        account in 0u32..=MAX_INDEX,
        internal in any::<bool>(),
        index in 0u32..=MAX_INDEX,
    ) {
        let chain = chain_from_bool(internal);
        let path = DerivationPath::new(account, chain, index).unwrap();
        let formatted = path.to_string();
        let reparsed: DerivationPath = formatted.parse().unwrap();

        prop_assert_eq!(reparsed, path);
        prop_assert_eq!(reparsed.to_string(), formatted);
    }
}

// ---------------------------------------------------------------------------
// Property 2: path parser is total
//
// Arbitrary junk never panics the parser, and anything it accepts must
// round-trip through display.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn path_parser_total_on_junk(input in ".*") {
        if let Ok(path) = input.parse::<DerivationPath>() {
            let reparsed: DerivationPath = path.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, path);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: derivation determinism and injectivity
//
// The same coordinates always produce the same address and blinding key;
// neighbouring coordinates never collide.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn derivation_deterministic_and_injective(
        account in 0u32..1_000,
        internal in any::<bool>(),
        index in 0u32..10_000,
    ) {
        let chain = chain_from_bool(internal);
        let path = DerivationPath::new(account, chain, index).unwrap();

        let first = fixed_keys().derive_address(&path, Network::Mainnet);
        let second = fixed_keys().derive_address(&path, Network::Mainnet);
        prop_assert_eq!(first.address.encode(), second.address.encode());
        prop_assert_eq!(first.blinding_key, second.blinding_key);

        let neighbour_path = DerivationPath::new(account, chain, index + 1).unwrap();
        let neighbour = fixed_keys().derive_address(&neighbour_path, Network::Mainnet);
        prop_assert_ne!(first.address.encode(), neighbour.address.encode());
        prop_assert_ne!(first.script, neighbour.script);
    }
}

// ---------------------------------------------------------------------------
// Property 4: address encode/decode round trip
//
// Any 64-byte payload survives Bech32m encoding on every network.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn address_survives_encode_decode(
        blinding in prop::array::uniform32(any::<u8>()),
        hash in prop::array::uniform32(any::<u8>()),
        network_choice in 0u8..3,
    ) {
        let network = match network_choice {
            0 => Network::Mainnet,
            1 => Network::Testnet,
            _ => Network::Regtest,
        };
        let address = ConfidentialAddress::from_parts(blinding, Hash256::from_bytes(hash), network);
        let decoded = ConfidentialAddress::decode(&address.encode()).unwrap();

        prop_assert_eq!(decoded, address);
    }
}

// ---------------------------------------------------------------------------
// Property 5: corrupted addresses are rejected
//
// Substituting any single data or checksum character with a different
// charset character must fail decoding. Bech32m guarantees detection of
// one substitution at these lengths.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn corrupted_address_char_rejected(
        blinding in prop::array::uniform32(any::<u8>()),
        hash in prop::array::uniform32(any::<u8>()),
        position in 0usize..110,
        replacement in 0usize..32,
    ) {
        let encoded = ConfidentialAddress::from_parts(
            blinding,
            Hash256::from_bytes(hash),
            Network::Regtest,
        )
        .encode();

        let sep = encoded.rfind('1').unwrap();
        let target = sep + 1 + position;
        let original = encoded.as_bytes()[target];
        prop_assume!(CHARSET[replacement] != original);

        let mut corrupted = encoded.into_bytes();
        corrupted[target] = CHARSET[replacement];
        let corrupted = String::from_utf8(corrupted).unwrap();

        prop_assert!(ConfidentialAddress::decode(&corrupted).is_err());
    }
}

// ---------------------------------------------------------------------------
// Property 6: vault allocation
//
// Under arbitrary interleavings of external/internal derivations across
// accounts, every handed-out path is fresh, the matching counter moves by
// exactly one, and the reverse index resolves the new address.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn vault_allocation_unique_and_monotonic(
        ops in prop::collection::vec((0u32..4, any::<bool>()), 1..20),
    ) {
        // keep shrink runs working even after a failed case poisons the lock
        let mut vault = shared_vault()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for (account, internal) in ops {
            let chain = chain_from_bool(internal);
            let before = vault
                .account_by_index(account)
                .map(|a| a.next_index(chain))
                .unwrap_or(0);

            let info = if internal {
                vault.derive_next_internal_address(account).unwrap()
            } else {
                vault.derive_next_external_address(account).unwrap()
            };

            prop_assert_eq!(
                info.derivation_path,
                format!("{}'/{}/{}", account, chain.index(), before)
            );

            let after = vault.account_by_index(account).unwrap().next_index(chain);
            prop_assert_eq!(after, before + 1);

            let (_, owner) = vault.account_by_address(&info.address).unwrap();
            prop_assert_eq!(owner, account);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 7: snapshot restore/capture identity
//
// A snapshot with sorted accounts and in-range counters is adopted
// unchanged: capturing the restored vault reproduces it byte for byte.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn snapshot_restore_then_capture_is_identity(
        accounts in prop::collection::btree_map(
            0u32..=MAX_INDEX,
            (0u32..=HARDENED_OFFSET, 0u32..=HARDENED_OFFSET),
            1..4,
        ),
        ciphertext in prop::collection::vec(any::<u8>(), 0..80),
    ) {
        let snapshot = VaultSnapshot {
            encrypted_mnemonic: ciphertext,
            passphrase_hash: vec![7u8; 32],
            network: Network::Regtest,
            accounts: accounts
                .iter()
                .map(|(&index, &(external, internal))| AccountSnapshot {
                    account_index: index,
                    last_external_index: external,
                    last_internal_index: internal,
                    derivation_path_by_script: HashMap::from([(
                        format!("00{index:08x}"),
                        format!("{index}'/0/0"),
                    )]),
                })
                .collect(),
            address_index: HashMap::new(),
        };

        let restored = Vault::restore(snapshot.clone()).unwrap();
        prop_assert!(restored.is_locked());
        prop_assert_eq!(restored.snapshot(), snapshot);
    }
}

// ---------------------------------------------------------------------------
// Property 8: oversized counters are refused
//
// Any counter strictly past the hardened boundary marks the snapshot as
// corrupted.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn oversized_counters_rejected(
        counter in HARDENED_OFFSET + 1..=u32::MAX,
        hits_external in any::<bool>(),
    ) {
        let account = AccountSnapshot {
            account_index: 0,
            last_external_index: if hits_external { counter } else { 0 },
            last_internal_index: if hits_external { 0 } else { counter },
            derivation_path_by_script: HashMap::new(),
        };
        let snapshot = VaultSnapshot {
            encrypted_mnemonic: Vec::new(),
            passphrase_hash: Vec::new(),
            network: Network::Regtest,
            accounts: vec![account],
            address_index: HashMap::new(),
        };

        let err = Vault::restore(snapshot).unwrap_err();
        prop_assert!(matches!(err, VaultError::CorruptedSnapshot(_)));
    }
}

// ---------------------------------------------------------------------------
// Property 9: ciphertext parsing is total
//
// Undersized payloads always produce the unified decryption error and
// never panic. Anything below the salt+nonce+tag floor cannot reach the
// cipher.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn truncated_ciphertext_always_unified_error(
        bytes in prop::collection::vec(any::<u8>(), 0..60),
    ) {
        let err = encryption::decrypt(&bytes, b"any passphrase").unwrap_err();
        prop_assert_eq!(err, VaultError::Decryption);
    }
}

// ---------------------------------------------------------------------------
// Property 10: mnemonic parser totality and normalization
//
// Arbitrary junk never panics the phrase parser. Valid phrases survive
// case and whitespace mangling and normalize back to canonical form.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn mnemonic_parser_total_on_junk(input in ".*") {
        // must return, never panic
        let _ = Mnemonic::from_phrase(&input);
    }

    #[test]
    fn mnemonic_normalization_round_trip(
        entropy in prop::array::uniform32(any::<u8>()),
        double_space in any::<bool>(),
    ) {
        let canonical = bip39::Mnemonic::from_entropy_in(bip39::Language::English, &entropy)
            .unwrap()
            .to_string();

        let mut mangled = canonical.to_uppercase();
        if double_space {
            mangled = mangled.replace(' ', "  ");
        }
        mangled.push(' ');

        let parsed = Mnemonic::from_phrase(&mangled).unwrap();
        prop_assert_eq!(parsed.phrase(), canonical);
    }
}
