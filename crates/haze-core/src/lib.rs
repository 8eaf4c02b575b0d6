//! # haze-core
//! Foundation types for the Haze wallet: hashes, Ed25519 keys, and the
//! confidential address codec.

pub mod address;
pub mod crypto;
pub mod error;
pub mod types;
