//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256, RIPEMD-160, Keccak-256 and HMAC-SHA512 helpers
//! - secp256k1 key pairs and recoverable signatures
//! - BIP32 derivation, split into watch-only and private capabilities

pub mod hash;
pub mod hd;
pub mod keys;

pub use hash::{checksum, hash160, hmac_sha512, keccak256, sha256, sha256_hex};
pub use hd::{
    ChainCode, ChildNumber, DerivationPath, ExtendedPrivateKey, ExtendedPublicKey, HdError,
    PublicDerivation, HARDENED_OFFSET,
};
pub use keys::{
    public_key_from_hex, public_key_hash, public_key_to_eth_address, recover_address,
    recover_public_key, sign_recoverable, verify_signature, KeyError, KeyPair, Signature, SIGNATURE_LEN,
};
