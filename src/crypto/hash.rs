//! Hashing utilities
//!
//! Thin wrappers over the digest crates used by the ledger:
//! - SHA-256 for transaction ids, signing digests and CB58 checksums
//! - RIPEMD-160 over SHA-256 for address hashes
//! - Keccak-256 for account-chain addresses
//! - HMAC-SHA512 for BIP32 child derivation

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;

type HmacSha512 = Hmac<Sha512>;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// RIPEMD-160 of SHA-256, the 20-byte address hash of a public key
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    ripemd.finalize().into()
}

/// Keccak-256 (the pre-standard SHA-3 variant used by EVM chains)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// HMAC-SHA512 keyed with `key` over the concatenation of `parts`
pub fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 64], InvalidLength> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Last four bytes of the SHA-256 digest, the CB58 checksum
pub fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = sha256(data);
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[28..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash160_length_and_determinism() {
        let a = hash160(b"public key bytes");
        let b = hash160(b"public key bytes");
        assert_eq!(a, b);
        assert_ne!(a, hash160(b"other key bytes"));
    }

    #[test]
    fn test_checksum_is_sha256_suffix() {
        let digest = sha256(b"abc");
        assert_eq!(checksum(b"abc"), digest[28..]);
    }

    #[test]
    fn test_hmac_sha512_rfc4231_case_2() {
        let mac = hmac_sha512(b"Jefe", &[b"what do ya want ", b"for nothing?"]).unwrap();
        assert_eq!(
            hex::encode(mac),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }
}
