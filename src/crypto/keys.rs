//! secp256k1 key handling
//!
//! Provides key pairs, recoverable signatures and the two address hashes
//! the ledger uses: RIPEMD-160(SHA-256(compressed key)) for UTXO chains and
//! Keccak-256 of the uncompressed key for the account chain.

use std::fmt;

use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::{hash160, keccak256, sha256};
use crate::core::{Address, AddressError, EthAddress, ShortId};

/// Length of a recoverable signature: `r || s || recovery id`
pub const SIGNATURE_LEN: usize = 65;

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Shared secp256k1 context
pub(crate) fn secp() -> &'static Secp256k1<All> {
    &SECP
}

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

// =============================================================================
// Signature
// =============================================================================

/// A 65-byte recoverable ECDSA signature (`r || s || v`)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    fn to_recoverable(self) -> Result<RecoverableSignature, KeyError> {
        let recovery_id = RecoveryId::from_i32(i32::from(self.0[64]))?;
        Ok(RecoverableSignature::from_compact(&self.0[..64], recovery_id)?)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

// =============================================================================
// Key Pair
// =============================================================================

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let (secret_key, public_key) = secp().generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(secp(), &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Raw 20-byte address hash of this key
    pub fn short_id(&self) -> ShortId {
        public_key_hash(&self.public_key)
    }

    /// Chain-scoped address of this key
    pub fn address(&self, chain_alias: &str, hrp: &str) -> Result<Address, AddressError> {
        Address::new(chain_alias, hrp, self.short_id())
    }

    /// Account-chain address of this key
    pub fn eth_address(&self) -> EthAddress {
        public_key_to_eth_address(&self.public_key)
    }

    /// Sign the SHA-256 digest of `message`
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign_recoverable(&self.secret_key, message)
    }
}

/// RIPEMD-160(SHA-256(compressed public key))
pub fn public_key_hash(public_key: &PublicKey) -> ShortId {
    ShortId::new(hash160(&public_key.serialize()))
}

/// Last 20 bytes of Keccak-256 over the uncompressed key without its prefix
pub fn public_key_to_eth_address(public_key: &PublicKey) -> EthAddress {
    let uncompressed = public_key.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    EthAddress::new(bytes)
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign SHA-256(`message`) with a recoverable signature
pub fn sign_recoverable(secret_key: &SecretKey, message: &[u8]) -> Signature {
    let digest = Message::from_digest(sha256(message));
    let (recovery_id, compact) = secp()
        .sign_ecdsa_recoverable(&digest, secret_key)
        .serialize_compact();

    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[..64].copy_from_slice(&compact);
    // recovery ids are always in 0..=3
    bytes[64] = recovery_id.to_i32() as u8;
    Signature(bytes)
}

/// Recover the public key that produced `signature` over SHA-256(`message`)
pub fn recover_public_key(message: &[u8], signature: &Signature) -> Result<PublicKey, KeyError> {
    let digest = Message::from_digest(sha256(message));
    let recoverable = signature.to_recoverable()?;
    Ok(secp().recover_ecdsa(&digest, &recoverable)?)
}

/// Key hash of the signer of `message`
pub fn recover_address(message: &[u8], signature: &Signature) -> Result<ShortId, KeyError> {
    Ok(public_key_hash(&recover_public_key(message, signature)?))
}

/// Verify a signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, KeyError> {
    let digest = Message::from_digest(sha256(message));
    let standard = signature.to_recoverable()?.to_standard();
    Ok(secp().verify_ecdsa(&digest, &standard, public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.public_key_hex().len(), 66);
        assert_eq!(kp.short_id(), public_key_hash(&kp.public_key));
    }

    #[test]
    fn test_sign_recover_and_verify() {
        let kp = KeyPair::generate();
        let message = b"unsigned transaction bytes";

        let signature = kp.sign(message);
        assert!(signature.0[64] <= 3);
        assert_eq!(recover_public_key(message, &signature).unwrap(), kp.public_key);
        assert_eq!(recover_address(message, &signature).unwrap(), kp.short_id());
        assert!(verify_signature(&kp.public_key, message, &signature).unwrap());
        assert!(!verify_signature(&kp.public_key, b"tampered", &signature).unwrap());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let private_hex = hex::encode(kp1.secret_key.secret_bytes());

        let kp2 = KeyPair::from_private_key_hex(&private_hex).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.short_id(), kp2.short_id());
    }

    #[test]
    fn test_eth_address_of_known_key() {
        // private key 1 maps to the generator point
        let kp = KeyPair::from_private_key_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            kp.eth_address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_short_id_of_known_key() {
        let kp = KeyPair::from_private_key_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            hex::encode(kp.short_id().as_bytes()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }
}
