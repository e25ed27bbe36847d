//! BIP32 hierarchical deterministic keys
//!
//! Watch-only derivation lives on [`ExtendedPublicKey`] behind the
//! [`PublicDerivation`] trait; it never touches secret material. Hardened and
//! private derivation is only available on [`ExtendedPrivateKey`], which the
//! address manager never sees.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use secp256k1::{PublicKey, Scalar, SecretKey};
use thiserror::Error;

use super::hash::hmac_sha512;
use super::keys::secp;

// =============================================================================
// Constants
// =============================================================================

/// First hardened child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for master key generation
const MASTER_KEY_SALT: &[u8] = b"Bitcoin seed";

pub type ChainCode = [u8; 32];

/// HD derivation errors
#[derive(Error, Debug)]
pub enum HdError {
    #[error("Cannot derive hardened child {0} from a public key")]
    HardenedFromPublic(u32),
    #[error("Child index space exhausted after {0}")]
    IndexExhausted(u32),
    #[error("Invalid seed length {0}: must be 16..=64 bytes")]
    InvalidSeedLength(usize),
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),
    #[error("HMAC error")]
    Hmac,
    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

// =============================================================================
// Derivation Path
// =============================================================================

/// One step of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildNumber(u32);

impl ChildNumber {
    pub fn normal(index: u32) -> Result<Self, HdError> {
        if index >= HARDENED_OFFSET {
            return Err(HdError::InvalidPath(format!("index {} out of range", index)));
        }
        Ok(Self(index))
    }

    pub fn hardened(index: u32) -> Result<Self, HdError> {
        if index >= HARDENED_OFFSET {
            return Err(HdError::InvalidPath(format!("index {} out of range", index)));
        }
        Ok(Self(index | HARDENED_OFFSET))
    }

    pub fn is_hardened(&self) -> bool {
        self.0 >= HARDENED_OFFSET
    }

    /// Index without the hardened bit
    pub fn index(&self) -> u32 {
        self.0 & !HARDENED_OFFSET
    }

    /// Raw serialized value (hardened bit included)
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

/// A BIP32 derivation path such as `m/44'/9000'/0'/0/3`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn master() -> Self {
        Self(Vec::new())
    }

    /// Path extended by one step
    pub fn child(&self, step: ChildNumber) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(steps: Vec<ChildNumber>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for step in &self.0 {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = HdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(HdError::InvalidPath(s.to_string()));
        }

        let mut steps = Vec::new();
        for part in parts {
            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| HdError::InvalidPath(s.to_string()))?;
            steps.push(if hardened {
                ChildNumber::hardened(index)?
            } else {
                ChildNumber::normal(index)?
            });
        }
        Ok(Self(steps))
    }
}

// =============================================================================
// Public Derivation
// =============================================================================

/// Watch-only child derivation
pub trait PublicDerivation {
    fn public_key(&self) -> &PublicKey;
    fn chain_code(&self) -> &ChainCode;

    /// Derive the non-hardened child at `index`.
    ///
    /// When `index` yields an invalid key (tweak not below the curve order or
    /// a point at infinity) the next index is tried. Returns the child and the
    /// index that was actually used.
    fn derive_public(&self, index: u32) -> Result<(ExtendedPublicKey, u32), HdError> {
        let parent = self.public_key().serialize();
        let mut current = index;
        loop {
            if current >= HARDENED_OFFSET {
                return Err(HdError::HardenedFromPublic(current));
            }

            let digest = hmac_sha512(self.chain_code(), &[&parent, &current.to_be_bytes()])
                .map_err(|_| HdError::Hmac)?;
            let (tweak, chain_code) = split_digest(&digest);

            if let Ok(tweak) = Scalar::from_be_bytes(tweak) {
                if let Ok(child) = self.public_key().add_exp_tweak(secp(), &tweak) {
                    return Ok((
                        ExtendedPublicKey {
                            public_key: child,
                            chain_code,
                        },
                        current,
                    ));
                }
            }

            log::warn!("Child index {} yields an invalid key, skipping", current);
            current = current
                .checked_add(1)
                .ok_or(HdError::IndexExhausted(current))?;
        }
    }
}

/// Extended public key (public key + chain code)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    pub public_key: PublicKey,
    pub chain_code: ChainCode,
}

impl ExtendedPublicKey {
    pub fn new(public_key: PublicKey, chain_code: ChainCode) -> Self {
        Self {
            public_key,
            chain_code,
        }
    }
}

impl Hash for ExtendedPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.public_key.serialize().hash(state);
        self.chain_code.hash(state);
    }
}

impl PublicDerivation for ExtendedPublicKey {
    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn chain_code(&self) -> &ChainCode {
        &self.chain_code
    }
}

// =============================================================================
// Private Derivation
// =============================================================================

/// Extended private key; only signers hold these
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    secret_key: SecretKey,
    chain_code: ChainCode,
}

impl ExtendedPrivateKey {
    /// Master key from a BIP32 seed
    pub fn from_seed(seed: &[u8]) -> Result<Self, HdError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(HdError::InvalidSeedLength(seed.len()));
        }
        let digest = hmac_sha512(MASTER_KEY_SALT, &[seed]).map_err(|_| HdError::Hmac)?;
        let (key, chain_code) = split_digest(&digest);
        Ok(Self {
            secret_key: SecretKey::from_slice(&key)?,
            chain_code,
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn chain_code(&self) -> &ChainCode {
        &self.chain_code
    }

    /// Neutered counterpart, safe to hand to watch-only code
    pub fn to_public(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            public_key: PublicKey::from_secret_key(secp(), &self.secret_key),
            chain_code: self.chain_code,
        }
    }

    /// Derive one child, skipping invalid indices the same way as
    /// [`PublicDerivation::derive_public`]
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, HdError> {
        let mut current = child.raw();
        loop {
            let data: Vec<u8> = if current >= HARDENED_OFFSET {
                let mut data = Vec::with_capacity(33);
                data.push(0);
                data.extend_from_slice(&self.secret_key.secret_bytes());
                data
            } else {
                PublicKey::from_secret_key(secp(), &self.secret_key)
                    .serialize()
                    .to_vec()
            };

            let digest = hmac_sha512(&self.chain_code, &[&data, &current.to_be_bytes()])
                .map_err(|_| HdError::Hmac)?;
            let (tweak, chain_code) = split_digest(&digest);

            if let Ok(tweak) = Scalar::from_be_bytes(tweak) {
                if let Ok(secret_key) = self.secret_key.add_tweak(&tweak) {
                    return Ok(Self {
                        secret_key,
                        chain_code,
                    });
                }
            }

            let next = current
                .checked_add(1)
                .ok_or(HdError::IndexExhausted(current))?;
            if (current < HARDENED_OFFSET) != (next < HARDENED_OFFSET) {
                return Err(HdError::IndexExhausted(current));
            }
            current = next;
        }
    }

    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, HdError> {
        path.steps()
            .iter()
            .try_fold(self.clone(), |key, step| key.derive_child(*step))
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("public_key", &self.to_public().public_key)
            .finish_non_exhaustive()
    }
}

fn split_digest(digest: &[u8; 64]) -> ([u8; 32], ChainCode) {
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&digest[..32]);
    right.copy_from_slice(&digest[32..]);
    (left, right)
}
