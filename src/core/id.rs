//! Fixed-size identifiers and their CB58 text form
//!
//! CB58 is Base58 over the payload followed by the last four bytes of its
//! SHA-256 digest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crypto::checksum;

/// Prefix of the node id text form
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// Identifier parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),
    #[error("Checksum mismatch")]
    BadChecksum,
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Missing prefix {0}")]
    MissingPrefix(&'static str),
}

/// Encode `payload` as CB58
pub fn cb58_encode(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum(payload));
    bs58::encode(data).into_string()
}

/// Decode a CB58 string and verify its checksum
pub fn cb58_decode(text: &str) -> Result<Vec<u8>, IdError> {
    let data = bs58::decode(text)
        .into_vec()
        .map_err(|e| IdError::InvalidBase58(e.to_string()))?;
    if data.len() < 4 {
        return Err(IdError::BadChecksum);
    }
    let (payload, check) = data.split_at(data.len() - 4);
    if checksum(payload).as_slice() != check {
        return Err(IdError::BadChecksum);
    }
    Ok(payload.to_vec())
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], IdError> {
    bytes.try_into().map_err(|_| IdError::InvalidLength {
        expected: N,
        actual: bytes.len(),
    })
}

// =============================================================================
// Id
// =============================================================================

/// 32-byte identifier: transaction, asset and blockchain ids
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id([u8; 32]);

impl Id {
    pub const LEN: usize = 32;
    pub const ZERO: Id = Id([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(to_array(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s)?)
    }
}

// =============================================================================
// Short Id
// =============================================================================

/// 20-byte identifier: raw address hashes inside outputs
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortId([u8; 20]);

impl ShortId {
    pub const LEN: usize = 20;

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        Ok(Self(to_array(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", hex::encode(self.0))
    }
}

impl FromStr for ShortId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&cb58_decode(s)?)
    }
}

// =============================================================================
// Node Id
// =============================================================================

/// Validator node identity, rendered as `NodeID-<cb58>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub ShortId);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(NODE_ID_PREFIX)
            .ok_or(IdError::MissingPrefix(NODE_ID_PREFIX))?;
        Ok(Self(body.parse()?))
    }
}

// Ids travel as their text form in JSON configs and API payloads
macro_rules! serde_as_string {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    )*};
}

serde_as_string!(Id, ShortId, NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cb58_ids() {
        let zero: Id = "11111111111111111111111111111111LpoYY".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(Id::ZERO.to_string(), "11111111111111111111111111111111LpoYY");

        let asset: Id = "FvwEAhmxKfeiG8SnEvq42hc6whRyY3EFYAvebMqDNDGCgxN5Z".parse().unwrap();
        assert_eq!(
            hex::encode(asset.as_bytes()),
            "21e67317cbc4be2aeb00677ad6462778a8f52274b9d605df2591b23027a87dff"
        );
    }

    #[test]
    fn test_bad_checksum_rejected() {
        assert_eq!(
            "11111111111111111111111111111111LpoYZ".parse::<Id>(),
            Err(IdError::BadChecksum)
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let text = cb58_encode(&[7u8; 20]);
        assert!(matches!(
            text.parse::<Id>(),
            Err(IdError::InvalidLength { expected: 32, actual: 20 })
        ));
        assert!(text.parse::<ShortId>().is_ok());
    }

    #[test]
    fn test_node_id_text() {
        let node = NodeId(ShortId::new([9u8; 20]));
        let text = node.to_string();
        assert!(text.starts_with(NODE_ID_PREFIX));
        assert_eq!(text.parse::<NodeId>().unwrap(), node);
        assert!(text[NODE_ID_PREFIX.len()..].parse::<NodeId>().is_err());
    }

    #[test]
    fn test_serde_as_text() {
        let id = Id::new([3u8; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);
    }
}
