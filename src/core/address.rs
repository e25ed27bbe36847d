//! Chain-scoped addresses
//!
//! An [`Address`] is a 20-byte key hash scoped by a human-readable prefix and
//! a chain alias, rendered as `X-avax1...`. Two addresses with the same bytes
//! but a different scope are different values.

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::id::ShortId;
use crate::crypto::{ChildNumber, DerivationPath, HdError};

/// Address errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid human-readable prefix: {0}")]
    InvalidHrp(String),
    #[error("Missing chain alias in {0}")]
    MissingChainAlias(String),
    #[error("Invalid bech32 address: {0}")]
    InvalidBech32(String),
    #[error("Invalid address length: {0}")]
    InvalidLength(usize),
    #[error("Invalid hex address: {0}")]
    InvalidHex(String),
}

// =============================================================================
// Address
// =============================================================================

/// Bech32 address on a UTXO chain
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    chain_alias: String,
    hrp: String,
    bytes: ShortId,
}

impl Address {
    pub fn new(chain_alias: &str, hrp: &str, bytes: ShortId) -> Result<Self, AddressError> {
        let parsed = Hrp::parse(hrp).map_err(|_| AddressError::InvalidHrp(hrp.to_string()))?;
        if chain_alias.is_empty() {
            return Err(AddressError::MissingChainAlias(hrp.to_string()));
        }
        Ok(Self {
            chain_alias: chain_alias.to_string(),
            hrp: parsed.to_lowercase(),
            bytes,
        })
    }

    pub fn chain_alias(&self) -> &str {
        &self.chain_alias
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    pub fn short_id(&self) -> ShortId {
        self.bytes
    }

    /// Same key hash under another chain alias
    pub fn with_chain_alias(&self, chain_alias: &str) -> Self {
        Self {
            chain_alias: chain_alias.to_string(),
            hrp: self.hrp.clone(),
            bytes: self.bytes,
        }
    }

    /// Bech32 body without the chain alias
    pub fn bech32(&self) -> Result<String, AddressError> {
        let hrp = Hrp::parse(&self.hrp).map_err(|_| AddressError::InvalidHrp(self.hrp.clone()))?;
        bech32::encode::<Bech32>(hrp, self.bytes.as_bytes())
            .map_err(|e| AddressError::InvalidBech32(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.bech32().map_err(|_| fmt::Error)?;
        write!(f, "{}-{}", self.chain_alias, body)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alias, body) = s
            .split_once('-')
            .ok_or_else(|| AddressError::MissingChainAlias(s.to_string()))?;
        let (hrp, data) =
            bech32::decode(body).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;
        let bytes = ShortId::from_slice(&data).map_err(|_| AddressError::InvalidLength(data.len()))?;
        Address::new(alias, &hrp.to_lowercase(), bytes)
    }
}

// =============================================================================
// EVM Address
// =============================================================================

/// 20-byte account address on the EVM chain, rendered as `0x` hex
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EthAddress([u8; 20]);

impl EthAddress {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self)
    }
}

impl FromStr for EthAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

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

serde_as_string!(Address, EthAddress);

// =============================================================================
// Extended Address
// =============================================================================

/// Position of a derived address below its account key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressPath {
    pub account: u32,
    pub change: bool,
    pub index: u32,
}

impl AddressPath {
    /// Full path `m/44'/<coin>'/<account>'/<change>/<index>`
    pub fn derivation_path(&self, coin_type: u32) -> Result<DerivationPath, HdError> {
        Ok(DerivationPath::from(vec![
            ChildNumber::hardened(44)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(self.account)?,
            ChildNumber::normal(u32::from(self.change))?,
            ChildNumber::normal(self.index)?,
        ]))
    }
}

/// An address together with the path that derived it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedAddress {
    pub address: Address,
    pub path: AddressPath,
}

impl ExtendedAddress {
    pub fn new(address: Address, path: AddressPath) -> Self {
        Self { address, path }
    }
}

// =============================================================================
// Signatory
// =============================================================================

/// Anything a credential signature can be requested for
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signatory {
    Address(Address),
    Eth(EthAddress),
}

impl fmt::Display for Signatory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signatory::Address(address) => address.fmt(f),
            Signatory::Eth(address) => address.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::new("X", "avax", ShortId::new([0x3c; 20])).unwrap()
    }

    #[test]
    fn test_text_roundtrip() {
        let address = sample();
        let text = address.to_string();
        assert!(text.starts_with("X-avax1"));
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_scope_is_part_of_identity() {
        let x = sample();
        let p = x.with_chain_alias("P");
        assert_eq!(x.short_id(), p.short_id());
        assert_ne!(x, p);

        let other_hrp = Address::new("X", "fuji", x.short_id()).unwrap();
        assert_ne!(x, other_hrp);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "avax1qqqq".parse::<Address>(),
            Err(AddressError::MissingChainAlias(_))
        ));
        assert!(matches!(
            "X-notbech32".parse::<Address>(),
            Err(AddressError::InvalidBech32(_))
        ));
        assert!(Address::new("X", "", ShortId::default()).is_err());
    }

    #[test]
    fn test_eth_address_text() {
        let address: EthAddress = "0x8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC".parse().unwrap();
        assert_eq!(address.to_string(), "0x8db97c7cece249c2b98bdc0226cc4c2a57bf52fc");
        assert!("0x1234".parse::<EthAddress>().is_err());
    }

    #[test]
    fn test_address_path() {
        let path = AddressPath {
            account: 2,
            change: true,
            index: 7,
        };
        assert_eq!(path.derivation_path(9000).unwrap().to_string(), "m/44'/9000'/2'/1/7");
    }
}
