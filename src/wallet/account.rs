//! Watch-only accounts handed out by signers

use bitflags::bitflags;
use secp256k1::PublicKey;

use crate::core::{Address, EthAddress};
use crate::crypto::{
    public_key_hash, ChildNumber, DerivationPath, ExtendedPublicKey, HdError, PublicDerivation,
};

/// BIP44 coin type of the UTXO chains
pub const AVAX_COIN_TYPE: u32 = 9000;
/// BIP44 coin type of the account chain
pub const ETH_COIN_TYPE: u32 = 60;

bitflags! {
    /// Which account families a signer is asked for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccountScope: u8 {
        const AVALANCHE = 0b01;
        const ETHEREUM = 0b10;
    }
}

/// `m/44'/9000'/<index>'`
pub fn avalanche_account_path(index: u32) -> Result<DerivationPath, HdError> {
    Ok(DerivationPath::from(vec![
        ChildNumber::hardened(44)?,
        ChildNumber::hardened(AVAX_COIN_TYPE)?,
        ChildNumber::hardened(index)?,
    ]))
}

/// `m/44'/60'/0'/0/<index>`
pub fn eth_account_path(index: u32) -> Result<DerivationPath, HdError> {
    Ok(DerivationPath::from(vec![
        ChildNumber::hardened(44)?,
        ChildNumber::hardened(ETH_COIN_TYPE)?,
        ChildNumber::hardened(0)?,
        ChildNumber::normal(0)?,
        ChildNumber::normal(index)?,
    ]))
}

/// Account-level extended public key of the UTXO chains
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    pub index: u32,
    pub xpub: ExtendedPublicKey,
}

impl Account {
    pub fn new(index: u32, xpub: ExtendedPublicKey) -> Self {
        Self { index, xpub }
    }

    /// Key of the external (`false`) or change (`true`) branch
    pub fn branch(&self, change: bool) -> Result<ExtendedPublicKey, HdError> {
        let (key, used) = self.xpub.derive_public(u32::from(change))?;
        if used != u32::from(change) {
            // branch index is fixed in every address path
            return Err(HdError::IndexExhausted(u32::from(change)));
        }
        Ok(key)
    }

    /// Address derived below `branch` at `index`, or at the next valid index
    pub fn address_at(
        branch: &ExtendedPublicKey,
        index: u32,
        chain_alias: &str,
        hrp: &str,
    ) -> Result<(Address, u32), AccountError> {
        let (child, used) = branch.derive_public(index)?;
        let address = Address::new(chain_alias, hrp, public_key_hash(&child.public_key))?;
        Ok((address, used))
    }
}

/// Account-chain key and its address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EthAccount {
    pub index: u32,
    pub public_key: PublicKey,
    pub address: EthAddress,
}

impl EthAccount {
    pub fn path(&self) -> Result<DerivationPath, HdError> {
        eth_account_path(self.index)
    }
}

/// Everything a signer exposes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accounts {
    pub avalanche: Vec<Account>,
    pub ethereum: Vec<EthAccount>,
}

#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("Derivation error: {0}")]
    Derivation(#[from] HdError),
    #[error("Address error: {0}")]
    Address(#[from] crate::core::AddressError),
}
