//! In-memory signer backed by a BIP32 seed

use std::collections::HashMap;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::core::Signatory;
use crate::crypto::{DerivationPath, ExtendedPrivateKey, KeyPair, Signature};

use super::account::{
    avalanche_account_path, eth_account_path, Account, AccountScope, Accounts, EthAccount,
};
use super::signer::{Signer, SignerError};

/// Seed length used by [`Keychain::generate`]
pub const SEED_LEN: usize = 64;

/// Local key store; derives private keys on demand
pub struct Keychain {
    master: ExtendedPrivateKey,
    account_count: u32,
}

impl Keychain {
    pub fn from_seed(seed: &[u8], account_count: u32) -> Result<Self, SignerError> {
        Ok(Self {
            master: ExtendedPrivateKey::from_seed(seed)?,
            account_count,
        })
    }

    /// Fresh keychain and the seed to back it up with
    pub fn generate(account_count: u32) -> Result<(Self, Vec<u8>), SignerError> {
        let mut seed = vec![0u8; SEED_LEN];
        OsRng.fill_bytes(&mut seed);
        let keychain = Self::from_seed(&seed, account_count)?;
        Ok((keychain, seed))
    }

    pub fn key_at(&self, path: &DerivationPath) -> Result<KeyPair, SignerError> {
        let key = self.master.derive_path(path)?;
        Ok(KeyPair::from_secret_key(*key.secret_key()))
    }

    fn owns(key: &KeyPair, signatory: &Signatory) -> bool {
        match signatory {
            Signatory::Address(address) => key.short_id() == address.short_id(),
            Signatory::Eth(address) => key.eth_address() == *address,
        }
    }
}

#[async_trait]
impl Signer for Keychain {
    async fn accounts(&self, scope: AccountScope) -> Result<Accounts, SignerError> {
        let mut accounts = Accounts::default();
        if scope.contains(AccountScope::AVALANCHE) {
            for index in 0..self.account_count {
                let key = self.master.derive_path(&avalanche_account_path(index)?)?;
                accounts.avalanche.push(Account::new(index, key.to_public()));
            }
        }
        if scope.contains(AccountScope::ETHEREUM) {
            for index in 0..self.account_count {
                let key = self.key_at(&eth_account_path(index)?)?;
                accounts.ethereum.push(EthAccount {
                    index,
                    public_key: key.public_key,
                    address: key.eth_address(),
                });
            }
        }
        Ok(accounts)
    }

    async fn sign_transaction(
        &self,
        unsigned: &[u8],
        paths: &HashMap<Signatory, DerivationPath>,
    ) -> Result<HashMap<Signatory, Signature>, SignerError> {
        let mut signatures = HashMap::with_capacity(paths.len());
        for (signatory, path) in paths {
            let key = self.key_at(path)?;
            if !Self::owns(&key, signatory) {
                return Err(SignerError::Rejected(format!(
                    "{} does not derive {}",
                    path, signatory
                )));
            }
            signatures.insert(signatory.clone(), key.sign(unsigned));
        }
        log::debug!("Keychain produced {} signatures", signatures.len());
        Ok(signatures)
    }

    async fn sign_message(
        &self,
        message: &[u8],
        path: &DerivationPath,
    ) -> Result<Signature, SignerError> {
        Ok(self.key_at(path)?.sign(message))
    }
}
