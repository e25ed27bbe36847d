//! Signer interface

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::Signatory;
use crate::crypto::{DerivationPath, HdError, KeyError, Signature};

use super::account::{AccountScope, Accounts};

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("No account at index {0}")]
    MissingAccount(u32),
    #[error("Derivation failed: {0}")]
    Derivation(#[from] HdError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Signer rejected the request: {0}")]
    Rejected(String),
    #[error("No signature returned for {0}")]
    MissingSignature(Signatory),
}

/// Holder of private keys: a hardware device, a remote service or a local
/// [`Keychain`](super::Keychain)
#[async_trait]
pub trait Signer: Send + Sync {
    /// Public account keys for the requested families
    async fn accounts(&self, scope: AccountScope) -> Result<Accounts, SignerError>;

    /// Sign `unsigned` once per entry of `paths`
    async fn sign_transaction(
        &self,
        unsigned: &[u8],
        paths: &HashMap<Signatory, DerivationPath>,
    ) -> Result<HashMap<Signatory, Signature>, SignerError>;

    async fn sign_message(
        &self,
        message: &[u8],
        path: &DerivationPath,
    ) -> Result<Signature, SignerError>;
}
