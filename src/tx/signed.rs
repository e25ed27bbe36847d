//! Broadcastable signed transactions

use crate::codec::{CodecError, Decoder, Encodable, Encoder};
use crate::core::{ChainKind, Id};
use crate::crypto::sha256;

use super::credential::Credential;
use super::unsigned::UnsignedTx;
use super::TxError;

/// Unsigned body plus one credential per signature slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedTx {
    pub tx: UnsignedTx,
    pub credentials: Vec<Credential>,
}

impl SignedTx {
    pub fn new(tx: UnsignedTx, credentials: Vec<Credential>) -> Result<Self, TxError> {
        let expected = tx.signature_requirements()?.len();
        if credentials.len() != expected {
            return Err(TxError::CredentialCountMismatch {
                expected,
                actual: credentials.len(),
            });
        }
        Ok(Self { tx, credentials })
    }

    /// Versioned wire bytes
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let mut encoder = Encoder::versioned();
        self.encode(&mut encoder)?;
        Ok(encoder.into_bytes())
    }

    /// Parse versioned wire bytes using the type tables of `chain`
    pub fn deserialize(bytes: &[u8], chain: ChainKind) -> Result<Self, CodecError> {
        let mut decoder = Decoder::new(bytes, chain);
        decoder.read_version()?;
        let tx = decoder.read()?;
        let credentials = decoder.scoped("credentials", |d| d.read_array())?;
        decoder.finish()?;
        Ok(Self { tx, credentials })
    }

    /// Transaction id: SHA-256 of the signed bytes
    pub fn id(&self) -> Result<Id, CodecError> {
        Ok(Id::new(sha256(&self.serialize()?)))
    }
}

impl Encodable for SignedTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.tx.encode(encoder)?;
        encoder.write_array(&self.credentials)
    }
}
