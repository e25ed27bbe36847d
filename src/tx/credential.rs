//! Credentials: the signatures authorizing each spend

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::crypto::Signature;

use super::type_id::{NFT_CREDENTIAL, SECP_CREDENTIAL};

/// Credential flavour required by an input or operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Secp,
    Nft,
}

impl CredentialKind {
    pub fn type_id(&self) -> u32 {
        match self {
            CredentialKind::Secp => SECP_CREDENTIAL,
            CredentialKind::Nft => NFT_CREDENTIAL,
        }
    }
}

/// Signatures for one input or operation, ordered by address index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    pub kind: CredentialKind,
    pub signatures: Vec<Signature>,
}

impl Credential {
    pub fn new(kind: CredentialKind, signatures: Vec<Signature>) -> Self {
        Self { kind, signatures }
    }
}

impl Encodable for Credential {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.kind.type_id());
        encoder.write_array(&self.signatures)
    }
}

impl Decodable for Credential {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.registry().decode_credential(decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainKind;
    use crate::crypto::KeyPair;

    #[test]
    fn test_credential_wire_form() {
        let signature = KeyPair::generate().sign(b"tx");
        let credential = Credential::new(CredentialKind::Secp, vec![signature]);
        let bytes = credential.to_bytes().unwrap();
        assert_eq!(&bytes[..8], &[0, 0, 0, 9, 0, 0, 0, 1]);
        assert_eq!(bytes.len(), 8 + 65);

        let mut decoder = Decoder::new(&bytes, ChainKind::Evm);
        assert_eq!(Credential::decode(&mut decoder).unwrap(), credential);
    }

    #[test]
    fn test_nft_credential_is_asset_only() {
        let credential = Credential::new(CredentialKind::Nft, vec![]);
        let bytes = credential.to_bytes().unwrap();

        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        assert_eq!(Credential::decode(&mut decoder).unwrap(), credential);

        let mut decoder = Decoder::new(&bytes, ChainKind::Platform);
        assert!(matches!(
            Credential::decode(&mut decoder),
            Err(CodecError::UnknownTypeId { type_id: 14, .. })
        ));
    }
}
