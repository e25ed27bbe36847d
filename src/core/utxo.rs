//! Unspent transaction outputs

use std::fmt;

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::tx::Output;

use super::chain::ChainKind;
use super::id::Id;

/// Reference to one output of a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.output_index)
    }
}

impl Encodable for UtxoId {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.tx_id.encode(encoder)?;
        encoder.write_u32(self.output_index);
        Ok(())
    }
}

impl Decodable for UtxoId {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tx_id: decoder.read()?,
            output_index: decoder.read_u32()?,
        })
    }
}

/// An unspent output as reported by the network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub output: Output,
}

impl Utxo {
    pub fn new(utxo_id: UtxoId, asset_id: Id, output: impl Into<Output>) -> Self {
        Self {
            utxo_id,
            asset_id,
            output: output.into(),
        }
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
        let utxo = decoder.read()?;
        decoder.finish()?;
        Ok(utxo)
    }
}

impl Encodable for Utxo {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.utxo_id.encode(encoder)?;
        self.asset_id.encode(encoder)?;
        self.output.encode(encoder)
    }
}

impl Decodable for Utxo {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("Utxo", |d| {
            Ok(Self {
                utxo_id: d.read()?,
                asset_id: d.read()?,
                output: d.read()?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShortId;
    use crate::tx::{OutputOwners, TransferOutput};

    #[test]
    fn test_utxo_wire_roundtrip() {
        let utxo = Utxo::new(
            UtxoId::new(Id::new([7; 32]), 3),
            Id::new([8; 32]),
            TransferOutput::new(15, OutputOwners::single(ShortId::new([1; 20]))).unwrap(),
        );
        let bytes = utxo.serialize().unwrap();
        assert_eq!(&bytes[..2], &[0, 0]);
        assert_eq!(&bytes[34..38], &[0, 0, 0, 3]);
        assert_eq!(Utxo::deserialize(&bytes, ChainKind::Asset).unwrap(), utxo);

        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(
            Utxo::deserialize(&padded, ChainKind::Asset),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_utxo_id_order() {
        let a = UtxoId::new(Id::new([1; 32]), 9);
        let b = UtxoId::new(Id::new([2; 32]), 0);
        assert!(a < b);
        assert!(UtxoId::new(Id::new([1; 32]), 1) < a);
    }
}
