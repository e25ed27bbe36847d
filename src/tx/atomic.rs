//! Cross-chain atomic transactions shared by the asset and platform chains

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::core::Id;

use super::base::BaseTx;
use super::input::{sort_inputs, TransferableInput};
use super::output::{sort_outputs, TransferableOutput};
use super::TxError;

/// Consumes UTXOs exported to this chain from `source_chain`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: Id,
    pub imported_inputs: Vec<TransferableInput>,
}

impl ImportTx {
    pub fn new(base: BaseTx, source_chain: Id, mut imported_inputs: Vec<TransferableInput>) -> Self {
        sort_inputs(&mut imported_inputs);
        Self {
            base,
            source_chain,
            imported_inputs,
        }
    }
}

impl Encodable for ImportTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        self.source_chain.encode(encoder)?;
        encoder.write_array(&self.imported_inputs)
    }
}

impl Decodable for ImportTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            base: decoder.read()?,
            source_chain: decoder.read()?,
            imported_inputs: decoder.read_array()?,
        })
    }
}

/// Moves outputs into the shared memory of `destination_chain`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: Id,
    pub exported_outputs: Vec<TransferableOutput>,
}

impl ExportTx {
    pub fn new(
        base: BaseTx,
        destination_chain: Id,
        mut exported_outputs: Vec<TransferableOutput>,
    ) -> Result<Self, TxError> {
        sort_outputs(&mut exported_outputs)?;
        Ok(Self {
            base,
            destination_chain,
            exported_outputs,
        })
    }
}

impl Encodable for ExportTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        self.destination_chain.encode(encoder)?;
        encoder.write_array(&self.exported_outputs)
    }
}

impl Decodable for ExportTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            base: decoder.read()?,
            destination_chain: decoder.read()?,
            exported_outputs: decoder.read_array()?,
        })
    }
}
