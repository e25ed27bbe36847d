//! EVM-chain atomic transactions

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::core::{EthAddress, Id};

use super::input::{sort_inputs, TransferableInput};
use super::output::{sort_outputs, TransferableOutput};
use super::TxError;

impl Encodable for EthAddress {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_raw(self.as_bytes());
        Ok(())
    }
}

impl Decodable for EthAddress {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(EthAddress::new(decoder.read_fixed()?))
    }
}

/// Credit of an account balance on import
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvmOutput {
    pub address: EthAddress,
    pub amount: u64,
    pub asset_id: Id,
}

impl Encodable for EvmOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.address.encode(encoder)?;
        encoder.write_u64(self.amount);
        self.asset_id.encode(encoder)
    }
}

impl Decodable for EvmOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            address: decoder.read()?,
            amount: decoder.read_u64()?,
            asset_id: decoder.read()?,
        })
    }
}

/// Debit of an account balance on export
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvmInput {
    pub address: EthAddress,
    pub amount: u64,
    pub asset_id: Id,
    pub nonce: u64,
}

impl Encodable for EvmInput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.address.encode(encoder)?;
        encoder.write_u64(self.amount);
        self.asset_id.encode(encoder)?;
        encoder.write_u64(self.nonce);
        Ok(())
    }
}

impl Decodable for EvmInput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            address: decoder.read()?,
            amount: decoder.read_u64()?,
            asset_id: decoder.read()?,
            nonce: decoder.read_u64()?,
        })
    }
}

/// Imports atomic UTXOs into account balances
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvmImportTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub source_chain: Id,
    pub imported_inputs: Vec<TransferableInput>,
    pub outputs: Vec<EvmOutput>,
}

impl EvmImportTx {
    pub fn new(
        network_id: u32,
        blockchain_id: Id,
        source_chain: Id,
        mut imported_inputs: Vec<TransferableInput>,
        mut outputs: Vec<EvmOutput>,
    ) -> Result<Self, TxError> {
        if outputs.iter().any(|out| out.amount == 0) {
            return Err(TxError::ZeroAmount);
        }
        sort_inputs(&mut imported_inputs);
        outputs.sort_by(|a, b| (a.address, a.asset_id).cmp(&(b.address, b.asset_id)));
        Ok(Self {
            network_id,
            blockchain_id,
            source_chain,
            imported_inputs,
            outputs,
        })
    }
}

impl Encodable for EvmImportTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.network_id);
        self.blockchain_id.encode(encoder)?;
        self.source_chain.encode(encoder)?;
        encoder.write_array(&self.imported_inputs)?;
        encoder.write_array(&self.outputs)
    }
}

impl Decodable for EvmImportTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            network_id: decoder.read_u32()?,
            blockchain_id: decoder.read()?,
            source_chain: decoder.read()?,
            imported_inputs: decoder.read_array()?,
            outputs: decoder.read_array()?,
        })
    }
}

/// Exports account balances as atomic UTXOs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvmExportTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub destination_chain: Id,
    pub inputs: Vec<EvmInput>,
    pub exported_outputs: Vec<TransferableOutput>,
}

impl EvmExportTx {
    pub fn new(
        network_id: u32,
        blockchain_id: Id,
        destination_chain: Id,
        mut inputs: Vec<EvmInput>,
        mut exported_outputs: Vec<TransferableOutput>,
    ) -> Result<Self, TxError> {
        if inputs.iter().any(|input| input.amount == 0) {
            return Err(TxError::ZeroAmount);
        }
        inputs.sort_by(|a, b| (a.address, a.asset_id).cmp(&(b.address, b.asset_id)));
        sort_outputs(&mut exported_outputs)?;
        Ok(Self {
            network_id,
            blockchain_id,
            destination_chain,
            inputs,
            exported_outputs,
        })
    }
}

impl Encodable for EvmExportTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.network_id);
        self.blockchain_id.encode(encoder)?;
        self.destination_chain.encode(encoder)?;
        encoder.write_array(&self.inputs)?;
        encoder.write_array(&self.exported_outputs)
    }
}

impl Decodable for EvmExportTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            network_id: decoder.read_u32()?,
            blockchain_id: decoder.read()?,
            destination_chain: decoder.read()?,
            inputs: decoder.read_array()?,
            exported_outputs: decoder.read_array()?,
        })
    }
}
