//! Operations on mint and NFT outputs

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::core::{Id, UtxoId};

use super::output::{MintOutput, NftTransferOutput, OutputOwners, TransferOutput};
use super::type_id::*;
use super::{check, TxError, MAX_NFT_PAYLOAD_LEN};

fn sorted_indices(mut indices: Vec<u32>) -> Vec<u32> {
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Mint more of a variable-cap asset, re-issuing the mint authority
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintOperation {
    pub address_indices: Vec<u32>,
    pub mint_output: MintOutput,
    pub transfer_output: TransferOutput,
}

impl MintOperation {
    pub fn new(
        address_indices: Vec<u32>,
        mint_output: MintOutput,
        transfer_output: TransferOutput,
    ) -> Self {
        Self {
            address_indices: sorted_indices(address_indices),
            mint_output,
            transfer_output,
        }
    }
}

impl Encodable for MintOperation {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_array(&self.address_indices)?;
        self.mint_output.encode(encoder)?;
        self.transfer_output.encode(encoder)
    }
}

impl Decodable for MintOperation {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            address_indices: decoder.read_array()?,
            mint_output: decoder.read()?,
            transfer_output: decoder.read()?,
        })
    }
}

/// Mint NFTs of one group to each owner set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NftMintOperation {
    pub address_indices: Vec<u32>,
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub outputs: Vec<OutputOwners>,
}

impl NftMintOperation {
    pub fn new(
        address_indices: Vec<u32>,
        group_id: u32,
        payload: Vec<u8>,
        outputs: Vec<OutputOwners>,
    ) -> Result<Self, TxError> {
        let op = Self {
            address_indices: sorted_indices(address_indices),
            group_id,
            payload,
            outputs,
        };
        op.validate()?;
        Ok(op)
    }

    fn validate(&self) -> Result<(), TxError> {
        if self.payload.len() > MAX_NFT_PAYLOAD_LEN {
            return Err(TxError::PayloadTooLarge(self.payload.len()));
        }
        self.outputs.iter().try_for_each(OutputOwners::validate)
    }
}

impl Encodable for NftMintOperation {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_array(&self.address_indices)?;
        encoder.write_u32(self.group_id);
        encoder.write_bytes(&self.payload)?;
        encoder.write_array(&self.outputs)
    }
}

impl Decodable for NftMintOperation {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let op = Self {
            address_indices: decoder.read_array()?,
            group_id: decoder.read_u32()?,
            payload: decoder.read_bytes()?,
            outputs: decoder.read_array()?,
        };
        check(decoder, op.validate())?;
        Ok(op)
    }
}

/// Move an NFT to new owners
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NftTransferOperation {
    pub address_indices: Vec<u32>,
    pub output: NftTransferOutput,
}

impl NftTransferOperation {
    pub fn new(address_indices: Vec<u32>, output: NftTransferOutput) -> Self {
        Self {
            address_indices: sorted_indices(address_indices),
            output,
        }
    }
}

impl Encodable for NftTransferOperation {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_array(&self.address_indices)?;
        self.output.encode(encoder)
    }
}

impl Decodable for NftTransferOperation {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            address_indices: decoder.read_array()?,
            output: decoder.read()?,
        })
    }
}

/// Any operation body, tagged with its discriminant on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Mint(MintOperation),
    NftMint(NftMintOperation),
    NftTransfer(NftTransferOperation),
}

impl Operation {
    pub fn type_id(&self) -> u32 {
        match self {
            Operation::Mint(_) => SECP_MINT_OPERATION,
            Operation::NftMint(_) => NFT_MINT_OPERATION,
            Operation::NftTransfer(_) => NFT_TRANSFER_OPERATION,
        }
    }

    pub fn address_indices(&self) -> &[u32] {
        match self {
            Operation::Mint(op) => &op.address_indices,
            Operation::NftMint(op) => &op.address_indices,
            Operation::NftTransfer(op) => &op.address_indices,
        }
    }
}

impl Encodable for Operation {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.type_id());
        match self {
            Operation::Mint(op) => op.encode(encoder),
            Operation::NftMint(op) => op.encode(encoder),
            Operation::NftTransfer(op) => op.encode(encoder),
        }
    }
}

impl Decodable for Operation {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.registry().decode_operation(decoder)
    }
}

/// An operation on one asset, consuming the referenced UTXOs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferableOperation {
    pub asset_id: Id,
    pub utxo_ids: Vec<UtxoId>,
    pub operation: Operation,
}

impl TransferableOperation {
    pub fn new(
        asset_id: Id,
        mut utxo_ids: Vec<UtxoId>,
        operation: Operation,
    ) -> Result<Self, TxError> {
        if utxo_ids.is_empty() {
            return Err(TxError::MissingUtxoReference);
        }
        utxo_ids.sort();
        Ok(Self {
            asset_id,
            utxo_ids,
            operation,
        })
    }
}

impl Encodable for TransferableOperation {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.asset_id.encode(encoder)?;
        encoder.write_array(&self.utxo_ids)?;
        self.operation.encode(encoder)
    }
}

impl Decodable for TransferableOperation {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("TransferableOperation", |d| {
            Ok(Self {
                asset_id: d.read()?,
                utxo_ids: d.read_array()?,
                operation: d.read()?,
            })
        })
    }
}
