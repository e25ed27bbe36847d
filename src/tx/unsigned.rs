//! Unsigned transaction sum type

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::core::{ChainKind, EthAddress, Id, UtxoId};

use super::atomic::{ExportTx, ImportTx};
use super::avm::{CreateAssetTx, OperationTx};
use super::base::BaseTx;
use super::credential::CredentialKind;
use super::evm::{EvmExportTx, EvmImportTx, EvmInput, EvmOutput};
use super::input::TransferableInput;
use super::operation::{Operation, TransferableOperation};
use super::output::TransferableOutput;
use super::pvm::{AddDelegatorTx, AddValidatorTx, CreateSubnetTx};
use super::type_id::*;
use super::TxError;

/// What a credential slot authorizes spending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpendSource {
    /// An output owned by the addresses at the slot's indices
    Utxo(UtxoId),
    /// An EVM account balance
    Account(EthAddress),
}

/// One credential slot: its kind, what it spends and which owners sign
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigRequirement {
    pub kind: CredentialKind,
    pub source: SpendSource,
    pub address_indices: Vec<u32>,
}

/// Every transaction body the engine can build or parse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnsignedTx {
    Base(BaseTx),
    CreateAsset(CreateAssetTx),
    Operation(OperationTx),
    AssetImport(ImportTx),
    AssetExport(ExportTx),
    AddValidator(AddValidatorTx),
    AddDelegator(AddDelegatorTx),
    CreateSubnet(CreateSubnetTx),
    PlatformImport(ImportTx),
    PlatformExport(ExportTx),
    EvmImport(EvmImportTx),
    EvmExport(EvmExportTx),
}

impl UnsignedTx {
    pub fn type_id(&self) -> u32 {
        match self {
            UnsignedTx::Base(_) => X_BASE_TX,
            UnsignedTx::CreateAsset(_) => X_CREATE_ASSET_TX,
            UnsignedTx::Operation(_) => X_OPERATION_TX,
            UnsignedTx::AssetImport(_) => X_IMPORT_TX,
            UnsignedTx::AssetExport(_) => X_EXPORT_TX,
            UnsignedTx::AddValidator(_) => P_ADD_VALIDATOR_TX,
            UnsignedTx::AddDelegator(_) => P_ADD_DELEGATOR_TX,
            UnsignedTx::CreateSubnet(_) => P_CREATE_SUBNET_TX,
            UnsignedTx::PlatformImport(_) => P_IMPORT_TX,
            UnsignedTx::PlatformExport(_) => P_EXPORT_TX,
            UnsignedTx::EvmImport(_) => C_IMPORT_TX,
            UnsignedTx::EvmExport(_) => C_EXPORT_TX,
        }
    }

    /// Chain whose type tables define this transaction
    pub fn chain(&self) -> ChainKind {
        match self {
            UnsignedTx::Base(_)
            | UnsignedTx::CreateAsset(_)
            | UnsignedTx::Operation(_)
            | UnsignedTx::AssetImport(_)
            | UnsignedTx::AssetExport(_) => ChainKind::Asset,
            UnsignedTx::AddValidator(_)
            | UnsignedTx::AddDelegator(_)
            | UnsignedTx::CreateSubnet(_)
            | UnsignedTx::PlatformImport(_)
            | UnsignedTx::PlatformExport(_) => ChainKind::Platform,
            UnsignedTx::EvmImport(_) | UnsignedTx::EvmExport(_) => ChainKind::Evm,
        }
    }

    /// Shared base fields; EVM transactions have none
    pub fn base(&self) -> Option<&BaseTx> {
        match self {
            UnsignedTx::Base(tx) => Some(tx),
            UnsignedTx::CreateAsset(tx) => Some(&tx.base),
            UnsignedTx::Operation(tx) => Some(&tx.base),
            UnsignedTx::AssetImport(tx) | UnsignedTx::PlatformImport(tx) => Some(&tx.base),
            UnsignedTx::AssetExport(tx) | UnsignedTx::PlatformExport(tx) => Some(&tx.base),
            UnsignedTx::AddValidator(tx) => Some(&tx.base),
            UnsignedTx::AddDelegator(tx) => Some(&tx.base),
            UnsignedTx::CreateSubnet(tx) => Some(&tx.base),
            UnsignedTx::EvmImport(_) | UnsignedTx::EvmExport(_) => None,
        }
    }

    pub fn network_id(&self) -> u32 {
        match self {
            UnsignedTx::EvmImport(tx) => tx.network_id,
            UnsignedTx::EvmExport(tx) => tx.network_id,
            _ => self.base().map_or(0, |base| base.network_id),
        }
    }

    /// Inputs in credential order: base inputs, then imported inputs
    pub fn inputs(&self) -> Vec<&TransferableInput> {
        let mut inputs: Vec<&TransferableInput> = self
            .base()
            .map(|base| base.inputs.iter().collect())
            .unwrap_or_default();
        match self {
            UnsignedTx::AssetImport(tx) | UnsignedTx::PlatformImport(tx) => {
                inputs.extend(tx.imported_inputs.iter())
            }
            UnsignedTx::EvmImport(tx) => inputs.extend(tx.imported_inputs.iter()),
            _ => {}
        }
        inputs
    }

    /// Every UTXO output this transaction creates that carries value
    /// out of its inputs: base, exported and staked outputs
    pub fn all_outputs(&self) -> Vec<&TransferableOutput> {
        let mut outputs: Vec<&TransferableOutput> = self
            .base()
            .map(|base| base.outputs.iter().collect())
            .unwrap_or_default();
        match self {
            UnsignedTx::AssetExport(tx) | UnsignedTx::PlatformExport(tx) => {
                outputs.extend(tx.exported_outputs.iter())
            }
            UnsignedTx::AddValidator(tx) => outputs.extend(tx.stake.iter()),
            UnsignedTx::AddDelegator(tx) => outputs.extend(tx.stake.iter()),
            UnsignedTx::EvmExport(tx) => outputs.extend(tx.exported_outputs.iter()),
            _ => {}
        }
        outputs
    }

    pub fn evm_inputs(&self) -> &[EvmInput] {
        match self {
            UnsignedTx::EvmExport(tx) => &tx.inputs,
            _ => &[],
        }
    }

    pub fn evm_outputs(&self) -> &[EvmOutput] {
        match self {
            UnsignedTx::EvmImport(tx) => &tx.outputs,
            _ => &[],
        }
    }

    pub fn operations(&self) -> &[TransferableOperation] {
        match self {
            UnsignedTx::Operation(tx) => &tx.operations,
            _ => &[],
        }
    }

    /// Value of `asset_id` consumed by this transaction
    pub fn input_total(&self, asset_id: &Id) -> u64 {
        let utxo: u64 = self
            .inputs()
            .into_iter()
            .filter(|input| &input.asset_id == asset_id)
            .fold(0, |sum, input| sum.saturating_add(input.input.amount()));
        self.evm_inputs()
            .iter()
            .filter(|input| &input.asset_id == asset_id)
            .fold(utxo, |sum, input| sum.saturating_add(input.amount))
    }

    /// Value of `asset_id` produced by this transaction
    pub fn output_total(&self, asset_id: &Id) -> u64 {
        let utxo: u64 = self
            .all_outputs()
            .into_iter()
            .filter(|out| &out.asset_id == asset_id)
            .filter_map(|out| out.output.amount())
            .fold(0, u64::saturating_add);
        self.evm_outputs()
            .iter()
            .filter(|out| &out.asset_id == asset_id)
            .fold(utxo, |sum, out| sum.saturating_add(out.amount))
    }

    /// Value of `asset_id` consumed but not produced
    pub fn burn(&self, asset_id: &Id) -> u64 {
        self.input_total(asset_id)
            .saturating_sub(self.output_total(asset_id))
    }

    /// Credential slots in the order credentials must appear
    pub fn signature_requirements(&self) -> Result<Vec<SigRequirement>, TxError> {
        let mut slots: Vec<SigRequirement> = self
            .inputs()
            .into_iter()
            .map(|input| SigRequirement {
                kind: CredentialKind::Secp,
                source: SpendSource::Utxo(input.utxo_id),
                address_indices: input.input.address_indices().to_vec(),
            })
            .collect();

        for op in self.operations() {
            let utxo_id = op.utxo_ids.first().ok_or(TxError::MissingUtxoReference)?;
            let kind = match op.operation {
                Operation::Mint(_) => CredentialKind::Secp,
                Operation::NftMint(_) | Operation::NftTransfer(_) => CredentialKind::Nft,
            };
            slots.push(SigRequirement {
                kind,
                source: SpendSource::Utxo(*utxo_id),
                address_indices: op.operation.address_indices().to_vec(),
            });
        }

        slots.extend(self.evm_inputs().iter().map(|input| SigRequirement {
            kind: CredentialKind::Secp,
            source: SpendSource::Account(input.address),
            address_indices: vec![0],
        }));
        Ok(slots)
    }

    /// Versioned wire bytes; these are what signers sign
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
        decoder.finish()?;
        Ok(tx)
    }
}

impl Encodable for UnsignedTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.type_id());
        match self {
            UnsignedTx::Base(tx) => tx.encode(encoder),
            UnsignedTx::CreateAsset(tx) => tx.encode(encoder),
            UnsignedTx::Operation(tx) => tx.encode(encoder),
            UnsignedTx::AssetImport(tx) | UnsignedTx::PlatformImport(tx) => tx.encode(encoder),
            UnsignedTx::AssetExport(tx) | UnsignedTx::PlatformExport(tx) => tx.encode(encoder),
            UnsignedTx::AddValidator(tx) => tx.encode(encoder),
            UnsignedTx::AddDelegator(tx) => tx.encode(encoder),
            UnsignedTx::CreateSubnet(tx) => tx.encode(encoder),
            UnsignedTx::EvmImport(tx) => tx.encode(encoder),
            UnsignedTx::EvmExport(tx) => tx.encode(encoder),
        }
    }
}

impl Decodable for UnsignedTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.registry().decode_transaction(decoder)
    }
}
