//! Per-chain discriminant tables
//!
//! Each chain maps `u32` discriminants to decode functions for five record
//! families. Lookups fall back to a shared table holding the secp256k1
//! types every chain understands. Tables are built on first use and are
//! read-only afterwards.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use super::{CodecError, Decoder};
use crate::core::ChainKind;
use crate::tx::type_id::*;
use crate::tx::{Credential, CredentialKind, Input, Operation, Output, UnsignedTx};

/// Polymorphic record families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Input,
    Output,
    Operation,
    Credential,
    Transaction,
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeFamily::Input => "input",
            TypeFamily::Output => "output",
            TypeFamily::Operation => "operation",
            TypeFamily::Credential => "credential",
            TypeFamily::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Decodes a record body once its discriminant has been read
pub type DecodeFn<T> = fn(&mut Decoder<'_>) -> Result<T, CodecError>;

struct Entry<T> {
    name: &'static str,
    decode: DecodeFn<T>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Entry<T> {}

type Table<T> = HashMap<u32, Entry<T>>;

fn register<T>(table: &mut Table<T>, type_id: u32, name: &'static str, decode: DecodeFn<T>) {
    table.insert(type_id, Entry { name, decode });
}

/// Discriminant tables of one chain
pub struct TypeRegistry {
    chain: Option<ChainKind>,
    inputs: Table<Input>,
    outputs: Table<Output>,
    operations: Table<Operation>,
    credentials: Table<Credential>,
    transactions: Table<UnsignedTx>,
    fallback: Option<&'static TypeRegistry>,
}

static SHARED: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::shared);
static ASSET: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::asset(Lazy::force(&SHARED)));
static PLATFORM: Lazy<TypeRegistry> =
    Lazy::new(|| TypeRegistry::platform(Lazy::force(&SHARED)));
static EVM: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::evm(Lazy::force(&SHARED)));

/// Tables for `chain`
pub fn registry(chain: ChainKind) -> &'static TypeRegistry {
    match chain {
        ChainKind::Asset => &ASSET,
        ChainKind::Platform => &PLATFORM,
        ChainKind::Evm => &EVM,
    }
}

impl TypeRegistry {
    fn empty(chain: Option<ChainKind>, fallback: Option<&'static TypeRegistry>) -> Self {
        Self {
            chain,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            operations: HashMap::new(),
            credentials: HashMap::new(),
            transactions: HashMap::new(),
            fallback,
        }
    }

    fn shared() -> Self {
        let mut reg = Self::empty(None, None);
        register(&mut reg.inputs, SECP_TRANSFER_INPUT, "TransferInput", |d| {
            Ok(Input::Transfer(d.read()?))
        });
        register(&mut reg.outputs, SECP_MINT_OUTPUT, "MintOutput", |d| {
            Ok(Output::Mint(d.read()?))
        });
        register(&mut reg.outputs, SECP_TRANSFER_OUTPUT, "TransferOutput", |d| {
            Ok(Output::Transfer(d.read()?))
        });
        register(&mut reg.operations, SECP_MINT_OPERATION, "MintOperation", |d| {
            Ok(Operation::Mint(d.read()?))
        });
        register(&mut reg.credentials, SECP_CREDENTIAL, "SecpCredential", |d| {
            Ok(Credential::new(CredentialKind::Secp, d.read_array()?))
        });
        reg
    }

    fn asset(shared: &'static TypeRegistry) -> Self {
        let mut reg = Self::empty(Some(ChainKind::Asset), Some(shared));
        register(&mut reg.transactions, X_BASE_TX, "BaseTx", |d| {
            Ok(UnsignedTx::Base(d.read()?))
        });
        register(&mut reg.transactions, X_CREATE_ASSET_TX, "CreateAssetTx", |d| {
            Ok(UnsignedTx::CreateAsset(d.read()?))
        });
        register(&mut reg.transactions, X_OPERATION_TX, "OperationTx", |d| {
            Ok(UnsignedTx::Operation(d.read()?))
        });
        register(&mut reg.transactions, X_IMPORT_TX, "ImportTx", |d| {
            Ok(UnsignedTx::AssetImport(d.read()?))
        });
        register(&mut reg.transactions, X_EXPORT_TX, "ExportTx", |d| {
            Ok(UnsignedTx::AssetExport(d.read()?))
        });
        register(&mut reg.outputs, NFT_MINT_OUTPUT, "NftMintOutput", |d| {
            Ok(Output::NftMint(d.read()?))
        });
        register(&mut reg.outputs, NFT_TRANSFER_OUTPUT, "NftTransferOutput", |d| {
            Ok(Output::NftTransfer(d.read()?))
        });
        register(&mut reg.operations, NFT_MINT_OPERATION, "NftMintOperation", |d| {
            Ok(Operation::NftMint(d.read()?))
        });
        register(&mut reg.operations, NFT_TRANSFER_OPERATION, "NftTransferOperation", |d| {
            Ok(Operation::NftTransfer(d.read()?))
        });
        register(&mut reg.credentials, NFT_CREDENTIAL, "NftCredential", |d| {
            Ok(Credential::new(CredentialKind::Nft, d.read_array()?))
        });
        reg
    }

    fn platform(shared: &'static TypeRegistry) -> Self {
        let mut reg = Self::empty(Some(ChainKind::Platform), Some(shared));
        register(&mut reg.transactions, P_ADD_VALIDATOR_TX, "AddValidatorTx", |d| {
            Ok(UnsignedTx::AddValidator(d.read()?))
        });
        register(&mut reg.transactions, P_ADD_DELEGATOR_TX, "AddDelegatorTx", |d| {
            Ok(UnsignedTx::AddDelegator(d.read()?))
        });
        register(&mut reg.transactions, P_CREATE_SUBNET_TX, "CreateSubnetTx", |d| {
            Ok(UnsignedTx::CreateSubnet(d.read()?))
        });
        register(&mut reg.transactions, P_IMPORT_TX, "ImportTx", |d| {
            Ok(UnsignedTx::PlatformImport(d.read()?))
        });
        register(&mut reg.transactions, P_EXPORT_TX, "ExportTx", |d| {
            Ok(UnsignedTx::PlatformExport(d.read()?))
        });
        register(&mut reg.inputs, STAKEABLE_LOCK_IN, "StakeableLockIn", |d| {
            Ok(Input::StakeableLock(d.read()?))
        });
        register(&mut reg.outputs, STAKEABLE_LOCK_OUT, "StakeableLockOut", |d| {
            Ok(Output::StakeableLock(d.read()?))
        });
        reg
    }

    fn evm(shared: &'static TypeRegistry) -> Self {
        let mut reg = Self::empty(Some(ChainKind::Evm), Some(shared));
        register(&mut reg.transactions, C_IMPORT_TX, "EvmImportTx", |d| {
            Ok(UnsignedTx::EvmImport(d.read()?))
        });
        register(&mut reg.transactions, C_EXPORT_TX, "EvmExportTx", |d| {
            Ok(UnsignedTx::EvmExport(d.read()?))
        });
        reg
    }

    /// Chain these tables belong to; `None` for the shared table
    pub fn chain(&self) -> Option<ChainKind> {
        self.chain
    }

    fn find<T>(&self, table: fn(&TypeRegistry) -> &Table<T>, type_id: u32) -> Option<Entry<T>> {
        table(self)
            .get(&type_id)
            .copied()
            .or_else(|| self.fallback.and_then(|shared| shared.find(table, type_id)))
    }

    fn dispatch<T>(
        &self,
        decoder: &mut Decoder<'_>,
        family: TypeFamily,
        table: fn(&TypeRegistry) -> &Table<T>,
    ) -> Result<T, CodecError> {
        let type_id = decoder.read_u32()?;
        let entry = self
            .find(table, type_id)
            .ok_or_else(|| CodecError::UnknownTypeId {
                family,
                type_id,
                path: decoder.path(),
            })?;
        decoder.scoped(entry.name, entry.decode)
    }

    /// Whether `type_id` is known in `family`
    pub fn contains(&self, family: TypeFamily, type_id: u32) -> bool {
        match family {
            TypeFamily::Input => self.find(|r| &r.inputs, type_id).is_some(),
            TypeFamily::Output => self.find(|r| &r.outputs, type_id).is_some(),
            TypeFamily::Operation => self.find(|r| &r.operations, type_id).is_some(),
            TypeFamily::Credential => self.find(|r| &r.credentials, type_id).is_some(),
            TypeFamily::Transaction => self.find(|r| &r.transactions, type_id).is_some(),
        }
    }

    pub fn decode_input(&self, decoder: &mut Decoder<'_>) -> Result<Input, CodecError> {
        self.dispatch(decoder, TypeFamily::Input, |r| &r.inputs)
    }

    pub fn decode_output(&self, decoder: &mut Decoder<'_>) -> Result<Output, CodecError> {
        self.dispatch(decoder, TypeFamily::Output, |r| &r.outputs)
    }

    pub fn decode_operation(&self, decoder: &mut Decoder<'_>) -> Result<Operation, CodecError> {
        self.dispatch(decoder, TypeFamily::Operation, |r| &r.operations)
    }

    pub fn decode_credential(&self, decoder: &mut Decoder<'_>) -> Result<Credential, CodecError> {
        self.dispatch(decoder, TypeFamily::Credential, |r| &r.credentials)
    }

    pub fn decode_transaction(&self, decoder: &mut Decoder<'_>) -> Result<UnsignedTx, CodecError> {
        self.dispatch(decoder, TypeFamily::Transaction, |r| &r.transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_types_on_every_chain() {
        for chain in ChainKind::ALL {
            let reg = registry(chain);
            assert_eq!(reg.chain(), Some(chain));
            assert!(reg.contains(TypeFamily::Input, SECP_TRANSFER_INPUT));
            assert!(reg.contains(TypeFamily::Output, SECP_TRANSFER_OUTPUT));
            assert!(reg.contains(TypeFamily::Output, SECP_MINT_OUTPUT));
            assert!(reg.contains(TypeFamily::Operation, SECP_MINT_OPERATION));
            assert!(reg.contains(TypeFamily::Credential, SECP_CREDENTIAL));
        }
    }

    #[test]
    fn test_chain_specific_tables() {
        let x = registry(ChainKind::Asset);
        let p = registry(ChainKind::Platform);
        let c = registry(ChainKind::Evm);

        assert!(x.contains(TypeFamily::Output, NFT_TRANSFER_OUTPUT));
        assert!(!p.contains(TypeFamily::Output, NFT_TRANSFER_OUTPUT));
        assert!(p.contains(TypeFamily::Output, STAKEABLE_LOCK_OUT));
        assert!(p.contains(TypeFamily::Transaction, P_ADD_DELEGATOR_TX));
        assert!(!p.contains(TypeFamily::Credential, NFT_CREDENTIAL));
        assert!(c.contains(TypeFamily::Transaction, C_EXPORT_TX));
        assert!(!c.contains(TypeFamily::Transaction, X_OPERATION_TX));
    }

    #[test]
    fn test_unknown_type_id() {
        let bytes = 99u32.to_be_bytes();
        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        let err = registry(ChainKind::Asset).decode_input(&mut decoder).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownTypeId {
                family: TypeFamily::Input,
                type_id: 99,
                path: String::new()
            }
        );
    }
}
