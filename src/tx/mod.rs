//! Transaction model
//!
//! Wire records for all three chains:
//! - outputs, inputs, operations and credentials as tagged sum types
//! - transaction bodies unified in [`UnsignedTx`]
//! - [`ExtendedTx`] pairs a body with the signers of every credential slot
//! - [`SignedTx`] is the broadcastable form
//!
//! Constructors validate the protocol limits and sort every list that has a
//! canonical order, so equal transactions always encode to equal bytes.

pub mod atomic;
pub mod avm;
pub mod base;
pub mod credential;
pub mod evm;
pub mod extended;
pub mod input;
pub mod operation;
pub mod output;
pub mod pvm;
pub mod signed;
pub mod unsigned;

use thiserror::Error;

use crate::codec::{CodecError, Decoder, TypeFamily};

pub use atomic::{ExportTx, ImportTx};
pub use avm::{CreateAssetTx, InitialState, OperationTx};
pub use base::BaseTx;
pub use credential::{Credential, CredentialKind};
pub use evm::{EvmExportTx, EvmImportTx, EvmInput, EvmOutput};
pub use extended::{CredentialSigners, ExtendedTx};
pub use input::{sort_inputs, Input, StakeableLockIn, TransferInput, TransferableInput};
pub use operation::{
    MintOperation, NftMintOperation, NftTransferOperation, Operation, TransferableOperation,
};
pub use output::{
    sort_outputs, MintOutput, NftMintOutput, NftTransferOutput, Output, OutputOwners,
    StakeableLockOut, TransferOutput, TransferableOutput,
};
pub use pvm::{AddDelegatorTx, AddValidatorTx, CreateSubnetTx, Validator};
pub use signed::SignedTx;
pub use unsigned::{SigRequirement, SpendSource, UnsignedTx};

/// Maximum memo size in bytes
pub const MAX_MEMO_LEN: usize = 256;
/// Maximum asset name size in bytes
pub const MAX_NAME_LEN: usize = 128;
/// Maximum asset symbol size in bytes
pub const MAX_SYMBOL_LEN: usize = 4;
/// Maximum asset denomination
pub const MAX_DENOMINATION: u8 = 32;
/// Maximum NFT payload size in bytes
pub const MAX_NFT_PAYLOAD_LEN: usize = 1024;
/// Delegation fee shares are parts per million
pub const MAX_DELEGATION_SHARES: u32 = 1_000_000;

/// Wire discriminants
pub mod type_id {
    // shared secp256k1 types
    pub const SECP_TRANSFER_INPUT: u32 = 5;
    pub const SECP_MINT_OUTPUT: u32 = 6;
    pub const SECP_TRANSFER_OUTPUT: u32 = 7;
    pub const SECP_MINT_OPERATION: u32 = 8;
    pub const SECP_CREDENTIAL: u32 = 9;

    // asset chain
    pub const X_BASE_TX: u32 = 0;
    pub const X_CREATE_ASSET_TX: u32 = 1;
    pub const X_OPERATION_TX: u32 = 2;
    pub const X_IMPORT_TX: u32 = 3;
    pub const X_EXPORT_TX: u32 = 4;
    pub const NFT_MINT_OUTPUT: u32 = 10;
    pub const NFT_TRANSFER_OUTPUT: u32 = 11;
    pub const NFT_MINT_OPERATION: u32 = 12;
    pub const NFT_TRANSFER_OPERATION: u32 = 13;
    pub const NFT_CREDENTIAL: u32 = 14;

    // platform chain
    pub const P_OUTPUT_OWNERS: u32 = 11;
    pub const P_ADD_VALIDATOR_TX: u32 = 12;
    pub const P_ADD_DELEGATOR_TX: u32 = 14;
    pub const P_CREATE_SUBNET_TX: u32 = 16;
    pub const P_IMPORT_TX: u32 = 17;
    pub const P_EXPORT_TX: u32 = 18;
    pub const STAKEABLE_LOCK_IN: u32 = 21;
    pub const STAKEABLE_LOCK_OUT: u32 = 22;

    // evm chain
    pub const C_IMPORT_TX: u32 = 0;
    pub const C_EXPORT_TX: u32 = 1;
}

/// Malformed transaction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Memo too long: {0} bytes (max {MAX_MEMO_LEN})")]
    MemoTooLong(usize),
    #[error("Asset name too long: {0} bytes (max {MAX_NAME_LEN})")]
    NameTooLong(usize),
    #[error("Asset name must be ASCII")]
    NameNotAscii,
    #[error("Asset symbol too long: {0} bytes (max {MAX_SYMBOL_LEN})")]
    SymbolTooLong(usize),
    #[error("Asset symbol must be ASCII")]
    SymbolNotAscii,
    #[error("Denomination {0} exceeds {MAX_DENOMINATION}")]
    DenominationTooLarge(u8),
    #[error("Threshold {threshold} exceeds {owners} owners")]
    ThresholdTooHigh { threshold: u32, owners: usize },
    #[error("Threshold 0 with owners makes the output unspendable")]
    UnspendableOwners,
    #[error("Amount must be positive")]
    ZeroAmount,
    #[error("NFT payload too long: {0} bytes (max {MAX_NFT_PAYLOAD_LEN})")]
    PayloadTooLarge(usize),
    #[error("Delegation shares {0} exceed {MAX_DELEGATION_SHARES}")]
    SharesTooHigh(u32),
    #[error("Validation period ends before it starts")]
    InvalidValidationPeriod,
    #[error("Operation references no UTXO")]
    MissingUtxoReference,
    #[error("Expected {expected} credentials, got {actual}")]
    CredentialCountMismatch { expected: usize, actual: usize },
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Read a discriminant that must equal `expected`
pub(crate) fn expect_type_id(
    decoder: &mut Decoder<'_>,
    family: TypeFamily,
    expected: u32,
) -> Result<(), CodecError> {
    let type_id = decoder.read_u32()?;
    if type_id != expected {
        return Err(CodecError::UnknownTypeId {
            family,
            type_id,
            path: decoder.path(),
        });
    }
    Ok(())
}

/// Map a validation failure met while decoding into a codec error
pub(crate) fn check(decoder: &Decoder<'_>, result: Result<(), TxError>) -> Result<(), CodecError> {
    result.map_err(|e| decoder.invalid(e.to_string()))
}
