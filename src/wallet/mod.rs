//! Wallet layer: accounts, address discovery, builders and signing
//!
//! Everything that talks to the outside world sits behind two async traits:
//! [`UtxoSource`] for reading UTXOs and [`Signer`] for private keys.

pub mod account;
pub mod address_manager;
pub mod builder;
pub mod keychain;
pub mod signer;
pub mod signing;
pub mod utxo_source;

use thiserror::Error;

use crate::codec::CodecError;
use crate::core::{AddressError, ChainKind, EthAddress, UtxoId};
use crate::crypto::HdError;
use crate::selection::SelectionError;
use crate::tx::TxError;

pub use account::{
    avalanche_account_path, eth_account_path, Account, AccountScope, Accounts, EthAccount,
    AVAX_COIN_TYPE, ETH_COIN_TYPE,
};
pub use address_manager::{AddressManager, AddressManagerError};
pub use builder::{MinterSet, TxBuilder};
pub use keychain::Keychain;
pub use signer::{Signer, SignerError};
pub use signing::{extend_transaction, sign_transaction};
pub use utxo_source::{
    fetch_all_utxos, MemoryUtxoSource, UtxoPage, UtxoQuery, UtxoSource, UtxoSourceError,
    UtxoTarget,
};

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
    #[error("Transaction error: {0}")]
    Tx(#[from] TxError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Address manager error: {0}")]
    AddressManager(#[from] AddressManagerError),
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
    #[error("UTXO source error: {0}")]
    Source(#[from] UtxoSourceError),
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
    #[error("Derivation error: {0}")]
    Derivation(#[from] HdError),
    #[error("UTXO {0} is not in the provided set")]
    UnresolvedUtxo(UtxoId),
    #[error("UTXO {utxo_id} has no owner at index {index}")]
    OwnerIndexOutOfRange { utxo_id: UtxoId, index: u32 },
    #[error("UTXO {0} cannot be spent by this account")]
    UtxoNotOwned(UtxoId),
    #[error("UTXO {0} has the wrong output type for this operation")]
    WrongOutputType(UtxoId),
    #[error("No EVM account for {0}")]
    UnknownEthAccount(EthAddress),
    #[error("No derivation path for {0}")]
    MissingPath(String),
    #[error("Stake {stake} is below the minimum of {minimum}")]
    StakeBelowMinimum { stake: u64, minimum: u64 },
    #[error("{0} cannot build this transaction")]
    UnsupportedChain(ChainKind),
    #[error("No atomic UTXOs to import from {0}")]
    NothingToImport(ChainKind),
}
