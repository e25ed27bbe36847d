//! Core ledger types
//!
//! This module contains the values every other layer builds on:
//! - Chain kinds and their aliases
//! - 32/20-byte identifiers with CB58 text form
//! - Chain-scoped bech32 addresses and EVM addresses
//! - UTXO references and records

pub mod address;
pub mod chain;
pub mod id;
pub mod utxo;

pub use address::{Address, AddressError, AddressPath, EthAddress, ExtendedAddress, Signatory};
pub use chain::ChainKind;
pub use id::{cb58_decode, cb58_encode, Id, IdError, NodeId, ShortId, NODE_ID_PREFIX};
pub use utxo::{Utxo, UtxoId};
