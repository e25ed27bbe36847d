//! Coin selection
//!
//! Chooses which UTXOs fund a request, records what was spent per asset in
//! [`AssetAmount`]s and emits destination and change outputs. The platform
//! chain variant also understands stake-locked outputs.

pub mod asset_amount;
pub mod goose_egg;
pub mod selector;
pub mod staked;

use thiserror::Error;

use crate::core::Id;
use crate::tx::TxError;

pub use asset_amount::{AssetAmount, AssetAmountDestination};
pub use goose_egg::{check_goose_egg, ensure_goose_egg, DEFAULT_GOOSE_EGG_CAP};
pub use selector::{select_minimum_spendable, Selection};
pub use staked::select_minimum_spendable_staked;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Insufficient funds for asset {asset_id}: need {needed}, found {available}")]
    InsufficientFunds {
        asset_id: Id,
        needed: u64,
        available: u64,
    },

    #[error("Transaction burns {burn}, above the cap of {cap} and its output total")]
    GooseEggCheckFailed { burn: u64, cap: u64 },

    #[error("Invalid transaction: {0}")]
    Tx(#[from] TxError),
}
