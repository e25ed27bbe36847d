//! UTXO Wallet Core: client-side transaction engine for a UTXO multi-chain ledger
//!
//! This crate provides everything a wallet needs short of a network client:
//! - Binary codec with per-chain type registries
//! - Transaction model for the asset, platform and EVM chains
//! - Coin selection, including stake-locked outputs
//! - HD address derivation with gap-limited discovery
//! - Signing orchestration behind an async `Signer` trait
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use utxo_wallet_core::config::NetworkConfig;
//! use utxo_wallet_core::wallet::{
//!     sign_transaction, AccountScope, AddressManager, Keychain, MemoryUtxoSource, TxBuilder,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = NetworkConfig::fuji();
//! let source = Arc::new(MemoryUtxoSource::new());
//! let (keychain, _seed) = Keychain::generate(1)?;
//!
//! // Discover the first account's addresses
//! let manager = Arc::new(AddressManager::new(&config, source.clone()));
//! manager.load_accounts(&keychain, AccountScope::all()).await?;
//!
//! // Build and sign a transfer of 1 AVAX
//! let avax = config.avax_asset_id;
//! let builder = TxBuilder::new(config, manager.clone(), source);
//! let to = manager.get(0, utxo_wallet_core::core::ChainKind::Asset, false).await?;
//! let extended = builder.send(0, &to, &[(avax, 1_000_000_000)], vec![]).await?;
//! let signed = sign_transaction(&extended, &keychain).await?;
//! println!("Transaction {}", signed.id()?);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod selection;
pub mod tx;
pub mod wallet;

// Re-export commonly used types
pub use codec::{CodecError, Decodable, Encodable};
pub use config::NetworkConfig;
pub use core::{Address, ChainKind, EthAddress, Id, NodeId, ShortId, Utxo, UtxoId};
pub use crypto::KeyPair;
pub use selection::{
    select_minimum_spendable, select_minimum_spendable_staked, AssetAmountDestination, Selection,
};
pub use tx::{ExtendedTx, SignedTx, UnsignedTx};
pub use wallet::{AddressManager, Keychain, Signer, TxBuilder, UtxoSource, WalletError};
