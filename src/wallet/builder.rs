//! High-level transaction builders
//!
//! Each builder resolves the account's addresses, reads their UTXOs, runs
//! coin selection, checks the burn and returns an [`ExtendedTx`] ready for
//! [`sign_transaction`](super::sign_transaction).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::NetworkConfig;
use crate::core::{Address, ChainKind, EthAddress, Id, NodeId, ShortId, Utxo, UtxoId};
use crate::selection::{
    ensure_goose_egg, select_minimum_spendable, select_minimum_spendable_staked,
    AssetAmountDestination, Selection, SelectionError,
};
use crate::tx::{
    AddDelegatorTx, AddValidatorTx, BaseTx, CreateAssetTx, CreateSubnetTx, EvmExportTx,
    EvmImportTx, EvmInput, EvmOutput, ExportTx, ExtendedTx, ImportTx, InitialState, MintOperation,
    MintOutput, NftMintOperation, NftTransferOperation, NftTransferOutput, Operation, OperationTx,
    Output, OutputOwners, TransferInput, TransferOutput, TransferableInput, TransferableOperation,
    TransferableOutput, TxError, UnsignedTx, Validator,
};

use super::address_manager::{AddressManager, AddressManagerError};
use super::signing::extend_transaction;
use super::utxo_source::{fetch_all_utxos, UtxoSource, UtxoTarget};
use super::WalletError;

/// Feature extension index of secp256k1 outputs
const SECP_FX_INDEX: u32 = 0;

/// Mint authority given to a new variable-cap asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinterSet {
    pub addresses: Vec<Address>,
    pub threshold: u32,
}

/// Addresses, change address and UTXOs of one account on one chain
struct Spendable {
    senders: Vec<ShortId>,
    change: ShortId,
    utxos: Vec<Utxo>,
}

/// Atomic UTXOs another chain exported to one account
struct Exported {
    senders: Vec<ShortId>,
    utxos: Vec<Utxo>,
}

fn short_ids(addresses: &[Address]) -> Vec<ShortId> {
    addresses.iter().map(Address::short_id).collect()
}

fn owned_by(addresses: &[Address]) -> Result<OutputOwners, TxError> {
    OutputOwners::new(short_ids(addresses), 0, 1)
}

/// Builds unsigned transactions for the accounts of an [`AddressManager`]
pub struct TxBuilder {
    config: NetworkConfig,
    manager: Arc<AddressManager>,
    source: Arc<dyn UtxoSource>,
    as_of: Option<DateTime<Utc>>,
}

impl TxBuilder {
    pub fn new(
        config: NetworkConfig,
        manager: Arc<AddressManager>,
        source: Arc<dyn UtxoSource>,
    ) -> Self {
        Self {
            config,
            manager,
            source,
            as_of: None,
        }
    }

    /// Evaluate locktimes at a fixed time instead of now
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }

    fn now_secs(&self) -> u64 {
        u64::try_from(self.now().timestamp()).unwrap_or(0)
    }

    fn blockchain(&self, chain: ChainKind) -> Id {
        self.config.blockchain_id(chain)
    }

    fn avax(&self) -> Id {
        self.config.avax_asset_id
    }

    async fn utxos_of(
        &self,
        chain: ChainKind,
        addresses: &[Address],
        source_chain: Option<ChainKind>,
    ) -> Result<Vec<Utxo>, WalletError> {
        let utxos = fetch_all_utxos(
            self.source.as_ref(),
            chain,
            UtxoTarget::Addresses(addresses.to_vec()),
            source_chain,
            self.config.utxo_page_limit,
        )
        .await?;
        log::debug!(
            "{} addresses on {} (source {:?}): {} UTXOs",
            addresses.len(),
            chain,
            source_chain,
            utxos.len()
        );
        Ok(utxos)
    }

    async fn spendable(&self, account: u32, chain: ChainKind) -> Result<Spendable, WalletError> {
        let addresses = match self.manager.get(account, chain, true).await {
            Ok(addresses) => addresses,
            Err(AddressManagerError::AccountNotCached { .. }) => {
                self.manager.get(account, chain, false).await?
            }
            Err(err) => return Err(err.into()),
        };
        let change = self.manager.change_address(account, chain).await?;
        let utxos = self.utxos_of(chain, &addresses, None).await?;
        Ok(Spendable {
            senders: short_ids(&addresses),
            change: change.short_id(),
            utxos,
        })
    }

    async fn exported(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: ChainKind,
    ) -> Result<Exported, WalletError> {
        let manager = &self.manager;
        let addresses = match manager.get_atomic(account, chain, source_chain, true).await {
            Ok(addresses) => addresses,
            Err(AddressManagerError::AccountNotCached { .. }) => {
                manager.get_atomic(account, chain, source_chain, false).await?
            }
            Err(err) => return Err(err.into()),
        };
        let utxos = self.utxos_of(chain, &addresses, Some(source_chain)).await?;
        Ok(Exported {
            senders: short_ids(&addresses),
            utxos,
        })
    }

    fn request(&self, destinations: Vec<ShortId>, wallet: &Spendable) -> AssetAmountDestination {
        AssetAmountDestination::new(destinations, wallet.senders.clone(), vec![wallet.change])
            .with_as_of(self.now())
    }

    fn fee_selection(&self, wallet: &Spendable, fee: u64) -> Result<Selection, SelectionError> {
        let request = self.request(vec![], wallet).with_asset(self.avax(), 0, fee);
        select_minimum_spendable(&request, &wallet.utxos)
    }

    async fn finish(&self, tx: UnsignedTx, utxos: &[Utxo]) -> Result<ExtendedTx, WalletError> {
        ensure_goose_egg(&tx, &self.avax(), self.config.goose_egg_cap)?;
        log::info!(
            "Built {} transaction (type {}) burning {}",
            tx.chain(),
            tx.type_id(),
            tx.burn(&self.avax())
        );
        extend_transaction(tx, utxos, &self.manager).await
    }

    // =========================================================================
    // Asset chain
    // =========================================================================

    /// Send one or more assets to `to`; the fee is paid in AVAX
    pub async fn send(
        &self,
        account: u32,
        to: &[Address],
        amounts: &[(Id, u64)],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        if amounts.iter().any(|(_, amount)| *amount == 0) {
            return Err(TxError::ZeroAmount.into());
        }
        let wallet = self.spendable(account, ChainKind::Asset).await?;
        let mut request = self.request(short_ids(to), &wallet);
        for (asset_id, amount) in amounts {
            request.add_asset(*asset_id, *amount, 0);
        }
        request.add_asset(self.avax(), 0, self.config.tx_fee);

        let selection = select_minimum_spendable(&request, &wallet.utxos)?;
        let outputs = selection.all_outputs()?;
        let base = BaseTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Asset),
            outputs,
            selection.inputs,
            memo,
        )?;
        self.finish(UnsignedTx::Base(base), &wallet.utxos).await
    }

    /// Create an asset. Holders receive the initial supply; each minter set
    /// gets a mint output, which makes the supply variable.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_asset(
        &self,
        account: u32,
        name: &str,
        symbol: &str,
        denomination: u8,
        holders: &[(Address, u64)],
        minters: &[MinterSet],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let mut outputs: Vec<Output> = Vec::with_capacity(holders.len() + minters.len());
        for (holder, amount) in holders {
            outputs.push(TransferOutput::new(*amount, OutputOwners::single(holder.short_id()))?.into());
        }
        for minter in minters {
            outputs.push(Output::Mint(MintOutput {
                owners: OutputOwners::new(short_ids(&minter.addresses), 0, minter.threshold)?,
            }));
        }
        let state = InitialState::new(SECP_FX_INDEX, outputs).map_err(TxError::from)?;

        let wallet = self.spendable(account, ChainKind::Asset).await?;
        let selection = self.fee_selection(&wallet, self.config.create_asset_fee)?;
        let outputs = selection.all_outputs()?;
        let base = BaseTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Asset),
            outputs,
            selection.inputs,
            memo,
        )?;
        let tx = CreateAssetTx::new(base, name.to_string(), symbol.to_string(), denomination, vec![state])?;
        self.finish(UnsignedTx::CreateAsset(tx), &wallet.utxos).await
    }

    /// Look up `utxo_id` and the owner indices this account signs it with
    async fn owned_utxo(
        &self,
        wallet: &Spendable,
        utxo_id: UtxoId,
    ) -> Result<(Utxo, Vec<u32>), WalletError> {
        let found = fetch_all_utxos(
            self.source.as_ref(),
            ChainKind::Asset,
            UtxoTarget::Ids(vec![utxo_id]),
            None,
            self.config.utxo_page_limit,
        )
        .await?;
        let utxo = found
            .into_iter()
            .find(|utxo| utxo.utxo_id == utxo_id)
            .ok_or(WalletError::UnresolvedUtxo(utxo_id))?;
        let indices = utxo
            .output
            .owners()
            .signing_indices(&wallet.senders, self.now_secs())
            .ok_or(WalletError::UtxoNotOwned(utxo_id))?;
        Ok((utxo, indices))
    }

    async fn operation(
        &self,
        wallet: Spendable,
        operation: TransferableOperation,
        spent: Utxo,
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let selection = self.fee_selection(&wallet, self.config.tx_fee)?;
        let outputs = selection.all_outputs()?;
        let base = BaseTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Asset),
            outputs,
            selection.inputs,
            memo,
        )?;
        let tx = OperationTx::new(base, vec![operation]);
        let mut utxos = wallet.utxos;
        utxos.push(spent);
        self.finish(UnsignedTx::Operation(tx), &utxos).await
    }

    /// Mint `amount` more of a variable-cap asset through its mint output
    pub async fn mint(
        &self,
        account: u32,
        mint_utxo: UtxoId,
        amount: u64,
        to: &[Address],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let wallet = self.spendable(account, ChainKind::Asset).await?;
        let (utxo, indices) = self.owned_utxo(&wallet, mint_utxo).await?;
        let Output::Mint(authority) = &utxo.output else {
            return Err(WalletError::WrongOutputType(mint_utxo));
        };
        let op = MintOperation::new(
            indices,
            authority.clone(),
            TransferOutput::new(amount, owned_by(to)?)?,
        );
        let op = TransferableOperation::new(utxo.asset_id, vec![utxo.utxo_id], Operation::Mint(op))?;
        self.operation(wallet, op, utxo, memo).await
    }

    /// Mint one NFT of the group held by `nft_mint_utxo` to `to`
    pub async fn mint_nft(
        &self,
        account: u32,
        nft_mint_utxo: UtxoId,
        payload: Vec<u8>,
        to: &[Address],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let wallet = self.spendable(account, ChainKind::Asset).await?;
        let (utxo, indices) = self.owned_utxo(&wallet, nft_mint_utxo).await?;
        let Output::NftMint(authority) = &utxo.output else {
            return Err(WalletError::WrongOutputType(nft_mint_utxo));
        };
        let op = NftMintOperation::new(indices, authority.group_id, payload, vec![owned_by(to)?])?;
        let op =
            TransferableOperation::new(utxo.asset_id, vec![utxo.utxo_id], Operation::NftMint(op))?;
        self.operation(wallet, op, utxo, memo).await
    }

    pub async fn transfer_nft(
        &self,
        account: u32,
        nft_utxo: UtxoId,
        to: &[Address],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let wallet = self.spendable(account, ChainKind::Asset).await?;
        let (utxo, indices) = self.owned_utxo(&wallet, nft_utxo).await?;
        let Output::NftTransfer(nft) = &utxo.output else {
            return Err(WalletError::WrongOutputType(nft_utxo));
        };
        let output = NftTransferOutput::new(nft.group_id, nft.payload.clone(), owned_by(to)?)?;
        let op = NftTransferOperation::new(indices, output);
        let op = TransferableOperation::new(
            utxo.asset_id,
            vec![utxo.utxo_id],
            Operation::NftTransfer(op),
        )?;
        self.operation(wallet, op, utxo, memo).await
    }

    // =========================================================================
    // Atomic transfers between the UTXO chains
    // =========================================================================

    /// Export `amount` of `asset_id` from `chain` into the shared memory of
    /// `destination`, owned by `to`
    #[allow(clippy::too_many_arguments)]
    pub async fn export(
        &self,
        account: u32,
        chain: ChainKind,
        destination: ChainKind,
        to: &[Address],
        asset_id: Id,
        amount: u64,
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        if chain == ChainKind::Evm || chain == destination {
            return Err(WalletError::UnsupportedChain(chain));
        }
        if chain == ChainKind::Platform && asset_id != self.avax() {
            return Err(WalletError::UnsupportedChain(chain));
        }
        if amount == 0 {
            return Err(TxError::ZeroAmount.into());
        }

        let wallet = self.spendable(account, chain).await?;
        let request = self
            .request(short_ids(to), &wallet)
            .with_asset(asset_id, amount, 0)
            .with_asset(self.avax(), 0, self.config.tx_fee);
        let selection = match chain {
            ChainKind::Platform => {
                select_minimum_spendable_staked(&request, &wallet.utxos, self.now(), false)?
            }
            _ => select_minimum_spendable(&request, &wallet.utxos)?,
        };

        let Selection {
            inputs,
            outputs,
            change,
            ..
        } = selection;
        let base = BaseTx::new(self.config.network_id, self.blockchain(chain), change, inputs, memo)?;
        let export = ExportTx::new(base, self.blockchain(destination), outputs)?;
        let tx = match chain {
            ChainKind::Platform => UnsignedTx::PlatformExport(export),
            _ => UnsignedTx::AssetExport(export),
        };
        self.finish(tx, &wallet.utxos).await
    }

    /// Atomic UTXOs this account can spend, as inputs, with per-asset totals
    fn atomic_inputs(
        &self,
        wallet: &Exported,
    ) -> Result<(Vec<TransferableInput>, BTreeMap<Id, u64>), WalletError> {
        let now = self.now_secs();
        let mut inputs = Vec::new();
        let mut totals: BTreeMap<Id, u64> = BTreeMap::new();
        for utxo in &wallet.utxos {
            let Output::Transfer(output) = &utxo.output else {
                continue;
            };
            let Some(indices) = output.owners.signing_indices(&wallet.senders, now) else {
                continue;
            };
            inputs.push(TransferableInput::new(
                utxo.utxo_id,
                utxo.asset_id,
                TransferInput::new(output.amount, indices)?,
            ));
            let total = totals.entry(utxo.asset_id).or_default();
            *total = total.saturating_add(output.amount);
        }
        Ok((inputs, totals))
    }

    /// Per-asset import amounts after paying the fee from imported AVAX
    fn after_fee(&self, totals: BTreeMap<Id, u64>) -> Result<Vec<(Id, u64)>, SelectionError> {
        let avax = self.avax();
        let fee = self.config.tx_fee;
        let available = totals.get(&avax).copied().unwrap_or(0);
        if available < fee {
            return Err(SelectionError::InsufficientFunds {
                asset_id: avax,
                needed: fee,
                available,
            });
        }
        Ok(totals
            .into_iter()
            .map(|(asset_id, total)| {
                let value = if asset_id == avax { total - fee } else { total };
                (asset_id, value)
            })
            .filter(|(_, value)| *value > 0)
            .collect())
    }

    /// Import everything `source_chain` exported to this account on `chain`
    pub async fn import(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: ChainKind,
        to: &[Address],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        if chain == ChainKind::Evm || chain == source_chain {
            return Err(WalletError::UnsupportedChain(chain));
        }
        let wallet = self.exported(account, chain, source_chain).await?;
        let (inputs, totals) = self.atomic_inputs(&wallet)?;
        if inputs.is_empty() {
            return Err(WalletError::NothingToImport(source_chain));
        }

        let owners = owned_by(to)?;
        let mut outputs = Vec::new();
        for (asset_id, value) in self.after_fee(totals)? {
            outputs.push(TransferableOutput::new(
                asset_id,
                TransferOutput::new(value, owners.clone())?,
            ));
        }
        let base = BaseTx::new(self.config.network_id, self.blockchain(chain), outputs, vec![], memo)?;
        let import = ImportTx::new(base, self.blockchain(source_chain), inputs);
        let tx = match chain {
            ChainKind::Platform => UnsignedTx::PlatformImport(import),
            _ => UnsignedTx::AssetImport(import),
        };
        self.finish(tx, &wallet.utxos).await
    }

    // =========================================================================
    // Platform chain
    // =========================================================================

    async fn stake<F>(
        &self,
        account: u32,
        weight: u64,
        memo: Vec<u8>,
        make: F,
    ) -> Result<ExtendedTx, WalletError>
    where
        F: FnOnce(BaseTx, Vec<TransferableOutput>) -> Result<UnsignedTx, TxError>,
    {
        let wallet = self.spendable(account, ChainKind::Platform).await?;
        let request = self
            .request(vec![wallet.change], &wallet)
            .with_asset(self.avax(), weight, self.config.tx_fee);
        let selection =
            select_minimum_spendable_staked(&request, &wallet.utxos, self.now(), true)?;
        let base = BaseTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Platform),
            selection.change,
            selection.inputs,
            memo,
        )?;
        let tx = make(base, selection.outputs)?;
        self.finish(tx, &wallet.utxos).await
    }

    /// Stake `weight` on a new validator; stake-locked funds are used first
    #[allow(clippy::too_many_arguments)]
    pub async fn add_validator(
        &self,
        account: u32,
        node_id: NodeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        weight: u64,
        reward_to: &[Address],
        shares: u32,
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        if weight < self.config.min_validator_stake {
            return Err(WalletError::StakeBelowMinimum {
                stake: weight,
                minimum: self.config.min_validator_stake,
            });
        }
        let validator = Validator::new(node_id, start, end, weight)?;
        let rewards = owned_by(reward_to)?;
        self.stake(account, weight, memo, move |base, stake| {
            AddValidatorTx::new(base, validator, stake, rewards, shares).map(UnsignedTx::AddValidator)
        })
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_delegator(
        &self,
        account: u32,
        node_id: NodeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        weight: u64,
        reward_to: &[Address],
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        if weight < self.config.min_delegation_stake {
            return Err(WalletError::StakeBelowMinimum {
                stake: weight,
                minimum: self.config.min_delegation_stake,
            });
        }
        let validator = Validator::new(node_id, start, end, weight)?;
        let rewards = owned_by(reward_to)?;
        self.stake(account, weight, memo, move |base, stake| {
            AddDelegatorTx::new(base, validator, stake, rewards).map(UnsignedTx::AddDelegator)
        })
        .await
    }

    pub async fn create_subnet(
        &self,
        account: u32,
        owners: &[Address],
        threshold: u32,
        memo: Vec<u8>,
    ) -> Result<ExtendedTx, WalletError> {
        let owner = OutputOwners::new(short_ids(owners), 0, threshold)?;
        let wallet = self.spendable(account, ChainKind::Platform).await?;
        let request = self
            .request(vec![], &wallet)
            .with_asset(self.avax(), 0, self.config.creation_tx_fee);
        let selection =
            select_minimum_spendable_staked(&request, &wallet.utxos, self.now(), false)?;
        let outputs = selection.all_outputs()?;
        let base = BaseTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Platform),
            outputs,
            selection.inputs,
            memo,
        )?;
        let tx = CreateSubnetTx::new(base, owner)?;
        self.finish(UnsignedTx::CreateSubnet(tx), &wallet.utxos).await
    }

    // =========================================================================
    // EVM chain
    // =========================================================================

    /// Credit `to` with everything `source_chain` exported to this account
    pub async fn evm_import(
        &self,
        account: u32,
        source_chain: ChainKind,
        to: EthAddress,
    ) -> Result<ExtendedTx, WalletError> {
        if source_chain == ChainKind::Evm {
            return Err(WalletError::UnsupportedChain(source_chain));
        }
        let wallet = self.exported(account, ChainKind::Evm, source_chain).await?;
        let (inputs, totals) = self.atomic_inputs(&wallet)?;
        if inputs.is_empty() {
            return Err(WalletError::NothingToImport(source_chain));
        }
        let outputs = self
            .after_fee(totals)?
            .into_iter()
            .map(|(asset_id, amount)| EvmOutput {
                address: to,
                amount,
                asset_id,
            })
            .collect();
        let tx = EvmImportTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Evm),
            self.blockchain(source_chain),
            inputs,
            outputs,
        )?;
        self.finish(UnsignedTx::EvmImport(tx), &wallet.utxos).await
    }

    /// Debit `from` by `amount` plus the fee and export `amount` to `to`
    pub async fn evm_export(
        &self,
        from: EthAddress,
        nonce: u64,
        amount: u64,
        destination: ChainKind,
        to: &[Address],
    ) -> Result<ExtendedTx, WalletError> {
        if destination == ChainKind::Evm {
            return Err(WalletError::UnsupportedChain(destination));
        }
        if amount == 0 {
            return Err(TxError::ZeroAmount.into());
        }
        let input = EvmInput {
            address: from,
            amount: amount.saturating_add(self.config.tx_fee),
            asset_id: self.avax(),
            nonce,
        };
        let output = TransferableOutput::new(self.avax(), TransferOutput::new(amount, owned_by(to)?)?);
        let tx = EvmExportTx::new(
            self.config.network_id,
            self.blockchain(ChainKind::Evm),
            self.blockchain(destination),
            vec![input],
            vec![output],
        )?;
        self.finish(UnsignedTx::EvmExport(tx), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressPath, EthAddress};
    use crate::tx::{CredentialKind, NftMintOutput, StakeableLockOut};
    use crate::wallet::account::{AccountScope, AVAX_COIN_TYPE};
    use crate::wallet::utxo_source::MemoryUtxoSource;
    use crate::wallet::{sign_transaction, Keychain, Signer};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        builder: TxBuilder,
        source: Arc<MemoryUtxoSource>,
        keychain: Keychain,
        me: ShortId,
        avax: Id,
    }

    fn config() -> NetworkConfig {
        let mut config = NetworkConfig::local();
        config.tx_fee = 1;
        config.create_asset_fee = 2;
        config.creation_tx_fee = 3;
        config.min_validator_stake = 100;
        config.min_delegation_stake = 10;
        config
    }

    async fn fixture(config: NetworkConfig) -> Fixture {
        let keychain = Keychain::from_seed(&[11u8; 32], 1).unwrap();
        let path = AddressPath {
            account: 0,
            change: false,
            index: 0,
        }
        .derivation_path(AVAX_COIN_TYPE)
        .unwrap();
        let me = keychain.key_at(&path).unwrap().short_id();
        let source = Arc::new(MemoryUtxoSource::new());
        let manager = Arc::new(AddressManager::new(&config, source.clone()));
        manager
            .load_accounts(&keychain, AccountScope::AVALANCHE | AccountScope::ETHEREUM)
            .await
            .unwrap();
        let avax = config.avax_asset_id;
        let builder = TxBuilder::new(config, manager, source.clone())
            .with_as_of(Utc.timestamp_opt(1_000, 0).unwrap());
        Fixture {
            builder,
            source,
            keychain,
            me,
            avax,
        }
    }

    fn utxo(n: u8, asset_id: Id, output: impl Into<Output>) -> Utxo {
        Utxo::new(UtxoId::new(Id::new([n; 32]), 0), asset_id, output)
    }

    fn transfer(amount: u64, owner: ShortId) -> TransferOutput {
        TransferOutput::new(amount, OutputOwners::single(owner)).unwrap()
    }

    fn stranger(chain: &str) -> Address {
        Address::new(chain, "local", ShortId::new([0x77; 20])).unwrap()
    }

    fn amounts_of(outputs: &[&TransferableOutput], asset_id: Id) -> Vec<u64> {
        let mut values: Vec<u64> = outputs
            .iter()
            .filter(|out| out.asset_id == asset_id)
            .filter_map(|out| out.output.amount())
            .collect();
        values.sort_unstable();
        values
    }

    #[tokio::test]
    async fn test_multi_asset_send() {
        let f = fixture(config()).await;
        let token = Id::new([0x70; 32]);
        f.source.add(ChainKind::Asset, utxo(1, f.avax, transfer(5, f.me))).await;
        f.source.add(ChainKind::Asset, utxo(2, token, transfer(100, f.me))).await;

        let extended = f
            .builder
            .send(0, &[stranger("X")], &[(token, 30)], b"hi".to_vec())
            .await
            .unwrap();

        let outputs = extended.tx.all_outputs();
        assert_eq!(amounts_of(&outputs, token), vec![30, 70]);
        assert_eq!(amounts_of(&outputs, f.avax), vec![4]);
        assert_eq!(extended.tx.burn(&f.avax), 1);
        assert_eq!(extended.tx.burn(&token), 0);
        assert_eq!(extended.signers.len(), 2);

        let signed = sign_transaction(&extended, &f.keychain).await.unwrap();
        assert_eq!(signed.credentials.len(), 2);
    }

    #[tokio::test]
    async fn test_send_rejects_zero_amount() {
        let f = fixture(config()).await;
        assert!(matches!(
            f.builder.send(0, &[stranger("X")], &[(f.avax, 0)], vec![]).await,
            Err(WalletError::Tx(TxError::ZeroAmount))
        ));
    }

    #[tokio::test]
    async fn test_create_then_mint_asset() {
        let f = fixture(config()).await;
        f.source.add(ChainKind::Asset, utxo(1, f.avax, transfer(10, f.me))).await;
        let me = Address::new("X", "local", f.me).unwrap();

        let created = f
            .builder
            .create_asset(
                0,
                "Gold",
                "GLD",
                9,
                &[(me.clone(), 1_000)],
                &[MinterSet {
                    addresses: vec![me.clone()],
                    threshold: 1,
                }],
                vec![],
            )
            .await
            .unwrap();
        let UnsignedTx::CreateAsset(tx) = &created.tx else {
            panic!("expected a create-asset transaction");
        };
        assert_eq!(tx.initial_states[0].outputs.len(), 2);
        assert_eq!(created.tx.burn(&f.avax), 2);

        let gold = Id::new([0x60; 32]);
        let authority = utxo(
            9,
            gold,
            Output::Mint(MintOutput {
                owners: OutputOwners::single(f.me),
            }),
        );
        f.source.add(ChainKind::Asset, authority.clone()).await;

        let minted = f
            .builder
            .mint(0, authority.utxo_id, 500, &[stranger("X")], vec![])
            .await
            .unwrap();
        assert_eq!(minted.tx.operations().len(), 1);
        // fee input plus the mint operation
        assert_eq!(minted.signers.len(), 2);
        assert!(minted.missing_paths().is_empty());
    }

    #[tokio::test]
    async fn test_nft_operations_use_nft_credentials() {
        let f = fixture(config()).await;
        f.source.add(ChainKind::Asset, utxo(1, f.avax, transfer(10, f.me))).await;
        let collection = Id::new([0x50; 32]);
        let minter = utxo(
            2,
            collection,
            Output::NftMint(NftMintOutput {
                group_id: 3,
                owners: OutputOwners::single(f.me),
            }),
        );
        let nft = utxo(
            4,
            collection,
            Output::NftTransfer(
                NftTransferOutput::new(3, b"art".to_vec(), OutputOwners::single(f.me)).unwrap(),
            ),
        );
        f.source.add(ChainKind::Asset, minter.clone()).await;
        f.source.add(ChainKind::Asset, nft.clone()).await;

        let minted = f
            .builder
            .mint_nft(0, minter.utxo_id, b"new".to_vec(), &[stranger("X")], vec![])
            .await
            .unwrap();
        assert_eq!(minted.signers.last().unwrap().kind, CredentialKind::Nft);

        let moved = f
            .builder
            .transfer_nft(0, nft.utxo_id, &[stranger("X")], vec![])
            .await
            .unwrap();
        assert_eq!(moved.signers.last().unwrap().kind, CredentialKind::Nft);

        assert!(matches!(
            f.builder.mint(0, nft.utxo_id, 1, &[stranger("X")], vec![]).await,
            Err(WalletError::WrongOutputType(_))
        ));
    }

    #[tokio::test]
    async fn test_add_validator_spends_locked_stake_first() {
        let f = fixture(config()).await;
        let locked = Output::StakeableLock(StakeableLockOut {
            locktime: 5_000,
            output: transfer(300, f.me),
        });
        f.source.add(ChainKind::Platform, utxo(1, f.avax, locked)).await;
        f.source.add(ChainKind::Platform, utxo(2, f.avax, transfer(50, f.me))).await;

        let start = Utc.timestamp_opt(2_000, 0).unwrap();
        let extended = f
            .builder
            .add_validator(
                0,
                NodeId(ShortId::new([0x11; 20])),
                start,
                start + Duration::days(14),
                200,
                &[stranger("P")],
                20_000,
                vec![],
            )
            .await
            .unwrap();

        let UnsignedTx::AddValidator(tx) = &extended.tx else {
            panic!("expected an add-validator transaction");
        };
        assert_eq!(tx.stake.len(), 1);
        assert_eq!(tx.stake[0].output.stake_locktime(), Some(5_000));
        assert_eq!(tx.stake[0].output.amount(), Some(200));
        let mut change: Vec<(Option<u64>, Option<u64>)> = tx
            .base
            .outputs
            .iter()
            .map(|out| (out.output.stake_locktime(), out.output.amount()))
            .collect();
        change.sort();
        assert_eq!(change, vec![(None, Some(49)), (Some(5_000), Some(100))]);
        assert_eq!(extended.tx.burn(&f.avax), 1);

        assert!(matches!(
            f.builder
                .add_delegator(
                    0,
                    NodeId::default(),
                    start,
                    start + Duration::days(1),
                    5,
                    &[stranger("P")],
                    vec![],
                )
                .await,
            Err(WalletError::StakeBelowMinimum { stake: 5, minimum: 10 })
        ));
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let f = fixture(config()).await;
        f.source.add(ChainKind::Asset, utxo(1, f.avax, transfer(20, f.me))).await;
        let me_on_p = Address::new("P", "local", f.me).unwrap();

        let exported = f
            .builder
            .export(0, ChainKind::Asset, ChainKind::Platform, &[me_on_p.clone()], f.avax, 10, vec![])
            .await
            .unwrap();
        let UnsignedTx::AssetExport(tx) = &exported.tx else {
            panic!("expected an export transaction");
        };
        assert_eq!(tx.destination_chain, f.builder.config().p_chain_id);
        assert_eq!(tx.exported_outputs[0].output.amount(), Some(10));
        assert_eq!(tx.base.outputs[0].output.amount(), Some(9));

        f.source
            .add_atomic(ChainKind::Platform, ChainKind::Asset, utxo(7, f.avax, transfer(10, f.me)))
            .await;
        let imported = f
            .builder
            .import(0, ChainKind::Platform, ChainKind::Asset, &[me_on_p], vec![])
            .await
            .unwrap();
        let UnsignedTx::PlatformImport(tx) = &imported.tx else {
            panic!("expected an import transaction");
        };
        assert_eq!(tx.imported_inputs.len(), 1);
        assert_eq!(tx.base.outputs[0].output.amount(), Some(9));

        assert!(matches!(
            f.builder
                .import(0, ChainKind::Asset, ChainKind::Platform, &[stranger("X")], vec![])
                .await,
            Err(WalletError::NothingToImport(ChainKind::Platform))
        ));
    }

    #[tokio::test]
    async fn test_import_first_does_not_hide_local_funds() {
        let f = fixture(config()).await;
        let path = AddressPath {
            account: 0,
            change: false,
            index: 3,
        }
        .derivation_path(AVAX_COIN_TYPE)
        .unwrap();
        let third = f.keychain.key_at(&path).unwrap().short_id();
        f.source.add(ChainKind::Asset, utxo(1, f.avax, transfer(100, third))).await;

        assert!(matches!(
            f.builder
                .import(0, ChainKind::Asset, ChainKind::Platform, &[stranger("X")], vec![])
                .await,
            Err(WalletError::NothingToImport(ChainKind::Platform))
        ));

        let extended = f
            .builder
            .send(0, &[stranger("X")], &[(f.avax, 10)], vec![])
            .await
            .unwrap();
        assert_eq!(extended.tx.burn(&f.avax), 1);
        assert_eq!(amounts_of(&extended.tx.all_outputs(), f.avax), vec![10, 89]);
    }

    #[tokio::test]
    async fn test_evm_export_and_import() {
        let f = fixture(config()).await;
        let eth = f
            .keychain
            .accounts(AccountScope::ETHEREUM)
            .await
            .unwrap()
            .ethereum[0]
            .address;

        let exported = f
            .builder
            .evm_export(eth, 4, 25, ChainKind::Asset, &[stranger("X")])
            .await
            .unwrap();
        assert_eq!(exported.tx.evm_inputs()[0].amount, 26);
        assert_eq!(exported.signers[0].signatories, vec![crate::core::Signatory::Eth(eth)]);
        let signed = sign_transaction(&exported, &f.keychain).await.unwrap();
        assert_eq!(signed.credentials.len(), 1);

        f.source
            .add_atomic(ChainKind::Evm, ChainKind::Asset, utxo(3, f.avax, transfer(40, f.me)))
            .await;
        let imported = f.builder.evm_import(0, ChainKind::Asset, eth).await.unwrap();
        assert_eq!(imported.tx.evm_outputs()[0].amount, 39);
        assert_eq!(imported.tx.evm_outputs()[0].address, eth);

        assert!(matches!(
            f.builder
                .evm_export(EthAddress::new([1; 20]), 0, 5, ChainKind::Asset, &[stranger("X")])
                .await,
            Err(WalletError::UnknownEthAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_goose_egg_blocks_outsized_burn() {
        let mut config = config();
        config.creation_tx_fee = 100;
        config.goose_egg_cap = 10;
        let f = fixture(config).await;
        f.source.add(ChainKind::Platform, utxo(1, f.avax, transfer(100, f.me))).await;

        let owner = Address::new("P", "local", f.me).unwrap();
        assert!(matches!(
            f.builder.create_subnet(0, &[owner], 1, vec![]).await,
            Err(WalletError::Selection(SelectionError::GooseEggCheckFailed { burn: 100, cap: 10 }))
        ));
    }
}
