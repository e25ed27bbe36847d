//! HD address discovery and cache
//!
//! Addresses are derived from account-level public keys only. Discovery walks
//! each branch (external and change) in chunks, asking the UTXO source which
//! addresses have been used, and stops after a chunk with no activity.
//!
//! Results are cached per source: local UTXOs of a chain and atomic UTXOs
//! exported into it from another chain are discovered and kept separately.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::NetworkConfig;
use crate::core::{Address, AddressPath, ChainKind, EthAddress, ExtendedAddress, ShortId};
use crate::crypto::{ExtendedPublicKey, HdError};

use super::account::{Account, AccountError, AccountScope, Accounts, EthAccount};
use super::signer::{Signer, SignerError};
use super::utxo_source::{fetch_all_utxos, UtxoSource, UtxoSourceError, UtxoTarget};

#[derive(Error, Debug)]
pub enum AddressManagerError {
    #[error("Addresses of account {account} on {chain} have not been fetched")]
    AccountNotCached { account: u32, chain: ChainKind },
    #[error("Unknown account {0}")]
    UnknownAccount(u32),
    #[error("Address {0} was not derived by any known account")]
    AddressNotFound(String),
    #[error("Account error: {0}")]
    Account(#[from] AccountError),
    #[error("Derivation error: {0}")]
    Derivation(#[from] HdError),
    #[error("UTXO source error: {0}")]
    Source(#[from] UtxoSourceError),
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    account: u32,
    chain: ChainKind,
    change: bool,
    /// `None` for local UTXOs, otherwise the chain atomic UTXOs come from
    source_chain: Option<ChainKind>,
}

impl CacheKey {
    fn new(account: u32, chain: ChainKind, change: bool, source_chain: Option<ChainKind>) -> Self {
        Self {
            account,
            chain,
            change,
            source_chain,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DerivedSet {
    addresses: BTreeMap<u32, Address>,
    /// Highest cached index: the last active one after discovery, then
    /// whatever `new_addresses` derived past it
    highest: Option<u32>,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<u32, Account>,
    eth_accounts: Vec<EthAccount>,
    cache: HashMap<CacheKey, DerivedSet>,
    /// Fetches in flight per key; the previous set stays readable meanwhile
    discovering: HashMap<CacheKey, usize>,
}

impl State {
    fn addresses(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: Option<ChainKind>,
    ) -> Result<Vec<Address>, AddressManagerError> {
        let mut addresses = Vec::new();
        for change in [false, true] {
            let set = self
                .cache
                .get(&CacheKey::new(account, chain, change, source_chain))
                .ok_or(AddressManagerError::AccountNotCached { account, chain })?;
            addresses.extend(set.addresses.values().cloned());
        }
        Ok(addresses)
    }

    fn finish_discovery(&mut self, keys: &[CacheKey]) {
        for key in keys {
            if let Some(count) = self.discovering.get_mut(key) {
                *count -= 1;
                if *count == 0 {
                    self.discovering.remove(key);
                }
            }
        }
    }
}

/// Derives, discovers and remembers the addresses of every account
pub struct AddressManager {
    hrp: String,
    chunk_size: u32,
    page_limit: u32,
    source: Arc<dyn UtxoSource>,
    state: Mutex<State>,
}

impl AddressManager {
    pub fn new(config: &NetworkConfig, source: Arc<dyn UtxoSource>) -> Self {
        Self {
            hrp: config.hrp.clone(),
            chunk_size: config.discovery_chunk_size.max(1),
            page_limit: config.utxo_page_limit,
            source,
            state: Mutex::new(State::default()),
        }
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    /// Replace the known accounts and drop every cached address
    pub async fn set_accounts(&self, accounts: Accounts) {
        let mut state = self.state.lock().await;
        state.accounts = accounts
            .avalanche
            .into_iter()
            .map(|account| (account.index, account))
            .collect();
        state.eth_accounts = accounts.ethereum;
        state.cache.clear();
    }

    /// Ask `signer` for its accounts and adopt them
    pub async fn load_accounts(
        &self,
        signer: &dyn Signer,
        scope: AccountScope,
    ) -> Result<(), AddressManagerError> {
        let accounts = signer.accounts(scope).await?;
        log::info!(
            "Loaded {} accounts and {} EVM accounts",
            accounts.avalanche.len(),
            accounts.ethereum.len()
        );
        self.set_accounts(accounts).await;
        Ok(())
    }

    pub async fn account_indices(&self) -> Vec<u32> {
        self.state.lock().await.accounts.keys().copied().collect()
    }

    pub async fn eth_accounts(&self) -> Vec<EthAccount> {
        self.state.lock().await.eth_accounts.clone()
    }

    pub async fn eth_account(&self, address: &EthAddress) -> Option<EthAccount> {
        self.state
            .lock()
            .await
            .eth_accounts
            .iter()
            .find(|account| &account.address == address)
            .cloned()
    }

    /// Run discovery for both branches of one account on one chain.
    ///
    /// With `source_chain` set, activity means atomic UTXOs exported from
    /// that chain, and the result is cached apart from the local one. The
    /// previous result stays readable until the new one is committed; on
    /// failure it is left as it was.
    pub async fn fetch(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: Option<ChainKind>,
    ) -> Result<Vec<Address>, AddressManagerError> {
        let keys = [false, true].map(|change| CacheKey::new(account, chain, change, source_chain));
        let owner = {
            let mut state = self.state.lock().await;
            let owner = state
                .accounts
                .get(&account)
                .cloned()
                .ok_or(AddressManagerError::UnknownAccount(account))?;
            for key in keys {
                *state.discovering.entry(key).or_default() += 1;
            }
            owner
        };

        let discovered = async {
            let external = self.discover(&owner, chain, false, source_chain).await?;
            let change = self.discover(&owner, chain, true, source_chain).await?;
            Ok::<_, AddressManagerError>((external, change))
        }
        .await;

        let mut state = self.state.lock().await;
        state.finish_discovery(&keys);
        match discovered {
            Ok((external, change)) => {
                let addresses = external
                    .addresses
                    .values()
                    .chain(change.addresses.values())
                    .cloned()
                    .collect();
                state.cache.insert(keys[0], external);
                state.cache.insert(keys[1], change);
                Ok(addresses)
            }
            Err(err) => {
                log::warn!("Discovery for account {} on {} failed: {}", account, chain, err);
                Err(err)
            }
        }
    }

    /// Whether a fetch for this account and chain is in flight
    pub async fn is_discovering(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: Option<ChainKind>,
    ) -> bool {
        let state = self.state.lock().await;
        [false, true].into_iter().any(|change| {
            state
                .discovering
                .contains_key(&CacheKey::new(account, chain, change, source_chain))
        })
    }

    /// Fetch every known account on every chain in `chains` concurrently
    pub async fn fetch_all(
        &self,
        chains: &[ChainKind],
        source_chain: Option<ChainKind>,
    ) -> Result<(), AddressManagerError> {
        let accounts = self.account_indices().await;
        let jobs = accounts.iter().flat_map(|account| {
            chains
                .iter()
                .map(move |chain| self.fetch(*account, *chain, source_chain))
        });
        try_join_all(jobs).await?;
        Ok(())
    }

    async fn discover(
        &self,
        account: &Account,
        chain: ChainKind,
        change: bool,
        source_chain: Option<ChainKind>,
    ) -> Result<DerivedSet, AddressManagerError> {
        let branch = account.branch(change)?;
        let mut derived = BTreeMap::new();
        let mut last_active: Option<u32> = None;
        let mut start = 0u32;

        loop {
            let chunk = self.derive_chunk(&branch, chain, start, self.chunk_size)?;
            let active = self.last_active_in(chain, source_chain, &chunk).await?;
            derived.extend(chunk);
            match active {
                Some(index) => {
                    last_active = Some(index);
                    start = index.checked_add(1).ok_or(HdError::IndexExhausted(index))?;
                }
                None => break,
            }
        }

        let keep = match last_active {
            Some(index) => index,
            None => derived.keys().next().copied().unwrap_or(0),
        };
        derived.retain(|index, _| *index <= keep);
        let highest = derived.keys().next_back().copied();
        log::info!(
            "Account {} {} branch on {}: {} addresses (last active {:?})",
            account.index,
            if change { "change" } else { "external" },
            chain,
            derived.len(),
            last_active
        );
        Ok(DerivedSet {
            addresses: derived,
            highest,
        })
    }

    fn derive_chunk(
        &self,
        branch: &ExtendedPublicKey,
        chain: ChainKind,
        start: u32,
        count: u32,
    ) -> Result<Vec<(u32, Address)>, AddressManagerError> {
        let mut chunk = Vec::with_capacity(count as usize);
        let mut index = start;
        while chunk.len() < count as usize {
            let (address, used) = Account::address_at(branch, index, chain.alias(), &self.hrp)?;
            chunk.push((used, address));
            index = used.checked_add(1).ok_or(HdError::IndexExhausted(used))?;
        }
        Ok(chunk)
    }

    async fn last_active_in(
        &self,
        chain: ChainKind,
        source_chain: Option<ChainKind>,
        chunk: &[(u32, Address)],
    ) -> Result<Option<u32>, AddressManagerError> {
        let addresses = chunk.iter().map(|(_, address)| address.clone()).collect();
        let utxos = fetch_all_utxos(
            self.source.as_ref(),
            chain,
            UtxoTarget::Addresses(addresses),
            source_chain,
            self.page_limit,
        )
        .await?;
        let owners: HashSet<ShortId> = utxos
            .iter()
            .flat_map(|utxo| utxo.output.owners().addresses.iter().copied())
            .collect();
        Ok(chunk
            .iter()
            .filter(|(_, address)| owners.contains(&address.short_id()))
            .map(|(index, _)| *index)
            .max())
    }

    /// Derive `count` local addresses past the highest cached index of a branch
    pub async fn new_addresses(
        &self,
        account: u32,
        chain: ChainKind,
        change: bool,
        count: u32,
    ) -> Result<Vec<Address>, AddressManagerError> {
        let mut state = self.state.lock().await;
        let State {
            accounts, cache, ..
        } = &mut *state;

        let Some(set) = cache.get_mut(&CacheKey::new(account, chain, change, None)) else {
            return Err(AddressManagerError::AccountNotCached { account, chain });
        };
        let owner = accounts
            .get(&account)
            .ok_or(AddressManagerError::UnknownAccount(account))?;
        let branch = owner.branch(change)?;

        let mut index = match set.highest {
            Some(highest) => highest.checked_add(1).ok_or(HdError::IndexExhausted(highest))?,
            None => 0,
        };
        let mut fresh = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (address, used) = Account::address_at(&branch, index, chain.alias(), &self.hrp)?;
            set.addresses.insert(used, address.clone());
            set.highest = Some(used);
            fresh.push(address);
            index = used.checked_add(1).ok_or(HdError::IndexExhausted(used))?;
        }
        Ok(fresh)
    }

    /// Cached local addresses of both branches; with `cached == false` a fetch runs first
    pub async fn get(
        &self,
        account: u32,
        chain: ChainKind,
        cached: bool,
    ) -> Result<Vec<Address>, AddressManagerError> {
        if !cached {
            return self.fetch(account, chain, None).await;
        }
        self.state.lock().await.addresses(account, chain, None)
    }

    /// Addresses holding atomic UTXOs exported from `source_chain` into `chain`
    pub async fn get_atomic(
        &self,
        account: u32,
        chain: ChainKind,
        source_chain: ChainKind,
        cached: bool,
    ) -> Result<Vec<Address>, AddressManagerError> {
        if !cached {
            return self.fetch(account, chain, Some(source_chain)).await;
        }
        self.state
            .lock()
            .await
            .addresses(account, chain, Some(source_chain))
    }

    /// Newest cached local change address
    pub async fn change_address(
        &self,
        account: u32,
        chain: ChainKind,
    ) -> Result<Address, AddressManagerError> {
        let state = self.state.lock().await;
        state
            .cache
            .get(&CacheKey::new(account, chain, true, None))
            .and_then(|set| set.addresses.values().next_back().cloned())
            .ok_or(AddressManagerError::AccountNotCached { account, chain })
    }

    pub async fn highest_index(&self, account: u32, chain: ChainKind, change: bool) -> Option<u32> {
        let state = self.state.lock().await;
        state
            .cache
            .get(&CacheKey::new(account, chain, change, None))
            .and_then(|set| set.highest)
    }

    /// Paths of cached addresses, matched by their key hash on any chain
    pub async fn extended(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<ExtendedAddress>, AddressManagerError> {
        let state = self.state.lock().await;
        let mut paths: HashMap<ShortId, AddressPath> = HashMap::new();
        for (key, set) in &state.cache {
            for (index, address) in &set.addresses {
                paths.entry(address.short_id()).or_insert(AddressPath {
                    account: key.account,
                    change: key.change,
                    index: *index,
                });
            }
        }

        addresses
            .iter()
            .map(|address| {
                paths
                    .get(&address.short_id())
                    .map(|path| ExtendedAddress::new(address.clone(), *path))
                    .ok_or_else(|| AddressManagerError::AddressNotFound(address.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Id, Utxo, UtxoId};
    use crate::tx::{OutputOwners, TransferOutput};
    use crate::wallet::account::AVAX_COIN_TYPE;
    use crate::wallet::utxo_source::{MemoryUtxoSource, UtxoPage, UtxoQuery};
    use crate::wallet::Keychain;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn keychain() -> Keychain {
        Keychain::from_seed(&[3u8; 32], 2).unwrap()
    }

    fn address_at(keychain: &Keychain, account: u32, change: bool, index: u32) -> Address {
        let path = AddressPath {
            account,
            change,
            index,
        }
        .derivation_path(AVAX_COIN_TYPE)
        .unwrap();
        keychain.key_at(&path).unwrap().address("X", "local").unwrap()
    }

    fn utxo_for(address: &Address, n: u8) -> Utxo {
        Utxo::new(
            UtxoId::new(Id::new([n; 32]), 0),
            Id::ZERO,
            TransferOutput::new(1_000, OutputOwners::single(address.short_id())).unwrap(),
        )
    }

    async fn manager(source: Arc<dyn UtxoSource>) -> AddressManager {
        let manager = AddressManager::new(&NetworkConfig::local(), source);
        manager
            .load_accounts(&keychain(), AccountScope::AVALANCHE | AccountScope::ETHEREUM)
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_gap_limited_discovery() {
        let keychain = keychain();
        let source = Arc::new(MemoryUtxoSource::new());
        for (n, index) in [0u32, 5, 20, 49].into_iter().enumerate() {
            let address = address_at(&keychain, 0, false, index);
            source.add(ChainKind::Asset, utxo_for(&address, n as u8)).await;
        }
        let manager = manager(source.clone()).await;

        let addresses = manager.fetch(0, ChainKind::Asset, None).await.unwrap();

        assert_eq!(manager.highest_index(0, ChainKind::Asset, false).await, Some(20));
        assert_eq!(manager.highest_index(0, ChainKind::Asset, true).await, Some(0));
        // 21 external addresses plus change index 0
        assert_eq!(addresses.len(), 22);
        assert_eq!(addresses[20], address_at(&keychain, 0, false, 20));
        assert!(!addresses.contains(&address_at(&keychain, 0, false, 49)));
        // external chunks start at 0, 6 and 21; change needs one chunk
        assert_eq!(source.query_count(), 4);
    }

    #[tokio::test]
    async fn test_no_activity_keeps_first_address() {
        let manager = manager(Arc::new(MemoryUtxoSource::new())).await;
        let addresses = manager.get(1, ChainKind::Platform, false).await.unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].chain_alias(), "P");
        assert_eq!(
            addresses[0].short_id(),
            address_at(&keychain(), 1, false, 0).short_id()
        );
    }

    #[tokio::test]
    async fn test_new_addresses_extend_past_highest() {
        let manager = manager(Arc::new(MemoryUtxoSource::new())).await;
        assert!(matches!(
            manager.new_addresses(0, ChainKind::Asset, false, 2).await,
            Err(AddressManagerError::AccountNotCached { account: 0, .. })
        ));

        manager.fetch(0, ChainKind::Asset, None).await.unwrap();
        let fresh = manager.new_addresses(0, ChainKind::Asset, false, 2).await.unwrap();
        assert_eq!(fresh[0], address_at(&keychain(), 0, false, 1));
        assert_eq!(fresh[1], address_at(&keychain(), 0, false, 2));
        assert_eq!(manager.highest_index(0, ChainKind::Asset, false).await, Some(2));
        assert_eq!(manager.get(0, ChainKind::Asset, true).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_extended_lookup() {
        let manager = manager(Arc::new(MemoryUtxoSource::new())).await;
        manager.fetch(0, ChainKind::Asset, None).await.unwrap();

        let change = manager.change_address(0, ChainKind::Asset).await.unwrap();
        let extended = manager.extended(&[change.clone()]).await.unwrap();
        assert_eq!(
            extended[0].path,
            AddressPath {
                account: 0,
                change: true,
                index: 0
            }
        );

        let stranger = Address::new("X", "local", ShortId::new([0xfe; 20])).unwrap();
        assert!(matches!(
            manager.extended(&[change, stranger]).await,
            Err(AddressManagerError::AddressNotFound(_))
        ));
    }

    struct FailingSource;

    #[async_trait]
    impl UtxoSource for FailingSource {
        async fn utxos(&self, _query: &UtxoQuery) -> Result<UtxoPage, UtxoSourceError> {
            Err(UtxoSourceError::Transport("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let manager = manager(Arc::new(FailingSource)).await;
        assert!(matches!(
            manager.fetch(0, ChainKind::Asset, None).await,
            Err(AddressManagerError::Source(_))
        ));
        assert!(matches!(
            manager.get(0, ChainKind::Asset, true).await,
            Err(AddressManagerError::AccountNotCached { .. })
        ));
        assert!(matches!(
            manager.fetch(7, ChainKind::Asset, None).await,
            Err(AddressManagerError::UnknownAccount(7))
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_accounts_and_chains() {
        let manager = manager(Arc::new(MemoryUtxoSource::new())).await;
        manager
            .fetch_all(&[ChainKind::Asset, ChainKind::Platform], None)
            .await
            .unwrap();
        for account in [0, 1] {
            for chain in [ChainKind::Asset, ChainKind::Platform] {
                assert_eq!(manager.get(account, chain, true).await.unwrap().len(), 2);
            }
        }
        assert_eq!(manager.eth_accounts().await.len(), 2);
    }

    #[tokio::test]
    async fn test_atomic_discovery_is_cached_apart() {
        let keychain = keychain();
        let source = Arc::new(MemoryUtxoSource::new());
        let local = address_at(&keychain, 0, false, 3);
        source.add(ChainKind::Asset, utxo_for(&local, 1)).await;
        let manager = manager(source.clone()).await;

        let atomic = manager
            .get_atomic(0, ChainKind::Asset, ChainKind::Platform, false)
            .await
            .unwrap();
        assert_eq!(atomic.len(), 2);
        assert!(matches!(
            manager.get(0, ChainKind::Asset, true).await,
            Err(AddressManagerError::AccountNotCached { .. })
        ));

        let addresses = manager.get(0, ChainKind::Asset, false).await.unwrap();
        assert!(addresses.contains(&local));
        assert_eq!(manager.highest_index(0, ChainKind::Asset, false).await, Some(3));
        assert_eq!(
            manager
                .get_atomic(0, ChainKind::Asset, ChainKind::Platform, true)
                .await
                .unwrap(),
            atomic
        );
    }

    /// Holds the first query after `arm` until released
    struct GatedSource {
        inner: MemoryUtxoSource,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl UtxoSource for GatedSource {
        async fn utxos(&self, query: &UtxoQuery) -> Result<UtxoPage, UtxoSourceError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.utxos(query).await
        }
    }

    #[tokio::test]
    async fn test_cache_stays_readable_during_refetch() {
        let source = Arc::new(GatedSource {
            inner: MemoryUtxoSource::new(),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let manager = manager(source.clone()).await;
        let cached = manager.fetch(0, ChainKind::Asset, None).await.unwrap();

        source.armed.store(true, Ordering::SeqCst);
        let refetch = manager.fetch(0, ChainKind::Asset, None);
        let observe = async {
            source.entered.notified().await;
            let during = (
                manager.is_discovering(0, ChainKind::Asset, None).await,
                manager.get(0, ChainKind::Asset, true).await.map_err(|e| e.to_string()),
                manager.extended(&cached).await.map(|found| found.len()).map_err(|e| e.to_string()),
            );
            source.release.notify_one();
            during
        };
        let (refetched, during) = tokio::join!(refetch, observe);

        assert!(during.0);
        assert_eq!(during.1, Ok(cached.clone()));
        assert_eq!(during.2, Ok(cached.len()));
        assert_eq!(refetched.unwrap(), cached);
        assert!(!manager.is_discovering(0, ChainKind::Asset, None).await);
    }

    struct FlakySource {
        inner: MemoryUtxoSource,
        offline: AtomicBool,
    }

    #[async_trait]
    impl UtxoSource for FlakySource {
        async fn utxos(&self, query: &UtxoQuery) -> Result<UtxoPage, UtxoSourceError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(UtxoSourceError::Transport("offline".into()));
            }
            self.inner.utxos(query).await
        }
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_set() {
        let source = Arc::new(FlakySource {
            inner: MemoryUtxoSource::new(),
            offline: AtomicBool::new(false),
        });
        let manager = manager(source.clone()).await;
        let cached = manager.fetch(0, ChainKind::Asset, None).await.unwrap();

        source.offline.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.fetch(0, ChainKind::Asset, None).await,
            Err(AddressManagerError::Source(_))
        ));
        assert!(!manager.is_discovering(0, ChainKind::Asset, None).await);
        assert_eq!(manager.get(0, ChainKind::Asset, true).await.unwrap(), cached);
        assert_eq!(manager.extended(&cached).await.unwrap().len(), cached.len());
    }
}
