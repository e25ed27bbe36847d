//! Where UTXOs come from

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::{Address, ChainKind, Utxo, UtxoId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoSourceError {
    #[error("UTXO source failed: {0}")]
    Transport(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

/// What a query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoTarget {
    Addresses(Vec<Address>),
    Ids(Vec<UtxoId>),
}

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoQuery {
    pub chain: ChainKind,
    pub target: UtxoTarget,
    pub limit: u32,
    /// Opaque continuation returned by the previous page
    pub cursor: Option<String>,
    /// Set to read atomic UTXOs exported from this chain
    pub source_chain: Option<ChainKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPage {
    pub utxos: Vec<Utxo>,
    pub next: Option<String>,
}

#[async_trait]
pub trait UtxoSource: Send + Sync {
    async fn utxos(&self, query: &UtxoQuery) -> Result<UtxoPage, UtxoSourceError>;
}

/// Drain every page of a query
pub async fn fetch_all_utxos(
    source: &dyn UtxoSource,
    chain: ChainKind,
    target: UtxoTarget,
    source_chain: Option<ChainKind>,
    limit: u32,
) -> Result<Vec<Utxo>, UtxoSourceError> {
    let mut query = UtxoQuery {
        chain,
        target,
        limit,
        cursor: None,
        source_chain,
    };
    let mut utxos = Vec::new();
    loop {
        let page = source.utxos(&query).await?;
        utxos.extend(page.utxos);
        match page.next {
            Some(cursor) => query.cursor = Some(cursor),
            None => break,
        }
    }
    Ok(utxos)
}

struct Stored {
    chain: ChainKind,
    source_chain: Option<ChainKind>,
    utxo: Utxo,
}

/// UTXO set held in memory, paginated by offset
#[derive(Default)]
pub struct MemoryUtxoSource {
    utxos: RwLock<Vec<Stored>>,
    queries: AtomicUsize,
}

impl MemoryUtxoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, chain: ChainKind, utxo: Utxo) {
        self.utxos.write().await.push(Stored {
            chain,
            source_chain: None,
            utxo,
        });
    }

    /// Atomic UTXO exported from `source_chain` into `chain`
    pub async fn add_atomic(&self, chain: ChainKind, source_chain: ChainKind, utxo: Utxo) {
        self.utxos.write().await.push(Stored {
            chain,
            source_chain: Some(source_chain),
            utxo,
        });
    }

    pub async fn remove(&self, utxo_id: &UtxoId) -> bool {
        let mut utxos = self.utxos.write().await;
        let before = utxos.len();
        utxos.retain(|stored| &stored.utxo.utxo_id != utxo_id);
        utxos.len() != before
    }

    /// Number of pages served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UtxoSource for MemoryUtxoSource {
    async fn utxos(&self, query: &UtxoQuery) -> Result<UtxoPage, UtxoSourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let offset = match &query.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| UtxoSourceError::InvalidCursor(cursor.clone()))?,
            None => 0,
        };
        let limit = query.limit.max(1) as usize;

        let utxos = self.utxos.read().await;
        let matching: Vec<&Utxo> = utxos
            .iter()
            .filter(|stored| stored.chain == query.chain && stored.source_chain == query.source_chain)
            .map(|stored| &stored.utxo)
            .filter(|utxo| match &query.target {
                UtxoTarget::Addresses(addresses) => {
                    let owners = &utxo.output.owners().addresses;
                    addresses.iter().any(|address| owners.contains(&address.short_id()))
                }
                UtxoTarget::Ids(ids) => ids.contains(&utxo.utxo_id),
            })
            .collect();

        let page: Vec<Utxo> = matching.iter().skip(offset).take(limit).map(|u| (*u).clone()).collect();
        let end = offset + page.len();
        let next = (end < matching.len()).then(|| end.to_string());
        Ok(UtxoPage { utxos: page, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Id, ShortId};
    use crate::tx::{OutputOwners, TransferOutput};

    fn owned_by(n: u8, owner: ShortId) -> Utxo {
        Utxo::new(
            UtxoId::new(Id::new([n; 32]), 0),
            Id::ZERO,
            TransferOutput::new(u64::from(n) + 1, OutputOwners::single(owner)).unwrap(),
        )
    }

    fn address(owner: ShortId) -> Address {
        Address::new("X", "local", owner).unwrap()
    }

    #[tokio::test]
    async fn test_pages_are_drained() {
        let source = MemoryUtxoSource::new();
        let me = ShortId::new([1; 20]);
        for n in 0..5 {
            source.add(ChainKind::Asset, owned_by(n, me)).await;
        }
        source.add(ChainKind::Asset, owned_by(9, ShortId::new([2; 20]))).await;

        let utxos = fetch_all_utxos(
            &source,
            ChainKind::Asset,
            UtxoTarget::Addresses(vec![address(me)]),
            None,
            2,
        )
        .await
        .unwrap();
        assert_eq!(utxos.len(), 5);
        assert_eq!(source.query_count(), 3);
    }

    #[tokio::test]
    async fn test_chain_and_source_chain_filter() {
        let source = MemoryUtxoSource::new();
        let me = ShortId::new([1; 20]);
        source.add(ChainKind::Platform, owned_by(1, me)).await;
        source
            .add_atomic(ChainKind::Asset, ChainKind::Platform, owned_by(2, me))
            .await;

        let target = UtxoTarget::Addresses(vec![address(me)]);
        let local = fetch_all_utxos(&source, ChainKind::Asset, target.clone(), None, 10)
            .await
            .unwrap();
        assert!(local.is_empty());

        let atomic = fetch_all_utxos(
            &source,
            ChainKind::Asset,
            target,
            Some(ChainKind::Platform),
            10,
        )
        .await
        .unwrap();
        assert_eq!(atomic.len(), 1);
        assert_eq!(atomic[0].utxo_id.tx_id, Id::new([2; 32]));
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_remove() {
        let source = MemoryUtxoSource::new();
        let utxo = owned_by(3, ShortId::new([1; 20]));
        source.add(ChainKind::Asset, utxo.clone()).await;

        let target = UtxoTarget::Ids(vec![utxo.utxo_id]);
        let found = fetch_all_utxos(&source, ChainKind::Asset, target.clone(), None, 10)
            .await
            .unwrap();
        assert_eq!(found, vec![utxo.clone()]);

        assert!(source.remove(&utxo.utxo_id).await);
        assert!(fetch_all_utxos(&source, ChainKind::Asset, target, None, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_bad_cursor() {
        let source = MemoryUtxoSource::new();
        let query = UtxoQuery {
            chain: ChainKind::Asset,
            target: UtxoTarget::Ids(vec![]),
            limit: 10,
            cursor: Some("later".into()),
            source_chain: None,
        };
        assert_eq!(
            source.utxos(&query).await,
            Err(UtxoSourceError::InvalidCursor("later".into()))
        );
    }
}
