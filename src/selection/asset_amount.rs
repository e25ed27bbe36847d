//! Per-request spend accounting

use chrono::{DateTime, Utc};

use crate::core::{Id, ShortId};

/// Progress of one asset towards `amount + burn`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAmount {
    pub asset_id: Id,
    pub amount: u64,
    pub burn: u64,
    pub spent: u64,
    pub locked_spent: u64,
    pub change: u64,
    pub locked_change: bool,
    pub finished: bool,
}

impl AssetAmount {
    pub fn new(asset_id: Id, amount: u64, burn: u64) -> Self {
        Self {
            asset_id,
            amount,
            burn,
            spent: 0,
            locked_spent: 0,
            change: 0,
            locked_change: false,
            finished: amount.saturating_add(burn) == 0,
        }
    }

    /// Amount plus burn
    pub fn total(&self) -> u64 {
        self.amount.saturating_add(self.burn)
    }

    /// Value still missing before the asset is finished
    pub fn remaining(&self) -> u64 {
        self.total().saturating_sub(self.spent)
    }

    /// Accounting after spending `value` more, tagged as stake-locked or not
    pub fn spend(&self, value: u64, locked: bool) -> Self {
        if self.finished {
            return self.clone();
        }
        let mut next = self.clone();
        next.spent = self.spent.saturating_add(value);
        if locked {
            next.locked_spent = self.locked_spent.saturating_add(value);
        }
        if next.spent >= next.total() {
            next.change = next.spent - next.total();
            next.locked_change = locked;
            next.finished = true;
        }
        next
    }
}

/// A funding request: who pays, who receives, and how much of each asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAmountDestination {
    pub destinations: Vec<ShortId>,
    pub threshold: u32,
    pub locktime: u64,
    pub senders: Vec<ShortId>,
    pub change_addresses: Vec<ShortId>,
    /// Unix seconds at which locktimes are evaluated
    pub as_of: u64,
    amounts: Vec<AssetAmount>,
}

impl AssetAmountDestination {
    pub fn new(
        destinations: Vec<ShortId>,
        senders: Vec<ShortId>,
        change_addresses: Vec<ShortId>,
    ) -> Self {
        Self {
            destinations,
            threshold: 1,
            locktime: 0,
            senders,
            change_addresses,
            as_of: 0,
            amounts: Vec::new(),
        }
    }

    /// Request `amount` to the destinations plus `burn` as fee
    pub fn add_asset(&mut self, asset_id: Id, amount: u64, burn: u64) -> &mut Self {
        match self.amounts.iter_mut().find(|a| a.asset_id == asset_id) {
            Some(existing) => {
                *existing = AssetAmount::new(
                    asset_id,
                    existing.amount.saturating_add(amount),
                    existing.burn.saturating_add(burn),
                )
            }
            None => self.amounts.push(AssetAmount::new(asset_id, amount, burn)),
        }
        self
    }

    pub fn with_asset(mut self, asset_id: Id, amount: u64, burn: u64) -> Self {
        self.add_asset(asset_id, amount, burn);
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_locktime(mut self, locktime: u64) -> Self {
        self.locktime = locktime;
        self
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = u64::try_from(as_of.timestamp()).unwrap_or(0);
        self
    }

    pub fn amounts(&self) -> &[AssetAmount] {
        &self.amounts
    }

    pub fn amount(&self, asset_id: &Id) -> Option<&AssetAmount> {
        self.amounts.iter().find(|a| &a.asset_id == asset_id)
    }

    pub fn can_complete(&self) -> bool {
        self.amounts.iter().all(|a| a.finished)
    }
}
