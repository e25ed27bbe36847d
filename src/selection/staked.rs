//! Selection for the platform chain, where outputs may be stake-locked

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::{Id, Utxo};
use crate::tx::{
    sort_inputs, sort_outputs, Input, Output, OutputOwners, StakeableLockIn, StakeableLockOut,
    TransferInput, TransferOutput, TransferableInput, TransferableOutput, TxError,
};

use super::selector::{change_owners, destination_owners, ensure_finished};
use super::{AssetAmountDestination, Selection, SelectionError};

struct Candidate<'a> {
    utxo: &'a Utxo,
    output: &'a TransferOutput,
    /// Locktime of a stakeable lock wrapper, matured or not
    stake_locktime: Option<u64>,
    locked: bool,
}

#[derive(Default)]
struct Buckets {
    unlocked: BTreeMap<Id, u64>,
    locked: BTreeMap<(Id, u64), u64>,
}

impl Buckets {
    fn add(&mut self, asset_id: Id, lock: Option<u64>, value: u64) {
        if value == 0 {
            return;
        }
        let slot = match lock {
            Some(locktime) => self.locked.entry((asset_id, locktime)).or_default(),
            None => self.unlocked.entry(asset_id).or_default(),
        };
        *slot += value;
    }

    fn into_outputs(self, owners: &OutputOwners) -> Result<Vec<TransferableOutput>, TxError> {
        let mut outputs = Vec::with_capacity(self.unlocked.len() + self.locked.len());
        for (asset_id, value) in self.unlocked {
            outputs.push(TransferableOutput::new(
                asset_id,
                TransferOutput::new(value, owners.clone())?,
            ));
        }
        for ((asset_id, locktime), value) in self.locked {
            outputs.push(TransferableOutput::new(
                asset_id,
                Output::StakeableLock(StakeableLockOut {
                    locktime,
                    output: TransferOutput::new(value, owners.clone())?,
                }),
            ));
        }
        sort_outputs(&mut outputs)?;
        Ok(outputs)
    }
}

fn unix_seconds(time: DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp()).unwrap_or(0)
}

/// Select inputs for a request whose `amount` is staked and whose `burn` pays
/// the fee. Outputs still stake-locked at `as_of` are consumed first, earliest
/// unlock first, when `stakeable`; otherwise they are ignored. Stake-locked
/// value only funds stake: whatever is left of a locked UTXO returns as locked
/// change with the same unlock time, and the burn comes from unlocked value.
pub fn select_minimum_spendable_staked(
    request: &AssetAmountDestination,
    utxos: &[Utxo],
    as_of: DateTime<Utc>,
    stakeable: bool,
) -> Result<Selection, SelectionError> {
    let now = unix_seconds(as_of);

    let mut locked = Vec::new();
    let mut unlocked = Vec::new();
    for utxo in utxos {
        let (output, stake_locktime) = match &utxo.output {
            Output::Transfer(output) => (output, None),
            Output::StakeableLock(lock) => (&lock.output, Some(lock.locktime)),
            _ => continue,
        };
        let is_locked = stake_locktime.map_or(false, |locktime| locktime > now);
        let candidate = Candidate {
            utxo,
            output,
            stake_locktime,
            locked: is_locked,
        };
        match (is_locked, stakeable) {
            (true, true) => locked.push(candidate),
            (true, false) => continue,
            (false, _) => unlocked.push(candidate),
        }
    }
    locked.sort_by_key(|candidate| candidate.stake_locktime);

    let mut amounts = request.amounts().to_vec();
    let mut left: Vec<(u64, u64)> = amounts.iter().map(|a| (a.amount, a.burn)).collect();
    let mut inputs = Vec::new();
    let mut stake = Buckets::default();
    let mut change = Buckets::default();

    for candidate in locked.iter().chain(unlocked.iter()) {
        if amounts.iter().all(|a| a.finished) {
            break;
        }
        let utxo = candidate.utxo;
        let Some(slot) = amounts
            .iter()
            .position(|a| a.asset_id == utxo.asset_id && !a.finished)
        else {
            continue;
        };
        let Some(indices) = candidate.output.owners.signing_indices(&request.senders, now) else {
            continue;
        };

        let value = candidate.output.amount;
        let (stake_left, burn_left) = left[slot];
        let burned = if candidate.locked {
            0
        } else {
            value.min(burn_left)
        };
        let staked = (value - burned).min(stake_left);
        if staked + burned == 0 {
            continue;
        }
        let leftover = value - staked - burned;
        left[slot] = (stake_left - staked, burn_left - burned);

        let lock = candidate.locked.then_some(candidate.stake_locktime).flatten();
        stake.add(utxo.asset_id, lock, staked);
        change.add(utxo.asset_id, lock, leftover);

        let previous = &amounts[slot];
        let mut next = previous.spend(staked + burned, candidate.locked);
        next.change = previous.change + leftover;
        next.locked_change = previous.locked_change || (candidate.locked && leftover > 0);
        amounts[slot] = next;

        let transfer = TransferInput::new(value, indices)?;
        let input = match candidate.stake_locktime {
            Some(locktime) => Input::StakeableLock(StakeableLockIn {
                locktime,
                input: transfer,
            }),
            None => Input::Transfer(transfer),
        };
        inputs.push(TransferableInput::new(utxo.utxo_id, utxo.asset_id, input));
    }

    ensure_finished(&amounts)?;

    sort_inputs(&mut inputs);
    let outputs = stake.into_outputs(&destination_owners(request)?)?;
    let change = change.into_outputs(&change_owners(request)?)?;
    log::debug!(
        "Selected {} inputs ({} stake-locked) for {} stake outputs",
        inputs.len(),
        inputs
            .iter()
            .filter(|input| matches!(input.input, Input::StakeableLock(_)))
            .count(),
        outputs.len()
    );
    Ok(Selection {
        inputs,
        outputs,
        change,
        amounts,
    })
}
