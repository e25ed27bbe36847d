//! Minimum-spendable selection over unlocked transfer outputs

use crate::core::Utxo;
use crate::tx::{
    sort_inputs, sort_outputs, Output, OutputOwners, TransferInput, TransferOutput,
    TransferableInput, TransferableOutput,
};

use super::{AssetAmount, AssetAmountDestination, SelectionError};

/// Inputs and outputs chosen to fund a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub inputs: Vec<TransferableInput>,
    /// Outputs paying the destinations (stake outputs for staking requests)
    pub outputs: Vec<TransferableOutput>,
    pub change: Vec<TransferableOutput>,
    pub amounts: Vec<AssetAmount>,
}

impl Selection {
    /// Destination and change outputs together, canonically sorted
    pub fn all_outputs(&self) -> Result<Vec<TransferableOutput>, SelectionError> {
        let mut outputs: Vec<TransferableOutput> =
            self.outputs.iter().chain(self.change.iter()).cloned().collect();
        sort_outputs(&mut outputs).map_err(crate::tx::TxError::from)?;
        Ok(outputs)
    }

    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|input| input.input.amount()).sum()
    }
}

/// Walk `utxos` in the given order and take spendable transfer outputs until
/// every requested asset covers its amount plus burn
pub fn select_minimum_spendable(
    request: &AssetAmountDestination,
    utxos: &[Utxo],
) -> Result<Selection, SelectionError> {
    let mut amounts = request.amounts().to_vec();
    let mut inputs = Vec::new();

    for utxo in utxos {
        if amounts.iter().all(|a| a.finished) {
            break;
        }
        let Output::Transfer(output) = &utxo.output else {
            continue;
        };
        let Some(slot) = amounts
            .iter()
            .position(|a| a.asset_id == utxo.asset_id && !a.finished)
        else {
            continue;
        };
        let Some(indices) = output.owners.signing_indices(&request.senders, request.as_of) else {
            continue;
        };
        amounts[slot] = amounts[slot].spend(output.amount, false);
        inputs.push(TransferableInput::new(
            utxo.utxo_id,
            utxo.asset_id,
            TransferInput::new(output.amount, indices)?,
        ));
    }

    ensure_finished(&amounts)?;

    let mut outputs = Vec::new();
    let mut change = Vec::new();
    for amount in &amounts {
        if amount.amount > 0 {
            outputs.push(TransferableOutput::new(
                amount.asset_id,
                TransferOutput::new(amount.amount, destination_owners(request)?)?,
            ));
        }
        if amount.change > 0 {
            change.push(TransferableOutput::new(
                amount.asset_id,
                TransferOutput::new(amount.change, change_owners(request)?)?,
            ));
        }
    }

    sort_inputs(&mut inputs);
    sort_outputs(&mut outputs).map_err(crate::tx::TxError::from)?;
    sort_outputs(&mut change).map_err(crate::tx::TxError::from)?;
    log::debug!(
        "Selected {} inputs for {} assets ({} change outputs)",
        inputs.len(),
        amounts.len(),
        change.len()
    );
    Ok(Selection {
        inputs,
        outputs,
        change,
        amounts,
    })
}

pub(crate) fn ensure_finished(amounts: &[AssetAmount]) -> Result<(), SelectionError> {
    match amounts.iter().find(|a| !a.finished) {
        Some(short) => {
            log::debug!(
                "Insufficient funds for {}: need {}, have {}",
                short.asset_id,
                short.total(),
                short.spent
            );
            Err(SelectionError::InsufficientFunds {
                asset_id: short.asset_id,
                needed: short.total(),
                available: short.spent,
            })
        }
        None => Ok(()),
    }
}

pub(crate) fn destination_owners(
    request: &AssetAmountDestination,
) -> Result<OutputOwners, SelectionError> {
    Ok(OutputOwners::new(
        request.destinations.iter().copied(),
        request.locktime,
        request.threshold,
    )?)
}

pub(crate) fn change_owners(request: &AssetAmountDestination) -> Result<OutputOwners, SelectionError> {
    Ok(OutputOwners::new(request.change_addresses.iter().copied(), 0, 1)?)
}
