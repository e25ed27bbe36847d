//! Burn sanity check run before broadcasting

use crate::core::Id;
use crate::tx::UnsignedTx;

use super::SelectionError;

/// Largest burn accepted regardless of the value moved (10 units of 10^9)
pub const DEFAULT_GOOSE_EGG_CAP: u64 = 10 * 1_000_000_000;

/// Whether the burn of `fee_asset` is plausible: below `cap` or no larger
/// than what the transaction outputs
pub fn check_goose_egg(tx: &UnsignedTx, fee_asset: &Id, cap: u64) -> bool {
    let burn = tx.burn(fee_asset);
    burn <= cap || burn <= tx.output_total(fee_asset)
}

pub fn ensure_goose_egg(tx: &UnsignedTx, fee_asset: &Id, cap: u64) -> Result<(), SelectionError> {
    if check_goose_egg(tx, fee_asset, cap) {
        return Ok(());
    }
    let burn = tx.burn(fee_asset);
    log::warn!("Rejecting transaction burning {} (cap {})", burn, cap);
    Err(SelectionError::GooseEggCheckFailed { burn, cap })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ShortId, UtxoId};
    use crate::tx::{
        BaseTx, OutputOwners, TransferInput, TransferOutput, TransferableInput, TransferableOutput,
    };

    fn tx(input: u64, output: u64) -> UnsignedTx {
        let asset = Id::new([1; 32]);
        let outputs = if output > 0 {
            vec![TransferableOutput::new(
                asset,
                TransferOutput::new(output, OutputOwners::single(ShortId::default())).unwrap(),
            )]
        } else {
            vec![]
        };
        UnsignedTx::Base(
            BaseTx::new(
                1,
                Id::ZERO,
                outputs,
                vec![TransferableInput::new(
                    UtxoId::default(),
                    asset,
                    TransferInput::new(input, vec![0]).unwrap(),
                )],
                vec![],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_small_burn_passes() {
        let asset = Id::new([1; 32]);
        assert!(check_goose_egg(&tx(15, 14), &asset, DEFAULT_GOOSE_EGG_CAP));
        assert!(check_goose_egg(&tx(DEFAULT_GOOSE_EGG_CAP, 0), &asset, DEFAULT_GOOSE_EGG_CAP));
    }

    #[test]
    fn test_large_burn_needs_matching_outputs() {
        let asset = Id::new([1; 32]);
        let cap = DEFAULT_GOOSE_EGG_CAP;
        // burn 2 * cap, outputs 2 * cap
        assert!(check_goose_egg(&tx(4 * cap, 2 * cap), &asset, cap));
        // burn 3 * cap, outputs cap
        assert!(!check_goose_egg(&tx(4 * cap, cap), &asset, cap));
        assert_eq!(
            ensure_goose_egg(&tx(cap + 1, 0), &asset, cap),
            Err(SelectionError::GooseEggCheckFailed { burn: cap + 1, cap })
        );
    }
}
