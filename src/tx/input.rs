//! Input records

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder, TypeFamily};
use crate::core::{Id, UtxoId};

use super::type_id::*;
use super::{expect_type_id, TxError};

/// Spend of a transfer output, signed by the owners at `address_indices`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferInput {
    pub amount: u64,
    pub address_indices: Vec<u32>,
}

impl TransferInput {
    pub fn new(amount: u64, mut address_indices: Vec<u32>) -> Result<Self, TxError> {
        if amount == 0 {
            return Err(TxError::ZeroAmount);
        }
        address_indices.sort_unstable();
        address_indices.dedup();
        Ok(Self {
            amount,
            address_indices,
        })
    }
}

impl Encodable for TransferInput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u64(self.amount);
        encoder.write_array(&self.address_indices)
    }
}

impl Decodable for TransferInput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let amount = decoder.read_u64()?;
        if amount == 0 {
            return Err(decoder.invalid(TxError::ZeroAmount.to_string()));
        }
        Ok(Self {
            amount,
            address_indices: decoder.read_array()?,
        })
    }
}

/// Spend of a stake-locked output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StakeableLockIn {
    pub locktime: u64,
    pub input: TransferInput,
}

impl Encodable for StakeableLockIn {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u64(self.locktime);
        encoder.write_u32(SECP_TRANSFER_INPUT);
        self.input.encode(encoder)
    }
}

impl Decodable for StakeableLockIn {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let locktime = decoder.read_u64()?;
        expect_type_id(decoder, TypeFamily::Input, SECP_TRANSFER_INPUT)?;
        Ok(Self {
            locktime,
            input: decoder.read()?,
        })
    }
}

/// Any input body, tagged with its discriminant on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Input {
    Transfer(TransferInput),
    StakeableLock(StakeableLockIn),
}

impl Input {
    pub fn type_id(&self) -> u32 {
        match self {
            Input::Transfer(_) => SECP_TRANSFER_INPUT,
            Input::StakeableLock(_) => STAKEABLE_LOCK_IN,
        }
    }

    pub fn amount(&self) -> u64 {
        self.transfer().amount
    }

    pub fn address_indices(&self) -> &[u32] {
        &self.transfer().address_indices
    }

    fn transfer(&self) -> &TransferInput {
        match self {
            Input::Transfer(input) => input,
            Input::StakeableLock(input) => &input.input,
        }
    }
}

impl Encodable for Input {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.type_id());
        match self {
            Input::Transfer(input) => input.encode(encoder),
            Input::StakeableLock(input) => input.encode(encoder),
        }
    }
}

impl Decodable for Input {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.registry().decode_input(decoder)
    }
}

impl From<TransferInput> for Input {
    fn from(input: TransferInput) -> Self {
        Input::Transfer(input)
    }
}

/// An input of one asset, referencing the UTXO it spends
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl TransferableInput {
    pub fn new(utxo_id: UtxoId, asset_id: Id, input: impl Into<Input>) -> Self {
        Self {
            utxo_id,
            asset_id,
            input: input.into(),
        }
    }
}

impl Encodable for TransferableInput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.utxo_id.encode(encoder)?;
        self.asset_id.encode(encoder)?;
        self.input.encode(encoder)
    }
}

impl Decodable for TransferableInput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("TransferableInput", |d| {
            Ok(Self {
                utxo_id: d.read()?,
                asset_id: d.read()?,
                input: d.read()?,
            })
        })
    }
}

/// Canonical order: spent transaction id, then output index
pub fn sort_inputs(inputs: &mut [TransferableInput]) {
    inputs.sort_by_key(|input| input.utxo_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainKind;

    #[test]
    fn test_indices_sorted() {
        let input = TransferInput::new(10, vec![3, 0, 3, 1]).unwrap();
        assert_eq!(input.address_indices, vec![0, 1, 3]);
        assert_eq!(TransferInput::new(0, vec![]), Err(TxError::ZeroAmount));
    }

    #[test]
    fn test_stakeable_lock_in_wraps_transfer() {
        let input = TransferableInput::new(
            UtxoId::new(Id::new([4; 32]), 1),
            Id::new([9; 32]),
            Input::StakeableLock(StakeableLockIn {
                locktime: 42,
                input: TransferInput::new(7, vec![0]).unwrap(),
            }),
        );
        assert_eq!(input.input.amount(), 7);
        assert_eq!(input.input.address_indices(), &[0]);

        let bytes = input.to_bytes().unwrap();
        let mut decoder = Decoder::new(&bytes, ChainKind::Platform);
        assert_eq!(TransferableInput::decode(&mut decoder).unwrap(), input);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_sort_inputs() {
        let make = |tx: u8, index: u32| {
            TransferableInput::new(
                UtxoId::new(Id::new([tx; 32]), index),
                Id::ZERO,
                TransferInput::new(1, vec![0]).unwrap(),
            )
        };
        let mut inputs = vec![make(2, 0), make(1, 5), make(1, 2)];
        sort_inputs(&mut inputs);
        let order: Vec<(u8, u32)> = inputs
            .iter()
            .map(|i| (i.utxo_id.tx_id.as_bytes()[0], i.utxo_id.output_index))
            .collect();
        assert_eq!(order, vec![(1, 2), (1, 5), (2, 0)]);
    }
}
