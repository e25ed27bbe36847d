//! Fields shared by every UTXO-chain transaction

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};
use crate::core::Id;

use super::input::{sort_inputs, TransferableInput};
use super::output::{sort_outputs, TransferableOutput};
use super::{TxError, MAX_MEMO_LEN};

/// Plain transfer: network, chain, outputs, inputs and a memo
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub outputs: Vec<TransferableOutput>,
    pub inputs: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

impl BaseTx {
    /// Validated transaction with canonically sorted inputs and outputs
    pub fn new(
        network_id: u32,
        blockchain_id: Id,
        mut outputs: Vec<TransferableOutput>,
        mut inputs: Vec<TransferableInput>,
        memo: Vec<u8>,
    ) -> Result<Self, TxError> {
        if memo.len() > MAX_MEMO_LEN {
            return Err(TxError::MemoTooLong(memo.len()));
        }
        sort_outputs(&mut outputs)?;
        sort_inputs(&mut inputs);
        Ok(Self {
            network_id,
            blockchain_id,
            outputs,
            inputs,
            memo,
        })
    }
}

impl Encodable for BaseTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.network_id);
        self.blockchain_id.encode(encoder)?;
        encoder.write_array(&self.outputs)?;
        encoder.write_array(&self.inputs)?;
        encoder.write_bytes(&self.memo)
    }
}

impl Decodable for BaseTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let network_id = decoder.read_u32()?;
        let blockchain_id = decoder.read()?;
        let outputs = decoder.scoped("outputs", |d| d.read_array())?;
        let inputs = decoder.scoped("inputs", |d| d.read_array())?;
        let memo = decoder.scoped("memo", |d| d.read_bytes())?;
        if memo.len() > MAX_MEMO_LEN {
            return Err(decoder.invalid(TxError::MemoTooLong(memo.len()).to_string()));
        }
        Ok(Self {
            network_id,
            blockchain_id,
            outputs,
            inputs,
            memo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChainKind, ShortId, UtxoId};
    use crate::tx::{OutputOwners, TransferInput, TransferOutput, UnsignedTx};

    fn sample(memo: Vec<u8>) -> Result<BaseTx, TxError> {
        let owners = OutputOwners::single(ShortId::new([1; 20]));
        BaseTx::new(
            5,
            Id::new([0xee; 32]),
            vec![
                TransferableOutput::new(Id::new([2; 32]), TransferOutput::new(4, owners.clone())?),
                TransferableOutput::new(Id::new([1; 32]), TransferOutput::new(10, owners)?),
            ],
            vec![
                TransferableInput::new(
                    UtxoId::new(Id::new([9; 32]), 0),
                    Id::new([1; 32]),
                    TransferInput::new(15, vec![0])?,
                ),
                TransferableInput::new(
                    UtxoId::new(Id::new([3; 32]), 1),
                    Id::new([2; 32]),
                    TransferInput::new(5, vec![0])?,
                ),
            ],
            memo,
        )
    }

    #[test]
    fn test_memo_boundaries() {
        for memo in [vec![], vec![b'm'; MAX_MEMO_LEN]] {
            let tx = sample(memo).unwrap();
            let bytes = tx.to_bytes().unwrap();
            let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
            assert_eq!(BaseTx::decode(&mut decoder).unwrap(), tx);
            decoder.finish().unwrap();
        }
        assert_eq!(
            sample(vec![0; MAX_MEMO_LEN + 1]),
            Err(TxError::MemoTooLong(MAX_MEMO_LEN + 1))
        );
    }

    #[test]
    fn test_constructor_sorts() {
        let tx = sample(vec![]).unwrap();
        assert_eq!(tx.outputs[0].asset_id, Id::new([1; 32]));
        assert_eq!(tx.inputs[0].utxo_id.tx_id, Id::new([3; 32]));
    }

    #[test]
    fn test_truncated_memo_reports_path() {
        let tx = UnsignedTx::Base(sample(b"hello".to_vec()).unwrap());
        let bytes = tx.to_bytes().unwrap();
        let truncated = &bytes[..bytes.len() - 2];
        let mut decoder = Decoder::new(truncated, ChainKind::Asset);
        match UnsignedTx::decode(&mut decoder) {
            Err(CodecError::NoDataLeft { path, .. }) => assert_eq!(path, "BaseTx.memo"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
