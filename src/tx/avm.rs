//! Asset-chain transactions

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder};

use super::base::BaseTx;
use super::operation::TransferableOperation;
use super::output::{sort_bare_outputs, Output};
use super::{check, TxError, MAX_DENOMINATION, MAX_NAME_LEN, MAX_SYMBOL_LEN};

/// Outputs created for one feature extension when an asset is created
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InitialState {
    pub fx_index: u32,
    pub outputs: Vec<Output>,
}

impl InitialState {
    pub fn new(fx_index: u32, mut outputs: Vec<Output>) -> Result<Self, CodecError> {
        sort_bare_outputs(&mut outputs)?;
        Ok(Self { fx_index, outputs })
    }
}

impl Encodable for InitialState {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.fx_index);
        encoder.write_array(&self.outputs)
    }
}

impl Decodable for InitialState {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("InitialState", |d| {
            Ok(Self {
                fx_index: d.read_u32()?,
                outputs: d.read_array()?,
            })
        })
    }
}

/// Creates a new asset with its initial holders and mint authorities
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateAssetTx {
    pub base: BaseTx,
    pub name: String,
    pub symbol: String,
    pub denomination: u8,
    pub initial_states: Vec<InitialState>,
}

impl CreateAssetTx {
    pub fn new(
        base: BaseTx,
        name: String,
        symbol: String,
        denomination: u8,
        mut initial_states: Vec<InitialState>,
    ) -> Result<Self, TxError> {
        validate_asset(&name, &symbol, denomination)?;
        initial_states.sort_by_key(|state| state.fx_index);
        Ok(Self {
            base,
            name,
            symbol,
            denomination,
            initial_states,
        })
    }
}

fn validate_asset(name: &str, symbol: &str, denomination: u8) -> Result<(), TxError> {
    if name.len() > MAX_NAME_LEN {
        return Err(TxError::NameTooLong(name.len()));
    }
    if !name.is_ascii() {
        return Err(TxError::NameNotAscii);
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(TxError::SymbolTooLong(symbol.len()));
    }
    if !symbol.is_ascii() {
        return Err(TxError::SymbolNotAscii);
    }
    if denomination > MAX_DENOMINATION {
        return Err(TxError::DenominationTooLarge(denomination));
    }
    Ok(())
}

impl Encodable for CreateAssetTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        encoder.write_string(&self.name)?;
        encoder.write_string(&self.symbol)?;
        encoder.write_u8(self.denomination);
        encoder.write_array(&self.initial_states)
    }
}

impl Decodable for CreateAssetTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let tx = Self {
            base: decoder.read()?,
            name: decoder.read_string()?,
            symbol: decoder.read_string()?,
            denomination: decoder.read_u8()?,
            initial_states: decoder.read_array()?,
        };
        check(decoder, validate_asset(&tx.name, &tx.symbol, tx.denomination))?;
        Ok(tx)
    }
}

/// Applies mint and NFT operations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationTx {
    pub base: BaseTx,
    pub operations: Vec<TransferableOperation>,
}

impl OperationTx {
    pub fn new(base: BaseTx, mut operations: Vec<TransferableOperation>) -> Self {
        operations.sort_by(|a, b| a.utxo_ids.cmp(&b.utxo_ids));
        Self { base, operations }
    }
}

impl Encodable for OperationTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        encoder.write_array(&self.operations)
    }
}

impl Decodable for OperationTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            base: decoder.read()?,
            operations: decoder.read_array()?,
        })
    }
}
