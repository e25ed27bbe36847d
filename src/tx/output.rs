//! Output records

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder, TypeFamily};
use crate::core::{Id, ShortId};

use super::type_id::*;
use super::{check, expect_type_id, TxError, MAX_NFT_PAYLOAD_LEN};

// =============================================================================
// Owners
// =============================================================================

/// Who can spend an output, and from when
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addresses: Vec<ShortId>,
}

impl OutputOwners {
    /// Owners with sorted, de-duplicated addresses
    pub fn new(
        addresses: impl IntoIterator<Item = ShortId>,
        locktime: u64,
        threshold: u32,
    ) -> Result<Self, TxError> {
        let mut addresses: Vec<ShortId> = addresses.into_iter().collect();
        addresses.sort();
        addresses.dedup();
        let owners = Self {
            locktime,
            threshold,
            addresses,
        };
        owners.validate()?;
        Ok(owners)
    }

    /// Single owner, threshold one, no locktime
    pub fn single(address: ShortId) -> Self {
        Self {
            locktime: 0,
            threshold: 1,
            addresses: vec![address],
        }
    }

    pub fn validate(&self) -> Result<(), TxError> {
        if self.threshold as usize > self.addresses.len() {
            return Err(TxError::ThresholdTooHigh {
                threshold: self.threshold,
                owners: self.addresses.len(),
            });
        }
        if self.threshold == 0 && !self.addresses.is_empty() {
            return Err(TxError::UnspendableOwners);
        }
        Ok(())
    }

    /// Indices of the first `threshold` owners found in `senders`, or `None`
    /// when the output is still locked at `as_of` or too few senders own it
    pub fn signing_indices(&self, senders: &[ShortId], as_of: u64) -> Option<Vec<u32>> {
        if self.locktime > as_of {
            return None;
        }
        let indices: Vec<u32> = self
            .addresses
            .iter()
            .enumerate()
            .filter(|(_, address)| senders.contains(address))
            .map(|(index, _)| index as u32)
            .take(self.threshold as usize)
            .collect();
        (indices.len() == self.threshold as usize).then_some(indices)
    }
}

impl Encodable for OutputOwners {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u64(self.locktime);
        encoder.write_u32(self.threshold);
        encoder.write_array(&self.addresses)
    }
}

impl Decodable for OutputOwners {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let owners = Self {
            locktime: decoder.read_u64()?,
            threshold: decoder.read_u32()?,
            addresses: decoder.read_array()?,
        };
        check(decoder, owners.validate())?;
        Ok(owners)
    }
}

// =============================================================================
// Output bodies
// =============================================================================

/// Fungible amount held by a set of owners
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn new(amount: u64, owners: OutputOwners) -> Result<Self, TxError> {
        if amount == 0 {
            return Err(TxError::ZeroAmount);
        }
        owners.validate()?;
        Ok(Self { amount, owners })
    }
}

impl Encodable for TransferOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u64(self.amount);
        self.owners.encode(encoder)
    }
}

impl Decodable for TransferOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let amount = decoder.read_u64()?;
        if amount == 0 {
            return Err(decoder.invalid(TxError::ZeroAmount.to_string()));
        }
        Ok(Self {
            amount,
            owners: decoder.read()?,
        })
    }
}

/// Authority to mint more of a variable-cap asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintOutput {
    pub owners: OutputOwners,
}

impl Encodable for MintOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.owners.encode(encoder)
    }
}

impl Decodable for MintOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            owners: decoder.read()?,
        })
    }
}

/// A minted NFT of one group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NftTransferOutput {
    pub group_id: u32,
    pub payload: Vec<u8>,
    pub owners: OutputOwners,
}

impl NftTransferOutput {
    pub fn new(group_id: u32, payload: Vec<u8>, owners: OutputOwners) -> Result<Self, TxError> {
        if payload.len() > MAX_NFT_PAYLOAD_LEN {
            return Err(TxError::PayloadTooLarge(payload.len()));
        }
        owners.validate()?;
        Ok(Self {
            group_id,
            payload,
            owners,
        })
    }
}

impl Encodable for NftTransferOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.group_id);
        encoder.write_bytes(&self.payload)?;
        self.owners.encode(encoder)
    }
}

impl Decodable for NftTransferOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let group_id = decoder.read_u32()?;
        let payload = decoder.read_bytes()?;
        if payload.len() > MAX_NFT_PAYLOAD_LEN {
            return Err(decoder.invalid(TxError::PayloadTooLarge(payload.len()).to_string()));
        }
        Ok(Self {
            group_id,
            payload,
            owners: decoder.read()?,
        })
    }
}

/// Authority to mint NFTs of one group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NftMintOutput {
    pub group_id: u32,
    pub owners: OutputOwners,
}

impl Encodable for NftMintOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.group_id);
        self.owners.encode(encoder)
    }
}

impl Decodable for NftMintOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            group_id: decoder.read_u32()?,
            owners: decoder.read()?,
        })
    }
}

/// Transfer output that can only be staked until `locktime`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StakeableLockOut {
    pub locktime: u64,
    pub output: TransferOutput,
}

impl Encodable for StakeableLockOut {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u64(self.locktime);
        encoder.write_u32(SECP_TRANSFER_OUTPUT);
        self.output.encode(encoder)
    }
}

impl Decodable for StakeableLockOut {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let locktime = decoder.read_u64()?;
        expect_type_id(decoder, TypeFamily::Output, SECP_TRANSFER_OUTPUT)?;
        Ok(Self {
            locktime,
            output: decoder.read()?,
        })
    }
}

// =============================================================================
// Output
// =============================================================================

/// Any output body, tagged with its discriminant on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Output {
    Transfer(TransferOutput),
    Mint(MintOutput),
    NftTransfer(NftTransferOutput),
    NftMint(NftMintOutput),
    StakeableLock(StakeableLockOut),
}

impl Output {
    pub fn type_id(&self) -> u32 {
        match self {
            Output::Transfer(_) => SECP_TRANSFER_OUTPUT,
            Output::Mint(_) => SECP_MINT_OUTPUT,
            Output::NftTransfer(_) => NFT_TRANSFER_OUTPUT,
            Output::NftMint(_) => NFT_MINT_OUTPUT,
            Output::StakeableLock(_) => STAKEABLE_LOCK_OUT,
        }
    }

    pub fn owners(&self) -> &OutputOwners {
        match self {
            Output::Transfer(out) => &out.owners,
            Output::Mint(out) => &out.owners,
            Output::NftTransfer(out) => &out.owners,
            Output::NftMint(out) => &out.owners,
            Output::StakeableLock(out) => &out.output.owners,
        }
    }

    /// Fungible amount, if this output carries one
    pub fn amount(&self) -> Option<u64> {
        match self {
            Output::Transfer(out) => Some(out.amount),
            Output::StakeableLock(out) => Some(out.output.amount),
            _ => None,
        }
    }

    /// Stake unlock time of a stake-locked output
    pub fn stake_locktime(&self) -> Option<u64> {
        match self {
            Output::StakeableLock(out) => Some(out.locktime),
            _ => None,
        }
    }
}

impl Encodable for Output {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_u32(self.type_id());
        match self {
            Output::Transfer(out) => out.encode(encoder),
            Output::Mint(out) => out.encode(encoder),
            Output::NftTransfer(out) => out.encode(encoder),
            Output::NftMint(out) => out.encode(encoder),
            Output::StakeableLock(out) => out.encode(encoder),
        }
    }
}

impl Decodable for Output {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.registry().decode_output(decoder)
    }
}

impl From<TransferOutput> for Output {
    fn from(out: TransferOutput) -> Self {
        Output::Transfer(out)
    }
}

// =============================================================================
// Transferable output
// =============================================================================

/// An output of one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: Output,
}

impl TransferableOutput {
    pub fn new(asset_id: Id, output: impl Into<Output>) -> Self {
        Self {
            asset_id,
            output: output.into(),
        }
    }
}

impl Encodable for TransferableOutput {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.asset_id.encode(encoder)?;
        self.output.encode(encoder)
    }
}

impl Decodable for TransferableOutput {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("TransferableOutput", |d| {
            Ok(Self {
                asset_id: d.read()?,
                output: d.read()?,
            })
        })
    }
}

/// Canonical order: asset id, then encoded output bytes
pub fn sort_outputs(outputs: &mut Vec<TransferableOutput>) -> Result<(), CodecError> {
    let mut keyed = outputs
        .drain(..)
        .map(|out| Ok((out.output.to_bytes()?, out)))
        .collect::<Result<Vec<_>, CodecError>>()?;
    keyed.sort_by(|(a_bytes, a), (b_bytes, b)| {
        a.asset_id.cmp(&b.asset_id).then_with(|| a_bytes.cmp(b_bytes))
    });
    outputs.extend(keyed.into_iter().map(|(_, out)| out));
    Ok(())
}

/// Canonical order of bare outputs: encoded bytes
pub(crate) fn sort_bare_outputs(outputs: &mut Vec<Output>) -> Result<(), CodecError> {
    let mut keyed = outputs
        .drain(..)
        .map(|out| Ok((out.to_bytes()?, out)))
        .collect::<Result<Vec<_>, CodecError>>()?;
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    outputs.extend(keyed.into_iter().map(|(_, out)| out));
    Ok(())
}
