//! Platform-chain staking transactions

use chrono::{DateTime, Utc};

use crate::codec::{CodecError, Decodable, Decoder, Encodable, Encoder, TypeFamily};
use crate::core::NodeId;

use super::base::BaseTx;
use super::output::{sort_outputs, OutputOwners, TransferableOutput};
use super::type_id::P_OUTPUT_OWNERS;
use super::{check, expect_type_id, TxError, MAX_DELEGATION_SHARES};

fn encode_owner(owners: &OutputOwners, encoder: &mut Encoder) -> Result<(), CodecError> {
    encoder.write_u32(P_OUTPUT_OWNERS);
    owners.encode(encoder)
}

fn decode_owner(decoder: &mut Decoder<'_>) -> Result<OutputOwners, CodecError> {
    expect_type_id(decoder, TypeFamily::Output, P_OUTPUT_OWNERS)?;
    decoder.read()
}

/// A validator's node, validation window and stake weight
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Validator {
    pub node_id: NodeId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub weight: u64,
}

impl Validator {
    pub fn new(
        node_id: NodeId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        weight: u64,
    ) -> Result<Self, TxError> {
        let validator = Self {
            node_id,
            start,
            end,
            weight,
        };
        validator.validate()?;
        Ok(validator)
    }

    fn validate(&self) -> Result<(), TxError> {
        if self.end <= self.start {
            return Err(TxError::InvalidValidationPeriod);
        }
        if self.weight == 0 {
            return Err(TxError::ZeroAmount);
        }
        Ok(())
    }
}

impl Encodable for Validator {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.node_id.encode(encoder)?;
        encoder.write_timestamp(&self.start)?;
        encoder.write_timestamp(&self.end)?;
        encoder.write_u64(self.weight);
        Ok(())
    }
}

impl Decodable for Validator {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        decoder.scoped("Validator", |d| {
            let validator = Self {
                node_id: d.read()?,
                start: d.read_timestamp()?,
                end: d.read_timestamp()?,
                weight: d.read_u64()?,
            };
            check(d, validator.validate())?;
            Ok(validator)
        })
    }
}

/// Registers a validator and locks its stake
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    /// Delegation fee in parts per million
    pub shares: u32,
}

impl AddValidatorTx {
    pub fn new(
        base: BaseTx,
        validator: Validator,
        mut stake: Vec<TransferableOutput>,
        rewards_owner: OutputOwners,
        shares: u32,
    ) -> Result<Self, TxError> {
        if shares > MAX_DELEGATION_SHARES {
            return Err(TxError::SharesTooHigh(shares));
        }
        rewards_owner.validate()?;
        sort_outputs(&mut stake)?;
        Ok(Self {
            base,
            validator,
            stake,
            rewards_owner,
            shares,
        })
    }
}

impl Encodable for AddValidatorTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        self.validator.encode(encoder)?;
        encoder.write_array(&self.stake)?;
        encode_owner(&self.rewards_owner, encoder)?;
        encoder.write_u32(self.shares);
        Ok(())
    }
}

impl Decodable for AddValidatorTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let tx = Self {
            base: decoder.read()?,
            validator: decoder.read()?,
            stake: decoder.scoped("stake", |d| d.read_array())?,
            rewards_owner: decode_owner(decoder)?,
            shares: decoder.read_u32()?,
        };
        if tx.shares > MAX_DELEGATION_SHARES {
            return Err(decoder.invalid(TxError::SharesTooHigh(tx.shares).to_string()));
        }
        Ok(tx)
    }
}

/// Delegates stake to an existing validator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

impl AddDelegatorTx {
    pub fn new(
        base: BaseTx,
        validator: Validator,
        mut stake: Vec<TransferableOutput>,
        rewards_owner: OutputOwners,
    ) -> Result<Self, TxError> {
        rewards_owner.validate()?;
        sort_outputs(&mut stake)?;
        Ok(Self {
            base,
            validator,
            stake,
            rewards_owner,
        })
    }
}

impl Encodable for AddDelegatorTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        self.validator.encode(encoder)?;
        encoder.write_array(&self.stake)?;
        encode_owner(&self.rewards_owner, encoder)
    }
}

impl Decodable for AddDelegatorTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            base: decoder.read()?,
            validator: decoder.read()?,
            stake: decoder.scoped("stake", |d| d.read_array())?,
            rewards_owner: decode_owner(decoder)?,
        })
    }
}

/// Creates a subnet controlled by `owner`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

impl CreateSubnetTx {
    pub fn new(base: BaseTx, owner: OutputOwners) -> Result<Self, TxError> {
        owner.validate()?;
        Ok(Self { base, owner })
    }
}

impl Encodable for CreateSubnetTx {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.base.encode(encoder)?;
        encode_owner(&self.owner, encoder)
    }
}

impl Decodable for CreateSubnetTx {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            base: decoder.read()?,
            owner: decode_owner(decoder)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChainKind, Id, ShortId};
    use crate::tx::{StakeableLockOut, TransferOutput, UnsignedTx};
    use chrono::{Duration, TimeZone};

    fn validator() -> Validator {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Validator::new(
            NodeId(ShortId::new([0x11; 20])),
            start,
            start + Duration::days(14),
            2_000_000_000_000,
        )
        .unwrap()
    }

    #[test]
    fn test_add_validator_roundtrip() {
        let owner = OutputOwners::single(ShortId::new([2; 20]));
        let stake = vec![TransferableOutput::new(
            Id::new([3; 32]),
            crate::tx::Output::StakeableLock(StakeableLockOut {
                locktime: 1_800_000_000,
                output: TransferOutput::new(2_000_000_000_000, owner.clone()).unwrap(),
            }),
        )];
        let base = BaseTx::new(1, Id::ZERO, vec![], vec![], vec![]).unwrap();
        let tx = AddValidatorTx::new(base, validator(), stake, owner, 20_000).unwrap();

        let bytes = tx.to_bytes().unwrap();
        let mut decoder = Decoder::new(&bytes, ChainKind::Platform);
        assert_eq!(AddValidatorTx::decode(&mut decoder).unwrap(), tx);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_delegator_and_subnet_roundtrip() {
        let owner = OutputOwners::new([ShortId::new([7; 20]), ShortId::new([8; 20])], 0, 2).unwrap();
        let stake = vec![TransferableOutput::new(
            Id::new([3; 32]),
            TransferOutput::new(25_000_000_000, OutputOwners::single(ShortId::new([2; 20]))).unwrap(),
        )];
        let base = BaseTx::new(1, Id::ZERO, vec![], vec![], b"stake".to_vec()).unwrap();
        let delegator = UnsignedTx::AddDelegator(
            AddDelegatorTx::new(base.clone(), validator(), stake, owner.clone()).unwrap(),
        );
        let subnet = UnsignedTx::CreateSubnet(CreateSubnetTx::new(base, owner).unwrap());

        for tx in [delegator, subnet] {
            let bytes = tx.serialize().unwrap();
            assert_eq!(UnsignedTx::deserialize(&bytes, ChainKind::Platform).unwrap(), tx);
        }
    }

    #[test]
    fn test_owner_needs_its_type_id() {
        let base = BaseTx::new(1, Id::ZERO, vec![], vec![], vec![]).unwrap();
        let tx = CreateSubnetTx::new(base, OutputOwners::single(ShortId::default())).unwrap();
        let mut bytes = tx.to_bytes().unwrap();
        // owner discriminant follows the base fields
        let at = bytes.len() - (8 + 4 + 4 + 20) - 4;
        bytes[at + 3] = 7;
        let mut decoder = Decoder::new(&bytes, ChainKind::Platform);
        assert!(matches!(
            CreateSubnetTx::decode(&mut decoder),
            Err(CodecError::UnknownTypeId { type_id: 7, .. })
        ));
    }

    #[test]
    fn test_validator_limits() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            Validator::new(NodeId::default(), start, start, 1),
            Err(TxError::InvalidValidationPeriod)
        );

        let base = BaseTx::new(1, Id::ZERO, vec![], vec![], vec![]).unwrap();
        assert_eq!(
            AddValidatorTx::new(
                base,
                validator(),
                vec![],
                OutputOwners::default(),
                MAX_DELEGATION_SHARES + 1
            ),
            Err(TxError::SharesTooHigh(MAX_DELEGATION_SHARES + 1))
        );
    }
}
