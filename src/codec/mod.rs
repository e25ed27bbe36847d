//! Binary wire codec
//!
//! Big-endian, length-prefixed encoding shared by every chain:
//! - fixed-width unsigned integers (1/2/4/8 bytes)
//! - variable sequences: `u32` element count followed by the elements
//! - fixed sequences: no count, length checked against the expected size
//! - byte buffers: `u32` length + bytes; strings: `u16` length + UTF-8
//! - timestamps: `u64` seconds since the Unix epoch
//!
//! Polymorphic records are tagged with a `u32` discriminant and dispatched
//! through the per-chain tables in [`registry`].

pub mod decoder;
pub mod encoder;
pub mod registry;

use thiserror::Error;

use crate::core::{Id, NodeId, ShortId};
use crate::crypto::{Signature, SIGNATURE_LEN};

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use registry::{registry, TypeFamily, TypeRegistry};

/// Codec version tag that prefixes every top-level record
pub const CODEC_VERSION: u16 = 0;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("No data left at {path}: needed {needed} bytes, {remaining} remaining")]
    NoDataLeft {
        path: String,
        needed: usize,
        remaining: usize,
    },
    #[error("Size mismatch at {path}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
    #[error("Unknown {family} type id {type_id} at {path}")]
    UnknownTypeId {
        family: TypeFamily,
        type_id: u32,
        path: String,
    },
    #[error("Unsupported codec version {0}")]
    UnsupportedVersion(u16),
    #[error("Invalid UTF-8 string at {path}")]
    InvalidString { path: String },
    #[error("{kind} of length {len} does not fit its length prefix")]
    TooLong { kind: &'static str, len: usize },
    #[error("Invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

/// A value with a wire encoding
pub trait Encodable {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError>;

    /// Encoding without the codec version tag
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder)?;
        Ok(encoder.into_bytes())
    }
}

/// A value that can be read back from its wire encoding
pub trait Decodable: Sized {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError>;
}

macro_rules! impl_uint {
    ($($ty:ty => $write:ident, $read:ident);* $(;)?) => {$(
        impl Encodable for $ty {
            fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
                encoder.$write(*self);
                Ok(())
            }
        }

        impl Decodable for $ty {
            fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
                decoder.$read()
            }
        }
    )*};
}

impl_uint! {
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
}

impl Encodable for Id {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_raw(self.as_bytes());
        Ok(())
    }
}

impl Decodable for Id {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Id::new(decoder.read_fixed()?))
    }
}

impl Encodable for ShortId {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_raw(self.as_bytes());
        Ok(())
    }
}

impl Decodable for ShortId {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(ShortId::new(decoder.read_fixed()?))
    }
}

impl Encodable for NodeId {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        self.0.encode(encoder)
    }
}

impl Decodable for NodeId {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(NodeId(ShortId::decode(decoder)?))
    }
}

impl Encodable for Signature {
    fn encode(&self, encoder: &mut Encoder) -> Result<(), CodecError> {
        encoder.write_fixed(self.as_bytes(), SIGNATURE_LEN)
    }
}

impl Decodable for Signature {
    fn decode(decoder: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Signature(decoder.read_fixed()?))
    }
}
