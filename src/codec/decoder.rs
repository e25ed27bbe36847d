//! Cursor-based wire decoder

use chrono::{DateTime, TimeZone, Utc};

use super::registry::{registry, TypeRegistry};
use super::{CodecError, Decodable, CODEC_VERSION};
use crate::core::ChainKind;

/// Reads records from a byte slice.
///
/// Keeps a stack of type names for error messages and the chain whose type
/// tables resolve polymorphic records.
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
    path: Vec<&'static str>,
    chain: ChainKind,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], chain: ChainKind) -> Self {
        Self {
            data,
            offset: 0,
            path: Vec::new(),
            chain,
        }
    }

    pub fn chain(&self) -> ChainKind {
        self.chain
    }

    pub fn registry(&self) -> &'static TypeRegistry {
        registry(self.chain)
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    /// Current type path, e.g. `BaseTx.outputs.TransferOutput`
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Run `f` with `name` pushed onto the type path
    pub fn scoped<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        self.path.push(name);
        let result = f(self);
        self.path.pop();
        result
    }

    pub fn invalid(&self, reason: impl Into<String>) -> CodecError {
        CodecError::InvalidValue {
            path: self.path(),
            reason: reason.into(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::NoDataLeft {
                path: self.path(),
                needed: len,
                remaining,
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_fixed::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidString { path: self.path() })
    }

    pub fn read_timestamp(&mut self) -> Result<DateTime<Utc>, CodecError> {
        let secs = self.read_u64()?;
        i64::try_from(secs)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(|| self.invalid(format!("timestamp {} out of range", secs)))
    }

    pub fn read<T: Decodable>(&mut self) -> Result<T, CodecError> {
        T::decode(self)
    }

    /// `u32` count followed by the elements
    pub fn read_array<T: Decodable>(&mut self) -> Result<Vec<T>, CodecError> {
        let count = self.read_u32()? as usize;
        // every element takes at least one byte
        if count > self.remaining() {
            return Err(CodecError::NoDataLeft {
                path: self.path(),
                needed: count,
                remaining: self.remaining(),
            });
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    /// Exactly `count` elements with no prefix
    pub fn read_fixed_array<T: Decodable>(&mut self, count: usize) -> Result<Vec<T>, CodecError> {
        (0..count).map(|_| T::decode(self)).collect()
    }

    /// Read and check the codec version tag
    pub fn read_version(&mut self) -> Result<u16, CodecError> {
        let version = self.read_u16()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        Ok(version)
    }

    /// Fail if any input is left unread
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            left => Err(CodecError::TrailingBytes(left)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;

    #[test]
    fn test_reads_mirror_writes() {
        let mut encoder = Encoder::new();
        encoder.write_u8(7);
        encoder.write_u16(513);
        encoder.write_bytes(b"payload").unwrap();
        encoder.write_string("AVAX").unwrap();
        encoder.write_array(&[3u64, 4u64]).unwrap();
        let bytes = encoder.into_bytes();

        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        assert_eq!(decoder.read_u8().unwrap(), 7);
        assert_eq!(decoder.read_u16().unwrap(), 513);
        assert_eq!(decoder.read_bytes().unwrap(), b"payload");
        assert_eq!(decoder.read_string().unwrap(), "AVAX");
        assert_eq!(decoder.read_array::<u64>().unwrap(), vec![3, 4]);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_no_data_left_carries_path() {
        let bytes = [0u8, 0, 0, 9, 1];
        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        let err = decoder
            .scoped("BaseTx", |d| d.scoped("memo", |d| d.read_bytes()))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::NoDataLeft {
                path: "BaseTx.memo".to_string(),
                needed: 9,
                remaining: 1
            }
        );
        assert_eq!(decoder.path(), "");
    }

    #[test]
    fn test_oversized_count_fails_before_allocating() {
        let bytes = u32::MAX.to_be_bytes();
        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        assert!(matches!(
            decoder.read_array::<u32>(),
            Err(CodecError::NoDataLeft { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [0u8, 2, 0xff, 0xfe];
        let mut decoder = Decoder::new(&bytes, ChainKind::Asset);
        assert!(matches!(
            decoder.read_string(),
            Err(CodecError::InvalidString { .. })
        ));
    }

    #[test]
    fn test_version_and_trailing_bytes() {
        let mut decoder = Decoder::new(&[0, 1], ChainKind::Evm);
        assert_eq!(decoder.read_version(), Err(CodecError::UnsupportedVersion(1)));

        let decoder = Decoder::new(&[0, 0, 5], ChainKind::Evm);
        assert_eq!(decoder.finish(), Err(CodecError::TrailingBytes(3)));
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let mut encoder = Encoder::new();
        let time = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        encoder.write_timestamp(&time).unwrap();
        let bytes = encoder.into_bytes();
        let mut decoder = Decoder::new(&bytes, ChainKind::Platform);
        assert_eq!(decoder.read_timestamp().unwrap(), time);
    }
}
