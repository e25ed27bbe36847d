//! Append-only wire encoder

use chrono::{DateTime, Utc};

use super::{CodecError, Encodable, CODEC_VERSION};

/// Growing output buffer
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder that already carries the codec version tag
    pub fn versioned() -> Self {
        let mut encoder = Self::new();
        encoder.write_u16(CODEC_VERSION);
        encoder
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Bytes with no prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Fixed-size bytes; the length must match `expected`
    pub fn write_fixed(&mut self, bytes: &[u8], expected: usize) -> Result<(), CodecError> {
        if bytes.len() != expected {
            return Err(CodecError::SizeMismatch {
                path: "encoder".to_string(),
                expected,
                actual: bytes.len(),
            });
        }
        self.write_raw(bytes);
        Ok(())
    }

    /// `u32` length followed by the bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len = u32::try_from(bytes.len()).map_err(|_| CodecError::TooLong {
            kind: "byte buffer",
            len: bytes.len(),
        })?;
        self.write_u32(len);
        self.write_raw(bytes);
        Ok(())
    }

    /// `u16` length followed by the UTF-8 bytes
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = u16::try_from(value.len()).map_err(|_| CodecError::TooLong {
            kind: "string",
            len: value.len(),
        })?;
        self.write_u16(len);
        self.write_raw(value.as_bytes());
        Ok(())
    }

    /// Whole seconds since the epoch; sub-second precision is dropped
    pub fn write_timestamp(&mut self, time: &DateTime<Utc>) -> Result<(), CodecError> {
        let secs = u64::try_from(time.timestamp()).map_err(|_| CodecError::InvalidValue {
            path: "encoder".to_string(),
            reason: format!("timestamp {} precedes the epoch", time),
        })?;
        self.write_u64(secs);
        Ok(())
    }

    pub fn write<T: Encodable + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        value.encode(self)
    }

    /// `u32` count followed by each element
    pub fn write_array<T: Encodable>(&mut self, items: &[T]) -> Result<(), CodecError> {
        let count = u32::try_from(items.len()).map_err(|_| CodecError::TooLong {
            kind: "array",
            len: items.len(),
        })?;
        self.write_u32(count);
        items.iter().try_for_each(|item| item.encode(self))
    }

    /// Elements only; the count must match `expected`
    pub fn write_fixed_array<T: Encodable>(
        &mut self,
        items: &[T],
        expected: usize,
    ) -> Result<(), CodecError> {
        if items.len() != expected {
            return Err(CodecError::SizeMismatch {
                path: "encoder".to_string(),
                expected,
                actual: items.len(),
            });
        }
        items.iter().try_for_each(|item| item.encode(self))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
