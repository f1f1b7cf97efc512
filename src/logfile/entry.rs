//! Log entry and its frame encoding
//!
//! ```text
//! ┌───────────────┬─────────────────┬───────────┬─────────────┐
//! │ KeyLen (4 LE) │ ValueLen (4 LE) │ Key bytes │ Value bytes │
//! └───────────────┴─────────────────┴───────────┴─────────────┘
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};

/// Fixed header: key length (4) + value length (4)
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest frame a [`Location`](crate::index::Location) can describe
pub const MAX_FRAME_SIZE: u64 = u32::MAX as u64;

/// A key-value pair as stored in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// The decoded 8-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub key_len: u32,
    pub value_len: u32,
}

impl FrameHeader {
    /// Parse a header from its 8 raw bytes
    pub fn parse(bytes: [u8; FRAME_HEADER_SIZE]) -> Self {
        let mut buf = &bytes[..];
        let key_len = buf.get_u32_le();
        let value_len = buf.get_u32_le();
        Self { key_len, value_len }
    }

    /// Total frame length implied by this header, header included
    pub fn frame_len(&self) -> u64 {
        FRAME_HEADER_SIZE as u64 + self.key_len as u64 + self.value_len as u64
    }
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Size of the serialized frame in bytes
    pub fn encoded_len(&self) -> u64 {
        FRAME_HEADER_SIZE as u64 + self.key.len() as u64 + self.value.len() as u64
    }

    /// Encode this entry as a frame
    ///
    /// Fails with `EntryTooLarge` if the frame could not be addressed by a
    /// 32-bit location size.
    pub fn serialize(&self) -> Result<Bytes> {
        if self.encoded_len() > MAX_FRAME_SIZE {
            return Err(KvError::EntryTooLarge {
                key_len: self.key.len(),
                value_len: self.value.len(),
            });
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len() as usize);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        Ok(buf.freeze())
    }

    /// Decode a frame
    ///
    /// Trailing bytes past the declared frame are ignored. A buffer shorter
    /// than the header, or shorter than the lengths the header declares, is a
    /// `CorruptFrame`.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(KvError::CorruptFrame {
                needed: FRAME_HEADER_SIZE as u64,
                available: data.len() as u64,
            });
        }

        let mut buf = data;
        let key_len = buf.get_u32_le() as usize;
        let value_len = buf.get_u32_le() as usize;

        let needed = FRAME_HEADER_SIZE as u64 + key_len as u64 + value_len as u64;
        if (data.len() as u64) < needed {
            return Err(KvError::CorruptFrame {
                needed,
                available: data.len() as u64,
            });
        }

        let key = buf[..key_len].to_vec();
        let value = buf[key_len..key_len + value_len].to_vec();

        Ok(Self { key, value })
    }
}
