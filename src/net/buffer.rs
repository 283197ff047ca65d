//! Serialization buffer implementation
//!
//! Provides a byte buffer with the engine's binary encodings including:
//! - Standard big-endian integer types (u8, u16, s16, u32, s32)
//! - Fixed-point floats (F1000: thousandths stored as s32)
//! - Vector encodings (V2S16, V2F1000, V3F1000)
//! - Length-prefixed strings (u16 and u32 length variants)

use bytes::{BufMut, BytesMut};

use crate::error::SerializationError;
use crate::game::math::{V2f, V2s16, V3f};

/// Maximum length of a short (u16-prefixed) string
pub const MAX_STRING_LENGTH: usize = u16::MAX as usize;

/// Maximum length of a long (u32-prefixed) string
pub const MAX_LONG_STRING_LENGTH: usize = 64 * 1024 * 1024;

/// Result type for buffer reads
pub type ReadResult<T> = std::result::Result<T, SerializationError>;

/// Byte buffer for reading and writing engine-encoded data
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    /// Internal byte buffer
    data: BytesMut,
    /// Current read position
    read_pos: usize,
}

impl PacketBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
            read_pos: 0,
        }
    }

    /// Create a buffer with a specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read_pos: 0,
        }
    }

    /// Create a buffer from existing bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
            read_pos: 0,
        }
    }

    // ============ Properties ============

    /// Get the current read position
    #[inline]
    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    /// Get the total length of the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.read_pos)
    }

    /// Check if there are bytes remaining to read
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Get a reference to the underlying bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer into a byte vector
    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    fn take(&mut self, count: usize) -> ReadResult<&[u8]> {
        if self.remaining() < count {
            return Err(SerializationError::UnexpectedEof {
                needed: count,
                remaining: self.remaining(),
            });
        }
        let start = self.read_pos;
        self.read_pos += count;
        Ok(&self.data[start..self.read_pos])
    }

    // ============ Reading Methods ============

    /// Read an unsigned byte
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a boolean stored as a byte
    pub fn read_bool(&mut self) -> ReadResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned big-endian short
    pub fn read_u16(&mut self) -> ReadResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a signed big-endian short
    pub fn read_s16(&mut self) -> ReadResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// Read an unsigned big-endian int
    pub fn read_u32(&mut self) -> ReadResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a signed big-endian int
    pub fn read_s32(&mut self) -> ReadResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a fixed-point float (thousandths)
    pub fn read_f1000(&mut self) -> ReadResult<f32> {
        Ok(self.read_s32()? as f32 / 1000.0)
    }

    /// Read a 2D short vector
    pub fn read_v2s16(&mut self) -> ReadResult<V2s16> {
        let x = self.read_s16()?;
        let y = self.read_s16()?;
        Ok(V2s16::new(x, y))
    }

    /// Read a 2D fixed-point vector
    pub fn read_v2f1000(&mut self) -> ReadResult<V2f> {
        let x = self.read_f1000()?;
        let y = self.read_f1000()?;
        Ok(V2f::new(x, y))
    }

    /// Read a 3D fixed-point vector
    pub fn read_v3f1000(&mut self) -> ReadResult<V3f> {
        let x = self.read_f1000()?;
        let y = self.read_f1000()?;
        let z = self.read_f1000()?;
        Ok(V3f::new(x, y, z))
    }

    // ============ String Reading ============

    /// Read raw bytes prefixed by a u16 length
    pub fn read_string_bytes(&mut self) -> ReadResult<Vec<u8>> {
        let len = self.read_u16()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read raw bytes prefixed by a u32 length
    pub fn read_long_string_bytes(&mut self) -> ReadResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        if len > MAX_LONG_STRING_LENGTH {
            return Err(SerializationError::StringTooLong {
                len,
                max: MAX_LONG_STRING_LENGTH,
            });
        }
        Ok(self.take(len)?.to_vec())
    }

    /// Read a u16-prefixed UTF-8 string
    pub fn read_string(&mut self) -> ReadResult<String> {
        let bytes = self.read_string_bytes()?;
        String::from_utf8(bytes).map_err(|_| SerializationError::InvalidStringEncoding)
    }

    /// Read a u32-prefixed UTF-8 string
    pub fn read_long_string(&mut self) -> ReadResult<String> {
        let bytes = self.read_long_string_bytes()?;
        String::from_utf8(bytes).map_err(|_| SerializationError::InvalidStringEncoding)
    }

    // ============ Writing Methods ============

    /// Write an unsigned byte
    pub fn write_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    /// Write a boolean as a byte
    pub fn write_bool(&mut self, value: bool) {
        self.data.put_u8(value as u8);
    }

    /// Write an unsigned big-endian short
    pub fn write_u16(&mut self, value: u16) {
        self.data.put_u16(value);
    }

    /// Write a signed big-endian short
    pub fn write_s16(&mut self, value: i16) {
        self.data.put_i16(value);
    }

    /// Write an unsigned big-endian int
    pub fn write_u32(&mut self, value: u32) {
        self.data.put_u32(value);
    }

    /// Write a signed big-endian int
    pub fn write_s32(&mut self, value: i32) {
        self.data.put_i32(value);
    }

    /// Write a fixed-point float (thousandths, truncated toward zero)
    pub fn write_f1000(&mut self, value: f32) {
        self.write_s32((value * 1000.0) as i32);
    }

    /// Write a 2D short vector
    pub fn write_v2s16(&mut self, value: V2s16) {
        self.write_s16(value.x);
        self.write_s16(value.y);
    }

    /// Write a 2D fixed-point vector
    pub fn write_v2f1000(&mut self, value: V2f) {
        self.write_f1000(value.x);
        self.write_f1000(value.y);
    }

    /// Write a 3D fixed-point vector
    pub fn write_v3f1000(&mut self, value: V3f) {
        self.write_f1000(value.x);
        self.write_f1000(value.y);
        self.write_f1000(value.z);
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    /// Write bytes prefixed by a u16 length
    pub fn write_string_bytes(&mut self, bytes: &[u8]) -> ReadResult<()> {
        if bytes.len() > MAX_STRING_LENGTH {
            return Err(SerializationError::StringTooLong {
                len: bytes.len(),
                max: MAX_STRING_LENGTH,
            });
        }
        self.write_u16(bytes.len() as u16);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write bytes prefixed by a u32 length
    pub fn write_long_string_bytes(&mut self, bytes: &[u8]) -> ReadResult<()> {
        if bytes.len() > MAX_LONG_STRING_LENGTH {
            return Err(SerializationError::StringTooLong {
                len: bytes.len(),
                max: MAX_LONG_STRING_LENGTH,
            });
        }
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write a u16-prefixed string
    pub fn write_string(&mut self, value: &str) -> ReadResult<()> {
        self.write_string_bytes(value.as_bytes())
    }

    /// Write a u32-prefixed string
    pub fn write_long_string(&mut self, value: &str) -> ReadResult<()> {
        self.write_long_string_bytes(value.as_bytes())
    }

    /// Write a u16-prefixed string, cutting it at the length limit
    ///
    /// Used for names and textures which the engine never lets grow past the
    /// limit in practice. The cut lands on a char boundary.
    pub fn write_string_truncated(&mut self, value: &str) {
        let mut len = value.len().min(MAX_STRING_LENGTH);
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        self.write_u16(len as u16);
        self.write_bytes(&value.as_bytes()[..len]);
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for PacketBuffer {
    fn from(vec: Vec<u8>) -> Self {
        Self::from_bytes(&vec)
    }
}

impl From<&[u8]> for PacketBuffer {
    fn from(slice: &[u8]) -> Self {
        Self::from_bytes(slice)
    }
}

impl AsRef<[u8]> for PacketBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
