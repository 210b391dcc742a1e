//! Fixed-size payload buffer with bounds-checked, big-endian field access.

use std::fmt;
use std::ops::Range;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ByteOrder};

use super::WireEnum;
use crate::error::DatagramError;

type Result<T> = std::result::Result<T, DatagramError>;

/// Owned payload of one datagram.
///
/// The length is fixed when the buffer is created and never changes; every
/// accessor validates `offset + len` against it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload {
    bytes: Box<[u8]>,
}

impl Payload {
    /// Create a zero-filled payload of `size` bytes.
    pub fn zeroed(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Create a payload of `size` bytes and copy `data` into its head.
    ///
    /// A shorter `data` leaves the tail zero-filled.
    pub fn from_bytes(size: usize, data: &[u8]) -> Result<Self> {
        if data.len() > size {
            return Err(DatagramError::ValueTooLong {
                len: data.len(),
                max: size,
            });
        }
        let mut payload = Self::zeroed(size);
        payload.bytes[..data.len()].copy_from_slice(data);
        Ok(payload)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, offset: usize, len: usize) -> Result<Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(offset..end),
            _ => Err(DatagramError::OutOfBounds {
                offset,
                len,
                size: self.bytes.len(),
            }),
        }
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        let range = self.range(offset, 1)?;
        Ok(self.bytes[range.start])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let range = self.range(offset, 2)?;
        Ok(BigEndian::read_u16(&self.bytes[range]))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let range = self.range(offset, 4)?;
        Ok(BigEndian::read_u32(&self.bytes[range]))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        let range = self.range(offset, 8)?;
        Ok(BigEndian::read_u64(&self.bytes[range]))
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.bytes[range])
    }

    /// Read a zero-padded UTF-8 string field.
    ///
    /// Padding is trimmed from both ends; invalid sequences are replaced.
    pub fn read_string(&self, offset: usize, len: usize) -> Result<String> {
        let bytes = self.read_bytes(offset, len)?;
        Ok(String::from_utf8_lossy(bytes)
            .trim_matches('\0')
            .to_string())
    }

    /// Read an enumeration field of its declared width.
    ///
    /// Undefined values yield `fallback` instead of failing.
    pub fn read_enum<E: WireEnum>(&self, offset: usize, fallback: E) -> Result<E> {
        let range = self.range(offset, E::WIDTH)?;
        let raw = BigEndian::read_uint(&self.bytes[range], E::WIDTH);
        Ok(E::from_raw(raw).unwrap_or(fallback))
    }

    /// Read a 32-bit seconds-since-epoch timestamp.
    pub fn read_timestamp(&self, offset: usize) -> Result<SystemTime> {
        let secs = self.read_u32(offset)?;
        Ok(UNIX_EPOCH + Duration::from_secs(u64::from(secs)))
    }

    /// Read a bit field, least significant bit of each byte first.
    pub fn read_bits(&self, offset: usize, len: usize) -> Result<Vec<bool>> {
        let bytes = self.read_bytes(offset, len)?;
        Ok(bytes
            .iter()
            .flat_map(|byte| (0..8).map(move |bit| (byte >> bit) & 1 == 1))
            .collect())
    }

    // ========================================================================
    // Writers
    // ========================================================================

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        let range = self.range(offset, 1)?;
        self.bytes[range.start] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        let range = self.range(offset, 2)?;
        BigEndian::write_u16(&mut self.bytes[range], value);
        Ok(())
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let range = self.range(offset, 4)?;
        BigEndian::write_u32(&mut self.bytes[range], value);
        Ok(())
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<()> {
        let range = self.range(offset, 8)?;
        BigEndian::write_u64(&mut self.bytes[range], value);
        Ok(())
    }

    /// Write `value` into a field of `len` bytes, zero-filling the remainder.
    pub fn write_bytes(&mut self, offset: usize, value: &[u8], len: usize) -> Result<()> {
        let range = self.range(offset, len)?;
        if value.len() > len {
            return Err(DatagramError::ValueTooLong {
                len: value.len(),
                max: len,
            });
        }
        let field = &mut self.bytes[range];
        field.fill(0);
        field[..value.len()].copy_from_slice(value);
        Ok(())
    }

    pub fn write_string(&mut self, offset: usize, value: &str, len: usize) -> Result<()> {
        self.write_bytes(offset, value.as_bytes(), len)
    }

    pub fn write_enum<E: WireEnum>(&mut self, offset: usize, value: E) -> Result<()> {
        let range = self.range(offset, E::WIDTH)?;
        BigEndian::write_uint(&mut self.bytes[range], value.raw(), E::WIDTH);
        Ok(())
    }

    pub fn write_timestamp(&mut self, offset: usize, value: SystemTime) -> Result<()> {
        let secs = value
            .duration_since(UNIX_EPOCH)
            .map_err(|_| DatagramError::OutOfRange("timestamp before 1970".into()))?
            .as_secs();
        let secs = u32::try_from(secs)
            .map_err(|_| DatagramError::OutOfRange(format!("timestamp {secs}s exceeds 32 bits")))?;
        self.write_u32(offset, secs)
    }

    /// Pack `bits` into a field of `len` bytes, least significant bit first.
    pub fn write_bits(&mut self, offset: usize, bits: &[bool], len: usize) -> Result<()> {
        if bits.len() > len * 8 {
            return Err(DatagramError::ValueTooLong {
                len: bits.len().div_ceil(8),
                max: len,
            });
        }
        let mut packed = vec![0u8; len];
        for (index, _) in bits.iter().enumerate().filter(|(_, set)| **set) {
            packed[index / 8] |= 1 << (index % 8);
        }
        self.write_bytes(offset, &packed, len)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", hex::encode(&self.bytes))
    }
}
