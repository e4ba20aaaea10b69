//! Packed (variable-length) integers and length-prefixed byte arrays
//!
//! Every variable-length field of the log and of the before-image payload
//! goes through this module, so `*_len` and `write_*` are guaranteed to
//! agree.
//!
//! # Format
//!
//! ```text
//! unsigned:   LEB128, 7 bits per byte, high bit = continuation
//! signed:     zigzag, then unsigned
//! byte array: signed length (-1 = null), then the bytes
//! ```

use crate::error::{Error, Result};

/// Longest encoding of a u64
pub const MAX_PACKED_LEN: usize = 10;

/// Encoded length of `value`
pub fn u64_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Append `value` as a packed unsigned integer
pub fn write_u64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

#[inline]
fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Encoded length of a signed `value`
pub fn i64_len(value: i64) -> usize {
    u64_len(zigzag(value))
}

/// Append `value` as a packed signed integer
pub fn write_i64(buf: &mut Vec<u8>, value: i64) {
    write_u64(buf, zigzag(value));
}

/// Encoded length of a nullable byte array
pub fn byte_array_len(bytes: Option<&[u8]>) -> usize {
    match bytes {
        Some(b) => i64_len(b.len() as i64) + b.len(),
        None => i64_len(-1),
    }
}

/// Append a nullable, length-prefixed byte array
pub fn write_byte_array(buf: &mut Vec<u8>, bytes: Option<&[u8]>) {
    match bytes {
        Some(b) => {
            write_i64(buf, b.len() as i64);
            buf.extend_from_slice(b);
        }
        None => write_i64(buf, -1),
    }
}

/// Cursor over an encoded buffer
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at offset 0
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// True when every byte has been consumed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::InsufficientData {
                needed: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read one raw byte
    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let b = self.bytes[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Read `n` raw bytes
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a packed unsigned integer
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for i in 0..MAX_PACKED_LEN {
            let b = self.read_u8()?;
            let bits = (b & 0x7f) as u64;
            if i == MAX_PACKED_LEN - 1 && bits > 1 {
                return Err(Error::corruption("packed integer overflows u64"));
            }
            value |= bits << (7 * i);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::corruption("packed integer longer than 10 bytes"))
    }

    /// Read a packed signed integer
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_u64().map(unzigzag)
    }

    /// Read a packed unsigned integer that must fit in u32
    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.read_u64()?;
        u32::try_from(v).map_err(|_| Error::corruption(format!("value {} exceeds u32", v)))
    }

    /// Read a nullable, length-prefixed byte array
    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i64()?;
        match len {
            -1 => Ok(None),
            n if n < 0 => Err(Error::corruption(format!("negative array length {}", n))),
            n => Ok(Some(self.read_slice(n as usize)?.to_vec())),
        }
    }
}
