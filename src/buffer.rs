//! Big-endian byte buffers used by the class file parser and the database
//! codec.
//!
//! `ByteWriter` grows by a configurable increment when a write would overflow.
//! Growth can be disabled once the exact output size is known; an overflow in
//! that mode is remembered and reported by [`ByteWriter::finish`] instead of
//! silently reallocating.

pub const DEFAULT_INCREMENT: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected end of data at offset {offset} (wanted {wanted} bytes, {available} available)")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        if self.remaining() < len {
            return Err(ReadError::Truncated {
                offset: self.pos,
                wanted: len,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ReadError> {
        self.bytes(len).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ReadError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, ReadError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, ReadError> {
        Ok(i64::from_be_bytes(self.array()?))
    }
}

#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    increment: usize,
    limit: Option<usize>,
    overflowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("buffer pre-sized to {capacity} bytes but {written} were written")]
    SizeMismatch { capacity: usize, written: usize },
}

impl ByteWriter {
    pub fn new(increment: usize) -> Self {
        let increment = increment.max(16);
        Self {
            buf: Vec::with_capacity(increment),
            increment,
            limit: None,
            overflowed: false,
        }
    }

    /// A writer whose final size is known up front. Writing more or fewer
    /// bytes than `size` makes [`ByteWriter::finish`] fail.
    pub fn exact(size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(size),
            increment: 0,
            limit: Some(size),
            overflowed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn ensure(&mut self, extra: usize) {
        let needed = self.buf.len() + extra;
        if let Some(limit) = self.limit {
            if needed > limit {
                self.overflowed = true;
            }
            return;
        }
        if needed <= self.buf.capacity() {
            return;
        }
        let mut new_cap = self.buf.capacity().max(self.increment);
        while new_cap < needed {
            new_cap += self.increment.max(new_cap);
        }
        self.buf.reserve_exact(new_cap - self.buf.len());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.put_bytes(&[v]);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.put_bytes(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.put_bytes(&v.to_be_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.put_bytes(&v.to_be_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.put_bytes(&v.to_be_bytes());
    }

    pub fn finish(self) -> Result<Vec<u8>, WriteError> {
        if self.overflowed {
            return Err(WriteError::SizeMismatch {
                capacity: self.limit.unwrap_or(self.buf.capacity()),
                written: self.buf.len(),
            });
        }
        Ok(self.buf)
    }

    /// Like [`ByteWriter::finish`] but also checks the written length against
    /// the size the writer was created for.
    pub fn finish_exact(self, expected: usize) -> Result<Vec<u8>, WriteError> {
        let written = self.buf.len();
        let buf = self.finish()?;
        if written != expected {
            return Err(WriteError::SizeMismatch {
                capacity: expected,
                written,
            });
        }
        Ok(buf)
    }
}
