// SPDX-License-Identifier: MIT

//! Bounds-checked little-endian reader over a byte slice.
//!
//! Every read either returns the requested bytes or fails with
//! [`CursorError::Truncated`]; nothing ever reads past the end of the buffer.

use crate::errors::{CursorError, CursorResult};

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Consumes exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> CursorResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CursorError::Truncated {
                at: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> CursorResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> CursorResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> CursorResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> CursorResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> CursorResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a one-byte count `n` followed by `n` entries of `entry_size`
    /// bytes, returning the entries as one contiguous slice.
    pub fn read_prefixed_list(&mut self, entry_size: usize) -> CursorResult<PrefixedList<'a>> {
        let start = self.pos;
        let count = self.read_u8()? as usize;
        match self.read_bytes(count * entry_size) {
            Ok(bytes) => Ok(PrefixedList { entry_size, bytes }),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// Decodes a zerocopy record of `size_of::<T>()` bytes.
    pub fn read_struct<T>(&mut self) -> CursorResult<T>
    where
        T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable,
    {
        let bytes = self.read_bytes(core::mem::size_of::<T>())?;
        T::read_from_bytes(bytes).map_err(|_| CursorError::Layout)
    }
}

/// Entries of a count-prefixed list, `entry_size` bytes each.
#[derive(Debug, Clone, Copy)]
pub struct PrefixedList<'a> {
    entry_size: usize,
    bytes: &'a [u8],
}

impl<'a> PrefixedList<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.entry_size.max(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Each entry as its own cursor.
    pub fn entries(self) -> impl Iterator<Item = ByteCursor<'a>> {
        self.bytes
            .chunks_exact(self.entry_size.max(1))
            .map(ByteCursor::new)
    }
}
