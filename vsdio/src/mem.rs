// SPDX-License-Identifier: MIT

use crate::{VsdIO, VsdIOError, VsdIOResult};

/// In-memory implementation of `VsdIO`.
///
/// Useful for tests and RAM-backed images.
#[derive(Debug)]
pub struct MemVsdIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemVsdIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    #[inline]
    fn range(&self, offset: u64, len: usize) -> VsdIOResult<core::ops::Range<usize>> {
        let end = offset
            .checked_add(len as u64)
            .ok_or(VsdIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(VsdIOError::OutOfBounds);
        }
        Ok(offset as usize..end as usize)
    }
}

impl<'a> VsdIO for MemVsdIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VsdIOResult {
        let range = self.range(offset, data.len())?;
        self.buffer[range].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VsdIOResult {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[range]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> VsdIOResult {
        Ok(())
    }

    #[inline]
    fn len(&mut self) -> VsdIOResult<u64> {
        Ok(self.buffer.len() as u64)
    }
}
