// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod cursor;
pub mod errors;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::VsdIO;
    pub use super::VsdIOExt;
    pub use super::VsdIOStructExt;
    pub use super::cursor::ByteCursor;
    pub use super::errors::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemVsdIO;

    #[cfg(feature = "std")]
    pub use super::std::StdVsdIO;
}

// Internal use
use errors::*;

/// Largest struct `read_struct` will stage on the stack.
/// One 512-byte sector is the common case; 4 KiB leaves room for big labels.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Block IO abstraction trait.
///
/// Reads and writes at absolute byte offsets of one backing image.
/// Implementations may target RAM, host files, or an SD card filesystem.
pub trait VsdIO {
    /// Writes all of `data` at `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VsdIOResult;

    /// Fills all of `buf` from `offset`. A short read is an error.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VsdIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> VsdIOResult;

    /// Size of the backing image in bytes.
    fn len(&mut self) -> VsdIOResult<u64>;

    fn is_empty(&mut self) -> VsdIOResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Extension helpers for VsdIO.
pub trait VsdIOExt: VsdIO {
    /// Reads `len` bytes at `offset` into a fresh buffer.
    ///
    /// The buffer is reserved fallibly so a transfer that cannot be staged
    /// surfaces as an error instead of aborting.
    #[cfg(feature = "alloc")]
    fn read_vec_at(&mut self, offset: u64, len: usize) -> VsdIOResult<alloc::vec::Vec<u8>> {
        let mut buf = alloc::vec::Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| VsdIOError::Other("read_vec_at: allocation failed"))?;
        buf.resize(len, 0);
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

impl<T: VsdIO + ?Sized> VsdIOExt for T {}

/// Extension trait for reading and writing structs using zerocopy.
///
/// Structs are expected to be built from unaligned little-endian field types
/// (`zerocopy::byteorder`) so their layout is endian-independent.
pub trait VsdIOStructExt: VsdIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> VsdIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(VsdIOError::Invalid("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| VsdIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> VsdIOResult {
        self.write_at(offset, val.as_bytes())
    }
}

impl<T: VsdIO + ?Sized> VsdIOStructExt for T {}
