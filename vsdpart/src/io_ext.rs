// SPDX-License-Identifier: MIT

//! Sector-addressed struct I/O on top of [`VsdIO`].

use vsdio::prelude::*;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::ImageResult;
use crate::translate::sector_offset;

pub trait VsdIOLbaExt: VsdIO {
    /// Reads the on-disk record `T` at the start of sector `lba`.
    fn read_struct_lba<T>(&mut self, lba: u64, sector_size: u32) -> ImageResult<T>
    where
        T: FromBytes + KnownLayout + Immutable,
    {
        let off = sector_offset(lba, 0, sector_size)?;
        Ok(self.read_struct::<T>(off)?)
    }

    /// Writes `val` at the start of sector `lba`.
    fn write_struct_lba<T>(&mut self, lba: u64, sector_size: u32, val: &T) -> ImageResult<()>
    where
        T: IntoBytes + Immutable,
    {
        let off = sector_offset(lba, 0, sector_size)?;
        Ok(self.write_struct::<T>(off, val)?)
    }
}

impl<T: VsdIO + ?Sized> VsdIOLbaExt for T {}
