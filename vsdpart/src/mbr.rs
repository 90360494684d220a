// SPDX-License-Identifier: MIT

use crate::errors::*;
use vsdio::prelude::*;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const MBR_SIZE: usize = 512;

#[derive(
    IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C)] // 16 bytes, unaligned little-endian fields
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: U32,
    pub sectors: U32,
}

impl MbrEntry {
    #[inline]
    pub fn new(boot_flag: u8, part_type: u8, start_lba: u32, sectors: u32) -> Self {
        Self {
            boot_flag,
            starting_chs: [0, 0, 0],
            part_type,
            end_chs: [0, 0, 0],
            start_lba: U32::new(start_lba),
            sectors: U32::new(sectors),
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new(0x00, 0x00, 0, 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.part_type == 0
    }

    #[inline]
    pub fn start_lba(&self) -> u32 {
        self.start_lba.get()
    }

    #[inline]
    pub fn sectors(&self) -> u32 {
        self.sectors.get()
    }

    /// Last LBA covered by the entry (inclusive).
    #[inline]
    pub fn end_lba_inclusive(&self) -> ImageResult<u64> {
        if self.sectors() == 0 {
            return Err(ImageError::ZeroSectors);
        }
        Ok(self.start_lba() as u64 + self.sectors() as u64 - 1)
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct Mbr {
    pub boot_code: [u8; 446],
    pub entries: [MbrEntry; 4],
    pub signature: [u8; 2],
}

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; 4]) -> Self {
        Self {
            boot_code: [0u8; 446],
            entries,
            signature: MBR_SIGNATURE,
        }
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    #[inline]
    pub fn validate_header(&self) -> ImageResult<()> {
        if !self.has_valid_signature() {
            return Err(ImageError::InvalidSignature {
                expected: MBR_SIGNATURE,
                found: self.signature,
            });
        }
        Ok(())
    }

    /// The first partition table slot, which must be defined.
    ///
    /// Only slot 0 is consulted; a partition in a later slot is not searched for.
    pub fn first_partition(&self) -> ImageResult<MbrEntry> {
        let entry = self.entries[0];
        if entry.is_empty() {
            return Err(ImageError::UndefinedPartition);
        }
        if entry.sectors() == 0 {
            return Err(ImageError::ZeroSectors);
        }
        Ok(entry)
    }
}

pub fn write_mbr<IO: VsdIO + ?Sized>(io: &mut IO, mbr: &Mbr) -> ImageResult<()> {
    io.write_struct(0, mbr)?;
    io.flush()?;
    Ok(())
}

pub fn read_mbr<IO: VsdIO + ?Sized>(io: &mut IO) -> ImageResult<Mbr> {
    let mbr: Mbr = io.read_struct(0)?;
    mbr.validate_header()?;
    Ok(mbr)
}
