// SPDX-License-Identifier: MIT

//! MBR + FAT images: one drive per image, from the first partition.

use crate::boot::FatBootSector;
use crate::errors::*;
use crate::io_ext::VsdIOLbaExt;
use crate::mbr::read_mbr;
use crate::translate::*;
use log::{debug, info, warn};
use vsdio::prelude::*;

pub fn parse_standard_image<IO: VsdIO + ?Sized>(
    io: &mut IO,
    sector_size: u32,
) -> ImageResult<ParsedVolume> {
    let mbr = read_mbr(io)?;
    let part = mbr.first_partition()?;
    debug!(
        "partition 0: type={:#04x} start={} sectors={}",
        part.part_type,
        part.start_lba(),
        part.sectors()
    );

    let boot: FatBootSector = io.read_struct_lba(part.start_lba() as u64, sector_size)?;
    let bpb = boot.to_synthetic();
    if bpb.bytes_per_sector as u32 != sector_size {
        warn!(
            "BPB reports {} bytes/sector, transferring with {}",
            bpb.bytes_per_sector, sector_size
        );
    }

    let window = DriveWindow {
        start_lba: part.start_lba() as u64,
        sectors: part.sectors() as u64,
        sector_size,
    };
    info!(
        "FAT partition: {} sectors ({}..={})",
        window.sectors,
        window.start_lba,
        part.end_lba_inclusive()?
    );
    Ok(ParsedVolume {
        bpb,
        window,
        map: SectorMap::Flat,
        name: None,
    })
}
