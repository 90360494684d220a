// SPDX-License-Identifier: MIT

use crate::bpb::{BpbGeometry, SyntheticBpb};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Leading 36 bytes of a FAT boot sector (jump, OEM name, BPB).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct FatBootSector {
    pub jump: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: U16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: U16,
    pub num_fats: u8,
    pub root_entry_count: U16,
    pub total_sectors_16: U16,
    pub media_descriptor: u8,
    pub sectors_per_fat: U16,
    pub sectors_per_track: U16,
    pub num_heads: U16,
    pub hidden_sectors: U32,
    pub total_sectors_32: U32,
}

impl FatBootSector {
    /// Copies the BPB fields verbatim, geometry included.
    pub fn to_synthetic(&self) -> SyntheticBpb {
        SyntheticBpb {
            bytes_per_sector: self.bytes_per_sector.get(),
            sectors_per_cluster: self.sectors_per_cluster,
            reserved_sectors: self.reserved_sectors.get(),
            num_fats: self.num_fats,
            root_entry_count: self.root_entry_count.get(),
            total_sectors: self.total_sectors_16.get(),
            media_descriptor: self.media_descriptor,
            sectors_per_fat: self.sectors_per_fat.get(),
            geometry: Some(BpbGeometry {
                sectors_per_track: self.sectors_per_track.get(),
                num_heads: self.num_heads.get(),
                hidden_sectors: self.hidden_sectors.get(),
            }),
        }
    }

    pub fn from_synthetic(bpb: &SyntheticBpb) -> Self {
        let g = bpb.geometry.unwrap_or_default();
        Self {
            jump: [0xEB, 0x3C, 0x90],
            oem_name: *b"VSDBRDGE",
            bytes_per_sector: U16::new(bpb.bytes_per_sector),
            sectors_per_cluster: bpb.sectors_per_cluster,
            reserved_sectors: U16::new(bpb.reserved_sectors),
            num_fats: bpb.num_fats,
            root_entry_count: U16::new(bpb.root_entry_count),
            total_sectors_16: U16::new(bpb.total_sectors),
            media_descriptor: bpb.media_descriptor,
            sectors_per_fat: U16::new(bpb.sectors_per_fat),
            sectors_per_track: U16::new(g.sectors_per_track),
            num_heads: U16::new(g.num_heads),
            hidden_sectors: U32::new(g.hidden_sectors),
            total_sectors_32: U32::new(0),
        }
    }
}
