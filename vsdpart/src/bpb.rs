// SPDX-License-Identifier: MIT

//! Synthetic BIOS Parameter Block reported to the host, one per drive.

use crate::errors::*;
use vsdio::cursor::ByteCursor;

/// Size of one BPB record in the INIT catalog.
pub const BPB_RECORD_SIZE: usize = 21;

/// Fixed FAT size reported for label volumes unless computed sizing is enabled.
pub const FAT_SECTORS_PLACEHOLDER: u16 = 9;
pub const VICTOR_SECTORS_PER_TRACK: u16 = 17;
pub const HARD_DISK_MEDIA: u8 = 0xF8;
pub const DEFAULT_NUM_FATS: u8 = 2;

const DIR_ENTRY_SIZE: u32 = 32;

/// Physical geometry fields; absent when the source format has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BpbGeometry {
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntheticBpb {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    /// 16-bit sector count; larger volumes are truncated.
    pub total_sectors: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat: u16,
    pub geometry: Option<BpbGeometry>,
}

impl SyntheticBpb {
    /// Little-endian catalog record. Missing geometry is written as zeros.
    pub fn to_bytes(&self) -> [u8; BPB_RECORD_SIZE] {
        let g = self.geometry.unwrap_or_default();
        let mut out = [0u8; BPB_RECORD_SIZE];
        out[0..2].copy_from_slice(&self.bytes_per_sector.to_le_bytes());
        out[2] = self.sectors_per_cluster;
        out[3..5].copy_from_slice(&self.reserved_sectors.to_le_bytes());
        out[5] = self.num_fats;
        out[6..8].copy_from_slice(&self.root_entry_count.to_le_bytes());
        out[8..10].copy_from_slice(&self.total_sectors.to_le_bytes());
        out[10] = self.media_descriptor;
        out[11..13].copy_from_slice(&self.sectors_per_fat.to_le_bytes());
        out[13..15].copy_from_slice(&g.sectors_per_track.to_le_bytes());
        out[15..17].copy_from_slice(&g.num_heads.to_le_bytes());
        out[17..21].copy_from_slice(&g.hidden_sectors.to_le_bytes());
        out
    }

    pub fn decode(cur: &mut ByteCursor<'_>) -> ImageResult<Self> {
        let mut rec = ByteCursor::new(cur.read_bytes(BPB_RECORD_SIZE)?);
        let mut bpb = SyntheticBpb {
            bytes_per_sector: rec.read_u16_le()?,
            sectors_per_cluster: rec.read_u8()?,
            reserved_sectors: rec.read_u16_le()?,
            num_fats: rec.read_u8()?,
            root_entry_count: rec.read_u16_le()?,
            total_sectors: rec.read_u16_le()?,
            media_descriptor: rec.read_u8()?,
            sectors_per_fat: rec.read_u16_le()?,
            geometry: None,
        };
        let g = BpbGeometry {
            sectors_per_track: rec.read_u16_le()?,
            num_heads: rec.read_u16_le()?,
            hidden_sectors: rec.read_u32_le()?,
        };
        if g != BpbGeometry::default() {
            bpb.geometry = Some(g);
        }
        Ok(bpb)
    }

    /// Bytes covered by the root directory, rounded up to whole sectors.
    pub fn root_dir_sectors(&self) -> u32 {
        let bps = self.bytes_per_sector as u32;
        if bps == 0 {
            return 0;
        }
        (self.root_entry_count as u32 * DIR_ENTRY_SIZE).div_ceil(bps)
    }
}

/// How `sectors_per_fat` is filled for volumes that carry no FAT geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FatSizing {
    /// Always report [`FAT_SECTORS_PLACEHOLDER`].
    #[default]
    Placeholder,
    /// FAT16 sizing from the other BPB fields.
    Computed,
}

impl FatSizing {
    /// `total_sectors` is the full volume size, which may not fit the
    /// record's 16-bit field.
    pub fn sectors_per_fat(self, bpb: &SyntheticBpb, total_sectors: u32) -> ImageResult<u16> {
        match self {
            FatSizing::Placeholder => Ok(FAT_SECTORS_PLACEHOLDER),
            FatSizing::Computed => fat16_sectors_per_fat(bpb, total_sectors),
        }
    }
}

/// Standard FAT16 sizing: (total - reserved - root) / ((bps / 2) * spc + fats).
pub fn fat16_sectors_per_fat(bpb: &SyntheticBpb, total_sectors: u32) -> ImageResult<u16> {
    if bpb.bytes_per_sector < 2 || bpb.sectors_per_cluster == 0 {
        return Err(ImageError::Invalid("FAT sizing needs sector and cluster size"));
    }
    let used = bpb.reserved_sectors as u32 + bpb.root_dir_sectors();
    let tmp1 = total_sectors.saturating_sub(used);
    let tmp2 = (bpb.bytes_per_sector as u32 / 2) * bpb.sectors_per_cluster as u32
        + bpb.num_fats as u32;
    u16::try_from(tmp1.div_ceil(tmp2))
        .map_err(|_| ImageError::Capacity("FAT size exceeds 16 bits"))
}
