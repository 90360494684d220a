// SPDX-License-Identifier: MIT

//! Victor 9000 style disk labels: one physical image carrying several
//! virtual volumes, located through the Working Media List.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::bpb::*;
use crate::errors::*;
use crate::translate::*;
use log::{debug, info, warn};
use vsdio::prelude::*;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const DISK_LABEL_HEADER_SIZE: usize = 52;
pub const VOLUME_LABEL_SIZE: usize = 44;
pub const MAINTENANCE_VOLUME: u16 = 0xFFFF;

pub const MEDIA_ENTRY_SIZE: usize = 8;
pub const REGION_ENTRY_SIZE: usize = 8;
pub const VOLUME_ENTRY_SIZE: usize = 4;

/// Longest label a header plus three full lists can occupy.
pub const DISK_LABEL_MAX_LEN: usize = DISK_LABEL_HEADER_SIZE
    + (1 + 255 * MEDIA_ENTRY_SIZE)
    + (1 + 255 * REGION_ENTRY_SIZE)
    + (1 + 255 * VOLUME_ENTRY_SIZE);

#[derive(
    IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C)]
pub struct IplVector {
    pub disk_address: U32,
    pub load_address: U16,
    pub load_length: U16,
    pub code_entry: U32,
}

impl IplVector {
    pub fn empty() -> Self {
        Self::new_zeroed()
    }
}

/// Drive controller parameters stored in the label.
#[derive(
    IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C)]
pub struct ControlParams {
    pub num_cylinders: U16,
    pub num_heads: u8,
    pub reduced_current_cylinder: U16,
    pub write_precomp_cylinder: U16,
    pub ecc_data_burst: u8,
    pub options: u8,
    pub interleave: u8,
    pub spare: [u8; 6],
}

#[derive(
    IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C)]
pub struct DiskLabelHeader {
    pub label_type: U16,
    pub device_id: U16,
    pub serial_number: [u8; 16],
    pub sector_size: U16,
    pub ipl: IplVector,
    pub primary_boot_volume: U16,
    pub control: ControlParams,
}

impl DiskLabelHeader {
    pub fn new(sector_size: u16, num_cylinders: u16, num_heads: u8) -> Self {
        let mut h = Self::new_zeroed();
        h.label_type = U16::new(1);
        h.sector_size = U16::new(sector_size);
        h.control.num_cylinders = U16::new(num_cylinders);
        h.control.num_heads = num_heads;
        h
    }
}

#[derive(
    IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C)]
pub struct VolumeLabel {
    pub label_type: U16,
    pub volume_name: [u8; 16],
    pub ipl: IplVector,
    pub volume_capacity: U32,
    pub data_start: U32,
    pub host_block_size: U16,
    pub allocation_unit: U16,
    pub directory_entries: U16,
}

impl VolumeLabel {
    pub fn new(
        name: &str,
        capacity: u32,
        data_start: u32,
        host_block_size: u16,
        allocation_unit: u16,
        directory_entries: u16,
    ) -> Self {
        let mut volume_name = [b' '; 16];
        let n = name.len().min(16);
        volume_name[..n].copy_from_slice(&name.as_bytes()[..n]);
        Self {
            label_type: U16::new(1),
            volume_name,
            ipl: IplVector::empty(),
            volume_capacity: U32::new(capacity),
            data_start: U32::new(data_start),
            host_block_size: U16::new(host_block_size),
            allocation_unit: U16::new(allocation_unit),
            directory_entries: U16::new(directory_entries),
        }
    }

    pub fn maintenance(capacity: u32) -> Self {
        let mut v = Self::new("MAINTENANCE", capacity, 0, 512, 1, 0);
        v.label_type = U16::new(MAINTENANCE_VOLUME);
        v
    }

    #[inline]
    pub fn is_maintenance(&self) -> bool {
        self.label_type.get() == MAINTENANCE_VOLUME
    }

    pub fn name(&self) -> String {
        let raw = &self.volume_name;
        let end = raw
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    /// BPB for this volume. Fields the label does not carry are fixed.
    pub fn to_synthetic(
        &self,
        control: &ControlParams,
        fat_sizing: FatSizing,
    ) -> ImageResult<SyntheticBpb> {
        let sectors_per_cluster = u8::try_from(self.allocation_unit.get())
            .map_err(|_| ImageError::Capacity("Allocation unit exceeds 8 bits"))?;
        let reserved_sectors = u16::try_from(self.data_start.get())
            .map_err(|_| ImageError::Capacity("Data start exceeds 16 bits"))?;
        let mut bpb = SyntheticBpb {
            bytes_per_sector: self.host_block_size.get(),
            sectors_per_cluster,
            reserved_sectors,
            num_fats: DEFAULT_NUM_FATS,
            root_entry_count: self.directory_entries.get(),
            // The host only has a 16-bit field; larger volumes wrap.
            total_sectors: self.volume_capacity.get() as u16,
            media_descriptor: HARD_DISK_MEDIA,
            sectors_per_fat: 0,
            geometry: Some(BpbGeometry {
                sectors_per_track: VICTOR_SECTORS_PER_TRACK,
                num_heads: control.num_heads as u16,
                hidden_sectors: 0,
            }),
        };
        bpb.sectors_per_fat = fat_sizing.sectors_per_fat(&bpb, self.volume_capacity.get())?;
        Ok(bpb)
    }
}

/// Parsed disk label: header plus its three lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskLabel {
    pub header: DiskLabelHeader,
    /// Available media entries are only walked, never interpreted.
    pub available_media: Vec<[u8; MEDIA_ENTRY_SIZE]>,
    pub working_media: Arc<RegionMap>,
    pub virtual_volumes: Vec<u32>,
}

impl DiskLabel {
    #[inline]
    pub fn sector_size(&self) -> u32 {
        self.header.sector_size.get() as u32
    }

    pub fn to_bytes(&self) -> ImageResult<Vec<u8>> {
        let count = |n: usize| {
            u8::try_from(n)
                .map_err(|_| ImageError::Capacity("Label list holds more than 255 entries"))
        };
        let mut out = Vec::with_capacity(DISK_LABEL_MAX_LEN);
        out.extend_from_slice(self.header.as_bytes());

        out.push(count(self.available_media.len())?);
        for m in &self.available_media {
            out.extend_from_slice(m);
        }

        out.push(count(self.working_media.regions().len())?);
        for r in self.working_media.regions() {
            out.extend_from_slice(&r.physical_address.to_le_bytes());
            out.extend_from_slice(&r.size.to_le_bytes());
        }

        out.push(count(self.virtual_volumes.len())?);
        for v in &self.virtual_volumes {
            out.extend_from_slice(&v.to_le_bytes());
        }
        Ok(out)
    }

    /// Byte offset of the label of the volume at logical `address`.
    pub fn volume_label_offset(&self, address: u32) -> ImageResult<u64> {
        let physical = self
            .working_media
            .physical_sector(address as u64)
            .ok_or(TranslateError::Unmapped {
                logical: address as u64,
            })?;
        Ok(sector_offset(physical, 0, self.sector_size())?)
    }
}

/// Decodes a label from the start of an image.
pub fn parse_disk_label(bytes: &[u8]) -> ImageResult<DiskLabel> {
    let mut cur = ByteCursor::new(bytes);
    let header: DiskLabelHeader = cur.read_struct()?;
    if header.sector_size.get() == 0 {
        return Err(ImageError::Invalid("Disk label sector size is zero"));
    }

    let available = cur.read_prefixed_list(MEDIA_ENTRY_SIZE)?;
    let available_media = available
        .entries()
        .map(|mut e| e.read_array::<MEDIA_ENTRY_SIZE>())
        .collect::<Result<Vec<_>, _>>()?;

    let wml = cur.read_prefixed_list(REGION_ENTRY_SIZE)?;
    let mut regions = Vec::with_capacity(wml.len());
    for mut e in wml.entries() {
        regions.push(Region {
            physical_address: e.read_u32_le()?,
            size: e.read_u32_le()?,
        });
    }

    let vvl = cur.read_prefixed_list(VOLUME_ENTRY_SIZE)?;
    let virtual_volumes = vvl
        .entries()
        .map(|mut e| e.read_u32_le())
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "disk label: sector_size={} heads={} media={} regions={} volumes={}",
        header.sector_size.get(),
        header.control.num_heads,
        available_media.len(),
        regions.len(),
        virtual_volumes.len()
    );

    Ok(DiskLabel {
        header,
        available_media,
        working_media: Arc::new(RegionMap::new(regions)),
        virtual_volumes,
    })
}

pub fn read_disk_label<IO: VsdIO + ?Sized>(io: &mut IO) -> ImageResult<DiskLabel> {
    let len = io.len()?.min(DISK_LABEL_MAX_LEN as u64) as usize;
    let bytes = io.read_vec_at(0, len)?;
    parse_disk_label(&bytes)
}

pub fn write_disk_label<IO: VsdIO + ?Sized>(io: &mut IO, label: &DiskLabel) -> ImageResult<()> {
    io.write_at(0, &label.to_bytes()?)?;
    io.flush()?;
    Ok(())
}

pub fn read_volume_label<IO: VsdIO + ?Sized>(
    io: &mut IO,
    label: &DiskLabel,
    address: u32,
) -> ImageResult<VolumeLabel> {
    let offset = label.volume_label_offset(address)?;
    Ok(io.read_struct(offset)?)
}

pub fn write_volume_label<IO: VsdIO + ?Sized>(
    io: &mut IO,
    label: &DiskLabel,
    address: u32,
    volume: &VolumeLabel,
) -> ImageResult<()> {
    let offset = label.volume_label_offset(address)?;
    io.write_struct(offset, volume)?;
    Ok(())
}

/// Materializes the data volumes of a label, at most `max_units` of them.
///
/// Maintenance volumes are skipped and do not count against `max_units`.
pub fn label_volumes<IO: VsdIO + ?Sized>(
    io: &mut IO,
    label: &DiskLabel,
    max_units: usize,
    fat_sizing: FatSizing,
) -> ImageResult<Vec<ParsedVolume>> {
    if label.working_media.is_empty() {
        return Err(ImageError::Invalid("Working media list is empty"));
    }

    let mut volumes = Vec::new();
    for (i, &address) in label.virtual_volumes.iter().enumerate() {
        if volumes.len() >= max_units {
            warn!(
                "unit capacity reached, {} volume(s) not examined",
                label.virtual_volumes.len() - i
            );
            break;
        }

        let vol = read_volume_label(io, label, address)?;
        if vol.is_maintenance() {
            debug!("volume @{address}: maintenance volume skipped");
            continue;
        }

        let bpb = vol.to_synthetic(&label.header.control, fat_sizing)?;
        let window = DriveWindow {
            start_lba: address as u64,
            sectors: vol.volume_capacity.get() as u64,
            sector_size: label.sector_size(),
        };
        let name = vol.name();
        info!(
            "volume '{name}' @{address}: {} sectors ({}..={})",
            window.sectors,
            window.start_lba,
            window.end_lba_inclusive()
        );
        volumes.push(ParsedVolume {
            bpb,
            window,
            map: SectorMap::Regions(label.working_media.clone()),
            name: Some(name),
        });
    }
    Ok(volumes)
}
