// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod io_ext;

pub mod errors;
/// FAT boot sector BPB fields.
pub mod boot;
/// Synthetic BPB records and FAT sizing.
pub mod bpb;
/// Proprietary multi-volume disk labels.
pub mod label;
/// Master Boot Record.
pub mod mbr;
pub mod standard;
pub mod translate;

pub use bpb::{BPB_RECORD_SIZE, FatSizing, SyntheticBpb};
pub use io_ext::VsdIOLbaExt;
pub use label::{label_volumes, read_disk_label};
pub use standard::parse_standard_image;
pub use translate::{ByteRun, DriveWindow, ParsedVolume, SectorMap};

pub const DEFAULT_SECTOR_SIZE: u32 = 512;
