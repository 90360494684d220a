// SPDX-License-Identifier: MIT

//! Human-readable drive listings.

use std::fmt::Write as _;

use vsddev::prelude::*;
use vsdpart::SyntheticBpb;
use vsdpart::translate::SectorMap;
use vsdproto::prelude::InitPayload;

use crate::utils::pretty_bytes;

fn drive_letter(unit: usize) -> char {
    (b'A' + (unit % 26) as u8) as char
}

fn bpb_columns(bpb: &SyntheticBpb) -> String {
    let size = bpb.total_sectors as u64 * bpb.bytes_per_sector as u64;
    format!(
        "{:>6} x {:<4} {:>10}  spc={:<3} fats={} spf={:<4} root={:<4} media={:#04x}",
        bpb.total_sectors,
        bpb.bytes_per_sector,
        pretty_bytes(size),
        bpb.sectors_per_cluster,
        bpb.num_fats,
        bpb.sectors_per_fat,
        bpb.root_entry_count,
        bpb.media_descriptor
    )
}

/// Units as served by a local drive table.
pub fn format_table(table: &DriveTable) -> String {
    let mut out = String::new();
    if table.is_empty() {
        out.push_str("no units\n");
        return out;
    }
    for (unit, d) in table.drives().iter().enumerate() {
        let mapping = match &d.map {
            SectorMap::Flat => "flat".to_string(),
            SectorMap::Regions(m) => format!("{} region(s)", m.regions().len()),
        };
        let _ = writeln!(
            out,
            "  {}: {:<20} {:<8} {}  lba={} {}",
            drive_letter(unit),
            d.image_name,
            d.volume_name.as_deref().unwrap_or("-"),
            bpb_columns(&d.bpb),
            d.window.start_lba,
            mapping
        );
    }
    out
}

/// Units as reported over the link by INIT.
pub fn format_catalog(catalog: &InitPayload) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} unit(s)", catalog.num_units());
    for (unit, bpb) in catalog.units.iter().enumerate() {
        let _ = writeln!(out, "  {}: {}", drive_letter(unit), bpb_columns(bpb));
    }
    out
}
