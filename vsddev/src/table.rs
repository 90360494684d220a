// SPDX-License-Identifier: MIT

//! Drive table: the ordered units reported by INIT, one per host drive.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use vsdio::prelude::*;
use vsdpart::label::{label_volumes, read_disk_label};
use vsdpart::translate::{DriveWindow, ParsedVolume, SectorMap};
use vsdpart::{SyntheticBpb, parse_standard_image};
use vsdproto::frame::MAX_DATA_SIZE;
use vsdproto::params::InitPayload;

use crate::config::DeviceConfig;
use crate::errors::*;
use crate::source::{ImageHandle, ImageKind, ImageSource};

/// One backing image file, shared by every drive carved out of it.
pub type SharedImage = Arc<Mutex<ImageHandle>>;

/// One logical drive: a window into a shared backing image.
#[derive(Clone)]
pub struct DriveImage {
    pub image_name: String,
    /// Index of the backing image in [`DriveTable::images`].
    pub image_index: usize,
    pub bpb: SyntheticBpb,
    pub window: DriveWindow,
    pub map: SectorMap,
    pub volume_name: Option<String>,
    handle: SharedImage,
}

impl fmt::Debug for DriveImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveImage")
            .field("image_name", &self.image_name)
            .field("image_index", &self.image_index)
            .field("bpb", &self.bpb)
            .field("window", &self.window)
            .field("map", &self.map)
            .field("volume_name", &self.volume_name)
            .finish_non_exhaustive()
    }
}

impl DriveImage {
    /// Bytes moved for `count` sectors; must fit one frame.
    pub fn transfer_len(&self, count: u16) -> DevResult<usize> {
        let len = count as usize * self.window.sector_size as usize;
        if len > MAX_DATA_SIZE {
            return Err(DevError::TransferTooLarge {
                len,
                max: MAX_DATA_SIZE,
            });
        }
        Ok(len)
    }

    /// Reads `count` sectors starting at drive-relative `sector`.
    pub fn read(&self, sector: u32, count: u16) -> DevResult<Vec<u8>> {
        let len = self.transfer_len(count)?;
        let runs = self
            .window
            .byte_runs(&self.map, sector as u64, count as u64)?;

        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|_| DevError::Allocation)?;
        out.resize(len, 0);

        // Held across the whole run list so a transfer is never interleaved.
        let mut io = self.handle.lock().map_err(|_| DevError::Poisoned)?;
        let mut pos = 0;
        for run in runs {
            io.read_at(run.offset, &mut out[pos..pos + run.len])
                .map_err(|err| DevError::IO {
                    op: IoOp::Read,
                    err,
                })?;
            pos += run.len;
        }
        Ok(out)
    }

    /// Writes `count` sectors of `data` starting at drive-relative `sector`.
    pub fn write(&self, sector: u32, count: u16, data: &[u8]) -> DevResult<()> {
        let len = self.transfer_len(count)?;
        if data.len() != len {
            return Err(DevError::LengthMismatch {
                expected: len,
                found: data.len(),
            });
        }
        let runs = self
            .window
            .byte_runs(&self.map, sector as u64, count as u64)?;

        let mut io = self.handle.lock().map_err(|_| DevError::Poisoned)?;
        let mut pos = 0;
        for run in runs {
            io.write_at(run.offset, &data[pos..pos + run.len])
                .map_err(|err| DevError::IO {
                    op: IoOp::Write,
                    err,
                })?;
            pos += run.len;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct DriveTable {
    drives: Vec<DriveImage>,
    images: Vec<(String, SharedImage)>,
}

impl DriveTable {
    /// Enumerates `source` and parses every served image, in name order.
    ///
    /// A failing image is logged and skipped; only an unreadable source fails.
    pub fn build<S: ImageSource + ?Sized>(
        config: &DeviceConfig,
        source: &mut S,
    ) -> DevResult<Self> {
        config.validate()?;
        let limit = config.unit_limit();
        let mut table = DriveTable::default();

        for (name, kind) in source.images()? {
            let remaining = limit - table.drives.len();
            if remaining == 0 {
                warn!("unit limit {limit} reached, '{name}' not served");
                continue;
            }

            let mut handle = match source.open(&name) {
                Ok(h) => h,
                Err(e) => {
                    warn!("skipping '{name}': {e}");
                    continue;
                }
            };

            let parsed = match kind {
                ImageKind::Standard => {
                    parse_standard_image(&mut *handle, config.sector_size).map(|v| vec![v])
                }
                ImageKind::Victor => read_disk_label(&mut *handle).and_then(|label| {
                    label_volumes(&mut *handle, &label, remaining, config.fat_sizing)
                }),
            };
            let volumes = match parsed {
                Ok(v) if v.is_empty() => {
                    warn!("skipping '{name}': no data volumes");
                    continue;
                }
                Ok(v) => v,
                Err(e) => {
                    warn!("skipping '{name}': {e}");
                    continue;
                }
            };

            table.add_image(name, handle, volumes);
        }

        info!("{} unit(s) from {} image(s)", table.len(), table.images.len());
        Ok(table)
    }

    fn add_image(&mut self, name: String, handle: ImageHandle, volumes: Vec<ParsedVolume>) {
        let shared: SharedImage = Arc::new(Mutex::new(handle));
        let image_index = self.images.len();
        for vol in volumes {
            info!(
                "unit {}: '{name}' {} sectors of {} bytes at {}",
                self.drives.len(),
                vol.window.sectors,
                vol.window.sector_size,
                vol.window.start_lba
            );
            self.drives.push(DriveImage {
                image_name: name.clone(),
                image_index,
                bpb: vol.bpb,
                window: vol.window,
                map: vol.map,
                volume_name: vol.name,
                handle: shared.clone(),
            });
        }
        self.images.push((name, shared));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.drives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    pub fn get(&self, drive: u8) -> DevResult<&DriveImage> {
        self.drives
            .get(drive as usize)
            .ok_or(DevError::InvalidDrive(drive))
    }

    pub fn drives(&self) -> &[DriveImage] {
        &self.drives
    }

    /// Backing image names, by image index.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.images.iter().map(|(n, _)| n.as_str())
    }

    /// INIT response catalog, in unit order.
    pub fn catalog(&self) -> InitPayload {
        InitPayload {
            units: self.drives.iter().map(|d| d.bpb).collect(),
        }
    }

    /// Flushes and releases every backing image.
    pub fn close(&mut self) -> DevResult<()> {
        let mut first_err = None;
        self.drives.clear();
        for (name, image) in self.images.drain(..) {
            let res = match image.lock() {
                Ok(mut io) => io.flush().map_err(|err| DevError::IO {
                    op: IoOp::Flush,
                    err,
                }),
                Err(_) => Err(DevError::Poisoned),
            };
            match res {
                Ok(()) => debug!("closed '{name}'"),
                Err(e) => {
                    error!("closing '{name}': {e}");
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for DriveTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveTable")
            .field("drives", &self.drives)
            .field("images", &self.images().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for DriveTable {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemImageSource;
    use vsdpart::boot::FatBootSector;
    use vsdpart::bpb::BpbGeometry;
    use vsdpart::io_ext::VsdIOLbaExt;
    use vsdpart::mbr::{Mbr, MbrEntry, write_mbr};

    fn pc_image(sectors: u32, fill: u8) -> Vec<u8> {
        let mut buf = vec![fill; (sectors as usize + 1) * 512];
        let mut io = MemVsdIO::new(&mut buf);
        let mut entries = [MbrEntry::new_empty(); 4];
        entries[0] = MbrEntry::new(0x80, 0x01, 1, sectors);
        write_mbr(&mut io, &Mbr::new_from_entries(entries)).unwrap();
        let bpb = SyntheticBpb {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            num_fats: 2,
            root_entry_count: 16,
            total_sectors: sectors as u16,
            media_descriptor: 0xF8,
            sectors_per_fat: 1,
            geometry: Some(BpbGeometry::default()),
        };
        io.write_struct_lba(1, 512, &FatBootSector::from_synthetic(&bpb))
            .unwrap();
        buf
    }

    fn source() -> MemImageSource {
        let mut src = MemImageSource::new();
        src.insert("b_disk_pc.img", pc_image(8, 0xBB));
        src.insert("a_disk_pc.img", pc_image(4, 0xAA));
        src.insert("broken_pc.img", vec![0u8; 1024]);
        src.insert("readme.txt", vec![]);
        src
    }

    #[test]
    fn build_orders_units_and_skips_bad_images() {
        let table = DriveTable::build(&DeviceConfig::default(), &mut source()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().image_name, "a_disk_pc.img");
        assert_eq!(table.get(1).unwrap().image_name, "b_disk_pc.img");
        assert_eq!(table.get(1).unwrap().image_index, 1);
        assert_eq!(table.catalog().units[1].total_sectors, 8);
        assert_eq!(table.get(2).unwrap_err(), DevError::InvalidDrive(2));
    }

    #[test]
    fn unit_limit_drops_later_images() {
        let config = DeviceConfig {
            max_units: 1,
            ..DeviceConfig::default()
        };
        let table = DriveTable::build(&config, &mut source()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.images().collect::<Vec<_>>(), vec!["a_disk_pc.img"]);
    }

    #[test]
    fn read_write_inside_window() {
        let table = DriveTable::build(&DeviceConfig::default(), &mut source()).unwrap();
        let d = table.get(0).unwrap();
        // sector 1 of the partition is still fill data
        assert_eq!(d.read(1, 1).unwrap(), vec![0xAA; 512]);

        d.write(3, 1, &[0x5A; 512]).unwrap();
        assert_eq!(d.read(3, 1).unwrap(), vec![0x5A; 512]);
        assert_eq!(d.read(2, 2).unwrap()[..512], [0xAA; 512]);
    }

    #[test]
    fn transfer_errors() {
        let table = DriveTable::build(&DeviceConfig::default(), &mut source()).unwrap();
        let d = table.get(1).unwrap();
        assert!(matches!(d.read(7, 2), Err(DevError::OutOfRange(_))));
        assert!(matches!(
            d.read(0, 4),
            Err(DevError::TransferTooLarge { len: 2048, .. })
        ));
        assert_eq!(
            d.write(0, 1, &[0; 100]),
            Err(DevError::LengthMismatch {
                expected: 512,
                found: 100
            })
        );
    }

    #[test]
    fn close_releases_everything() {
        let mut table = DriveTable::build(&DeviceConfig::default(), &mut source()).unwrap();
        table.close().unwrap();
        assert!(table.is_empty());
        assert_eq!(table.images().count(), 0);
    }
}
