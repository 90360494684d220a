// SPDX-License-Identifier: MIT

// A `_pc` FAT12 image and a `_v9k` labelled image in one directory,
// served through the device and driven from a HostLink.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vsddev::prelude::*;
use vsdio::cursor::ByteCursor;
use vsdio::prelude::*;
use vsdpart::boot::FatBootSector;
use vsdpart::bpb::{BpbGeometry, SyntheticBpb};
use vsdpart::io_ext::VsdIOLbaExt;
use vsdpart::label::{
    DiskLabel, DiskLabelHeader, VolumeLabel, write_disk_label, write_volume_label,
};
use vsdpart::mbr::{Mbr, MbrEntry, write_mbr};
use vsdpart::translate::{Region, RegionMap};
use vsdproto::prelude::*;

const PC_IMAGE: &str = "disk_a_pc.img";
const V9K_IMAGE: &str = "disk_b_v9k.img";
const PC_BYTES: u64 = 10 * 1024 * 1024;
const PC_START: u32 = 1;
const PC_SECTORS: u32 = (PC_BYTES / 512) as u32 - PC_START;

fn fat12_bpb() -> SyntheticBpb {
    SyntheticBpb {
        bytes_per_sector: 512,
        sectors_per_cluster: 8,
        reserved_sectors: 1,
        num_fats: 2,
        root_entry_count: 512,
        total_sectors: PC_SECTORS as u16,
        media_descriptor: 0xF8,
        sectors_per_fat: 8,
        geometry: Some(BpbGeometry {
            sectors_per_track: 32,
            num_heads: 4,
            hidden_sectors: PC_START,
        }),
    }
}

fn sector_pattern(seed: u8) -> Vec<u8> {
    (0..512u32).map(|i| (i as u8).wrapping_add(seed)).collect()
}

fn make_pc_image(path: &Path) {
    let file = File::create(path).unwrap();
    file.set_len(PC_BYTES).unwrap();
    let mut io = StdVsdIO::new(file);

    let mut entries = [MbrEntry::new_empty(); 4];
    entries[0] = MbrEntry::new(0x80, 0x01, PC_START, PC_SECTORS);
    write_mbr(&mut io, &Mbr::new_from_entries(entries)).unwrap();
    io.write_struct_lba(
        PC_START as u64,
        512,
        &FatBootSector::from_synthetic(&fat12_bpb()),
    )
    .unwrap();
    // drive sector 10
    io.write_at((PC_START as u64 + 10) * 512, &sector_pattern(10))
        .unwrap();
    io.flush().unwrap();
}

/// Two regions (physical 1..101 and 300..500), a maintenance volume and two
/// data volumes. SYS straddles the region boundary.
fn v9k_label() -> DiskLabel {
    DiskLabel {
        header: DiskLabelHeader::new(512, 306, 4),
        available_media: vec![[0; 8]],
        working_media: Arc::new(RegionMap::new(vec![
            Region {
                physical_address: 1,
                size: 100,
            },
            Region {
                physical_address: 300,
                size: 200,
            },
        ])),
        virtual_volumes: vec![0, 20, 120],
    }
}

fn make_v9k_image(path: &Path) {
    let file = File::create(path).unwrap();
    file.set_len(500 * 512).unwrap();
    let mut io = StdVsdIO::new(file);
    let label = v9k_label();
    write_disk_label(&mut io, &label).unwrap();
    write_volume_label(&mut io, &label, 0, &VolumeLabel::maintenance(20)).unwrap();
    write_volume_label(&mut io, &label, 20, &VolumeLabel::new("SYS", 100, 1, 512, 4, 64)).unwrap();
    write_volume_label(&mut io, &label, 120, &VolumeLabel::new("DATA", 180, 2, 512, 8, 128))
        .unwrap();
    io.flush().unwrap();
}

fn image_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    make_pc_image(&dir.path().join(PC_IMAGE));
    make_v9k_image(&dir.path().join(V9K_IMAGE));
    // not served
    File::create(dir.path().join("notes_pc.txt")).unwrap();
    File::create(dir.path().join(".hidden_pc.img")).unwrap();
    dir
}

/// In-process link: each sent frame is answered by the device at once.
struct Loopback<'a> {
    device: &'a mut Device<DirImageSource>,
    pending: VecDeque<u8>,
    corrupt_next: bool,
}

impl Transport for Loopback<'_> {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let request = Frame::decode(&mut ByteCursor::new(data))
            .map_err(|_| TransportError::Other("bad frame"))?;
        let mut bytes = self.device.handle(&request).to_bytes().unwrap();
        if self.corrupt_next {
            self.corrupt_next = false;
            let n = bytes.len();
            bytes[n - 2] ^= 0xFF;
        }
        self.pending = bytes.into();
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        if self.pending.len() < buf.len() {
            return Err(TransportError::Timeout);
        }
        for b in buf.iter_mut() {
            *b = self.pending.pop_front().unwrap_or(0);
        }
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        Ok(())
    }
}

fn host(device: &mut Device<DirImageSource>) -> HostLink<Loopback<'_>> {
    HostLink::new(
        Loopback {
            device,
            pending: VecDeque::new(),
            corrupt_next: false,
        },
        RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        },
    )
}

fn io(drive: u8, start_sector: u32, sector_count: u16) -> IoParams {
    IoParams {
        drive,
        start_sector,
        sector_count,
    }
}

#[test]
fn init_reports_three_units_in_order() {
    let dir = image_dir();
    let config = DeviceConfig {
        image_dir: dir.path().to_path_buf(),
        ..DeviceConfig::default()
    };
    let mut device = Device::new(config, DirImageSource::new(dir.path()));
    let catalog = host(&mut device).init().unwrap();

    assert_eq!(catalog.num_units(), 3);
    assert_eq!(catalog.units[0], fat12_bpb());

    let sys = catalog.units[1];
    assert_eq!(sys.total_sectors, 100);
    assert_eq!(sys.sectors_per_cluster, 4);
    assert_eq!(sys.reserved_sectors, 1);
    assert_eq!(sys.root_entry_count, 64);
    assert_eq!(sys.media_descriptor, 0xF8);
    assert_eq!(sys.geometry.unwrap().num_heads, 4);

    let data = catalog.units[2];
    assert_eq!(data.total_sectors, 180);
    assert_eq!(data.sectors_per_cluster, 8);

    let table = device.table().unwrap();
    assert_eq!(table.get(1).unwrap().volume_name.as_deref(), Some("SYS"));
    assert_eq!(table.get(2).unwrap().volume_name.as_deref(), Some("DATA"));
    assert_eq!(table.get(1).unwrap().image_index, table.get(2).unwrap().image_index);
    assert_eq!(table.images().collect::<Vec<_>>(), vec![PC_IMAGE, V9K_IMAGE]);
}

#[test]
fn read_returns_fixture_sector() {
    let dir = image_dir();
    let mut device = Device::new(DeviceConfig::default(), DirImageSource::new(dir.path()));
    let mut h = host(&mut device);
    h.init().unwrap();

    let data = h.read(io(0, 10, 1)).unwrap();
    assert_eq!(data, sector_pattern(10));

    let two = h.read(io(0, 9, 2)).unwrap();
    assert_eq!(two.len(), 1024);
    assert_eq!(&two[512..], &sector_pattern(10)[..]);
}

#[test]
fn write_then_read_across_region_boundary() {
    let dir = image_dir();
    let mut device = Device::new(DeviceConfig::default(), DirImageSource::new(dir.path()));
    {
        let mut h = host(&mut device);
        h.init().unwrap();

        // SYS logical 20..120: sectors 79 and 80 are physical 100 and 300
        let mut payload = sector_pattern(1);
        payload.extend(sector_pattern(2));
        h.write(io(1, 79, 2), payload.clone()).unwrap();
        assert_eq!(h.read(io(1, 79, 2)).unwrap(), payload);
    }
    device.shutdown().unwrap();

    let mut raw = StdVsdIO::new(File::open(dir.path().join(V9K_IMAGE)).unwrap());
    let mut sector = vec![0u8; 512];
    raw.read_at(100 * 512, &mut sector).unwrap();
    assert_eq!(sector, sector_pattern(1));
    raw.read_at(300 * 512, &mut sector).unwrap();
    assert_eq!(sector, sector_pattern(2));
}

#[test]
fn bounds_errors_reach_the_host() {
    let dir = image_dir();
    let mut device = Device::new(DeviceConfig::default(), DirImageSource::new(dir.path()));
    let mut h = host(&mut device);

    assert_eq!(h.read(io(0, 0, 1)), Err(ProtoError::Device(Status::NotInitialized)));
    h.init().unwrap();

    assert_eq!(h.read(io(3, 0, 1)), Err(ProtoError::Device(Status::InvalidDrive)));
    assert_eq!(h.read(io(2, 179, 2)), Err(ProtoError::Device(Status::OutOfRange)));
    assert_eq!(h.read(io(0, 0, 4)), Err(ProtoError::Device(Status::TransferTooLarge)));
    assert_eq!(
        h.write(io(0, 0, 1), vec![0; 511]),
        Err(ProtoError::Device(Status::LengthMismatch))
    );
}

#[test]
fn corrupted_response_is_retried() {
    let dir = image_dir();
    let mut device = Device::new(DeviceConfig::default(), DirImageSource::new(dir.path()));
    let mut h = host(&mut device);
    h.init().unwrap();

    let mut link = h.into_inner();
    link.corrupt_next = true;
    let mut h = HostLink::new(link, RetryPolicy {
        attempts: 2,
        backoff: Duration::ZERO,
    });
    assert_eq!(h.read(io(0, 10, 1)).unwrap(), sector_pattern(10));
}

#[test]
fn missing_directory_fails_init() {
    let mut device = Device::new(
        DeviceConfig::default(),
        DirImageSource::new("/nonexistent/vsd/images"),
    );
    assert_eq!(
        host(&mut device).init(),
        Err(ProtoError::Device(Status::ImageError))
    );
}
