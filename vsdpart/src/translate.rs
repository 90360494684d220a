// SPDX-License-Identifier: MIT

//! Drive-relative sector to image byte offset translation.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::bpb::SyntheticBpb;
use crate::errors::*;

/// `(start_lba + sector) * sector_size`, overflow-checked.
pub fn sector_offset(start_lba: u64, sector: u64, sector_size: u32) -> TranslateResult<u64> {
    start_lba
        .checked_add(sector)
        .and_then(|s| s.checked_mul(sector_size as u64))
        .ok_or(TranslateError::Overflow)
}

/// One Working Media List descriptor: a physically contiguous area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub physical_address: u32,
    pub size: u32,
}

/// Logical-to-physical sector map built from the Working Media List.
///
/// Logical sectors are numbered across the regions in list order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionMap {
    regions: Vec<Region>,
}

/// Physically contiguous slice of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub sector: u64,
    pub count: u64,
}

impl RegionMap {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_sectors(&self) -> u64 {
        self.regions.iter().map(|r| r.size as u64).sum()
    }

    /// Physical sector of `logical`, or `None` past the last region.
    pub fn physical_sector(&self, logical: u64) -> Option<u64> {
        let mut base = 0u64;
        for r in &self.regions {
            let size = r.size as u64;
            if logical < base + size {
                return Some(r.physical_address as u64 + (logical - base));
            }
            base += size;
        }
        None
    }

    /// Splits `count` logical sectors from `start` at region boundaries.
    pub fn runs(&self, start: u64, count: u64) -> TranslateResult<Vec<Run>> {
        let mut out = Vec::new();
        if count == 0 {
            return Ok(out);
        }
        let mut logical = start;
        let end = start.checked_add(count).ok_or(TranslateError::Overflow)?;
        let mut base = 0u64;
        for r in &self.regions {
            let size = r.size as u64;
            let region_end = base + size;
            if logical < region_end && logical < end {
                let take = region_end.min(end) - logical;
                out.push(Run {
                    sector: r.physical_address as u64 + (logical - base),
                    count: take,
                });
                logical += take;
            }
            if logical == end {
                return Ok(out);
            }
            base = region_end;
        }
        Err(TranslateError::Unmapped { logical })
    }
}

/// How a drive's sectors land in its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorMap {
    /// Physical sector = logical sector.
    Flat,
    /// Through the image's Working Media List.
    Regions(Arc<RegionMap>),
}

/// Byte span of the backing image touched by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRun {
    pub offset: u64,
    pub len: usize,
}

/// Addressable window `[start_lba, start_lba + sectors)` of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveWindow {
    pub start_lba: u64,
    pub sectors: u64,
    pub sector_size: u32,
}

impl DriveWindow {
    #[inline]
    pub fn end_lba_inclusive(&self) -> u64 {
        (self.start_lba + self.sectors).saturating_sub(1)
    }

    /// Rejects any range reaching past the window.
    pub fn check(&self, sector: u64, count: u64) -> TranslateResult<()> {
        match sector.checked_add(count) {
            Some(end) if end <= self.sectors => Ok(()),
            _ => Err(TranslateError::OutOfWindow {
                sector,
                count,
                sectors: self.sectors,
            }),
        }
    }

    /// Byte spans for `count` sectors from `sector`, in transfer order.
    pub fn byte_runs(
        &self,
        map: &SectorMap,
        sector: u64,
        count: u64,
    ) -> TranslateResult<Vec<ByteRun>> {
        self.check(sector, count)?;
        let logical = self.start_lba + sector;
        let runs = match map {
            SectorMap::Flat => alloc::vec![Run {
                sector: logical,
                count
            }],
            SectorMap::Regions(regions) => regions.runs(logical, count)?,
        };
        runs.into_iter()
            .map(|run| {
                let offset = sector_offset(run.sector, 0, self.sector_size)?;
                let len = run
                    .count
                    .checked_mul(self.sector_size as u64)
                    .and_then(|l| usize::try_from(l).ok())
                    .ok_or(TranslateError::Overflow)?;
                Ok(ByteRun { offset, len })
            })
            .collect()
    }
}

/// One drive produced by a geometry parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVolume {
    pub bpb: SyntheticBpb,
    pub window: DriveWindow,
    pub map: SectorMap,
    /// Volume name from a disk label, if any.
    pub name: Option<alloc::string::String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_regions() -> RegionMap {
        RegionMap::new(vec![
            Region {
                physical_address: 100,
                size: 50,
            },
            Region {
                physical_address: 1000,
                size: 20,
            },
        ])
    }

    #[test]
    fn flat_offset() {
        assert_eq!(sector_offset(2048, 10, 512).unwrap(), 1_054_720);
        assert_eq!(sector_offset(u64::MAX, 1, 512), Err(TranslateError::Overflow));
    }

    #[test]
    fn region_lookup() {
        let m = two_regions();
        assert_eq!(m.total_sectors(), 70);
        assert_eq!(m.physical_sector(0), Some(100));
        assert_eq!(m.physical_sector(49), Some(149));
        assert_eq!(m.physical_sector(50), Some(1000));
        assert_eq!(m.physical_sector(69), Some(1019));
        assert_eq!(m.physical_sector(70), None);
        assert_eq!(RegionMap::default().physical_sector(0), None);
    }

    #[test]
    fn runs_split_at_region_boundary() {
        let runs = two_regions().runs(48, 4).unwrap();
        assert_eq!(
            runs,
            vec![
                Run {
                    sector: 148,
                    count: 2
                },
                Run {
                    sector: 1000,
                    count: 2
                }
            ]
        );
    }

    #[test]
    fn runs_past_last_region_are_unmapped() {
        assert_eq!(
            two_regions().runs(68, 4),
            Err(TranslateError::Unmapped { logical: 70 })
        );
    }

    #[test]
    fn window_bounds() {
        let w = DriveWindow {
            start_lba: 2048,
            sectors: 100,
            sector_size: 512,
        };
        assert_eq!(w.end_lba_inclusive(), 2147);
        assert!(w.check(99, 1).is_ok());
        assert!(w.check(0, 100).is_ok());
        assert!(matches!(w.check(99, 2), Err(TranslateError::OutOfWindow { .. })));
        assert!(w.check(u64::MAX, 2).is_err());
    }

    #[test]
    fn flat_window_byte_runs() {
        let w = DriveWindow {
            start_lba: 2048,
            sectors: 100,
            sector_size: 512,
        };
        let runs = w.byte_runs(&SectorMap::Flat, 10, 2).unwrap();
        assert_eq!(
            runs,
            vec![ByteRun {
                offset: 1_054_720,
                len: 1024
            }]
        );
    }

    #[test]
    fn region_window_byte_runs() {
        let map = SectorMap::Regions(Arc::new(two_regions()));
        let w = DriveWindow {
            start_lba: 40,
            sectors: 20,
            sector_size: 256,
        };
        let runs = w.byte_runs(&map, 9, 2).unwrap();
        assert_eq!(
            runs,
            vec![
                ByteRun {
                    offset: 149 * 256,
                    len: 256
                },
                ByteRun {
                    offset: 1000 * 256,
                    len: 256
                }
            ]
        );
    }
}
