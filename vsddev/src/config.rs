// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use log::warn;
use serde::Deserialize;
use vsdpart::{DEFAULT_SECTOR_SIZE, FatSizing};

use crate::errors::*;

pub const DEFAULT_MAX_UNITS: usize = 16;
/// One unit per host drive letter.
pub const MAX_UNITS_LIMIT: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Directory holding the `*_pc*.img` / `*_v9k*.img` files.
    pub image_dir: PathBuf,
    pub max_units: usize,
    /// Transfer sector size for MBR/FAT images.
    pub sector_size: u32,
    pub fat_sizing: FatSizing,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            max_units: DEFAULT_MAX_UNITS,
            sector_size: DEFAULT_SECTOR_SIZE,
            fat_sizing: FatSizing::default(),
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> DevResult<()> {
        if self.max_units == 0 {
            return Err(DevError::Config("max_units must be at least 1"));
        }
        if !self.sector_size.is_power_of_two() || self.sector_size < 128 {
            return Err(DevError::Config("sector_size must be a power of two >= 128"));
        }
        Ok(())
    }

    /// `max_units` clamped to the drive-letter limit.
    pub fn unit_limit(&self) -> usize {
        if self.max_units > MAX_UNITS_LIMIT {
            warn!(
                "max_units {} exceeds {MAX_UNITS_LIMIT}, clamping",
                self.max_units
            );
            return MAX_UNITS_LIMIT;
        }
        self.max_units
    }
}
