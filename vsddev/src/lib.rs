// SPDX-License-Identifier: MIT

//! Device side of the bridge: turns a directory of disk images into
//! numbered block devices and answers framed requests against them.

pub mod config;
pub mod device;
pub mod errors;
pub mod source;
pub mod table;

pub mod prelude {
    pub use crate::config::{DEFAULT_MAX_UNITS, DeviceConfig, MAX_UNITS_LIMIT};
    pub use crate::device::Device;
    pub use crate::errors::*;
    pub use crate::source::{DirImageSource, ImageKind, ImageSource, MemImageSource};
    pub use crate::table::{DriveImage, DriveTable};
}
