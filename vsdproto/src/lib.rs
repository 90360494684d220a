// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod command;
pub mod crc8;
pub mod errors;
pub mod frame;
pub mod params;
pub mod transport;

#[cfg(feature = "std")]
pub mod host;

pub mod prelude {
    pub use crate::command::{Command, SD_BLOCK_DEVICE, Status};
    pub use crate::errors::*;
    pub use crate::frame::{
        Frame, MAX_DATA_SIZE, Received, read_frame, receive_frame, write_frame,
    };
    pub use crate::params::{InitPayload, IoParams};
    pub use crate::transport::Transport;

    #[cfg(feature = "std")]
    pub use crate::host::{HostLink, RetryPolicy};
    #[cfg(feature = "std")]
    pub use crate::transport::StreamTransport;
}
