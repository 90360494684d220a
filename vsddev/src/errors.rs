// SPDX-License-Identifier: MIT

use core::fmt;

use vsdio::errors::VsdIOError;
use vsdpart::errors::{ImageError, TranslateError};
use vsdproto::command::Status;
use vsdproto::errors::ProtoError;

/// Which step of a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Seek,
    Read,
    Write,
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevError {
    Proto(ProtoError),
    Image(ImageError),
    IO { op: IoOp, err: VsdIOError },
    /// The image directory could not be listed or a file opened.
    Source(&'static str),
    Config(&'static str),
    NotInitialized,
    InvalidDrive(u8),
    OutOfRange(TranslateError),
    TransferTooLarge { len: usize, max: usize },
    LengthMismatch { expected: usize, found: usize },
    Allocation,
    /// A backing image lock was poisoned by a panicking holder.
    Poisoned,
}

impl DevError {
    pub fn msg(&self) -> &'static str {
        match self {
            DevError::Proto(e) => e.msg(),
            DevError::Image(e) => e.msg(),
            DevError::IO { err, .. } => err.msg(),
            DevError::Source(msg) => msg,
            DevError::Config(msg) => msg,
            DevError::NotInitialized => "Device not initialized",
            DevError::InvalidDrive(_) => "No such drive",
            DevError::OutOfRange(e) => e.msg(),
            DevError::TransferTooLarge { .. } => "Transfer exceeds frame capacity",
            DevError::LengthMismatch { .. } => "Write data length mismatch",
            DevError::Allocation => "Transfer buffer allocation failed",
            DevError::Poisoned => "Image lock poisoned",
        }
    }

    /// Wire status reporting this error.
    pub fn status(&self) -> Status {
        match self {
            DevError::Proto(e) => e.status(),
            DevError::Image(ImageError::Capacity(_)) => Status::CapacityError,
            DevError::Image(_) | DevError::Source(_) | DevError::Config(_) => Status::ImageError,
            DevError::IO { op: IoOp::Seek, .. } => Status::SeekError,
            DevError::IO { op: IoOp::Read, .. } => Status::ReadError,
            DevError::IO { .. } | DevError::Poisoned => Status::WriteError,
            DevError::NotInitialized => Status::NotInitialized,
            DevError::InvalidDrive(_) => Status::InvalidDrive,
            DevError::OutOfRange(TranslateError::Overflow) => Status::SeekError,
            DevError::OutOfRange(_) => Status::OutOfRange,
            DevError::TransferTooLarge { .. } => Status::TransferTooLarge,
            DevError::LengthMismatch { .. } => Status::LengthMismatch,
            DevError::Allocation => Status::AllocationError,
        }
    }
}

impl From<ProtoError> for DevError {
    fn from(e: ProtoError) -> Self {
        DevError::Proto(e)
    }
}

impl From<ImageError> for DevError {
    fn from(e: ImageError) -> Self {
        DevError::Image(e)
    }
}

impl From<TranslateError> for DevError {
    fn from(e: TranslateError) -> Self {
        DevError::OutOfRange(e)
    }
}

impl fmt::Display for DevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevError::Proto(e) => write!(f, "{e}"),
            DevError::Image(e) => write!(f, "{e}"),
            DevError::IO { op, err } => write!(f, "{op:?} failed: {err}"),
            DevError::InvalidDrive(d) => write!(f, "{} ({d})", self.msg()),
            DevError::OutOfRange(e) => write!(f, "{e}"),
            DevError::TransferTooLarge { len, max } => write!(f, "{} ({len} > {max})", self.msg()),
            DevError::LengthMismatch { expected, found } => {
                write!(f, "{} (expected {expected}, found {found})", self.msg())
            }
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for DevError {}

pub type DevResult<T = ()> = Result<T, DevError>;
