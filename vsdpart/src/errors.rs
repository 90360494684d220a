// SPDX-License-Identifier: MIT

use core::fmt;

use vsdio::errors::*;

/// Unified error type for image geometry parsing (MBR, FAT, disk labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    IO(VsdIOError),
    /// Metadata ended before a structure or list was complete.
    Truncated(CursorError),
    InvalidSignature { expected: [u8; 2], found: [u8; 2] },
    UndefinedPartition,
    ZeroSectors,
    Translate(TranslateError),
    /// A field does not fit the synthetic BPB it feeds.
    Capacity(&'static str),
    Invalid(&'static str),
}

impl ImageError {
    pub fn msg(&self) -> &'static str {
        match self {
            ImageError::IO(e) => e.msg(),
            ImageError::Truncated(_) => "Image metadata truncated",
            ImageError::InvalidSignature { .. } => "Invalid boot signature",
            ImageError::UndefinedPartition => "First partition entry is undefined",
            ImageError::ZeroSectors => "Partition has zero sectors",
            ImageError::Translate(e) => e.msg(),
            ImageError::Capacity(msg) => msg,
            ImageError::Invalid(msg) => msg,
        }
    }
}

impl From<VsdIOError> for ImageError {
    fn from(e: VsdIOError) -> Self {
        ImageError::IO(e)
    }
}

impl From<CursorError> for ImageError {
    fn from(e: CursorError) -> Self {
        ImageError::Truncated(e)
    }
}

impl From<TranslateError> for ImageError {
    fn from(e: TranslateError) -> Self {
        ImageError::Translate(e)
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Truncated(e) => write!(f, "{}: {e}", self.msg()),
            ImageError::InvalidSignature { expected, found } => write!(
                f,
                "{} (expected {:02X?}, found {:02X?})",
                self.msg(),
                expected,
                found
            ),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

pub type ImageResult<T = ()> = Result<T, ImageError>;

/// Failure to map a logical sector onto the backing image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateError {
    /// The request reaches outside the drive window.
    OutOfWindow { sector: u64, count: u64, sectors: u64 },
    /// No working-media region covers this logical sector.
    Unmapped { logical: u64 },
    Overflow,
}

impl TranslateError {
    pub fn msg(&self) -> &'static str {
        match self {
            TranslateError::OutOfWindow { .. } => "Sector range outside drive window",
            TranslateError::Unmapped { .. } => "Logical sector not covered by working media",
            TranslateError::Overflow => "Sector address overflow",
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::OutOfWindow {
                sector,
                count,
                sectors,
            } => write!(f, "{} ({sector}+{count} > {sectors})", self.msg()),
            TranslateError::Unmapped { logical } => write!(f, "{} ({logical})", self.msg()),
            TranslateError::Overflow => write!(f, "{}", self.msg()),
        }
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;

impl core::error::Error for ImageError {}

impl core::error::Error for TranslateError {}
