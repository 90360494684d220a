// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for VsdIO operations.
pub type VsdIOResult<T = ()> = core::result::Result<T, VsdIOError>;

/// Error type for VsdIO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsdIOError {
    Other(&'static str),
    Invalid(&'static str),
    OutOfBounds,
    /// The backend moved fewer bytes than requested.
    ShortTransfer,
    Unsupported,
}

impl VsdIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            VsdIOError::Other(msg) => msg,
            VsdIOError::Invalid(msg) => msg,
            VsdIOError::OutOfBounds => "Out of bounds",
            VsdIOError::ShortTransfer => "Short transfer",
            VsdIOError::Unsupported => "Unsupported operation",
        }
    }
}

impl From<&'static str> for VsdIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        VsdIOError::Other(msg)
    }
}

impl fmt::Display for VsdIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

/// Result type for [`crate::cursor::ByteCursor`] reads.
pub type CursorResult<T> = core::result::Result<T, CursorError>;

/// A bounded read ran past the end of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    Truncated {
        at: usize,
        needed: usize,
        available: usize,
    },
    Layout,
}

impl CursorError {
    pub fn msg(&self) -> &'static str {
        match self {
            CursorError::Truncated { .. } => "Buffer truncated",
            CursorError::Layout => "Record layout mismatch",
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::Truncated {
                at,
                needed,
                available,
            } => write!(
                f,
                "{} (offset {at}: needed {needed} bytes, {available} available)",
                self.msg()
            ),
            CursorError::Layout => write!(f, "{}", self.msg()),
        }
    }
}

impl From<CursorError> for VsdIOError {
    fn from(_: CursorError) -> Self {
        VsdIOError::OutOfBounds
    }
}

impl core::error::Error for VsdIOError {}

impl core::error::Error for CursorError {}
