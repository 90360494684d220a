// SPDX-License-Identifier: MIT

use core::fmt;

use crate::command::Status;
use vsdio::errors::CursorError;
use vsdpart::errors::ImageError;

/// Failure at the link itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The peer closed the link.
    Eof,
    /// No bytes arrived within the read timeout.
    Timeout,
    Other(&'static str),
}

impl TransportError {
    pub fn msg(&self) -> &'static str {
        match self {
            TransportError::Eof => "Link closed",
            TransportError::Timeout => "Link timed out",
            TransportError::Other(msg) => msg,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                TransportError::Eof
            }
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            _ => {
                log::debug!("transport: {e}");
                TransportError::Other("Link I/O failure")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoError {
    CommandChecksum { expected: u8, found: u8 },
    DataChecksum { expected: u8, found: u8 },
    InvalidProtocol(u8),
    UnknownCommand(u8),
    UnknownStatus(u8),
    Malformed(&'static str),
    Truncated(CursorError),
    TooLarge { len: usize, max: usize },
    /// A frame buffer could not be reserved.
    Allocation,
    Image(ImageError),
    Transport(TransportError),
    /// The peer answered with an error status.
    Device(Status),
    /// The response does not answer the request that was sent.
    Mismatch(&'static str),
}

impl ProtoError {
    pub fn msg(&self) -> &'static str {
        match self {
            ProtoError::CommandChecksum { .. } => "Command checksum mismatch",
            ProtoError::DataChecksum { .. } => "Data checksum mismatch",
            ProtoError::InvalidProtocol(_) => "Invalid protocol id",
            ProtoError::UnknownCommand(_) => "Unknown command",
            ProtoError::UnknownStatus(_) => "Unknown status",
            ProtoError::Malformed(msg) => msg,
            ProtoError::Truncated(_) => "Frame truncated",
            ProtoError::TooLarge { .. } => "Frame section too large",
            ProtoError::Allocation => "Frame buffer allocation failed",
            ProtoError::Image(e) => e.msg(),
            ProtoError::Transport(e) => e.msg(),
            ProtoError::Device(s) => s.msg(),
            ProtoError::Mismatch(msg) => msg,
        }
    }

    /// Worth sending the same request again.
    pub fn is_transient(&self) -> bool {
        match self {
            ProtoError::CommandChecksum { .. }
            | ProtoError::DataChecksum { .. }
            | ProtoError::Truncated(_)
            | ProtoError::Mismatch(_) => true,
            ProtoError::Transport(TransportError::Timeout) => true,
            ProtoError::Device(s) => s.is_checksum(),
            _ => false,
        }
    }

    /// Wire status reporting this error.
    pub fn status(&self) -> Status {
        match self {
            ProtoError::CommandChecksum { .. } => Status::CommandChecksum,
            ProtoError::DataChecksum { .. } => Status::DataChecksum,
            ProtoError::InvalidProtocol(_) => Status::InvalidProtocol,
            ProtoError::UnknownCommand(_) => Status::InvalidCommand,
            ProtoError::TooLarge { .. } => Status::TransferTooLarge,
            ProtoError::Allocation => Status::AllocationError,
            ProtoError::Image(ImageError::Capacity(_)) => Status::CapacityError,
            ProtoError::Image(_) => Status::ImageError,
            ProtoError::Device(s) => *s,
            _ => Status::InvalidCommand,
        }
    }
}

impl From<CursorError> for ProtoError {
    fn from(e: CursorError) -> Self {
        ProtoError::Truncated(e)
    }
}

impl From<ImageError> for ProtoError {
    fn from(e: ImageError) -> Self {
        ProtoError::Image(e)
    }
}

impl From<TransportError> for ProtoError {
    fn from(e: TransportError) -> Self {
        ProtoError::Transport(e)
    }
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoError::CommandChecksum { expected, found }
            | ProtoError::DataChecksum { expected, found } => {
                write!(f, "{} (expected {expected:#04x}, found {found:#04x})", self.msg())
            }
            ProtoError::InvalidProtocol(v)
            | ProtoError::UnknownCommand(v)
            | ProtoError::UnknownStatus(v) => write!(f, "{} ({v:#04x})", self.msg()),
            ProtoError::TooLarge { len, max } => write!(f, "{} ({len} > {max})", self.msg()),
            ProtoError::Truncated(e) => write!(f, "{}: {e}", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

pub type ProtoResult<T = ()> = Result<T, ProtoError>;

impl core::error::Error for TransportError {}

impl core::error::Error for ProtoError {}
