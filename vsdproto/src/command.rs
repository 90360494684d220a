// SPDX-License-Identifier: MIT

use core::fmt;

use crate::errors::*;

/// Protocol id of the SD block device service.
pub const SD_BLOCK_DEVICE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Init = 0,
    MediaCheck = 1,
    BuildBpb = 2,
    DriveInfo = 3,
    Read = 4,
    Write = 5,
}

impl Command {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Init => "INIT",
            Command::MediaCheck => "MEDIA_CHECK",
            Command::BuildBpb => "BUILD_BPB",
            Command::DriveInfo => "DRIVE_INFO",
            Command::Read => "READ",
            Command::Write => "WRITE",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtoError;

    fn try_from(code: u8) -> ProtoResult<Self> {
        Ok(match code {
            0 => Command::Init,
            1 => Command::MediaCheck,
            2 => Command::BuildBpb,
            3 => Command::DriveInfo,
            4 => Command::Read,
            5 => Command::Write,
            other => return Err(ProtoError::UnknownCommand(other)),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response status carried in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    CommandChecksum = 1,
    DataChecksum = 2,
    InvalidCommand = 3,
    InvalidProtocol = 4,
    InvalidDrive = 5,
    OutOfRange = 6,
    TransferTooLarge = 7,
    NotInitialized = 8,
    LengthMismatch = 9,
    SeekError = 10,
    ReadError = 11,
    WriteError = 12,
    AllocationError = 13,
    ImageError = 14,
    CapacityError = 15,
}

impl Status {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Statuses that say the request was damaged in transit.
    #[inline]
    pub fn is_checksum(self) -> bool {
        matches!(self, Status::CommandChecksum | Status::DataChecksum)
    }

    pub fn msg(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::CommandChecksum => "Command checksum mismatch",
            Status::DataChecksum => "Data checksum mismatch",
            Status::InvalidCommand => "Invalid command",
            Status::InvalidProtocol => "Invalid protocol",
            Status::InvalidDrive => "Invalid drive",
            Status::OutOfRange => "Sector range out of drive window",
            Status::TransferTooLarge => "Transfer too large",
            Status::NotInitialized => "Device not initialized",
            Status::LengthMismatch => "Data length mismatch",
            Status::SeekError => "Seek error",
            Status::ReadError => "Read error",
            Status::WriteError => "Write error",
            Status::AllocationError => "Allocation error",
            Status::ImageError => "Image error",
            Status::CapacityError => "Capacity error",
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = ProtoError;

    fn try_from(code: u8) -> ProtoResult<Self> {
        Ok(match code {
            0 => Status::Ok,
            1 => Status::CommandChecksum,
            2 => Status::DataChecksum,
            3 => Status::InvalidCommand,
            4 => Status::InvalidProtocol,
            5 => Status::InvalidDrive,
            6 => Status::OutOfRange,
            7 => Status::TransferTooLarge,
            8 => Status::NotInitialized,
            9 => Status::LengthMismatch,
            10 => Status::SeekError,
            11 => Status::ReadError,
            12 => Status::WriteError,
            13 => Status::AllocationError,
            14 => Status::ImageError,
            15 => Status::CapacityError,
            other => return Err(ProtoError::UnknownStatus(other)),
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg())
    }
}
