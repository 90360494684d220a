// SPDX-License-Identifier: MIT

//! Wire frame with separate checksums over the command and data sections.
//!
//! ```text
//! protocol:1 command:1 status:1 params_size:1 params command_crc:1
//! data_size:2 data data_crc:1
//! ```
//! `command_crc` covers protocol, command, status and params (not the
//! size byte); `data_crc` covers data only.

use alloc::vec::Vec;

use crate::command::*;
use crate::crc8::{Crc8, crc8};
use crate::errors::*;
use crate::transport::Transport;
use vsdio::cursor::ByteCursor;

pub const MAX_PARAMS_SIZE: usize = u8::MAX as usize;
pub const MAX_DATA_SIZE: usize = 1520;
/// Fixed bytes around params and data.
pub const FRAME_OVERHEAD: usize = 4 + 1 + 2 + 1;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub protocol: u8,
    /// Raw command code, kept as received so errors can echo it.
    pub command: u8,
    pub status: u8,
    pub params: Vec<u8>,
    pub command_crc: u8,
    pub data: Vec<u8>,
    pub data_crc: u8,
}

fn check_len(len: usize, max: usize) -> ProtoResult<()> {
    if len > max {
        return Err(ProtoError::TooLarge { len, max });
    }
    Ok(())
}

impl Frame {
    /// Sealed request frame.
    pub fn request(command: Command, params: Vec<u8>, data: Vec<u8>) -> ProtoResult<Self> {
        Self::new(SD_BLOCK_DEVICE, command.code(), Status::Ok, params, data)
    }

    /// Sealed response with empty params.
    pub fn response(request: &Frame, status: Status, data: Vec<u8>) -> ProtoResult<Self> {
        Self::new(request.protocol, request.command, status, Vec::new(), data)
    }

    /// Error answer to `request`: header echoed, no params, no data.
    pub fn error(request: &Frame, status: Status) -> Self {
        let mut f = Frame {
            protocol: request.protocol,
            command: request.command,
            status: status.code(),
            ..Frame::default()
        };
        f.seal();
        f
    }

    pub fn new(
        protocol: u8,
        command: u8,
        status: Status,
        params: Vec<u8>,
        data: Vec<u8>,
    ) -> ProtoResult<Self> {
        check_len(params.len(), MAX_PARAMS_SIZE)?;
        check_len(data.len(), MAX_DATA_SIZE)?;
        let mut f = Frame {
            protocol,
            command,
            status: status.code(),
            params,
            command_crc: 0,
            data,
            data_crc: 0,
        };
        f.seal();
        Ok(f)
    }

    pub fn compute_command_crc(&self) -> u8 {
        let mut h = Crc8::new();
        h.update(&[self.protocol, self.command, self.status]);
        h.update(&self.params);
        h.finalize()
    }

    #[inline]
    pub fn compute_data_crc(&self) -> u8 {
        crc8(&self.data)
    }

    #[inline]
    pub fn encode_command(&mut self) {
        self.command_crc = self.compute_command_crc();
    }

    #[inline]
    pub fn encode_data(&mut self) {
        self.data_crc = self.compute_data_crc();
    }

    #[inline]
    pub fn seal(&mut self) {
        self.encode_command();
        self.encode_data();
    }

    pub fn validate_command(&self) -> ProtoResult<()> {
        let expected = self.compute_command_crc();
        if expected != self.command_crc {
            return Err(ProtoError::CommandChecksum {
                expected,
                found: self.command_crc,
            });
        }
        Ok(())
    }

    pub fn validate_data(&self) -> ProtoResult<()> {
        let expected = self.compute_data_crc();
        if expected != self.data_crc {
            return Err(ProtoError::DataChecksum {
                expected,
                found: self.data_crc,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> ProtoResult<()> {
        self.validate_command()?;
        self.validate_data()
    }

    pub fn command(&self) -> ProtoResult<Command> {
        Command::try_from(self.command)
    }

    pub fn status(&self) -> ProtoResult<Status> {
        Status::try_from(self.status)
    }

    #[inline]
    pub fn wire_len(&self) -> usize {
        FRAME_OVERHEAD + self.params.len() + self.data.len()
    }

    pub fn to_bytes(&self) -> ProtoResult<Vec<u8>> {
        check_len(self.params.len(), MAX_PARAMS_SIZE)?;
        check_len(self.data.len(), MAX_DATA_SIZE)?;
        let mut out = Vec::new();
        out.try_reserve_exact(self.wire_len())
            .map_err(|_| ProtoError::Allocation)?;
        out.extend_from_slice(&[
            self.protocol,
            self.command,
            self.status,
            self.params.len() as u8,
        ]);
        out.extend_from_slice(&self.params);
        out.push(self.command_crc);
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
        out.push(self.data_crc);
        Ok(out)
    }

    /// Parses one frame. Checksums are read but not validated.
    pub fn decode(cur: &mut ByteCursor<'_>) -> ProtoResult<Self> {
        let [protocol, command, status, params_size] = cur.read_array::<4>()?;
        let params = cur.read_bytes(params_size as usize)?.to_vec();
        let command_crc = cur.read_u8()?;
        let data_size = cur.read_u16_le()? as usize;
        check_len(data_size, MAX_DATA_SIZE)?;
        let data = cur.read_bytes(data_size)?.to_vec();
        let data_crc = cur.read_u8()?;
        Ok(Frame {
            protocol,
            command,
            status,
            params,
            command_crc,
            data,
            data_crc,
        })
    }
}

pub fn write_frame<T: Transport + ?Sized>(link: &mut T, frame: &Frame) -> ProtoResult<()> {
    link.send(&frame.to_bytes()?)?;
    Ok(())
}

/// A frame as taken off the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Frame(Frame),
    /// The data section exceeded [`MAX_DATA_SIZE`]. Its bytes were read and
    /// dropped; `header` keeps the command section so it can be answered.
    Oversized { header: Frame, len: usize },
}

/// Reads and drops `len` bytes.
fn skip<T: Transport + ?Sized>(link: &mut T, mut len: usize) -> ProtoResult<()> {
    let mut chunk = [0u8; 256];
    while len > 0 {
        let n = len.min(chunk.len());
        link.recv_exact(&mut chunk[..n])?;
        len -= n;
    }
    Ok(())
}

/// Reads one frame off the link, consuming it whole even when its data
/// section is oversized. Checksums are left to the caller.
pub fn receive_frame<T: Transport + ?Sized>(link: &mut T) -> ProtoResult<Received> {
    let mut head = [0u8; 4];
    link.recv_exact(&mut head)?;
    let [protocol, command, status, params_size] = head;

    let mut params = alloc::vec![0u8; params_size as usize];
    link.recv_exact(&mut params)?;
    let mut crc = [0u8; 1];
    link.recv_exact(&mut crc)?;

    let mut size = [0u8; 2];
    link.recv_exact(&mut size)?;
    let data_size = u16::from_le_bytes(size) as usize;

    let mut frame = Frame {
        protocol,
        command,
        status,
        params,
        command_crc: crc[0],
        ..Frame::default()
    };
    if data_size > MAX_DATA_SIZE {
        // data plus its checksum
        skip(link, data_size + 1)?;
        return Ok(Received::Oversized {
            header: frame,
            len: data_size,
        });
    }

    let mut data = Vec::new();
    data.try_reserve_exact(data_size)
        .map_err(|_| ProtoError::Allocation)?;
    data.resize(data_size, 0);
    link.recv_exact(&mut data)?;
    let mut data_crc = [0u8; 1];
    link.recv_exact(&mut data_crc)?;

    frame.data = data;
    frame.data_crc = data_crc[0];
    Ok(Received::Frame(frame))
}

/// Like [`receive_frame`], with an oversized data section as an error.
pub fn read_frame<T: Transport + ?Sized>(link: &mut T) -> ProtoResult<Frame> {
    match receive_frame(link)? {
        Received::Frame(f) => Ok(f),
        Received::Oversized { len, .. } => Err(ProtoError::TooLarge {
            len,
            max: MAX_DATA_SIZE,
        }),
    }
}
