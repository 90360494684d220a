// SPDX-License-Identifier: MIT

//! Command dispatcher and block I/O executor.

use log::{debug, error, info, warn};
use vsdproto::prelude::*;

use crate::config::DeviceConfig;
use crate::errors::*;
use crate::source::ImageSource;
use crate::table::DriveTable;

/// Device end of the link. Owns its configuration, image source and,
/// after INIT, its drive table.
pub struct Device<S: ImageSource> {
    config: DeviceConfig,
    source: S,
    table: Option<DriveTable>,
}

impl<S: ImageSource> Device<S> {
    pub fn new(config: DeviceConfig, source: S) -> Self {
        Self {
            config,
            source,
            table: None,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Drive table of the last successful INIT.
    pub fn table(&self) -> Option<&DriveTable> {
        self.table.as_ref()
    }

    /// Answers one request. The response is always a sealed frame; failures
    /// become error frames echoing the request header.
    pub fn handle(&mut self, request: &Frame) -> Frame {
        match self.dispatch(request) {
            Ok(resp) => resp,
            Err(e) => {
                let status = e.status();
                error!("command {:#04x}: {e} ({status:?})", request.command);
                Frame::error(request, status)
            }
        }
    }

    fn dispatch(&mut self, request: &Frame) -> DevResult<Frame> {
        request.validate_command()?;
        if request.protocol != SD_BLOCK_DEVICE {
            return Err(ProtoError::InvalidProtocol(request.protocol).into());
        }
        let command = request.command()?;
        request.validate_data()?;
        debug!(
            "{command}: {} param byte(s), {} data byte(s)",
            request.params.len(),
            request.data.len()
        );

        match command {
            Command::Init => self.init(request),
            Command::MediaCheck | Command::BuildBpb | Command::DriveInfo => {
                Ok(Frame::response(request, Status::Ok, Vec::new())?)
            }
            Command::Read => self.read(request),
            Command::Write => self.write(request),
        }
    }

    /// Rebuilds the drive table and reports its catalog.
    fn init(&mut self, request: &Frame) -> DevResult<Frame> {
        if let Some(mut old) = self.table.take() {
            if let Err(e) = old.close() {
                warn!("closing previous drive table: {e}");
            }
        }
        let table = DriveTable::build(&self.config, &mut self.source)?;
        let catalog = table.catalog();
        info!("INIT: {} unit(s)", catalog.num_units());
        self.table = Some(table);
        Ok(Frame::response(request, Status::Ok, catalog.to_bytes()?)?)
    }

    fn read(&mut self, request: &Frame) -> DevResult<Frame> {
        let p = IoParams::decode(&request.params)?;
        let table = self.table.as_ref().ok_or(DevError::NotInitialized)?;
        let data = table.get(p.drive)?.read(p.start_sector, p.sector_count)?;
        debug!(
            "READ unit {} sectors {}+{}",
            p.drive, p.start_sector, p.sector_count
        );
        Ok(Frame::response(request, Status::Ok, data)?)
    }

    fn write(&mut self, request: &Frame) -> DevResult<Frame> {
        let p = IoParams::decode(&request.params)?;
        let table = self.table.as_ref().ok_or(DevError::NotInitialized)?;
        table
            .get(p.drive)?
            .write(p.start_sector, p.sector_count, &request.data)?;
        debug!(
            "WRITE unit {} sectors {}+{}",
            p.drive, p.start_sector, p.sector_count
        );
        Ok(Frame::response(request, Status::Ok, vec![0])?)
    }

    /// Serves requests until the peer closes the link.
    ///
    /// Idle timeouts are ignored. A frame with an oversized data section is
    /// consumed whole and answered with an error; a frame too damaged to
    /// answer is dropped and the link resynchronized.
    pub fn serve<T: Transport + ?Sized>(&mut self, link: &mut T) -> DevResult<()> {
        loop {
            let request = match receive_frame(link) {
                Ok(Received::Frame(f)) => f,
                Ok(Received::Oversized { header, len }) => {
                    let status = match header.validate_command() {
                        Ok(()) => Status::TransferTooLarge,
                        Err(e) => e.status(),
                    };
                    error!(
                        "command {:#04x}: {len} data bytes exceed {MAX_DATA_SIZE} ({status:?})",
                        header.command
                    );
                    write_frame(link, &Frame::error(&header, status))?;
                    continue;
                }
                Err(ProtoError::Transport(TransportError::Eof)) => {
                    info!("link closed");
                    return Ok(());
                }
                Err(ProtoError::Transport(TransportError::Timeout)) => continue,
                Err(ProtoError::Transport(e)) => return Err(ProtoError::Transport(e).into()),
                Err(e) => {
                    warn!("dropping unreadable frame: {e}");
                    link.discard_input().map_err(ProtoError::from)?;
                    continue;
                }
            };
            let response = self.handle(&request);
            write_frame(link, &response)?;
        }
    }

    /// Flushes and releases the drive table.
    pub fn shutdown(&mut self) -> DevResult<()> {
        match self.table.take() {
            Some(mut t) => t.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemImageSource;
    use vsdpart::boot::FatBootSector;
    use vsdpart::io_ext::VsdIOLbaExt;
    use vsdpart::mbr::{Mbr, MbrEntry, write_mbr};
    use std::io::{Read, Write};
    use vsdio::prelude::*;
    use vsdpart::SyntheticBpb;

    fn device() -> Device<MemImageSource> {
        let mut buf = vec![0u8; 33 * 512];
        {
            let mut io = MemVsdIO::new(&mut buf);
            let mut entries = [MbrEntry::new_empty(); 4];
            entries[0] = MbrEntry::new(0x80, 0x01, 1, 32);
            write_mbr(&mut io, &Mbr::new_from_entries(entries)).unwrap();
            let bpb = SyntheticBpb {
                bytes_per_sector: 512,
                total_sectors: 32,
                ..SyntheticBpb::default()
            };
            io.write_struct_lba(1, 512, &FatBootSector::from_synthetic(&bpb))
                .unwrap();
        }
        let mut src = MemImageSource::new();
        src.insert("unit_pc.img", buf);
        Device::new(DeviceConfig::default(), src)
    }

    fn io_req(cmd: Command, drive: u8, start: u32, count: u16, data: Vec<u8>) -> Frame {
        let p = IoParams {
            drive,
            start_sector: start,
            sector_count: count,
        };
        Frame::request(cmd, p.to_bytes().to_vec(), data).unwrap()
    }

    fn init(dev: &mut Device<MemImageSource>) -> InitPayload {
        let req = Frame::request(Command::Init, vec![], vec![]).unwrap();
        let resp = dev.handle(&req);
        assert_eq!(resp.status().unwrap(), Status::Ok);
        InitPayload::decode(&resp.data).unwrap()
    }

    #[test]
    fn io_before_init_is_rejected() {
        let mut dev = device();
        let resp = dev.handle(&io_req(Command::Read, 0, 0, 1, vec![]));
        assert_eq!(resp.status().unwrap(), Status::NotInitialized);
        assert!(resp.validate().is_ok());
        assert!(resp.data.is_empty());
    }

    #[test]
    fn init_reports_catalog() {
        let mut dev = device();
        let cat = init(&mut dev);
        assert_eq!(cat.num_units(), 1);
        assert_eq!(cat.units[0].total_sectors, 32);
    }

    #[test]
    fn acknowledged_commands() {
        let mut dev = device();
        for cmd in [Command::MediaCheck, Command::BuildBpb, Command::DriveInfo] {
            let resp = dev.handle(&Frame::request(cmd, vec![], vec![]).unwrap());
            assert_eq!(resp.status().unwrap(), Status::Ok);
            assert_eq!(resp.command, cmd.code());
        }
    }

    #[test]
    fn write_acknowledges_with_zero_byte() {
        let mut dev = device();
        init(&mut dev);
        let resp = dev.handle(&io_req(Command::Write, 0, 5, 1, vec![0xC3; 512]));
        assert_eq!(resp.status().unwrap(), Status::Ok);
        assert_eq!(resp.data, vec![0]);
        assert!(resp.params.is_empty());

        let resp = dev.handle(&io_req(Command::Read, 0, 5, 1, vec![]));
        assert_eq!(resp.data, vec![0xC3; 512]);
    }

    #[test]
    fn error_frames() {
        let mut dev = device();
        init(&mut dev);
        let cases = [
            (io_req(Command::Read, 3, 0, 1, vec![]), Status::InvalidDrive),
            (io_req(Command::Read, 0, 31, 2, vec![]), Status::OutOfRange),
            (io_req(Command::Read, 0, 0, 3, vec![]), Status::TransferTooLarge),
            (io_req(Command::Write, 0, 0, 1, vec![1; 10]), Status::LengthMismatch),
        ];
        for (req, status) in cases {
            let resp = dev.handle(&req);
            assert_eq!(resp.status().unwrap(), status);
            assert_eq!(resp.command, req.command);
            assert!(resp.params.is_empty() && resp.data.is_empty());
            assert!(resp.validate().is_ok());
        }
    }

    #[test]
    fn checksum_and_protocol_errors() {
        let mut dev = device();
        init(&mut dev);

        let mut req = io_req(Command::Write, 0, 0, 1, vec![0; 512]);
        req.data[7] ^= 0x10;
        assert_eq!(dev.handle(&req).status().unwrap(), Status::DataChecksum);

        let mut req = io_req(Command::Read, 0, 0, 1, vec![]);
        req.params[0] ^= 0x01;
        assert_eq!(dev.handle(&req).status().unwrap(), Status::CommandChecksum);

        let mut req = Frame::request(Command::Init, vec![], vec![]).unwrap();
        req.command = 9;
        req.seal();
        assert_eq!(dev.handle(&req).status().unwrap(), Status::InvalidCommand);

        let mut req = Frame::request(Command::Init, vec![], vec![]).unwrap();
        req.protocol = 0x42;
        req.seal();
        let resp = dev.handle(&req);
        assert_eq!(resp.status().unwrap(), Status::InvalidProtocol);
        assert_eq!(resp.protocol, 0x42);
    }

    #[test]
    fn reinit_rebuilds_table() {
        let mut dev = device();
        init(&mut dev);
        init(&mut dev);
        assert_eq!(dev.table().unwrap().len(), 1);
        dev.shutdown().unwrap();
        assert!(dev.table().is_none());
    }

    #[test]
    fn serve_until_eof() {
        let mut dev = device();
        let mut wire = Vec::new();
        for f in [
            Frame::request(Command::Init, vec![], vec![]).unwrap(),
            io_req(Command::Read, 0, 0, 1, vec![]),
        ] {
            wire.extend(f.to_bytes().unwrap());
        }
        let mut link = StreamTransport::new(Duplex {
            input: std::io::Cursor::new(wire),
            output: Vec::new(),
        });
        dev.serve(&mut link).unwrap();

        let out = link.into_inner().output;
        let mut cur = vsdio::cursor::ByteCursor::new(&out);
        let init = Frame::decode(&mut cur).unwrap();
        assert_eq!(init.status().unwrap(), Status::Ok);
        let read = Frame::decode(&mut cur).unwrap();
        assert_eq!(read.data.len(), 512);
        assert!(cur.is_empty());
    }

    #[test]
    fn oversized_write_is_answered_and_stream_stays_in_sync() {
        let mut dev = device();
        let mut wire = io_req(Command::Write, 0, 0, 1, vec![]).to_bytes().unwrap();
        wire.truncate(wire.len() - 3);
        wire.extend_from_slice(&1600u16.to_le_bytes());
        wire.extend(std::iter::repeat_n(0x11, 1600));
        wire.push(0);
        wire.extend(
            Frame::request(Command::Init, vec![], vec![])
                .unwrap()
                .to_bytes()
                .unwrap(),
        );

        let mut link = StreamTransport::new(Duplex {
            input: std::io::Cursor::new(wire),
            output: Vec::new(),
        });
        dev.serve(&mut link).unwrap();

        let out = link.into_inner().output;
        let mut cur = vsdio::cursor::ByteCursor::new(&out);
        let write = Frame::decode(&mut cur).unwrap();
        assert_eq!(write.command, Command::Write.code());
        assert_eq!(write.status().unwrap(), Status::TransferTooLarge);
        assert!(write.validate().is_ok());
        let init = Frame::decode(&mut cur).unwrap();
        assert_eq!(init.command, Command::Init.code());
        assert_eq!(init.status().unwrap(), Status::Ok);
        assert_eq!(InitPayload::decode(&init.data).unwrap().num_units(), 1);
        assert!(cur.is_empty());
    }

    struct Duplex {
        input: std::io::Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
