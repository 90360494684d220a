// SPDX-License-Identifier: MIT

//! Opening the byte stream under a frame link: TCP or a serial device node.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use log::{info, warn};
use vsddev::prelude::*;
use vsdproto::prelude::*;

use crate::config::LinkConfig;

pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

pub type BoxedLink = StreamTransport<Box<dyn Stream>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Serial(PathBuf),
}

impl Endpoint {
    /// Device side: serial when configured, otherwise a TCP listener.
    pub fn for_device(link: &LinkConfig) -> anyhow::Result<Self> {
        match (&link.serial, &link.listen) {
            (Some(path), _) => Ok(Endpoint::Serial(path.clone())),
            (None, Some(addr)) => Ok(Endpoint::Tcp(addr.clone())),
            (None, None) => bail!("No link configured: set --listen or --serial"),
        }
    }

    /// Host side: serial when configured, otherwise a TCP connection.
    pub fn for_host(link: &LinkConfig) -> anyhow::Result<Self> {
        match (&link.serial, &link.connect) {
            (Some(path), _) => Ok(Endpoint::Serial(path.clone())),
            (None, Some(addr)) => Ok(Endpoint::Tcp(addr.clone())),
            (None, None) => bail!("No link configured: set --connect or --serial"),
        }
    }
}

fn open_serial(path: &Path) -> anyhow::Result<BoxedLink> {
    let node = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("opening serial device {}", path.display()))?;
    Ok(StreamTransport::new(Box::new(node)))
}

/// Host end of the link, ready for requests.
pub fn connect(link: &LinkConfig) -> anyhow::Result<HostLink<BoxedLink>> {
    let transport = match Endpoint::for_host(link)? {
        Endpoint::Serial(path) => {
            warn!("serial device nodes have no read timeout; late replies are not dropped");
            open_serial(&path)?
        }
        Endpoint::Tcp(addr) => {
            let stream =
                TcpStream::connect(&addr).with_context(|| format!("connecting to {addr}"))?;
            stream.set_read_timeout(link.timeout())?;
            stream.set_nodelay(true)?;
            info!("connected to {addr}");
            let stream: Box<dyn Stream> = Box::new(stream);
            // Draining waits for a read timeout, so only with one set.
            match link.timeout() {
                Some(_) => StreamTransport::with_drain(stream),
                None => StreamTransport::new(stream),
            }
        }
    };
    Ok(HostLink::new(transport, link.retry_policy()))
}

/// Runs the device until the link goes away.
///
/// On TCP, peers are served one after the other and the device keeps its
/// drive table between connections.
pub fn serve<S: ImageSource>(device: &mut Device<S>, link: &LinkConfig) -> anyhow::Result<()> {
    match Endpoint::for_device(link)? {
        Endpoint::Serial(path) => {
            let mut transport = open_serial(&path)?;
            info!("serving on {}", path.display());
            device.serve(&mut transport)?;
        }
        Endpoint::Tcp(addr) => {
            let listener =
                TcpListener::bind(&addr).with_context(|| format!("binding {addr}"))?;
            info!("listening on {}", listener.local_addr()?);
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let peer = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "?".into());
                stream.set_nodelay(true)?;
                info!("host {peer} connected");
                let mut transport = StreamTransport::new(stream);
                if let Err(e) = device.serve(&mut transport) {
                    warn!("host {peer}: {e}");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_selection() {
        let mut link = LinkConfig {
            listen: Some("0.0.0.0:7070".into()),
            connect: Some("10.0.0.2:7070".into()),
            ..LinkConfig::default()
        };
        assert_eq!(
            Endpoint::for_device(&link).unwrap(),
            Endpoint::Tcp("0.0.0.0:7070".into())
        );
        assert_eq!(
            Endpoint::for_host(&link).unwrap(),
            Endpoint::Tcp("10.0.0.2:7070".into())
        );

        link.serial = Some(PathBuf::from("/dev/ttyS0"));
        assert_eq!(
            Endpoint::for_host(&link).unwrap(),
            Endpoint::Serial(PathBuf::from("/dev/ttyS0"))
        );
        assert!(Endpoint::for_device(&LinkConfig::default()).is_err());
    }

    #[test]
    fn tcp_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let image_dir = dir.path().to_path_buf();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut device = Device::new(DeviceConfig::default(), DirImageSource::new(image_dir));
            device.serve(&mut StreamTransport::new(stream)).unwrap();
        });

        let link = LinkConfig {
            connect: Some(addr),
            ..LinkConfig::default()
        };
        let mut host = connect(&link).unwrap();
        // empty directory: INIT succeeds with no units
        assert_eq!(host.init().unwrap().num_units(), 0);
        assert_eq!(
            host.read(IoParams {
                drive: 0,
                start_sector: 0,
                sector_count: 1
            }),
            Err(ProtoError::Device(Status::InvalidDrive))
        );
        drop(host);
        server.join().unwrap();
    }
}
