// SPDX-License-Identifier: MIT

use crate::errors::TransportError;

/// Half-duplex byte link between host and device.
pub trait Transport {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Fills all of `buf` or fails.
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Drops anything still buffered from an aborted exchange.
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send(data)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).recv_exact(buf)
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_input()
    }
}

#[cfg(feature = "std")]
pub use stream::StreamTransport;

#[cfg(feature = "std")]
mod stream {
    use super::*;
    use crate::frame::{FRAME_OVERHEAD, MAX_DATA_SIZE, MAX_PARAMS_SIZE};
    use std::io::{ErrorKind, Read, Write};

    /// Upper bound on what one `discard_input` drops, a few full frames.
    const MAX_DISCARD: usize = 4 * (FRAME_OVERHEAD + MAX_PARAMS_SIZE + MAX_DATA_SIZE);

    /// Transport over any byte stream: a TCP socket or a serial device node.
    ///
    /// Timeouts are whatever the stream is configured with.
    #[derive(Debug)]
    pub struct StreamTransport<S: Read + Write> {
        stream: S,
        drain: bool,
    }

    impl<S: Read + Write> StreamTransport<S> {
        /// `discard_input` is a no-op on this transport.
        pub fn new(stream: S) -> Self {
            Self {
                stream,
                drain: false,
            }
        }

        /// `discard_input` reads and drops bytes until the stream reports
        /// `WouldBlock` or `TimedOut`. The stream must have a read timeout or
        /// be non-blocking, otherwise a quiet line blocks the drain.
        pub fn with_drain(stream: S) -> Self {
            Self {
                stream,
                drain: true,
            }
        }

        pub fn get_ref(&self) -> &S {
            &self.stream
        }

        pub fn into_inner(self) -> S {
            self.stream
        }
    }

    impl<S: Read + Write> Transport for StreamTransport<S> {
        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            self.stream.write_all(data)?;
            self.stream.flush()?;
            Ok(())
        }

        fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
            self.stream.read_exact(buf)?;
            Ok(())
        }

        fn discard_input(&mut self) -> Result<(), TransportError> {
            if !self.drain {
                return Ok(());
            }
            let mut chunk = [0u8; 256];
            let mut dropped = 0;
            while dropped < MAX_DISCARD {
                match self.stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => dropped += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if dropped > 0 {
                log::debug!("discarded {dropped} stale byte(s)");
            }
            Ok(())
        }
    }

}
