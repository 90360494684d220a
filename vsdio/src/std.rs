// SPDX-License-Identifier: MIT

use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{VsdIO, VsdIOError, VsdIOResult};

/// `VsdIO` over any seekable stream: a host `File`, a `Cursor<Vec<u8>>`,
/// or a `&mut` borrow of either.
///
/// Every transfer is a seek followed by an exact read or write, so callers
/// sharing one handle must serialize whole calls.
#[derive(Debug)]
pub struct StdVsdIO<T: Read + Write + Seek> {
    io: T,
}

impl<T: Read + Write + Seek> StdVsdIO<T> {
    #[inline]
    pub fn new(io: T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + Write + Seek> VsdIO for StdVsdIO<T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VsdIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VsdIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> VsdIOResult {
        self.io.flush()?;
        Ok(())
    }

    fn len(&mut self) -> VsdIOResult<u64> {
        let end = self.io.seek(SeekFrom::End(0))?;
        Ok(end)
    }
}

impl From<Error> for VsdIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::WriteZero => VsdIOError::ShortTransfer,
            ErrorKind::Unsupported => VsdIOError::Unsupported,
            ErrorKind::PermissionDenied => VsdIOError::Other("Permission denied"),
            _ => {
                log::debug!("backing image: {e}");
                VsdIOError::Other("Backing image I/O failure")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;
    use std::io::Cursor;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let file = tempfile().unwrap();
        let mut io = StdVsdIO::new(file);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
        assert_eq!(io.len().unwrap(), 14);
    }

    #[test]
    fn test_short_read_is_error() {
        let mut io = StdVsdIO::new(Cursor::new(vec![0u8; 600]));

        let mut sector = [0u8; 512];
        io.read_at(0, &mut sector).unwrap();
        assert_eq!(io.read_at(512, &mut sector), Err(VsdIOError::ShortTransfer));
    }

    #[test]
    fn test_borrowed_file() {
        let mut file = tempfile().unwrap();
        {
            let mut io = StdVsdIO::new(&mut file);
            io.write_at(510, &[0x55, 0xAA]).unwrap();
        }
        let mut io = StdVsdIO::new(&mut file);
        let mut sig = [0u8; 2];
        io.read_at(510, &mut sig).unwrap();
        assert_eq!(sig, [0x55, 0xAA]);
        assert_eq!(io.len().unwrap(), 512);
    }

    #[test]
    fn test_os_errors_map_to_static_messages() {
        let denied = Error::new(ErrorKind::PermissionDenied, "image.img");
        assert_eq!(VsdIOError::from(denied), VsdIOError::Other("Permission denied"));
        for _ in 0..3 {
            let e = Error::other("device gone");
            assert_eq!(
                VsdIOError::from(e),
                VsdIOError::Other("Backing image I/O failure")
            );
        }
        let eof = Error::from(ErrorKind::UnexpectedEof);
        assert_eq!(VsdIOError::from(eof), VsdIOError::ShortTransfer);
    }
}
