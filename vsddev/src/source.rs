// SPDX-License-Identifier: MIT

//! Where disk images come from, and which of them are served.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use log::{debug, error};
use vsdio::prelude::*;

use crate::errors::*;

/// Owned handle on one backing image.
pub type ImageHandle = Box<dyn VsdIO + Send>;

/// Layout convention an image name selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// MBR + FAT, `_pc` in the name.
    Standard,
    /// Multi-volume disk label, `_v9k` in the name.
    Victor,
}

impl ImageKind {
    /// Classifies a file name, or `None` if it is not served.
    ///
    /// Served names are at least 8 bytes, not hidden, contain `.img` and
    /// carry a `_pc` or `_v9k` tag (case-insensitive).
    pub fn classify(name: &str) -> Option<ImageKind> {
        if name.len() < 8 || name.starts_with('.') {
            return None;
        }
        let lower = name.to_ascii_lowercase();
        if !lower.contains(".img") {
            return None;
        }
        if lower.contains("_v9k") {
            Some(ImageKind::Victor)
        } else if lower.contains("_pc") {
            Some(ImageKind::Standard)
        } else {
            None
        }
    }
}

/// Filesystem collaborator: lists and opens image files.
pub trait ImageSource {
    /// All candidate names; filtering is up to the caller.
    fn list(&mut self) -> DevResult<Vec<String>>;

    /// Opens `name` for reading and writing.
    fn open(&mut self, name: &str) -> DevResult<ImageHandle>;

    /// Served images with their kind, in name order.
    fn images(&mut self) -> DevResult<Vec<(String, ImageKind)>> {
        let mut names = self.list()?;
        names.sort();
        Ok(names
            .into_iter()
            .filter_map(|n| match ImageKind::classify(&n) {
                Some(kind) => Some((n, kind)),
                None => {
                    debug!("ignoring '{n}'");
                    None
                }
            })
            .collect())
    }
}

/// Images in one host directory.
#[derive(Debug, Clone)]
pub struct DirImageSource {
    dir: PathBuf,
}

impl DirImageSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSource for DirImageSource {
    fn list(&mut self) -> DevResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            error!("cannot open image directory {}: {e}", self.dir.display());
            DevError::Source("Cannot open image directory")
        })?;
        let mut names = Vec::new();
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }

    fn open(&mut self, name: &str) -> DevResult<ImageHandle> {
        let path = self.dir.join(name);
        let file: File = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                error!("cannot open {}: {e}", path.display());
                DevError::Source("Cannot open image file")
            })?;
        Ok(Box::new(StdVsdIO::new(file)))
    }
}

/// In-memory images, keyed by name.
///
/// Each `open` hands out a private copy, so writes are not seen by later opens.
#[derive(Debug, Clone, Default)]
pub struct MemImageSource {
    images: BTreeMap<String, Vec<u8>>,
}

impl MemImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(name.into(), bytes);
    }
}

impl ImageSource for MemImageSource {
    fn list(&mut self) -> DevResult<Vec<String>> {
        Ok(self.images.keys().cloned().collect())
    }

    fn open(&mut self, name: &str) -> DevResult<ImageHandle> {
        let bytes = self
            .images
            .get(name)
            .ok_or(DevError::Source("No such image"))?;
        Ok(Box::new(StdVsdIO::new(Cursor::new(bytes.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn classify_names() {
        assert_eq!(ImageKind::classify("dos3_pc.img"), Some(ImageKind::Standard));
        assert_eq!(ImageKind::classify("DOS3_PC.IMG"), Some(ImageKind::Standard));
        assert_eq!(ImageKind::classify("hd10_v9k.img"), Some(ImageKind::Victor));
        assert_eq!(ImageKind::classify("x_V9K.Img.bak"), Some(ImageKind::Victor));
        // _v9k wins when both tags are present
        assert_eq!(ImageKind::classify("a_pc_v9k.img"), Some(ImageKind::Victor));
    }

    #[test]
    fn rejected_names() {
        assert_eq!(ImageKind::classify("a_pc.im"), None); // too short, no .img
        assert_eq!(ImageKind::classify("_pc.img"), None); // 7 bytes
        assert_eq!(ImageKind::classify(".hid_pc.img"), None);
        assert_eq!(ImageKind::classify("disk_pc.bin"), None);
        assert_eq!(ImageKind::classify("plain_disk.img"), None);
    }

    #[test]
    fn images_sorted_and_filtered() {
        let mut src = MemImageSource::new();
        src.insert("zz_pc.img", vec![]);
        src.insert("notes.txt", vec![]);
        src.insert("aa_v9k.img", vec![]);
        let names: Vec<_> = src.images().unwrap();
        assert_eq!(
            names,
            vec![
                ("aa_v9k.img".to_string(), ImageKind::Victor),
                ("zz_pc.img".to_string(), ImageKind::Standard)
            ]
        );
    }

    #[test]
    fn dir_source_lists_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub_pc.img")).unwrap();
        let mut f = File::create(dir.path().join("disk_pc.img")).unwrap();
        f.write_all(&[1, 2, 3, 4]).unwrap();

        let mut src = DirImageSource::new(dir.path());
        assert_eq!(src.list().unwrap(), vec!["disk_pc.img".to_string()]);

        let mut io = src.open("disk_pc.img").unwrap();
        assert_eq!(io.len().unwrap(), 4);
        let mut buf = [0u8; 2];
        io.read_at(2, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn missing_dir_is_source_error() {
        let mut src = DirImageSource::new("/nonexistent/vsd/images");
        assert!(matches!(src.list(), Err(DevError::Source(_))));
    }
}
