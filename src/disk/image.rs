use std::fs::File;
use std::io;
use std::path::Path;

use memmap::{Mmap, MmapOptions};

/// Provide backing storage (file or memory) for disk images.  Images are
/// never written, so only read-only mappings are offered.
pub enum Image {
    ReadOnlyMap(Mmap),
    Memory(Box<[u8]>),
}

impl Image {
    pub fn from_bytes(bytes: Vec<u8>) -> Image {
        Image::Memory(bytes.into_boxed_slice())
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> io::Result<Image> {
        let file = File::open(path)?;
        // Zero-length files cannot be mapped on every platform.
        if file.metadata()?.len() == 0 {
            return Ok(Image::Memory(Box::new([])));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Image::ReadOnlyMap(mmap))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Image::ReadOnlyMap(mmap) => &mmap[..],
            Image::Memory(array) => &array[..],
        }
    }

    /// Return up to `length` bytes starting at `offset`.  A request that runs
    /// past the end of the image is truncated to whatever bytes exist, which
    /// may be none at all.
    pub fn slice(&self, offset: usize, length: usize) -> &[u8] {
        let bytes = self.as_bytes();
        let start = offset.min(bytes.len());
        let end = offset.saturating_add(length).min(bytes.len());
        &bytes[start..end]
    }
}
