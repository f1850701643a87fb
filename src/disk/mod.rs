//! Structs and functions relating to DOS 3.3 disk images.

mod block;
mod error;
mod image;

pub mod catalog;
pub mod tslist;
pub mod vtoc;

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

pub use self::block::{BlockDevice, ImageBlockDevice, Location, Position, BLOCK_SIZE};
pub use self::catalog::{CatalogEntry, CatalogIterator, FileType};
pub use self::error::DiskError;
pub use self::image::Image;
pub use self::tslist::{FileReader, TrackSectorList, TrackSectorListIterator};
pub use self::vtoc::VolumeDescriptor;

use crate::util;

pub const SECTORS_PER_TRACK: u8 = 16;
pub const TRACK_SIZE: usize = SECTORS_PER_TRACK as usize * BLOCK_SIZE;
/// 35 tracks of 16 sectors of 256 bytes.
pub const DOS33_IMAGE_SIZE: usize = 35 * TRACK_SIZE;

/// A `Geometry` specifies the track and sector layout of a disk image.  DOS
/// 3.3 images have a uniform number of sectors on every track, stored in
/// ascending track and sector order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub tracks: u8,
    pub sectors_per_track: u8,
}

static GEOMETRY_35: Geometry = Geometry {
    tracks: 35,
    sectors_per_track: SECTORS_PER_TRACK,
};

static GEOMETRY_40: Geometry = Geometry {
    tracks: 40,
    sectors_per_track: SECTORS_PER_TRACK,
};

static ALLOWED_GEOMETRIES: [&Geometry; 2] = [&GEOMETRY_35, &GEOMETRY_40];

impl Geometry {
    /// The standard 35-track, 16-sector layout.
    #[inline]
    pub fn standard() -> &'static Geometry {
        &GEOMETRY_35
    }

    /// Given a disk image file size, return the first matching geometry.
    pub fn find_by_size(size: usize) -> Option<&'static Geometry> {
        ALLOWED_GEOMETRIES
            .iter()
            .find(|geometry| geometry.size() == size)
            .copied()
    }

    /// Return the total number of bytes used to represent a disk image in this
    /// geometry.
    #[inline]
    pub fn size(&self) -> usize {
        self.tracks as usize * self.sectors_per_track as usize * BLOCK_SIZE
    }

    #[inline]
    pub fn contains(&self, location: Location) -> bool {
        location.0 < self.tracks && location.1 < self.sectors_per_track
    }

    /// The byte offset of a sector.  The caller must check `contains()`.
    #[inline]
    pub fn byte_offset(&self, location: Location) -> usize {
        (location.0 as usize * self.sectors_per_track as usize + location.1 as usize) * BLOCK_SIZE
    }
}

/// An opened DOS 3.3 disk image.
pub struct Disk {
    blocks: ImageBlockDevice,
    size_mismatch: bool,
}

impl Disk {
    fn new(image: Image) -> Disk {
        let size = image.len();
        let (geometry, size_mismatch) = match Geometry::find_by_size(size) {
            Some(geometry) => (geometry, false),
            None => {
                tracing::warn!(
                    "disk image is {} bytes, expected {}; reading it as a {}-track image",
                    size,
                    DOS33_IMAGE_SIZE,
                    GEOMETRY_35.tracks
                );
                (Geometry::standard(), true)
            }
        };
        Disk {
            blocks: ImageBlockDevice::new(image, geometry),
            size_mismatch,
        }
    }

    /// Open an existing disk image read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Disk> {
        Ok(Self::new(Image::open_read_only(path)?))
    }

    /// Use a disk image that is already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Disk {
        Self::new(Image::from_bytes(bytes))
    }

    pub fn blocks(&self) -> &dyn BlockDevice {
        &self.blocks
    }

    pub fn geometry(&self) -> &Geometry {
        self.blocks.geometry()
    }

    /// Return the size of the underlying image in bytes.
    pub fn image_len(&self) -> usize {
        self.blocks.image().len()
    }

    /// Report whether the image size matched a known geometry.  A mismatch is
    /// only a warning; everything else still works against whatever bytes
    /// the image has.
    pub fn check_size(&self) -> Result<(), DiskError> {
        if self.size_mismatch {
            Err(DiskError::SizeMismatch)
        } else {
            Ok(())
        }
    }

    /// Read the volume table of contents.
    pub fn volume(&self) -> io::Result<VolumeDescriptor> {
        VolumeDescriptor::read(&self.blocks)
    }

    /// Read a specific sector from the disk, given its track and sector
    /// location.
    pub fn read_sector(&self, location: Location) -> io::Result<&[u8]> {
        self.blocks.sector(location)
    }

    /// Return an iterator of catalog entries found on this disk image.
    pub fn iter(&self) -> CatalogIterator<'_> {
        CatalogIterator::new(&self.blocks)
    }

    /// Return a list of all catalog entries.
    pub fn catalog(&self) -> io::Result<Vec<CatalogEntry>> {
        catalog::read_catalog(&self.blocks)
    }

    /// Locate a catalog entry based on its filename.
    pub fn find_entry(&self, filename: &str) -> io::Result<CatalogEntry> {
        self.iter()
            .find(|x| match x {
                Err(_) => true,
                Ok(entry) => entry.filename == filename,
            })
            .unwrap_or_else(|| Err(DiskError::NotFound.into()))
    }

    /// Reassemble the contents of a file.
    pub fn read_file(&self, entry: &CatalogEntry) -> io::Result<Vec<u8>> {
        tslist::read_file(&self.blocks, entry.ts_list)
    }

    /// Return a reader for the contents of a file.
    pub fn reader(&self, entry: &CatalogEntry) -> FileReader<'_> {
        FileReader::new(&self.blocks, entry.ts_list)
    }

    /// Return a list of sectors occupied by a file.
    pub fn occupied_sectors(&self, entry: &CatalogEntry) -> io::Result<Vec<Location>> {
        tslist::occupied_sectors(&self.blocks, entry.ts_list)
    }

    /// Write a hex dump of the disk image to the provided writer.
    pub fn dump(&self, writer: &mut dyn Write) -> io::Result<()> {
        self.blocks.dump(writer)
    }

    /// Hex-dump the contents of one file to the provided writer.
    pub fn dump_file(&self, entry: &CatalogEntry, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "Filename: \"{}\"", entry.filename)?;
        writeln!(writer, "{}", util::hex(&self.read_file(entry)?))?;
        Ok(())
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.volume() {
            Ok(vtoc) => write!(f, "{}", vtoc),
            Err(e) => write!(f, "Cannot read VTOC: {}", e),
        }
    }
}

impl<'a> IntoIterator for &'a Disk {
    type Item = io::Result<CatalogEntry>;
    type IntoIter = CatalogIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
