use std::fmt;
use std::io::{self, Write};

use crate::disk::error::DiskError;
use crate::disk::image::Image;
use crate::disk::Geometry;
use crate::util;

pub const BLOCK_SIZE: usize = 256;

pub trait BlockDevice {
    fn geometry(&self) -> &Geometry;
    fn sector(&self, location: Location) -> io::Result<&[u8]>;

    /// Return a sector whose bytes will be interpreted structurally (VTOC,
    /// catalog, track/sector list).  Such a sector must be complete; a
    /// sector cut short by the end of the image is corrupt.
    fn full_sector(&self, location: Location) -> io::Result<&[u8]> {
        let block = self.sector(location)?;
        if block.len() < BLOCK_SIZE {
            tracing::warn!("sector {} is truncated to {} bytes", location, block.len());
            return Err(DiskError::CorruptImage.into());
        }
        Ok(block)
    }

    fn dump(&self, writer: &mut dyn Write) -> io::Result<()> {
        for location in LocationIterator::from_geometry(self.geometry()) {
            writeln!(writer)?;
            writeln!(writer, "track {:02} sector {:02}", location.0, location.1)?;
            let block = self.sector(location)?;
            writeln!(writer, "{}", util::hex(block))?;
        }
        Ok(())
    }
}

pub struct ImageBlockDevice {
    image: Image,
    geometry: &'static Geometry,
}

impl ImageBlockDevice {
    pub fn new(image: Image, geometry: &'static Geometry) -> ImageBlockDevice {
        ImageBlockDevice { image, geometry }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn get_offset(&self, location: Location) -> io::Result<usize> {
        if !self.geometry.contains(location) {
            return Err(DiskError::AddressOutOfRange.into());
        }
        Ok(self.geometry.byte_offset(location))
    }
}

impl BlockDevice for ImageBlockDevice {
    #[inline]
    fn geometry(&self) -> &Geometry {
        self.geometry
    }

    fn sector(&self, location: Location) -> io::Result<&[u8]> {
        let offset = self.get_offset(location)?;
        Ok(self.image.slice(offset, BLOCK_SIZE))
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct Location(pub u8, pub u8); // Track and sector

impl Location {
    #[inline]
    pub fn new(track: u8, sector: u8) -> Location {
        Location(track, sector)
    }

    pub fn from_bytes(bytes: &[u8]) -> Location {
        assert!(bytes.len() >= 2);
        Location(bytes[0], bytes[1])
    }

    #[inline]
    pub fn track(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn sector(&self) -> u8 {
        self.1
    }

    /// DOS 3.3 never stores anything on track 0, so a link with a zero track
    /// marks the end of a chain.
    #[inline]
    pub fn is_terminator(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}

/// The place a structure was read from: a sector and a byte offset within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub location: Location,
    pub offset: u8,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({},{}@0x{:02x})",
            self.location.0, self.location.1, self.offset
        )
    }
}

/// Visit every sector of a geometry in image order.
pub struct LocationIterator {
    tracks: u8,
    sectors: u8,
    next: Option<Location>,
}

impl LocationIterator {
    pub fn from_geometry(geometry: &Geometry) -> LocationIterator {
        LocationIterator {
            tracks: geometry.tracks,
            sectors: geometry.sectors_per_track,
            next: if geometry.tracks > 0 && geometry.sectors_per_track > 0 {
                Some(Location::new(0, 0))
            } else {
                None
            },
        }
    }
}

impl Iterator for LocationIterator {
    type Item = Location;

    fn next(&mut self) -> Option<Location> {
        let location = self.next?;

        let mut next_location = location;
        next_location.1 += 1;
        if next_location.1 >= self.sectors {
            next_location.0 += 1;
            next_location.1 = 0;
            if next_location.0 >= self.tracks {
                self.next = None;
                return Some(location);
            }
        }
        self.next = Some(next_location);
        Some(location)
    }
}
