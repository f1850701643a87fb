//! The DOS 3.3 Volume Table of Contents (VTOC)

use std::fmt;
use std::io;

use crate::disk::block::{BlockDevice, Location};

/// The VTOC always lives at track 17, sector 0.
pub const VTOC_LOCATION: Location = Location(17, 0);

/// Where the catalog conventionally begins when the VTOC doesn't say.
pub const DEFAULT_CATALOG_LOCATION: Location = Location(17, 15);

const FIRST_CATALOG_OFFSET: usize = 0x01;
const DOS_RELEASE_OFFSET: usize = 0x03;
const VOLUME_OFFSET: usize = 0x06;
const MAX_PAIRS_OFFSET: usize = 0x27;
const TRACKS_OFFSET: usize = 0x34;
const SECTORS_OFFSET: usize = 0x35;
const BYTES_PER_SECTOR_OFFSET: usize = 0x36;
const BITMAP_OFFSET: usize = 0x38;
const BITMAP_STRIDE: usize = 4;
const BITMAP_MAX_TRACKS: usize = 50;

/// The fields of the VTOC that are needed to find and list files, plus the
/// free-sector bitmap.
#[derive(Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    /// First catalog sector, after substituting the conventional default for
    /// a zero track or sector byte.
    pub catalog: Location,
    pub dos_release: u8,
    pub volume: u8,
    /// Track/sector pairs per sector-list sector (122 on a standard disk).
    pub max_pairs: u8,
    pub tracks: u8,
    pub sectors_per_track: u8,
    pub bytes_per_sector: u16,
    bitmap: Vec<u8>,
}

impl VolumeDescriptor {
    /// Read the VTOC from the provided block device.
    pub fn read(blocks: &dyn BlockDevice) -> io::Result<VolumeDescriptor> {
        let block = blocks.full_sector(VTOC_LOCATION)?;
        Ok(Self::from_bytes(block))
    }

    pub fn from_bytes(block: &[u8]) -> VolumeDescriptor {
        let stored = Location::from_bytes(&block[FIRST_CATALOG_OFFSET..]);
        let catalog = Location(
            if stored.0 == 0 {
                DEFAULT_CATALOG_LOCATION.0
            } else {
                stored.0
            },
            if stored.1 == 0 {
                DEFAULT_CATALOG_LOCATION.1
            } else {
                stored.1
            },
        );
        VolumeDescriptor {
            catalog,
            dos_release: block[DOS_RELEASE_OFFSET],
            volume: block[VOLUME_OFFSET],
            max_pairs: block[MAX_PAIRS_OFFSET],
            tracks: block[TRACKS_OFFSET],
            sectors_per_track: block[SECTORS_OFFSET],
            bytes_per_sector: u16::from_le_bytes([
                block[BYTES_PER_SECTOR_OFFSET],
                block[BYTES_PER_SECTOR_OFFSET + 1],
            ]),
            bitmap: block[BITMAP_OFFSET..BITMAP_OFFSET + BITMAP_STRIDE * BITMAP_MAX_TRACKS]
                .to_vec(),
        }
    }

    /// Each track has a 32-bit entry in the bitmap, of which only the first
    /// 16 bits are used.  Bit n of the big-endian first two bytes is set when
    /// sector n is free.
    fn track_free_mask(&self, track: u8) -> u16 {
        let offset = track as usize * BITMAP_STRIDE;
        if track >= self.tracks || offset + 1 >= self.bitmap.len() {
            return 0;
        }
        let mask = match self.sectors_per_track {
            s if s >= 16 => 0xFFFF,
            s => (1u16 << s) - 1,
        };
        u16::from_be_bytes([self.bitmap[offset], self.bitmap[offset + 1]]) & mask
    }

    /// Return true if the bitmap marks this sector as free.
    pub fn is_free(&self, location: Location) -> bool {
        location.1 < 16 && self.track_free_mask(location.0) & (1 << location.1) != 0
    }

    /// Return the number of sectors the bitmap marks as free.
    pub fn free_sectors(&self) -> usize {
        (0..self.tracks)
            .map(|track| self.track_free_mask(track).count_ones() as usize)
            .sum()
    }
}

impl fmt::Display for VolumeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DISK VOLUME {:03}", self.volume)
    }
}

impl fmt::Debug for VolumeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "volume: {}", self.volume)?;
        writeln!(f, "dos release: {}", self.dos_release)?;
        writeln!(f, "first catalog sector: {}", self.catalog)?;
        writeln!(f, "track/sector pairs per list: {}", self.max_pairs)?;
        writeln!(
            f,
            "layout: {} tracks, {} sectors per track, {} bytes per sector",
            self.tracks, self.sectors_per_track, self.bytes_per_sector
        )?;
        writeln!(f, "free sectors: {}", self.free_sectors())
    }
}
