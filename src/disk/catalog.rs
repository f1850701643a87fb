//! DOS 3.3 catalogs

use std::collections::HashSet;
use std::fmt;
use std::io;

use crate::disk::block::{BlockDevice, Location, Position};
use crate::disk::error::DiskError;
use crate::disk::vtoc::VolumeDescriptor;
use crate::text;

const FILE_TYPE_TEXT: u8 = 0x00;
const FILE_TYPE_INTEGER: u8 = 0x01;
const FILE_TYPE_APPLESOFT: u8 = 0x02;
const FILE_TYPE_BINARY: u8 = 0x04;
const FILE_TYPE_SPECIAL: u8 = 0x08;
const FILE_TYPE_RELOCATABLE: u8 = 0x10;
const FILE_TYPE_NEW_A: u8 = 0x20;
const FILE_TYPE_NEW_B: u8 = 0x40;
const FILE_TYPE_MASK: u8 = 0x7F;
const FILE_LOCKED_MASK: u8 = 0x80;

/// A catalog entry's file type, from the low seven bits of its type byte.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum FileType {
    Text,
    IntegerBasic,
    Applesoft,
    Binary,
    Special,
    Relocatable,
    NewA,
    NewB,
    Unknown(u8),
}

impl FileType {
    pub fn from_code(code: u8) -> FileType {
        match code & FILE_TYPE_MASK {
            FILE_TYPE_TEXT => FileType::Text,
            FILE_TYPE_INTEGER => FileType::IntegerBasic,
            FILE_TYPE_APPLESOFT => FileType::Applesoft,
            FILE_TYPE_BINARY => FileType::Binary,
            FILE_TYPE_SPECIAL => FileType::Special,
            FILE_TYPE_RELOCATABLE => FileType::Relocatable,
            FILE_TYPE_NEW_A => FileType::NewA,
            FILE_TYPE_NEW_B => FileType::NewB,
            c => FileType::Unknown(c),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            FileType::Text => FILE_TYPE_TEXT,
            FileType::IntegerBasic => FILE_TYPE_INTEGER,
            FileType::Applesoft => FILE_TYPE_APPLESOFT,
            FileType::Binary => FILE_TYPE_BINARY,
            FileType::Special => FILE_TYPE_SPECIAL,
            FileType::Relocatable => FILE_TYPE_RELOCATABLE,
            FileType::NewA => FILE_TYPE_NEW_A,
            FileType::NewB => FILE_TYPE_NEW_B,
            FileType::Unknown(c) => c,
        }
    }

    /// The letter shown for this type by the DOS `CATALOG` command.
    pub fn letter(&self) -> char {
        match *self {
            FileType::Text => 'T',
            FileType::IntegerBasic => 'I',
            FileType::Applesoft => 'A',
            FileType::Binary => 'B',
            FileType::Special => 'S',
            FileType::Relocatable => 'R',
            FileType::NewA => 'a',
            FileType::NewB => 'b',
            FileType::Unknown(_) => '?',
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FileType::Unknown(_))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

pub(super) const CATALOG_ENTRIES_OFFSET: usize = 0x0B;
pub(super) const ENTRY_SIZE: usize = 0x23;
pub(super) const ENTRIES_PER_SECTOR: usize = 7;
const NEXT_CATALOG_OFFSET: usize = 0x01;
const ENTRY_TS_LIST_OFFSET: usize = 0x00;
const ENTRY_FILE_TYPE_OFFSET: usize = 0x02;
const ENTRY_FILENAME_OFFSET: usize = 0x03;
const ENTRY_FILENAME_LENGTH: usize = 30;
const ENTRY_SECTOR_COUNT_OFFSET: usize = 0x21;
const SLOT_NEVER_USED: u8 = 0x00;
const SLOT_DELETED: u8 = 0xFF;

/// A DOS 3.3 catalog entry.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: String,
    pub file_type: FileType,
    pub locked: bool,
    /// The first sector of this file's track/sector list.
    pub ts_list: Location,
    /// Sectors occupied, including track/sector list sectors.
    pub sector_count: u16,
    /// Where this entry was read from.
    pub position: Position,
}

impl CatalogEntry {
    /// A slot whose first byte is 0x00 has never held a file, and 0xFF
    /// marks a deleted file.
    #[inline]
    pub fn is_unused_slot(bytes: &[u8]) -> bool {
        matches!(bytes[ENTRY_TS_LIST_OFFSET], SLOT_NEVER_USED | SLOT_DELETED)
    }

    pub fn parse(bytes: &[u8], position: Position) -> CatalogEntry {
        assert_eq!(bytes.len(), ENTRY_SIZE);
        let type_byte = bytes[ENTRY_FILE_TYPE_OFFSET];
        CatalogEntry {
            filename: text::decode_padded(
                &bytes[ENTRY_FILENAME_OFFSET..ENTRY_FILENAME_OFFSET + ENTRY_FILENAME_LENGTH],
            ),
            file_type: FileType::from_code(type_byte),
            locked: type_byte & FILE_LOCKED_MASK != 0,
            ts_list: Location::from_bytes(&bytes[ENTRY_TS_LIST_OFFSET..]),
            sector_count: u16::from_le_bytes([
                bytes[ENTRY_SECTOR_COUNT_OFFSET],
                bytes[ENTRY_SECTOR_COUNT_OFFSET + 1],
            ]),
            position,
        }
    }

    /// The type marker of a catalog listing, such as "*A" for a locked
    /// Applesoft program.
    pub fn type_marker(&self) -> String {
        format!("{}{}", if self.locked { '*' } else { ' ' }, self.file_type)
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:03} {}",
            self.type_marker(),
            self.sector_count,
            self.filename
        )?;
        if f.alternate() {
            // verbose
            write!(f, "  [list={} slot={}]", self.ts_list, self.position)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\"{}\",{},{:?} @ {}",
            self.filename, self.sector_count, self.file_type, self.position
        )
    }
}

/// This iterator walks the chain of catalog sectors and returns the entries
/// of every occupied slot, in sector order and then slot order.
pub struct CatalogIterator<'a> {
    blocks: &'a dyn BlockDevice,
    next_sector: Option<Location>,
    visited_sectors: HashSet<Location>,
    entries: ::std::vec::IntoIter<CatalogEntry>,
    error: Option<io::Error>,
}

impl<'a> CatalogIterator<'a> {
    /// Create a catalog iterator starting at the catalog sector named by
    /// the VTOC.
    pub fn new(blocks: &'a dyn BlockDevice) -> CatalogIterator<'a> {
        match VolumeDescriptor::read(blocks) {
            Ok(vtoc) => Self::from_location(blocks, vtoc.catalog),
            Err(e) => Self::new_error(blocks, e),
        }
    }

    /// Create a catalog iterator starting at an explicit catalog sector.
    pub fn from_location(blocks: &'a dyn BlockDevice, start: Location) -> CatalogIterator<'a> {
        CatalogIterator {
            blocks,
            next_sector: Some(start),
            visited_sectors: HashSet::new(),
            entries: vec![].into_iter(),
            error: None,
        }
    }

    /// We avoid returning an error in new(), so we can preserve the iter()
    /// convention of returning an iterator directly.  Instead, we use this
    /// method to produce an iterator that yields an error on the first
    /// iteration.
    fn new_error(blocks: &'a dyn BlockDevice, error: io::Error) -> CatalogIterator<'a> {
        CatalogIterator {
            blocks,
            next_sector: None,
            visited_sectors: HashSet::new(),
            entries: vec![].into_iter(),
            error: Some(error),
        }
    }

    /// Read the next catalog sector in the chain and queue up its entries.
    fn load_sector(&mut self, location: Location) -> io::Result<()> {
        if !self.visited_sectors.insert(location) {
            tracing::warn!("catalog chain revisits sector {}", location);
            return Err(DiskError::CorruptImage.into());
        }
        let block = self.blocks.full_sector(location)?;

        let next = Location::from_bytes(&block[NEXT_CATALOG_OFFSET..]);
        if !next.is_terminator() {
            self.next_sector = Some(next);
        }
        tracing::debug!("catalog sector {} links to {}", location, next);

        let entries = block[CATALOG_ENTRIES_OFFSET..]
            .chunks_exact(ENTRY_SIZE)
            .take(ENTRIES_PER_SECTOR)
            .enumerate()
            .filter(|(_, chunk)| !CatalogEntry::is_unused_slot(chunk))
            .map(|(slot, chunk)| {
                let position = Position {
                    location,
                    offset: (CATALOG_ENTRIES_OFFSET + slot * ENTRY_SIZE) as u8,
                };
                CatalogEntry::parse(chunk, position)
            })
            .collect::<Vec<_>>();
        self.entries = entries.into_iter();
        Ok(())
    }
}

impl<'a> Iterator for CatalogIterator<'a> {
    type Item = io::Result<CatalogEntry>;

    fn next(&mut self) -> Option<io::Result<CatalogEntry>> {
        // Return any pending error, if present.
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }

        loop {
            if let Some(entry) = self.entries.next() {
                return Some(Ok(entry));
            }
            let location = self.next_sector.take()?;
            if let Err(e) = self.load_sector(location) {
                return Some(Err(e));
            }
        }
    }
}

/// Read the entire catalog.
pub fn read_catalog(blocks: &dyn BlockDevice) -> io::Result<Vec<CatalogEntry>> {
    CatalogIterator::new(blocks).collect()
}
