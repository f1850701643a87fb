use std::collections::{HashSet, VecDeque};
use std::io;

use crate::disk::block::{BlockDevice, Location, BLOCK_SIZE};
use crate::disk::error::DiskError;

const NEXT_TS_LIST_OFFSET: usize = 0x01;
const SECTOR_OFFSET_OFFSET: usize = 0x05;
pub const TS_PAIRS_OFFSET: usize = 0x0C;
pub const MAX_TS_PAIRS: usize = 122;

/// One sector of a file's track/sector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackSectorList {
    pub location: Location,
    /// The following list sector, if this isn't the last one.
    pub next: Option<Location>,
    /// Index within the file of the first data sector described here.
    pub sector_offset: u16,
    /// Data sectors in file order, up to the first pair with a zero track.
    pub data_sectors: Vec<Location>,
}

impl TrackSectorList {
    pub fn parse(block: &[u8], location: Location) -> TrackSectorList {
        assert!(block.len() >= BLOCK_SIZE);
        let next = Location::from_bytes(&block[NEXT_TS_LIST_OFFSET..]);
        let data_sectors = block[TS_PAIRS_OFFSET..BLOCK_SIZE]
            .chunks_exact(2)
            .take(MAX_TS_PAIRS)
            .map(Location::from_bytes)
            .take_while(|l| !l.is_terminator())
            .collect();
        TrackSectorList {
            location,
            next: if next.is_terminator() { None } else { Some(next) },
            sector_offset: u16::from_le_bytes([
                block[SECTOR_OFFSET_OFFSET],
                block[SECTOR_OFFSET_OFFSET + 1],
            ]),
            data_sectors,
        }
    }
}

/// Walk a chain of track/sector list sectors.  A list sector that is reached
/// twice ends the walk with `CorruptImage`.  Callers that go on to read the
/// data sectors claim them through the same iterator, so a sector shared by
/// two pairs (or by a pair and a list) is reported the same way.
pub struct TrackSectorListIterator<'a> {
    blocks: &'a dyn BlockDevice,
    next_sector: Option<Location>,
    visited_sectors: HashSet<Location>,
}

impl<'a> TrackSectorListIterator<'a> {
    /// Create a new iterator starting at the specified list sector.  A zero
    /// starting track yields an empty chain.
    pub fn new(blocks: &'a dyn BlockDevice, start: Location) -> TrackSectorListIterator<'a> {
        TrackSectorListIterator {
            blocks,
            next_sector: if start.is_terminator() {
                None
            } else {
                Some(start)
            },
            visited_sectors: HashSet::new(),
        }
    }

    /// Record that a sector of this file is about to be read.
    pub fn claim(&mut self, location: Location) -> io::Result<()> {
        if !self.visited_sectors.insert(location) {
            tracing::warn!("file revisits sector {}", location);
            return Err(DiskError::CorruptImage.into());
        }
        Ok(())
    }

    fn read_list(&mut self, location: Location) -> io::Result<TrackSectorList> {
        self.claim(location)?;
        let block = self.blocks.full_sector(location)?;
        let list = TrackSectorList::parse(block, location);
        tracing::debug!(
            "track/sector list {} holds {} data sectors, next {:?}",
            location,
            list.data_sectors.len(),
            list.next
        );
        self.next_sector = list.next;
        Ok(list)
    }
}

impl<'a> Iterator for TrackSectorListIterator<'a> {
    type Item = io::Result<TrackSectorList>;

    fn next(&mut self) -> Option<io::Result<TrackSectorList>> {
        let location = self.next_sector.take()?;
        Some(self.read_list(location))
    }
}

/// Read one data sector.  A sector cut short by the end of the image
/// contributes whatever bytes exist.
fn read_data_sector(blocks: &dyn BlockDevice, location: Location) -> io::Result<&[u8]> {
    let block = blocks.sector(location)?;
    if block.len() < BLOCK_SIZE {
        tracing::warn!(
            "data sector {} is truncated to {} bytes",
            location,
            block.len()
        );
    }
    Ok(block)
}

/// Reassemble a file by concatenating every data sector named by its
/// track/sector list chain.
pub fn read_file(blocks: &dyn BlockDevice, start: Location) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut lists = TrackSectorListIterator::new(blocks, start);
    while let Some(list) = lists.next() {
        for location in list?.data_sectors {
            lists.claim(location)?;
            data.extend_from_slice(read_data_sector(blocks, location)?);
        }
    }
    Ok(data)
}

/// Return every sector a file occupies: its list sectors followed by its data
/// sectors, each in chain order.
pub fn occupied_sectors(blocks: &dyn BlockDevice, start: Location) -> io::Result<Vec<Location>> {
    let mut iter = TrackSectorListIterator::new(blocks, start);
    let lists = iter.by_ref().collect::<io::Result<Vec<_>>>()?;
    let mut locations: Vec<Location> = lists.iter().map(|l| l.location).collect();
    for location in lists.into_iter().flat_map(|l| l.data_sectors) {
        iter.claim(location)?;
        locations.push(location);
    }
    Ok(locations)
}

/// FileReader objects implement the Read trait and are used to read a file's
/// contents as a byte stream, one data sector at a time.
pub struct FileReader<'a> {
    blocks: &'a dyn BlockDevice,
    lists: TrackSectorListIterator<'a>,
    pending: VecDeque<Location>,
    block: &'a [u8],
    eof: bool,
    error: Option<io::Error>,
}

impl<'a> FileReader<'a> {
    pub fn new(blocks: &'a dyn BlockDevice, start: Location) -> FileReader<'a> {
        FileReader {
            blocks,
            lists: TrackSectorListIterator::new(blocks, start),
            pending: VecDeque::new(),
            block: &[],
            eof: false,
            error: None,
        }
    }

    /// Load the next data sector into `block`, returning false at the end
    /// of the file.
    fn advance(&mut self) -> io::Result<bool> {
        loop {
            if let Some(location) = self.pending.pop_front() {
                self.lists.claim(location)?;
                self.block = read_data_sector(self.blocks, location)?;
                return Ok(true);
            }
            match self.lists.next() {
                Some(list) => self.pending.extend(list?.data_sectors),
                None => return Ok(false),
            }
        }
    }
}

impl<'a> io::Read for FileReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // An error hit partway through the previous read is reported now.
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let mut total_nbytes = 0;
        while total_nbytes < buf.len() && !self.eof {
            if self.block.is_empty() {
                match self.advance() {
                    Ok(true) => {}
                    Ok(false) => self.eof = true,
                    Err(e) => {
                        self.eof = true;
                        if total_nbytes == 0 {
                            return Err(e);
                        }
                        self.error = Some(e);
                    }
                }
                continue;
            }

            // Copy as much of this block as possible into the caller-provided buffer.
            let nbytes = self.block.len().min(buf.len() - total_nbytes);
            buf[total_nbytes..total_nbytes + nbytes].copy_from_slice(&self.block[..nbytes]);
            self.block = &self.block[nbytes..];
            total_nbytes += nbytes;
        }
        Ok(total_nbytes)
    }
}
