use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};

use dos33::applesoft;
use dos33::disk::tslist::MAX_TS_PAIRS;
use dos33::disk::{
    Disk, DiskError, FileType, Location, TrackSectorListIterator, BLOCK_SIZE, DOS33_IMAGE_SIZE,
};
use dos33::extract::{self, ArtifactKind};
use rand::{Rng, XorShiftRng};

const ITERATIONS: usize = 20;
const MAX_FILES_PER_IMAGE: usize = 12;
const MAX_DATA_SECTORS: usize = 30;
const RNG_SEED: [u8; 16] = [
    0x33, 0xD0, 0x5E, 0x03, 0xA2, 0x11, 0x9C, 0x4B, 0x80, 0x0F, 0x7A, 0xE9, 0x26, 0xC5, 0x58, 0x1D,
];

const VTOC: Location = Location(17, 0);
const CATALOG_TRACK: u8 = 17;
const ENTRIES_PER_SECTOR: usize = 7;
const FILE_TYPE_CODES: &[u8] = &[0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40];

fn deterministic_rng() -> XorShiftRng {
    rand::SeedableRng::from_seed(RNG_SEED)
}

fn offset(location: Location) -> usize {
    location.0 as usize * 16 * BLOCK_SIZE + location.1 as usize * BLOCK_SIZE
}

/// A file as written by `ImageBuilder`.
struct BuiltFile {
    name: String,
    type_byte: u8,
    contents: Vec<u8>,
    lists: Vec<Location>,
    data: Vec<Location>,
}

impl BuiltFile {
    fn sector_count(&self) -> usize {
        self.lists.len() + self.data.len()
    }

    /// Reassembled contents are whole sectors.
    fn padded_contents(&self) -> Vec<u8> {
        let mut contents = self.contents.clone();
        contents.resize(self.data.len() * BLOCK_SIZE, 0);
        contents
    }
}

/// Lay out a DOS 3.3 disk the way DOS itself would: VTOC at (17,0), catalog
/// sectors chained downward from (17,15), and each file's lists and data
/// scattered across the remaining tracks.
struct ImageBuilder {
    image: Vec<u8>,
    free: Vec<Location>,
    files: Vec<BuiltFile>,
}

impl ImageBuilder {
    fn new(rng: &mut impl Rng) -> ImageBuilder {
        let mut image = vec![0u8; DOS33_IMAGE_SIZE];

        let vtoc = offset(VTOC);
        image[vtoc + 0x01] = CATALOG_TRACK;
        image[vtoc + 0x02] = 15;
        image[vtoc + 0x03] = 3;
        image[vtoc + 0x06] = 254;
        image[vtoc + 0x27] = MAX_TS_PAIRS as u8;
        image[vtoc + 0x34] = 35;
        image[vtoc + 0x35] = 16;
        image[vtoc + 0x37] = 1;

        for sector in 2..=15 {
            let link = offset(Location(CATALOG_TRACK, sector));
            image[link + 1] = CATALOG_TRACK;
            image[link + 2] = sector - 1;
        }

        let mut free: Vec<Location> = (1..35)
            .filter(|&track| track != CATALOG_TRACK)
            .flat_map(|track| (0..16).map(move |sector| Location(track, sector)))
            .collect();
        rng.shuffle(&mut free);

        ImageBuilder {
            image,
            free,
            files: vec![],
        }
    }

    fn allocate(&mut self) -> Location {
        self.free.pop().expect("disk full")
    }

    fn add_file(&mut self, name: &str, type_byte: u8, contents: &[u8]) {
        let data_count = (contents.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let list_count = ((data_count + MAX_TS_PAIRS - 1) / MAX_TS_PAIRS).max(1);
        let lists: Vec<Location> = (0..list_count).map(|_| self.allocate()).collect();
        let data: Vec<Location> = (0..data_count).map(|_| self.allocate()).collect();

        for (i, list) in lists.iter().enumerate() {
            let base = offset(*list);
            if let Some(next) = lists.get(i + 1) {
                self.image[base + 1] = next.0;
                self.image[base + 2] = next.1;
            }
            let sector_offset = (i * MAX_TS_PAIRS) as u16;
            self.image[base + 5..base + 7].copy_from_slice(&sector_offset.to_le_bytes());
            for (j, location) in data.iter().skip(i * MAX_TS_PAIRS).take(MAX_TS_PAIRS).enumerate() {
                self.image[base + 0x0C + j * 2] = location.0;
                self.image[base + 0x0C + j * 2 + 1] = location.1;
            }
        }
        for (chunk, location) in contents.chunks(BLOCK_SIZE).zip(data.iter()) {
            let base = offset(*location);
            self.image[base..base + chunk.len()].copy_from_slice(chunk);
        }

        let index = self.files.len();
        let catalog = Location(CATALOG_TRACK, 15 - (index / ENTRIES_PER_SECTOR) as u8);
        let entry = offset(catalog) + 0x0B + (index % ENTRIES_PER_SECTOR) * 0x23;
        self.image[entry] = lists[0].0;
        self.image[entry + 1] = lists[0].1;
        self.image[entry + 2] = type_byte;
        for i in 0..30 {
            self.image[entry + 3 + i] = name.as_bytes().get(i).copied().unwrap_or(b' ') | 0x80;
        }
        let sector_count = (list_count + data_count) as u16;
        self.image[entry + 0x21..entry + 0x23].copy_from_slice(&sector_count.to_le_bytes());

        self.files.push(BuiltFile {
            name: name.to_string(),
            type_byte,
            contents: contents.to_vec(),
            lists,
            data,
        });
    }

    /// Write the free-sector bitmap and return the finished image.
    fn finish(mut self) -> (Vec<u8>, Vec<BuiltFile>, usize) {
        let mut masks = [0u16; 35];
        for location in &self.free {
            masks[location.0 as usize] |= 1 << location.1;
        }
        let bitmap = offset(VTOC) + 0x38;
        for (track, mask) in masks.iter().enumerate() {
            self.image[bitmap + track * 4..bitmap + track * 4 + 2]
                .copy_from_slice(&mask.to_be_bytes());
        }
        let free = self.free.len();
        (self.image, self.files, free)
    }
}

fn random_name(rng: &mut impl Rng, used: &mut HashSet<String>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789. ";
    loop {
        let length = rng.gen_range(1, 31);
        let name: String = (0..length)
            .map(|_| CHARSET[rng.gen_range(0, CHARSET.len())] as char)
            .collect();
        // Trailing spaces are indistinguishable from padding.
        let name = name.trim_end().to_string();
        if !name.is_empty() && used.insert(name.clone()) {
            return name;
        }
    }
}

fn random_image(rng: &mut XorShiftRng) -> (Vec<u8>, Vec<BuiltFile>, usize) {
    let mut builder = ImageBuilder::new(rng);
    let mut names = HashSet::new();
    for _ in 0..rng.gen_range(1, MAX_FILES_PER_IMAGE + 1) {
        let name = random_name(rng, &mut names);
        let mut type_byte = FILE_TYPE_CODES[rng.gen_range(0, FILE_TYPE_CODES.len())];
        if rng.gen() {
            type_byte |= 0x80;
        }
        let size = rng.gen_range(0, MAX_DATA_SECTORS * BLOCK_SIZE + 1);
        let mut contents = vec![0u8; size];
        rng.fill(&mut contents[..]);
        builder.add_file(&name, type_byte, &contents);
    }
    builder.finish()
}

#[test]
fn random_disk_test() {
    let mut rng = deterministic_rng();
    for _ in 0..ITERATIONS {
        let (image, files, free) = random_image(&mut rng);
        let disk = Disk::from_bytes(image);
        assert_eq!(disk.check_size(), Ok(()));

        let volume = disk.volume().unwrap();
        assert_eq!(volume.volume, 254);
        assert_eq!(volume.free_sectors(), free);
        assert_eq!(disk.to_string(), "DISK VOLUME 254");

        let catalog = disk.catalog().unwrap();
        assert_eq!(catalog.len(), files.len());
        for (entry, file) in catalog.iter().zip(files.iter()) {
            assert_eq!(entry.filename, file.name);
            assert_eq!(entry.file_type, FileType::from_code(file.type_byte));
            assert_eq!(entry.locked, file.type_byte & 0x80 != 0);
            assert_eq!(entry.sector_count as usize, file.sector_count());
            assert_eq!(entry.ts_list, file.lists[0]);

            let contents = disk.read_file(entry).unwrap();
            assert_eq!(contents, file.padded_contents());

            let mut streamed = vec![];
            disk.reader(entry).read_to_end(&mut streamed).unwrap();
            assert_eq!(streamed, contents);

            let mut expected_sectors = file.lists.clone();
            expected_sectors.extend_from_slice(&file.data);
            assert_eq!(disk.occupied_sectors(entry).unwrap(), expected_sectors);

            assert_eq!(disk.find_entry(&file.name).unwrap(), *entry);
        }

        // Every entry keeps its raw bytes, whatever happens to decoding.
        let report = extract::extract_all(&disk);
        assert!(report.catalog_error.is_none());
        for (extraction, file) in report.extractions.iter().zip(files.iter()) {
            let raw = extraction.artifact(ArtifactKind::Raw).unwrap();
            assert_eq!(raw.contents, file.padded_contents());
        }
    }
}

#[test]
fn multiple_track_sector_lists() {
    let mut rng = deterministic_rng();
    let mut builder = ImageBuilder::new(&mut rng);
    let mut contents = vec![0u8; 300 * BLOCK_SIZE];
    rng.fill(&mut contents[..]);
    builder.add_file("BIG DATA", 0x04, &contents);
    let (image, files, _) = builder.finish();
    let disk = Disk::from_bytes(image);

    let entry = disk.find_entry("BIG DATA").unwrap();
    assert_eq!(entry.sector_count, 303);
    let lists = TrackSectorListIterator::new(disk.blocks(), entry.ts_list)
        .collect::<io::Result<Vec<_>>>()
        .unwrap();
    let offsets: Vec<u16> = lists.iter().map(|l| l.sector_offset).collect();
    let counts: Vec<usize> = lists.iter().map(|l| l.data_sectors.len()).collect();
    assert_eq!(offsets, vec![0, 122, 244]);
    assert_eq!(counts, vec![122, 122, 56]);
    assert_eq!(lists[2].next, None);
    assert_eq!(disk.read_file(&entry).unwrap(), files[0].contents);
}

#[test]
fn print_hi_end_to_end() {
    let program = [
        0x0D, 0x00, // length
        0x0C, 0x08, // next line
        0x0A, 0x00, // 10
        applesoft::TOKEN_PRINT, b' ', b'"', b'H', b'I', b'"', 0x00,
        0x00, 0x00, // end of program
    ];
    let mut rng = deterministic_rng();
    let mut builder = ImageBuilder::new(&mut rng);
    builder.add_file("HELLO WORLD", 0x02, &program);
    let (image, _, _) = builder.finish();
    assert_eq!(image.len(), 143_360);

    let mut image_file = tempfile::NamedTempFile::new().unwrap();
    image_file.write_all(&image).unwrap();
    image_file.flush().unwrap();
    let disk = Disk::open(image_file.path()).unwrap();

    let catalog = disk.catalog().unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].to_string(), " A 002 HELLO WORLD");

    let output = tempfile::tempdir().unwrap();
    let report = extract::extract_all(&disk);
    let mut written = vec![];
    for artifact in report.artifacts() {
        written.push(artifact.write_to(output.path()).unwrap());
    }
    assert_eq!(written.len(), 2);

    let raw = fs::read(output.path().join("HELLO_WORLD.raw")).unwrap();
    assert_eq!(raw.len(), BLOCK_SIZE);
    assert_eq!(&raw[..program.len()], &program[..]);
    let listing = fs::read_to_string(output.path().join("HELLO_WORLD.bas")).unwrap();
    assert_eq!(listing, "10 PRINT \"HI\"");
}

#[test]
fn truncated_image_file() {
    let mut rng = deterministic_rng();
    let mut builder = ImageBuilder::new(&mut rng);
    builder.add_file("NOTES", 0x00, b"\xc8\xc5\xcc\xcc\xcf\x8d");
    let (mut image, files, _) = builder.finish();

    // Cut the image just past the catalog track, so anything stored on a
    // later track reads as missing.
    image.truncate(18 * 16 * BLOCK_SIZE);
    let mut image_file = tempfile::NamedTempFile::new().unwrap();
    image_file.write_all(&image).unwrap();
    image_file.flush().unwrap();

    let disk = Disk::open(image_file.path()).unwrap();
    assert_eq!(disk.check_size(), Err(DiskError::SizeMismatch));
    assert_eq!(disk.image_len(), 18 * 16 * BLOCK_SIZE);

    let entry = disk.find_entry("NOTES").unwrap();
    let file = &files[0];
    let result = disk.read_file(&entry);
    if file.lists[0].0 >= 18 {
        // A list sector past the end can't be interpreted.
        assert!(result.unwrap_err() == DiskError::CorruptImage);
    } else if file.data[0].0 >= 18 {
        // A data sector past the end contributes nothing.
        assert!(result.unwrap().is_empty());
    } else {
        assert_eq!(result.unwrap(), file.padded_contents());
    }
}

#[test]
fn missing_file() {
    let mut rng = deterministic_rng();
    let (image, _, _) = ImageBuilder::new(&mut rng).finish();
    let disk = Disk::from_bytes(image);
    assert!(disk.catalog().unwrap().is_empty());
    let e = disk.find_entry("NOPE").unwrap_err();
    assert_eq!(e.kind(), io::ErrorKind::NotFound);
    assert_eq!(DiskError::from_io_error(&e), Some(DiskError::NotFound));
}
