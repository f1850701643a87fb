//! This is a Rust library for reading the disk images of Apple II computers
//! running DOS 3.3, the disk operating system Apple shipped from 1980 until
//! ProDOS replaced it.  A DOS 3.3 image is a flat copy of a 5.25" floppy: 35
//! tracks of 16 sectors of 256 bytes, 143,360 bytes in all, stored in DOS
//! logical sector order (the ".dsk" or ".do" images found in most archives).
//!
//! Features:
//!
//! * Read the Volume Table of Contents (VTOC), including the free-sector
//! bitmap.
//! * Iterate catalog entries, in on-disk order.
//! * Reassemble files from their track/sector lists, either in one piece or
//! through an `io::Read` implementation.
//! * Detokenize Applesoft BASIC programs into program listings.
//! * Recover the text of DOS text files from their high-bit encoding.
//! * Extract every file on a disk, isolating failures to the entry that
//! caused them.
//! * A sample `adisk` program for operating on DOS 3.3 disk images from the
//! command line.
//!
//! Current shortcomings:
//!
//! * Disk images are read-only.
//! * Only DOS-ordered images are understood.  ProDOS-ordered (".po") and
//! nibble (".nib") images, and 13-sector DOS 3.2 disks, are not.
//! * Integer BASIC programs are extracted but not detokenized.
//!
//! # Example
//!
//! The following example opens a disk image, reads the catalog, and prints
//! the listing of every Applesoft program on the disk:
//!
//! ```
//! use std::io;
//! use dos33::applesoft;
//! use dos33::disk::{Disk, FileType};
//! # fn list_programs(disk_image_filename: &str) -> io::Result<()> {
//! # let disk_image_filename = "/tmp/disk.dsk";
//!
//! // Open the disk image read-only
//! let disk = Disk::open(disk_image_filename)?;
//!
//! // Print every Applesoft program
//! for entry in disk.catalog()? {
//!     if entry.file_type != FileType::Applesoft {
//!         continue;
//!     }
//!     let program = applesoft::detokenize(&disk.read_file(&entry)?)?;
//!     println!("{}", entry);
//!     println!("{}", program);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The accompanying `adisk` program performs the same operations from the
//! command line.  For example, a catalog listing:
//!
//! ```text
//! adisk MASTER.DSK catalog
//! DISK VOLUME 254
//!
//! *A 003 HELLO
//! *I 018 ANIMALS
//! *T 003 APPLE PROMS
//! *I 006 APPLESOFT
//! *B 010 LOADER.OBJ0
//!
//! 407 sectors free.
//! ```
//!
//! # Design of disk image access
//!
//! Support for disk images was built using a layered scheme:
//!
//! 1. `Image` provides access to the underlying storage containing the disk
//!    image -- either a memory-mapped disk image file or an in-memory array.
//! 2. `BlockDevice` divides the image into tracks and sectors according to
//!    a `Geometry`.
//! 3. The `vtoc`, `catalog`, and `tslist` modules interpret the sectors that
//!    hold the DOS structures: the VTOC, the chain of catalog sectors, and
//!    each file's chain of track/sector lists.
//! 4. `Disk` ties these together and provides high-level operations such as
//!    listing the catalog, finding a file, and reading it.
//! 5. The `applesoft` and `text` modules turn raw file contents into
//!    readable form, and `extract` decides which artifacts each file yields.
//!
//! DOS 3.3 keeps no checksums and nothing stops a damaged disk from linking a
//! chain of sectors back on itself, so every chain walker remembers where it
//! has been and reports a revisited sector as a corrupt image.
//!
//! Since access is read-only, sectors are borrowed straight from the image
//! and only reassembled file contents are copied.

pub mod applesoft;
pub mod disk;
pub mod extract;
pub mod text;

mod util;
