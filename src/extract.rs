//! Turn catalog entries into output artifacts.
//!
//! Every file yields its raw bytes.  Applesoft programs additionally yield a
//! detokenized listing, and text files a normalized text rendition.  A
//! failure on one entry is recorded against that entry and never stops the
//! others from being extracted.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::applesoft;
use crate::disk::{CatalogEntry, CatalogIterator, Disk, DiskError, FileType};
use crate::text;

const PLACEHOLDER: char = '_';

/// Make a catalog filename usable as a host filename stem.  Spaces, path
/// separators, and control characters become underscores.
pub fn safe_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => PLACEHOLDER,
            c if c.is_control() => PLACEHOLDER,
            c => c,
        })
        .collect();
    if safe.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        safe
    }
}

/// Hands out filename stems that are unique within one extraction, adding
/// `_2`, `_3`, ... to names that were already taken.
#[derive(Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> NameAllocator {
        NameAllocator::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let base = safe_filename(name);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    /// File contents exactly as reassembled from the disk.
    Raw,
    /// Detokenized Applesoft listing.
    Listing,
    /// Normalized contents of a text file.
    Text,
}

impl ArtifactKind {
    fn extension(&self, file_type: FileType) -> &'static str {
        match (self, file_type) {
            (ArtifactKind::Raw, FileType::Binary) => "bin",
            (ArtifactKind::Raw, _) => "raw",
            (ArtifactKind::Listing, _) => "bas",
            (ArtifactKind::Text, _) => "txt",
        }
    }
}

/// One output file.
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub contents: Vec<u8>,
}

impl Artifact {
    fn new(stem: &str, file_type: FileType, kind: ArtifactKind, contents: Vec<u8>) -> Artifact {
        Artifact {
            file_name: format!("{}.{}", stem, kind.extension(file_type)),
            kind,
            contents,
        }
    }

    /// Write this artifact into a directory, returning its path.
    pub fn write_to(&self, directory: &Path) -> io::Result<PathBuf> {
        let path = directory.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {} bytes)",
            self.file_name,
            self.kind,
            self.contents.len()
        )
    }
}

/// The outcome of extracting one catalog entry.
#[derive(Debug)]
pub struct Extraction {
    pub entry: CatalogEntry,
    pub stem: String,
    pub artifacts: Vec<Artifact>,
    /// Problems that cost this entry some (or all) of its artifacts, plus
    /// `UnknownFileType` warnings.
    pub problems: Vec<io::Error>,
}

impl Extraction {
    /// Reassemble one entry and derive its artifacts.
    pub fn run(disk: &Disk, entry: CatalogEntry, stem: String) -> Extraction {
        let mut extraction = Extraction {
            entry,
            stem,
            artifacts: vec![],
            problems: vec![],
        };

        let contents = match disk.read_file(&extraction.entry) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("cannot read \"{}\": {}", extraction.entry.filename, e);
                extraction.problems.push(e);
                return extraction;
            }
        };

        let file_type = extraction.entry.file_type;
        let decoded = match file_type {
            FileType::Applesoft => match applesoft::detokenize(&contents) {
                Ok(program) if program.is_empty() => None,
                Ok(program) => Some((ArtifactKind::Listing, program.to_string())),
                Err(e) => {
                    tracing::warn!(
                        "cannot detokenize \"{}\": {}",
                        extraction.entry.filename,
                        e
                    );
                    extraction.problems.push(e);
                    None
                }
            },
            FileType::Text => Some((ArtifactKind::Text, text::normalize_text(&contents))),
            FileType::Unknown(code) => {
                tracing::warn!(
                    "\"{}\" has unknown file type ${:02X}; extracting raw bytes only",
                    extraction.entry.filename,
                    code
                );
                extraction.problems.push(DiskError::UnknownFileType.into());
                None
            }
            _ => None,
        };

        extraction.artifacts.push(Artifact::new(
            &extraction.stem,
            file_type,
            ArtifactKind::Raw,
            contents,
        ));
        if let Some((kind, text)) = decoded {
            extraction.artifacts.push(Artifact::new(
                &extraction.stem,
                file_type,
                kind,
                text.into_bytes(),
            ));
        }
        extraction
    }

    /// Write every artifact into `directory`, returning the paths written.
    /// A write that fails is recorded as a problem and the remaining
    /// artifacts are still attempted.
    pub fn write_to(&mut self, directory: &Path) -> Vec<PathBuf> {
        let mut written = vec![];
        for artifact in &self.artifacts {
            match artifact.write_to(directory) {
                Ok(path) => written.push(path),
                Err(e) => {
                    tracing::warn!("cannot write {}: {}", artifact.file_name, e);
                    self.problems.push(e);
                }
            }
        }
        written
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// True if every artifact this entry could have produced was produced.
    /// Unknown file types only warn.
    pub fn is_complete(&self) -> bool {
        self.problems
            .iter()
            .all(|e| *e == DiskError::UnknownFileType)
    }
}

/// Extract entries lazily, in catalog order.  A catalog error is yielded
/// once and ends the walk; errors within an entry are reported in its
/// `Extraction`.
pub struct Extractor<'a> {
    disk: &'a Disk,
    catalog: CatalogIterator<'a>,
    names: NameAllocator,
}

impl<'a> Extractor<'a> {
    pub fn new(disk: &'a Disk) -> Extractor<'a> {
        Extractor {
            disk,
            catalog: disk.iter(),
            names: NameAllocator::new(),
        }
    }
}

impl<'a> Iterator for Extractor<'a> {
    type Item = io::Result<Extraction>;

    fn next(&mut self) -> Option<io::Result<Extraction>> {
        match self.catalog.next()? {
            Ok(entry) => {
                let stem = self.names.allocate(&entry.filename);
                Some(Ok(Extraction::run(self.disk, entry, stem)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Everything recovered from a disk.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub extractions: Vec<Extraction>,
    /// Set if the catalog walk stopped early.  Entries read before the
    /// failure are still in `extractions`.
    pub catalog_error: Option<io::Error>,
}

impl ExtractionReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.extractions.iter().flat_map(|x| x.artifacts.iter())
    }
}

/// Extract every cataloged file.
pub fn extract_all(disk: &Disk) -> ExtractionReport {
    let mut report = ExtractionReport::default();
    for result in Extractor::new(disk) {
        match result {
            Ok(extraction) => report.extractions.push(extraction),
            Err(e) => {
                report.catalog_error = Some(e);
                break;
            }
        }
    }
    report
}
