use std::error;
use std::fmt;
use std::io;

/// Errors that can be returned from disk image operations.  These are
/// generally converted into `io::Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiskError {
    /// Unknown error
    Unknown,
    /// Track or sector outside the image geometry
    AddressOutOfRange,
    /// Cyclic chain, or a structurally invalid catalog or track/sector list
    CorruptImage,
    /// File type code not known to DOS 3.3
    UnknownFileType,
    /// Image size differs from the expected geometry
    SizeMismatch,
    /// Tokenized program ended before its end-of-program marker
    TruncatedProgram,
    /// File not found
    NotFound,
}

impl error::Error for DiskError {
    /// Provide terse descriptions of the errors.
    fn description(&self) -> &str {
        self.message()
    }
}

impl fmt::Display for DiskError {
    /// Provide human-readable descriptions of the errors
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.message())
    }
}

impl From<DiskError> for io::Error {
    fn from(error: DiskError) -> io::Error {
        use self::DiskError::*;
        use std::io::ErrorKind::*;
        match error {
            Unknown => io::Error::new(Other, error),
            AddressOutOfRange => io::Error::new(InvalidInput, error),
            CorruptImage => io::Error::new(InvalidData, error),
            UnknownFileType => io::Error::new(InvalidData, error),
            SizeMismatch => io::Error::new(InvalidData, error),
            TruncatedProgram => io::Error::new(UnexpectedEof, error),
            self::DiskError::NotFound => io::Error::new(io::ErrorKind::NotFound, error),
        }
    }
}

impl From<io::Error> for DiskError {
    fn from(error: io::Error) -> DiskError {
        match error.into_inner() {
            Some(e) => match e.downcast_ref::<DiskError>() {
                Some(disk_error) => disk_error.clone(),
                None => DiskError::Unknown,
            },
            None => DiskError::Unknown,
        }
    }
}

impl DiskError {
    /// If the provided `io::Error` contains a `DiskError`, return the
    /// underlying `DiskError`.  If not, return None.
    pub fn from_io_error(error: &io::Error) -> Option<DiskError> {
        error
            .get_ref()
            .and_then(|e| e.downcast_ref::<DiskError>())
            .cloned()
    }

    /// This is sometimes useful instead of .into() when the compiler doesn't
    /// have enough information to perform type inference.
    pub fn to_io_error(&self) -> io::Error {
        self.clone().into()
    }

    /// Provide terse descriptions of the errors.
    fn message(&self) -> &str {
        use self::DiskError::*;
        match *self {
            Unknown => "unknown error",
            AddressOutOfRange => "track or sector out of range",
            CorruptImage => "corrupt disk image",
            UnknownFileType => "unknown file type",
            SizeMismatch => "disk image size mismatch",
            TruncatedProgram => "program ends without an end-of-program marker",
            NotFound => "file not found",
        }
    }
}

impl PartialEq<io::Error> for DiskError {
    fn eq(&self, other: &io::Error) -> bool {
        matches!(DiskError::from_io_error(other), Some(ref e) if e == self)
    }
}

impl PartialEq<DiskError> for io::Error {
    fn eq(&self, other: &DiskError) -> bool {
        matches!(DiskError::from_io_error(self), Some(ref e) if e == other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_round_trip() {
        let e: io::Error = DiskError::CorruptImage.into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        assert_eq!(DiskError::from_io_error(&e), Some(DiskError::CorruptImage));
        assert!(e == DiskError::CorruptImage);
        assert!(e != DiskError::AddressOutOfRange);
        assert_eq!(DiskError::from(e), DiskError::CorruptImage);
    }

    #[test]
    fn test_foreign_io_error() {
        let e = io::Error::new(io::ErrorKind::Other, "something else");
        assert_eq!(DiskError::from_io_error(&e), None);
        assert_eq!(DiskError::from(e), DiskError::Unknown);
    }
}
