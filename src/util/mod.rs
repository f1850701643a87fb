use std::fmt;

/// Write a hexdump of the provided byte slice.  The character column clears
/// bit 7 first, so Apple II high-bit text reads as text.
pub fn hexdump(f: &mut fmt::Formatter, prefix: &str, buffer: &[u8]) -> fmt::Result {
    const COLUMNS: usize = 16;
    if buffer.is_empty() {
        // For a zero-length buffer, at least print an offset instead of
        // nothing.
        return write!(f, "{}{:04x}: ", prefix, 0);
    }
    for (row_number, row) in buffer.chunks(COLUMNS).enumerate() {
        if row_number > 0 {
            writeln!(f)?;
        }
        write!(f, "{}{:04x}: ", prefix, row_number * COLUMNS)?;

        for b in row {
            write!(f, "{:02x} ", b)?;
        }
        for _ in row.len()..COLUMNS {
            write!(f, "   ")?;
        }

        for b in row {
            let c = match b & 0x7F {
                c @ 0x20..=0x7E => c as char,
                _ => '.',
            };
            write!(f, "{}", c)?;
        }
    }
    Ok(())
}

pub struct Hex<'a>(pub &'a [u8]);

impl<'a> fmt::Display for Hex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        hexdump(f, "", self.0)
    }
}

pub fn hex(bytes: &[u8]) -> Hex<'_> {
    Hex(bytes)
}
