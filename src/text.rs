//! Apple II "high ASCII" text.
//!
//! The Apple II monitor and DOS store characters with bit 7 set (normal
//! video).  Clearing that bit recovers plain 7-bit ASCII.

/// Clear bit 7 of a byte and return it as a character.
#[inline]
pub fn strip_high_bit(byte: u8) -> char {
    (byte & 0x7F) as char
}

/// Decode a fixed-width, space-padded field such as a catalog filename.
/// Trailing spaces are padding; leading spaces are part of the name.
pub fn decode_padded(bytes: &[u8]) -> String {
    let text: String = bytes.iter().map(|&b| strip_high_bit(b)).collect();
    text.trim_end_matches(' ').to_string()
}

/// Recover the text of a DOS text (T) file.  Zero bytes pad the ends of
/// fixed-length records and the final sector, so they are dropped.
pub fn normalize_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| strip_high_bit(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high(text: &str) -> Vec<u8> {
        text.bytes().map(|b| b | 0x80).collect()
    }

    #[test]
    fn test_decode_padded() {
        let mut field = high("HELLO WORLD");
        field.resize(30, 0xA0);
        assert_eq!(decode_padded(&field), "HELLO WORLD");
        assert_eq!(decode_padded(&high("  INDENTED  ")), "  INDENTED");
        assert_eq!(decode_padded(&[0xA0; 30]), "");
    }

    #[test]
    fn test_normalize_text() {
        let mut bytes = high("LINE ONE\rLINE TWO\r");
        bytes.extend_from_slice(&[0u8; 12]);
        assert_eq!(normalize_text(&bytes), "LINE ONE\rLINE TWO\r");
        // Low ASCII passes through unchanged.
        assert_eq!(normalize_text(b"plain\x00text"), "plaintext");
        assert_eq!(normalize_text(&[0x80]), "\0");
    }
}
