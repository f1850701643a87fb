//! Applesoft BASIC detokenization.
//!
//! DOS 3.3 stores an Applesoft program as a two-byte program length followed
//! by the program image exactly as it sat in memory: a linked list of lines,
//! each holding a pointer to the next line, a line number, and a body in
//! which keywords have been replaced by single bytes in the range
//! 0x80..=0xEA.  A next-line pointer of zero ends the program.

use std::fmt;
use std::io;

use crate::disk::DiskError;

const LENGTH_FIELD_SIZE: usize = 2;
const QUOTE: u8 = 0x22;
const END_OF_LINE: u8 = 0x00;

pub const TOKEN_DATA: u8 = 0x83;
pub const TOKEN_REM: u8 = 0xB2;
pub const TOKEN_PRINT: u8 = 0xBA;

const FIRST_TOKEN: u8 = 0x80;

/// Keywords for token bytes 0x80 through 0xEA.
static TOKENS: [&str; 107] = [
    // 0x80
    "END", "FOR", "NEXT", "DATA", "INPUT", "DEL", "DIM", "READ", "GR", "TEXT", "PR#", "IN#",
    "CALL", "PLOT", "HLIN", "VLIN",
    // 0x90
    "HGR2", "HGR", "HCOLOR=", "HPLOT", "DRAW", "XDRAW", "HTAB", "HOME", "ROT=", "SCALE=",
    "SHLOAD", "TRACE", "NOTRACE", "NORMAL", "INVERSE", "FLASH",
    // 0xA0
    "COLOR=", "POP", "VTAB", "HIMEM:", "LOMEM:", "ONERR", "RESUME", "RECALL", "STORE", "SPEED=",
    "LET", "GOTO", "RUN", "IF", "RESTORE", "&",
    // 0xB0
    "GOSUB", "RETURN", "REM", "STOP", "ON", "WAIT", "LOAD", "SAVE", "DEF", "POKE", "PRINT",
    "CONT", "LIST", "CLEAR", "GET", "NEW",
    // 0xC0
    "TAB(", "TO", "FN", "SPC(", "THEN", "AT", "NOT", "STEP", "+", "-", "*", "/", "^", "AND",
    "OR", ">",
    // 0xD0
    "=", "<", "SGN", "INT", "ABS", "USR", "FRE", "SCRN(", "PDL", "POS", "SQR", "RND", "LOG",
    "EXP", "COS", "SIN",
    // 0xE0
    "TAN", "ATN", "PEEK", "LEN", "STR$", "VAL", "ASC", "CHR$", "LEFT$", "RIGHT$", "MID$",
];

/// Return the keyword for a token byte, if the byte is an assigned token.
pub fn token(byte: u8) -> Option<&'static str> {
    if byte < FIRST_TOKEN {
        return None;
    }
    TOKENS.get((byte - FIRST_TOKEN) as usize).copied()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Normal,
    InString,
    InRemOrData,
}

/// One decoded program line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramLine {
    pub number: u16,
    pub text: String,
}

impl fmt::Display for ProgramLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.number, self.text)
    }
}

/// A detokenized Applesoft program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    /// Program length as recorded by DOS ahead of the program image.
    pub length: u16,
    pub lines: Vec<ProgramLine>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Decode the body of one line, up to but not including its terminating
/// zero byte.
fn decode_body(body: &[u8]) -> String {
    let mut text = String::with_capacity(body.len() * 2);
    let mut state = State::Normal;
    for &byte in body {
        state = match state {
            State::InString => {
                text.push((byte & 0x7F) as char);
                if byte == QUOTE {
                    State::Normal
                } else {
                    State::InString
                }
            }
            State::InRemOrData => {
                text.push((byte & 0x7F) as char);
                State::InRemOrData
            }
            State::Normal => match byte {
                QUOTE => {
                    text.push('"');
                    State::InString
                }
                0x20..=0x7E => {
                    text.push(byte as char);
                    State::Normal
                }
                0x80..=0xFF => match token(byte) {
                    Some(keyword) => {
                        text.push_str(keyword);
                        if byte == TOKEN_REM || byte == TOKEN_DATA {
                            State::InRemOrData
                        } else {
                            State::Normal
                        }
                    }
                    None => {
                        text.push_str(&format!("<${:02X}>", byte));
                        State::Normal
                    }
                },
                // Control codes and DEL
                _ => State::Normal,
            },
        };
    }
    text
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// Detokenize the raw contents of an Applesoft (A) file.  Bytes after the
/// end-of-program marker are ignored.  If the data ends before that marker
/// is found, the result is `DiskError::TruncatedProgram`.
pub fn detokenize(bytes: &[u8]) -> io::Result<Program> {
    let truncated = || -> io::Error { DiskError::TruncatedProgram.into() };

    let length = read_u16(bytes, 0).ok_or_else(truncated)?;
    let mut offset = LENGTH_FIELD_SIZE;
    let mut lines = vec![];
    loop {
        let next = read_u16(bytes, offset).ok_or_else(truncated)?;
        if next == 0 {
            break;
        }
        let number = read_u16(bytes, offset + 2).ok_or_else(truncated)?;
        let body_start = offset + 4;
        let body = bytes.get(body_start..).ok_or_else(truncated)?;
        let body_len = body
            .iter()
            .position(|&b| b == END_OF_LINE)
            .ok_or_else(truncated)?;
        lines.push(ProgramLine {
            number,
            text: decode_body(&body[..body_len]),
        });
        offset = body_start + body_len + 1;
    }
    tracing::debug!("detokenized {} lines ({} bytes)", lines.len(), length);
    Ok(Program { length, lines })
}
