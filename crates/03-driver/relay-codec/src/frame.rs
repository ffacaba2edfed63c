//! Locating `[content]` frames in a line and re-encoding them for the
//! serial side.

use std::io::{self, Write};

use crate::crc::crc16;

/// Longest frame content forwarded; longer frames are ignored.
pub const MAX_CONTENT_LEN: usize = 99;

/// Strips trailing CR and LF bytes.
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |last| last + 1);
    &line[..end]
}

/// Content between the first `[` and the first `]` after it.
///
/// Returns `None` when either bracket is missing, the content is empty, or it
/// is longer than [`MAX_CONTENT_LEN`].
pub fn extract_frame(line: &[u8]) -> Option<&[u8]> {
    let open = line.iter().position(|&b| b == b'[')?;
    let rest = &line[open + 1..];
    let close = rest.iter().position(|&b| b == b']')?;
    let content = &rest[..close];
    (1..=MAX_CONTENT_LEN)
        .contains(&content.len())
        .then_some(content)
}

/// Writes `[content]` followed by its CRC as four uppercase hex digits
/// (high byte first) and a newline.
pub fn write_forward<W: Write + ?Sized>(out: &mut W, content: &[u8]) -> io::Result<()> {
    let mut framed = Vec::with_capacity(content.len() + 2);
    framed.push(b'[');
    framed.extend_from_slice(content);
    framed.push(b']');
    let [hi, lo] = crc16(&framed).to_be_bytes();

    framed.extend_from_slice(format!("{hi:02X}{lo:02X}\n").as_bytes());
    out.write_all(&framed)
}
