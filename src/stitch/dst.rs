//! Tajima DST reader, limited to what time estimation needs.
//!
//! A DST file is a 512-byte ASCII header followed by 3-byte stitch records:
//!
//! ```text
//! LA:055A3F09j       \r ST:   8123\r CO:  6\r +X: ... \x1a  (padded to 512)
//! ```
//!
//! The header gives the stitch and color change counts. Jumps and trims are
//! not in the header, so the record stream is scanned: the third byte of a
//! record flags jumps (`0x80`) and color changes (`0xC0`); `0xF3` ends the
//! design. Machines trim on a run of consecutive jumps.

use std::path::Path;
use thiserror::Error;

/// Fixed header size.
pub const HEADER_LEN: usize = 512;

/// Consecutive jumps that make a machine trim the thread.
pub const TRIM_JUMP_RUN: u32 = 3;

const RECORD_LEN: usize = 3;
const END_OF_DESIGN: u8 = 0xF3;
const HEADER_END: u8 = 0x1A;

#[derive(Error, Debug)]
pub enum DstError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is {0} bytes, shorter than the {HEADER_LEN}-byte DST header")]
    TooShort(usize),
    #[error("DST header has no {0} field")]
    MissingField(&'static str),
    #[error("DST header field {field} has non-numeric value '{value}'")]
    BadField { field: &'static str, value: String },
}

/// Counts that drive the machine time estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternStats {
    pub stitches: u32,
    pub color_changes: u32,
    pub trims: u32,
    pub jumps: u32,
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DstHeader {
    pub label: String,
    pub stitches: u32,
    pub color_changes: u32,
}

pub fn parse_header(bytes: &[u8]) -> Result<DstHeader, DstError> {
    if bytes.len() < HEADER_LEN {
        return Err(DstError::TooShort(bytes.len()));
    }
    let header = &bytes[..HEADER_LEN];
    let end = header
        .iter()
        .position(|&b| b == HEADER_END)
        .unwrap_or(HEADER_LEN);
    let text = String::from_utf8_lossy(&header[..end]);

    let field = |name: &'static str| -> Option<&str> {
        text.split('\r')
            .map(str::trim)
            .find_map(|part| part.strip_prefix(name))
    };
    let number = |name: &'static str| -> Result<u32, DstError> {
        let value = field(name).ok_or(DstError::MissingField(name))?.trim();
        value.parse().map_err(|_| DstError::BadField {
            field: name,
            value: value.to_string(),
        })
    };

    Ok(DstHeader {
        label: field("LA:").unwrap_or_default().trim().to_string(),
        stitches: number("ST:")?,
        color_changes: number("CO:")?,
    })
}

/// Header counts plus jumps and trims from the record stream.
pub fn pattern_stats(bytes: &[u8]) -> Result<PatternStats, DstError> {
    let header = parse_header(bytes)?;
    let mut stats = PatternStats {
        stitches: header.stitches,
        color_changes: header.color_changes,
        ..PatternStats::default()
    };

    let mut run = 0u32;
    for record in bytes[HEADER_LEN..].chunks_exact(RECORD_LEN) {
        let flags = record[2];
        if flags == END_OF_DESIGN {
            break;
        }
        if flags & 0xC0 == 0x80 {
            stats.jumps += 1;
            run += 1;
            continue;
        }
        if run >= TRIM_JUMP_RUN {
            stats.trims += 1;
        }
        run = 0;
    }
    if run >= TRIM_JUMP_RUN {
        stats.trims += 1;
    }
    Ok(stats)
}

pub fn read_stats(path: &Path) -> Result<PatternStats, DstError> {
    pattern_stats(&std::fs::read(path)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a DST file with the given header counts and record flag bytes.
    pub(crate) fn dst_bytes(stitches: u32, colors: u32, flags: &[u8]) -> Vec<u8> {
        let text = format!(
            "LA:{:<16}\rST:{:>7}\rCO:{:>3}\r+X:  100\r-X:  100\r",
            "test", stitches, colors
        );
        let mut bytes = text.into_bytes();
        bytes.push(HEADER_END);
        bytes.resize(HEADER_LEN, b' ');
        for &flag in flags {
            bytes.extend_from_slice(&[0, 0, flag]);
        }
        bytes.extend_from_slice(&[0, 0, END_OF_DESIGN]);
        bytes
    }

    #[test]
    fn parses_header_counts() {
        let header = parse_header(&dst_bytes(8123, 6, &[])).unwrap();
        assert_eq!(header.label, "test");
        assert_eq!(header.stitches, 8123);
        assert_eq!(header.color_changes, 6);
    }

    #[test]
    fn short_file_is_rejected() {
        assert!(matches!(parse_header(b"LA:x\r"), Err(DstError::TooShort(5))));
    }

    #[test]
    fn missing_and_bad_fields() {
        let mut bytes = b"LA:x\rCO:  2\r".to_vec();
        bytes.resize(HEADER_LEN, b' ');
        assert!(matches!(
            parse_header(&bytes),
            Err(DstError::MissingField("ST:"))
        ));

        let mut bytes = b"LA:x\rST:  abc\rCO:  2\r".to_vec();
        bytes.resize(HEADER_LEN, b' ');
        assert!(matches!(
            parse_header(&bytes),
            Err(DstError::BadField { field: "ST:", .. })
        ));
    }

    #[test]
    fn counts_jumps_and_trims() {
        let normal = 0x03;
        let jump = 0x83;
        let color = 0xC3;
        let flags = [
            normal, jump, normal, // lone jump
            jump, jump, jump, normal, // trim
            color, normal, jump, jump, jump, jump, // trailing trim
        ];
        let stats = pattern_stats(&dst_bytes(13, 1, &flags)).unwrap();
        assert_eq!(stats.stitches, 13);
        assert_eq!(stats.color_changes, 1);
        assert_eq!(stats.jumps, 8);
        assert_eq!(stats.trims, 2);
    }

    #[test]
    fn records_after_end_are_ignored() {
        let mut bytes = dst_bytes(1, 0, &[]);
        bytes.extend_from_slice(&[0, 0, 0x83]);
        assert_eq!(pattern_stats(&bytes).unwrap().jumps, 0);
    }
}
