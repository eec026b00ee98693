//! Centralized codec for exported stitch file names.
//!
//! Every face a design produces is exported under a fixed-width, nine
//! character ASCII name. Machine operators read these names off the
//! embroidery machine's display and off the stamped order labels, so the
//! layout is a durable contract: changing it requires bumping
//! [`FORMAT_VERSION`], which the export registry records in its header.
//!
//! ## Layout
//!
//! ```text
//! 055 A 3 F 09 j
//! │   │ │ │ │  └─ month letter (a = January … l = December, configurable)
//! │   │ │ │ └──── day of month, zero-padded
//! │   │ │ └────── face position (F front, L sleeve_left, R sleeve_right, S single)
//! │   │ └──────── face count (1 single, 2 or 3 multi-face)
//! │   └────────── owner bucket
//! └────────────── folder order, zero-padded (1–999)
//! ```
//!
//! The extension (`.dst`) is not part of the identity; [`FilenameCodec::file_name`]
//! appends it and [`FilenameCodec::decode_file_name`] strips it.
//!
//! Decoding is strict: every digit field must be numeric and every letter must
//! belong to its closed set. Anything else is [`DecodeError::Malformed`];
//! the decoder never guesses.

use crate::types::{FacePosition, OwnerBucket};
use chrono::{Datelike, NaiveDate};
use std::ops::Range;
use thiserror::Error;

/// Version of the name layout. Recorded in the export registry header.
pub const FORMAT_VERSION: u32 = 1;

/// Human-readable layout descriptor, recorded next to [`FORMAT_VERSION`].
pub const FORMAT_LAYOUT: &str = "XXXYLZMMD";

/// Length of an encoded name, without extension.
pub const NAME_LEN: usize = 9;

/// Largest folder order that fits the three-digit field.
pub const MAX_FOLDER_ORDER: u32 = 999;

pub const DEFAULT_MONTH_CODES: &str = "abcdefghijkl";
pub const DEFAULT_SINGLE_CODE: char = 'S';
pub const DEFAULT_EXTENSION: &str = "dst";

/// Position codes for the multi-face positions. Fixed; only the single code
/// is configurable.
const MULTI_CODES: [(FacePosition, char); 3] = [
    (FacePosition::Front, 'F'),
    (FacePosition::SleeveLeft, 'L'),
    (FacePosition::SleeveRight, 'R'),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("folder order {0} does not fit in three digits (max {MAX_FOLDER_ORDER})")]
    Overflow(u32),
    #[error("cannot encode filename: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed filename '{name}': {reason}")]
    Malformed { name: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid naming scheme: {0}")]
pub struct SchemeError(pub String);

/// Day and month of an export. The year is not part of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExportDay {
    day: u8,
    month: u8,
}

impl ExportDay {
    /// Build a day, rejecting impossible combinations. February accepts 29.
    pub fn new(day: u8, month: u8) -> Option<Self> {
        let valid = (1..=12).contains(&month) && day >= 1 && day <= max_day(month);
        valid.then_some(Self { day, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        // chrono guarantees day 1..=31 and month 1..=12.
        Self {
            day: date.day() as u8,
            month: date.month() as u8,
        }
    }

    pub fn day(self) -> u8 {
        self.day
    }

    pub fn month(self) -> u8 {
        self.month
    }
}

fn max_day(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Decoded components of an export name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenameParts {
    pub folder_order: u32,
    pub owner: OwnerBucket,
    pub face_count: u8,
    pub position: FacePosition,
    pub day: ExportDay,
}

/// Single-face designs carry count 1; multi-face positions carry 2 or 3.
fn check_face_shape(face_count: u8, position: FacePosition) -> Result<(), String> {
    match position {
        FacePosition::Single if face_count == 1 => Ok(()),
        FacePosition::Single => Err(format!(
            "single face must have face count 1, got {face_count}"
        )),
        _ if (2..=3).contains(&face_count) => Ok(()),
        _ => Err(format!(
            "{position} face must have face count 2 or 3, got {face_count}"
        )),
    }
}

/// Encoder/decoder bound to one naming scheme (owner set, month alphabet,
/// single code, extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameCodec {
    owners: Vec<OwnerBucket>,
    month_codes: [char; 12],
    single_code: char,
    extension: String,
}

impl Default for FilenameCodec {
    fn default() -> Self {
        let mut month_codes = ['a'; 12];
        for (slot, c) in month_codes.iter_mut().zip(DEFAULT_MONTH_CODES.chars()) {
            *slot = c;
        }
        Self {
            owners: "ABCD".chars().filter_map(OwnerBucket::new).collect(),
            month_codes,
            single_code: DEFAULT_SINGLE_CODE,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl FilenameCodec {
    pub fn new(
        owners: &[OwnerBucket],
        month_codes: &str,
        single_code: char,
        extension: &str,
    ) -> Result<Self, SchemeError> {
        if owners.is_empty() {
            return Err(SchemeError("at least one owner bucket is required".into()));
        }
        for (i, owner) in owners.iter().enumerate() {
            if owners[..i].contains(owner) {
                return Err(SchemeError(format!("owner {owner} is listed twice")));
            }
        }

        let letters: Vec<char> = month_codes.chars().collect();
        let codes: [char; 12] = letters.as_slice().try_into().map_err(|_| {
            SchemeError(format!(
                "month codes must be 12 letters, got {}",
                letters.len()
            ))
        })?;
        for (i, c) in codes.iter().enumerate() {
            if !c.is_ascii_lowercase() {
                return Err(SchemeError(format!(
                    "month code '{c}' must be a lowercase ASCII letter"
                )));
            }
            if codes[..i].contains(c) {
                return Err(SchemeError(format!("month code '{c}' is used twice")));
            }
        }

        if !single_code.is_ascii_uppercase() {
            return Err(SchemeError(format!(
                "single code '{single_code}' must be an uppercase ASCII letter"
            )));
        }
        if MULTI_CODES.iter().any(|(_, c)| *c == single_code) {
            return Err(SchemeError(format!(
                "single code '{single_code}' collides with a multi-face position code"
            )));
        }

        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SchemeError(format!(
                "extension '{extension}' must be non-empty and alphanumeric"
            )));
        }

        Ok(Self {
            owners: owners.to_vec(),
            month_codes: codes,
            single_code,
            extension: extension.to_string(),
        })
    }

    pub fn owners(&self) -> &[OwnerBucket] {
        &self.owners
    }

    pub fn month_codes(&self) -> String {
        self.month_codes.iter().collect()
    }

    pub fn single_code(&self) -> char {
        self.single_code
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn position_code(&self, position: FacePosition) -> char {
        MULTI_CODES
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, c)| *c)
            .unwrap_or(self.single_code)
    }

    fn position_from_code(&self, code: char) -> Option<FacePosition> {
        if code == self.single_code {
            return Some(FacePosition::Single);
        }
        MULTI_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(p, _)| *p)
    }

    /// Encode parts into the nine-character name (no extension).
    pub fn encode(&self, parts: &FilenameParts) -> Result<String, EncodeError> {
        if parts.folder_order > MAX_FOLDER_ORDER {
            return Err(EncodeError::Overflow(parts.folder_order));
        }
        if parts.folder_order == 0 {
            return Err(EncodeError::Invalid("folder order starts at 1".into()));
        }
        if !self.owners.contains(&parts.owner) {
            return Err(EncodeError::Invalid(format!(
                "owner {} is not a configured bucket",
                parts.owner
            )));
        }
        check_face_shape(parts.face_count, parts.position).map_err(EncodeError::Invalid)?;

        let month = self.month_codes[usize::from(parts.day.month - 1)];
        Ok(format!(
            "{:03}{}{}{}{:02}{}",
            parts.folder_order,
            parts.owner,
            parts.face_count,
            self.position_code(parts.position),
            parts.day.day,
            month
        ))
    }

    /// Encode and append the extension, e.g. `055A3F09j.dst`.
    pub fn file_name(&self, parts: &FilenameParts) -> Result<String, EncodeError> {
        Ok(format!("{}.{}", self.encode(parts)?, self.extension))
    }

    /// Decode a nine-character name (no extension).
    pub fn decode(&self, name: &str) -> Result<FilenameParts, DecodeError> {
        let malformed = |reason: String| DecodeError::Malformed {
            name: name.to_string(),
            reason,
        };

        if !name.is_ascii() {
            return Err(malformed("contains non-ASCII characters".into()));
        }
        if name.len() != NAME_LEN {
            return Err(malformed(format!(
                "expected {NAME_LEN} characters, got {}",
                name.len()
            )));
        }

        let digits = |range: Range<usize>, field: &str| -> Result<u32, DecodeError> {
            let text = &name[range];
            if !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed(format!("{field} '{text}' is not numeric")));
            }
            text.parse::<u32>()
                .map_err(|e| malformed(format!("{field} '{text}': {e}")))
        };
        let letter = |index: usize| char::from(name.as_bytes()[index]);

        let folder_order = digits(0..3, "folder order")?;
        if folder_order == 0 {
            return Err(malformed("folder order 000 is never assigned".into()));
        }

        let owner_code = letter(3);
        let owner = OwnerBucket::new(owner_code)
            .filter(|o| self.owners.contains(o))
            .ok_or_else(|| malformed(format!("unknown owner '{owner_code}'")))?;

        let face_count = digits(4..5, "face count")? as u8;

        let position_code = letter(5);
        let position = self
            .position_from_code(position_code)
            .ok_or_else(|| malformed(format!("unknown position code '{position_code}'")))?;
        check_face_shape(face_count, position).map_err(&malformed)?;

        let day = digits(6..8, "day")? as u8;

        let month_code = letter(8);
        let month = self
            .month_codes
            .iter()
            .position(|c| *c == month_code)
            .map(|i| i as u8 + 1)
            .ok_or_else(|| malformed(format!("unknown month letter '{month_code}'")))?;

        let day = ExportDay::new(day, month)
            .ok_or_else(|| malformed(format!("day {day} does not exist in month {month}")))?;

        Ok(FilenameParts {
            folder_order,
            owner,
            face_count,
            position,
            day,
        })
    }

    /// Decode a file name carrying this scheme's extension (case-insensitive).
    pub fn decode_file_name(&self, file_name: &str) -> Result<FilenameParts, DecodeError> {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case(&self.extension) => self.decode(stem),
            _ => Err(DecodeError::Malformed {
                name: file_name.to_string(),
                reason: format!("expected a .{} extension", self.extension),
            }),
        }
    }
}
