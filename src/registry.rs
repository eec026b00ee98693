//! Export registry: the authoritative record of every exported face.
//!
//! Each converted face is written here once, linking the design's content
//! fingerprint to the machine file name it was exported under. The label pass
//! reads it back to find the names to stamp; nothing else decides what a
//! design was called.
//!
//! ## Storage
//!
//! An append-only JSON-lines log at `<sorted>/output/export_registry.jsonl`.
//! The first line describes the naming scheme the records were written with:
//!
//! ```text
//! {"kind":"header","version":1,"format":"XXXYLZMMD","month_codes":"abcdefghijkl","single_code":"S","owners":"ABCD"}
//! {"kind":"record","fingerprint":"3edc…","filename":"055A3F09j","owner_bucket":"A",…}
//! {"kind":"record","fingerprint":"3edc…","filename":"055A3L09j","owner_bucket":"A",…}
//! ```
//!
//! Opening the log under a different scheme fails with
//! [`RegistryError::SchemeMismatch`]: the old names would no longer decode.
//! Owners may be added to the configuration later; removing one that the
//! header or any record names is a mismatch too.
//!
//! ## Durability
//!
//! [`ExportRegistry::record`] appends one line and syncs it before returning,
//! and only then updates the in-memory indices. A pass interrupted mid-write
//! leaves at most one torn final line without a newline; loading drops it
//! with a warning (the writer also truncates it away). Any other line that
//! fails to parse is [`RegistryError::Corrupt`].

use crate::fingerprint::Fingerprint;
use crate::naming::{ExportDay, FORMAT_LAYOUT, FORMAT_VERSION, FilenameCodec};
use crate::types::{FacePosition, OwnerBucket};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the registry file within the output directory.
pub const REGISTRY_FILENAME: &str = "export_registry.jsonl";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export registry not found: {0}")]
    Missing(PathBuf),
    #[error("export registry line {line} is corrupt: {reason}")]
    Corrupt { line: usize, reason: String },
    #[error("export registry was written with scheme [{found}], current scheme is [{expected}]")]
    SchemeMismatch { expected: String, found: String },
    #[error("filename {filename} is already registered with different contents")]
    DuplicateFilename { filename: String },
    #[error("record {filename} is inconsistent: {reason}")]
    Inconsistent { filename: String, reason: String },
    #[error("export registry was opened read-only")]
    ReadOnly,
}

/// One exported face. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub fingerprint: Fingerprint,
    /// Encoded name without extension, unique across the registry.
    pub filename: String,
    pub owner_bucket: OwnerBucket,
    pub folder_order: u32,
    pub face_count: u8,
    pub position: FacePosition,
    pub export_date: NaiveDate,
}

/// Naming scheme the log was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryHeader {
    pub version: u32,
    pub format: String,
    pub month_codes: String,
    pub single_code: char,
    /// Owner letters configured when the log was created.
    #[serde(default)]
    pub owners: String,
}

impl RegistryHeader {
    pub fn for_codec(codec: &FilenameCodec) -> Self {
        Self {
            version: FORMAT_VERSION,
            format: FORMAT_LAYOUT.to_string(),
            month_codes: codec.month_codes(),
            single_code: codec.single_code(),
            owners: owner_letters(codec.owners()),
        }
    }

    /// Same name layout, and every owner of `self` still in `current`.
    fn accepts(&self, current: &RegistryHeader) -> bool {
        self.version == current.version
            && self.format == current.format
            && self.month_codes == current.month_codes
            && self.single_code == current.single_code
            && self.owners.chars().all(|c| current.owners.contains(c))
    }

    fn describe(&self) -> String {
        format!(
            "v{} {} months={} single={} owners={}",
            self.version, self.format, self.month_codes, self.single_code, self.owners
        )
    }
}

fn owner_letters(owners: &[OwnerBucket]) -> String {
    owners.iter().map(|o| o.as_char()).collect()
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line {
    Header(RegistryHeader),
    Record(ExportRecord),
}

/// Result of a successful [`ExportRegistry::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    /// An identical record was already present; nothing was written.
    AlreadyPresent,
}

/// Loaded registry with lookup indices. Opened either as the writer
/// ([`ExportRegistry::open`]) or as a reader ([`ExportRegistry::read`]).
#[derive(Debug)]
pub struct ExportRegistry {
    path: PathBuf,
    codec: FilenameCodec,
    file: Option<File>,
    records: Vec<ExportRecord>,
    by_filename: HashMap<String, usize>,
    by_fingerprint: HashMap<Fingerprint, Vec<usize>>,
}

/// Parsed log contents.
struct Parsed {
    header_seen: bool,
    /// With their one-based line numbers.
    records: Vec<(usize, ExportRecord)>,
    /// Byte length of the intact prefix.
    valid_len: usize,
    /// The last record is intact but its newline was lost.
    needs_newline: bool,
}

impl ExportRegistry {
    /// Open the registry for appending, creating it if absent.
    pub fn open(output_dir: &Path, codec: &FilenameCodec) -> Result<Self, RegistryError> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(REGISTRY_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let parsed = parse_log(&content, codec)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        if parsed.valid_len < content.len() {
            warn!(
                path = %path.display(),
                bytes = content.len() - parsed.valid_len,
                "truncating torn final registry line"
            );
            file.set_len(parsed.valid_len as u64)?;
            file.sync_all()?;
        }
        if parsed.needs_newline {
            file.write_all(b"\n")?;
            file.sync_data()?;
        }
        if !parsed.header_seen {
            let header = Line::Header(RegistryHeader::for_codec(codec));
            append_line(&mut file, &header)?;
        }

        let mut registry = Self::empty(path, codec);
        registry.file = Some(file);
        registry.index(parsed.records)?;
        Ok(registry)
    }

    /// Load the registry read-only. A missing file is an error: there is
    /// nothing to read before the first export pass.
    pub fn read(output_dir: &Path, codec: &FilenameCodec) -> Result<Self, RegistryError> {
        let path = output_dir.join(REGISTRY_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::Missing(path));
            }
            Err(e) => return Err(e.into()),
        };
        let parsed = parse_log(&content, codec)?;
        if parsed.valid_len < content.len() {
            warn!(path = %path.display(), "ignoring torn final registry line");
        }
        let mut registry = Self::empty(path, codec);
        registry.index(parsed.records)?;
        Ok(registry)
    }

    fn empty(path: PathBuf, codec: &FilenameCodec) -> Self {
        Self {
            path,
            codec: codec.clone(),
            file: None,
            records: Vec::new(),
            by_filename: HashMap::new(),
            by_fingerprint: HashMap::new(),
        }
    }

    fn index(&mut self, records: Vec<(usize, ExportRecord)>) -> Result<(), RegistryError> {
        for (line, record) in records {
            if !self.codec.owners().contains(&record.owner_bucket) {
                return Err(RegistryError::SchemeMismatch {
                    expected: RegistryHeader::for_codec(&self.codec).describe(),
                    found: format!("line {line} records owner {}", record.owner_bucket),
                });
            }
            check_record(&self.codec, &record)
                .map_err(|reason| RegistryError::Corrupt { line, reason })?;
            match self.by_filename.get(&record.filename) {
                Some(&idx) if same_bytes(&self.records[idx], &record)? => {}
                Some(_) => {
                    return Err(RegistryError::DuplicateFilename {
                        filename: record.filename,
                    });
                }
                None => self.insert(record),
            }
        }
        debug!(path = %self.path.display(), records = self.records.len(), "loaded export registry");
        Ok(())
    }

    fn insert(&mut self, record: ExportRecord) {
        let idx = self.records.len();
        self.by_filename.insert(record.filename.clone(), idx);
        self.by_fingerprint
            .entry(record.fingerprint.clone())
            .or_default()
            .push(idx);
        self.records.push(record);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. Durable once this returns `Ok`.
    pub fn record(&mut self, record: ExportRecord) -> Result<Recorded, RegistryError> {
        if let Some(&idx) = self.by_filename.get(&record.filename) {
            return if same_bytes(&self.records[idx], &record)? {
                Ok(Recorded::AlreadyPresent)
            } else {
                Err(RegistryError::DuplicateFilename {
                    filename: record.filename,
                })
            };
        }
        check_record(&self.codec, &record).map_err(|reason| RegistryError::Inconsistent {
            filename: record.filename.clone(),
            reason,
        })?;

        let file = self.file.as_mut().ok_or(RegistryError::ReadOnly)?;
        let line = Line::Record(record);
        append_line(file, &line)?;
        if let Line::Record(record) = line {
            debug!(filename = %record.filename, fingerprint = %record.fingerprint, "recorded export");
            self.insert(record);
        }
        Ok(Recorded::Appended)
    }

    /// All records of a design, in face order.
    pub fn query_by_fingerprint(&self, fingerprint: &Fingerprint) -> Vec<&ExportRecord> {
        let mut records: Vec<&ExportRecord> = self
            .by_fingerprint
            .get(fingerprint)
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.position);
        records
    }

    pub fn find_face(
        &self,
        fingerprint: &Fingerprint,
        position: FacePosition,
    ) -> Option<&ExportRecord> {
        self.by_fingerprint
            .get(fingerprint)?
            .iter()
            .map(|&i| &self.records[i])
            .find(|r| r.position == position)
    }

    /// Records in the order they were written.
    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn append_line(file: &mut File, line: &Line) -> Result<(), RegistryError> {
    let mut text = serde_json::to_string(line)?;
    text.push('\n');
    file.write_all(text.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

fn same_bytes(a: &ExportRecord, b: &ExportRecord) -> Result<bool, RegistryError> {
    Ok(serde_json::to_string(a)? == serde_json::to_string(b)?)
}

/// The filename must decode to exactly the fields stored next to it.
fn check_record(codec: &FilenameCodec, record: &ExportRecord) -> Result<(), String> {
    let parts = codec.decode(&record.filename).map_err(|e| e.to_string())?;
    let day = ExportDay::from_date(record.export_date);
    let matches = parts.folder_order == record.folder_order
        && parts.owner == record.owner_bucket
        && parts.face_count == record.face_count
        && parts.position == record.position
        && parts.day == day;
    if matches {
        Ok(())
    } else {
        Err(format!(
            "filename does not match its fields ({} {} {} {} {})",
            record.folder_order,
            record.owner_bucket,
            record.face_count,
            record.position,
            record.export_date
        ))
    }
}

fn parse_log(content: &str, codec: &FilenameCodec) -> Result<Parsed, RegistryError> {
    let expected = RegistryHeader::for_codec(codec);
    let mut parsed = Parsed {
        header_seen: false,
        records: Vec::new(),
        valid_len: 0,
        needs_newline: false,
    };

    for (idx, segment) in content.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let complete = segment.ends_with('\n');
        let text = segment.trim_end_matches(['\n', '\r']);
        if text.trim().is_empty() {
            if complete {
                parsed.valid_len += segment.len();
            }
            continue;
        }

        let line = match serde_json::from_str::<Line>(text) {
            Ok(line) => line,
            Err(_) if !complete => {
                warn!(line = line_no, "dropping torn final registry line");
                break;
            }
            Err(e) => {
                return Err(RegistryError::Corrupt {
                    line: line_no,
                    reason: e.to_string(),
                });
            }
        };

        match line {
            Line::Header(header) if !parsed.header_seen => {
                if !header.accepts(&expected) {
                    return Err(RegistryError::SchemeMismatch {
                        expected: expected.describe(),
                        found: header.describe(),
                    });
                }
                parsed.header_seen = true;
            }
            Line::Header(_) => {
                return Err(RegistryError::Corrupt {
                    line: line_no,
                    reason: "second header".into(),
                });
            }
            Line::Record(_) if !parsed.header_seen => {
                return Err(RegistryError::Corrupt {
                    line: line_no,
                    reason: "record before header".into(),
                });
            }
            Line::Record(record) => parsed.records.push((line_no, record)),
        }
        parsed.valid_len += segment.len();
        parsed.needs_newline = !complete;
    }
    Ok(parsed)
}
