//! Ingest scan: discover design files and label images.
//!
//! First step of every pass that reads the download directories. Design files
//! arrive from the order system one file per garment face, named:
//!
//! ```text
//! ORDER_ITEM_POSITION_SIZE_GARMENT_TOTAL_CURRENT_item_N.pes
//! 1997_2282_front_L_Sweatshirt_1_1_item_1.pes
//! 2150_2448_sleeve_left_L_Sweatshirt_3_2_item_1.pes
//! ```
//!
//! - `ORDER` / `ITEM`: order id and item id (one garment)
//! - `POSITION`: placement word, may itself contain `_` (`sleeve_left`)
//! - `TOTAL` / `CURRENT`: declared face count and this file's face index
//! - `item_N`: number of items in the order
//!
//! Files are grouped by `(ORDER, ITEM)` into [`SourceDesign`]s. Files whose
//! names don't follow the pattern carry no design metadata; they are reported
//! as skipped, never guessed at.
//!
//! Label images are named `ORDER_ITEM_..._item_N.png`; only the ids are read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

pub const DESIGN_EXTENSION: &str = "pes";
pub const LABEL_EXTENSIONS: &[&str] = &["png"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Directory not found: {0}")]
    MissingDir(PathBuf),
}

/// Metadata parsed from a design filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignFileMeta {
    pub order_id: u64,
    pub item_id: u64,
    /// Raw position word as written in the filename.
    pub position: String,
    pub size: String,
    pub garment: String,
    pub total_faces: u8,
    pub current_face: u8,
    pub item_count: u32,
}

/// A design file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scanned root.
    pub relative: PathBuf,
    pub meta: DesignFileMeta,
}

/// All files of one garment item: the unit the face resolver works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDesign {
    pub order_id: u64,
    pub item_id: u64,
    /// Sorted by declared face index, then by file name.
    pub files: Vec<SourceFile>,
}

impl SourceDesign {
    /// `ORDER_ITEM`, used as the subject in reports.
    pub fn key(&self) -> String {
        format!("{}_{}", self.order_id, self.item_id)
    }

    /// First directory component under the scan root, if any.
    pub fn directory_hint(&self) -> Option<&str> {
        self.files.iter().find_map(|f| {
            let mut components = f.relative.components();
            let first = components.next()?;
            // A bare file name has no directory component.
            components.next()?;
            first.as_os_str().to_str()
        })
    }
}

/// Result of scanning the design directory.
#[derive(Debug, Default)]
pub struct DesignScan {
    pub designs: Vec<SourceDesign>,
    /// Design files without usable metadata, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Ids parsed from a label filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelFileMeta {
    pub order_id: u64,
    pub item_id: u64,
    pub item_count: Option<u32>,
}

fn strip_extension<'a>(name: &'a str, extension: &str) -> Option<&'a str> {
    let (stem, ext) = name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case(extension).then_some(stem)
}

fn parse_id(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Parse a design filename.
///
/// Handles these patterns:
/// - `"1997_2282_front_L_Sweatshirt_1_1_item_1.pes"` → position `front`
/// - `"2150_2448_sleeve_left_L_Sweatshirt_3_2_item_1.pes"` → position `sleeve_left`
/// - `"notes.pes"`, `"1997_front.pes"` → `None`
pub fn parse_design_file_name(name: &str) -> Option<DesignFileMeta> {
    let stem = strip_extension(name, DESIGN_EXTENSION)?;
    let parts: Vec<&str> = stem.split('_').collect();
    let n = parts.len();
    // order, item, position (≥1 part), size, garment, total, current, "item", N
    if n < 9 || !parts[n - 2].eq_ignore_ascii_case("item") {
        return None;
    }
    let position = parts[2..n - 6].join("_");
    if position.is_empty() || parts[n - 6].is_empty() || parts[n - 5].is_empty() {
        return None;
    }
    Some(DesignFileMeta {
        order_id: parse_id(parts[0])?,
        item_id: parse_id(parts[1])?,
        position,
        size: parts[n - 6].to_string(),
        garment: parts[n - 5].to_string(),
        total_faces: u8::try_from(parse_id(parts[n - 4])?).ok()?,
        current_face: u8::try_from(parse_id(parts[n - 3])?).ok()?,
        item_count: u32::try_from(parse_id(parts[n - 1])?).ok()?,
    })
}

/// Parse a label filename: `ORDER_ITEM_..._item_N.png`.
///
/// The `item_N` suffix is optional; the two leading ids are not.
pub fn parse_label_file_name(name: &str) -> Option<LabelFileMeta> {
    let stem = LABEL_EXTENSIONS
        .iter()
        .find_map(|ext| strip_extension(name, ext))?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let n = parts.len();
    let item_count = if n >= 4 && parts[n - 2].eq_ignore_ascii_case("item") {
        parse_id(parts[n - 1]).and_then(|c| u32::try_from(c).ok())
    } else {
        None
    };
    Some(LabelFileMeta {
        order_id: parse_id(parts[0])?,
        item_id: parse_id(parts[1])?,
        item_count,
    })
}

/// Recursively scan `root` for design files and group them by item.
pub fn scan_designs(root: &Path) -> Result<DesignScan, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingDir(root.to_path_buf()));
    }

    let mut groups: BTreeMap<(u64, u64), Vec<SourceFile>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if strip_extension(name, DESIGN_EXTENSION).is_none() {
            continue;
        }
        let path = entry.path().to_path_buf();
        match parse_design_file_name(name) {
            Some(meta) => {
                debug!(file = %path.display(), order = meta.order_id, item = meta.item_id, "design file");
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                groups
                    .entry((meta.order_id, meta.item_id))
                    .or_default()
                    .push(SourceFile {
                        path,
                        relative,
                        meta,
                    });
            }
            None => skipped.push((path, "design metadata absent: unrecognised file name".into())),
        }
    }

    let designs = groups
        .into_iter()
        .map(|((order_id, item_id), mut files)| {
            files.sort_by(|a, b| {
                a.meta
                    .current_face
                    .cmp(&b.meta.current_face)
                    .then_with(|| a.path.cmp(&b.path))
            });
            SourceDesign {
                order_id,
                item_id,
                files,
            }
        })
        .collect();

    Ok(DesignScan { designs, skipped })
}

/// List label images directly inside `dir`, sorted by name.
pub fn list_labels(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDir(dir.to_path_buf()));
    }
    let mut labels = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_label = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| LABEL_EXTENSIONS.iter().any(|l| e.eq_ignore_ascii_case(l)));
        if is_label {
            labels.push(path);
        }
    }
    labels.sort();
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_file;
    use tempfile::TempDir;

    // =========================================================================
    // Filename parsing
    // =========================================================================

    #[test]
    fn parses_single_word_position() {
        let m = parse_design_file_name("1997_2282_front_L_Sweatshirt_1_1_item_1.pes").unwrap();
        assert_eq!(m.order_id, 1997);
        assert_eq!(m.item_id, 2282);
        assert_eq!(m.position, "front");
        assert_eq!(m.size, "L");
        assert_eq!(m.garment, "Sweatshirt");
        assert_eq!((m.total_faces, m.current_face, m.item_count), (1, 1, 1));
    }

    #[test]
    fn parses_position_with_underscore() {
        let m = parse_design_file_name("2150_2448_sleeve_left_L_Sweatshirt_3_2_item_4.PES").unwrap();
        assert_eq!(m.position, "sleeve_left");
        assert_eq!((m.total_faces, m.current_face, m.item_count), (3, 2, 4));
    }

    #[test]
    fn rejects_names_without_metadata() {
        for name in [
            "notes.pes",
            "1997_front.pes",
            "1997_2282_front_L_Sweatshirt_1_1_item_1.dst",
            "x997_2282_front_L_Sweatshirt_1_1_item_1.pes",
            "1997_2282_front_L_Sweatshirt_1_1_items_1.pes",
            "1997_2282_front_L_Sweatshirt_one_1_item_1.pes",
            "1997_2282_front_L_Sweatshirt_999_1_item_1.pes",
        ] {
            assert_eq!(parse_design_file_name(name), None, "{name}");
        }
    }

    #[test]
    fn parses_label_ids() {
        let m = parse_label_file_name("2149_2445_1_1_item_3.png").unwrap();
        assert_eq!((m.order_id, m.item_id, m.item_count), (2149, 2445, Some(3)));
        let m = parse_label_file_name("2149_2445.PNG").unwrap();
        assert_eq!(m.item_count, None);
        assert_eq!(parse_label_file_name("label.png"), None);
        assert_eq!(parse_label_file_name("2149_2445_1_1_item_3.jpg"), None);
    }

    // =========================================================================
    // Directory scanning
    // =========================================================================

    #[test]
    fn groups_files_by_item_in_face_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_file(root, "2150_2448_sleeve_right_L_Tee_3_3_item_1.pes", b"r");
        write_file(root, "2150_2448_front_L_Tee_3_1_item_1.pes", b"f");
        write_file(root, "2150_2448_sleeve_left_L_Tee_3_2_item_1.pes", b"l");
        write_file(root, "B/1997_2282_front_L_Tee_1_1_item_1.pes", b"x");
        write_file(root, "readme.pes", b"?");
        write_file(root, "photo.jpg", b"?");

        let scan = scan_designs(root).unwrap();
        assert_eq!(scan.designs.len(), 2);
        assert_eq!(scan.skipped.len(), 1);

        let first = &scan.designs[0];
        assert_eq!(first.key(), "1997_2282");
        assert_eq!(first.directory_hint(), Some("B"));

        let second = &scan.designs[1];
        let positions: Vec<&str> = second.files.iter().map(|f| f.meta.position.as_str()).collect();
        assert_eq!(positions, ["front", "sleeve_left", "sleeve_right"]);
        assert_eq!(second.directory_hint(), None);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            scan_designs(&tmp.path().join("nope")),
            Err(ScanError::MissingDir(_))
        ));
    }

    #[test]
    fn lists_only_png_labels() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "2_2_1_1_item_1.png", b"");
        write_file(tmp.path(), "1_1_1_1_item_1.png", b"");
        write_file(tmp.path(), "notes.txt", b"");
        write_file(tmp.path(), "sub/3_3_1_1_item_1.png", b"");

        let labels = list_labels(tmp.path()).unwrap();
        let names: Vec<_> = labels
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["1_1_1_1_item_1.png", "2_2_1_1_item_1.png"]);
    }
}
