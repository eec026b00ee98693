//! Shared test utilities for the stitchflow test suite.
//!
//! Builds design and label fixtures on disk (or in memory) with the file
//! naming the order system uses, so tests read like the directories they
//! describe:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! // three-face sweatshirt, item 2448 of order 2150
//! write_design(tmp.path(), "", 2150, 2448, &["front", "sleeve_left", "sleeve_right"], b"logo");
//! write_label(tmp.path(), 2150, 2448);
//! ```

use crate::scan::{DesignFileMeta, SourceDesign, SourceFile, parse_design_file_name};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Files on disk
// =========================================================================

/// Write `bytes` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Design file name as the order system writes it.
pub fn design_file_name(order: u64, item: u64, position: &str, total: usize, current: usize) -> String {
    format!("{order}_{item}_{position}_L_Sweatshirt_{total}_{current}_item_1.pes")
}

/// Write one file per position under `root/dir`. File contents are
/// `content` plus the position, so equal `content` means an equal design.
pub fn write_design(
    root: &Path,
    dir: &str,
    order: u64,
    item: u64,
    positions: &[&str],
    content: &[u8],
) -> Vec<PathBuf> {
    positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let name = design_file_name(order, item, position, positions.len(), i + 1);
            let rel = if dir.is_empty() {
                name
            } else {
                format!("{dir}/{name}")
            };
            let mut bytes = content.to_vec();
            bytes.extend_from_slice(position.as_bytes());
            write_file(root, &rel, &bytes)
        })
        .collect()
}

/// Write a small PNG label for an item.
pub fn write_label(dir: &Path, order: u64, item: u64) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{order}_{item}_1_1_item_1.png"));
    RgbaImage::from_pixel(120, 60, Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

// =========================================================================
// In-memory fixtures
// =========================================================================

/// A scanned design without files behind it. Each entry is
/// `(position word, declared total faces)`.
pub fn source_design(order: u64, item: u64, faces: &[(&str, u8)]) -> SourceDesign {
    let files = faces
        .iter()
        .enumerate()
        .map(|(i, (position, total))| {
            let name = design_file_name(order, item, position, usize::from(*total), i + 1);
            let meta = parse_design_file_name(&name).unwrap_or_else(|| DesignFileMeta {
                order_id: order,
                item_id: item,
                position: position.to_string(),
                size: "L".into(),
                garment: "Sweatshirt".into(),
                total_faces: *total,
                current_face: (i + 1) as u8,
                item_count: 1,
            });
            SourceFile {
                path: PathBuf::from("/designs").join(&name),
                relative: PathBuf::from(&name),
                meta,
            }
        })
        .collect();
    SourceDesign {
        order_id: order,
        item_id: item,
        files,
    }
}
