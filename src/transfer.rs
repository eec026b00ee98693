//! Moving files into the sorted tree.
//!
//! Both the classify pass (design files) and the label pass (label images)
//! either copy or move their inputs. Nothing in the sorted tree is ever
//! overwritten: a clashing name gets a numeric suffix instead.

use std::io;
use std::path::{Path, PathBuf};

/// Copy or move `from` to `to`.
pub fn transfer(from: &Path, to: &Path, copy: bool) -> io::Result<()> {
    if copy {
        std::fs::copy(from, to).map(drop)
    } else {
        move_file(from, to)
    }
}

/// Rename, falling back to copy + remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

/// First free path for `name` in `dir`: `name`, then `stem_1.ext`,
/// `stem_2.ext`, …
pub fn free_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
