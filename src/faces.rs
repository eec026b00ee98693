//! Face resolution: which physical faces a design produces.
//!
//! A garment item arrives as one file per face. The resolver turns the
//! scanned files of one item into an ordered face list:
//!
//! - one file → one `single` face, whatever the position word says
//!   (`front`, `back`, `chest` all stitch as a single hoop)
//! - several files → `front`, `sleeve_left`, `sleeve_right`, in that order
//!
//! Every returned face carries `face_count == faces.len()`. Anything the
//! resolver cannot place with certainty is a [`ResolveError`]; the caller
//! skips that design and reports the reason.

use crate::scan::SourceDesign;
use crate::types::{Face, FacePosition};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("design has no source files")]
    Empty,
    #[error("unsupported position '{0}' in a multi-face design")]
    UnsupportedPosition(String),
    #[error("position {0} appears more than once")]
    DuplicatePosition(FacePosition),
    #[error("declared {declared} faces but found {found} files")]
    FaceCountMismatch { declared: u8, found: usize },
    #[error("{0} faces exceed the three supported positions")]
    TooManyFaces(usize),
}

/// A resolved face together with the source file that stitches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignFace {
    pub face: Face,
    pub source: PathBuf,
}

/// Resolve the ordered faces of a design.
pub fn resolve(design: &SourceDesign) -> Result<Vec<DesignFace>, ResolveError> {
    let found = design.files.len();
    let first = design.files.first().ok_or(ResolveError::Empty)?;

    if let Some(file) = design
        .files
        .iter()
        .find(|f| usize::from(f.meta.total_faces) != found)
    {
        return Err(ResolveError::FaceCountMismatch {
            declared: file.meta.total_faces,
            found,
        });
    }

    if found == 1 {
        return Ok(vec![DesignFace {
            face: Face {
                position: FacePosition::Single,
                face_count: 1,
            },
            source: first.path.clone(),
        }]);
    }
    if found > FacePosition::MULTI.len() {
        return Err(ResolveError::TooManyFaces(found));
    }

    let mut faces = Vec::with_capacity(found);
    for file in &design.files {
        let position = FacePosition::from_source_word(&file.meta.position)
            .ok_or_else(|| ResolveError::UnsupportedPosition(file.meta.position.clone()))?;
        if faces.iter().any(|f: &DesignFace| f.face.position == position) {
            return Err(ResolveError::DuplicatePosition(position));
        }
        faces.push(DesignFace {
            face: Face {
                position,
                // Bounded by MULTI.len() above.
                face_count: found as u8,
            },
            source: file.path.clone(),
        });
    }
    faces.sort_by_key(|f| f.face.position);
    Ok(faces)
}
