//! Export pass: classified designs → machine stitch files + registry.
//!
//! ```text
//! sorted/output/classification.json + identity.json
//!   → for each design (parallel):
//!       encode a name per face         055A3F09j, 055A3L09j, 055A3R09j
//!       convert pes → sorted/A/dst/055A3F09j.dst
//!       record {fingerprint, filename, …} in export_registry.jsonl
//! ```
//!
//! The identity ledger is the source of owner and folder order; the
//! classification manifest only says where the source files are. Several
//! items carrying the same design are exported once.
//!
//! Faces already in the registry are not converted again, so re-running the
//! pass is a no-op for finished designs and picks up where an interrupted
//! run stopped. A face is recorded right after its file is converted; each
//! recorded face is durable.
//!
//! Per-design problems (names that don't fit the format, converter
//! failures, a changed face layout) fail that design only. Registry
//! corruption aborts the pass.

use crate::classify::{self, ClassificationManifest, ClassifiedDesign, ClassifyError};
use crate::config::{ConfigError, FlowConfig};
use crate::identity::{IdentityError, IdentityLedger};
use crate::naming::{EncodeError, ExportDay, FilenameCodec, FilenameParts};
use crate::registry::{ExportRecord, ExportRegistry, RegistryError};
use crate::report::RunReport;
use crate::stitch::{ConvertError, StitchConverter};
use crate::types::{FacePosition, OwnerBucket};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Subdirectory of an owner folder that receives converted files.
pub const STITCH_DIR: &str = "dst";

/// Errors that abort the export pass.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no classification manifest at {0}: run classify first")]
    MissingManifest(PathBuf),
    #[error("classification manifest: {0}")]
    Manifest(#[from] ClassifyError),
    #[error("identity ledger: {0}")]
    Identity(#[from] IdentityError),
    #[error("export registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single design was not exported.
#[derive(Error, Debug)]
pub enum DesignError {
    #[error("design {0} is not in the identity ledger")]
    Unassigned(String),
    #[error("face layout changed: {recorded} exported before, {current} now")]
    FaceLayoutChanged { recorded: String, current: String },
    #[error("cannot encode filename: {0}")]
    Encode(#[from] EncodeError),
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Not a per-design problem: aborts the pass.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// `3 faces (front, sleeve_left)`
fn describe_layout(face_count: u8, positions: impl Iterator<Item = FacePosition>) -> String {
    let positions: Vec<&str> = positions.map(FacePosition::as_str).collect();
    let noun = if face_count == 1 { "face" } else { "faces" };
    format!("{face_count} {noun} ({})", positions.join(", "))
}

/// `<sorted>/<owner>/dst`
pub fn stitch_dir(sorted_dir: &Path, owner: OwnerBucket) -> PathBuf {
    sorted_dir.join(owner.to_string()).join(STITCH_DIR)
}

/// Run the export pass with names dated `date`.
pub fn export(
    sorted_dir: &Path,
    config: &FlowConfig,
    converter: &impl StitchConverter,
    date: NaiveDate,
) -> Result<RunReport, ExportError> {
    let output = classify::output_dir(sorted_dir);
    let manifest = ClassificationManifest::load(&output)?
        .ok_or_else(|| ExportError::MissingManifest(output.join(classify::MANIFEST_FILENAME)))?;
    let ledger = IdentityLedger::load(&output)?;
    let codec = config.codec()?;
    let registry = Mutex::new(ExportRegistry::open(&output, &codec)?);

    let mut seen = HashSet::new();
    let designs: Vec<&ClassifiedDesign> = manifest
        .designs
        .iter()
        .filter(|d| seen.insert(d.fingerprint.clone()))
        .collect();
    info!(designs = designs.len(), %date, "exporting");

    let ctx = ExportContext {
        sorted_dir,
        ledger: &ledger,
        codec: &codec,
        registry: &registry,
        converter,
        day: ExportDay::from_date(date),
        date,
    };
    let results: Vec<(String, Result<DesignResult, RegistryError>)> = designs
        .par_iter()
        .map(|design| (design.key(), ctx.export_design(design)))
        .collect();

    let mut report = RunReport::new("export");
    for (key, result) in results {
        match result? {
            DesignResult::Exported(names) => report.succeeded(key, names.join(" ")),
            DesignResult::AlreadyExported => report.skipped(key, "already exported"),
            DesignResult::Failed(e) => {
                warn!(design = %key, error = %e, "export failed");
                report.failed(key, e.to_string());
            }
        }
    }
    info!(%report, "export pass finished");
    Ok(report)
}

enum DesignResult {
    Exported(Vec<String>),
    AlreadyExported,
    Failed(DesignError),
}

struct ExportContext<'a, C> {
    sorted_dir: &'a Path,
    ledger: &'a IdentityLedger,
    codec: &'a FilenameCodec,
    registry: &'a Mutex<ExportRegistry>,
    converter: &'a C,
    day: ExportDay,
    date: NaiveDate,
}

impl<C: StitchConverter> ExportContext<'_, C> {
    /// Registry errors abort the pass; anything else fails the design.
    fn export_design(&self, design: &ClassifiedDesign) -> Result<DesignResult, RegistryError> {
        match self.try_export(design) {
            Ok(result) => Ok(result),
            Err(DesignError::Registry(e)) => Err(e),
            Err(e) => Ok(DesignResult::Failed(e)),
        }
    }

    fn try_export(&self, design: &ClassifiedDesign) -> Result<DesignResult, DesignError> {
        let fingerprint = &design.fingerprint;
        let assignment = self
            .ledger
            .get(fingerprint)
            .ok_or_else(|| DesignError::Unassigned(fingerprint.short().to_string()))?;
        let current = design.faces.first().map(|f| f.face_count).unwrap_or(0);

        let pending: Vec<_> = {
            let registry = self.lock();
            let recorded = registry.query_by_fingerprint(fingerprint);
            let changed = recorded.iter().any(|r| {
                r.face_count != current || !design.faces.iter().any(|f| f.position == r.position)
            });
            if changed {
                let recorded_count = recorded.first().map(|r| r.face_count).unwrap_or(0);
                return Err(DesignError::FaceLayoutChanged {
                    recorded: describe_layout(recorded_count, recorded.iter().map(|r| r.position)),
                    current: describe_layout(current, design.faces.iter().map(|f| f.position)),
                });
            }
            design
                .faces
                .iter()
                .filter(|f| registry.find_face(fingerprint, f.position).is_none())
                .collect()
        };
        if pending.is_empty() {
            return Ok(DesignResult::AlreadyExported);
        }

        // Every name must fit before anything is converted.
        let parts: Vec<FilenameParts> = pending
            .iter()
            .map(|face| FilenameParts {
                folder_order: assignment.folder_order,
                owner: assignment.owner,
                face_count: face.face_count,
                position: face.position,
                day: self.day,
            })
            .collect();
        let names = parts
            .iter()
            .map(|p| self.codec.encode(p))
            .collect::<Result<Vec<_>, _>>()?;

        let target_dir = stitch_dir(self.sorted_dir, assignment.owner);
        std::fs::create_dir_all(&target_dir)?;

        for ((face, parts), name) in pending.iter().zip(&parts).zip(&names) {
            let source = self.sorted_dir.join(&face.source);
            let target = target_dir.join(self.codec.file_name(parts)?);
            self.converter.convert(&source, &target)?;
            debug!(source = %source.display(), target = %target.display(), "converted face");

            let record = ExportRecord {
                fingerprint: fingerprint.clone(),
                filename: name.clone(),
                owner_bucket: assignment.owner,
                folder_order: assignment.folder_order,
                face_count: face.face_count,
                position: face.position,
                export_date: self.date,
            };
            self.lock().record(record)?;
        }
        Ok(DesignResult::Exported(names))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExportRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}
