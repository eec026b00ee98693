//! Classify pass: scanned designs → identities → sorted tree.
//!
//! ```text
//! files/design/**/*.pes
//!   → scan + resolve faces + fingerprint
//!   → identity ledger (existing identity, or owner rule + next folder order)
//!   → sorted/<owner>/pes/<NNN>_<hash8>/<source files>
//!   → sorted/output/classification.json
//! ```
//!
//! The owner rule only runs for fingerprints the ledger has never seen.
//! With `strategy = "balanced"` every new design is inspected through the
//! [`StitchConverter`] first (in parallel), its machine time estimated, and
//! the batch spread across owners by [`workload::balance`].
//!
//! `classification.json` lists every classified item with its faces in
//! face order, paths relative to the sorted root. It is rewritten after
//! each design, so an interrupted pass keeps everything placed so far. The
//! export pass reads only this manifest and the ledger.

use crate::config::{AssignStrategy, ConfigError, FlowConfig};
use crate::faces::{self, DesignFace};
use crate::fingerprint::{self, Fingerprint};
use crate::identity::{IdentityError, IdentityLedger};
use crate::report::RunReport;
use crate::scan::{self, ScanError, SourceDesign};
use crate::stitch::{StitchConverter, TimeEstimator};
use crate::transfer::{free_path, transfer};
use crate::types::{FacePosition, OwnerBucket};
use crate::workload::{self, WorkItem};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bookkeeping directory inside the sorted root.
pub const OUTPUT_DIR: &str = "output";
pub const MANIFEST_FILENAME: &str = "classification.json";
const MANIFEST_VERSION: u32 = 1;

/// Subdirectory of an owner folder that receives design sources.
pub const SOURCES_DIR: &str = "pes";

pub fn output_dir(sorted_dir: &Path) -> PathBuf {
    sorted_dir.join(OUTPUT_DIR)
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("identity ledger: {0}")]
    Identity(#[from] IdentityError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("classification manifest version {found} is not supported")]
    UnsupportedVersion { found: u32 },
}

/// One placed face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFace {
    pub position: FacePosition,
    pub face_count: u8,
    /// Relative to the sorted root.
    pub source: PathBuf,
}

/// One classified item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedDesign {
    pub order_id: u64,
    pub item_id: u64,
    pub fingerprint: Fingerprint,
    pub owner: OwnerBucket,
    pub folder_order: u32,
    /// In face order.
    pub faces: Vec<ClassifiedFace>,
}

impl ClassifiedDesign {
    pub fn key(&self) -> String {
        format!("{}_{}", self.order_id, self.item_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationManifest {
    pub version: u32,
    /// Sorted by (order id, item id).
    pub designs: Vec<ClassifiedDesign>,
}

impl Default for ClassificationManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            designs: Vec::new(),
        }
    }
}

impl ClassificationManifest {
    /// Load from `output_dir`; `None` when no classify pass has run yet.
    pub fn load(output_dir: &Path) -> Result<Option<Self>, ClassifyError> {
        let path = output_dir.join(MANIFEST_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: Self = serde_json::from_str(&content)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ClassifyError::UnsupportedVersion {
                found: manifest.version,
            });
        }
        Ok(Some(manifest))
    }

    pub fn contains(&self, order_id: u64, item_id: u64) -> bool {
        self.designs
            .binary_search_by_key(&(order_id, item_id), |d| (d.order_id, d.item_id))
            .is_ok()
    }

    /// Replace the entry for the same item, or insert in key order.
    pub fn upsert(&mut self, design: ClassifiedDesign) {
        let key = (design.order_id, design.item_id);
        match self
            .designs
            .binary_search_by_key(&key, |d| (d.order_id, d.item_id))
        {
            Ok(i) => self.designs[i] = design,
            Err(i) => self.designs.insert(i, design),
        }
    }

    pub fn save(&self, output_dir: &Path) -> Result<(), ClassifyError> {
        std::fs::create_dir_all(output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(output_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(output_dir.join(MANIFEST_FILENAME))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

/// A scanned design that resolved and hashed cleanly.
struct Prepared<'a> {
    design: &'a SourceDesign,
    faces: Vec<DesignFace>,
    fingerprint: Fingerprint,
}

/// `<sorted>/<owner>/pes/<NNN>_<hash8>`
pub fn design_dir(sorted_dir: &Path, owner: OwnerBucket, folder_order: u32, fp: &Fingerprint) -> PathBuf {
    sorted_dir
        .join(owner.to_string())
        .join(SOURCES_DIR)
        .join(format!("{folder_order:03}_{}", fp.short()))
}

/// Run the classify pass.
pub fn classify(
    design_dir: &Path,
    sorted_dir: &Path,
    config: &FlowConfig,
    converter: &impl StitchConverter,
    copy: bool,
) -> Result<RunReport, ClassifyError> {
    let owners = config.owners.buckets()?;
    let mut report = RunReport::new("classify");

    let scanned = scan::scan_designs(design_dir)?;
    for (path, reason) in &scanned.skipped {
        warn!(file = %path.display(), "{reason}");
        report.skipped(path.display().to_string(), reason.clone());
    }

    let mut prepared = Vec::new();
    for design in &scanned.designs {
        let faces = match faces::resolve(design) {
            Ok(f) => f,
            Err(e) => {
                warn!(design = %design.key(), error = %e, "skipping design");
                report.skipped(design.key(), e.to_string());
                continue;
            }
        };
        let fingerprint = match fingerprint::fingerprint_faces(
            faces.iter().map(|f| (f.face.position, f.source.as_path())),
        ) {
            Ok(fp) => fp,
            Err(e) => {
                report.failed(design.key(), format!("cannot read design files: {e}"));
                continue;
            }
        };
        debug!(design = %design.key(), %fingerprint, faces = faces.len(), "resolved design");
        prepared.push(Prepared {
            design,
            faces,
            fingerprint,
        });
    }

    let output = output_dir(sorted_dir);
    let mut ledger = IdentityLedger::load(&output)?;
    let mut manifest = ClassificationManifest::load(&output)?.unwrap_or_default();

    let planned = match config.owners.strategy {
        AssignStrategy::Balanced => {
            plan_balanced(&prepared, &ledger, &manifest, config, converter, &owners)
        }
        _ => BTreeMap::new(),
    };
    for item in &prepared {
        let key = item.design.key();
        let owner = match config.owners.strategy {
            AssignStrategy::Balanced => planned.get(&item.fingerprint).copied(),
            AssignStrategy::Fixed => Some(config.owners.fixed_bucket()?),
            AssignStrategy::Directory => item
                .design
                .directory_hint()
                .and_then(|hint| owners.iter().copied().find(|o| o.to_string() == hint)),
        };
        let owner = match (ledger.get(&item.fingerprint), owner) {
            (Some(existing), _) => existing.owner,
            (None, Some(owner)) => owner,
            (None, None) => {
                report.skipped(key, "no owner directory above the design files");
                continue;
            }
        };

        let (owner, folder_order) =
            ledger.assign(&item.fingerprint, Some(item.design.item_id), || owner)?;

        let target = self::design_dir(sorted_dir, owner, folder_order, &item.fingerprint);
        let faces = match place_faces(&item.faces, &target, sorted_dir, copy) {
            Ok(faces) => faces,
            Err(e) => {
                report.failed(key, format!("cannot place design files: {e}"));
                continue;
            }
        };

        manifest.upsert(ClassifiedDesign {
            order_id: item.design.order_id,
            item_id: item.design.item_id,
            fingerprint: item.fingerprint.clone(),
            owner,
            folder_order,
            faces,
        });
        manifest.save(&output)?;
        report.succeeded(key, format!("{owner} {folder_order:03}"));
    }

    info!(%report, "classify pass finished");
    Ok(report)
}

/// Owners for fingerprints the ledger doesn't know yet.
///
/// Items of known designs that this run classifies for the first time are
/// today's work for their existing owner and count as that owner's starting
/// load. Items classified by an earlier run (a copy-mode leftover) count
/// nothing.
fn plan_balanced(
    prepared: &[Prepared<'_>],
    ledger: &IdentityLedger,
    manifest: &ClassificationManifest,
    config: &FlowConfig,
    converter: &impl StitchConverter,
    owners: &[OwnerBucket],
) -> BTreeMap<Fingerprint, OwnerBucket> {
    let mut fresh: BTreeMap<&Fingerprint, (&[DesignFace], u32)> = BTreeMap::new();
    let mut carried: BTreeMap<&Fingerprint, (&[DesignFace], u32)> = BTreeMap::new();
    for item in prepared {
        let group = if ledger.get(&item.fingerprint).is_none() {
            &mut fresh
        } else if !manifest.contains(item.design.order_id, item.design.item_id) {
            &mut carried
        } else {
            continue;
        };
        group
            .entry(&item.fingerprint)
            .or_insert((item.faces.as_slice(), 0))
            .1 += 1;
    }
    if fresh.is_empty() {
        return BTreeMap::new();
    }

    let estimator = TimeEstimator::new(&config.estimate);
    let reduction = config.estimate.duplicate_reduction_seconds;
    let estimate = |group: BTreeMap<&Fingerprint, (&[DesignFace], u32)>| -> Vec<WorkItem> {
        group
            .into_par_iter()
            .map(|(fingerprint, (faces, copies))| {
                let seconds = faces
                    .iter()
                    .map(|f| match converter.inspect(&f.source) {
                        Ok(stats) => estimator.seconds(&stats),
                        Err(e) => {
                            warn!(file = %f.source.display(), error = %e, "cannot estimate stitch time");
                            0.0
                        }
                    })
                    .sum();
                WorkItem {
                    fingerprint: fingerprint.clone(),
                    seconds,
                    copies,
                }
            })
            .collect()
    };

    let mut base: BTreeMap<OwnerBucket, f64> = BTreeMap::new();
    for item in estimate(carried) {
        if let Some(assignment) = ledger.get(&item.fingerprint) {
            *base.entry(assignment.owner).or_insert(0.0) += item.adjusted_seconds(reduction);
        }
    }
    let items = estimate(fresh);

    let plan = workload::balance_from(&items, owners, &config.owners.weights, reduction, &base);
    let mut totals = base;
    for (owner, seconds) in workload::loads(&items, &plan, reduction) {
        *totals.entry(owner).or_insert(0.0) += seconds;
    }
    for (owner, seconds) in totals {
        info!(%owner, seconds, "planned workload");
    }
    plan
}

/// Put each face's source file into `target`. A file already there with the
/// same contents is reused; otherwise a clashing name gets a suffix.
fn place_faces(
    faces: &[DesignFace],
    target: &Path,
    sorted_dir: &Path,
    copy: bool,
) -> io::Result<Vec<ClassifiedFace>> {
    std::fs::create_dir_all(target)?;
    let mut placed = Vec::with_capacity(faces.len());
    for face in faces {
        let name = face
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let existing = target.join(&name);
        let destination = if existing.exists()
            && fingerprint::hash_file(&existing)? == fingerprint::hash_file(&face.source)?
        {
            if !copy {
                std::fs::remove_file(&face.source)?;
            }
            existing
        } else {
            let destination = free_path(target, &name);
            transfer(&face.source, &destination, copy)?;
            destination
        };
        debug!(file = %destination.display(), "placed design file");
        placed.push(ClassifiedFace {
            position: face.face.position,
            face_count: face.face.face_count,
            source: destination
                .strip_prefix(sorted_dir)
                .unwrap_or(&destination)
                .to_path_buf(),
        });
    }
    Ok(placed)
}
