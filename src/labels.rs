//! Label mapping: registry records → composed label → stamped image.
//!
//! The label pass runs after export and only reads the registry. For each
//! label image in the label directory:
//!
//! ```text
//! 2150_2448_1_1_item_1.png
//!   → item 2448                      (label file name)
//!   → fingerprint 3edcb035…          (identity ledger)
//!   → 055A3F09j, 055A3L09j, 055A3R09j (export registry, face order)
//!   → "055A3F09j | 055A3L09j | 055A3R09j"
//!   → sorted/A/labels/055A3F09j_055A3L09j_055A3R09j_2150_2448_1_1_item_1.png, stamped
//! ```
//!
//! Matching is by fingerprint only, never by name similarity. A label whose
//! design has no exported faces is left where it is and nothing is stamped.
//! A design whose export was interrupted (fewer records than faces) is
//! skipped as well: a partial label is never stamped.

use crate::classify;
use crate::config::{ConfigError, FlowConfig};
use crate::fingerprint::Fingerprint;
use crate::identity::{IdentityError, IdentityLedger, ItemLookup};
use crate::imaging::{LabelStamper, StampRequest};
use crate::registry::{ExportRegistry, RegistryError};
use crate::report::RunReport;
use crate::scan::{self, ScanError};
use crate::transfer::{move_file, transfer};
use crate::types::OwnerBucket;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Subdirectory of an owner folder that receives stamped labels.
pub const LABELS_DIR: &str = "labels";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("no exported faces for design {0}")]
    NotFound(Fingerprint),
    #[error("design {fingerprint} has {found} of {expected} faces exported")]
    Incomplete {
        fingerprint: Fingerprint,
        expected: u8,
        found: usize,
    },
    #[error("design {0} has records with different face counts")]
    MixedLayout(Fingerprint),
}

/// Errors that abort the label pass.
#[derive(Error, Debug)]
pub enum LabelPassError {
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("identity ledger: {0}")]
    Identity(#[from] IdentityError),
    #[error("export registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Everything needed to stamp one design's label. Derived on every run,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelComposite {
    pub fingerprint: Fingerprint,
    pub composed_label: String,
    /// Export names in face order.
    pub filenames: Vec<String>,
    pub owner: OwnerBucket,
}

/// Bare name for a single face, names joined by `separator` otherwise.
pub fn compose_label(filenames: &[String], separator: &str) -> String {
    match filenames {
        [single] => single.clone(),
        names => names.join(separator),
    }
}

/// Read-only view over the registry that composes labels.
pub struct LabelMapper<'a> {
    registry: &'a ExportRegistry,
    separator: String,
}

impl<'a> LabelMapper<'a> {
    pub fn new(registry: &'a ExportRegistry, separator: impl Into<String>) -> Self {
        Self {
            registry,
            separator: separator.into(),
        }
    }

    pub fn compose(&self, fingerprint: &Fingerprint) -> Result<LabelComposite, LabelError> {
        let mut records = self.registry.query_by_fingerprint(fingerprint);
        let first = records
            .first()
            .copied()
            .ok_or_else(|| LabelError::NotFound(fingerprint.clone()))?;
        if records.iter().any(|r| r.face_count != first.face_count) {
            return Err(LabelError::MixedLayout(fingerprint.clone()));
        }
        // One name per position; the earliest record wins.
        records.dedup_by_key(|r| r.position);
        if records.len() < usize::from(first.face_count) {
            return Err(LabelError::Incomplete {
                fingerprint: fingerprint.clone(),
                expected: first.face_count,
                found: records.len(),
            });
        }

        let filenames: Vec<String> = records.iter().map(|r| r.filename.clone()).collect();
        Ok(LabelComposite {
            fingerprint: fingerprint.clone(),
            composed_label: compose_label(&filenames, &self.separator),
            filenames,
            owner: first.owner_bucket,
        })
    }
}

/// Where a matched label goes: names joined by `_`, then the original name.
pub fn label_destination(sorted_dir: &Path, composite: &LabelComposite, original: &str) -> PathBuf {
    sorted_dir
        .join(composite.owner.to_string())
        .join(LABELS_DIR)
        .join(format!("{}_{}", composite.filenames.join("_"), original))
}

/// Run the label pass against the ledger and registry in `sorted_dir`.
pub fn label(
    label_dir: &Path,
    sorted_dir: &Path,
    config: &FlowConfig,
    stamper: &impl LabelStamper,
    copy: bool,
) -> Result<RunReport, LabelPassError> {
    let output = classify::output_dir(sorted_dir);
    let registry = ExportRegistry::read(&output, &config.codec()?)?;
    let ledger = IdentityLedger::load(&output)?;
    let report = map_labels(
        label_dir,
        sorted_dir,
        &ledger,
        &registry,
        &config.labels.separator,
        stamper,
        copy,
    )?;
    info!(%report, "label pass finished");
    Ok(report)
}

/// Map and stamp every label image in `label_dir`.
pub fn map_labels(
    label_dir: &Path,
    sorted_dir: &Path,
    ledger: &IdentityLedger,
    registry: &ExportRegistry,
    separator: &str,
    stamper: &impl LabelStamper,
    copy: bool,
) -> Result<RunReport, LabelPassError> {
    let mapper = LabelMapper::new(registry, separator);
    let mut report = RunReport::new("label");

    for label in scan::list_labels(label_dir)? {
        let Some(name) = label.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let Some(meta) = scan::parse_label_file_name(&name) else {
            report.skipped(&name, "label name carries no order and item id");
            continue;
        };

        let fingerprint = match ledger.fingerprint_for_item(meta.item_id) {
            ItemLookup::Unique(fp) => fp,
            ItemLookup::Unknown => {
                report.skipped(&name, format!("item {} was never classified", meta.item_id));
                continue;
            }
            ItemLookup::Ambiguous(fps) => {
                report.skipped(
                    &name,
                    format!("item {} belongs to {} designs", meta.item_id, fps.len()),
                );
                continue;
            }
        };

        let composite = match mapper.compose(&fingerprint) {
            Ok(c) => c,
            Err(e) => {
                debug!(label = %name, error = %e, "label left in place");
                report.skipped(&name, e.to_string());
                continue;
            }
        };

        let destination = label_destination(sorted_dir, &composite, &name);
        if destination.exists() {
            report.skipped(&name, "already labelled");
            continue;
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        transfer(&label, &destination, copy)?;

        let request = StampRequest {
            image: destination.clone(),
            label: composite.composed_label.clone(),
        };
        match stamper.stamp(&request) {
            Ok(()) => {
                info!(label = %name, text = %composite.composed_label, "stamped label");
                report.succeeded(&name, composite.composed_label);
            }
            Err(e) => {
                warn!(label = %name, error = %e, "stamping failed, restoring label");
                if copy {
                    std::fs::remove_file(&destination)?;
                } else {
                    move_file(&destination, &label)?;
                }
                report.failed(&name, e.to_string());
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_bytes;
    use crate::imaging::backend::tests::MockStamper;
    use crate::naming::{ExportDay, FilenameCodec, FilenameParts};
    use crate::registry::ExportRecord;
    use crate::report::Outcome;
    use crate::test_helpers::write_label;
    use crate::types::FacePosition;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn owner(c: char) -> OwnerBucket {
        OwnerBucket::new(c).unwrap()
    }

    fn record(
        registry: &mut ExportRegistry,
        fp: &Fingerprint,
        order: u32,
        count: u8,
        position: FacePosition,
    ) {
        let date = NaiveDate::from_ymd_opt(2025, 10, 9).unwrap();
        let filename = FilenameCodec::default()
            .encode(&FilenameParts {
                folder_order: order,
                owner: owner('A'),
                face_count: count,
                position,
                day: ExportDay::from_date(date),
            })
            .unwrap();
        registry
            .record(ExportRecord {
                fingerprint: fp.clone(),
                filename,
                owner_bucket: owner('A'),
                folder_order: order,
                face_count: count,
                position,
                export_date: date,
            })
            .unwrap();
    }

    fn registry(dir: &Path) -> ExportRegistry {
        ExportRegistry::open(dir, &FilenameCodec::default()).unwrap()
    }

    // =========================================================================
    // Composition
    // =========================================================================

    #[test]
    fn compose_label_forms() {
        let one = vec!["010B1S09j".to_string()];
        assert_eq!(compose_label(&one, " | "), "010B1S09j");
        let three: Vec<String> = ["055A3F09j", "055A3L09j", "055A3R09j"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            compose_label(&three, " | "),
            "055A3F09j | 055A3L09j | 055A3R09j"
        );
    }

    #[test]
    fn compose_three_face_design() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(tmp.path());
        let fp = fingerprint_bytes(b"three");
        for p in [FacePosition::SleeveRight, FacePosition::Front, FacePosition::SleeveLeft] {
            record(&mut reg, &fp, 55, 3, p);
        }

        let composite = LabelMapper::new(&reg, " | ").compose(&fp).unwrap();
        assert_eq!(composite.composed_label, "055A3F09j | 055A3L09j | 055A3R09j");
        assert_eq!(composite.owner, owner('A'));
        assert_eq!(composite.filenames.len(), 3);
    }

    #[test]
    fn compose_single_face_design_is_bare_name() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(tmp.path());
        let fp = fingerprint_bytes(b"one");
        record(&mut reg, &fp, 10, 1, FacePosition::Single);
        let composite = LabelMapper::new(&reg, " | ").compose(&fp).unwrap();
        assert_eq!(composite.composed_label, "010A1S09j");
    }

    #[test]
    fn compose_unknown_design_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let reg = registry(tmp.path());
        let fp = fingerprint_bytes(b"never exported");
        assert_eq!(
            LabelMapper::new(&reg, " | ").compose(&fp),
            Err(LabelError::NotFound(fp))
        );
    }

    #[test]
    fn compose_partial_export_is_incomplete() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(tmp.path());
        let fp = fingerprint_bytes(b"partial");
        record(&mut reg, &fp, 7, 3, FacePosition::Front);
        record(&mut reg, &fp, 7, 3, FacePosition::SleeveLeft);
        assert!(matches!(
            LabelMapper::new(&reg, " | ").compose(&fp),
            Err(LabelError::Incomplete {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn custom_separator() {
        let tmp = TempDir::new().unwrap();
        let mut reg = registry(tmp.path());
        let fp = fingerprint_bytes(b"two");
        record(&mut reg, &fp, 3, 2, FacePosition::Front);
        record(&mut reg, &fp, 3, 2, FacePosition::SleeveLeft);
        let composite = LabelMapper::new(&reg, " / ").compose(&fp).unwrap();
        assert_eq!(composite.composed_label, "003A2F09j / 003A2L09j");
    }

    // =========================================================================
    // Label pass
    // =========================================================================

    struct Fixture {
        tmp: TempDir,
        ledger: IdentityLedger,
        registry: ExportRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let output = tmp.path().join("sorted/output");
            let ledger = IdentityLedger::load(&output).unwrap();
            let registry = registry(&output);
            Self {
                tmp,
                ledger,
                registry,
            }
        }

        fn labels(&self) -> PathBuf {
            self.tmp.path().join("labels")
        }

        fn sorted(&self) -> PathBuf {
            self.tmp.path().join("sorted")
        }

        fn run(&self, stamper: &MockStamper, copy: bool) -> RunReport {
            map_labels(
                &self.labels(),
                &self.sorted(),
                &self.ledger,
                &self.registry,
                " | ",
                stamper,
                copy,
            )
            .unwrap()
        }
    }

    #[test]
    fn matched_label_is_moved_and_stamped() {
        let mut fx = Fixture::new();
        let fp = fingerprint_bytes(b"design");
        fx.ledger.assign(&fp, Some(2448), || owner('A')).unwrap();
        for p in FacePosition::MULTI {
            record(&mut fx.registry, &fp, 1, 3, p);
        }
        let label = write_label(&fx.labels(), 2150, 2448);

        let stamper = MockStamper::new();
        let report = fx.run(&stamper, false);
        assert_eq!(report.count(Outcome::Succeeded), 1, "{report:?}");

        let expected = fx
            .sorted()
            .join("A/labels/001A3F09j_001A3L09j_001A3R09j_2150_2448_1_1_item_1.png");
        assert!(expected.exists());
        assert!(!label.exists());

        let requests = stamper.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].image, expected);
        assert_eq!(requests[0].label, "001A3F09j | 001A3L09j | 001A3R09j");
    }

    #[test]
    fn unmatched_label_stays_and_is_not_stamped() {
        let mut fx = Fixture::new();
        let fp = fingerprint_bytes(b"classified but not exported");
        fx.ledger.assign(&fp, Some(2), || owner('B')).unwrap();
        let exported_nothing = write_label(&fx.labels(), 1, 2);
        let unknown_item = write_label(&fx.labels(), 1, 3);

        let stamper = MockStamper::new();
        let report = fx.run(&stamper, false);
        assert_eq!(report.count(Outcome::Skipped), 2);
        assert!(exported_nothing.exists());
        assert!(unknown_item.exists());
        assert!(stamper.get_requests().is_empty());
    }

    #[test]
    fn copy_mode_keeps_original_and_rerun_skips() {
        let mut fx = Fixture::new();
        let fp = fingerprint_bytes(b"single");
        fx.ledger.assign(&fp, Some(9), || owner('A')).unwrap();
        record(&mut fx.registry, &fp, 4, 1, FacePosition::Single);
        let label = write_label(&fx.labels(), 8, 9);

        let stamper = MockStamper::new();
        assert_eq!(fx.run(&stamper, true).count(Outcome::Succeeded), 1);
        assert!(label.exists());
        assert!(fx.sorted().join("A/labels/004A1S09j_8_9_1_1_item_1.png").exists());

        let second = fx.run(&stamper, true);
        assert_eq!(second.count(Outcome::Skipped), 1);
        assert_eq!(stamper.get_requests().len(), 1);
    }

    #[test]
    fn failed_stamp_restores_label() {
        let mut fx = Fixture::new();
        let fp = fingerprint_bytes(b"single");
        fx.ledger.assign(&fp, Some(9), || owner('A')).unwrap();
        record(&mut fx.registry, &fp, 4, 1, FacePosition::Single);
        let label = write_label(&fx.labels(), 8, 9);

        let report = fx.run(&MockStamper::failing(), false);
        assert_eq!(report.count(Outcome::Failed), 1);
        assert!(label.exists());
        assert!(!fx.sorted().join("A/labels/004A1S09j_8_9_1_1_item_1.png").exists());
    }

    #[test]
    fn label_without_ids_is_skipped() {
        let fx = Fixture::new();
        crate::test_helpers::write_file(&fx.labels(), "scan.png", b"");
        let report = fx.run(&MockStamper::new(), false);
        assert_eq!(report.count(Outcome::Skipped), 1);
    }
}
