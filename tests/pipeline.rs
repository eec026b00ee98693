//! End-to-end runs of classify → export → label over a temp directory,
//! with a stand-in converter and the real raster stamper.

use chrono::NaiveDate;
use image::{Rgba, RgbaImage};
use stitchflow::config::{AssignStrategy, FlowConfig};
use stitchflow::imaging::{RasterStamper, TextStyle};
use stitchflow::report::{Outcome, RunReport};
use stitchflow::stitch::{ConvertError, PatternStats, StitchConverter};
use stitchflow::{classify, export, labels};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Writes a placeholder stitch file; fails for sources whose name contains
/// any of `failing`.
#[derive(Default)]
struct FakeConverter {
    failing: Vec<&'static str>,
    converted: Mutex<Vec<String>>,
}

impl FakeConverter {
    fn failing_on(failing: &[&'static str]) -> Self {
        Self {
            failing: failing.to_vec(),
            ..Self::default()
        }
    }

    fn converted(&self) -> Vec<String> {
        let mut names = self.converted.lock().unwrap().clone();
        names.sort();
        names
    }
}

impl StitchConverter for FakeConverter {
    fn convert(&self, source: &Path, output: &Path) -> Result<(), ConvertError> {
        let name = source.file_name().unwrap().to_string_lossy().into_owned();
        if self.failing.iter().any(|f| name.contains(f)) {
            return Err(ConvertError::MissingOutput(output.to_path_buf()));
        }
        std::fs::write(output, b"DST")?;
        let written = output.file_name().unwrap().to_string_lossy().into_owned();
        self.converted.lock().unwrap().push(written);
        Ok(())
    }

    fn inspect(&self, _source: &Path) -> Result<PatternStats, ConvertError> {
        Ok(PatternStats {
            stitches: 8_000,
            ..PatternStats::default()
        })
    }
}

struct Workspace {
    _tmp: TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        std::fs::create_dir_all(root.join("files/design")).unwrap();
        std::fs::create_dir_all(root.join("files/labels")).unwrap();
        Self { _tmp: tmp, root }
    }

    fn design_dir(&self) -> PathBuf {
        self.root.join("files/design")
    }

    fn label_dir(&self) -> PathBuf {
        self.root.join("files/labels")
    }

    fn sorted(&self) -> PathBuf {
        self.root.join("sorted")
    }

    fn add_design(&self, order: u64, item: u64, positions: &[&str]) {
        for (i, position) in positions.iter().enumerate() {
            let name = format!(
                "{order}_{item}_{position}_L_Sweatshirt_{}_{}_item_1.pes",
                positions.len(),
                i + 1
            );
            let content = format!("design {order}/{item} {position}");
            std::fs::write(self.design_dir().join(name), content).unwrap();
        }
    }

    fn add_label(&self, order: u64, item: u64) -> PathBuf {
        let path = self.label_dir().join(format!("{order}_{item}_1_1_item_1.png"));
        RgbaImage::from_pixel(160, 80, Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn classify(&self, config: &FlowConfig, converter: &FakeConverter) -> RunReport {
        classify::classify(&self.design_dir(), &self.sorted(), config, converter, false).unwrap()
    }

    fn export(&self, config: &FlowConfig, converter: &FakeConverter) -> RunReport {
        export::export(&self.sorted(), config, converter, date()).unwrap()
    }

    fn label(&self, config: &FlowConfig) -> RunReport {
        let stamper = RasterStamper::new(TextStyle::from(&config.labels));
        labels::label(&self.label_dir(), &self.sorted(), config, &stamper, false).unwrap()
    }

    fn registry_bytes(&self) -> Vec<u8> {
        std::fs::read(self.sorted().join("output/export_registry.jsonl")).unwrap()
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 9).unwrap()
}

fn fixed_config() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.owners.strategy = AssignStrategy::Fixed;
    config
}

fn has_ink(path: &Path) -> bool {
    image::open(path)
        .unwrap()
        .to_rgba8()
        .pixels()
        .any(|p| *p == Rgba([0, 0, 0, 255]))
}

#[test]
fn full_pipeline_names_exports_and_stamps_labels() {
    let ws = Workspace::new();
    ws.add_design(1997, 2282, &["front"]);
    ws.add_design(2150, 2448, &["front", "sleeve_left", "sleeve_right"]);
    ws.add_label(1997, 2282);
    ws.add_label(2150, 2448);
    let stray = ws.add_label(3000, 3001);

    let config = fixed_config();
    let converter = FakeConverter::default();

    let classified = ws.classify(&config, &converter);
    assert_eq!(classified.count(Outcome::Succeeded), 2);

    let exported = ws.export(&config, &converter);
    assert_eq!(exported.count(Outcome::Succeeded), 2);
    assert_eq!(
        converter.converted(),
        ["001A1S09j.dst", "002A3F09j.dst", "002A3L09j.dst", "002A3R09j.dst"]
    );
    assert!(ws.sorted().join("A/dst/002A3R09j.dst").exists());

    let labelled = ws.label(&config);
    assert_eq!(labelled.count(Outcome::Succeeded), 2);
    assert_eq!(labelled.count(Outcome::Skipped), 1);

    let single = ws.sorted().join("A/labels/001A1S09j_1997_2282_1_1_item_1.png");
    let triple = ws
        .sorted()
        .join("A/labels/002A3F09j_002A3L09j_002A3R09j_2150_2448_1_1_item_1.png");
    assert!(has_ink(&single));
    assert!(has_ink(&triple));

    let composed: Vec<&str> = labelled
        .with_outcome(Outcome::Succeeded)
        .map(|e| e.detail.as_str())
        .collect();
    assert!(composed.contains(&"002A3F09j | 002A3L09j | 002A3R09j"));
    assert!(composed.contains(&"001A1S09j"));

    // The pixels are exactly the composed label drawn over the original.
    let stamper = RasterStamper::new(TextStyle::from(&config.labels));
    let blank = RgbaImage::from_pixel(160, 80, Rgba([255, 255, 255, 255]));
    let expected = stamper
        .render(&blank, "002A3F09j | 002A3L09j | 002A3R09j", Rgba([0, 0, 0, 0]))
        .unwrap();
    assert!(image::open(&triple).unwrap().to_rgba8() == expected);

    // Unmatched label untouched.
    assert!(stray.exists());
    assert!(!has_ink(&stray));
}

#[test]
fn rerunning_every_pass_changes_nothing() {
    let ws = Workspace::new();
    ws.add_design(2150, 2448, &["front", "sleeve_left"]);
    ws.add_label(2150, 2448);

    let config = fixed_config();
    let converter = FakeConverter::default();
    ws.classify(&config, &converter);
    ws.export(&config, &converter);
    ws.label(&config);
    let registry = ws.registry_bytes();

    let again = FakeConverter::default();
    assert!(ws.classify(&config, &again).entries.is_empty());
    let exported = ws.export(&config, &again);
    assert_eq!(exported.count(Outcome::Skipped), 1);
    assert!(again.converted().is_empty());
    assert!(ws.label(&config).entries.is_empty());
    assert_eq!(ws.registry_bytes(), registry);
}

#[test]
fn interrupted_export_leaves_label_until_completed() {
    let ws = Workspace::new();
    ws.add_design(2150, 2448, &["front", "sleeve_left", "sleeve_right"]);
    let label = ws.add_label(2150, 2448);
    let config = fixed_config();

    ws.classify(&config, &FakeConverter::default());
    let broken = FakeConverter::failing_on(&["sleeve_right"]);
    assert_eq!(ws.export(&config, &broken).count(Outcome::Failed), 1);

    let partial = ws.label(&config);
    assert_eq!(partial.count(Outcome::Skipped), 1);
    assert!(label.exists(), "a partial label is never stamped");

    let fixed = FakeConverter::default();
    ws.export(&config, &fixed);
    assert_eq!(fixed.converted(), ["001A3R09j.dst"]);

    let complete = ws.label(&config);
    assert_eq!(complete.count(Outcome::Succeeded), 1);
    assert!(!label.exists());
}

#[test]
fn redownloaded_design_keeps_identity_and_is_not_reexported() {
    let ws = Workspace::new();
    ws.add_design(1997, 2282, &["front"]);
    let config = fixed_config();
    let converter = FakeConverter::default();
    ws.classify(&config, &converter);
    ws.export(&config, &converter);

    // Same content under a new order.
    let original = "design 1997/2282 front";
    let name = "2400_2600_front_L_Sweatshirt_1_1_item_1.pes";
    std::fs::write(ws.design_dir().join(name), original).unwrap();
    let label = ws.add_label(2400, 2600);

    let reclassified = ws.classify(&config, &converter);
    assert_eq!(
        reclassified.with_outcome(Outcome::Succeeded).next().unwrap().detail,
        "A 001"
    );
    let exported = ws.export(&config, &converter);
    assert_eq!(exported.count(Outcome::Skipped), 1);

    ws.label(&config);
    assert!(!label.exists());
    assert!(
        ws.sorted()
            .join("A/labels/001A1S09j_2400_2600_1_1_item_1.png")
            .exists()
    );
}

#[test]
fn balanced_assignment_spreads_new_designs() {
    let ws = Workspace::new();
    ws.add_design(1, 10, &["front"]);
    ws.add_design(1, 11, &["front"]);

    let mut config = FlowConfig::default();
    config.owners.labels = vec!["A".into(), "B".into()];
    config.owners.weights = vec![1.0, 1.0];

    ws.classify(&config, &FakeConverter::default());
    assert!(ws.sorted().join("A/pes").is_dir());
    assert!(ws.sorted().join("B/pes").is_dir());
}
