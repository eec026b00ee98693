//! Stitch converter trait and shared error type.
//!
//! The [`StitchConverter`] trait is the seam to whatever actually turns a
//! native design file into a machine stitch file. The production
//! implementation is [`CommandConverter`](super::command::CommandConverter),
//! which shells out to a configured program.

use super::dst::{DstError, PatternStats};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("converter '{program}' failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("converter produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("cannot read stitch file: {0}")]
    Dst(#[from] DstError),
}

/// Converts a design file into the machine stitch format.
///
/// `Sync` so one converter can serve every rayon worker.
pub trait StitchConverter: Sync {
    /// Write the converted stitch file to `output`.
    fn convert(&self, source: &Path, output: &Path) -> Result<(), ConvertError>;

    /// Statistics of the design as it would be stitched.
    fn inspect(&self, source: &Path) -> Result<PatternStats, ConvertError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock converter that records operations and writes a placeholder file.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockConverter {
        /// Stats returned by `inspect`, keyed by source file name.
        pub stats: HashMap<String, PatternStats>,
        /// Source file names whose conversion fails.
        pub failing: Vec<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedOp {
        Convert { source: String, output: String },
        Inspect(String),
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    impl MockConverter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_stats(stats: impl IntoIterator<Item = (&'static str, PatternStats)>) -> Self {
            Self {
                stats: stats.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                ..Self::default()
            }
        }

        pub fn failing_on(names: &[&str]) -> Self {
            Self {
                failing: names.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn converted_outputs(&self) -> Vec<String> {
            let mut outputs: Vec<String> = self
                .get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Convert { output, .. } => Some(output),
                    RecordedOp::Inspect(_) => None,
                })
                .collect();
            outputs.sort();
            outputs
        }
    }

    impl StitchConverter for MockConverter {
        fn convert(&self, source: &Path, output: &Path) -> Result<(), ConvertError> {
            self.operations.lock().unwrap().push(RecordedOp::Convert {
                source: file_name(source),
                output: file_name(output),
            });
            if self.failing.contains(&file_name(source)) {
                return Err(ConvertError::Failed {
                    program: "mock".into(),
                    status: "exit status: 1".into(),
                    stderr: "unreadable design".into(),
                });
            }
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output, b"DST")?;
            Ok(())
        }

        fn inspect(&self, source: &Path) -> Result<PatternStats, ConvertError> {
            let name = file_name(source);
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Inspect(name.clone()));
            Ok(self.stats.get(&name).copied().unwrap_or_default())
        }
    }

    #[test]
    fn mock_records_convert_and_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let converter = MockConverter::new();
        let output = tmp.path().join("A/dst/001A1S01a.dst");
        converter.convert(Path::new("/in/x.pes"), &output).unwrap();

        assert!(output.exists());
        assert_eq!(
            converter.get_operations(),
            [RecordedOp::Convert {
                source: "x.pes".into(),
                output: "001A1S01a.dst".into()
            }]
        );
    }

    #[test]
    fn mock_returns_configured_stats() {
        let stats = PatternStats {
            stitches: 800,
            ..PatternStats::default()
        };
        let converter = MockConverter::with_stats([("x.pes", stats)]);
        assert_eq!(converter.inspect(Path::new("/in/x.pes")).unwrap(), stats);
        assert_eq!(
            converter.inspect(Path::new("/in/y.pes")).unwrap(),
            PatternStats::default()
        );
    }

    #[test]
    fn mock_failure() {
        let converter = MockConverter::failing_on(&["bad.pes"]);
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(converter
            .convert(Path::new("bad.pes"), &tmp.path().join("out.dst"))
            .is_err());
        assert!(!tmp.path().join("out.dst").exists());
    }
}
