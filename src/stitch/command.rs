//! Converter backed by an external program.
//!
//! The program and its arguments come from `[converter]` in the config.
//! `{input}` and `{output}` placeholders in the arguments are replaced with
//! the design file and the target stitch file:
//!
//! ```toml
//! [converter]
//! program = "libembroidery-convert"
//! args = ["{input}", "{output}"]
//! ```
//!
//! `inspect` converts into a scratch directory and reads the result back
//! with the [`dst`](super::dst) reader.

use super::converter::{ConvertError, StitchConverter};
use super::dst::{self, PatternStats};
use crate::config::ConverterConfig;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn arguments(&self, source: &Path, output: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        let target = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &target)
            })
            .collect()
    }
}

impl StitchConverter for CommandConverter {
    fn convert(&self, source: &Path, output: &Path) -> Result<(), ConvertError> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let args = self.arguments(source, output);
        debug!(program = %self.program, ?args, "running converter");

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !result.status.success() {
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.is_file() {
            return Err(ConvertError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }

    fn inspect(&self, source: &Path) -> Result<PatternStats, ConvertError> {
        let scratch = TempDir::new()?;
        let output = scratch.path().join("inspect.dst");
        self.convert(source, &output)?;
        Ok(dst::read_stats(&output)?)
    }
}
