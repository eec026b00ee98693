//! Machine time estimate for a design.

use super::dst::PatternStats;
use crate::config::EstimateConfig;

/// Seconds a machine needs to stitch a pattern.
#[derive(Debug, Clone)]
pub struct TimeEstimator {
    stitches_per_minute: f64,
    color_change_seconds: f64,
    trim_seconds: f64,
    jump_seconds: f64,
}

impl TimeEstimator {
    pub fn new(config: &EstimateConfig) -> Self {
        Self {
            stitches_per_minute: config.stitches_per_minute,
            color_change_seconds: config.color_change_seconds,
            trim_seconds: config.trim_seconds,
            jump_seconds: config.jump_seconds,
        }
    }

    pub fn seconds(&self, stats: &PatternStats) -> f64 {
        let stitch_time = f64::from(stats.stitches) / self.stitches_per_minute * 60.0;
        stitch_time
            + f64::from(stats.color_changes) * self.color_change_seconds
            + f64::from(stats.trims) * self.trim_seconds
            + f64::from(stats.jumps) * self.jump_seconds
    }
}

/// `"12m 5s"`, or just `"45s"` under a minute.
pub fn human_readable(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (m, s) = (total / 60, total % 60);
    if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model() {
        let estimator = TimeEstimator::new(&EstimateConfig::default());
        let stats = PatternStats {
            stitches: 8000,
            color_changes: 2,
            trims: 10,
            jumps: 5,
        };
        // 600s stitching + 240s colors + 30s trims + 1s jumps
        assert!((estimator.seconds(&stats) - 871.0).abs() < 1e-9);
        assert_eq!(estimator.seconds(&PatternStats::default()), 0.0);
    }

    #[test]
    fn human_readable_formats() {
        assert_eq!(human_readable(0.0), "0s");
        assert_eq!(human_readable(44.6), "45s");
        assert_eq!(human_readable(871.0), "14m 31s");
        assert_eq!(human_readable(-3.0), "0s");
    }
}
