//! Progress bar for multi-stage builds.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use plinth_core::pipeline::ProgressReporter;

/// Weighted progress bar over the pipeline's stage table.
///
/// Stage weights drive the bar length; the pipeline reports each stage as
/// it starts. Batch builds pass a zero multiplier and report nothing.
pub struct StageProgress {
    bar: ProgressBar,
}

impl StageProgress {
    /// Create a progress bar sized to the total stage weight.
    pub fn new(total_weight: u64) -> Self {
        let bar = ProgressBar::new(total_weight.max(1));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("█▓▒░"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Complete the bar with a final message.
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl ProgressReporter for StageProgress {
    fn stage(&self, name: &str, weight: u64) {
        self.bar.set_message(name.to_string());
        self.bar.inc(weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_progress_accepts_reports() {
        let progress = StageProgress::new(8);
        progress.stage("clean", 1);
        progress.stage("copy", 3);
        progress.finish("done");
    }

    #[test]
    fn test_zero_weight_does_not_panic() {
        let progress = StageProgress::new(0);
        progress.stage("clean", 0);
        progress.finish("done");
    }
}
