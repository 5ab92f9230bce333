use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::job::JobOutcome;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})";

/// Final counts of a run. `ok()` includes skipped jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
}

impl RunSummary {
    pub fn empty(output_dir: &Path) -> Self {
        Self {
            total: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub const fn ok(&self) -> usize {
        self.succeeded + self.skipped
    }

    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Counts outcomes as they arrive and drives the progress bar.
pub struct ProgressTracker {
    progress_bar: ProgressBar,
    total: usize,
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        let progress_bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        Self::with_progress_bar(progress_bar, total)
    }

    /// A tracker that never draws, for tests and non-interactive callers.
    pub fn hidden(total: usize) -> Self {
        Self::with_progress_bar(ProgressBar::hidden(), total)
    }

    fn with_progress_bar(progress_bar: ProgressBar, total: usize) -> Self {
        Self {
            progress_bar,
            total,
            succeeded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Record one outcome. Failures are printed immediately above the bar.
    pub fn record(&self, input: &Path, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Failed(message) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.print_line(&format!("[ERROR] {}: {}", input.display(), message));
            }
        }
        debug!("{} -> {:?}", input.display(), outcome);
        self.progress_bar.inc(1);
    }

    fn print_line(&self, line: &str) {
        if self.progress_bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.progress_bar.println(line);
        }
    }

    pub fn snapshot(&self, output_dir: &Path) -> RunSummary {
        RunSummary {
            total: self.total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Close the progress bar and print the final summary.
    pub fn finish(self, output_dir: &Path) -> RunSummary {
        self.progress_bar.finish_and_clear();
        let summary = self.snapshot(output_dir);
        println!(
            "Done. OK: {} (skipped {}) | Failed: {} | Output: {}",
            summary.ok(),
            summary.skipped,
            summary.failed,
            summary.output_dir.display()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counts_each_outcome_kind() {
        let tracker = ProgressTracker::hidden(4);
        tracker.record(Path::new("a.jpg"), &JobOutcome::Succeeded);
        tracker.record(Path::new("b.jpg"), &JobOutcome::Skipped);
        tracker.record(Path::new("c.jpg"), &JobOutcome::Succeeded);
        tracker.record(Path::new("d.jpg"), &JobOutcome::Failed("boom".to_string()));

        let summary = tracker.finish(Path::new("out"));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.ok(), 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_failures());
        assert_eq!(summary.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let tracker = ProgressTracker::hidden(400);

        thread::scope(|scope| {
            for t in 0..4 {
                let tracker = &tracker;
                scope.spawn(move || {
                    for i in 0..100 {
                        let outcome = if i % 10 == 0 {
                            JobOutcome::Failed(format!("worker {t}"))
                        } else {
                            JobOutcome::Succeeded
                        };
                        tracker.record(Path::new("x.jpg"), &outcome);
                    }
                });
            }
        });

        let summary = tracker.snapshot(Path::new("out"));
        assert_eq!(summary.ok(), 360);
        assert_eq!(summary.failed, 40);
        assert_eq!(summary.ok() + summary.failed, summary.total);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::empty(Path::new("out"));
        assert_eq!(summary.ok(), 0);
        assert!(!summary.has_failures());
    }
}
