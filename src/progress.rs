//! Progress reporting infrastructure

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{borrow::Cow, time::Duration};

/// CLI progress report of ongoing operations
///
/// To avoid corrupted terminal output, you should not write anything to stderr
/// yourself as long as a report is being displayed. Please use logs for debug
/// messages. Tables go to stdout, which the report does not draw on.
#[derive(Clone, Debug, Default)]
pub struct ProgressReport(MultiProgress);
//
impl ProgressReport {
    /// Prepare to report progress on the cli
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that is never drawn
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self(MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()))
    }

    /// Prepare to report on a new operation made of a known number of steps
    pub fn add(&self, what: impl Into<Cow<'static, str>>, config: ProgressConfig) -> ProgressTracker {
        let ProgressConfig {
            steps,
            show_rate_eta,
        } = config;
        let style = if show_rate_eta {
            "{prefix} {wide_bar} {pos}/{len} (~{eta} left)"
        } else {
            "{prefix} {wide_bar} {pos}/{len}"
        };
        let bar = ProgressBar::new(steps as u64)
            .with_prefix(what.into())
            .with_style(
                ProgressStyle::with_template(style)
                    .expect("all styles above should be valid indicatif styles"),
            );
        if steps > 0 {
            self.0.add(bar.clone());
        }
        ProgressTracker {
            bar,
            report: self.0.clone(),
        }
    }

    /// Show that an operation of unknown duration is ongoing
    ///
    /// The spinner goes away when the returned guard is dropped.
    pub fn spinner(&self, what: impl Into<Cow<'static, str>>) -> Spinner {
        let bar = ProgressBar::new_spinner()
            .with_message(what.into())
            .with_style(
                ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
                    .expect("spinner style should be a valid indicatif style"),
            );
        let bar = self.0.add(bar);
        bar.enable_steady_tick(Duration::from_millis(100));
        Spinner {
            bar,
            report: self.0.clone(),
        }
    }
}

/// Progress bar configuration
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProgressConfig {
    /// Number of steps to be taken
    steps: usize,

    /// Show the estimated remaining time
    show_rate_eta: bool,
}
//
impl ProgressConfig {
    /// Default configuration, with some amount of work
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            show_rate_eta: true,
        }
    }

    /// Disable display of the estimated remaining time
    pub fn dont_show_rate_eta(self) -> Self {
        Self {
            show_rate_eta: false,
            ..self
        }
    }
}

/// Mechanism to track progress
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    /// Progress bar for this specific process
    bar: ProgressBar,

    /// Underlying process report
    report: MultiProgress,
}
//
impl ProgressTracker {
    /// Show that a certain amount of progress has been made
    ///
    /// Returns truth that the progress bar has reached its maximum value
    pub fn make_progress(&self, progress: u64) -> bool {
        self.bar.inc(progress);
        let current = self.bar.position();
        let max = self.bar.length().unwrap_or(0);
        assert!(current <= max, "recorded more progress than expected");

        // Hide progress bar once done
        let finished = current == max;
        if finished {
            self.bar.finish_and_clear();
            self.report.remove(&self.bar);
        }
        finished
    }
}

/// Spinner shown while an operation is ongoing
#[derive(Debug)]
pub struct Spinner {
    /// Spinning progress bar
    bar: ProgressBar,

    /// Underlying process report
    report: MultiProgress,
}
//
impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        self.report.remove(&self.bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trackers_finish_after_last_step() {
        let report = ProgressReport::hidden();
        let tracker = report.add("warming", ProgressConfig::new(3).dont_show_rate_eta());
        assert!(!tracker.make_progress(1));
        assert!(!tracker.make_progress(1));
        assert!(tracker.make_progress(1));
    }

    #[test]
    fn spinners_go_away_when_dropped() {
        let report = ProgressReport::hidden();
        let spinner = report.spinner("computing");
        assert!(!spinner.bar.is_finished());
        drop(spinner);
    }
}
