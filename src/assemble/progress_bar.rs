//! Progress reporting for table assembly (`progress` feature).
//!
//! [`BatchProgress`] wraps an indicatif bar advanced once per decoded batch.
//! Its message shows the decoding throughput of the last batch next to a
//! smoothed rate `rate ← α·sample + (1–α)·rate`, seeded by the first batch.
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} records ({percent:>3}%) | ETA {eta_precise} | {msg}";

/// Weight of the newest batch in the smoothed rate.
const SMOOTHING: f64 = 0.2;

/// Records per second decoded in `elapsed`; zero for an empty interval.
fn records_per_sec(records: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        records as f64 / secs
    } else {
        0.0
    }
}

fn smoothed(previous: Option<f64>, sample: f64) -> f64 {
    match previous {
        None => sample,
        Some(rate) => SMOOTHING * sample + (1.0 - SMOOTHING) * rate,
    }
}

/// Record-level progress bar for one assembly run.
pub struct BatchProgress {
    bar: ProgressBar,
    batch_started: Instant,
    rate: Option<f64>,
}

impl BatchProgress {
    pub fn new(total_records: usize) -> Self {
        let bar = ProgressBar::new(total_records.max(1) as u64);
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(200));
        BatchProgress {
            bar,
            batch_started: Instant::now(),
            rate: None,
        }
    }

    /// Account for one decoded batch of `records` records.
    pub fn batch_done(&mut self, records: usize) {
        let now = Instant::now();
        let sample = records_per_sec(records, now.duration_since(self.batch_started));
        self.batch_started = now;
        let rate = smoothed(self.rate, sample);
        self.rate = Some(rate);

        self.bar
            .set_message(format!("batch: {sample:.0} rec/s, avg: {rate:.0} rec/s"));
        self.bar.inc(records as u64);
    }

    pub fn interrupted(&self) {
        self.bar.set_message("Interrupted");
        self.finish();
    }

    pub fn finish(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_records_per_sec() {
        assert_relative_eq!(records_per_sec(500, Duration::from_millis(250)), 2000.0);
        assert_eq!(records_per_sec(500, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_rate_is_seeded_by_first_batch() {
        let first = smoothed(None, 1000.0);
        assert_relative_eq!(first, 1000.0);
        assert_relative_eq!(smoothed(Some(first), 2000.0), 1200.0);
    }

    #[test]
    fn test_batch_done_advances_the_bar() {
        let mut progress = BatchProgress::new(10);
        progress.batch_done(4);
        progress.batch_done(6);
        assert_eq!(progress.bar.position(), 10);
        assert!(progress.rate.is_some());
        progress.finish();
    }
}
