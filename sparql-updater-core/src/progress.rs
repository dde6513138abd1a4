//! Progress logging for long runs

use std::time::{Duration, Instant};
use tracing::info;

const SECS_PER_MIN: f64 = 60.0;
const MINS_PER_HOUR: f64 = 60.0;

/// Logs "n of total" progress with an ETA, at most once every
/// `log_after` interval no matter how often [`ProgressLogger::item_done`]
/// is called.
#[derive(Debug)]
pub struct ProgressLogger {
    start: Instant,
    last_log: Instant,
    total_items: u64,
    items_done: u64,
    log_after: Option<Duration>,
}

impl ProgressLogger {
    /// `log_after = None` disables logging (the counter still runs).
    pub fn new(total_items: u64, log_after: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_log: now,
            total_items,
            items_done: 0,
            log_after,
        }
    }

    pub fn items_done(&self) -> u64 {
        self.items_done
    }

    /// Count one more item and log if the interval has elapsed.
    pub fn item_done(&mut self) {
        self.items_done += 1;
        let Some(log_after) = self.log_after else {
            return;
        };
        let now = Instant::now();
        if now.duration_since(self.last_log) < log_after {
            return;
        }
        self.last_log = now;

        if self.total_items == 0 {
            info!(done = self.items_done, "Processed {} data sets", self.items_done);
            return;
        }

        let elapsed = now.duration_since(self.start).as_secs_f64().max(f64::EPSILON);
        let per_sec = self.items_done as f64 / elapsed;
        let remaining = self.total_items.saturating_sub(self.items_done) as f64;
        let eta = duration_text(Duration::from_secs_f64(remaining / per_sec.max(f64::EPSILON)));
        let per_min = per_sec * SECS_PER_MIN;
        if per_min > 3.0 {
            info!(
                "Processed {} sets of {} ({} sets/min). Expected time remaining is {}",
                self.items_done,
                self.total_items,
                per_min.round(),
                eta
            );
        } else {
            info!(
                "Processed {} sets of {} ({} sets/hour). Expected time remaining is {}",
                self.items_done,
                self.total_items,
                (per_min * MINS_PER_HOUR).round(),
                eta
            );
        }
    }
}

/// Human readable duration, e.g. `"3 minutes and 12 seconds"`.
pub fn duration_text(d: Duration) -> String {
    let total_secs = d.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();

    if days >= 1 {
        format!("{days} days, {hours} hours and {minutes} minutes")
    } else if hours >= 1 {
        format!("{hours} hours and {minutes} minutes")
    } else if minutes >= 1 {
        format!("{minutes} minutes and {seconds} seconds")
    } else if total_secs >= 10 {
        format!("{total_secs} seconds")
    } else if total_secs >= 2 {
        format!("{seconds} seconds and {millis} milliseconds")
    } else {
        format!("{} milliseconds", d.as_millis())
    }
}

/// `H:MM:SS`, used for per-dataset ingest timings.
pub fn clock_text(d: Duration) -> String {
    let s = d.as_secs();
    format!("{}:{:02}:{:02}", s / 3_600, (s % 3_600) / 60, s % 60)
}
