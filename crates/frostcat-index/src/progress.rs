//! Human-readable scan progress

use std::time::Duration;

use tracing::info;

/// Receives status lines while a scan runs
pub trait ProgressSink {
    /// One status line
    fn line(&mut self, text: &str);

    /// Periodic summary after `done` of `total` files
    fn progress(&mut self, done: usize, total: usize, elapsed: Duration) {
        let eta = estimate_remaining(elapsed, done, total);
        self.line(&format!(
            "{done}/{total} files done. - Elapsed: {} ETA: {}",
            format_duration(elapsed),
            format_duration(eta)
        ));
    }
}

/// Forwards lines to `tracing` at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn line(&mut self, text: &str) {
        info!("{text}");
    }
}

/// Collects lines in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Lines received so far
    pub lines: Vec<String>,
}

impl MemorySink {
    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl ProgressSink for MemorySink {
    fn line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Time left, extrapolated from the average time per finished file
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Duration {
    if done == 0 {
        return Duration::ZERO;
    }
    let per_file = elapsed.as_secs_f64() / done as f64;
    Duration::from_secs_f64(per_file * total.saturating_sub(done) as f64)
}

/// `HH:MM:SS.mmm`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_millis()
    )
}
