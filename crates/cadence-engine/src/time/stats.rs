use std::time::{Duration, Instant};

/// What happened to one display tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// No drawable this tick.
    Skipped,
    /// The frame was aborted (encoding failure).
    Failed,
}

/// Counters for one reporting interval.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub presented: u64,
    pub skipped: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl FrameReport {
    /// Presented frames per second over the interval.
    pub fn fps(&self) -> f32 {
        let secs = self.elapsed.as_secs_f32();
        if secs > 0.0 { self.presented as f32 / secs } else { 0.0 }
    }
}

/// Accumulates tick outcomes and yields a report once per interval.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: Duration,
    window_start: Instant,
    presented: u64,
    skipped: u64,
    failed: u64,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            window_start: start,
            presented: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Records a tick; returns the interval's report when it has elapsed.
    pub fn record(&mut self, outcome: FrameOutcome, now: Instant) -> Option<FrameReport> {
        match outcome {
            FrameOutcome::Presented => self.presented += 1,
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Failed => self.failed += 1,
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let report = FrameReport {
            presented: self.presented,
            skipped: self.skipped,
            failed: self.failed,
            elapsed,
        };
        *self = Self::starting_at(self.interval, now);
        Some(report)
    }
}
