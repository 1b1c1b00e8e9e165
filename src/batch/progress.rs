//! Batch run counters and throughput logging.
//!
//! The counters are owned by the single collector task, so they are plain
//! integers rather than atomics. Workers never touch them directly.

use std::time::{Duration, Instant};

/// How many completions between throughput log lines.
pub const LOG_EVERY: usize = 25;

/// Snapshot of batch counters at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Samples resolved so far (successes plus failures).
    pub completed: usize,
    pub generated: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Solver attempts reported by the service for successful samples.
    pub total_attempts: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// Hits over all answered lookups, 0 when nothing was answered.
    pub fn cache_hit_ratio(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups > 0 {
            self.cache_hits as f64 / lookups as f64
        } else {
            0.0
        }
    }

    pub fn average_attempts(&self) -> f64 {
        if self.generated > 0 {
            self.total_attempts as f64 / self.generated as f64
        } else {
            0.0
        }
    }
}

/// Running totals for one batch run.
#[derive(Debug, Clone)]
pub struct BatchStats {
    target: usize,
    start: Instant,
    generated: usize,
    failed: usize,
    cache_hits: usize,
    cache_misses: usize,
    total_attempts: u64,
}

impl BatchStats {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            start: Instant::now(),
            generated: 0,
            failed: 0,
            cache_hits: 0,
            cache_misses: 0,
            total_attempts: 0,
        }
    }

    /// Record whether the service answered from cache.
    pub fn record_lookup(&mut self, cached: bool) {
        if cached {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    pub fn record_success(&mut self, attempts: u32) {
        self.generated += 1;
        self.total_attempts += u64::from(attempts);
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn completed(&self) -> usize {
        self.generated + self.failed
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed(),
            generated: self.generated,
            failed: self.failed,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            total_attempts: self.total_attempts,
            elapsed: self.start.elapsed(),
        }
    }

    /// Log throughput every [`LOG_EVERY`] completions. The final line is left
    /// to the caller once the run is finished. Returns whether a line was logged.
    pub fn maybe_log(&self) -> bool {
        let completed = self.completed();
        let due = completed > 0 && completed % LOG_EVERY == 0 && completed < self.target;
        if due {
            self.log();
        }
        due
    }

    pub fn log(&self) {
        let snap = self.snapshot();
        let pct = if self.target > 0 {
            (snap.completed as f64 / self.target as f64 * 100.0).min(100.0)
        } else {
            100.0
        };

        tracing::info!(
            completed = snap.completed,
            target = self.target,
            generated = snap.generated,
            failed = snap.failed,
            cache_hits = snap.cache_hits,
            cache_misses = snap.cache_misses,
            progress_pct = format!("{:.1}%", pct),
            elapsed_secs = snap.elapsed.as_secs(),
            samples_per_sec = format!("{:.2}", snap.samples_per_second()),
            hit_ratio = format!("{:.3}", snap.cache_hit_ratio()),
            "Batch progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = BatchStats::new(4);
        stats.record_lookup(false);
        stats.record_success(3);
        stats.record_lookup(true);
        stats.record_success(1);
        stats.record_lookup(false);
        stats.record_failure();
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.completed, 4);
        assert_eq!(snap.generated, 2);
        assert_eq!(snap.failed, 2);
        assert_eq!(snap.total_attempts, 4);
        assert!((snap.average_attempts() - 2.0).abs() < 1e-12);
        assert!((snap.cache_hit_ratio() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_log_skips_final_completion() {
        let mut stats = BatchStats::new(2 * LOG_EVERY);
        let mut logged = Vec::new();
        for _ in 0..2 * LOG_EVERY {
            stats.record_success(1);
            if stats.maybe_log() {
                logged.push(stats.completed());
            }
        }
        assert_eq!(logged, vec![LOG_EVERY]);
    }

    #[test]
    fn test_ratios_on_empty_run() {
        let snap = BatchStats::new(0).snapshot();
        assert_eq!(snap.cache_hit_ratio(), 0.0);
        assert_eq!(snap.average_attempts(), 0.0);
    }
}
