use crate::metrics::snapshot::BatchReport;
use std::ops::Range;
use std::time::Duration;

/// Per-run batch timings, used for the running mean and the remaining-time estimate.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    batch_durations: Vec<Duration>,
    apps_written: u64,
    batches_total: usize,
}

impl RunStatistics {
    pub fn new(batches_total: usize) -> Self {
        Self {
            batches_total,
            ..Self::default()
        }
    }

    pub fn record_batch(&mut self, range: Range<usize>, written: usize, elapsed: Duration) -> BatchReport {
        let batch_index = self.batch_durations.len();
        self.batch_durations.push(elapsed);
        self.apps_written += written as u64;

        let mean = self.mean_batch_time();
        let batches_remaining = self.batches_total.saturating_sub(batch_index + 1);

        BatchReport {
            batch_index,
            batches_total: self.batches_total,
            first_index: range.start,
            last_index: range.end.saturating_sub(1),
            apps_written: self.apps_written,
            elapsed_seconds: elapsed.as_secs_f64(),
            mean_seconds: mean.as_secs_f64(),
            remaining_seconds: mean.as_secs_f64() * batches_remaining as f64,
        }
    }

    pub fn mean_batch_time(&self) -> Duration {
        if self.batch_durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.batch_durations.iter().sum();
        total / self.batch_durations.len() as u32
    }

    pub fn apps_written(&self) -> u64 {
        self.apps_written
    }

    pub fn batches_completed(&self) -> usize {
        self.batch_durations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_uses_running_mean() {
        let mut stats = RunStatistics::new(4);

        let first = stats.record_batch(0..10, 10, Duration::from_secs(2));
        assert_eq!(first.batch_index, 0);
        assert_eq!(first.mean_seconds, 2.0);
        assert_eq!(first.remaining_seconds, 6.0);

        let second = stats.record_batch(10..20, 10, Duration::from_secs(4));
        assert_eq!(second.mean_seconds, 3.0);
        assert_eq!(second.remaining_seconds, 6.0);
        assert_eq!(second.first_index, 10);
        assert_eq!(second.last_index, 19);
        assert_eq!(stats.apps_written(), 20);
    }

    #[test]
    fn last_batch_has_nothing_remaining() {
        let mut stats = RunStatistics::new(1);
        let report = stats.record_batch(0..3, 3, Duration::from_millis(500));
        assert_eq!(report.remaining_seconds, 0.0);
        assert_eq!(stats.batches_completed(), 1);
    }

    #[test]
    fn empty_run_has_zero_mean() {
        assert_eq!(RunStatistics::new(0).mean_batch_time(), Duration::ZERO);
    }
}
