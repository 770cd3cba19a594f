use crate::error::Result;
use crate::metrics::collector::RunStatistics;
use crate::metrics::snapshot::format_duration;
use crate::model::{Record, WorkItem};
use crate::parser::RecordParser;
use indicatif::ProgressBar;
use std::ops::Range;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Splits `[begin, end)` into consecutive ranges of at most `batch_size` items.
pub fn batch_bounds(begin: usize, end: usize, batch_size: usize) -> Vec<Range<usize>> {
    let step = batch_size.max(1);
    (begin..end)
        .step_by(step)
        .map(|start| start..(start + step).min(end))
        .collect()
}

/// Drives a parser over a list of work items in timed batches.
pub struct BatchDriver {
    batch_size: usize,
    pause: Duration,
    progress: Option<ProgressBar>,
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_PAUSE)
    }
}

impl BatchDriver {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pause,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(
        &self,
        parser: &dyn RecordParser,
        items: &[WorkItem],
        begin: usize,
        end: Option<usize>,
    ) -> Result<Vec<Record>> {
        let (records, _) = self.run_with_stats(parser, items, begin, end).await?;
        Ok(records)
    }

    /// Like [`run`](Self::run), also returning the timing statistics of the run.
    pub async fn run_with_stats(
        &self,
        parser: &dyn RecordParser,
        items: &[WorkItem],
        begin: usize,
        end: Option<usize>,
    ) -> Result<(Vec<Record>, RunStatistics)> {
        let end = end.unwrap_or(items.len()).min(items.len());
        let batches = batch_bounds(begin, end, self.batch_size);
        let mut stats = RunStatistics::new(batches.len());
        let mut records = Vec::with_capacity(end.saturating_sub(begin));

        log::info!("Starting at index {} ({} batches)", begin, batches.len());
        if let Some(pb) = &self.progress {
            pb.set_length(end.saturating_sub(begin) as u64);
            pb.set_position(0);
        }

        for range in batches {
            let started = Instant::now();
            let before = records.len();

            for (index, item) in items[range.clone()].iter().enumerate() {
                log::debug!("Current index: {} (app {})", range.start + index, item.id);
                let record = parser.parse(item).await?;
                records.push(record);
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                    pb.set_message(item.name.clone());
                }
                sleep(self.pause).await;
            }

            let report = stats.record_batch(range, records.len() - before, started.elapsed());
            log::info!(
                "Batch {} (lines {}-{}) time: {} (avg: {}, remaining: {})",
                report.batch_index,
                report.first_index,
                report.last_index,
                format_duration(report.elapsed_seconds),
                format_duration(report.mean_seconds),
                format_duration(report.remaining_seconds),
            );
        }

        log::info!(
            "Processing batches complete. {} apps written",
            stats.apps_written()
        );
        Ok((records, stats))
    }
}
