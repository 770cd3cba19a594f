/// Timing summary emitted after each batch completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub batch_index: usize,
    pub batches_total: usize,
    pub first_index: usize,
    pub last_index: usize,
    pub apps_written: u64,
    pub elapsed_seconds: f64,
    pub mean_seconds: f64,
    pub remaining_seconds: f64,
}

/// Renders whole seconds as `H:MM:SS`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
