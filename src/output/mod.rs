use crate::config::schema::OutputFormat;
use crate::error::Result;
use crate::model::Record;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub mod csv;
pub mod json;

/// A sink for one page's records. Nothing is visible at the final path
/// until `close` succeeds.
#[async_trait]
pub trait OutputHandler: Send {
    async fn write(&mut self, record: &Record) -> Result<()>;
    async fn close(&mut self) -> Result<PathBuf>;
}

pub fn page_path(dir: &Path, page: u32, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", page, format.extension()))
}

pub fn open_page(
    dir: &Path,
    page: u32,
    format: OutputFormat,
    columns: &[String],
) -> Result<Box<dyn OutputHandler>> {
    let path = page_path(dir, page, format);
    let handler: Box<dyn OutputHandler> = match format {
        OutputFormat::Csv => Box::new(csv::CsvOutput::new(path, columns.to_vec())?),
        OutputFormat::Json => Box::new(json::JsonOutput::new(path, columns.to_vec())?),
    };
    Ok(handler)
}

/// Keeps only the declared columns, filling absent ones with null.
pub fn project(record: &Record, columns: &[String]) -> Map<String, Value> {
    columns
        .iter()
        .map(|col| (col.clone(), record.get(col).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
