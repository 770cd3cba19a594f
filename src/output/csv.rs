use super::{staging_path, OutputHandler};
use crate::error::Result;
use crate::model::Record;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct CsvOutput {
    writer: csv::Writer<File>,
    columns: Vec<String>,
    staging: PathBuf,
    path: PathBuf,
}

impl CsvOutput {
    pub fn new(path: PathBuf, columns: Vec<String>) -> Result<Self> {
        let staging = staging_path(&path);
        let mut writer = csv::Writer::from_path(&staging)?;
        writer.write_record(&columns)?;

        Ok(Self {
            writer,
            columns,
            staging,
            path,
        })
    }
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, record: &Record) -> Result<()> {
        let row = self.columns.iter().map(|col| cell(record.get(col)));
        self.writer.write_record(row)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        std::fs::rename(&self.staging, &self.path)?;
        Ok(self.path.clone())
    }
}

/// Absent and null become empty cells, everything else compact JSON. Strings
/// are written raw unless they are empty or would read back as some other
/// JSON value, in which case they are quoted.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value @ Value::String(s)) => {
            if s.is_empty() || serde_json::from_str::<Value>(s).is_ok() {
                value.to_string()
            } else {
                s.clone()
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Reads a page file back. Empty cells are left out of the record; cells
/// holding JSON are decoded and anything else is kept as text.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut fields = Map::new();
        for (header, raw) in headers.iter().zip(row.iter()) {
            if raw.is_empty() {
                continue;
            }
            fields.insert(header.to_string(), parse_cell(raw));
        }
        records.push(Record::new(fields));
    }
    Ok(records)
}

fn parse_cell(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}
