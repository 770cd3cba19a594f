use super::{project, staging_path, OutputHandler};
use crate::error::Result;
use crate::model::Record;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub struct JsonOutput {
    file: BufWriter<File>,
    columns: Vec<String>,
    first: bool,
    staging: PathBuf,
    path: PathBuf,
}

impl JsonOutput {
    pub fn new(path: PathBuf, columns: Vec<String>) -> Result<Self> {
        let staging = staging_path(&path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&staging)?;
        let mut file = BufWriter::new(file);

        write!(file, "[")?;

        Ok(Self {
            file,
            columns,
            first: true,
            staging,
            path,
        })
    }
}

#[async_trait]
impl OutputHandler for JsonOutput {
    async fn write(&mut self, record: &Record) -> Result<()> {
        if !self.first {
            write!(self.file, ",")?;
        } else {
            self.first = false;
        }

        serde_json::to_writer(&mut self.file, &project(record, &self.columns))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<PathBuf> {
        write!(self.file, "]")?;
        self.file.flush()?;
        std::fs::rename(&self.staging, &self.path)?;
        Ok(self.path.clone())
    }
}
