use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHECKPOINT_FILE: &str = "checkpoint.json";

/// The last page whose output file was fully written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_completed_page: u32,
    pub records_written: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(last_completed_page: u32, records_written: u64) -> Self {
        Self {
            last_completed_page,
            records_written,
            updated_at: Utc::now(),
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(CHECKPOINT_FILE)
    }

    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes through a temporary file so a crash never leaves a torn checkpoint.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        let tmp = path.with_extension("json.part");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// First page still to crawl when resuming a `[start, ..]` run.
    pub fn resume_from(&self, start: u32) -> u32 {
        start.max(self.last_completed_page.saturating_add(1))
    }
}
