//! # Bounded Log
//!
//! CSV file holding a header line plus at most `storage_size` aggregated
//! rows, oldest first. Each append reads the file, drops the oldest rows
//! that no longer fit, appends the new row and rewrites the file through
//! the same handle.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::pipeline::aggregator::AggregatedRecord;

/// File name of the bounded log inside the data directory
pub const LATEST_FILE_NAME: &str = "latest_mean.csv";

/// Size-capped, header-preserving CSV log
#[derive(Debug, Clone)]
pub struct BoundedLog {
    path: PathBuf,
    header: String,
    storage_size: usize,
}

impl BoundedLog {
    /// # Arguments
    ///
    /// * `path` - CSV file to maintain
    /// * `header` - Header line (column names, no newline)
    /// * `storage_size` - Maximum number of data rows kept (at least 1)
    pub fn new(path: impl Into<PathBuf>, header: impl Into<String>, storage_size: usize) -> Self {
        Self {
            path: path.into(),
            header: header.into(),
            storage_size: storage_size.max(1),
        }
    }

    /// The bounded log at its usual place inside `data_dir`
    pub fn in_data_dir(data_dir: &Path, header: impl Into<String>, storage_size: usize) -> Self {
        Self::new(data_dir.join(LATEST_FILE_NAME), header, storage_size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, evicting the oldest rows beyond `storage_size`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created, read or rewritten.
    pub fn append(&self, record: &AggregatedRecord) -> Result<()> {
        self.append_row(&record.to_csv_row())
    }

    fn append_row(&self, row: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let mut lines = contents.lines();
        let mut rows: Vec<&str> = match lines.next() {
            Some(existing) if existing == self.header => lines.filter(|l| !l.is_empty()).collect(),
            Some(existing) => {
                warn!(
                    "Header of {} changed ({:?} -> {:?}), starting a new log",
                    self.path.display(),
                    existing,
                    self.header
                );
                Vec::new()
            }
            None => Vec::new(),
        };

        let keep = self.storage_size - 1;
        let evicted = rows.len().saturating_sub(keep);
        if evicted > 0 {
            rows.drain(..evicted);
            debug!("Evicted {} rows from {}", evicted, self.path.display());
        }

        let mut output = String::with_capacity(contents.len() + row.len() + self.header.len() + 2);
        output.push_str(&self.header);
        output.push('\n');
        for existing in rows {
            output.push_str(existing);
            output.push('\n');
        }
        output.push_str(row);
        output.push('\n');

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(output.as_bytes())?;
        file.sync_data()?;

        Ok(())
    }

    /// Data rows currently in the file, oldest first
    pub fn rows(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .skip(1)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}
