//! # Raw Log
//!
//! Unbounded, date-partitioned CSV of every raw sample:
//! `data_dir/YYYY/MM/DD.csv`, one header line per file. Samples are
//! partitioned by their own local date, so a batch that straddles midnight
//! lands in two files.

use chrono::{Local, TimeZone};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::sample::Sample;

/// Appends raw samples to one CSV file per local calendar day
#[derive(Debug, Clone)]
pub struct DailyRawLog {
    data_dir: PathBuf,
    header: String,
}

impl DailyRawLog {
    pub fn new(data_dir: impl Into<PathBuf>, header: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            header: header.into(),
        }
    }

    /// File that holds samples stamped `timestamp`
    pub fn path_for_timestamp(&self, timestamp: i64) -> PathBuf {
        match Local.timestamp_opt(timestamp, 0).earliest() {
            Some(local) => self
                .data_dir
                .join(local.format("%Y").to_string())
                .join(local.format("%m").to_string())
                .join(format!("{}.csv", local.format("%d"))),
            None => self.data_dir.join("undated.csv"),
        }
    }

    /// Append `samples` (oldest first) to their daily files
    ///
    /// # Errors
    ///
    /// Returns error on the first file that cannot be created or written;
    /// samples for earlier days in the batch are already persisted.
    pub fn append(&self, samples: &[Sample]) -> Result<()> {
        let mut start = 0;
        while start < samples.len() {
            let path = self.path_for_timestamp(samples[start].timestamp);
            let mut end = start + 1;
            while end < samples.len() && self.path_for_timestamp(samples[end].timestamp) == path {
                end += 1;
            }
            self.append_to(&path, &samples[start..end])?;
            start = end;
        }
        Ok(())
    }

    fn append_to(&self, path: &Path, samples: &[Sample]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut output = String::new();
        if file.metadata()?.len() == 0 {
            output.push_str(&self.header);
            output.push('\n');
        }
        for sample in samples {
            output.push_str(&sample.to_csv_row());
            output.push('\n');
        }

        file.write_all(output.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "time,temperature,rain";

    #[test]
    fn test_path_layout() {
        let log = DailyRawLog::new("/data", HEADER);
        let ts = 1_700_000_000;
        let local = Local.timestamp_opt(ts, 0).unwrap();

        let expected = PathBuf::from("/data")
            .join(local.format("%Y").to_string())
            .join(local.format("%m").to_string())
            .join(format!("{}.csv", local.format("%d")));
        assert_eq!(log.path_for_timestamp(ts), expected);
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let log = DailyRawLog::new(dir.path(), HEADER);
        let ts = 1_700_000_000;

        log.append(&[Sample::new(ts, vec![20.0, 1.0])]).unwrap();
        log.append(&[Sample::new(ts + 1, vec![20.5, 1.5])]).unwrap();

        let contents = fs::read_to_string(log.path_for_timestamp(ts)).unwrap();
        assert_eq!(
            contents,
            format!("{}\n{},20,1\n{},20.5,1.5\n", HEADER, ts, ts + 1)
        );
    }

    #[test]
    fn test_batch_across_midnight_is_split() {
        let dir = TempDir::new().unwrap();
        let log = DailyRawLog::new(dir.path(), HEADER);
        let today = 1_700_000_000;
        let tomorrow = today + 86_400;

        log.append(&[
            Sample::new(today, vec![1.0, 0.0]),
            Sample::new(tomorrow, vec![2.0, 0.0]),
        ])
        .unwrap();

        let first = fs::read_to_string(log.path_for_timestamp(today)).unwrap();
        let second = fs::read_to_string(log.path_for_timestamp(tomorrow)).unwrap();
        assert_eq!(first.lines().count(), 2);
        assert_eq!(second.lines().count(), 2);
        assert!(second.ends_with(&format!("{},2,0\n", tomorrow)));
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let log = DailyRawLog::new(dir.path(), HEADER);
        log.append(&[]).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
