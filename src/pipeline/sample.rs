//! Raw samples and the column schema shared by every stage.

use crate::modbus::protocol::Metric;

/// Name of the leading timestamp column
pub const TIME_COLUMN: &str = "time";

/// Columns always sampled first, from the combined register pair
pub const LEADING_COLUMNS: [&str; 2] = ["temperature", "humidity"];

/// Ordered column names: `time`, `temperature`, `humidity`, then the
/// configured metrics. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new(metrics: &[Metric]) -> Self {
        let columns = std::iter::once(TIME_COLUMN)
            .chain(LEADING_COLUMNS)
            .chain(metrics.iter().map(|m| m.name()))
            .map(str::to_string)
            .collect();
        Self { columns }
    }

    /// All column names including `time`
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column names of the value vector (everything but `time`)
    pub fn value_columns(&self) -> &[String] {
        &self.columns[1..]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// CSV header line (without trailing newline)
    pub fn header(&self) -> String {
        self.columns.join(",")
    }
}

/// One timestamped reading of every column
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Unix seconds
    pub timestamp: i64,
    /// One value per schema value column
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    /// CSV row: timestamp followed by the values
    pub fn to_csv_row(&self) -> String {
        csv_row(self.timestamp, &self.values)
    }
}

pub(crate) fn csv_row(timestamp: i64, values: &[f64]) -> String {
    let mut row = timestamp.to_string();
    for value in values {
        row.push(',');
        row.push_str(&value.to_string());
    }
    row
}
