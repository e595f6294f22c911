//! # Aggregator
//!
//! Reduces a window of raw samples to one record.
//!
//! Every value column is averaged over the window and rounded to two
//! decimals, except the last column. That column is a running counter (rain
//! gauge pulses), so its contribution is the increase across the window:
//! `last - first`.

use super::sample::{csv_row, Sample};

/// One reduced row, stamped at reduction time
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    /// Unix seconds at which the window was reduced
    pub timestamp: i64,
    /// One value per schema value column
    pub values: Vec<f64>,
}

impl AggregatedRecord {
    /// CSV row: timestamp followed by the values
    pub fn to_csv_row(&self) -> String {
        csv_row(self.timestamp, &self.values)
    }
}

/// Reduce `window` to a record stamped `now`
///
/// Returns `None` for an empty window; the caller skips the tick.
///
/// # Examples
///
/// ```
/// use weather_station::pipeline::aggregator::reduce;
/// use weather_station::pipeline::sample::Sample;
///
/// let window = vec![
///     Sample::new(0, vec![20.0, 50.0, 10.0]),
///     Sample::new(1, vec![20.4, 51.0, 12.0]),
///     Sample::new(2, vec![20.2, 49.5, 15.0]),
/// ];
/// let record = reduce(&window, 30).unwrap();
/// assert_eq!(record.values, vec![20.2, 50.17, 5.0]);
/// ```
pub fn reduce(window: &[Sample], now: i64) -> Option<AggregatedRecord> {
    let (first, last) = (window.first()?, window.last()?);
    let width = first.values.len();
    if width == 0 {
        return Some(AggregatedRecord {
            timestamp: now,
            values: Vec::new(),
        });
    }

    let count = window.len() as f64;
    let mut values: Vec<f64> = (0..width - 1)
        .map(|column| {
            let sum: f64 = window.iter().map(|s| column_value(s, column)).sum();
            round2(sum / count)
        })
        .collect();

    let counter = width - 1;
    values.push(column_value(last, counter) - column_value(first, counter));

    Some(AggregatedRecord {
        timestamp: now,
        values,
    })
}

/// Samples always carry the full schema; a short one reads as the sentinel.
fn column_value(sample: &Sample, column: usize) -> f64 {
    sample.values.get(column).copied().unwrap_or(0.0)
}

/// Round to two decimals, ties to even, on the exact binary value
///
/// `value * 100.0` is inexact, so the scaled value is built from the
/// mantissa in integer arithmetic instead. 10.125 rounds to 10.12 and
/// 2.675 (stored just below) to 2.67.
fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let bits = value.to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if biased_exp == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exp - 1075)
    };

    // already an integer
    if exp >= 0 {
        return value;
    }
    let shift = exp.unsigned_abs();
    if shift > 120 {
        return 0.0_f64.copysign(value);
    }

    let scaled = u128::from(mantissa) * 100;
    let mut hundredths = scaled >> shift;
    let remainder = scaled - (hundredths << shift);
    let half = 1u128 << (shift - 1);
    if remainder > half || (remainder == half && hundredths & 1 == 1) {
        hundredths += 1;
    }

    (hundredths as f64 / 100.0).copysign(value)
}
