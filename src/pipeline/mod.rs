//! # Pipeline Module
//!
//! Sampling, windowing and aggregation.
//!
//! Data flows Device Link -> [`collector`] -> [`window`] -> [`aggregator`],
//! then on to storage and telemetry; [`runner`] drives the sampling and
//! aggregation tasks on their own timers.

pub mod sample;
pub mod window;
pub mod collector;
pub mod aggregator;
pub mod runner;

pub use aggregator::{reduce, AggregatedRecord};
pub use collector::SampleCollector;
pub use sample::{Sample, Schema};
pub use window::{WindowBuffer, WindowSnapshot};
