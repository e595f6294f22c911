//! # Weather Station Library
//!
//! Poll a Modbus RTU weather sensor over serial, aggregate the readings and
//! forward them to a remote collector.
//!
//! This library provides the sensor protocol, the sampling and aggregation
//! pipeline, the on-disk logs and the HTTP telemetry dispatcher used by the
//! `weather-station` daemon.

pub mod config;
pub mod error;
pub mod modbus;
pub mod serial;
pub mod device;
pub mod pipeline;
pub mod storage;
pub mod telemetry;
