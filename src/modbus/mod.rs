//! # Modbus RTU Module
//!
//! Wire format for the station's multi-element sensor.
//!
//! This module handles:
//! - Static per-metric request frames (address, function, register, count, CRC)
//! - CRC-16/MODBUS checksum calculation
//! - Reply validation and big-endian register decoding

pub mod protocol;
pub mod crc;
pub mod decoder;
