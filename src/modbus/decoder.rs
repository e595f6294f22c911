//! # Modbus Response Decoder
//!
//! Decodes "read holding registers" replies from the sensor.

use super::crc::verify_frame;
use super::protocol::*;
use crate::error::{Result, StationError};

/// Decode a single-register reply into its raw 16-bit value
///
/// # Errors
///
/// Returns error if:
/// - Frame length is not [`SINGLE_RESPONSE_LEN`]
/// - Address, function code or byte count do not match the request
/// - CRC check fails
pub fn decode_register(response: &[u8]) -> Result<u16> {
    validate_reply(response, SINGLE_RESPONSE_LEN)?;
    Ok(u16::from_be_bytes([response[3], response[4]]))
}

/// Decode the combined temperature/humidity reply
///
/// The device sends humidity first, then temperature; both are tenths.
///
/// # Returns
///
/// * `Result<(f64, f64)>` - `(temperature, humidity)`
pub fn decode_temperature_humidity(response: &[u8]) -> Result<(f64, f64)> {
    validate_reply(response, PAIR_RESPONSE_LEN)?;
    let humidity = Scale::Tenths.apply(u16::from_be_bytes([response[3], response[4]]));
    let temperature = Scale::Tenths.apply(u16::from_be_bytes([response[5], response[6]]));
    Ok((temperature, humidity))
}

fn validate_reply(response: &[u8], expected_len: usize) -> Result<()> {
    if response.len() != expected_len {
        return Err(StationError::Protocol(format!(
            "Reply length mismatch: expected {} bytes, got {}",
            expected_len,
            response.len()
        )));
    }

    if response[0] != SENSOR_ADDRESS {
        return Err(StationError::Protocol(format!(
            "Unexpected device address: 0x{:02X}",
            response[0]
        )));
    }

    if response[1] != FUNCTION_READ_HOLDING {
        return Err(StationError::Protocol(format!(
            "Unexpected function code: 0x{:02X}",
            response[1]
        )));
    }

    // address + function + byte count + crc(2)
    let data_len = expected_len - 5;
    if usize::from(response[2]) != data_len {
        return Err(StationError::Protocol(format!(
            "Byte count mismatch: expected {}, got {}",
            data_len, response[2]
        )));
    }

    if !verify_frame(response) {
        return Err(StationError::Protocol("CRC mismatch".to_string()));
    }

    Ok(())
}

/// Build a well-formed reply carrying `registers`, as the sensor would send it
#[cfg(test)]
pub(crate) fn encode_reply(registers: &[u16]) -> Vec<u8> {
    use super::crc::crc16_modbus;

    let mut frame = vec![SENSOR_ADDRESS, FUNCTION_READ_HOLDING, (registers.len() * 2) as u8];
    for register in registers {
        frame.extend_from_slice(&register.to_be_bytes());
    }
    let crc = crc16_modbus(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}
