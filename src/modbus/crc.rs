//! # CRC-16/MODBUS Implementation
//!
//! Checksum used by Modbus RTU frames.
//!
//! **Polynomial**: 0x8005, reflected (0xA001)
//! **Initial Value**: 0xFFFF
//! **Wire order**: low byte first

/// Reflected CRC-16/MODBUS polynomial
const CRC16_POLY: u16 = 0xA001;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC-16/MODBUS checksum of `data`
///
/// # Examples
///
/// ```
/// use weather_station::modbus::crc::crc16_modbus;
///
/// // Wind speed request: 01 03 01 F4 00 01 -> C4 04 on the wire
/// assert_eq!(crc16_modbus(&[0x01, 0x03, 0x01, 0xF4, 0x00, 0x01]), 0x04C4);
/// ```
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ u16::from(byte)) & 0xFF) as usize];
    }

    crc
}

/// Check that the last two bytes of `frame` are the checksum of the rest
pub fn verify_frame(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    crc16_modbus(body) == u16::from_le_bytes([tail[0], tail[1]])
}

/// Bitwise reference implementation, used to check the table
#[allow(dead_code)]
fn crc16_modbus_slow(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= u16::from(byte);

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
