//! Decoder for the Bluetooth GATT Heart Rate Measurement characteristic (0x2A37).

use serde::{Deserialize, Serialize};
use thiserror::Error;

const FLAG_HR_U16: u8 = 0x01;
const FLAG_CONTACT_SUPPORTED: u8 = 0x04;
const FLAG_CONTACT_DETECTED: u8 = 0x02;
const FLAG_ENERGY_EXPENDED: u8 = 0x08;
const FLAG_RR_PRESENT: u8 = 0x10;

/// RR values are transmitted in 1/1024 second ticks.
pub const RR_TICKS_PER_SECOND: f64 = 1024.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty heart rate payload")]
    Empty,
    #[error("payload truncated: {field} needs {needed} byte(s) at offset {offset}, have {len}")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorContact {
    NotSupported,
    NotDetected,
    Detected,
}

/// One decoded heart rate notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateMeasurement {
    pub bpm: u16,
    pub sensor_contact: SensorContact,
    /// Cumulative energy expended in kJ, when reported.
    pub energy_expended: Option<u16>,
    pub rr_intervals_ms: Vec<f64>,
}

/// Convert a raw RR value (1/1024 s) to milliseconds.
pub fn rr_ticks_to_ms(raw: u16) -> f64 {
    raw as f64 * (1000.0 / RR_TICKS_PER_SECOND)
}

fn read_u16(payload: &[u8], offset: usize, field: &'static str) -> Result<u16, DecodeError> {
    payload
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(DecodeError::Truncated {
            field,
            offset,
            needed: 2,
            len: payload.len(),
        })
}

/// Decode a characteristic value into BPM and RR intervals.
///
/// A trailing odd byte after the RR list is ignored.
pub fn decode_measurement(payload: &[u8]) -> Result<HeartRateMeasurement, DecodeError> {
    let flags = *payload.first().ok_or(DecodeError::Empty)?;
    let mut offset = 1;

    let bpm = if flags & FLAG_HR_U16 != 0 {
        let v = read_u16(payload, offset, "heart rate")?;
        offset += 2;
        v
    } else {
        let v = *payload.get(offset).ok_or(DecodeError::Truncated {
            field: "heart rate",
            offset,
            needed: 1,
            len: payload.len(),
        })?;
        offset += 1;
        v as u16
    };

    let sensor_contact = if flags & FLAG_CONTACT_SUPPORTED == 0 {
        SensorContact::NotSupported
    } else if flags & FLAG_CONTACT_DETECTED != 0 {
        SensorContact::Detected
    } else {
        SensorContact::NotDetected
    };

    let energy_expended = if flags & FLAG_ENERGY_EXPENDED != 0 {
        let v = read_u16(payload, offset, "energy expended")?;
        offset += 2;
        Some(v)
    } else {
        None
    };

    let mut rr_intervals_ms = Vec::new();
    if flags & FLAG_RR_PRESENT != 0 {
        while offset + 1 < payload.len() {
            rr_intervals_ms.push(rr_ticks_to_ms(read_u16(payload, offset, "rr interval")?));
            offset += 2;
        }
    }

    Ok(HeartRateMeasurement {
        bpm,
        sensor_contact,
        energy_expended,
        rr_intervals_ms,
    })
}

/// Parse hex text such as `10 48 00 04` or `10480004` into bytes.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, DecodeError> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits.as_str());
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(text.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| DecodeError::InvalidHex(text.to_string()))
        })
        .collect()
}

pub fn decode_hex_measurement(text: &str) -> Result<HeartRateMeasurement, DecodeError> {
    decode_measurement(&parse_hex(text)?)
}
