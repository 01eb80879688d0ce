//! Encoding of outbound command reports and decoding of instrument replies.
//!
//! Outbound reports are always [`REPORT_LEN`] bytes: byte 0 is the report ID
//! placeholder, byte 1 the opcode and the remainder the zero-padded payload.
//! Inbound reports start with a status byte followed by the payload. Whether
//! that status byte sits at index 0 or 1 depends on the HID stack, so every
//! decoder takes the offset supplied by the channel.

use log::debug;

use crate::constants::{Opcode, REPORT_ID, REPORT_LEN, STATUS_OK};
use crate::error::{Error, Result};
use crate::{ExtendedMeasurement, Measurement, VersionInfo, VERSION_LEN};

/// A complete outbound report, report ID included.
pub type Report = [u8; REPORT_LEN];

// Payload sizes of the replies, status byte excluded.
pub const MEASURE_PAYLOAD_LEN: usize = 8;
pub const VERSION_PAYLOAD_LEN: usize = 2 + VERSION_LEN;
pub const EXTENDED_PAYLOAD_LEN: usize = 16;

const MAX_PAYLOAD_LEN: usize = REPORT_LEN - 2;

pub fn encode_u16_le(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}

pub fn encode_u32_le(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

/// Builds an outbound report for `opcode` carrying `payload` from byte 2 on.
///
/// Returns `Error::InvalidArg` if the payload does not fit in the report.
pub fn build_request(opcode: Opcode, payload: &[u8]) -> Result<Report> {
    let mut report = [0u8; REPORT_LEN];
    report[0] = REPORT_ID;
    report[1] = opcode.into();
    let slot = report
        .get_mut(2..2 + payload.len())
        .ok_or(Error::InvalidArg("payload does not fit in a report"))?;
    slot.copy_from_slice(payload);
    Ok(report)
}

/// Measure request: freq (u32 LE), calibrated flag, sample count.
pub fn measure_request(freq_hz: u32, calibrated: bool, samples: u8) -> Report {
    let mut report = [0u8; REPORT_LEN];
    report[1] = Opcode::Measure.into();
    report[2..6].copy_from_slice(&encode_u32_le(freq_hz));
    report[6] = u8::from(calibrated);
    report[7] = samples;
    report
}

/// Extended measure request: as [`measure_request`] plus the step (u32 LE) at offset 8.
pub fn measure_extended_request(
    freq_hz: u32,
    step_hz: u32,
    calibrated: bool,
    samples: u8,
) -> Report {
    let mut report = measure_request(freq_hz, calibrated, samples);
    report[1] = Opcode::MeasureExtended.into();
    report[8..12].copy_from_slice(&encode_u32_le(step_hz));
    report
}

/// Buzzer request: tone frequency and duration, both u16 LE.
pub fn buzzer_request(freq_hz: u16, duration_ms: u16) -> Report {
    let mut report = [0u8; REPORT_LEN];
    report[1] = Opcode::Buzzer.into();
    report[2..4].copy_from_slice(&encode_u16_le(freq_hz));
    report[4..6].copy_from_slice(&encode_u16_le(duration_ms));
    report
}

/// Checks the status byte and returns the payload following it.
///
/// A report too short to hold the status byte is malformed. A status other
/// than [`STATUS_OK`] is a nack, whatever the payload length.
pub fn check_status(report: &[u8], status_offset: usize) -> Result<&[u8]> {
    let status = *report.get(status_offset).ok_or(Error::MalformedResponse {
        expected: status_offset + 1,
        actual: report.len(),
    })?;
    if status != STATUS_OK {
        debug!("Nack status {} in report {:02X?}", status, report);
        return Err(Error::DeviceNack { status });
    }
    Ok(&report[status_offset + 1..])
}

// Status check plus a length check for the payload the decoder is about to read.
fn payload(report: &[u8], status_offset: usize, len: usize) -> Result<&[u8]> {
    let payload = check_status(report, status_offset)?;
    payload.get(..len).ok_or(Error::MalformedResponse {
        expected: status_offset + 1 + len,
        actual: report.len(),
    })
}

fn field<const N: usize>(payload: &[u8], at: usize) -> Result<[u8; N]> {
    payload
        .get(at..at + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(Error::MalformedResponse {
            expected: at + N,
            actual: payload.len(),
        })
}

/// Decodes a measure reply: resistance then reactance, both f32 LE.
pub fn decode_measure_response(report: &[u8], status_offset: usize) -> Result<Measurement> {
    let payload = payload(report, status_offset, MEASURE_PAYLOAD_LEN)?;
    Ok(Measurement {
        rs: f32::from_le_bytes(field(payload, 0)?),
        xs: f32::from_le_bytes(field(payload, 4)?),
    })
}

/// Decodes a version reply: protocol (u16 LE) then 15 raw version bytes.
pub fn decode_version_response(report: &[u8], status_offset: usize) -> Result<VersionInfo> {
    let payload = payload(report, status_offset, VERSION_PAYLOAD_LEN)?;
    let [lo, hi] = field::<2>(payload, 0)?;
    Ok(VersionInfo {
        protocol: u16::from(lo) | (u16::from(hi) << 8),
        version: field(payload, 2)?,
    })
}

/// Decodes an extended measure reply: four (rs, xs) pairs of half floats.
pub fn decode_extended_response(
    report: &[u8],
    status_offset: usize,
) -> Result<ExtendedMeasurement> {
    let payload = payload(report, status_offset, EXTENDED_PAYLOAD_LEN)?;
    let mut points = [Measurement::default(); 4];
    for (i, point) in points.iter_mut().enumerate() {
        let [rs_lo, rs_hi] = field::<2>(payload, i * 4)?;
        let [xs_lo, xs_hi] = field::<2>(payload, i * 4 + 2)?;
        *point = Measurement {
            rs: half_to_f32(rs_lo, rs_hi),
            xs: half_to_f32(xs_lo, xs_hi),
        };
    }
    Ok(ExtendedMeasurement { points })
}

/// Expands an IEEE-754 binary16 value, given as its two wire bytes, to binary32.
///
/// The result is assembled bit by bit, so signed zeros, subnormals,
/// infinities and NaN payloads all survive the expansion.
pub fn half_to_f32(byte_lo: u8, byte_hi: u8) -> f32 {
    let half = (u32::from(byte_hi) << 8) | u32::from(byte_lo);
    let sign = (half >> 15) & 0x1;
    let exponent = (half >> 10) & 0x1f;
    let mut mantissa = half & 0x3ff;

    let bits = match exponent {
        0 if mantissa == 0 => sign << 31,
        0 => {
            // Subnormal: shift until the implicit bit shows up, then drop it.
            let mut rebiased: u32 = 1 + (127 - 15);
            while mantissa & 0x400 == 0 {
                mantissa <<= 1;
                rebiased -= 1;
            }
            mantissa &= !0x400;
            (sign << 31) | (rebiased << 23) | (mantissa << 13)
        }
        0x1f => (sign << 31) | 0x7f80_0000 | (mantissa << 13),
        _ => (sign << 31) | ((exponent + (127 - 15)) << 23) | (mantissa << 13),
    };
    f32::from_bits(bits)
}
