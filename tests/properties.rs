//! Property tests for the half float expansion and request encoding.

use proptest::prelude::*;
use sark110_rs::codec::{
    buzzer_request, decode_measure_response, measure_extended_request, measure_request,
};
use sark110_rs::{half_to_f32, Error, STATUS_OK};

// (−1)^s · 2^(e−15) · (1 + m/1024) for normals and (−1)^s · 2^(−14) · m/1024
// for subnormals. Every finite binary16 value is exact in binary32.
fn reference(half: u16) -> f32 {
    let sign = if half & 0x8000 != 0 { -1.0f64 } else { 1.0 };
    let exponent = i32::from((half >> 10) & 0x1f);
    let mantissa = f64::from(half & 0x3ff);
    let magnitude = if exponent == 0 {
        2f64.powi(-14) * mantissa / 1024.0
    } else {
        2f64.powi(exponent - 15) * (1.0 + mantissa / 1024.0)
    };
    (sign * magnitude) as f32
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Every finite half float expands to exactly the reference value.
    #[test]
    fn prop_finite_halves_match_reference(half in any::<u16>()) {
        prop_assume!((half >> 10) & 0x1f != 0x1f);
        let [lo, hi] = half.to_le_bytes();
        let got = half_to_f32(lo, hi);
        prop_assert_eq!(got.to_bits(), reference(half).to_bits(), "half {:#06x}", half);
    }

    /// Exponent all ones maps to infinity or NaN with the sign preserved.
    #[test]
    fn prop_non_finite_halves(sign in any::<bool>(), mantissa in 0u16..0x400) {
        let half = (u16::from(sign) << 15) | 0x7c00 | mantissa;
        let [lo, hi] = half.to_le_bytes();
        let got = half_to_f32(lo, hi);
        prop_assert_eq!(got.is_sign_negative(), sign);
        if mantissa == 0 {
            prop_assert!(got.is_infinite());
        } else {
            prop_assert!(got.is_nan());
            prop_assert_eq!(got.to_bits() & 0x007f_ffff, u32::from(mantissa) << 13);
        }
    }

    /// The frequency always lands little-endian at bytes 2..6, with the
    /// report ID placeholder left at zero.
    #[test]
    fn prop_measure_request_layout(freq in any::<u32>(), cal in any::<bool>(), samples in any::<u8>()) {
        let report = measure_request(freq, cal, samples);
        prop_assert_eq!(report[0], 0);
        prop_assert_eq!(report[1], 2);
        prop_assert_eq!(u32::from_le_bytes([report[2], report[3], report[4], report[5]]), freq);
        prop_assert_eq!(report[6], u8::from(cal));
        prop_assert_eq!(report[7], samples);
        prop_assert!(report[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_measure_extended_request_layout(freq in any::<u32>(), step in any::<u32>(), samples in any::<u8>()) {
        let report = measure_extended_request(freq, step, true, samples);
        prop_assert_eq!(report[0], 0);
        prop_assert_eq!(report[1], 12);
        prop_assert_eq!(u32::from_le_bytes([report[2], report[3], report[4], report[5]]), freq);
        prop_assert_eq!(report[6], 1);
        prop_assert_eq!(report[7], samples);
        prop_assert_eq!(u32::from_le_bytes([report[8], report[9], report[10], report[11]]), step);
        prop_assert!(report[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_buzzer_request_layout(freq in any::<u16>(), duration in any::<u16>()) {
        let report = buzzer_request(freq, duration);
        prop_assert_eq!(report[1], 20);
        prop_assert_eq!(u16::from_le_bytes([report[2], report[3]]), freq);
        prop_assert_eq!(u16::from_le_bytes([report[4], report[5]]), duration);
    }

    /// Any float bit pattern in an accepted reply comes back unchanged.
    #[test]
    fn prop_measure_reply_preserves_bits(rs in any::<u32>(), xs in any::<u32>(), offset in 0usize..2) {
        let mut reply = vec![0u8; offset];
        reply.push(STATUS_OK);
        reply.extend_from_slice(&rs.to_le_bytes());
        reply.extend_from_slice(&xs.to_le_bytes());
        let m = decode_measure_response(&reply, offset)
            .map_err(|e| TestCaseError::fail(format!("{e:?}")))?;
        prop_assert_eq!(m.rs.to_bits(), rs);
        prop_assert_eq!(m.xs.to_bits(), xs);
    }

    /// A status other than 'O' is always a nack, never a value.
    #[test]
    fn prop_non_ok_status_is_nack(status in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..18)) {
        prop_assume!(status != STATUS_OK);
        let mut reply = vec![status];
        reply.extend_from_slice(&payload);
        let is_nack = matches!(
            decode_measure_response(&reply, 0),
            Err(Error::DeviceNack { status: s }) if s == status
        );
        prop_assert!(is_nack);
    }
}
