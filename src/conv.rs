// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Type conversion utilities
//!
//! Transfer sizes are represented as `i64` in the same way a transport
//! declares a content length, with [`UNKNOWN_LENGTH`] standing in for an
//! absent length. Buffers are measured in `usize`. Progress is an `f32`
//! ratio in the range `0.0..=1.0`.

use easy_cast::Conv;

/// Sentinel expected size: the transport did not declare a length
pub const UNKNOWN_LENGTH: i64 = -1;

/// Convert a declared content length to an expected size
///
/// Lengths too large for `i64` saturate (such a transfer never completes
/// anyway).
#[inline]
pub fn to_expected_size(len: Option<u64>) -> i64 {
    match len {
        Some(len) => i64::try_conv(len).unwrap_or(i64::MAX),
        None => UNKNOWN_LENGTH,
    }
}

/// Compute the ratio of `received` to `expected`, clamped to `[0, 1]`
///
/// Returns `None` when `expected` is unknown or zero, in which case no
/// meaningful ratio exists.
#[inline]
pub fn progress_ratio(received: usize, expected: i64) -> Option<f32> {
    if expected <= 0 {
        return None;
    }
    // Sizes not exactly representable saturate
    let received = f64::try_conv(received).unwrap_or(f64::MAX);
    let expected = f64::try_conv(expected).unwrap_or(f64::MAX);
    Some(narrow(received / expected))
}

// Round to nearest; `f32::conv_approx` truncates the mantissa
#[inline]
fn narrow(x: f64) -> f32 {
    clamp_progress(x as f32)
}

/// Clamp a progress value to `[0, 1]`
///
/// `NaN` maps to `0.0`.
#[inline]
pub fn clamp_progress(p: f32) -> f32 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Convert a provider percentage (`0..=100`) to a progress ratio
#[inline]
pub fn percent_to_progress(percent: f64) -> f32 {
    narrow(percent / 100.0)
}
