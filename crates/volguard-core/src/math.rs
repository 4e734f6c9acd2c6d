//! Level math for metering.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`amplitude_to_dbfs`] / [`dbfs_to_amplitude`] - Convert between linear
//!   amplitude and decibels relative to full scale
//!
//! # Signal Energy
//!
//! - [`rms`] - Root-mean-square amplitude of a sample buffer

use libm::{expf, log10f, sqrtf};

/// Convert a linear amplitude to dBFS.
///
/// Computes `20·log10(amplitude)`. Exact silence (and anything that is not a
/// positive amplitude) maps to negative infinity, so callers can tell "no
/// signal" apart from "very quiet".
///
/// # Example
/// ```rust
/// use volguard_core::amplitude_to_dbfs;
///
/// assert!((amplitude_to_dbfs(1.0) - 0.0).abs() < 1e-6);
/// assert!((amplitude_to_dbfs(0.1) - (-20.0)).abs() < 1e-4);
/// assert_eq!(amplitude_to_dbfs(0.0), f32::NEG_INFINITY);
/// ```
#[inline]
pub fn amplitude_to_dbfs(amplitude: f32) -> f32 {
    if amplitude > 0.0 {
        20.0 * log10f(amplitude)
    } else {
        f32::NEG_INFINITY
    }
}

/// Convert dBFS to a linear amplitude.
///
/// # Returns
/// `10^(db/20)`: 0 dB → 1.0, -20 dB → 0.1, `-∞` → 0.0
///
/// # Example
/// ```rust
/// use volguard_core::dbfs_to_amplitude;
///
/// assert!((dbfs_to_amplitude(0.0) - 1.0).abs() < 1e-6);
/// assert!((dbfs_to_amplitude(-20.0) - 0.1).abs() < 1e-6);
/// ```
#[inline]
pub fn dbfs_to_amplitude(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Root-mean-square amplitude of a buffer.
///
/// Returns 0.0 for an empty buffer.
#[inline]
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = buffer.iter().map(|s| s * s).sum();
    sqrtf(sum_sq / buffer.len() as f32)
}
