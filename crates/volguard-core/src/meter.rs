//! RMS level meter over a time-domain analysis buffer.
//!
//! Each tick the meter pulls a fresh buffer from an [`AnalysisSource`] (the
//! analyser node every bound element feeds), reduces it to RMS, and reports the
//! result in dBFS.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::math::{amplitude_to_dbfs, rms};

/// Default analysis buffer length (matches a 2048-point analyser window).
pub const DEFAULT_BUFFER_LEN: usize = 2048;

/// Something that can fill a buffer with the most recent time-domain samples.
///
/// Implementations write exactly `out.len()` samples. Sources with no signal
/// write zeros.
pub trait AnalysisSource {
    /// Fill `out` with the latest samples, oldest first.
    fn read_time_domain(&mut self, out: &mut [f32]);
}

impl<T: AnalysisSource + ?Sized> AnalysisSource for &mut T {
    fn read_time_domain(&mut self, out: &mut [f32]) {
        (**self).read_time_domain(out);
    }
}

/// One meter measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    /// Root-mean-square amplitude over the buffer.
    pub rms: f32,
    /// `rms` in dBFS; negative infinity for silence.
    pub db: f32,
}

impl LevelReading {
    /// Reading for a source that produced no signal.
    pub const SILENT: Self = Self {
        rms: 0.0,
        db: f32::NEG_INFINITY,
    };

    /// Build a reading from an RMS amplitude.
    pub fn from_rms(rms: f32) -> Self {
        Self {
            rms,
            db: amplitude_to_dbfs(rms),
        }
    }
}

/// RMS level meter.
///
/// Owns its scratch buffer so measuring never allocates.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    buffer: Vec<f32>,
}

impl LevelMeter {
    /// Create a meter reading `buffer_len` samples per measurement.
    ///
    /// A zero length is bumped to one sample.
    pub fn new(buffer_len: usize) -> Self {
        Self {
            buffer: vec![0.0; buffer_len.max(1)],
        }
    }

    /// Number of samples read per measurement.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Pull a buffer from `source` and measure it.
    pub fn measure<S: AnalysisSource + ?Sized>(&mut self, source: &mut S) -> LevelReading {
        self.buffer.fill(0.0);
        source.read_time_domain(&mut self.buffer);
        let level = rms(&self.buffer);
        if level.is_finite() {
            LevelReading::from_rms(level)
        } else {
            // A source emitting NaN/inf is treated as no usable signal.
            LevelReading::SILENT
        }
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LEN)
    }
}
