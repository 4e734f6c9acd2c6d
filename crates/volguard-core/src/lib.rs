//! Volguard Core - level metering and adaptive gain control
//!
//! This crate holds the numeric heart of the page agent: measuring how loud the
//! bound media currently is and turning that measurement into a corrective gain
//! that keeps the output under a configured ceiling.
//!
//! # Core Abstractions
//!
//! ## Metering
//!
//! - [`AnalysisSource`] - Anything that can fill a time-domain sample buffer
//! - [`LevelMeter`] - RMS + dBFS measurement over a fixed-length buffer
//!
//! ## Gain Control
//!
//! - [`GainController`] - Instant attack, 1%-per-tick release toward unity
//!
//! ## Agent Lifecycle
//!
//! - [`AgentPhase`] - `Idle → Initializing → Ready`, with a terminal `Failed`
//! - [`ReportThrottle`] - Decouples report cadence from tick cadence
//!
//! ## Utilities
//!
//! - Math functions: [`amplitude_to_dbfs`], [`dbfs_to_amplitude`], [`rms`]
//!
//! # no_std Support
//!
//! Nothing in this crate allocates after construction. Disable the default
//! `std` feature for embedded or wasm targets without an allocator-aware std:
//!
//! ```toml
//! [dependencies]
//! volguard-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use volguard_core::{AnalysisSource, GainController, LevelMeter};
//!
//! struct Tone(f32);
//!
//! impl AnalysisSource for Tone {
//!     fn read_time_domain(&mut self, out: &mut [f32]) {
//!         for (i, s) in out.iter_mut().enumerate() {
//!             *s = if i % 2 == 0 { self.0 } else { -self.0 };
//!         }
//!     }
//! }
//!
//! let mut meter = LevelMeter::new(256);
//! let mut gain = GainController::new();
//! gain.set_enabled(true);
//! gain.set_limit_db(-20.0);
//!
//! let reading = meter.measure(&mut Tone(0.5));
//! let applied = gain.tick(reading.rms);
//! assert!((applied - 0.2).abs() < 1e-4);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod gain;
pub mod math;
pub mod meter;
pub mod phase;
pub mod throttle;

pub use gain::{DEFAULT_LIMIT_DB, GainController, MIN_GAIN, RELEASE_FACTOR, UNITY_GAIN};
pub use math::{amplitude_to_dbfs, dbfs_to_amplitude, rms};
pub use meter::{AnalysisSource, DEFAULT_BUFFER_LEN, LevelMeter, LevelReading};
pub use phase::AgentPhase;
pub use throttle::{DEFAULT_REPORT_INTERVAL, ReportThrottle};
