//! Property-based tests for volguard-core.
//!
//! Covers the dBFS conversion and the gain controller's bounds, attack, and
//! release guarantees using proptest for randomized input sequences.

use proptest::prelude::*;
use volguard_core::{GainController, MIN_GAIN, RELEASE_FACTOR, amplitude_to_dbfs};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// For any reachable RMS in (0, 1], dBFS equals 20·log10(rms).
    #[test]
    fn dbfs_matches_log10(rms in 1e-6f32..=1.0f32) {
        let expected = 20.0 * (rms as f64).log10();
        let got = amplitude_to_dbfs(rms) as f64;
        prop_assert!(
            (got - expected).abs() < 1e-3,
            "rms {} -> {} dB, expected {}", rms, got, expected
        );
    }

    /// Gain stays in [0.01, 1.0] after every tick for any RMS sequence.
    #[test]
    fn gain_always_bounded(
        limit_db in -60.0f32..=0.0f32,
        inputs in prop::collection::vec(0.0f32..=4.0f32, 1..256),
    ) {
        let mut gc = GainController::with_config(true, limit_db);
        for &rms in &inputs {
            let g = gc.tick(rms);
            prop_assert!(
                (MIN_GAIN..=1.0).contains(&g),
                "gain {} out of bounds for rms {} at limit {}", g, rms, limit_db
            );
        }
    }

    /// Above the ceiling, gain equals max(0.01, limit/rms) whatever came before.
    #[test]
    fn attack_is_instant(
        limit_db in -60.0f32..=0.0f32,
        history in prop::collection::vec(0.0f32..=2.0f32, 0..64),
        over in 1.001f32..=100.0f32,
    ) {
        let mut gc = GainController::with_config(true, limit_db);
        for &rms in &history {
            gc.tick(rms);
        }
        let rms = gc.limit_rms() * over;
        let expected = (gc.limit_rms() / rms).max(MIN_GAIN);
        prop_assert_eq!(gc.tick(rms), expected);
    }

    /// At or below the ceiling, gain(n) = min(1, gain(n-1)·1.01) ≥ gain(n-1).
    #[test]
    fn release_is_monotone(
        limit_db in -60.0f32..=0.0f32,
        history in prop::collection::vec(0.0f32..=2.0f32, 0..64),
        under in 0.0f32..=1.0f32,
    ) {
        let mut gc = GainController::with_config(true, limit_db);
        for &rms in &history {
            gc.tick(rms);
        }
        let before = gc.gain();
        let after = gc.tick(gc.limit_rms() * under);
        prop_assert_eq!(after, (before * RELEASE_FACTOR).min(1.0));
        prop_assert!(after >= before);
    }

    /// Disabling resets gain to exactly 1.0 on the next tick.
    #[test]
    fn disable_restores_unity(
        limit_db in -60.0f32..=0.0f32,
        history in prop::collection::vec(0.0f32..=2.0f32, 0..64),
        rms in 0.0f32..=4.0f32,
    ) {
        let mut gc = GainController::with_config(true, limit_db);
        for &r in &history {
            gc.tick(r);
        }
        gc.set_enabled(false);
        prop_assert_eq!(gc.tick(rms), 1.0);
    }
}
