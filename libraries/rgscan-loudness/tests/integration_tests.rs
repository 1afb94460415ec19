//! Integration tests for rgscan-loudness
//!
//! - Property-based tests with proptest
//! - Album aggregation behaviour
//! - Clipping policy guarantees

use proptest::prelude::*;
use rgscan_loudness::{
    db_to_linear, linear_to_db, ClipMode, ClipScope, ClippingGuard, LoudnessAnalyzer, PeakMode,
    EBU_R128_MAX_PEAK_DB, REPLAYGAIN_REFERENCE_LUFS,
};

// ========== Helper Functions ==========

/// Generate a sine wave at specified amplitude and frequency
fn generate_sine(
    sample_rate: u32,
    channels: u32,
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    let mut samples = Vec::with_capacity(num_samples * channels as usize);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
        for _ in 0..channels {
            samples.push(sample);
        }
    }

    samples
}

fn analyze(samples: &[f32], sample_rate: u32, channels: u32) -> LoudnessAnalyzer {
    let mut analyzer = LoudnessAnalyzer::new(channels, sample_rate, PeakMode::True).unwrap();
    // Feed in uneven blocks, the way a decoder hands them over
    for block in samples.chunks(1152 * channels as usize) {
        analyzer.add_frames(block).unwrap();
    }
    analyzer
}

// ========== Property-Based Tests ==========

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Oversampled peak never underestimates the raw sample peak
    #[test]
    fn true_peak_at_least_sample_peak(
        amplitude in 0.01_f32..1.0_f32,
        frequency in 50.0_f32..18000.0_f32,
        sample_rate in prop::sample::select(&[22050_u32, 44100, 48000, 96000]),
    ) {
        let samples = generate_sine(sample_rate, 2, frequency, amplitude, 0.5);
        let analyzer = analyze(&samples, sample_rate, 2);

        let sample_peak = analyzer.sample_peak().unwrap();
        let true_peak = analyzer.true_peak().unwrap();
        prop_assert!(true_peak >= sample_peak,
            "true peak {} below sample peak {}", true_peak, sample_peak);
    }

    /// With protection on, the post-gain peak never ends above the ceiling
    #[test]
    fn guard_respects_ceiling(
        gain_db in -20.0_f64..30.0_f64,
        peak_db in -40.0_f64..3.0_f64,
        max_peak in -10.0_f64..-0.1_f64,
    ) {
        let guard = ClippingGuard::new(ClipMode::Track, max_peak);
        let peak = db_to_linear(peak_db);
        let gain = guard.check(gain_db, peak, ClipScope::Track).resolve(gain_db);

        prop_assert!(gain <= gain_db, "guard raised gain {} -> {}", gain_db, gain);
        prop_assert!(linear_to_db(peak) + gain <= max_peak + 1e-9);
    }

    /// Disabled protection hands back the gain untouched
    #[test]
    fn disabled_guard_is_identity(
        gain_db in -20.0_f64..30.0_f64,
        peak in 0.0_f64..2.0_f64,
    ) {
        let guard = ClippingGuard::new(ClipMode::Disabled, EBU_R128_MAX_PEAK_DB);
        prop_assert_eq!(guard.check(gain_db, peak, ClipScope::Album).resolve(gain_db), gain_db);
    }
}

// ========== Album Aggregation ==========

#[test]
fn test_combine_homogeneous_loudness() {
    let samples = generate_sine(44100, 2, 1000.0, 0.25, 3.0);
    let a = analyze(&samples, 44100, 2);
    let b = analyze(&samples, 44100, 2);
    let c = analyze(&samples, 44100, 2);

    let single = a.integrated_loudness().unwrap();
    let album = LoudnessAnalyzer::combine([&a, &b, &c])
        .unwrap()
        .integrated_loudness()
        .unwrap();

    assert!(
        (album - single).abs() < 0.01,
        "album {:.3} LUFS differs from per-track {:.3} LUFS",
        album,
        single
    );
}

#[test]
fn test_combine_is_order_independent() {
    let quiet = analyze(&generate_sine(48000, 2, 440.0, 0.05, 2.0), 48000, 2);
    let mid = analyze(&generate_sine(48000, 2, 1000.0, 0.2, 4.0), 48000, 2);
    let loud = analyze(&generate_sine(48000, 2, 3000.0, 0.6, 1.0), 48000, 2);

    let forward = LoudnessAnalyzer::combine([&quiet, &mid, &loud]).unwrap();
    let backward = LoudnessAnalyzer::combine([&loud, &mid, &quiet]).unwrap();

    let f = forward.integrated_loudness().unwrap();
    let b = backward.integrated_loudness().unwrap();
    assert!((f - b).abs() < 1e-9);
    assert_eq!(forward.true_peak().unwrap(), backward.true_peak().unwrap());
}

#[test]
fn test_combine_matches_concatenation() {
    let first = generate_sine(44100, 2, 1000.0, 0.1, 2.0);
    let second = generate_sine(44100, 2, 1000.0, 0.4, 2.0);

    let mut joined = first.clone();
    joined.extend_from_slice(&second);
    let concatenated = analyze(&joined, 44100, 2).integrated_loudness().unwrap();

    let a = analyze(&first, 44100, 2);
    let b = analyze(&second, 44100, 2);
    let combined = LoudnessAnalyzer::combine([&a, &b])
        .unwrap()
        .integrated_loudness()
        .unwrap();

    // Block boundaries differ slightly at the seam
    assert!(
        (combined - concatenated).abs() < 0.2,
        "combined {:.2} vs concatenated {:.2}",
        combined,
        concatenated
    );
}

#[test]
fn test_combine_sample_mode_has_no_true_peak() {
    let samples = generate_sine(44100, 1, 1000.0, 0.3, 1.0);
    let mut a = LoudnessAnalyzer::new(1, 44100, PeakMode::Sample).unwrap();
    a.add_frames(&samples).unwrap();
    let b = analyze(&samples, 44100, 1);

    let combined = LoudnessAnalyzer::combine([&a, &b]).unwrap();
    assert!(combined.true_peak().is_err());
    assert!(combined.peak(PeakMode::Sample).is_ok());
}

// ========== End to end gain derivation ==========

#[test]
fn test_gain_for_quiet_sine() {
    // -26 dBFS stereo sine measures close to -26 LUFS
    let amplitude = db_to_linear(-26.0) as f32;
    let analyzer = analyze(&generate_sine(44100, 2, 1000.0, amplitude, 3.0), 44100, 2);
    let loudness = analyzer.integrated_loudness().unwrap();
    let gain = REPLAYGAIN_REFERENCE_LUFS - loudness;

    assert!((gain - 8.0).abs() < 1.0, "unexpected gain {:.2}", gain);

    // True peak at -26 dBTP plus ~8 dB gain stays well under -1 dBTP
    let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, EBU_R128_MAX_PEAK_DB);
    let decision = guard.check(gain, analyzer.true_peak().unwrap(), ClipScope::Track);
    assert!(!decision.is_adjusted());
}
