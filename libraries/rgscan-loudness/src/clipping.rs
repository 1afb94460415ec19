//! Clipping prevention policy
//!
//! Gain is derived as `target - integrated_loudness`. Applying it scales the
//! measured peak by `10^(gain/20)`; if the scaled peak ends up above the
//! configured maximum peak level, the gain is lowered until it sits exactly
//! on that level.
//!
//! - Track gain: checked whenever protection is enabled
//! - Album gain: checked only in [`ClipMode::TrackAndAlbum`]
//!
//! The guard never raises a gain.

use crate::{db_to_linear, linear_to_db};

/// Which gains are protected against clipping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    /// No protection; the computed gain may clip at playback
    #[default]
    Disabled,
    /// Protect track gains only
    Track,
    /// Protect track and album gains
    TrackAndAlbum,
}

impl ClipMode {
    /// Whether gains of the given scope are protected in this mode
    pub fn protects(self, scope: ClipScope) -> bool {
        match (self, scope) {
            (Self::Disabled, _) => false,
            (Self::Track, ClipScope::Track) => true,
            (Self::Track, ClipScope::Album) => false,
            (Self::TrackAndAlbum, _) => true,
        }
    }
}

/// Entity a gain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipScope {
    Track,
    Album,
}

/// Outcome of a clipping check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipDecision {
    /// Gain can be used as is
    NoAdjustment,
    /// Gain had to be lowered to stay under the peak ceiling
    Adjusted { gain_db: f64 },
}

impl ClipDecision {
    /// Gain to use given the originally computed `gain_db`
    pub fn resolve(self, gain_db: f64) -> f64 {
        match self {
            Self::NoAdjustment => gain_db,
            Self::Adjusted { gain_db } => gain_db,
        }
    }

    /// Whether the gain was lowered
    pub fn is_adjusted(self) -> bool {
        matches!(self, Self::Adjusted { .. })
    }
}

/// Clip-safe gain for a peak that has already been scaled by `gain_db`
///
/// Returns `None` when `peak_after_gain` stays at or below `max_peak_level`.
pub fn clip_safe_gain(gain_db: f64, peak_after_gain: f64, max_peak_level: f64) -> Option<f64> {
    let peak_after_gain_db = linear_to_db(peak_after_gain);
    if peak_after_gain_db > max_peak_level {
        Some(gain_db - (peak_after_gain_db - max_peak_level))
    } else {
        None
    }
}

/// Clipping guard bound to a clip mode and a peak ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingGuard {
    mode: ClipMode,
    max_peak_level: f64,
}

impl ClippingGuard {
    /// Create a guard
    ///
    /// # Arguments
    /// * `mode` - Which scopes are protected
    /// * `max_peak_level` - Ceiling for the post-gain peak in dB
    pub fn new(mode: ClipMode, max_peak_level: f64) -> Self {
        Self {
            mode,
            max_peak_level,
        }
    }

    /// Check a gain against the measured (pre-gain) linear `peak`
    pub fn check(&self, gain_db: f64, peak: f64, scope: ClipScope) -> ClipDecision {
        if !self.mode.protects(scope) {
            return ClipDecision::NoAdjustment;
        }

        let peak_after_gain = peak * db_to_linear(gain_db);
        match clip_safe_gain(gain_db, peak_after_gain, self.max_peak_level) {
            Some(adjusted) if adjusted < gain_db => ClipDecision::Adjusted { gain_db: adjusted },
            _ => ClipDecision::NoAdjustment,
        }
    }

    /// Protected scopes
    pub fn mode(&self) -> ClipMode {
        self.mode
    }

    /// Peak ceiling in dB
    pub fn max_peak_level(&self) -> f64 {
        self.max_peak_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_adjustment_below_ceiling() {
        let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, -1.0);
        // -20 dBFS peak + 2 dB gain = -18 dBFS, far under -1
        let decision = guard.check(2.0, db_to_linear(-20.0), ClipScope::Track);
        assert_eq!(decision, ClipDecision::NoAdjustment);
        assert_eq!(decision.resolve(2.0), 2.0);
    }

    #[test]
    fn test_adjustment_lands_on_ceiling() {
        let guard = ClippingGuard::new(ClipMode::Track, -1.0);
        // peak -2.5 dBFS, +3 dB gain would put it at +0.5 dBFS
        let decision = guard.check(3.0, db_to_linear(-2.5), ClipScope::Track);
        let gain = decision.resolve(3.0);

        assert!(decision.is_adjusted());
        assert!((gain - 1.5).abs() < 1e-9);
        assert!((linear_to_db(db_to_linear(-2.5)) + gain - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_never_adjusts() {
        let guard = ClippingGuard::new(ClipMode::Disabled, -1.0);
        let decision = guard.check(12.0, 1.0, ClipScope::Track);
        assert_eq!(decision, ClipDecision::NoAdjustment);
    }

    #[test]
    fn test_track_mode_leaves_album_alone() {
        let guard = ClippingGuard::new(ClipMode::Track, -1.0);
        assert!(guard.check(6.0, 0.9, ClipScope::Track).is_adjusted());
        assert!(!guard.check(6.0, 0.9, ClipScope::Album).is_adjusted());

        let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, -1.0);
        assert!(guard.check(6.0, 0.9, ClipScope::Album).is_adjusted());
    }

    #[test]
    fn test_negative_gain_can_still_be_lowered() {
        // A hot master at +1 dBFS true peak with -0.5 dB gain still exceeds -1 dBTP
        let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, -1.0);
        let decision = guard.check(-0.5, db_to_linear(1.0), ClipScope::Track);
        assert!((decision.resolve(-0.5) - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_silent_peak_is_never_adjusted() {
        let guard = ClippingGuard::new(ClipMode::TrackAndAlbum, -1.0);
        assert_eq!(
            guard.check(30.0, 0.0, ClipScope::Track),
            ClipDecision::NoAdjustment
        );
    }

    #[test]
    fn test_clip_safe_gain_formula() {
        // Peak after gain is 1.5 dB over a -1 dB ceiling
        let peak_after = db_to_linear(0.5);
        let adjusted = clip_safe_gain(2.0, peak_after, -1.0).unwrap();
        assert!((adjusted - 0.5).abs() < 1e-9);

        assert!(clip_safe_gain(2.0, db_to_linear(-1.5), -1.0).is_none());
    }
}
