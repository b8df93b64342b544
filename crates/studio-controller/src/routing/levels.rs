//! Fractional audio levels (volume, gain) in `[0.0, 1.0]`.
//!
//! Internal mutations clamp; the HTTP boundary rejects out-of-range input
//! through [`Level::parse_input`].

use crate::errors::StudioError;
use serde::{Deserialize, Serialize};

/// A level guaranteed to lie in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(f64);

impl Level {
    pub const MIN: Level = Level(0.0);
    pub const MAX: Level = Level(1.0);

    /// Default route and source volume.
    pub const DEFAULT_VOLUME: Level = Level(0.8);

    /// Default source gain.
    pub const DEFAULT_GAIN: Level = Level(0.6);

    /// Clamp any value into range. NaN maps to 0.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Validate a client-supplied value.
    ///
    /// # Errors
    ///
    /// Returns `StudioError::Validation` naming `field` if the value is not a
    /// finite number in `[0, 1]`.
    pub fn parse_input(field: &str, value: f64) -> Result<Self, StudioError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StudioError::Validation(format!(
                "{} must be between 0 and 1, got {}",
                field, value
            )))
        }
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_upper() {
        assert_eq!(Level::clamped(1.7), Level::MAX);
    }

    #[test]
    fn test_clamp_lower() {
        assert_eq!(Level::clamped(-0.2), Level::MIN);
    }

    #[test]
    fn test_clamp_nan() {
        assert_eq!(Level::clamped(f64::NAN), Level::MIN);
    }

    #[test]
    fn test_clamp_in_range_unchanged() {
        assert_eq!(Level::clamped(0.35).value(), 0.35);
    }

    #[test]
    fn test_parse_input_bounds() {
        assert_eq!(Level::parse_input("volume", 0.0).unwrap(), Level::MIN);
        assert_eq!(Level::parse_input("volume", 1.0).unwrap(), Level::MAX);

        let err = Level::parse_input("volume", 1.7).unwrap_err();
        assert!(matches!(err, StudioError::Validation(msg) if msg.contains("volume")));
        assert!(Level::parse_input("gain", -0.1).is_err());
        assert!(Level::parse_input("gain", f64::INFINITY).is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Level::DEFAULT_VOLUME).unwrap(), "0.8");
    }
}
