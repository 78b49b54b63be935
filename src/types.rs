//! Core value types shared by the mapper, the light and the control loop.

use chrono::{DateTime, Utc};
use palette::Srgb;

/// Highest level of the 8-bit intensity scale.
pub const MAX_LEVEL: f32 = 255.0;

/// Level substituted for any channel input outside `[0, 255]`.
pub const NEUTRAL_LEVEL: f32 = 128.0;

/// Duty cycle percent per intensity level.
pub const DUTY_PER_LEVEL: f64 = 100.0 / 255.0;

/// Pulse behaviour derived from the precipitation forecast.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PulseParams {
    /// Approximate pulses per minute. Zero disables pulsing.
    pub per_minute: f32,

    /// Level every channel swings towards at the pulse peak.
    pub intensity: u8,
}

impl PulseParams {
    /// No pulsing at all.
    pub const NONE: Self = Self {
        per_minute: 0.0,
        intensity: 0,
    };

    /// Creates pulse parameters.
    #[inline]
    pub fn new(per_minute: f32, intensity: u8) -> Self {
        Self {
            per_minute,
            intensity,
        }
    }

    /// Returns true when the light should pulse.
    #[inline]
    pub fn is_pulsing(&self) -> bool {
        self.per_minute > 0.0
    }
}

/// Everything the light needs for one refresh period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivePlan {
    /// Base color, 8-bit scale.
    pub color: Srgb,

    /// Precipitation pulses layered over the base color.
    pub pulse: PulseParams,

    /// Wall-clock instant after which a new forecast is fetched.
    pub deadline: DateTime<Utc>,
}

/// Replaces an out-of-range level with [`NEUTRAL_LEVEL`].
///
/// Bad input keeps the light alive at a mid level rather than failing.
#[inline]
pub fn sanitize_level(level: f32) -> f32 {
    if (0.0..=MAX_LEVEL).contains(&level) {
        level
    } else {
        NEUTRAL_LEVEL
    }
}

/// Converts a level to a duty cycle percent after sanitizing it.
#[inline]
pub fn level_to_duty(level: f32) -> f64 {
    f64::from(sanitize_level(level)) * DUTY_PER_LEVEL
}
