//! Named colors and helpers on the 8-bit intensity scale.
//!
//! Colors are `palette::Srgb<f32>` whose components hold 8-bit intensity
//! levels (0.0-255.0) rather than palette's usual 0.0-1.0. Keeping them as
//! floats lets ramps and pulses land between whole levels; the light only
//! quantizes when it converts a level to a duty cycle.
//!
//! The status colors form the light's vocabulary for events that happen
//! before the forecast loop starts.

use palette::{Mix, Srgb};

/// All channels off.
pub const OFF: Srgb = Srgb::new(0.0, 0.0, 0.0);
pub const RED: Srgb = Srgb::new(255.0, 0.0, 0.0);
pub const GREEN: Srgb = Srgb::new(0.0, 255.0, 0.0);
pub const BLUE: Srgb = Srgb::new(0.0, 0.0, 255.0);
pub const YELLOW: Srgb = Srgb::new(255.0, 255.0, 0.0);
pub const MAGENTA: Srgb = Srgb::new(255.0, 0.0, 255.0);
pub const CYAN: Srgb = Srgb::new(0.0, 255.0, 255.0);
pub const WHITE: Srgb = Srgb::new(255.0, 255.0, 255.0);

/// Flashed when the forecast horizon had to be replaced by its fallback.
pub const FORECAST_CLAMPED: Srgb = MAGENTA;

/// Flashed when the refresh interval had to be replaced by its fallback.
pub const REFRESH_CLAMPED: Srgb = CYAN;

/// Flashed when the provider is reachable at startup.
pub const CONNECTED: Srgb = GREEN;

/// Flashed when the provider is unreachable at startup.
pub const DISCONNECTED: Srgb = RED;

/// The seven binary color combinations, in self-test order.
pub const TEST_CYCLE: [Srgb; 7] = [RED, GREEN, BLUE, YELLOW, MAGENTA, CYAN, WHITE];

/// Creates a color from three intensity levels.
#[inline]
pub fn levels(red: f32, green: f32, blue: f32) -> Srgb {
    Srgb::new(red, green, blue)
}

/// Creates a colorless level (all channels equal).
#[inline]
pub fn grey(level: f32) -> Srgb {
    Srgb::new(level, level, level)
}

/// Scales a color towards off. `fraction` of 1.0 returns `color` unchanged.
#[inline]
pub fn scaled(color: Srgb, fraction: f32) -> Srgb {
    OFF.mix(color, fraction)
}
