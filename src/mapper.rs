//! Maps a forecast sample to a base color and pulse parameters.
//!
//! Temperature selects the color through a fixed curve table running from
//! blue-white for cold to red for hot. Precipitation selects the pulses: the
//! probability sets how often, the condition phrase sets how bright.

use palette::Srgb;

use crate::curve::CurveTable;
use crate::error::CurveError;
use crate::forecast::ForecastSample;
use crate::types::PulseParams;

/// Samples in the temperature color table.
pub const TEMPERATURE_SAMPLES: usize = 8;

/// Temperature (deg C) to red, green and blue levels.
pub const TEMPERATURE_COLORS: [[f64; TEMPERATURE_SAMPLES]; 4] = [
    [-30.0, -17.0, 0.0, 12.0, 20.0, 26.0, 35.0, 50.0],
    [0.0, 0.0, 0.0, 100.0, 255.0, 255.0, 255.0, 255.0],
    [183.0, 65.0, 94.0, 100.0, 224.0, 140.0, 55.0, 0.0],
    [0.0, 178.0, 255.0, 100.0, 0.0, 0.0, 0.0, 197.0],
];

/// Pulses per minute for each percent of precipitation probability.
pub const PULSES_PER_PERCENT: f64 = 0.4;

/// Pulse peak for an unqualified precipitation condition.
pub const BASE_INTENSITY: u8 = 200;

/// Pulse peak for conditions starting with "Heavy".
pub const HEAVY_INTENSITY: u8 = 255;

/// Pulse peak for conditions starting with "Light".
pub const LIGHT_INTENSITY: u8 = 150;

/// Broad family of a precipitation phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationKind {
    Drizzle,
    Rain,
    Snow,
    Ice,
    Hail,
    Dust,
    Spray,
    Thunderstorm,
    Freezing,
    Unknown,
}

/// A catalog phrase and the kind it stands for.
#[derive(Debug, Clone, Copy)]
pub struct PrecipitationRule {
    pub phrase: &'static str,
    pub kind: PrecipitationKind,
}

const fn rule(phrase: &'static str, kind: PrecipitationKind) -> PrecipitationRule {
    PrecipitationRule { phrase, kind }
}

/// Precipitation phrases, evaluated in order. A condition may contain several
/// phrases; the LAST matching rule wins, so more specific phrases come after
/// the general ones they contain. Mist, fog and haze are deliberately absent
/// and never pulse.
pub const PRECIPITATION_RULES: &[PrecipitationRule] = {
    use PrecipitationKind::*;
    &[
        rule("Drizzle", Drizzle),
        rule("Rain", Rain),
        rule("Snow", Snow),
        rule("Snow Grains", Snow),
        rule("Ice Crystals", Ice),
        rule("Ice Pellets", Ice),
        rule("Hail", Hail),
        rule("Volcanic Ash", Dust),
        rule("Widespread Dust", Dust),
        rule("Sand", Dust),
        rule("Spray", Spray),
        rule("Dust Whirls", Dust),
        rule("Sandstorm", Dust),
        rule("Blowing Snow", Snow),
        rule("Blowing Widespread Dust", Dust),
        rule("Blowing Sand", Dust),
        rule("Rain Mist", Rain),
        rule("Rain Showers", Rain),
        rule("Snow Showers", Snow),
        rule("Snow Blowing Snow Mist", Snow),
        rule("Ice Pellet Showers", Ice),
        rule("Hail Showers", Hail),
        rule("Small Hail Showers", Hail),
        rule("Thunderstorm", Thunderstorm),
        rule("Thunderstorms and Rain", Thunderstorm),
        rule("Thunderstorms and Snow", Thunderstorm),
        rule("Thunderstorms and Ice Pellets", Thunderstorm),
        rule("Thunderstorms with Hail", Thunderstorm),
        rule("Thunderstorms with Small Hail", Thunderstorm),
        rule("Freezing Drizzle", Freezing),
        rule("Freezing Rain", Freezing),
        rule("Freezing Fog", Freezing),
        rule("Unknown Precipitation", Unknown),
        rule("Small Hail", Hail),
    ]
};

/// Returns the kind of the last rule whose phrase occurs in `condition`.
///
/// Matching is case-sensitive substring containment.
pub fn classify(condition: &str) -> Option<PrecipitationKind> {
    PRECIPITATION_RULES
        .iter()
        .rev()
        .find(|rule| condition.contains(rule.phrase))
        .map(|rule| rule.kind)
}

/// Pulse parameters for a condition phrase and precipitation probability.
///
/// Zero probability never pulses. Otherwise a recognised condition pulses
/// `pop * 0.4` times a minute with a peak of 200, raised to 255 for "Heavy"
/// and lowered to 150 for "Light" conditions. An unrecognised condition does
/// not pulse even when precipitation is likely.
pub fn precipitation_pulse(condition: &str, pop: u8) -> PulseParams {
    if pop == 0 || classify(condition).is_none() {
        return PulseParams::NONE;
    }

    let intensity = if condition.starts_with("Heavy") {
        HEAVY_INTENSITY
    } else if condition.starts_with("Light") {
        LIGHT_INTENSITY
    } else {
        BASE_INTENSITY
    };

    PulseParams::new((f64::from(pop) * PULSES_PER_PERCENT) as f32, intensity)
}

/// Turns forecast samples into light parameters.
#[derive(Debug, Clone)]
pub struct ForecastMapper {
    colors: CurveTable<TEMPERATURE_SAMPLES>,
}

impl ForecastMapper {
    /// Creates a mapper using [`TEMPERATURE_COLORS`].
    pub fn new() -> Result<Self, CurveError> {
        let mut builder = CurveTable::builder();
        for row in &TEMPERATURE_COLORS {
            builder = builder.row(row)?;
        }
        Ok(Self::with_table(builder.build()?))
    }

    /// Creates a mapper with a custom temperature color table. The table
    /// needs at least three output dimensions.
    pub fn with_table(colors: CurveTable<TEMPERATURE_SAMPLES>) -> Self {
        Self { colors }
    }

    /// Base color for a temperature in deg C.
    pub fn color_for(&self, temperature_c: f64) -> Result<Srgb, CurveError> {
        let red = self.colors.interpolate(1, temperature_c)?;
        let green = self.colors.interpolate(2, temperature_c)?;
        let blue = self.colors.interpolate(3, temperature_c)?;
        Ok(Srgb::new(red as f32, green as f32, blue as f32))
    }

    /// Pulse parameters for a sample.
    pub fn pulse_for(&self, sample: &ForecastSample) -> PulseParams {
        precipitation_pulse(&sample.condition, sample.pop)
    }

    /// Base color and pulse parameters for a sample.
    pub fn map(&self, sample: &ForecastSample) -> Result<(Srgb, PulseParams), CurveError> {
        Ok((self.color_for(sample.temperature_c)?, self.pulse_for(sample)))
    }
}
