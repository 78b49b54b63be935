//! Settings and run options.
//!
//! Hardware and endpoint settings come from built-in defaults, an optional
//! TOML file and `WEATHERLIGHT__*` environment variables, layered with the
//! `config` crate. Run options come from the command line; values outside
//! their range are replaced by a fallback rather than rejected, and each
//! replacement is reported so the light can flash it.

use config::{Config, ConfigError, Environment, File};
use palette::Srgb;
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use crate::colors;

/// Config file looked up when no path is given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "weatherlight";

/// Valid forecast horizons in hours.
pub const FORECAST_HOURS: RangeInclusive<i64> = 0..=11;
pub const DEFAULT_FORECAST_HOURS: u8 = 3;
/// Replacement for an out-of-range forecast horizon.
pub const FALLBACK_FORECAST_HOURS: u8 = 2;

/// Valid refresh intervals in minutes.
pub const REFRESH_MINUTES: RangeInclusive<i64> = 5..=58;
pub const DEFAULT_REFRESH_MINUTES: u32 = 30;
/// Replacement for an out-of-range refresh interval.
pub const FALLBACK_REFRESH_MINUTES: u32 = 15;

/// GPIO pins (BCM numbering) of the three LED legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PinSettings {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Default for PinSettings {
    // Physical board pins 19, 21 and 23.
    fn default() -> Self {
        Self {
            red: 10,
            green: 9,
            blue: 11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            base_url: "http://api.wunderground.com/api/".to_string(),
            timeout_secs: 2,
        }
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Hardware and endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pins: PinSettings,
    pub pwm_frequency_hz: f64,
    pub weather: WeatherSettings,
    pub probe_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pins: PinSettings::default(),
            pwm_frequency_hz: 100.0,
            weather: WeatherSettings::default(),
            probe_url: "http://www.wunderground.com".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (required when given) or from the optional
    /// default file, then applies `WEATHERLIGHT__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("WEATHERLIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// A run option that was out of range and got replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigClamp {
    ForecastHours { requested: i64, fallback: u8 },
    RefreshMinutes { requested: i64, fallback: u32 },
}

impl ConfigClamp {
    /// Color flashed to tell the user about this replacement.
    pub fn flash_color(&self) -> Srgb {
        match self {
            ConfigClamp::ForecastHours { .. } => colors::FORECAST_CLAMPED,
            ConfigClamp::RefreshMinutes { .. } => colors::REFRESH_CLAMPED,
        }
    }
}

/// Validated options for the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// How far ahead to forecast, hours.
    pub forecast_hours: u8,

    /// Minutes between forecast refreshes.
    pub refresh_minutes: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            forecast_hours: DEFAULT_FORECAST_HOURS,
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
        }
    }
}

impl RunOptions {
    /// Builds options from raw values, replacing out-of-range ones with their
    /// fallback. Returns the replacements made, in flash order.
    pub fn clamped(forecast_hours: i64, refresh_minutes: i64) -> (Self, Vec<ConfigClamp>) {
        let mut clamps = Vec::new();

        let forecast_hours = if FORECAST_HOURS.contains(&forecast_hours) {
            forecast_hours as u8
        } else {
            clamps.push(ConfigClamp::ForecastHours {
                requested: forecast_hours,
                fallback: FALLBACK_FORECAST_HOURS,
            });
            FALLBACK_FORECAST_HOURS
        };

        let refresh_minutes = if REFRESH_MINUTES.contains(&refresh_minutes) {
            refresh_minutes as u32
        } else {
            clamps.push(ConfigClamp::RefreshMinutes {
                requested: refresh_minutes,
                fallback: FALLBACK_REFRESH_MINUTES,
            });
            FALLBACK_REFRESH_MINUTES
        };

        (
            Self {
                forecast_hours,
                refresh_minutes,
            },
            clamps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_options_are_kept() {
        let (options, clamps) = RunOptions::clamped(0, 58);
        assert_eq!(options.forecast_hours, 0);
        assert_eq!(options.refresh_minutes, 58);
        assert!(clamps.is_empty());

        let (options, clamps) = RunOptions::clamped(
            i64::from(DEFAULT_FORECAST_HOURS),
            i64::from(DEFAULT_REFRESH_MINUTES),
        );
        assert_eq!(options, RunOptions::default());
        assert!(clamps.is_empty());
    }

    #[test]
    fn out_of_range_options_fall_back_and_are_reported() {
        let (options, clamps) = RunOptions::clamped(12, 4);

        assert_eq!(options.forecast_hours, FALLBACK_FORECAST_HOURS);
        assert_eq!(options.refresh_minutes, FALLBACK_REFRESH_MINUTES);
        assert_eq!(
            clamps,
            vec![
                ConfigClamp::ForecastHours {
                    requested: 12,
                    fallback: 2
                },
                ConfigClamp::RefreshMinutes {
                    requested: 4,
                    fallback: 15
                },
            ]
        );
        assert_eq!(clamps[0].flash_color(), colors::MAGENTA);
        assert_eq!(clamps[1].flash_color(), colors::CYAN);
    }

    #[test]
    fn negative_values_fall_back() {
        let (options, clamps) = RunOptions::clamped(-1, 30);
        assert_eq!(options.forecast_hours, FALLBACK_FORECAST_HOURS);
        assert_eq!(options.refresh_minutes, 30);
        assert_eq!(clamps.len(), 1);
    }

    #[test]
    fn missing_default_file_gives_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.pins, PinSettings::default());
        assert_eq!(settings.pwm_frequency_hz, 100.0);
        assert_eq!(settings.weather.timeout(), Duration::from_secs(2));
    }
}
