#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`LightController`**: Owns three PWM channels and runs hold, ramp and pulse sequences
//! - **`PwmChannel`**: Trait to implement for your PWM hardware
//! - **`TimeSource`**: Trait to implement for your clock; all waits go through a cancellable `Pacer`
//! - **`CurveTable`**: Piecewise-linear lookup table, used to map temperature to color
//! - **`ForecastMapper`**: Turns a `ForecastSample` into a base color and `PulseParams`
//! - **`next_refresh`**: Next refresh deadline aligned to the wall clock
//! - **`ControlLoop`**: Fetch, map and drive state machine
//! - **`WeatherSource`**: Trait for forecast providers; `WundergroundClient` is the HTTP one
//!
//! Colors are `Srgb<f32>` carrying 8-bit intensity levels (0.0-255.0). The light
//! converts them to duty cycles at a fixed 100/255 percent per level.

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod channel;
pub mod colors;
pub mod config;
pub mod control;
pub mod curve;
pub mod error;
pub mod forecast;
pub mod light;
pub mod mapper;
pub mod schedule;
pub mod time;
pub mod types;
pub mod weather;

pub use channel::PwmChannel;
#[cfg(feature = "rppal")]
pub use channel::SoftPwmChannel;
pub use config::{ConfigClamp, RunOptions, Settings};
pub use control::{ControlLoop, LoopExit, LoopState, announce};
pub use curve::{CurveBuilder, CurveTable, interpolate};
pub use error::{
    ChannelError, ControlError, CurveError, ExtractError, FetchError, LightError, ScheduleError,
};
pub use forecast::ForecastSample;
pub use light::LightController;
pub use mapper::{ForecastMapper, PrecipitationKind};
pub use schedule::next_refresh;
pub use time::{CancelToken, Pacer, SystemTimeSource, TimeSource};
pub use types::{DrivePlan, PulseParams};
pub use weather::{ConnectivityProbe, HttpProbe, Location, WeatherSource, WundergroundClient};
