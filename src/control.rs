//! Control loop state machine and the startup announcement.
//!
//! The loop cycles `Fetching -> Mapping -> Driving -> Fetching`. A timeout
//! while fetching detours through `Backoff` (a dim colorless pulse for five
//! minutes); any other fetch failure moves to the absorbing `Terminated`
//! state. Whatever ends the loop, the light is shut down before
//! [`ControlLoop::run`] returns.

use chrono::TimeDelta;
use std::mem;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::channel::PwmChannel;
use crate::colors::{self, OFF};
use crate::config::{ConfigClamp, RunOptions};
use crate::error::{ControlError, FetchError, LightError};
use crate::forecast::ForecastSample;
use crate::light::{LightController, RAMP_STEPS};
use crate::mapper::{self, ForecastMapper};
use crate::schedule;
use crate::time::TimeSource;
use crate::types::{DrivePlan, PulseParams};
use crate::weather::{ConnectivityProbe, WeatherSource};

/// How long to wait after a fetch timeout before trying again.
pub const BACKOFF_WINDOW: TimeDelta = TimeDelta::minutes(5);

/// Slow, dim pulse shown while backing off.
pub const BACKOFF_PULSE: PulseParams = PulseParams {
    per_minute: 5.0,
    intensity: 100,
};

/// Duration of each configuration clamp flash.
pub const CLAMP_FLASH: Duration = Duration::from_secs(1);

/// Duration of the green flash when the provider is reachable.
pub const CONNECTED_FLASH: Duration = Duration::from_secs(1);

/// Duration of the red flash when the provider is unreachable.
pub const DISCONNECTED_FLASH: Duration = Duration::from_secs(5);

/// State of the control loop.
#[derive(Debug)]
pub enum LoopState {
    /// Requesting a forecast sample.
    Fetching,

    /// Waiting out a transient fetch failure.
    Backoff,

    /// Turning a fetched sample into a drive plan.
    Mapping(ForecastSample),

    /// Showing a plan until its refresh deadline.
    Driving(DrivePlan),

    /// Stopped by a terminal fetch failure. Absorbing.
    Terminated(FetchError),
}

/// Why the loop stopped without a hardware or mapping fault.
#[derive(Debug)]
pub enum LoopExit {
    /// A fetch failed terminally.
    Terminated(FetchError),

    /// Cancellation was requested.
    Interrupted,
}

/// Drives a light from a weather source until stopped.
///
/// # Type Parameters
/// * `'l` - Lifetime of the borrowed light controller
/// * `'t` - Lifetime of the controller's time source reference
/// * `C` - PWM channel implementation type
/// * `T` - Time source implementation type
/// * `W` - Weather source implementation type
pub struct ControlLoop<'l, 't, C: PwmChannel, T: TimeSource, W: WeatherSource> {
    light: &'l mut LightController<'t, C, T>,
    weather: W,
    mapper: ForecastMapper,
    options: RunOptions,
    state: LoopState,
}

impl<'l, 't, C: PwmChannel, T: TimeSource, W: WeatherSource> ControlLoop<'l, 't, C, T, W> {
    /// Creates a loop in the `Fetching` state.
    pub fn new(
        light: &'l mut LightController<'t, C, T>,
        weather: W,
        mapper: ForecastMapper,
        options: RunOptions,
    ) -> Self {
        Self {
            light,
            weather,
            mapper,
            options,
            state: LoopState::Fetching,
        }
    }

    /// Current state.
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Runs one state transition.
    ///
    /// On error the loop is left in `Fetching`; errors returned here are not
    /// meant to be recovered from.
    pub fn step(&mut self) -> Result<(), ControlError> {
        let state = mem::replace(&mut self.state, LoopState::Fetching);
        self.state = self.advance(state)?;
        Ok(())
    }

    /// Runs until a terminal fetch failure or cancellation, then shuts the
    /// light down.
    ///
    /// # Errors
    /// Hardware, mapping and scheduling faults. The light is shut down on
    /// these paths too.
    pub fn run(mut self) -> Result<LoopExit, ControlError> {
        let outcome = self.run_until_stopped();
        let released = self.light.shutdown();

        match outcome {
            Ok(exit) => {
                released?;
                Ok(exit)
            }
            Err(ControlError::Light(LightError::Interrupted)) => {
                info!("interrupted, light released");
                released?;
                Ok(LoopExit::Interrupted)
            }
            Err(err) => {
                if let Err(release_err) = released {
                    warn!("failed to release light after error: {}", release_err);
                }
                Err(err)
            }
        }
    }

    fn run_until_stopped(&mut self) -> Result<LoopExit, ControlError> {
        loop {
            match mem::replace(&mut self.state, LoopState::Fetching) {
                LoopState::Terminated(err) => return Ok(LoopExit::Terminated(err)),
                state => self.state = self.advance(state)?,
            }
        }
    }

    fn advance(&mut self, state: LoopState) -> Result<LoopState, ControlError> {
        let next = match state {
            LoopState::Fetching => self.fetch()?,
            LoopState::Backoff => {
                self.backoff()?;
                LoopState::Fetching
            }
            LoopState::Mapping(sample) => LoopState::Driving(self.plan(&sample)?),
            LoopState::Driving(plan) => {
                self.drive(&plan)?;
                LoopState::Fetching
            }
            terminated @ LoopState::Terminated(_) => terminated,
        };
        Ok(next)
    }

    fn fetch(&mut self) -> Result<LoopState, ControlError> {
        let pacer = self.light.pacer();
        pacer.check()?;
        let fetched = self.weather.fetch(self.options.forecast_hours, pacer.now());
        pacer.check()?;

        Ok(match fetched {
            Ok(sample) => LoopState::Mapping(sample),
            Err(err) if err.is_transient() => {
                warn!("timeout, waiting {} minutes: {}", BACKOFF_WINDOW.num_minutes(), err);
                LoopState::Backoff
            }
            Err(err) => {
                error!("stopped, error getting weather data: {}", err);
                LoopState::Terminated(err)
            }
        })
    }

    fn backoff(&mut self) -> Result<(), ControlError> {
        let deadline = self.light.pacer().now() + BACKOFF_WINDOW;
        self.light.pulse_until(OFF, BACKOFF_PULSE, deadline)?;
        Ok(())
    }

    fn plan(&mut self, sample: &ForecastSample) -> Result<DrivePlan, ControlError> {
        let (color, pulse) = self.mapper.map(sample)?;
        let now = self.light.pacer().now();
        let deadline = schedule::next_refresh(self.options.refresh_minutes, now)?;

        info!(
            "in {} hours the temperature will be {}C",
            self.options.forecast_hours, sample.temperature_c
        );
        info!("condition: {} with {}% chance", sample.condition, sample.pop);
        info!(
            kind = ?mapper::classify(&sample.condition),
            "pulses: {}, intensity: {}",
            pulse.per_minute,
            pulse.intensity
        );
        debug!(
            red = color.red,
            green = color.green,
            blue = color.blue,
            "base color"
        );

        Ok(DrivePlan {
            color,
            pulse,
            deadline,
        })
    }

    fn drive(&mut self, plan: &DrivePlan) -> Result<(), ControlError> {
        self.light.ramp(plan.color, RAMP_STEPS)?;
        let stopped_at = self.light.pulse_until(plan.color, plan.pulse, plan.deadline)?;
        debug!(
            overrun_ms = (stopped_at - plan.deadline).num_milliseconds(),
            "refresh deadline reached"
        );
        self.light.ramp(plan.color, -RAMP_STEPS)?;
        // Make sure the light is really off during the refresh.
        self.light.hold(OFF, Duration::ZERO)?;
        Ok(())
    }
}

/// Shows startup status on the light.
///
/// Flashes each configuration clamp for [`CLAMP_FLASH`], then probes the
/// provider: green for [`CONNECTED_FLASH`] when reachable, red for
/// [`DISCONNECTED_FLASH`] when not. Returns whether the loop should start.
pub fn announce<C, T, P>(
    light: &mut LightController<'_, C, T>,
    clamps: &[ConfigClamp],
    probe: &P,
) -> Result<bool, LightError>
where
    C: PwmChannel,
    T: TimeSource,
    P: ConnectivityProbe + ?Sized,
{
    for clamp in clamps {
        match clamp {
            ConfigClamp::ForecastHours { requested, fallback } => warn!(
                "forecast period {} out of range, set to {} hours",
                requested, fallback
            ),
            ConfigClamp::RefreshMinutes { requested, fallback } => warn!(
                "refresh time {} out of range, set to {} minutes",
                requested, fallback
            ),
        }
        light.hold(clamp.flash_color(), CLAMP_FLASH)?;
    }

    if probe.is_reachable() {
        info!("internet connection available");
        light.hold(colors::CONNECTED, CONNECTED_FLASH)?;
        Ok(true)
    } else {
        error!("no internet connection");
        light.hold(colors::DISCONNECTED, DISCONNECTED_FLASH)?;
        Ok(false)
    }
}
