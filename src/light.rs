//! RGB light controller with hold, ramp and pulse operations.
//!
//! Provides [`LightController`], which owns the three PWM channels of one RGB
//! LED and turns 8-bit colors into duty cycles over timed sequences. Every
//! wait goes through the controller's [`Pacer`], so a cancellation request is
//! honoured within one poll slice, including inside a pulse.

use chrono::{DateTime, Utc};
use palette::{Mix, Srgb};
use std::time::Duration;
use tracing::{debug, warn};

use crate::channel::PwmChannel;
use crate::colors::{self, OFF};
use crate::error::{ChannelError, LightError};
use crate::time::{Pacer, TimeSource};
use crate::types::{MAX_LEVEL, PulseParams, level_to_duty};

/// Duration of one ramp step.
pub const RAMP_STEP: Duration = Duration::from_millis(100);

/// Ramp steps used when fading in or out around a refresh period.
pub const RAMP_STEPS: i32 = 50;

/// Seconds of each minute available for steady holds between pulses. The
/// remaining ten seconds approximate the two ramps.
pub const PULSE_WINDOW_SECS: f64 = 60.0 - 10.0;

/// Divisor turning a hold duration into a pulse step. Slightly more than the
/// 36 phase steps to absorb processing time.
pub const PULSE_STEP_DIVISOR: u32 = 37;

/// Steady slice used when there is nothing to pulse.
pub const STEADY_SLICE: Duration = Duration::from_secs(1);

/// Step duration of [`LightController::one_pulse`].
pub const ONE_PULSE_STEP: Duration = Duration::from_millis(100);

/// Phase angles in degrees of one pulse: -90 up to 260 in 10 degree steps.
fn pulse_phases() -> impl Iterator<Item = i32> {
    (-90..270).step_by(10)
}

/// Timing of the pulse loop for a pulse frequency.
///
/// Returns `(hold, pulse_step)`: the steady hold between pulses and the
/// duration of each of the 36 phase steps of a pulse.
pub fn pulse_timing(pulse: PulseParams) -> (Duration, Duration) {
    if pulse.is_pulsing() {
        let hold = PULSE_WINDOW_SECS / (2.0 * f64::from(pulse.per_minute) + 1.0);
        let hold = Duration::from_secs_f64(hold);
        (hold, hold / PULSE_STEP_DIVISOR)
    } else {
        (STEADY_SLICE, Duration::ZERO)
    }
}

/// Controls one RGB LED through three PWM channels.
///
/// All three channels share one PWM frequency. Colors are given on the 8-bit
/// scale and converted with a fixed ratio of 100/255 percent per level; a
/// channel level outside `[0, 255]` is driven as 128.
///
/// The controller must be shut down exactly once. [`shutdown`](Self::shutdown)
/// is idempotent and also runs on drop, so every exit path releases the
/// hardware.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `C` - PWM channel implementation type
/// * `T` - Time source implementation type
pub struct LightController<'t, C: PwmChannel, T: TimeSource> {
    red: C,
    green: C,
    blue: C,
    pacer: Pacer<'t, T>,
    frequency: f64,
    active: bool,
}

impl<'t, C: PwmChannel, T: TimeSource> LightController<'t, C, T> {
    /// Takes ownership of three channels and turns them off.
    ///
    /// Channels not already running at `frequency` are switched to it.
    pub fn new(
        red: C,
        green: C,
        blue: C,
        frequency: f64,
        pacer: Pacer<'t, T>,
    ) -> Result<Self, LightError> {
        let mut light = Self {
            red,
            green,
            blue,
            pacer,
            frequency,
            active: true,
        };

        for channel in light.channels_mut() {
            if channel.frequency() != frequency {
                channel.set_frequency(frequency)?;
            }
            channel.set_duty_cycle(0.0)?;
        }

        Ok(light)
    }

    fn channels_mut(&mut self) -> [&mut C; 3] {
        [&mut self.red, &mut self.green, &mut self.blue]
    }

    fn ensure_active(&self) -> Result<(), ChannelError> {
        if self.active {
            Ok(())
        } else {
            Err(ChannelError::Stopped { pin: self.red.pin() })
        }
    }

    /// Writes a color to the channels without waiting.
    fn apply(&mut self, color: Srgb) -> Result<(), LightError> {
        self.ensure_active()?;
        self.red.set_duty_cycle(level_to_duty(color.red))?;
        self.green.set_duty_cycle(level_to_duty(color.green))?;
        self.blue.set_duty_cycle(level_to_duty(color.blue))?;
        Ok(())
    }

    /// Shows `color` for `duration`, then turns all channels off.
    pub fn hold(&mut self, color: Srgb, duration: Duration) -> Result<(), LightError> {
        self.hold_continuous(color, duration)?;
        self.apply(OFF)
    }

    /// Shows `color` for `duration` and leaves it on.
    pub fn hold_continuous(&mut self, color: Srgb, duration: Duration) -> Result<(), LightError> {
        self.apply(color)?;
        self.pacer.wait(duration)
    }

    /// Ramps linearly between off and `target` in `|steps|` steps of
    /// [`RAMP_STEP`].
    ///
    /// Positive `steps` ramps up from off and ends on `target`; negative
    /// `steps` ramps down from `target` and ends off. Zero does nothing.
    pub fn ramp(&mut self, target: Srgb, steps: i32) -> Result<(), LightError> {
        let count = steps.unsigned_abs();
        debug!(steps, "ramping to {:?}", target);

        for i in 0..count {
            let level = if steps > 0 { i + 1 } else { count - 1 - i };
            let fraction = level as f32 / count as f32;
            self.hold_continuous(colors::scaled(target, fraction), RAMP_STEP)?;
        }
        Ok(())
    }

    /// Runs one pulse from `base` towards a grey of `intensity` and back.
    ///
    /// The pulse is 36 phase steps of `step` each, following a shifted sine
    /// so the level starts and ends on `base` and peaks at `intensity`. An
    /// intensity outside `[0, 255]` pulses to full white.
    pub fn pulse_once(
        &mut self,
        base: Srgb,
        intensity: f32,
        step: Duration,
    ) -> Result<(), LightError> {
        let intensity = if (0.0..=MAX_LEVEL).contains(&intensity) {
            intensity
        } else {
            MAX_LEVEL
        };
        let peak = colors::grey(intensity);

        for phase in pulse_phases() {
            let swing = (1.0 + (phase as f32).to_radians().sin()) / 2.0;
            self.hold_continuous(base.mix(peak, swing), step)?;
        }
        Ok(())
    }

    /// One pulse to full white with 0.1 s steps.
    pub fn one_pulse(&mut self, base: Srgb) -> Result<(), LightError> {
        self.pulse_once(base, MAX_LEVEL, ONE_PULSE_STEP)
    }

    /// Holds `base` and pulses until `deadline`.
    ///
    /// Each cycle is a steady hold followed by one pulse (see
    /// [`pulse_timing`]). The deadline is checked only between phases, so a
    /// cycle in progress always completes: the returned stop time is at or
    /// after `deadline` and less than one cycle past it. Without pulsing the
    /// color is held in one-second slices.
    pub fn pulse_until(
        &mut self,
        base: Srgb,
        pulse: PulseParams,
        deadline: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, LightError> {
        let (hold, step) = pulse_timing(pulse);
        debug!(
            per_minute = pulse.per_minute,
            intensity = pulse.intensity,
            hold_ms = hold.as_millis() as u64,
            "pulsing until {}",
            deadline
        );

        while self.pacer.now() < deadline {
            self.hold_continuous(base, hold)?;

            if pulse.is_pulsing() && self.pacer.now() < deadline {
                self.pulse_once(base, f32::from(pulse.intensity), step)?;
            }
        }

        Ok(self.pacer.now())
    }

    /// Flashes the seven binary color combinations for one second each.
    pub fn test_cycle(&mut self) -> Result<(), LightError> {
        for color in colors::TEST_CYCLE {
            self.hold(color, Duration::from_secs(1))?;
        }
        Ok(())
    }

    /// Changes the PWM frequency of all three channels.
    pub fn set_frequency(&mut self, hz: f64) -> Result<(), LightError> {
        self.ensure_active()?;
        for channel in self.channels_mut() {
            channel.set_frequency(hz)?;
        }
        self.frequency = hz;
        Ok(())
    }

    /// Shared PWM frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Current duty cycles in percent, red, green, blue.
    pub fn duty_cycles(&self) -> [f64; 3] {
        [
            self.red.duty_cycle(),
            self.green.duty_cycle(),
            self.blue.duty_cycle(),
        ]
    }

    /// Returns the pacer used for every wait.
    pub fn pacer(&self) -> &Pacer<'t, T> {
        &self.pacer
    }

    /// Returns true until [`shutdown`](Self::shutdown) has run.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stops all three channels. Later calls do nothing.
    ///
    /// Every channel is stopped even if an earlier one fails; the first
    /// failure is returned.
    pub fn shutdown(&mut self) -> Result<(), LightError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        debug!("releasing pwm channels");

        let mut first_error = None;
        for channel in self.channels_mut() {
            if let Err(err) = channel.stop() {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

impl<C: PwmChannel, T: TimeSource> Drop for LightController<'_, C, T> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!("failed to release pwm channels: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_has_thirty_six_phases() {
        let phases: Vec<i32> = pulse_phases().collect();
        assert_eq!(phases.len(), 36);
        assert_eq!(phases.first(), Some(&-90));
        assert_eq!(phases.last(), Some(&260));
    }

    #[test]
    fn pulse_timing_follows_pulse_frequency() {
        let (hold, step) = pulse_timing(PulseParams::new(12.0, 200));
        assert!((hold.as_secs_f64() - 2.0).abs() < 1e-9);
        assert_eq!(step, hold / 37);

        let (hold, step) = pulse_timing(PulseParams::NONE);
        assert_eq!(hold, Duration::from_secs(1));
        assert_eq!(step, Duration::ZERO);
    }

    #[test]
    fn smallest_pulse_step_is_longer_than_poll_slice() {
        let (_, step) = pulse_timing(PulseParams::new(40.0, 255));
        assert!(step >= crate::time::POLL_SLICE);
    }
}
