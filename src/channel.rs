//! PWM channel driver.
//!
//! A [`PwmChannel`] is one hardware PWM output. The light owns three of them
//! and never shares them. With the `rppal` feature, [`SoftPwmChannel`] drives
//! a Raspberry Pi GPIO pin through rppal's software PWM.

use crate::error::ChannelError;

/// Trait for abstracting one PWM output.
///
/// Implement this for your PWM hardware to let the light drive it. Duty
/// cycles are percentages; [`set_duty_cycle`](PwmChannel::set_duty_cycle)
/// clamps to `[0, 100]` before anything reaches the hardware and may be
/// called at any rate.
pub trait PwmChannel {
    /// Pin identifier this channel drives.
    fn pin(&self) -> u8;

    /// PWM frequency in Hz.
    fn frequency(&self) -> f64;

    /// Last duty cycle written, in percent.
    fn duty_cycle(&self) -> f64;

    /// Writes a duty cycle already clamped to `[0, 100]`.
    fn write_duty_cycle(&mut self, percent: f64) -> Result<(), ChannelError>;

    /// Changes the PWM frequency, keeping the current duty cycle.
    fn set_frequency(&mut self, hz: f64) -> Result<(), ChannelError>;

    /// Releases the hardware channel. The output is left low.
    fn stop(&mut self) -> Result<(), ChannelError>;

    /// Sets the duty cycle, clamped to `[0, 100]`.
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), ChannelError> {
        self.write_duty_cycle(clamp_duty(percent))
    }
}

/// Clamps a duty cycle percent to `[0, 100]`. NaN maps to 0.
#[inline]
pub fn clamp_duty(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

#[cfg(feature = "rppal")]
pub use soft::SoftPwmChannel;

#[cfg(feature = "rppal")]
mod soft {
    use super::PwmChannel;
    use crate::error::ChannelError;
    use rppal::gpio::{Gpio, OutputPin};

    /// Software PWM on a Raspberry Pi GPIO pin (BCM numbering).
    pub struct SoftPwmChannel {
        output: OutputPin,
        pin: u8,
        frequency: f64,
        duty: f64,
        stopped: bool,
    }

    impl SoftPwmChannel {
        /// Claims `pin` as an output and starts PWM at `frequency` Hz, 0% duty.
        pub fn configure(gpio: &Gpio, pin: u8, frequency: f64) -> Result<Self, ChannelError> {
            let gpio_err = |source| ChannelError::Gpio { pin, source };

            let mut output = gpio.get(pin).map_err(gpio_err)?.into_output_low();
            output.set_pwm_frequency(frequency, 0.0).map_err(gpio_err)?;

            Ok(Self {
                output,
                pin,
                frequency,
                duty: 0.0,
                stopped: false,
            })
        }

        fn ensure_running(&self) -> Result<(), ChannelError> {
            if self.stopped {
                Err(ChannelError::Stopped { pin: self.pin })
            } else {
                Ok(())
            }
        }
    }

    impl PwmChannel for SoftPwmChannel {
        fn pin(&self) -> u8 {
            self.pin
        }

        fn frequency(&self) -> f64 {
            self.frequency
        }

        fn duty_cycle(&self) -> f64 {
            self.duty
        }

        fn write_duty_cycle(&mut self, percent: f64) -> Result<(), ChannelError> {
            self.ensure_running()?;
            let pin = self.pin;
            self.output
                .set_pwm_frequency(self.frequency, percent / 100.0)
                .map_err(|source| ChannelError::Gpio { pin, source })?;
            self.duty = percent;
            Ok(())
        }

        fn set_frequency(&mut self, hz: f64) -> Result<(), ChannelError> {
            self.ensure_running()?;
            let pin = self.pin;
            self.output
                .set_pwm_frequency(hz, self.duty / 100.0)
                .map_err(|source| ChannelError::Gpio { pin, source })?;
            self.frequency = hz;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ChannelError> {
            if self.stopped {
                return Ok(());
            }
            let pin = self.pin;
            self.output
                .clear_pwm()
                .map_err(|source| ChannelError::Gpio { pin, source })?;
            self.output.set_low();
            self.duty = 0.0;
            self.stopped = true;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_is_clamped_to_percent_range() {
        assert_eq!(clamp_duty(-5.0), 0.0);
        assert_eq!(clamp_duty(150.0), 100.0);
        assert_eq!(clamp_duty(42.5), 42.5);
        assert_eq!(clamp_duty(f64::NAN), 0.0);
    }
}
