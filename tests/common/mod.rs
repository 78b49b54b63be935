//! Shared test infrastructure for weatherlight integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use weatherlight::types::DUTY_PER_LEVEL;
use weatherlight::{
    CancelToken, ChannelError, ConnectivityProbe, FetchError, ForecastSample, LightController,
    Pacer, PwmChannel, Srgb, TimeSource, WeatherSource,
};

// ============================================================================
// Mock PWM Channel
// ============================================================================

/// Everything a mock channel was asked to do, shared with the test.
#[derive(Debug, Default)]
pub struct ChannelLog {
    pub duties: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub stops: u32,
}

/// Mock PWM channel that records every duty cycle written
pub struct MockChannel {
    pin: u8,
    frequency: f64,
    duty: f64,
    log: Rc<RefCell<ChannelLog>>,
}

impl MockChannel {
    pub fn new(pin: u8, frequency: f64) -> (Self, Rc<RefCell<ChannelLog>>) {
        let log = Rc::new(RefCell::new(ChannelLog::default()));
        let channel = Self {
            pin,
            frequency,
            duty: 0.0,
            log: Rc::clone(&log),
        };
        (channel, log)
    }
}

impl PwmChannel for MockChannel {
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
        self.duty = percent;
        self.log.borrow_mut().duties.push(percent);
        Ok(())
    }

    fn set_frequency(&mut self, hz: f64) -> Result<(), ChannelError> {
        self.frequency = hz;
        self.log.borrow_mut().frequencies.push(hz);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChannelError> {
        self.duty = 0.0;
        self.log.borrow_mut().stops += 1;
        Ok(())
    }
}

/// Logs of the red, green and blue mock channels
pub struct Probes {
    pub logs: [Rc<RefCell<ChannelLog>>; 3],
}

impl Probes {
    /// Stop calls received by each channel
    pub fn stops(&self) -> [u32; 3] {
        [0, 1, 2].map(|i| self.logs[i].borrow().stops)
    }

    /// Duty cycles of one channel in write order
    pub fn duties(&self, channel: usize) -> Vec<f64> {
        self.logs[channel].borrow().duties.clone()
    }

    /// Written colors as duty triples. The light always writes red, green,
    /// blue in turn, so the three histories line up.
    pub fn colors(&self) -> Vec<[f64; 3]> {
        let red = self.duties(0);
        let green = self.duties(1);
        let blue = self.duties(2);
        red.iter()
            .zip(&green)
            .zip(&blue)
            .map(|((r, g), b)| [*r, *g, *b])
            .collect()
    }

    pub fn last_color(&self) -> [f64; 3] {
        self.colors().last().copied().unwrap_or([0.0; 3])
    }

    /// Highest duty written to any channel
    pub fn peak_duty(&self) -> f64 {
        self.colors()
            .iter()
            .flat_map(|c| c.iter().copied())
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source whose sleep advances the clock instantly.
///
/// An interrupt can be scheduled: the token is cancelled by the first sleep
/// that reaches the given instant.
pub struct MockTimeSource {
    now: Cell<DateTime<Utc>>,
    sleeps: Cell<u64>,
    interrupt: RefCell<Option<(DateTime<Utc>, CancelToken)>>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self::starting_at(start_time())
    }

    pub fn starting_at(time: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(time),
            sleeps: Cell::new(0),
            interrupt: RefCell::new(None),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + delta(duration));
    }

    /// Cancel `token` once the clock reaches `at`
    pub fn interrupt_at(&self, at: DateTime<Utc>, token: CancelToken) {
        *self.interrupt.borrow_mut() = Some((at, token));
    }

    pub fn sleeps(&self) -> u64 {
        self.sleeps.get()
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.set(self.sleeps.get() + 1);

        if let Some((at, token)) = self.interrupt.borrow().as_ref() {
            if self.now.get() >= *at {
                token.cancel();
            }
        }
    }
}

// ============================================================================
// Mock Weather Collaborators
// ============================================================================

/// Weather source that replays a fixed script of results.
///
/// Samples are stamped with the retrieval time the loop passes in. Once the
/// script is exhausted every fetch fails terminally.
pub struct ScriptedWeather {
    script: VecDeque<Result<ForecastSample, FetchError>>,
    requests: Rc<RefCell<Vec<u8>>>,
    cancel_on_fetch: Option<CancelToken>,
}

impl ScriptedWeather {
    pub fn new(script: Vec<Result<ForecastSample, FetchError>>) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let weather = Self {
            script: script.into(),
            requests: Rc::clone(&requests),
            cancel_on_fetch: None,
        };
        (weather, requests)
    }

    /// Simulates an interrupt arriving while the request is in flight
    pub fn cancelling(mut self, token: CancelToken) -> Self {
        self.cancel_on_fetch = Some(token);
        self
    }
}

impl WeatherSource for ScriptedWeather {
    fn fetch(
        &mut self,
        hours_ahead: u8,
        retrieved_at: DateTime<Utc>,
    ) -> Result<ForecastSample, FetchError> {
        self.requests.borrow_mut().push(hours_ahead);
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }
        let next = self
            .script
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Request("script exhausted".into())));
        next.map(|sample| ForecastSample {
            retrieved_at,
            ..sample
        })
    }
}

pub struct MockProbe(pub bool);

impl ConnectivityProbe for MockProbe {
    fn is_reachable(&self) -> bool {
        self.0
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

/// 2016-03-01 16:24:15 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 3, 1, 16, 24, 15).unwrap()
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 3, 1, hour, minute, second).unwrap()
}

pub fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap()
}

/// Light on three mock channels at 100 Hz
pub fn mock_light(
    time: &MockTimeSource,
    cancel: CancelToken,
) -> (LightController<'_, MockChannel, MockTimeSource>, Probes) {
    let (red, red_log) = MockChannel::new(10, 100.0);
    let (green, green_log) = MockChannel::new(9, 100.0);
    let (blue, blue_log) = MockChannel::new(11, 100.0);

    let light = LightController::new(red, green, blue, 100.0, Pacer::new(time, cancel)).unwrap();
    let probes = Probes {
        logs: [red_log, green_log, blue_log],
    };
    (light, probes)
}

pub fn sample(temperature_c: f64, condition: &str, pop: u8) -> ForecastSample {
    ForecastSample {
        retrieved_at: start_time(),
        forecast_at: start_time() + TimeDelta::hours(3),
        temperature_c,
        wind_kph: 12.0,
        condition: condition.to_string(),
        pop,
        qpf_cm: 0.0,
    }
}

/// Duty cycles the light should write for a color
pub fn duty(color: Srgb) -> [f64; 3] {
    [color.red, color.green, color.blue].map(|level| f64::from(level) * DUTY_PER_LEVEL)
}

/// Compare two duty triples with floating-point tolerance
pub fn duties_equal(a: [f64; 3], b: [f64; 3]) -> bool {
    const EPSILON: f64 = 0.001;
    a.iter().zip(&b).all(|(x, y)| (x - y).abs() < EPSILON)
}
