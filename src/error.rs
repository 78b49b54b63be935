//! Error types for every layer of the light.
//!
//! Hardware and cancellation errors end the run; fetch errors are classified
//! so the control loop can tell a retryable timeout from a terminal failure.

use thiserror::Error;

/// PWM channel setup or drive failure. Hardware faults are never retried.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// GPIO layer rejected the request.
    #[cfg(feature = "rppal")]
    #[error("gpio error on pin {pin}: {source}")]
    Gpio {
        /// BCM pin number.
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },

    /// Channel was used after being stopped.
    #[error("pwm channel on pin {pin} is stopped")]
    Stopped {
        /// BCM pin number.
        pin: u8,
    },
}

/// Errors raised while driving the light.
#[derive(Debug, Error)]
pub enum LightError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Cancellation was requested while the light was being driven.
    #[error("interrupted")]
    Interrupted,
}

/// Curve table construction and lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurveError {
    /// No rows were provided.
    #[error("curve table has no rows")]
    EmptyTable,

    /// The x row holds fewer than two samples.
    #[error("curve table needs at least two samples, got {0}")]
    TooFewPoints(usize),

    /// A y row does not match the length of the x row.
    #[error("row {row} has {actual} samples, expected {expected}")]
    LengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// X values must be strictly ascending.
    #[error("x value at index {0} is not strictly greater than its predecessor")]
    NotAscending(usize),

    /// Row or sample capacity exceeded.
    #[error("curve table capacity exceeded")]
    CapacityExceeded,

    /// Requested dimension does not exist in the table.
    #[error("dimension {dimension} exceeds the {available} available dimensions")]
    DimensionOutOfRange { dimension: usize, available: usize },
}

/// Failures turning a provider response into a forecast sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// The response has no entry for the requested hour.
    #[error("no forecast {index} hours ahead (response holds {available})")]
    MissingHour { index: usize, available: usize },

    /// A required field is absent from the forecast hour.
    #[error("field `{0}` is missing")]
    MissingField(&'static str),

    /// A field is present but cannot be interpreted.
    #[error("field `{field}` has unusable value `{value}`")]
    InvalidField { field: &'static str, value: String },

    /// The provider answered with an error object instead of data.
    #[error("provider error {kind}: {description}")]
    Provider { kind: String, description: String },
}

/// Weather fetch failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection timed out. Worth retrying later.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Request could not be completed (bad url, refused connection, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// Provider returned a non-success status.
    #[error("provider returned status {0}")]
    Status(u16),

    /// Body is not valid JSON.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body is JSON but does not hold a usable forecast.
    #[error(transparent)]
    Malformed(#[from] ExtractError),
}

impl FetchError {
    /// Returns true when the failure is worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

/// Refresh scheduling errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("refresh interval must be at least one minute")]
    ZeroInterval,
}

/// Errors that end the control loop abnormally.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Light(#[from] LightError),

    #[error(transparent)]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
