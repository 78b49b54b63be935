//! Time abstraction and cooperative cancellation.
//!
//! All waiting goes through a [`Pacer`], which sleeps in short slices and
//! checks a [`CancelToken`] between them. Long holds therefore react to an
//! interrupt within one slice instead of only at call boundaries.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::LightError;

/// Longest uninterrupted sleep. Shorter than the smallest pulse step.
pub const POLL_SLICE: Duration = Duration::from_millis(10);

/// Trait for abstracting the wall clock and blocking sleep.
pub trait TimeSource {
    /// Returns the current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// System clock backed by `chrono::Utc::now` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared flag raised by an interrupt handler and observed by the light.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from a signal handler thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellable waiting on top of a [`TimeSource`].
pub struct Pacer<'t, T: TimeSource> {
    time_source: &'t T,
    cancel: CancelToken,
}

impl<'t, T: TimeSource> Pacer<'t, T> {
    pub fn new(time_source: &'t T, cancel: CancelToken) -> Self {
        Self {
            time_source,
            cancel,
        }
    }

    /// Current wall-clock time.
    #[inline]
    pub fn now(&self) -> DateTime<Utc> {
        self.time_source.now()
    }

    /// Fails with [`LightError::Interrupted`] once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), LightError> {
        if self.cancel.is_cancelled() {
            Err(LightError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Waits for `duration` in slices of at most [`POLL_SLICE`].
    pub fn wait(&self, duration: Duration) -> Result<(), LightError> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            self.check()?;
            let slice = remaining.min(POLL_SLICE);
            self.time_source.sleep(slice);
            remaining -= slice;
        }
        self.check()
    }
}
