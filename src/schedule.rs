//! Refresh deadlines aligned to the wall clock.
//!
//! Refreshes happen on whole multiples of the interval within each hour
//! (e.g. :00, :10, :20 ... for a 10 minute interval), always in UTC.

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{debug, warn};

use crate::error::ScheduleError;

/// Returns the next aligned refresh time after `now`.
///
/// The next aligned minute within the current hour is chosen; once the
/// current minute is at or past the last aligned minute of the hour, the
/// refresh rolls over to the top of the next hour. Seconds are always zero.
/// An interval that does not divide 60 still works but gives an uneven gap
/// before the top of the hour, and logs a warning.
///
/// # Errors
/// * `ZeroInterval` - `interval_minutes` is zero
pub fn next_refresh(
    interval_minutes: u32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    if interval_minutes == 0 {
        return Err(ScheduleError::ZeroInterval);
    }
    if 60 % interval_minutes != 0 {
        warn!(
            interval_minutes,
            "refresh interval does not divide the hour evenly"
        );
    }

    let into_hour = Duration::minutes(i64::from(now.minute()))
        + Duration::seconds(i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    let hour_start = now - into_hour;

    let minute = now.minute();
    let last_aligned = (59 / interval_minutes) * interval_minutes;

    let refresh = if minute >= last_aligned {
        hour_start + Duration::hours(1)
    } else {
        let next = (minute / interval_minutes + 1) * interval_minutes;
        hour_start + Duration::minutes(i64::from(next))
    };

    debug!(
        "time now {}, refresh at {}",
        now.format("%H:%M:%S"),
        refresh.format("%H:%M:%S")
    );
    Ok(refresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, 1, hour, minute, second).unwrap()
    }

    #[test]
    fn picks_next_aligned_minute_within_hour() {
        assert_eq!(next_refresh(10, at(16, 24, 15)).unwrap(), at(16, 30, 0));
        assert_eq!(next_refresh(15, at(9, 0, 0)).unwrap(), at(9, 15, 0));
        assert_eq!(next_refresh(30, at(9, 29, 59)).unwrap(), at(9, 30, 0));
    }

    #[test]
    fn rolls_over_after_last_aligned_minute() {
        assert_eq!(next_refresh(10, at(16, 55, 0)).unwrap(), at(17, 0, 0));
        assert_eq!(next_refresh(10, at(16, 50, 0)).unwrap(), at(17, 0, 0));
        assert_eq!(next_refresh(30, at(9, 45, 30)).unwrap(), at(10, 0, 0));
    }

    #[test]
    fn rolls_over_to_next_day() {
        let next = next_refresh(20, at(23, 41, 7)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2016, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn uneven_interval_still_aligns_within_hour() {
        // Aligned minutes for 7: 0, 7, ... 56.
        assert_eq!(next_refresh(7, at(12, 50, 0)).unwrap(), at(12, 56, 0));
        assert_eq!(next_refresh(7, at(12, 56, 0)).unwrap(), at(13, 0, 0));
        // 58 only aligns at :00, so every refresh is the top of the hour.
        assert_eq!(next_refresh(58, at(12, 3, 0)).unwrap(), at(13, 0, 0));
    }

    #[test]
    fn refresh_is_always_in_the_future() {
        for minute in 0..60 {
            let now = at(8, minute, 30);
            let next = next_refresh(5, now).unwrap();
            assert!(next > now);
            assert_eq!(next.second(), 0);
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(next_refresh(0, at(1, 2, 3)), Err(ScheduleError::ZeroInterval));
    }
}
