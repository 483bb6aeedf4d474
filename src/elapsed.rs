use std::fmt::{Display, Formatter};

use chrono::Duration;

use crate::error::TrackError;

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime {
    pub hours: i64,
    pub minutes: i64,
}

impl Display for ElapsedTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} hours {} minutes", self.hours, self.minutes)
    }
}

/// Splits a duration into whole hours and the remainder in minutes.
///
/// Minutes are rounded half-to-even at nanosecond precision. A remainder that
/// rounds up to 60 minutes carries into the hours, so `minutes` is always in
/// `0..60`.
pub fn split(duration: Duration) -> Result<ElapsedTime, TrackError> {
    if duration < Duration::zero() {
        return Err(TrackError::InvalidDuration(duration));
    }

    let seconds = duration.num_seconds();
    let mut hours = seconds / SECONDS_PER_HOUR;
    let remainder = i128::from(seconds % SECONDS_PER_HOUR) * NANOS_PER_SECOND
        + i128::from(duration.subsec_nanos());

    let mut minutes = remainder / NANOS_PER_MINUTE;
    let leftover = remainder % NANOS_PER_MINUTE;
    let twice = leftover * 2;
    if twice > NANOS_PER_MINUTE || (twice == NANOS_PER_MINUTE && minutes % 2 == 1) {
        minutes += 1;
    }

    if minutes == 60 {
        hours += 1;
        minutes = 0;
    }

    Ok(ElapsedTime {
        hours,
        minutes: minutes as i64,
    })
}

/// Hours with one decimal, e.g. `2.5`.
pub fn format_hours(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0) as f64;
    format!("{:.1}", seconds / SECONDS_PER_HOUR as f64)
}

/// Signed hours with one decimal, e.g. `+2.0` or `-1.5`.
pub fn format_signed_hours(duration: Duration) -> String {
    let sign = if duration < Duration::zero() { '-' } else { '+' };
    format!("{sign}{}", format_hours(duration.abs()))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::error::TrackError;

    use super::{ElapsedTime, format_hours, format_signed_hours, split};

    fn elapsed(hours: i64, minutes: i64) -> ElapsedTime {
        ElapsedTime { hours, minutes }
    }

    #[test]
    fn splits_whole_minutes() {
        let duration = Duration::hours(3) + Duration::minutes(32);
        assert_eq!(split(duration).unwrap(), elapsed(3, 32));
    }

    #[test]
    fn carries_rounded_minutes_into_hours() {
        let duration = Duration::hours(1) + Duration::minutes(59) + Duration::seconds(31);
        assert_eq!(split(duration).unwrap(), elapsed(2, 0));
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(split(Duration::seconds(30)).unwrap(), elapsed(0, 0));
        assert_eq!(split(Duration::seconds(90)).unwrap(), elapsed(0, 2));
        assert_eq!(split(Duration::seconds(150)).unwrap(), elapsed(0, 2));
        assert_eq!(
            split(Duration::seconds(30) + Duration::nanoseconds(1)).unwrap(),
            elapsed(0, 1)
        );
    }

    #[test]
    fn keeps_days_as_hours() {
        let duration = Duration::days(1)
            + Duration::hours(3)
            + Duration::minutes(12)
            + Duration::seconds(55)
            + Duration::milliseconds(333);
        assert_eq!(split(duration).unwrap(), elapsed(27, 13));
    }

    #[test]
    fn rejects_negative_duration() {
        let err = split(Duration::seconds(-1)).unwrap_err();
        assert!(matches!(err, TrackError::InvalidDuration(_)));
    }

    #[test]
    fn displays_like_session_report() {
        assert_eq!(elapsed(4, 32).to_string(), "4 hours 32 minutes");
        assert_eq!(format_hours(Duration::minutes(150)), "2.5");
        assert_eq!(format_signed_hours(Duration::hours(2)), "+2.0");
        assert_eq!(format_signed_hours(Duration::minutes(-90)), "-1.5");
        assert_eq!(format_signed_hours(Duration::zero()), "+0.0");
    }
}
