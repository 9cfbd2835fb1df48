use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("invalid ISO 8601 duration {input:?}: {reason}")]
    Invalid { input: String, reason: String },
    #[error("duration {0:?} uses years or months, which have no fixed length")]
    CalendarUnit(String),
}

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// Parses an ISO 8601 duration as reported in `contentDetails.duration`,
/// such as `PT4M13S` or `P1DT2H`.
pub fn parse_iso8601_duration(input: &str) -> Result<Duration, DurationParseError> {
    let parsed = iso8601::duration(input).map_err(|reason| DurationParseError::Invalid {
        input: input.to_string(),
        reason,
    })?;

    match parsed {
        iso8601::Duration::Weeks(weeks) => Ok(Duration::from_secs(
            u64::from(weeks) * SECS_PER_WEEK,
        )),
        iso8601::Duration::YMDHMS {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        } => {
            if year != 0 || month != 0 {
                return Err(DurationParseError::CalendarUnit(input.to_string()));
            }
            let secs = u64::from(day) * SECS_PER_DAY
                + u64::from(hour) * SECS_PER_HOUR
                + u64::from(minute) * SECS_PER_MINUTE
                + u64::from(second);
            Ok(Duration::from_secs(secs) + Duration::from_millis(u64::from(millisecond)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_video_durations() {
        assert_eq!(
            parse_iso8601_duration("PT4M13S").unwrap(),
            Duration::from_secs(4 * 60 + 13)
        );
        assert_eq!(
            parse_iso8601_duration("PT1H").unwrap(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            parse_iso8601_duration("PT2H0M5S").unwrap(),
            Duration::from_secs(7205)
        );
        assert_eq!(
            parse_iso8601_duration("P1DT2H").unwrap(),
            Duration::from_secs(26 * 3600)
        );
        assert_eq!(
            parse_iso8601_duration("P1W").unwrap(),
            Duration::from_secs(7 * 24 * 3600)
        );
    }

    #[test]
    fn zero_durations_are_valid() {
        assert_eq!(parse_iso8601_duration("P0D").unwrap(), Duration::ZERO);
        assert_eq!(parse_iso8601_duration("PT0S").unwrap(), Duration::ZERO);
    }

    #[test]
    fn fractional_seconds_are_kept() {
        assert_eq!(
            parse_iso8601_duration("PT1.5S").unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn rejects_calendar_units() {
        assert_eq!(
            parse_iso8601_duration("P1M"),
            Err(DurationParseError::CalendarUnit("P1M".into()))
        );
        assert!(matches!(
            parse_iso8601_duration("P1YT5M"),
            Err(DurationParseError::CalendarUnit(_))
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["4M13S", "garbage", ""] {
            assert!(
                matches!(
                    parse_iso8601_duration(input),
                    Err(DurationParseError::Invalid { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }
}
