//! Time-Unit Shorthand Parsing
//!
//! Human inputs express funding as "100/day" or thresholds as "2 week".
//! This module canonicalizes the unit words and shorthands into [`TimeUnit`]
//! values. Unknown units are a defined failure
//! ([`StreamError::InvalidTimeUnit`]), never a silent default.

use std::str::FromStr;
use std::time::Duration;

use crate::error::StreamError;

/// A canonical unit of time accepted in rate and threshold expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// One second.
    Second,
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One day.
    Day,
    /// One week.
    Week,
}

impl TimeUnit {
    /// Seconds in one unit. This is the divisor when converting
    /// "amount per unit time" into "amount per second".
    #[must_use]
    pub const fn total_seconds(self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 60 * 60,
            Self::Day => 24 * 60 * 60,
            Self::Week => 7 * 24 * 60 * 60,
        }
    }

    /// One unit as a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.total_seconds())
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TimeUnit {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case-insensitive; full words may be pluralized; common shorthands
        // map to the same unit.
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(Self::Second),
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(Self::Minute),
            "h" | "hr" | "hour" | "hours" => Ok(Self::Hour),
            "d" | "day" | "days" => Ok(Self::Day),
            "wk" | "week" | "weeks" => Ok(Self::Week),
            other => Err(StreamError::InvalidTimeUnit {
                unit: other.to_string(),
            }),
        }
    }
}

/// Parse a `"<amount>/<unit>"` rate expression into its parts.
///
/// The amount is a plain integer in base token units; the unit goes through
/// [`TimeUnit::from_str`]. Both halves are trimmed, so `"100 / day"` works.
pub fn parse_rate(expr: &str) -> Result<(u128, TimeUnit), StreamError> {
    let Some((amount, unit)) = expr.split_once('/') else {
        return Err(StreamError::InvalidRate {
            expr: expr.to_string(),
        });
    };

    let amount: u128 = amount
        .trim()
        .parse()
        .map_err(|_| StreamError::InvalidRate {
            expr: expr.to_string(),
        })?;

    Ok((amount, unit.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_words_and_plurals() {
        assert_eq!("second".parse::<TimeUnit>().unwrap(), TimeUnit::Second);
        assert_eq!("Seconds".parse::<TimeUnit>().unwrap(), TimeUnit::Second);
        assert_eq!("minutes".parse::<TimeUnit>().unwrap(), TimeUnit::Minute);
        assert_eq!("hours".parse::<TimeUnit>().unwrap(), TimeUnit::Hour);
        assert_eq!("days".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert_eq!("weeks".parse::<TimeUnit>().unwrap(), TimeUnit::Week);
    }

    #[test]
    fn test_shorthands() {
        for (text, unit) in [
            ("s", TimeUnit::Second),
            ("sec", TimeUnit::Second),
            ("secs", TimeUnit::Second),
            ("m", TimeUnit::Minute),
            ("min", TimeUnit::Minute),
            ("mins", TimeUnit::Minute),
            ("h", TimeUnit::Hour),
            ("hr", TimeUnit::Hour),
            ("d", TimeUnit::Day),
            ("wk", TimeUnit::Week),
        ] {
            assert_eq!(text.parse::<TimeUnit>().unwrap(), unit, "unit {text}");
        }
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let err = "fortnight".parse::<TimeUnit>().unwrap_err();
        assert!(matches!(
            err,
            StreamError::InvalidTimeUnit { unit } if unit == "fortnight"
        ));
    }

    #[test]
    fn test_total_seconds() {
        assert_eq!(TimeUnit::Hour.total_seconds(), 3600);
        assert_eq!(TimeUnit::Week.total_seconds(), 604_800);
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("100/hour").unwrap(), (100, TimeUnit::Hour));
        assert_eq!(parse_rate("1 / day").unwrap(), (1, TimeUnit::Day));
        assert!(parse_rate("100").is_err());
        assert!(parse_rate("x/hour").is_err());
        assert!(matches!(
            parse_rate("100/lightyear").unwrap_err(),
            StreamError::InvalidTimeUnit { .. }
        ));
    }
}
