//! Funding-Rate Arithmetic
//!
//! Converts between total amounts, durations, and per-second unlock rates.
//! All arithmetic is in base token units (integers); division floors, and a
//! rate that floors to zero is a defined failure rather than a stream that
//! never unlocks anything.

use std::time::Duration;

use crate::error::StreamError;
use crate::time_unit::parse_rate;

/// Upper clamp for any duration derived from funding arithmetic.
///
/// A dust-sized `amount_per_second` makes `funded / rate` astronomically
/// large; accessors clamp to this rather than overflow. Roughly 100 years.
pub const MAX_STREAM_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Per-second rate from a total amount and a target stream duration.
///
/// Truncating division; amounts below one token-unit per second floor to
/// zero and are rejected as [`StreamError::InvalidRate`].
pub fn per_second(amount: u128, duration: Duration) -> Result<u128, StreamError> {
    let seconds = u128::from(duration.as_secs());
    let rate = if seconds == 0 { 0 } else { amount / seconds };

    if rate == 0 {
        return Err(StreamError::InvalidRate {
            expr: format!("{amount}/{}s", duration.as_secs()),
        });
    }

    Ok(rate)
}

/// Per-second rate from a `"<amount>/<unit>"` expression.
pub fn per_second_from_expr(expr: &str) -> Result<u128, StreamError> {
    let (amount, unit) = parse_rate(expr)?;
    let rate = amount / u128::from(unit.total_seconds());

    if rate == 0 {
        return Err(StreamError::InvalidRate {
            expr: expr.to_string(),
        });
    }

    Ok(rate)
}

/// Tokens needed to extend a stream by `period` at `amount_per_second`.
///
/// Exact in base units; saturates at `u128::MAX` rather than overflowing.
#[must_use]
pub fn estimate_funding(period: Duration, amount_per_second: u128) -> u128 {
    u128::from(period.as_secs()).saturating_mul(amount_per_second)
}

/// Stream life bought by `amount` at `amount_per_second`, clamped to
/// [`MAX_STREAM_DURATION`].
#[must_use]
pub fn stream_life(amount: u128, amount_per_second: u128) -> Duration {
    if amount_per_second == 0 {
        return Duration::ZERO;
    }

    let seconds = amount / amount_per_second;
    if seconds >= u128::from(MAX_STREAM_DURATION.as_secs()) {
        MAX_STREAM_DURATION
    } else {
        // Fits: bounded by MAX_STREAM_DURATION which is well under u64::MAX.
        Duration::from_secs(seconds as u64)
    }
}

/// Decimal-normalized rate for display: base units per second divided by the
/// token's decimal scale.
#[must_use]
pub fn display_rate(amount_per_second: u128, decimals: u8) -> f64 {
    // Display only; precision loss past f64's mantissa is acceptable here.
    let scale = 10f64.powi(i32::from(decimals));
    amount_per_second as f64 / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_floors() {
        let rate = per_second(100, Duration::from_secs(3600)).unwrap_err();
        assert!(matches!(rate, StreamError::InvalidRate { .. }));

        assert_eq!(per_second(7200, Duration::from_secs(3600)).unwrap(), 2);
        assert_eq!(per_second(7201, Duration::from_secs(3600)).unwrap(), 2);
    }

    #[test]
    fn test_per_second_rejects_zero_duration() {
        assert!(per_second(100, Duration::ZERO).is_err());
    }

    #[test]
    fn test_per_second_from_expr_round_trip() {
        // parse_rate("100/hour") and the 3600 divisor floor to 0 -> rejected
        assert!(per_second_from_expr("100/hour").is_err());
        assert_eq!(per_second_from_expr("3600/hour").unwrap(), 1);
        assert_eq!(per_second_from_expr("1/second").unwrap(), 1);
    }

    #[test]
    fn test_estimate_funding_is_exact() {
        assert_eq!(estimate_funding(Duration::from_secs(3600), 25), 90_000);
        assert_eq!(estimate_funding(Duration::ZERO, 25), 0);
    }

    #[test]
    fn test_stream_life_clamps() {
        assert_eq!(stream_life(3600, 1), Duration::from_secs(3600));
        assert_eq!(stream_life(u128::MAX, 1), MAX_STREAM_DURATION);
        assert_eq!(stream_life(100, 0), Duration::ZERO);
    }

    #[test]
    fn test_display_rate() {
        let rate = display_rate(1_500_000, 6);
        assert!((rate - 1.5).abs() < f64::EPSILON);
    }
}
