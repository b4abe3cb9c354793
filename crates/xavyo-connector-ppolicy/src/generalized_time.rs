//! LDAP Generalized Time parsing (RFC 4517 §3.3.13).
//!
//! Format: `YYYYMMDDhh[mm[ss]][(.|,)fraction](Z|±hh[mm])`
//!
//! A fraction applies to the last component present, so `2024010112.5Z`
//! is 12:30:00 UTC. A time zone designator is mandatory; local time without
//! a designator is rejected. All values are normalized to UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{PpolicyError, PpolicyResult};

/// Fraction digits beyond nanosecond precision are validated but ignored.
const MAX_FRACTION_DIGITS: usize = 9;

/// Component a trailing fraction applies to.
#[derive(Debug, Clone, Copy)]
enum FractionUnit {
    Hour,
    Minute,
    Second,
}

impl FractionUnit {
    fn nanos(self) -> u128 {
        match self {
            FractionUnit::Hour => 3_600 * 1_000_000_000,
            FractionUnit::Minute => 60 * 1_000_000_000,
            FractionUnit::Second => 1_000_000_000,
        }
    }
}

struct Cursor<'a> {
    raw: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            bytes: raw.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> PpolicyError {
        PpolicyError::invalid_timestamp(self.raw, message)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_digit_pair(&self) -> bool {
        matches!(
            (self.bytes.get(self.pos), self.bytes.get(self.pos + 1)),
            (Some(a), Some(b)) if a.is_ascii_digit() && b.is_ascii_digit()
        )
    }

    fn digits(&mut self, count: usize, what: &str) -> PpolicyResult<u32> {
        let bytes = self.bytes;
        let end = self.pos + count;
        let slice = bytes
            .get(self.pos..end)
            .filter(|s| s.iter().all(u8::is_ascii_digit))
            .ok_or_else(|| self.error(format!("expected {count} digits for {what}")))?;
        self.pos = end;
        Ok(slice
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0')))
    }

    fn ranged(&mut self, what: &str, min: u32, max: u32) -> PpolicyResult<u32> {
        let value = self.digits(2, what)?;
        if value < min || value > max {
            return Err(self.error(format!("{what} {value} out of range {min}-{max}")));
        }
        Ok(value)
    }

    /// Returns `(numerator, digit_count)` of a decimal fraction.
    fn fraction(&mut self) -> PpolicyResult<(u128, u32)> {
        let bytes = self.bytes;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("fraction separator must be followed by digits"));
        }
        let significant = &bytes[start..self.pos.min(start + MAX_FRACTION_DIGITS)];
        let numerator = significant
            .iter()
            .fold(0u128, |acc, b| acc * 10 + u128::from(b - b'0'));
        // Length is bounded by MAX_FRACTION_DIGITS.
        #[allow(clippy::cast_possible_truncation)]
        let digits = significant.len() as u32;
        Ok((numerator, digits))
    }

    fn offset(&mut self) -> PpolicyResult<FixedOffset> {
        let sign = match self.peek() {
            Some(b'Z') => {
                self.pos += 1;
                return FixedOffset::east_opt(0).ok_or_else(|| self.error("invalid UTC offset"));
            }
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Err(self.error("missing time zone designator (Z or ±hh[mm])")),
        };
        self.pos += 1;

        let hours = self.ranged("offset hour", 0, 23)?;
        let minutes = if self.peek_digit_pair() {
            self.ranged("offset minute", 0, 59)?
        } else {
            0
        };

        // Bounded by 23h59m, well inside i32.
        #[allow(clippy::cast_possible_wrap)]
        let seconds = sign * (hours * 3_600 + minutes * 60) as i32;
        FixedOffset::east_opt(seconds).ok_or_else(|| self.error("invalid UTC offset"))
    }

    fn finish(&self) -> PpolicyResult<()> {
        if self.pos != self.bytes.len() {
            return Err(self.error("unexpected trailing characters"));
        }
        Ok(())
    }
}

/// Parse an LDAP generalized time value into a UTC instant.
///
/// # Errors
///
/// Returns [`PpolicyError::InvalidTimestamp`] when the value does not follow
/// the generalized time grammar or names an impossible calendar date.
pub fn parse_generalized_time(raw: &str) -> PpolicyResult<DateTime<Utc>> {
    let mut cursor = Cursor::new(raw);

    let year = cursor.digits(4, "year")?;
    let month = cursor.ranged("month", 1, 12)?;
    let day = cursor.ranged("day", 1, 31)?;
    let hour = cursor.ranged("hour", 0, 23)?;

    let mut unit = FractionUnit::Hour;
    let mut minute = 0;
    let mut second = 0;
    if cursor.peek_digit_pair() {
        minute = cursor.ranged("minute", 0, 59)?;
        unit = FractionUnit::Minute;
        if cursor.peek_digit_pair() {
            // 60 is a leap second.
            second = cursor.ranged("second", 0, 60)?;
            unit = FractionUnit::Second;
        }
    }

    let fraction = if matches!(cursor.peek(), Some(b'.' | b',')) {
        cursor.pos += 1;
        Some(cursor.fraction()?)
    } else {
        None
    };

    let offset = cursor.offset()?;
    cursor.finish()?;

    // Four digits always fit in i32.
    #[allow(clippy::cast_possible_wrap)]
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| cursor.error(format!("{year:04}-{month:02}-{day:02} is not a valid date")))?;
    let naive: Option<NaiveDateTime> = if second == 60 {
        date.and_hms_nano_opt(hour, minute, 59, 1_000_000_000)
    } else {
        date.and_hms_opt(hour, minute, second)
    };
    let naive = naive.ok_or_else(|| cursor.error("invalid time of day"))?;

    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| cursor.error("ambiguous local time"))?;
    let mut instant = local.with_timezone(&Utc);

    if let Some((numerator, digits)) = fraction {
        let nanos = numerator * unit.nanos() / 10u128.pow(digits);
        // Strictly less than one hour of nanoseconds.
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let delta = Duration::nanoseconds(nanos as i64);
        instant = instant
            .checked_add_signed(delta)
            .ok_or_else(|| cursor.error("fraction overflows the representable range"))?;
    }

    Ok(instant)
}
