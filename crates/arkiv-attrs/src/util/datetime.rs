//! RFC 3339 timestamp parsing and formatting for `*At` attributes.
//!
//! Timestamps are held as microseconds since the Unix epoch plus the UTC
//! offset (in minutes) they were written in. Unlike a general date parser,
//! a missing offset is an error here: no timezone is ever assumed.

const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
const MICROSECONDS_PER_MINUTE: i64 = 60 * MICROSECONDS_PER_SECOND;
const MICROSECONDS_PER_HOUR: i64 = 60 * MICROSECONDS_PER_MINUTE;
const MICROSECONDS_PER_DAY: i64 = 24 * MICROSECONDS_PER_HOUR;

/// Largest absolute offset accepted (23:59).
const MAX_OFFSET_MINUTES: i16 = 23 * 60 + 59;

/// Length of `YYYY-MM-DDTHH:MM:SS`.
const DATETIME_PREFIX_LEN: usize = 19;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

/// Parses a fixed-width run of ASCII digits. Signs are rejected.
fn parse_digits(s: &str, what: &str) -> Result<u32, DateTimeParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateTimeParseError::new(format!("{} is not numeric: {:?}", what, s)));
    }
    s.parse()
        .map_err(|_| DateTimeParseError::new(format!("{} is not numeric: {:?}", what, s)))
}

/// Parses `Z`, `+HH:MM` or `-HH:MM` into minutes east of UTC.
fn parse_timezone_offset(offset: &str) -> Result<i16, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let invalid = || DateTimeParseError::new(format!("invalid UTC offset: {:?}", offset));

    let bytes = offset.as_bytes();
    if bytes.len() != 6 || bytes[3] != b':' {
        return Err(invalid());
    }
    let sign = match bytes[0] {
        b'+' => 1i16,
        b'-' => -1i16,
        _ => return Err(invalid()),
    };

    let hours = parse_digits(&offset[1..3], "offset hours").map_err(|_| invalid())? as i16;
    let minutes = parse_digits(&offset[4..6], "offset minutes").map_err(|_| invalid())? as i16;
    if minutes > 59 {
        return Err(invalid());
    }

    let total = hours * 60 + minutes;
    if total > MAX_OFFSET_MINUTES {
        return Err(invalid());
    }
    Ok(sign * total)
}

/// Formats minutes east of UTC as `Z` or `±HH:MM`.
fn format_timezone_offset(offset_min: i16) -> String {
    if offset_min == 0 {
        return "Z".to_string();
    }
    let sign = if offset_min > 0 { '+' } else { '-' };
    let abs = offset_min.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

/// Converts fractional-second digits to microseconds, truncating past six digits.
fn parse_fraction(digits: &str) -> i64 {
    digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0i64, |acc, b| acc * 10 + (b - b'0') as i64)
}

/// Formats microseconds as `.ffffff` with trailing zeros removed, or nothing.
fn format_fraction(us: i64) -> String {
    if us == 0 {
        return String::new();
    }
    let digits = format!("{:06}", us);
    format!(".{}", digits.trim_end_matches('0'))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a civil date (Howard Hinnant's algorithm).
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year as i64 - 1 } else { year as i64 };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + (if month <= 2 { 1 } else { 0 });
    (year, month, day)
}

/// Parses `YYYY-MM-DDTHH:MM:SS[.f+](Z|±HH:MM)` and returns microseconds
/// since the Unix epoch and the offset in minutes.
pub fn parse_timestamp(s: &str) -> Result<(i64, i16), DateTimeParseError> {
    if !s.is_ascii() {
        return Err(DateTimeParseError::new(format!("non-ASCII timestamp: {:?}", s)));
    }
    let bytes = s.as_bytes();
    if bytes.len() < DATETIME_PREFIX_LEN
        || bytes[4] != b'-'
        || bytes[7] != b'-'
        || !matches!(bytes[10], b'T' | b't')
        || bytes[13] != b':'
        || bytes[16] != b':'
    {
        return Err(DateTimeParseError::new(format!(
            "expected YYYY-MM-DDTHH:MM:SS with offset, got {:?}",
            s
        )));
    }

    let year = parse_digits(&s[0..4], "year")? as i32;
    let month = parse_digits(&s[5..7], "month")?;
    let day = parse_digits(&s[8..10], "day")?;
    let hours = parse_digits(&s[11..13], "hours")? as i64;
    let minutes = parse_digits(&s[14..16], "minutes")? as i64;
    let seconds = parse_digits(&s[17..19], "seconds")? as i64;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::new(format!("invalid month in {:?}", s)));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::new(format!("invalid day in {:?}", s)));
    }
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(DateTimeParseError::new(format!("invalid time of day in {:?}", s)));
    }

    let mut rest = &s[DATETIME_PREFIX_LEN..];
    let mut fraction_us = 0;
    if let Some(after_dot) = rest.strip_prefix('.') {
        let end = after_dot
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_dot.len());
        if end == 0 {
            return Err(DateTimeParseError::new(format!("empty fractional seconds in {:?}", s)));
        }
        fraction_us = parse_fraction(&after_dot[..end]);
        rest = &after_dot[end..];
    }

    if rest.is_empty() {
        return Err(DateTimeParseError::new(format!("missing UTC offset in {:?}", s)));
    }
    let offset_min = parse_timezone_offset(rest)?;

    let local_micros = days_from_civil(year, month, day) * MICROSECONDS_PER_DAY
        + hours * MICROSECONDS_PER_HOUR
        + minutes * MICROSECONDS_PER_MINUTE
        + seconds * MICROSECONDS_PER_SECOND
        + fraction_us;

    // local = UTC + offset
    let epoch_micros = local_micros - offset_min as i64 * MICROSECONDS_PER_MINUTE;
    Ok((epoch_micros, offset_min))
}

/// Formats microseconds since the Unix epoch as RFC 3339 in the given offset.
///
/// Fails for offsets beyond +-23:59 and for instants whose local year falls
/// outside 0000-9999, since neither would parse back.
pub fn format_timestamp(epoch_micros: i64, offset_min: i16) -> Result<String, DateTimeParseError> {
    if offset_min.unsigned_abs() > MAX_OFFSET_MINUTES as u16 {
        return Err(DateTimeParseError::new(format!("invalid UTC offset: {} minutes", offset_min)));
    }
    let local = (offset_min as i64)
        .checked_mul(MICROSECONDS_PER_MINUTE)
        .and_then(|shift| epoch_micros.checked_add(shift))
        .ok_or_else(|| DateTimeParseError::new(format!("timestamp out of range: {}", epoch_micros)))?;
    let days = local.div_euclid(MICROSECONDS_PER_DAY);
    let time_of_day = local.rem_euclid(MICROSECONDS_PER_DAY);

    let (year, month, day) = civil_from_days(days);
    if !(0..=9999).contains(&year) {
        return Err(DateTimeParseError::new(format!("year {} outside 0000-9999", year)));
    }
    let hours = time_of_day / MICROSECONDS_PER_HOUR;
    let minutes = time_of_day % MICROSECONDS_PER_HOUR / MICROSECONDS_PER_MINUTE;
    let seconds = time_of_day % MICROSECONDS_PER_MINUTE / MICROSECONDS_PER_SECOND;
    let micros = time_of_day % MICROSECONDS_PER_SECOND;

    Ok(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{}",
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
        format_fraction(micros),
        format_timezone_offset(offset_min)
    ))
}
