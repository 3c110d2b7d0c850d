//! Date helper functions

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::fmt::{self, Write as _};

/// Parse a front-matter date in the formats Jekyll-style posts use.
///
/// Strings carrying an offset keep it; anything else is read as local time
/// in `tz`.
pub fn parse_date_string(s: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let with_offset = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z", "%Y-%m-%dT%H:%M:%S%z"];
    for fmt in with_offset {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let naive = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in naive {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(dt, tz);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return localize(d.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

/// Midnight of a filename date in the site zone
pub fn start_of_day(date: NaiveDate, tz: Tz) -> Option<DateTime<FixedOffset>> {
    localize(date.and_hms_opt(0, 0, 0)?, tz)
}

fn localize(dt: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    // Ambiguous times take the earlier instant; times skipped by a DST jump
    // move forward to the first wall-clock time that exists
    let mut candidate = dt;
    for _ in 0..=GAP_STEPS {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(d) => return Some(d.fixed_offset()),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.fixed_offset()),
            LocalResult::None => candidate += Duration::minutes(GAP_STEP_MINUTES),
        }
    }
    None
}

/// DST gaps are at most a couple of hours; search them in quarter hours
const GAP_STEP_MINUTES: i64 = 15;
const GAP_STEPS: usize = 12;

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD") // -> "2024-01-15"
/// ```
///
/// Fails instead of panicking if the format contains a specifier chrono
/// cannot render.
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str) -> Result<String, fmt::Error>
where
    Tz2::Offset: fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    let mut out = String::new();
    write!(out, "{}", date.format(&chrono_format))?;
    Ok(out)
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each family
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
    ];

    // A literal `%` would otherwise start a chrono specifier
    let mut result = format.replace('%', "%%");

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
