//! Publication date extraction from RSS `pubDate` strings.
//!
//! Only the calendar date matters for naming files, so the weekday, time and
//! timezone fields are ignored entirely. Two feeds publishing at 23:30 in
//! different zones get the date they print, not a UTC-normalised one.

use chrono::NaiveDate;
use thiserror::Error;

/// Month abbreviations as they appear in RFC 822 dates. Matching is exact and
/// case-sensitive.
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Errors from [`parse_pub_date`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    /// Too few fields to hold a day, month and year
    #[error("Malformed date: {0:?}")]
    Malformed(String),
    /// Month token not in the abbreviation table
    #[error("Unknown month abbreviation: {0:?}")]
    UnknownMonth(String),
    /// Day or year token is not a plain unsigned number of the right width
    #[error("Invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    /// Fields parsed but do not name a real calendar day
    #[error("Invalid calendar date: {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Maps a three-letter month abbreviation to its 1-indexed month number.
pub fn month_number(abbrev: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|idx| idx as u32 + 1)
}

/// Parses `<weekday>, <day> <Mon> <year> <time> <tz>` into a calendar date.
///
/// Surrounding whitespace is ignored and the leading weekday may be omitted.
/// The day must be one or two digits and the year exactly four. Anything after
/// the year is not inspected.
pub fn parse_pub_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let mut tokens = raw.split_whitespace().peekable();

    // Weekday is optional: skip the first token unless it is already the day.
    if let Some(first) = tokens.peek() {
        if !is_ascii_digits(first) {
            tokens.next();
        }
    }

    let (Some(day), Some(month), Some(year)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(DateParseError::Malformed(raw.trim().to_string()));
    };

    let day: u32 = day
        .parse()
        .ok()
        .filter(|_| day.len() <= 2 && is_ascii_digits(day))
        .ok_or_else(|| DateParseError::InvalidNumber {
            field: "day",
            value: day.to_string(),
        })?;
    let month =
        month_number(month).ok_or_else(|| DateParseError::UnknownMonth(month.to_string()))?;
    // Exactly four digits keeps the rendered date in YYYY-MM-DD form
    let year: i32 = year
        .parse()
        .ok()
        .filter(|_| year.len() == 4 && is_ascii_digits(year))
        .ok_or_else(|| DateParseError::InvalidNumber {
            field: "year",
            value: year.to_string(),
        })?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(DateParseError::InvalidDate { year, month, day })
}

fn is_ascii_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
