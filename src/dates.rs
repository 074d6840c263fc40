//! Due-date parsing.
//!
//! Clients send due dates as free text. This module normalizes the text and
//! tries a fixed, ordered list of templates; the first template that yields a
//! plausible date wins. Ambiguous inputs such as `01-02-03` therefore resolve
//! by template order, never by locale. Text that matches no template is tried
//! as a Unix timestamp (10 digits for seconds, 13 for milliseconds).

use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveDateTime, ParseError, TimeZone, Utc,
};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref DATE_SEPARATORS: Regex = Regex::new(r"[./\-]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;
const MAX_YEARS_AHEAD: u32 = 100;

/// Returned when a non-empty due date cannot be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    /// No template accepted the text. `source` is the error of the last template tried.
    #[error("unparsable date {input:?}: {source}")]
    Unparsable {
        input: String,
        #[source]
        source: ParseError,
    },
    /// At least one template parsed the text, but its date fell outside the accepted range.
    #[error("date {input:?} is outside the accepted range")]
    OutOfRange { input: String },
}

#[derive(Debug, Clone, Copy)]
enum Template {
    /// Calendar date, midnight UTC.
    Date(&'static str),
    /// Calendar date with a two-digit year.
    ShortYearDate(&'static str),
    /// Date and time of day, UTC.
    DateTime(&'static str),
    /// ISO-8601 / RFC 3339 with an explicit offset.
    Rfc3339,
}

// chrono accepts one or two digits for %m, %d and %H, so `2025-3-5` and
// `2025-03-05` share a template. %B accepts full and abbreviated month names.
const TEMPLATES: &[Template] = &[
    Template::Date("%Y-%m-%d"),
    Template::ShortYearDate("%y-%m-%d"),
    Template::DateTime("%Y-%m-%d %H:%M:%S"),
    Template::DateTime("%Y-%m-%d %H:%M"),
    Template::Rfc3339,
    Template::Date("%m-%d-%Y"),
    Template::Date("%B %d, %Y"),
    Template::Date("%d %b %Y"),
    Template::ShortYearDate("%d %b %y"),
    Template::Date("%Y%m%d"),
    Template::ShortYearDate("%y%m%d"),
];

impl Template {
    fn parse(self, text: &str) -> Result<Option<DateTime<Utc>>, ParseError> {
        let parsed = match self {
            Template::Date(fmt) => NaiveDate::parse_from_str(text, fmt)?
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive)),
            Template::ShortYearDate(fmt) => {
                let date = NaiveDate::parse_from_str(text, fmt)?;
                date.with_year(expand_short_year(date.year()))
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
            Template::DateTime(fmt) => {
                Some(Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(text, fmt)?))
            }
            Template::Rfc3339 => {
                Some(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
            }
        };
        Ok(parsed)
    }
}

/// Maps a two-digit year onto a century: `00..=49` become 2000s, `50..=99` 1900s.
fn expand_short_year(year: i32) -> i32 {
    let yy = year.rem_euclid(100);
    if yy < 50 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Applies separator, whitespace and ideographic rewrites to trimmed input.
pub fn normalize(text: &str) -> String {
    let text = DATE_SEPARATORS.replace_all(text.trim(), "-");
    let mut text = WHITESPACE_RUN.replace_all(&text, " ").into_owned();

    if text.contains('年') {
        text = text.replace('年', "-").replace('月', "-").replace('日', "");
    }
    text
}

fn within_range(instant: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    if !(MIN_YEAR..=MAX_YEAR).contains(&instant.year()) {
        return false;
    }
    match now.checked_add_months(Months::new(MAX_YEARS_AHEAD * 12)) {
        Some(limit) => *instant <= limit,
        None => true,
    }
}

fn parse_unix_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let value: i64 = text.parse().ok()?;
    match text.len() {
        10 => Utc.timestamp_opt(value, 0).single(),
        13 => Utc.timestamp_opt(value / 1000, 0).single(),
        _ => None,
    }
}

/// Parses a due date relative to the current time.
///
/// Empty or blank input yields `Ok(None)`.
pub fn parse_due_date(text: &str) -> Result<Option<DateTime<Utc>>, DateParseError> {
    parse_due_date_at(text, Utc::now())
}

/// Parses a due date, rejecting anything more than 100 years after `now`.
pub fn parse_due_date_at(
    text: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, DateParseError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Ok(None);
    }

    let mut last_error = None;
    let mut rejected = false;
    for template in TEMPLATES {
        match template.parse(&normalized) {
            Ok(Some(instant)) if within_range(&instant, &now) => return Ok(Some(instant)),
            Ok(Some(_)) => rejected = true,
            Ok(None) => {}
            Err(err) => last_error = Some(err),
        }
    }

    if let Some(instant) = parse_unix_timestamp(&normalized) {
        return Ok(Some(instant));
    }

    Err(match last_error {
        Some(source) if !rejected => DateParseError::Unparsable {
            input: text.to_string(),
            source,
        },
        _ => DateParseError::OutOfRange {
            input: text.to_string(),
        },
    })
}
