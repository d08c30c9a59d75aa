//! Date normalization for the free-text `Date` column.
//!
//! Circulars are scraped from pages that use several date styles, so the
//! column is normalized as a whole: the first known format that parses any
//! entry is applied to every entry. Only when no format matches at all does
//! each entry go through a permissive day-first parser.

use crate::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

/// Candidate formats, tried in order against the whole column
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Which strategy produced a normalized column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateStrategy {
    /// A single format accepted for the whole column
    Format(String),
    /// Per-entry day-first heuristic
    Fallback,
}

/// A normalized column, same length as the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDates {
    pub dates: Vec<Option<NaiveDate>>,
    pub strategy: DateStrategy,
}

impl NormalizedDates {
    /// True when no entry could be parsed (also true for an empty column)
    pub fn all_missing(&self) -> bool {
        self.dates.iter().all(Option::is_none)
    }

    pub fn parsed_count(&self) -> usize {
        self.dates.iter().filter(|d| d.is_some()).count()
    }
}

/// Normalizes heterogeneous date strings into calendar dates
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    formats: Vec<String>,
    time_re: Regex,
    token_re: Regex,
}

impl DateNormalizer {
    /// Create a normalizer with the default format list
    pub fn new() -> Result<Self> {
        Self::with_formats(DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect())
    }

    /// Create a normalizer with a custom, ordered format list
    pub fn with_formats(formats: Vec<String>) -> Result<Self> {
        Ok(Self {
            formats,
            time_re: Regex::new(r"[0-9]{1,2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?")?,
            token_re: Regex::new(r"(?P<num>[0-9]+)(?i:st|nd|rd|th)?|(?P<word>[A-Za-z]+)")?,
        })
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Normalize a column of raw date strings
    ///
    /// The first format that parses at least one entry wins for the whole
    /// column, even if a later format would parse more entries.
    pub fn normalize<S: AsRef<str>>(&self, column: &[Option<S>]) -> NormalizedDates {
        for format in &self.formats {
            let dates: Vec<Option<NaiveDate>> = column
                .iter()
                .map(|raw| {
                    raw.as_ref()
                        .and_then(|s| NaiveDate::parse_from_str(s.as_ref().trim(), format).ok())
                })
                .collect();

            if dates.iter().any(Option::is_some) {
                debug!(format = %format, entries = column.len(), "date format accepted for column");
                return NormalizedDates {
                    dates,
                    strategy: DateStrategy::Format(format.clone()),
                };
            }
        }

        debug!(entries = column.len(), "no date format matched, using day-first fallback");
        NormalizedDates {
            dates: column
                .iter()
                .map(|raw| raw.as_ref().and_then(|s| self.parse_day_first(s.as_ref())))
                .collect(),
            strategy: DateStrategy::Fallback,
        }
    }

    /// Permissive day-first parse of a single entry
    ///
    /// Time of day, weekday names and ordinal suffixes are ignored. Anything
    /// that does not pin down day, month and year is rejected rather than
    /// completed from the current date.
    pub fn parse_day_first(&self, raw: &str) -> Option<NaiveDate> {
        let cleaned = self.time_re.replace_all(raw.trim(), " ");
        let mut month: Option<u32> = None;
        let mut numbers: Vec<&str> = Vec::new();

        for caps in self.token_re.captures_iter(&cleaned) {
            if let Some(num) = caps.name("num") {
                numbers.push(num.as_str());
                continue;
            }
            let word = caps.name("word")?.as_str().to_lowercase();
            if let Some(m) = month_from_name(&word) {
                if month.is_some() {
                    return None;
                }
                month = Some(m);
            } else if !is_ignorable_word(&word) {
                return None;
            }
        }

        match (month, numbers.as_slice()) {
            (None, [compact]) if compact.len() == 8 => {
                let year = compact.get(0..4)?.parse().ok()?;
                let month = compact.get(4..6)?.parse().ok()?;
                let day = compact.get(6..8)?.parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            }
            (Some(month), [a, b]) => {
                let (day, year) = match (looks_like_year(a), looks_like_year(b)) {
                    (false, true) => (a, b),
                    (true, false) => (b, a),
                    (false, false) => (a, b),
                    (true, true) => return None,
                };
                NaiveDate::from_ymd_opt(expand_year(year)?, month, day.parse().ok()?)
            }
            (None, [a, b, c]) => {
                let (year, mut month, mut day): (i32, u32, u32) = if looks_like_year(a) {
                    (expand_year(a)?, b.parse().ok()?, c.parse().ok()?)
                } else {
                    (expand_year(c)?, b.parse().ok()?, a.parse().ok()?)
                };
                if month > 12 && day <= 12 {
                    std::mem::swap(&mut month, &mut day);
                }
                NaiveDate::from_ymd_opt(year, month, day)
            }
            _ => None,
        }
    }
}

fn month_from_name(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| *m == word || (word.len() == 3 && m.starts_with(word)) || (word == "sept" && *m == "september"))
        .map(|idx| idx as u32 + 1)
}

fn is_ignorable_word(word: &str) -> bool {
    matches!(word, "t" | "z" | "am" | "pm" | "utc" | "gmt" | "ist" | "of" | "on")
        || WEEKDAYS
            .iter()
            .any(|d| *d == word || (word.len() == 3 && d.starts_with(word)))
}

fn looks_like_year(token: &str) -> bool {
    token.len() == 4 || token.parse::<u32>().map(|n| n > 31).unwrap_or(false)
}

/// Two-digit years pivot at 69, like POSIX `%y`
fn expand_year(token: &str) -> Option<i32> {
    let n: i32 = token.parse().ok()?;
    match token.len() {
        1 | 2 if n < 69 => Some(2000 + n),
        1 | 2 => Some(1900 + n),
        3 | 4 => Some(n),
        _ => None,
    }
}
