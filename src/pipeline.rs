//! Filter and selection over a normalized set of circulars.

use crate::dates::{DateNormalizer, DateStrategy};
use crate::error::{Error, Result};
use crate::types::{Candidate, Circular, RecordTable, DATE_COLUMN, TITLE_COLUMN};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Number of raw rows shown when the date column cannot be parsed
const PREVIEW_ROWS: usize = 5;

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Smallest range covering every date, or `None` if there are none
    pub fn spanning(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        dates.into_iter().fold(None, |acc, date| match acc {
            None => Some(Self { start: date, end: date }),
            Some(range) => Some(Self {
                start: range.start.min(date),
                end: range.end.max(date),
            }),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// User-supplied filter criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive title substring; empty means no constraint
    pub title_query: String,
    pub range: DateRange,
}

impl FilterCriteria {
    pub fn new(title_query: impl Into<String>, range: DateRange) -> Self {
        Self {
            title_query: title_query.into(),
            range,
        }
    }
}

/// The full, normalized record set for one interaction
#[derive(Debug, Clone)]
pub struct CircularSet {
    columns: Vec<String>,
    circulars: Vec<Circular>,
    bounds: DateRange,
    strategy: DateStrategy,
    unusable: Vec<usize>,
}

impl CircularSet {
    /// Validate the table and normalize its dates
    ///
    /// Fails with `DataAbsent` for an empty table, `SchemaInvalid` when Title
    /// or Date columns are missing and `DateNormalization` when no date parses.
    pub fn prepare(table: RecordTable, normalizer: &DateNormalizer) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::DataAbsent);
        }

        let missing: Vec<String> = [TITLE_COLUMN, DATE_COLUMN]
            .iter()
            .filter(|c| !table.has_column(c))
            .map(|c| format!("'{}'", c))
            .collect();
        if !missing.is_empty() {
            return Err(Error::SchemaInvalid { missing });
        }

        let raw_dates: Vec<Option<&str>> = table.rows.iter().map(|r| r.date.as_deref()).collect();
        let normalized = normalizer.normalize(&raw_dates);

        let bounds = match DateRange::spanning(normalized.dates.iter().flatten().copied()) {
            Some(bounds) => bounds,
            None => {
                return Err(Error::DateNormalization {
                    preview: table.preview(PREVIEW_ROWS),
                })
            }
        };

        info!(
            records = table.len(),
            parsed_dates = normalized.parsed_count(),
            strategy = ?normalized.strategy,
            "normalized circulars"
        );

        let strategy = normalized.strategy;
        let columns = table.columns;
        let circulars: Vec<Circular> = table
            .rows
            .into_iter()
            .zip(normalized.dates)
            .enumerate()
            .map(|(id, (row, date))| Circular {
                id,
                title: row.title,
                date,
                raw_date: row.date,
                pdf_url: row.pdf_url,
                extracted_text: row.extracted_text,
            })
            .collect();

        let unusable: Vec<usize> = circulars
            .iter()
            .filter(|c| !c.is_usable())
            .map(|c| c.id)
            .collect();
        for id in &unusable {
            let circular = &circulars[*id];
            warn!(
                id,
                title = ?circular.title,
                raw_date = ?circular.raw_date,
                "circular is missing a title or a parseable date"
            );
        }

        Ok(Self {
            columns,
            circulars,
            bounds,
            strategy,
            unusable,
        })
    }

    pub fn circulars(&self) -> &[Circular] {
        &self.circulars
    }

    /// Whether the store provided the named column
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.circulars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circulars.is_empty()
    }

    /// Min/max normalized dates, used to bound the range picker
    pub fn bounds(&self) -> DateRange {
        self.bounds
    }

    pub fn strategy(&self) -> &DateStrategy {
        &self.strategy
    }

    /// Ids of circulars lacking a title or a parseable date
    pub fn unusable(&self) -> &[usize] {
        &self.unusable
    }

    /// Criteria spanning the whole data set with no title constraint
    pub fn default_criteria(&self) -> FilterCriteria {
        FilterCriteria::new("", self.bounds)
    }

    /// Apply the title and date filters
    ///
    /// Returns `NoMatches` when nothing survives.
    pub fn filter(&self, criteria: &FilterCriteria) -> Result<Vec<Candidate>> {
        let candidates: Vec<Candidate> = filter_circulars(&self.circulars, criteria).collect();
        debug!(
            query = %criteria.title_query,
            start = %criteria.range.start(),
            end = %criteria.range.end(),
            matches = candidates.len(),
            "filtered circulars"
        );
        if candidates.is_empty() {
            return Err(Error::NoMatches);
        }
        Ok(candidates)
    }

    /// Look a circular up by its stable id
    pub fn select_by_id(&self, id: usize) -> Option<&Circular> {
        self.circulars.get(id)
    }
}

/// Lazily filter circulars by title substring and inclusive date range
pub fn filter_circulars<'a>(
    circulars: &'a [Circular],
    criteria: &'a FilterCriteria,
) -> impl Iterator<Item = Candidate> + 'a {
    let query = criteria.title_query.to_lowercase();
    circulars
        .iter()
        .filter(move |c| title_matches(c.title.as_deref(), &query))
        .filter(move |c| c.date.map(|d| criteria.range.contains(d)).unwrap_or(false))
        .filter_map(|c| {
            c.label().map(|label| Candidate {
                label,
                circular: c.clone(),
            })
        })
}

/// `query` must already be lowercase
fn title_matches(title: Option<&str>, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    title
        .map(|t| t.to_lowercase().contains(query))
        .unwrap_or(false)
}

/// First candidate whose label equals `label`
///
/// Labels are not unique: two circulars with the same date and title share
/// one. Prefer `select_by_id` where an id is available.
pub fn resolve_label<'a>(candidates: &'a [Candidate], label: &str) -> Option<&'a Candidate> {
    candidates.iter().find(|c| c.label == label)
}

/// Find a candidate by id within the filtered list
pub fn resolve_id(candidates: &[Candidate], id: usize) -> Option<&Candidate> {
    candidates.iter().find(|c| c.circular.id == id)
}
