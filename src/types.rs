use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TITLE_COLUMN: &str = "Title";
pub const DATE_COLUMN: &str = "Date";
pub const PDF_URL_COLUMN: &str = "PDF_URL";
pub const TEXT_COLUMN: &str = "Extracted_Text";

/// Display format for normalized dates, e.g. "15 Jun 2023"
pub const DISPLAY_DATE_FORMAT: &str = "%d %b %Y";

/// One row of the circulars table, as stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub title: Option<String>,
    pub date: Option<String>,
    pub pdf_url: Option<String>,
    pub extracted_text: Option<String>,
}

/// Everything the store returned: the column names plus rows in store order
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RecordTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Plain-text preview of the first `n` rows, used when dates cannot be parsed
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::from("Title | Date | PDF_URL\n");
        for row in self.rows.iter().take(n) {
            out.push_str(&format!(
                "{} | {} | {}\n",
                row.title.as_deref().unwrap_or("None"),
                row.date.as_deref().unwrap_or("None"),
                row.pdf_url.as_deref().unwrap_or("None"),
            ));
        }
        out
    }
}

/// A circular after date normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circular {
    /// Row position in the store; stable for the lifetime of one load
    pub id: usize,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    /// The date text as stored, kept for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(skip)]
    pub extracted_text: Option<String>,
}

impl Circular {
    /// Title and Date are both required for the circular to take part in filtering
    pub fn is_usable(&self) -> bool {
        self.title.is_some() && self.date.is_some()
    }

    /// "DD Mon YYYY" or "Not Available"
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Not Available".to_string())
    }

    /// Label shown in the selector: "15 Jun 2023 - Title"
    ///
    /// Returns `None` when the date is missing, since such circulars never
    /// survive the date filter.
    pub fn label(&self) -> Option<String> {
        let date = self.date?;
        Some(format!(
            "{} - {}",
            date.format(DISPLAY_DATE_FORMAT),
            self.title.as_deref().unwrap_or("")
        ))
    }
}

/// A circular that survived filtering, with its selector label
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub label: String,
    #[serde(flatten)]
    pub circular: Circular,
}
