use crate::error::{Error, Result};
use crate::types::{RawRecord, RecordTable, DATE_COLUMN, PDF_URL_COLUMN, TEXT_COLUMN, TITLE_COLUMN};
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use tracing::debug;

/// Default table holding the scraped circulars
pub const DEFAULT_TABLE: &str = "circulars";

/// Read-only source of circular records
pub trait CircularStore {
    /// Return every circular as a table with named columns
    fn load_all(&self) -> Result<RecordTable>;
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    /// Open a database file read-only
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Database file does not exist: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Self::from_connection(conn, table)
    }

    /// Wrap an existing connection (e.g. an in-memory database)
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?;
        if !ident.is_match(&table) {
            return Err(Error::Config(format!("Invalid table name '{}'", table)));
        }
        Ok(Self { conn, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl CircularStore for SqliteStore {
    fn load_all(&self) -> Result<RecordTable> {
        let sql = format!("SELECT * FROM \"{}\"", self.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let index_of = |name: &str| columns.iter().position(|c| c == name);
        let title_idx = index_of(TITLE_COLUMN);
        let date_idx = index_of(DATE_COLUMN);
        let pdf_idx = index_of(PDF_URL_COLUMN);
        let text_idx = index_of(TEXT_COLUMN);

        let rows = stmt
            .query_map([], |row| {
                Ok(RawRecord {
                    title: column_text(row, title_idx)?,
                    date: column_text(row, date_idx)?,
                    pdf_url: column_text(row, pdf_idx)?,
                    extracted_text: column_text(row, text_idx)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(table = %self.table, rows = rows.len(), columns = ?columns, "loaded circulars");
        Ok(RecordTable::new(columns, rows))
    }
}

/// Read a column as text, rendering numbers and treating NULL/blobs as absent
fn column_text(row: &Row, idx: Option<usize>) -> rusqlite::Result<Option<String>> {
    let Some(idx) = idx else {
        return Ok(None);
    };
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE circulars (Title TEXT, Date TEXT, PDF_URL TEXT, Extracted_Text TEXT);
             INSERT INTO circulars VALUES ('Annual Report', '01-01-2023', 'https://example.org/a.pdf', 'body a');
             INSERT INTO circulars VALUES ('Quarterly Note', '15-06-2023', NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_load_all_reads_named_columns() {
        let store = SqliteStore::from_connection(seeded(), DEFAULT_TABLE).unwrap();
        let table = store.load_all().unwrap();
        assert_eq!(table.columns, vec!["Title", "Date", "PDF_URL", "Extracted_Text"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].pdf_url.as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(table.rows[1].pdf_url, None);
        assert_eq!(table.rows[1].extracted_text, None);
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE circulars (Title TEXT, Date INTEGER);
             INSERT INTO circulars VALUES ('Compact', 20230403);",
        )
        .unwrap();
        let store = SqliteStore::from_connection(conn, DEFAULT_TABLE).unwrap();
        let table = store.load_all().unwrap();
        assert!(!table.has_column("PDF_URL"));
        assert_eq!(table.rows[0].date.as_deref(), Some("20230403"));
        assert_eq!(table.rows[0].pdf_url, None);
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteStore::from_connection(conn, "circulars; DROP TABLE x").is_err());
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteStore::from_connection(conn, "nope").unwrap();
        assert!(matches!(store.load_all(), Err(Error::Sqlite(_))));
    }
}
