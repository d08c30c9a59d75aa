use std::path::{Path, PathBuf};
use std::process::Command;

use insta;
use rusqlite::Connection;

const SEED_ROWS: &str = "
    INSERT INTO circulars VALUES ('Consultation Paper on REIT Units', '05 Mar 2024', 'https://example.org/reit.pdf', 'Proposal 1: lower the minimum lot size.');
    INSERT INTO circulars VALUES ('Draft Circular on Algo Trading', '20 Dec 2023', NULL, 'Proposal 1: register algorithms.');
    INSERT INTO circulars VALUES ('Untitled scrape', 'unknown', NULL, NULL);";

/// Create a fresh database file for one test under the system temp dir
fn seed_database(name: &str) -> PathBuf {
    seed_database_with(name, SEED_ROWS)
}

fn seed_database_with(name: &str, rows: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("circulars-cli-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("circulars.db");
    let _ = std::fs::remove_file(&path);

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE circulars (Title TEXT, Date TEXT, PDF_URL TEXT, Extracted_Text TEXT);{}",
        rows
    ))
    .unwrap();
    path
}

/// Run the binary against a database, isolated from the caller's environment
fn run(db: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_circulars"))
        .args(args)
        .arg("--db")
        .arg(db)
        .current_dir(db.parent().unwrap())
        .env_remove("CIRCULARS_DB")
        .env_remove("CIRCULARS_CONFIG")
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_BACKTRACE")
        .env_remove("RUST_LIB_BACKTRACE")
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute command");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn cli_list_prints_ids_and_labels() {
    let db = seed_database("list");
    let (stdout, _stderr, code) = run(&db, &["list"]);
    assert_eq!(code, 0);
    insta::assert_snapshot!(stdout, @r###"
    0	05 Mar 2024 - Consultation Paper on REIT Units
    1	20 Dec 2023 - Draft Circular on Algo Trading
    "###);
}

#[test]
fn cli_list_with_filters() {
    let db = seed_database("filters");
    let (stdout, _stderr, code) = run(&db, &["list", "--title", "ALGO", "--from", "2023-12-20", "--to", "2023-12-20"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1\t20 Dec 2023 - Draft Circular on Algo Trading");
}

#[test]
fn cli_title_query_is_not_trimmed() {
    let db = seed_database("untrimmed");
    let (stdout, _stderr, code) = run(&db, &["list", "--title", " on algo"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1\t20 Dec 2023 - Draft Circular on Algo Trading");

    // "Trading" ends the title, so a trailing space cannot match
    let (stdout, stderr, code) = run(&db, &["list", "--title", "Trading "]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("No circulars found for the selected filters."));
}

#[test]
fn cli_bounds_snapshot() {
    let db = seed_database("bounds");
    let (stdout, _stderr, code) = run(&db, &["bounds"]);
    assert_eq!(code, 0);
    insta::assert_snapshot!(stdout, @r###"
    Earliest: 2023-12-20
    Latest:   2024-03-05
    Records:  3
    Date format: %d %b %Y
    Unusable: 1 (ids: 2)
    "###);
}

#[test]
fn cli_unparseable_dates_show_preview() {
    let db = seed_database_with(
        "undated",
        "INSERT INTO circulars VALUES ('Annual Report', 'someday', 'https://example.org/annual.pdf', NULL);
         INSERT INTO circulars VALUES ('Quarterly Note', 'tbd', NULL, NULL);",
    );
    let (stdout, stderr, code) = run(&db, &["list"]);
    assert_ne!(code, 0);
    assert!(stdout.is_empty());
    insta::assert_snapshot!(stderr.trim_end(), @r###"
    Error: Could not parse any valid dates. Check the 'Date' column format in the database.
    Title | Date | PDF_URL
    Annual Report | someday | https://example.org/annual.pdf
    Quarterly Note | tbd | None
    "###);
}

#[test]
fn cli_no_matches_is_a_warning() {
    let db = seed_database("nomatch");
    let (stdout, stderr, code) = run(&db, &["list", "--title", "mutual funds"]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("No circulars found for the selected filters."));
}

#[test]
fn cli_inverted_range_fails() {
    let db = seed_database("range");
    let (_stdout, stderr, code) = run(&db, &["list", "--from", "2024-01-01", "--to", "2023-01-01"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid date range"));
}

#[test]
fn cli_show_by_label() {
    let db = seed_database("show");
    let (stdout, _stderr, code) = run(
        &db,
        &["show", "--label", "05 Mar 2024 - Consultation Paper on REIT Units"],
    );
    assert_eq!(code, 0);
    insta::assert_snapshot!(stdout, @r###"
    Circular Details
    Date: 05 Mar 2024
    Title: Consultation Paper on REIT Units
    PDF: https://example.org/reit.pdf

    Extracted Text:
    Proposal 1: lower the minimum lot size.
    "###);
}

#[test]
fn cli_show_unknown_id_is_not_found() {
    let db = seed_database("unknown");
    let (_stdout, stderr, code) = run(&db, &["show", "--id", "2"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Circular not found"));
}

#[test]
fn cli_summarize_requires_api_key() {
    let db = seed_database("nokey");
    let (_stdout, stderr, code) = run(&db, &["summarize", "--id", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("GEMINI_API_KEY"));
}

#[test]
fn cli_summarize_service_failure_is_reported() {
    let db = seed_database("svcfail");
    // Nothing listens on the discard port, so the request fails fast
    std::fs::write(
        db.parent().unwrap().join("circulars.yml"),
        "endpoint: http://127.0.0.1:9/v1beta\ntimeout_secs: 5\n",
    )
    .unwrap();
    let (stdout, stderr, code) = run(&db, &["summarize", "--id", "1", "--api-key", "test-key"]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("An error occurred while generating the summary"));
}
