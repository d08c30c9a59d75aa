use chrono::NaiveDate;
use circulars::config::DEFAULT_DATABASE;
use circulars::prelude::*;
use circulars::types::{PDF_URL_COLUMN, TEXT_COLUMN};
use circulars::DateStrategy;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Browse, filter and summarize regulatory circulars
#[derive(Parser, Debug)]
#[command(name = "circulars")]
#[command(about = "Browse, filter and summarize regulatory circulars from a local database")]
#[command(version)]
struct Args {
    /// SQLite database file (default: sebi_circulars.db, or CIRCULARS_DB env var)
    #[arg(long, global = true)]
    db: Option<String>,

    /// YAML settings file (default: circulars.yml if present, or CIRCULARS_CONFIG env var)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the earliest and latest circular dates in the database
    Bounds,

    /// List circulars matching the filters, one selectable label per line
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print one JSON object per line instead of labels
        #[arg(long)]
        json: bool,
    },

    /// Show details and extracted text of one circular
    Show {
        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Generate a regulatory review of one circular
    Summarize {
        #[command(flatten)]
        selector: SelectorArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Model name (default: gemini-2.0-flash)
        #[arg(long)]
        model: Option<String>,

        /// API key for the summarization service (can also use GEMINI_API_KEY env var)
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct FilterArgs {
    /// Case-insensitive keyword to search for in titles
    #[arg(short, long, default_value = "")]
    title: String,

    /// Earliest date to include (YYYY-MM-DD, default: earliest in the data)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Latest date to include (YYYY-MM-DD, default: latest in the data)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct SelectorArgs {
    /// Circular id as printed by `list`
    #[arg(long)]
    id: Option<usize>,

    /// Display label as printed by `list` (first match wins)
    #[arg(long)]
    label: Option<String>,
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn print_available_commands() {
    println!("Available commands:");
    println!("  bounds     Show the earliest and latest circular dates in the database");
    println!("  list       List circulars matching the filters");
    println!("  show       Show details and extracted text of one circular");
    println!("  summarize  Generate a regulatory review of one circular");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn get_config_path(config: Option<String>) -> Option<PathBuf> {
    // Check flag first, then environment variable, then ./circulars.yml
    if let Some(config) = config {
        Some(PathBuf::from(config))
    } else if let Ok(config) = std::env::var("CIRCULARS_CONFIG") {
        Some(PathBuf::from(config))
    } else {
        let local = PathBuf::from("circulars.yml");
        local.is_file().then_some(local)
    }
}

fn build_config(
    args: &Args,
    model: Option<String>,
    api_key: Option<String>,
) -> circulars::Result<Config> {
    let file = match get_config_path(args.config.clone()) {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };

    let mut builder = ConfigBuilder::new(DEFAULT_DATABASE).file_config(file);

    if let Some(db) = args.db.clone().or_else(|| std::env::var("CIRCULARS_DB").ok()) {
        builder = builder.database(db);
    }

    if let Some(model) = model {
        builder = builder.model(model);
    }

    if let Some(key) = api_key.or_else(|| std::env::var("GEMINI_API_KEY").ok()) {
        builder = builder.api_key(key);
    }

    builder.build()
}

/// Load the whole table and normalize it; repeated on every invocation
fn load_circulars(config: &Config) -> circulars::Result<CircularSet> {
    let store = SqliteStore::open(&config.database, config.table.clone())?;
    let table = store.load_all()?;
    CircularSet::prepare(table, &config.normalizer()?)
}

fn build_criteria(set: &CircularSet, filters: &FilterArgs) -> circulars::Result<FilterCriteria> {
    let bounds = set.bounds();
    let range = DateRange::new(
        filters.from.unwrap_or(bounds.start()),
        filters.to.unwrap_or(bounds.end()),
    )?;
    Ok(FilterCriteria::new(filters.title.as_str(), range))
}

fn select(set: &CircularSet, filters: &FilterArgs, selector: &SelectorArgs) -> circulars::Result<Candidate> {
    let candidates = set.filter(&build_criteria(set, filters)?)?;
    let found = match (&selector.id, &selector.label) {
        (Some(id), _) => resolve_id(&candidates, *id),
        (None, Some(label)) => resolve_label(&candidates, label),
        (None, None) => None,
    };
    found.cloned().ok_or_else(|| {
        Error::NotFound(match (&selector.id, &selector.label) {
            (Some(id), _) => format!("no circular with id {} matches the filters", id),
            (_, Some(label)) => format!("no circular labelled '{}' matches the filters", label),
            _ => "no selection given".to_string(),
        })
    })
}

fn run_bounds_command(config: &Config) -> circulars::Result<()> {
    let set = load_circulars(config)?;
    let bounds = set.bounds();
    println!("Earliest: {}", bounds.start());
    println!("Latest:   {}", bounds.end());
    println!("Records:  {}", set.len());
    match set.strategy() {
        DateStrategy::Format(format) => println!("Date format: {}", format),
        DateStrategy::Fallback => println!("Date format: mixed (day-first fallback)"),
    }
    if !set.unusable().is_empty() {
        let ids: Vec<String> = set.unusable().iter().map(|id| id.to_string()).collect();
        println!("Unusable: {} (ids: {})", ids.len(), ids.join(", "));
    }
    Ok(())
}

fn run_list_command(config: &Config, filters: &FilterArgs, json: bool) -> circulars::Result<()> {
    let set = load_circulars(config)?;
    let candidates = set.filter(&build_criteria(&set, filters)?)?;

    for candidate in &candidates {
        if json {
            println!("{}", serde_json::to_string(candidate)?);
        } else {
            println!("{}\t{}", candidate.circular.id, candidate.label);
        }
    }
    Ok(())
}

fn run_show_command(config: &Config, filters: &FilterArgs, selector: &SelectorArgs) -> circulars::Result<()> {
    let set = load_circulars(config)?;
    let candidate = select(&set, filters, selector)?;
    let circular = &candidate.circular;

    println!("Circular Details");
    println!("Date: {}", circular.display_date());
    println!("Title: {}", circular.title.as_deref().unwrap_or(""));

    if set.has_column(PDF_URL_COLUMN) {
        if let Some(url) = &circular.pdf_url {
            println!("PDF: {}", url);
        }
    }

    if set.has_column(TEXT_COLUMN) {
        println!();
        println!("Extracted Text:");
        println!("{}", circular.extracted_text.as_deref().unwrap_or(""));
    } else {
        eprintln!("The 'Extracted_Text' column is missing from the data.");
    }
    Ok(())
}

async fn run_summarize_command(
    config: &Config,
    filters: &FilterArgs,
    selector: &SelectorArgs,
) -> circulars::Result<()> {
    let set = load_circulars(config)?;
    if !set.has_column(TEXT_COLUMN) {
        return Err(Error::Config(
            "The 'Extracted_Text' column is missing from the data.".to_string(),
        ));
    }
    let candidate = select(&set, filters, selector)?;
    let summarizer_config = config.summarizer()?;

    eprintln!("⏳ Generating summary for {}...", candidate.label);

    // The HTTP client blocks, so it lives entirely on the blocking pool
    let circular = candidate.circular;
    let outcome = tokio::task::spawn_blocking(move || {
        let summarizer = GeminiSummarizer::new(summarizer_config)?;
        summarize_circular(&summarizer, &circular)
    })
    .await
    .map_err(|e| Error::Config(format!("Task join error: {}", e)))?;

    match outcome {
        Ok(summary) => {
            eprintln!("✓ Summary generated");
            println!("{}", summary);
        }
        Err(e) => {
            eprintln!("An error occurred while generating the summary: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let result = match &args.command {
        Some(Command::Bounds) => {
            build_config(&args, None, None).and_then(|config| run_bounds_command(&config))
        }
        Some(Command::List { filters, json }) => build_config(&args, None, None)
            .and_then(|config| run_list_command(&config, filters, *json)),
        Some(Command::Show { selector, filters }) => build_config(&args, None, None)
            .and_then(|config| run_show_command(&config, filters, selector)),
        Some(Command::Summarize {
            selector,
            filters,
            model,
            api_key,
        }) => match build_config(&args, model.clone(), api_key.clone()) {
            Ok(config) => run_summarize_command(&config, filters, selector).await,
            Err(e) => Err(e),
        },
        None => {
            print_available_commands();
            Ok(())
        }
    };

    match result {
        Err(e) if e.is_warning() => {
            eprintln!("⚠ {}", e);
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}
