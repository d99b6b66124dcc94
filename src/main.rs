//! tabscan - In-memory viewer and search engine for large delimited files
//!
//! Loads the whole file, then prints one page, a set of lines, or one page of search
//! results as delimiter-joined text.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tabscan::ingest::ReaderSettings;
use tabscan::parser::parse_delimiter;
use tabscan::search::{Row, SearchQuery, SearchSession};
use tabscan::settings::{FileSelection, SettingsStore};
use tabscan::view::{view_lines, view_page, LineSelection};
use tabscan::{AppConfig, ColumnDescriptor, InMemoryFileReader, IngestionResult, TextEncoding};

fn cli() -> Command {
    Command::new("tabscan")
        .version(tabscan::VERSION)
        .about("Load a large delimited file into memory, then view and search it")
        .long_about(
            "tabscan streams a delimited text file into an in-memory line table using a \
             pool of workers, then prints a page of rows, selected lines or search results. \
             Column indexes are zero-based and refer to the header line.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the delimited file")
                .value_parser(value_parser!(PathBuf))
                .required_unless_present("history")
                .index(1),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .help("Field delimiter; defaults to the one used the last time the file was opened"),
        )
        .arg(
            Arg::new("encoding")
                .short('e')
                .long("encoding")
                .help("Text encoding: utf8 or ascii"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_parser(value_parser!(usize))
                .help("Number of workers populating the line table"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_parser(value_parser!(usize))
                .help("Lines per batch handed to a worker"),
        )
        .arg(
            Arg::new("buffer-mb")
                .long("buffer-mb")
                .value_parser(value_parser!(usize))
                .help("Read buffer size in megabytes"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (TOML)"),
        )
        .arg(
            Arg::new("search")
                .short('s')
                .long("search")
                .help("Print rows containing this term"),
        )
        .arg(
            Arg::new("columns")
                .long("columns")
                .requires("search")
                .help("Only match the term in these columns, e.g. 1,2"),
        )
        .arg(
            Arg::new("select")
                .long("select")
                .help("Columns to output, e.g. 0,2"),
        )
        .arg(
            Arg::new("order-by")
                .long("order-by")
                .value_parser(value_parser!(usize))
                .help("Sort search results by this output column"),
        )
        .arg(
            Arg::new("page")
                .short('p')
                .long("page")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("1-based page to print"),
        )
        .arg(
            Arg::new("page-size")
                .long("page-size")
                .value_parser(value_parser!(usize))
                .help("Rows per page"),
        )
        .arg(
            Arg::new("lines")
                .short('l')
                .long("lines")
                .conflicts_with("search")
                .help("Print specific 1-based lines, e.g. \"1, 2, 5-8\""),
        )
        .arg(
            Arg::new("store-settings")
                .long("store-settings")
                .action(ArgAction::SetTrue)
                .help("Remember the column selection and ordering for this file"),
        )
        .arg(
            Arg::new("reset-settings")
                .long("reset-settings")
                .action(ArgAction::SetTrue)
                .help("Forget stored column settings for this file"),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .action(ArgAction::SetTrue)
                .help("List previously opened files and exit"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; RUST_LOG controls verbosity
    env_logger::init();

    let matches = cli().get_matches();

    let config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let store = SettingsStore::new(config.data_dir());

    if matches.get_flag("history") {
        return print_history(&store).await;
    }

    let file = matches
        .get_one::<PathBuf>("file")
        .context("file argument is required")?;
    let path = std::fs::canonicalize(file).unwrap_or_else(|_| file.clone());

    let previous = find_previous(&store, &path).await;
    let settings = reader_settings(&matches, &config, previous.as_ref())?;

    let mut result = InMemoryFileReader::new(&path, settings)
        .read()
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;

    apply_column_settings(&matches, &store, &mut result).await?;

    if let Err(e) = store.record_selection(&result).await {
        log::warn!("Could not record file selection: {e}");
    }

    let page_size = matches
        .get_one::<usize>("page-size")
        .copied()
        .unwrap_or(config.search.page_size);
    let page = matches.get_one::<usize>("page").copied().unwrap_or(1);

    if let Some(term) = matches.get_one::<String>("search") {
        let mut query = SearchQuery::new(term.as_str()).page(page).page_size(page_size);
        if let Some(columns) = matches.get_one::<String>("columns") {
            query = query.in_columns(parse_indexes(columns)?);
        }

        let mut session = SearchSession::new();
        let found = session.query(&result, &query).await?;
        print_rows(&found.columns, &found.rows, result.delimiter)?;
        eprintln!(
            "Search '{}': page {}/{} ({} records)",
            found.search_term, found.page, found.total_pages, found.total_records
        );
    } else if let Some(lines) = matches.get_one::<String>("lines") {
        let selection = LineSelection::parse(lines)?;
        if selection.is_empty() {
            anyhow::bail!("Could not parse lines input: {lines}");
        }
        let view = view_lines(&result, &selection);
        print_rows(&view.columns, &view.rows, result.delimiter)?;
        eprintln!("Records {}", view.total_records);
    } else {
        let view = view_page(&result, page, page_size)?;
        print_rows(&view.columns, &view.rows, result.delimiter)?;
        eprintln!(
            "Page {}/{} ({} records)",
            view.page, view.total_pages, view.total_records
        );
    }

    Ok(())
}

/// Resolve reader settings: flags, then the previous selection, then config
fn reader_settings(
    matches: &ArgMatches,
    config: &AppConfig,
    previous: Option<&FileSelection>,
) -> Result<ReaderSettings> {
    let delimiter = match (matches.get_one::<String>("delimiter"), previous) {
        (Some(delimiter), _) => parse_delimiter(delimiter)?,
        (None, Some(previous)) => parse_delimiter(&previous.delimiter)?,
        (None, None) => anyhow::bail!("--delimiter is required for files not opened before"),
    };
    let encoding = match matches.get_one::<String>("encoding") {
        Some(encoding) => encoding.parse::<TextEncoding>()?,
        None => previous.map(|p| p.encoding).unwrap_or_default(),
    };

    let mut settings = config.reader_settings(delimiter, encoding);
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        let queue_capacity = config.reader.queue_capacity.unwrap_or(workers * 4);
        settings = settings
            .with_worker_count(workers)
            .with_queue_capacity(queue_capacity);
    }
    if let Some(&batch) = matches.get_one::<usize>("batch-size") {
        settings = settings.with_lines_batch_size(batch);
    }
    if let Some(&megabytes) = matches.get_one::<usize>("buffer-mb") {
        settings = settings.with_buffer_size_mb(megabytes);
    }
    Ok(settings)
}

async fn find_previous(store: &SettingsStore, path: &Path) -> Option<FileSelection> {
    match store.previous_selections().await {
        Ok(selections) => selections.into_iter().find(|s| s.full_name == path),
        Err(e) => {
            log::warn!("Could not read previous selections: {e}");
            None
        }
    }
}

async fn apply_column_settings(
    matches: &ArgMatches,
    store: &SettingsStore,
    result: &mut IngestionResult,
) -> Result<()> {
    if matches.get_flag("reset-settings") {
        store.reset_columns(result).await?;
    } else {
        match store.apply_stored_columns(result).await {
            Ok(true) => log::info!("Applied stored column settings"),
            Ok(false) => {}
            Err(e) => log::warn!("Ignoring stored column settings: {e}"),
        }
    }

    if let Some(select) = matches.get_one::<String>("select") {
        result.columns.select_output(&parse_indexes(select)?)?;
    }
    if let Some(&order_by) = matches.get_one::<usize>("order-by") {
        result.columns.set_order_by(Some(order_by))?;
    }

    if matches.get_flag("store-settings") {
        let path = store.store_columns(result).await?;
        eprintln!("Settings stored: {}", path.display());
    }
    Ok(())
}

async fn print_history(store: &SettingsStore) -> Result<()> {
    let selections = store.previous_selections().await?;
    if selections.is_empty() {
        eprintln!("No existing files found in {}", store.root().display());
    }
    for selection in selections {
        println!(
            "{} (delimiter '{}', {})",
            selection.full_name.display(),
            selection.delimiter,
            selection.encoding
        );
    }
    Ok(())
}

fn print_rows(columns: &[ColumnDescriptor], rows: &[Row], delimiter: u8) -> Result<()> {
    let separator = char::from(delimiter).to_string();
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let header: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    writeln!(out, "{}", header.join(separator.as_str()))?;
    for row in rows {
        writeln!(out, "{}", row.join(separator.as_str()))?;
    }
    out.flush()?;
    Ok(())
}

fn parse_indexes(input: &str) -> Result<Vec<usize>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .with_context(|| format!("Invalid column index '{part}'"))
        })
        .collect()
}
