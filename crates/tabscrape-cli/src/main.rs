use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use tabscrape::browser::types::LookupConfig;
use tabscrape::browser::{
    BatchOptions, BrowserSession, DEFAULT_WEBDRIVER_URL, FormLookup, SessionConfig,
};
use tabscrape::scraper::WebScraper;
use tabscrape::stats::{regress, scatter_plot};
use tabscrape::table::{Table, TableSelector};
use tabscrape::utils::{DatasetStats, dedupe_queries, parse_query_list, queries_from_table};

#[derive(Parser)]
#[command(name = "tabscrape")]
#[command(about = "Scrape HTML tables and browser-rendered lookup forms", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List every table on a page with its columns and row count
    Tables {
        #[arg(help = "URL of the page to scan")]
        url: String,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Extract one table, clean it up and optionally fit a regression
    Table {
        #[arg(help = "URL of the page holding the table")]
        url: String,

        #[arg(
            long,
            conflicts_with = "css",
            help = "Zero-based position of the table on the page [default: 0]"
        )]
        index: Option<usize>,

        #[arg(long, help = "CSS selector identifying the table")]
        css: Option<String>,

        #[arg(
            long,
            value_name = "OLD=NEW",
            value_parser = parse_rename,
            help = "Rename a column (repeatable)"
        )]
        rename: Vec<(String, String)>,

        #[arg(
            long,
            value_name = "COLUMN",
            help = "Convert a column to numbers, stripping separators (repeatable)"
        )]
        numeric: Vec<String>,

        #[arg(
            long,
            value_name = "X,Y",
            value_parser = parse_column_pair,
            help = "Fit y = a + b·x over two columns"
        )]
        regress: Option<(String, String)>,

        #[arg(long, requires = "regress", help = "Draw a scatter plot of the regression columns")]
        plot: bool,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Drive a search form in a browser for each query and collect the results
    Lookup {
        #[arg(long, value_name = "FILE", help = "JSON file describing the form")]
        config: PathBuf,

        #[arg(long, help = "Query term to look up (repeatable)")]
        query: Vec<String>,

        #[arg(long, value_name = "FILE", help = "File with one query term per line")]
        queries_file: Option<PathBuf>,

        #[arg(
            long,
            value_name = "URL",
            requires = "queries_column",
            help = "Scrape query terms from a table on this page"
        )]
        queries_url: Option<String>,

        #[arg(long, value_name = "COLUMN", requires = "queries_url", help = "Column holding the query terms")]
        queries_column: Option<String>,

        #[arg(
            long,
            requires = "queries_url",
            conflicts_with = "queries_css",
            help = "Position of the table holding the query terms [default: 0]"
        )]
        queries_index: Option<usize>,

        #[arg(
            long,
            value_name = "SELECTOR",
            requires = "queries_url",
            help = "CSS selector of the table holding the query terms"
        )]
        queries_css: Option<String>,

        #[arg(long, default_value = DEFAULT_WEBDRIVER_URL, help = "WebDriver server URL")]
        webdriver: String,

        #[arg(long, help = "Run the browser without a window")]
        headless: bool,

        #[arg(long, value_name = "MS", help = "Pause between queries, overrides the config")]
        delay_ms: Option<u64>,

        #[arg(long, help = "Log failed queries and continue instead of aborting")]
        keep_going: bool,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_rename(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((old, new)) if !old.trim().is_empty() && !new.trim().is_empty() => {
            Ok((old.trim().to_string(), new.trim().to_string()))
        }
        _ => Err(format!("Expected OLD=NEW, got '{}'", s)),
    }
}

fn parse_column_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((x, y)) if !x.trim().is_empty() && !y.trim().is_empty() => {
            Ok((x.trim().to_string(), y.trim().to_string()))
        }
        _ => Err(format!("Expected X,Y column names, got '{}'", s)),
    }
}

fn table_selector(index: Option<usize>, css: Option<String>) -> TableSelector {
    match css {
        Some(css) => TableSelector::Css(css),
        None => TableSelector::Index(index.unwrap_or(0)),
    }
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn table_summary(tables: &[Table]) -> Vec<serde_json::Value> {
    tables
        .iter()
        .enumerate()
        .map(|(i, t)| {
            serde_json::json!({
                "index": i,
                "columns": t.columns,
                "rows": t.len(),
            })
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Tables { url, format } => {
            let tables = scraper.fetch_tables(&url).await.unwrap_or_else(|e| {
                log::error!("Error fetching tables: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&table_summary(&tables)),
                OutputFormat::Text => {
                    if tables.is_empty() {
                        println!("No tables found.");
                    }
                    for (i, table) in tables.iter().enumerate() {
                        println!(
                            "{:>3}. {} row(s) │ {}",
                            i,
                            table.len(),
                            table.columns.join(", ")
                        );
                    }
                }
            }
        }

        Commands::Table {
            url,
            index,
            css,
            rename,
            numeric,
            regress: regress_columns,
            plot,
            format,
        } => {
            let selector = table_selector(index, css);

            let mut table = scraper
                .fetch_table(&url, &selector)
                .await
                .unwrap_or_else(|e| {
                    log::error!("Error fetching table: {}", e);
                    process::exit(1);
                });

            table.rename_columns(&rename).unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            for column in &numeric {
                let converted = table.coerce_numeric(column).unwrap_or_else(|e| {
                    log::error!("Invalid args: {e}");
                    process::exit(1);
                });
                log::info!(
                    "Column '{}': {} of {} cell(s) numeric",
                    column,
                    converted,
                    table.len()
                );
            }

            let regression = regress_columns.as_ref().map(|(x, y)| {
                let column = |name: &str| {
                    table.numeric_column(name).unwrap_or_else(|e| {
                        log::error!("Invalid args: {e}");
                        process::exit(1);
                    })
                };
                let (xs, ys) = (column(x.as_str()), column(y.as_str()));
                let summary = regress(&xs, &ys).unwrap_or_else(|e| {
                    log::error!("Regression failed: {}", e);
                    process::exit(1);
                });
                (summary, xs, ys)
            });

            match format {
                OutputFormat::Json => serialize_json(&serde_json::json!({
                    "columns": table.columns,
                    "rows": table.records(),
                    "regression": regression.as_ref().map(|(summary, _, _)| summary),
                })),
                OutputFormat::Text => {
                    println!("{}", table);
                    if let Some((summary, xs, ys)) = &regression {
                        println!("\n{}", summary);
                        if plot {
                            println!("\n{}", scatter_plot(xs, ys, 60, 20));
                        }
                    }
                }
            }
        }

        Commands::Lookup {
            config,
            query,
            queries_file,
            queries_url,
            queries_column,
            queries_index,
            queries_css,
            webdriver,
            headless,
            delay_ms,
            keep_going,
            format,
        } => {
            let config = LookupConfig::from_path(&config).unwrap_or_else(|e| {
                log::error!("Error loading {}: {}", config.display(), e);
                process::exit(1);
            });

            let mut queries = query;

            if let Some(path) = queries_file {
                let text = std::fs::read_to_string(&path).unwrap_or_else(|e| {
                    log::error!("Error reading {}: {}", path.display(), e);
                    process::exit(1);
                });
                queries.extend(parse_query_list(&text));
            }

            if let Some(url) = queries_url
                && let Some(column) = queries_column
            {
                let table = scraper
                    .fetch_table(&url, &table_selector(queries_index, queries_css))
                    .await
                    .unwrap_or_else(|e| {
                        log::error!("Error fetching query terms: {}", e);
                        process::exit(1);
                    });
                let terms = queries_from_table(&table, &column).unwrap_or_else(|e| {
                    log::error!("Invalid args: {e}");
                    process::exit(1);
                });
                log::info!("Scraped {} query term(s) from {}", terms.len(), url);
                queries.extend(terms);
            }

            let queries = dedupe_queries(queries);
            if queries.is_empty() {
                log::error!("Invalid args: no query terms given");
                process::exit(1);
            }

            let mut options = BatchOptions::from_config(&config);
            options.keep_going = keep_going;
            if let Some(ms) = delay_ms {
                options.delay = Duration::from_millis(ms);
            }

            let lookup = FormLookup::new(config).unwrap_or_else(|e| {
                log::error!("Invalid config: {}", e);
                process::exit(1);
            });

            let session = BrowserSession::connect(&SessionConfig {
                webdriver_url: webdriver,
                headless,
            })
            .await
            .unwrap_or_else(|e| {
                log::error!("Error starting browser: {}", e);
                process::exit(1);
            });

            let result = lookup.lookup_all(&session, &queries, &options).await;

            if let Err(e) = session.close().await {
                log::warn!("Failed to close browser session: {}", e);
            }

            let dataset = result.unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&dataset),
                OutputFormat::Text => {
                    if dataset.records.is_empty() {
                        println!("No results to display.");
                    } else {
                        print!("{}", dataset);
                    }
                    print!("{}", DatasetStats::from_dataset(&dataset));
                }
            }
        }
    }
}
