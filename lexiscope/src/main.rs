//! lexiscope - text-usage analytics from the command line
//!
//! Commands:
//! - `status`: single handshake against the store
//! - `charts`: list the chart catalog
//! - `chart <name>`: compute a chart (server-wide, plus one user with `--user`)
//! - `ingest words|messages <file>`: append JSON-lines records
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/lexiscope/config.toml (~/.config/lexiscope/config.toml)
//! - Logs: $XDG_STATE_HOME/lexiscope/ (~/.local/state/lexiscope/)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lexiscope_core::charts::{self, list_charts, ChartOutcome, ChartRequest, ParamBag};
use lexiscope_core::plan::Table;
use lexiscope_core::{ChartResult, Config, MessageEvent, Point, Store, WordEvent};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lexiscope")]
#[command(about = "Text-usage analytics over word and message event logs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the store answers (no retry)
    Status,

    /// List available charts and their parameters
    Charts,

    /// Compute a chart
    Chart {
        /// Chart name (see `lexiscope charts`)
        name: String,

        /// Also compute the series scoped to this user id
        #[arg(short, long)]
        user: Option<String>,

        /// Chart parameter as name=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Append JSON-lines records to an event table as one batch
    Ingest {
        /// Target table
        #[arg(value_enum)]
        kind: EventKind,

        /// JSON-lines file, one record per line
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventKind {
    Words,
    Messages,
}

fn parse_param(pair: &str) -> std::result::Result<(String, String), String> {
    ParamBag::parse_pair(pair).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Listing the catalog needs neither config nor store.
    if matches!(args.command, Command::Charts) {
        cmd_charts();
        return Ok(());
    }

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        lexiscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    match args.command {
        Command::Charts => Ok(()),
        Command::Status => runtime.block_on(cmd_status(&config)),
        Command::Chart {
            name,
            user,
            params,
            format,
        } => {
            let mut bag: ParamBag = params.into_iter().collect();
            if let Some(user) = user {
                bag.insert("userId", user);
            }
            // Reject bad input before touching the store.
            let request = ChartRequest::parse(&name, &bag)?;
            runtime.block_on(cmd_chart(&config, &request, format))
        }
        Command::Ingest { kind, file } => runtime.block_on(cmd_ingest(&config, kind, &file)),
    }
}

fn cmd_charts() {
    for chart in list_charts() {
        println!("{:<24} {}", chart.name, chart.summary);
        if !chart.parameters.is_empty() {
            println!("{:<24} params: {}", "", chart.parameters.join(", "));
        }
    }
}

async fn cmd_status(config: &Config) -> Result<()> {
    let store = Store::from_config(&config.store)?;

    println!("Store:    {}", config.store.url);
    println!("Database: {}", config.store.database);
    println!("Config:   {}", Config::config_path().display());
    println!("Logs:     {}", Config::log_path().display());

    match store.ping().await {
        Ok(()) => {
            println!("Status:   online");
            Ok(())
        }
        Err(e) => {
            println!("Status:   offline");
            bail!("store did not answer: {}", e)
        }
    }
}

async fn cmd_chart(config: &Config, request: &ChartRequest, format: Format) -> Result<()> {
    let store = Store::from_config(&config.store)?;
    store.connect().await;

    match ChartOutcome::from(charts::compute(&store, request).await) {
        ChartOutcome::Ok(result) => {
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Text => print_text(&result),
            }
            Ok(())
        }
        ChartOutcome::NotFound(name) => bail!("chart not found: {}", name),
        ChartOutcome::Invalid { name, message } => bail!("invalid parameter {}: {}", name, message),
        ChartOutcome::Failed(message) => bail!("chart failed: {}", message),
    }
}

fn print_text(result: &ChartResult) {
    fn print_series(title: &str, points: &[Point]) {
        println!("{}", title);
        for point in points {
            match &point.bucket {
                Some(bucket) => println!("  {}\t{}\t{}", bucket, point.x, point.y),
                None => println!("  {}\t{}", point.x, point.y),
            }
        }
    }

    print_series("server", &result.server_series);
    if let Some(user) = &result.user_series {
        print_series("user", user);
    }
    println!("elapsed: {:.3} ms", result.elapsed_ms);
}

/// Parse a JSON-lines file, skipping blank lines.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid record", path.display(), i + 1))
        })
        .collect()
}

async fn cmd_ingest(config: &Config, kind: EventKind, file: &Path) -> Result<()> {
    match kind {
        EventKind::Words => {
            let records: Vec<WordEvent> = read_records(file)?;
            ingest(config, Table::Word, &records).await
        }
        EventKind::Messages => {
            let records: Vec<MessageEvent> = read_records(file)?;
            ingest(config, Table::Message, &records).await
        }
    }
}

async fn ingest<S: serde::Serialize>(config: &Config, table: Table, records: &[S]) -> Result<()> {
    if records.is_empty() {
        println!("No records to insert");
        return Ok(());
    }

    let store = Store::from_config(&config.store)?;
    store.connect().await;
    store
        .insert(table, records)
        .await
        .with_context(|| format!("failed to insert into {}", table.sql()))?;

    tracing::info!(table = %table.sql(), records = records.len(), "Ingest complete");
    println!("Inserted {} records into {}", records.len(), table.sql());
    Ok(())
}
