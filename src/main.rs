mod batch;
mod cleaner;
mod config;
mod date;
mod error;
mod fetch;
mod frontier;
mod page;
mod pipeline;
mod store;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use regex::Regex;
use tracing::info;

use crate::batch::Batch;
use crate::cleaner::Cleaner;
use crate::config::Settings;
use crate::fetch::HttpFetcher;
use crate::frontier::Frontier;
use crate::pipeline::Pipeline;
use crate::store::Inserter;

static FILE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}").unwrap());

#[derive(Parser)]
#[command(name = "ct_pd_scraper", about = "Police blotter scraper for rep-am.com")]
struct Cli {
    /// Settings file (TOML); CTPD_* environment variables override it
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape new blotters, clean them and insert the records
    Run,
    /// Create the database schema
    Init,
    /// Clean a saved fragment file (.json or .txt) into clean_<name>.json
    Clean {
        file: PathBuf,
        /// basic or detailed (default: cleaning.cleaner)
        #[arg(short, long)]
        cleaner: Option<String>,
    },
    /// Insert a cleaned JSON batch
    Load {
        file: PathBuf,
        /// Posted date, e.g. "March 27, 2020" (default: from file name or batch)
        #[arg(short, long)]
        date: Option<String>,
        /// Police department city (default: from batch or "Unknown")
        #[arg(short, long)]
        city: Option<String>,
    },
    /// Show frontier size and row counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {:?}", cli.config))?;

    let result = match cli.command {
        Commands::Run => {
            let cleaner: Cleaner = settings.cleaning.cleaner.parse()?;
            let backend = store::get_backend(&settings.database, &settings.data.path)?;
            let frontier = Frontier::load(&settings.link_file())?;
            let mut pipeline = Pipeline::new(
                HttpFetcher::new(&settings)?,
                Inserter::new(backend),
                cleaner,
                frontier,
                &settings.session.base_url,
                settings.session.delay(),
            )?;
            let report = pipeline.run().await?;
            println!(
                "Done: {} links found, {} new, {} records inserted.",
                report.discovered, report.ingested, report.records
            );
            Ok(())
        }
        Commands::Init => {
            let mut inserter = Inserter::new(store::get_backend(
                &settings.database,
                &settings.data.path,
            )?);
            inserter.init_schema().await?;
            println!("Schema ready ({})", inserter.kind());
            Ok(())
        }
        Commands::Clean { file, cleaner } => {
            let cleaner: Cleaner = cleaner
                .as_deref()
                .unwrap_or(&settings.cleaning.cleaner)
                .parse()?;
            let fragments = crate::cleaner::load_fragments(&file)?;
            let batch = cleaner.clean(&fragments);
            let out = clean_path(&file);
            std::fs::write(&out, serde_json::to_string_pretty(&batch.to_json()?)?)
                .with_context(|| format!("writing {:?}", out))?;
            info!(cleaner = %cleaner, records = batch.len(), "cleaned {:?}", file);
            println!("{}", out.display());
            Ok(())
        }
        Commands::Load { file, date, city } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {:?}", file))?;
            let batch = Batch::from_json(serde_json::from_str(&text)?)?;
            let date = date.or_else(|| date_from_file_name(&file));
            let mut inserter = Inserter::new(store::get_backend(
                &settings.database,
                &settings.data.path,
            )?);
            let n = inserter
                .insert_scoped(&batch, date.as_deref(), city.as_deref())
                .await?;
            println!("Inserted {} records from {:?}", n, file);
            Ok(())
        }
        Commands::Stats => {
            let frontier = Frontier::load(&settings.link_file())?;
            let mut inserter = Inserter::new(store::get_backend(
                &settings.database,
                &settings.data.path,
            )?);
            let counts = inserter.counts().await?;
            println!("Scraped links: {}", frontier.len());
            println!("Persons:       {}", counts.person);
            println!("Contents:      {}", counts.content);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `dirty/2020-3-27.json` → `dirty/clean_2020-3-27.json`
fn clean_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.with_file_name(format!("clean_{}.json", stem))
}

/// A `YYYY-M-D` date in the file name, in the natural form the normalizer reads.
fn date_from_file_name(file: &Path) -> Option<String> {
    let name = file.file_name()?.to_string_lossy();
    let m = FILE_DATE.find(&name)?;
    let day = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()?;
    Some(date::to_natural(day))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
