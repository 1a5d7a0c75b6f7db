use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::geos::geocoder_from_settings;
use crate::pipeline::{process_websites, retry_errors, PipelineContext, RetryPolicy};
use crate::store::{latest_error_file, load_websites, CsvStore, Sink};

mod agents;
mod config;
mod domain;
mod errors;
mod geos;
mod logging;
mod pipeline;
mod scraper;
mod spreadsheets;
mod store;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "room_scraper", about = "Scrape room and rental listings into CSV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over every site in the websites file
    Run {
        /// Websites CSV (default: WEBSITES_CSV)
        #[arg(short, long)]
        websites: Option<PathBuf>,
    },
    /// Retry the rows of an errors file
    Retry {
        /// Errors CSV (default: newest errors file in RESULTS_DIR)
        #[arg(short, long)]
        errors: Option<PathBuf>,
    },
    /// Fill in location columns for results without coordinates
    Geocode {
        /// Max rows to geocode (default: MAX_ADDRESS_ROWS)
        #[arg(short = 'n', long)]
        max_rows: Option<usize>,
    },
    /// Write the results file to an xlsx workbook
    Export {
        #[arg(short, long, default_value = "results/listings.xlsx")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env().context("reading configuration")?;
    let _log_guard = logging::init_logging(&settings.log_dir, &settings.log_file)?;

    match cli.command {
        Commands::Run { websites } => {
            let path = websites.unwrap_or_else(|| settings.websites_csv.clone());
            let sites = load_websites(&path)?;
            if sites.is_empty() {
                println!("No websites found in {}.", path.display());
                return Ok(());
            }

            let ctx = PipelineContext::from_settings(&settings)?;
            let summary = process_websites(&ctx, &sites, settings.max_workers)?;
            println!(
                "Processed {} websites ({} succeeded, {} failed).",
                summary.total, summary.succeeded, summary.failed
            );
        }
        Commands::Retry { errors } => {
            let path = errors.unwrap_or_else(|| latest_error_file(&settings.results_dir));
            info!(path = %path.display(), "Using errors file");

            let ctx = PipelineContext::from_settings(&settings)?;
            let policy = RetryPolicy::from(&settings);
            let report = retry_errors(&ctx, &path, &policy, settings.max_workers)?;

            for result in &report.results {
                let mark = if result.success { "ok" } else { "failed" };
                println!("[{mark}] {}: {}", result.url, result.note);
            }
            println!(
                "Retry finished: {} of {} rows recovered.",
                report.succeeded, report.total
            );
        }
        Commands::Geocode { max_rows } => {
            let store = CsvStore::new(&settings.results_dir);
            let geocoder = geocoder_from_settings(&settings)?;
            let limit = max_rows.unwrap_or(settings.max_address_rows);
            let updated = geos::backfill(&store, geocoder.as_ref(), limit)?;
            println!("Geocoded {updated} rows.");
        }
        Commands::Export { output } => {
            let store = CsvStore::new(&settings.results_dir);
            let records = store.load(Sink::Success)?;
            spreadsheets::export_listings_xlsx(&records, &output)?;
            println!("Exported {} rows to {}.", records.len(), output.display());
        }
    }

    Ok(())
}
