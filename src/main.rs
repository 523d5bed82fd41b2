use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod extract;
mod fetch;
mod history;
mod month;
mod report;
#[cfg(test)]
mod test_support;
mod types;
mod utils;

use fetch::{FetcherConfig, WeatherFetcher};
use history::{HistoryRequest, Outcome, RunOptions};
use month::MonthCode;
use utils::osc8_file_link;

pub const DEFAULT_SERVER: &str = "http://www.tianqihoubao.com";
/// Earliest month the site has records for
pub const FLOOR_MONTH: MonthCode = MonthCode::new_const(2011, 1);
pub const REQUEST_DELAY_SECS: u64 = 1;
pub const PAGE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Parser)]
#[command(name = "weather-history", version)]
#[command(about = "Scrape daily weather history for a city into an Excel sheet with a temperature chart")]
#[command(after_help = "Example: weather-history beijing 201808 201809")]
struct Cli {
    /// City slug as used in the site's URLs (e.g. "beijing")
    city: String,
    /// First month to fetch, YYYYMM
    begin: MonthCode,
    /// Last month to fetch, YYYYMM. Defaults to BEGIN
    end: Option<MonthCode>,
    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
    /// Output file. Defaults to {city}-{begin}-{end}.xlsx
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Base URL of the weather history site
    #[arg(long, value_name = "URL", default_value = DEFAULT_SERVER)]
    server: String,
    /// Seconds to wait between month requests
    #[arg(long, value_name = "SECS", default_value_t = REQUEST_DELAY_SECS)]
    delay: u64,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "weather_history=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    // Usage problems are reported, not treated as a failed run
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(());
        }
    };

    let request = HistoryRequest {
        begin: cli.begin,
        end: cli.end.unwrap_or(cli.begin),
        city: cli.city,
    };
    if let Err(err) = history::validate_range(request.begin, request.end, MonthCode::current()) {
        println!("{}", err);
        return Ok(());
    }

    let config = FetcherConfig::browser(&cli.server, Duration::from_secs(PAGE_TIMEOUT_SECS))?;
    let fetcher = WeatherFetcher::new(config)?;
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(request.default_file_name()));
    let options = RunOptions {
        delay: Duration::from_secs(cli.delay),
        quiet: cli.quiet,
    };

    match history::run(&fetcher, &request, &output, options)? {
        Outcome::CityUnavailable => {
            println!("No weather history found for city {}.", request.city);
        }
        Outcome::Written { path, records } => {
            println!("Wrote {} days to {}", records, osc8_file_link(&path));
        }
    }

    Ok(())
}
