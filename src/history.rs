//! Month range validation and the fetch/extract loop

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::error::RangeError;
use crate::extract::extract;
use crate::fetch::WeatherFetcher;
use crate::month::MonthCode;
use crate::report::write_report;
use crate::types::WeatherRecord;
use crate::utils::osc8_link;
use crate::FLOOR_MONTH;

/// One scrape: a city and an inclusive month range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub city: String,
    pub begin: MonthCode,
    pub end: MonthCode,
}

impl HistoryRequest {
    /// `{city}-{begin}-{end}.xlsx`
    pub fn default_file_name(&self) -> String {
        format!("{}-{}-{}.xlsx", self.city, self.begin, self.end)
    }

    pub fn months(&self) -> impl Iterator<Item = MonthCode> {
        MonthCode::range_inclusive(self.begin, self.end)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Pause after each month fetch
    pub delay: Duration,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CityUnavailable,
    Written { path: PathBuf, records: usize },
}

/// Check `begin..=end` is ordered and inside `[FLOOR_MONTH, current]`.
pub fn validate_range(begin: MonthCode, end: MonthCode, current: MonthCode) -> Result<(), RangeError> {
    if begin > end {
        return Err(RangeError::EndBeforeBegin { begin, end });
    }
    if begin < FLOOR_MONTH {
        return Err(RangeError::BeforeFloor {
            begin,
            floor: FLOOR_MONTH,
        });
    }
    if end > current {
        return Err(RangeError::AfterCurrent { end, current });
    }
    Ok(())
}

/// Fetch every month of `request`, then write all records to `output`.
///
/// Nothing is written unless every month was fetched and parsed.
pub fn run(
    fetcher: &WeatherFetcher,
    request: &HistoryRequest,
    output: &Path,
    options: RunOptions,
) -> Result<Outcome> {
    if !fetcher.city_is_available(&request.city) {
        return Ok(Outcome::CityUnavailable);
    }
    if !options.quiet {
        println!("Looking up weather history for {}...", request.city);
    }

    let records = collect_records(fetcher, request, options)?;

    write_report(&records, output)
        .with_context(|| format!("Failed to write report: {}", output.display()))?;
    info!(path = %output.display(), records = records.len(), "report written");

    Ok(Outcome::Written {
        path: output.to_path_buf(),
        records: records.len(),
    })
}

fn collect_records(
    fetcher: &WeatherFetcher,
    request: &HistoryRequest,
    options: RunOptions,
) -> Result<Vec<WeatherRecord>> {
    let mut records = Vec::new();

    for month in request.months() {
        let url = fetcher.month_url(&request.city, month);
        if !options.quiet {
            println!("Fetching {} from {}", month, osc8_link(&url, &url));
        }

        let html = fetcher
            .fetch_month(&request.city, month)
            .with_context(|| format!("Failed to fetch {} for {}", month, request.city))?;
        let days = extract(&html).with_context(|| format!("Failed to parse {}", url))?;

        if !options.quiet {
            println!("  {} days", days.len());
        }
        records.extend(days);

        if !options.quiet {
            println!("Sleeping {}s...", options.delay.as_secs_f64());
        }
        thread::sleep(options.delay);
    }

    Ok(records)
}
