//! Error kinds for month parsing, range validation, page fetching and page parsing

use reqwest::StatusCode;
use thiserror::Error;

use crate::month::MonthCode;

/// Longest slice of a response body quoted in a [`FetchError::Status`] message.
const BODY_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid month '{0}'. Expected YYYYMM, e.g. 201808")]
pub struct MonthFormatError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("End month {end} is earlier than begin month {begin}")]
    EndBeforeBegin { begin: MonthCode, end: MonthCode },

    #[error("Begin month {begin} is earlier than {floor}, the first month with records")]
    BeforeFloor { begin: MonthCode, floor: MonthCode },

    #[error("End month {end} is later than the current month {current}")]
    AfterCurrent { end: MonthCode, current: MonthCode },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned {status}: {}", snippet(.body))]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Page has no <table>")]
    MissingTable,

    #[error("Row {row} has {found} cells, expected 4")]
    MissingCells { row: usize, found: usize },

    #[error("Row {row} has no link in its date cell")]
    MissingDateLink { row: usize },

    #[error("Row {row} temperature '{text}' is not of the form <high>℃/<low>℃")]
    BadTemperature { row: usize, text: String },
}

fn snippet(body: &str) -> String {
    if body.chars().count() <= BODY_SNIPPET_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
    format!("{}...", cut)
}
