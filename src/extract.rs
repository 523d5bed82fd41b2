//! Month page parsing
//!
//! A month page carries one data table. The first row is the header; every
//! following row is one day laid out as date link, weather, `高℃/低℃`, wind.

use encoding_rs::{Encoding, GBK};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;

use crate::error::ParseError;
use crate::types::WeatherRecord;

/// How far into the page to look for a `charset=` declaration
const CHARSET_SNIFF_BYTES: usize = 1024;

/// Parse one month page into its daily records, in table order.
pub fn extract(html: &[u8]) -> Result<Vec<WeatherRecord>, ParseError> {
    let text = decode_page(html);
    let document = Html::parse_document(&text);

    let table = document
        .select(&selector("table"))
        .next()
        .ok_or(ParseError::MissingTable)?;

    let tr = selector("tr");
    let td = selector("td");
    let a = selector("a");

    table
        .select(&tr)
        .enumerate()
        .skip(1)
        .map(|(row, element)| extract_row(row, element, &td, &a))
        .collect()
}

fn extract_row(
    row: usize,
    tr: ElementRef<'_>,
    td: &Selector,
    a: &Selector,
) -> Result<WeatherRecord, ParseError> {
    let cells: Vec<ElementRef<'_>> = tr.select(td).collect();
    if cells.len() < 4 {
        return Err(ParseError::MissingCells {
            row,
            found: cells.len(),
        });
    }

    let date_link = cells[0]
        .select(a)
        .next()
        .ok_or(ParseError::MissingDateLink { row })?;
    let (high_temp, low_temp) = parse_temperatures(row, &cell_text(cells[2]))?;

    Ok(WeatherRecord {
        date: strip_white(&cell_text(date_link)),
        status: strip_white(&cell_text(cells[1])),
        high_temp,
        low_temp,
        wind: strip_white(&cell_text(cells[3])),
    })
}

/// Split a `32℃/24℃` cell into (high, low).
fn parse_temperatures(row: usize, raw: &str) -> Result<(i32, i32), ParseError> {
    let text = strip_white(raw);
    let bad = || ParseError::BadTemperature {
        row,
        text: text.clone(),
    };

    let (high, low) = text.split_once('/').ok_or_else(bad)?;
    if low.contains('/') {
        return Err(bad());
    }
    let degrees = |s: &str| s.trim_matches('℃').parse::<i32>().map_err(|_| bad());
    Ok((degrees(high)?, degrees(low)?))
}

/// Drop every space, CR and LF, including ones inside the text.
fn strip_white(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r'))
        .collect()
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Pages are served as UTF-8 or in the charset their `<meta>` declares;
/// undeclared non-UTF-8 pages are taken to be GBK.
fn decode_page(html: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(html) {
        return Cow::Borrowed(text);
    }
    let encoding = declared_charset(html).unwrap_or(GBK);
    let (text, _, _) = encoding.decode(html);
    text
}

/// The charset of the first `<meta>` tag that declares one, either as
/// `<meta charset=..>` or inside `content="text/html; charset=.."`.
fn declared_charset(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(CHARSET_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    head.match_indices("<meta")
        .filter_map(|(start, _)| {
            let tag = &head[start..];
            let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
            charset_label(tag)
        })
        .find_map(|label| Encoding::for_label(label.as_bytes()))
}

fn charset_label(tag: &str) -> Option<String> {
    let start = tag.find("charset=")? + "charset=".len();
    let label: String = tag[start..]
        .chars()
        .skip_while(|c| *c == '"' || *c == '\'')
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    Some(label)
}
