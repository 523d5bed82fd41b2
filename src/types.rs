//! Daily weather record type

/// One day's observation as listed on a month page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRecord {
    /// Date exactly as the source formats it
    pub date: String,
    pub status: String,
    /// Daily high in °C
    pub high_temp: i32,
    /// Daily low in °C
    pub low_temp: i32,
    pub wind: String,
}
