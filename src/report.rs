//! Excel output: one data sheet plus a high/low temperature line chart

use rust_xlsxwriter::{
    Chart, ChartFormat, ChartLine, ChartType, Color, ColNum, RowNum, Workbook, XlsxError,
};
use std::path::Path;

use crate::types::WeatherRecord;

pub const SHEET_NAME: &str = "Sheet1";
pub const HEADERS: [&str; 5] = ["日期", "天气", "高温", "低温", "风向"];

const DATE_COL: ColNum = 0;
const HIGH_COL: ColNum = 2;
const LOW_COL: ColNum = 3;

const CHART_TITLE: &str = "最高温与最低温折线图";
const X_AXIS_NAME: &str = "日期";
const Y_AXIS_NAME: &str = "气温（单位：℃）";
const HIGH_COLOR: u32 = 0xFF0000;
const LOW_COLOR: u32 = 0x0000FF;

// Excel's default chart size is 480x288 pixels; the report chart is twice that
const CHART_WIDTH: u32 = 480 * 2;
const CHART_HEIGHT: u32 = 288 * 2;

/// Cell J10
const CHART_ANCHOR: (RowNum, ColNum) = (9, 9);

#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(i32),
}

/// One chart line: the header cell naming it and the column it plots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLayout {
    pub name_cell: (RowNum, ColNum),
    pub values_col: ColNum,
    pub color: u32,
}

/// Where the chart reads its data from. Data rows are `first_row..=last_row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLayout {
    pub first_row: RowNum,
    pub last_row: RowNum,
    pub categories_col: ColNum,
    pub series: Vec<SeriesLayout>,
}

/// Everything that ends up in the workbook, before any xlsx is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout<'a> {
    pub rows: Vec<Vec<Cell<'a>>>,
    pub chart: Option<ChartLayout>,
}

impl<'a> ReportLayout<'a> {
    pub fn new(records: &'a [WeatherRecord]) -> Self {
        let header: Vec<Cell<'a>> = HEADERS.iter().map(|label| Cell::Text(label)).collect();
        let rows = std::iter::once(header)
            .chain(records.iter().map(record_cells))
            .collect();

        Self {
            rows,
            chart: chart_layout(records.len()),
        }
    }
}

fn record_cells(record: &WeatherRecord) -> Vec<Cell<'_>> {
    vec![
        Cell::Text(&record.date),
        Cell::Text(&record.status),
        Cell::Number(record.high_temp),
        Cell::Number(record.low_temp),
        Cell::Text(&record.wind),
    ]
}

/// No chart for an empty report, there is no range to plot.
fn chart_layout(record_count: usize) -> Option<ChartLayout> {
    if record_count == 0 {
        return None;
    }
    Some(ChartLayout {
        first_row: 1,
        last_row: RowNum::try_from(record_count).unwrap_or(RowNum::MAX),
        categories_col: DATE_COL,
        series: vec![
            SeriesLayout {
                name_cell: (0, HIGH_COL),
                values_col: HIGH_COL,
                color: HIGH_COLOR,
            },
            SeriesLayout {
                name_cell: (0, LOW_COL),
                values_col: LOW_COL,
                color: LOW_COLOR,
            },
        ],
    })
}

fn build_chart(layout: &ChartLayout) -> Chart {
    let mut chart = Chart::new(ChartType::Line);
    for series in &layout.series {
        chart
            .add_series()
            .set_name((SHEET_NAME, series.name_cell.0, series.name_cell.1))
            .set_categories((
                SHEET_NAME,
                layout.first_row,
                layout.categories_col,
                layout.last_row,
                layout.categories_col,
            ))
            .set_values((
                SHEET_NAME,
                layout.first_row,
                series.values_col,
                layout.last_row,
                series.values_col,
            ))
            .set_format(
                ChartFormat::new().set_line(ChartLine::new().set_color(Color::RGB(series.color))),
            );
    }
    chart.title().set_name(CHART_TITLE);
    chart.x_axis().set_name(X_AXIS_NAME);
    chart.y_axis().set_name(Y_AXIS_NAME);
    chart.set_width(CHART_WIDTH).set_height(CHART_HEIGHT);
    chart
}

/// Write `records` to a new workbook at `path`, replacing any existing file.
pub fn write_report(records: &[WeatherRecord], path: &Path) -> Result<(), XlsxError> {
    let layout = ReportLayout::new(records);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (row, cells) in layout.rows.iter().enumerate() {
        let row = RowNum::try_from(row).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, cell) in cells.iter().enumerate() {
            let col = ColNum::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;
            match cell {
                Cell::Text(text) => worksheet.write_string(row, col, *text)?,
                Cell::Number(value) => worksheet.write_number(row, col, *value)?,
            };
        }
    }

    if let Some(chart_layout) = &layout.chart {
        let chart = build_chart(chart_layout);
        worksheet.insert_chart(CHART_ANCHOR.0, CHART_ANCHOR.1, &chart)?;
    }

    workbook.save(path)
}
