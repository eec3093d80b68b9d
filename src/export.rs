//! Spreadsheet export of the record table and of the seasonal statistics, and the reader
//! used to load an exported record sheet back.

use crate::config::{RECORDS_SHEET_NAME, SEASONAL_SHEET_NAME};
use crate::metrics::{SeasonalStatistics, Statistic};
use crate::records::{get_column, get_f64_column, get_str_column, RecordError};
use crate::types::metric::RecordColumn;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};
use log::info;
use polars::prelude::*;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use std::io::Cursor;
use thiserror::Error;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const SEASON_HEADER: &str = "season";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write spreadsheet")]
    Write(#[from] XlsxError),

    #[error("Failed to read spreadsheet")]
    Read(#[from] calamine::XlsxError),

    #[error(transparent)]
    Column(#[from] RecordError),

    #[error("Column '{0}' not found in sheet header")]
    MissingHeader(String),

    #[error("Unexpected value {value:?} in column '{column}' at row {row}")]
    CellType {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Failed to build DataFrame from sheet")]
    Build(#[source] PolarsError),
}

/// Values of one column of the record frame, ready to be written.
enum ColumnCells<'a> {
    Dates(Vec<Option<NaiveDate>>),
    Text(&'a StringChunked),
    Numbers(&'a Float64Chunked),
}

fn column_cells<'a>(df: &'a DataFrame, column: RecordColumn) -> Result<ColumnCells<'a>, ExportError> {
    let name = column.column_name();
    Ok(match column {
        RecordColumn::Date => {
            let dates = get_column(df, name)?
                .date()
                .map_err(|e| RecordError::ColumnType {
                    column: name.to_string(),
                    source: e,
                })?;
            ColumnCells::Dates(dates.as_date_iter().collect())
        }
        RecordColumn::CityName | RecordColumn::Season => ColumnCells::Text(get_str_column(df, name)?),
        RecordColumn::Metric(_) => ColumnCells::Numbers(get_f64_column(df, name)?),
    })
}

fn write_date(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    date: NaiveDate,
    format: &Format,
) -> Result<(), XlsxError> {
    // Excel has no dates before 1900, those are written as ISO text.
    if date.year() < 1900 {
        sheet.write_string(row, col, date.format("%Y-%m-%d").to_string())?;
        return Ok(());
    }
    let excel_date = ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)?;
    sheet.write_datetime_with_format(row, col, &excel_date, format)?;
    Ok(())
}

/// Writes the selected columns of a record frame to a single-sheet workbook.
///
/// The sheet is named `WeatherData`; the header row holds the storage column names and
/// the columns appear in the order given. Missing values are left blank.
pub fn export_records(df: &DataFrame, columns: &[RecordColumn]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let sheet = workbook.add_worksheet();
    sheet.set_name(RECORDS_SHEET_NAME)?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, column.column_name(), &header_format)?;

        match column_cells(df, *column)? {
            ColumnCells::Dates(dates) => {
                for (row, date) in dates.into_iter().enumerate() {
                    if let Some(date) = date {
                        write_date(sheet, row as u32 + 1, col, date, &date_format)?;
                    }
                }
            }
            ColumnCells::Text(values) => {
                for (row, value) in values.into_iter().enumerate() {
                    if let Some(value) = value {
                        sheet.write_string(row as u32 + 1, col, value)?;
                    }
                }
            }
            ColumnCells::Numbers(values) => {
                for (row, value) in values.into_iter().enumerate() {
                    if let Some(value) = value {
                        sheet.write_number(row as u32 + 1, col, value)?;
                    }
                }
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;
    info!(
        "Exported {} records with {} columns ({} bytes)",
        df.height(),
        columns.len(),
        buffer.len()
    );
    Ok(buffer)
}

/// Writes a seasonal statistics table to a single-sheet workbook named
/// `Seasonal Statistics`.
///
/// The first column holds the season labels. Two header rows carry the metric (merged
/// over its four statistics) and the statistic names.
pub fn export_seasonal_statistics(table: &SeasonalStatistics) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SEASONAL_SHEET_NAME)?;

    let stats_per_metric = Statistic::ALL.len() as u16;
    sheet.write_string_with_format(1, 0, SEASON_HEADER, &header_format)?;
    for (i, metric) in table.metrics().iter().enumerate() {
        let first = 1 + i as u16 * stats_per_metric;
        sheet.merge_range(
            0,
            first,
            0,
            first + stats_per_metric - 1,
            metric.column_name(),
            &header_format,
        )?;
        for (j, statistic) in Statistic::ALL.iter().enumerate() {
            sheet.write_string_with_format(1, first + j as u16, statistic.as_str(), &header_format)?;
        }
    }

    for (i, row) in table.rows().iter().enumerate() {
        let sheet_row = 2 + i as u32;
        sheet.write_string_with_format(sheet_row, 0, row.season.as_str(), &header_format)?;
        for (j, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                sheet.write_number(sheet_row, 1 + j as u16, *value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn cell_error(column: RecordColumn, row: usize, cell: &Data) -> ExportError {
    ExportError::CellType {
        column: column.column_name().to_string(),
        row,
        value: format!("{:?}", cell),
    }
}

fn read_date(cell: &Data) -> Option<Option<NaiveDate>> {
    match cell {
        Data::Empty => Some(None),
        Data::DateTime(dt) => dt.as_datetime().map(|dt| Some(dt.date())),
        Data::DateTimeIso(s) | Data::String(s) => {
            NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d")
                .ok()
                .map(Some)
        }
        _ => None,
    }
}

fn read_text(cell: &Data) -> Option<Option<String>> {
    match cell {
        Data::Empty => Some(None),
        Data::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

fn read_number(cell: &Data) -> Option<Option<f64>> {
    match cell {
        Data::Empty => Some(None),
        Data::Float(f) => Some(Some(*f)),
        Data::Int(i) => Some(Some(*i as f64)),
        _ => None,
    }
}

/// Reads a sheet written by [`export_records`] back into a frame holding `columns`.
pub fn import_records(bytes: &[u8], columns: &[RecordColumn]) -> Result<DataFrame, ExportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range(RECORDS_SHEET_NAME)?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let body: Vec<&[Data]> = rows.collect();

    let mut frame_columns = Vec::with_capacity(columns.len());
    for &column in columns {
        let name = column.column_name();
        let index = header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExportError::MissingHeader(name.to_string()))?;
        let cells = body.iter().enumerate().map(|(row, cells)| {
            let cell = cells.get(index).unwrap_or(&Data::Empty);
            (row, cell)
        });

        let series = match column {
            RecordColumn::Date => {
                let values = cells
                    .map(|(row, cell)| read_date(cell).ok_or_else(|| cell_error(column, row, cell)))
                    .collect::<Result<Vec<_>, _>>()?;
                Column::new(name.into(), values)
            }
            RecordColumn::CityName | RecordColumn::Season => {
                let values = cells
                    .map(|(row, cell)| read_text(cell).ok_or_else(|| cell_error(column, row, cell)))
                    .collect::<Result<Vec<_>, _>>()?;
                Column::new(name.into(), values)
            }
            RecordColumn::Metric(_) => {
                let values = cells
                    .map(|(row, cell)| {
                        read_number(cell).ok_or_else(|| cell_error(column, row, cell))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Column::new(name.into(), values)
            }
        };
        frame_columns.push(series);
    }

    let df = DataFrame::new(frame_columns).map_err(ExportError::Build)?;
    info!("Imported {} records from spreadsheet", df.height());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::seasonal_statistics;
    use crate::records::records_to_frame;
    use crate::types::metric::{MetricColumn, MAIN_METRICS};
    use crate::types::season::Season;
    use crate::types::weather_record::WeatherRecord;

    fn records() -> Vec<WeatherRecord> {
        let mut early = WeatherRecord::new(
            NaiveDate::from_ymd_opt(1850, 3, 1).unwrap(),
            "Saint Petersburg",
            Season::Spring,
        );
        early.avg_temp_c = Some(-1.5);

        let mut recent = WeatherRecord::new(
            NaiveDate::from_ymd_opt(2021, 7, 14).unwrap(),
            "Berlin",
            Season::Summer,
        );
        recent.avg_temp_c = Some(24.25);
        recent.precipitation_mm = Some(0.0);
        recent.avg_wind_dir_deg = Some(270.0);
        vec![early, recent]
    }

    #[test]
    fn test_records_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let df = records_to_frame(&records())?;
        let columns = RecordColumn::all();

        let bytes = export_records(&df, &columns)?;
        let imported = import_records(&bytes, &columns)?;

        assert_eq!(imported.height(), df.height());
        let names: Vec<&str> = columns.iter().map(|c| c.column_name()).collect();
        assert!(imported.equals_missing(&df.select(names)?));
        Ok(())
    }

    #[test]
    fn test_export_keeps_only_selected_columns() -> Result<(), Box<dyn std::error::Error>> {
        let df = records_to_frame(&records())?;
        let selected = vec![
            RecordColumn::CityName,
            RecordColumn::Metric(MetricColumn::AvgTemp),
        ];
        let bytes = export_records(&df, &selected)?;

        let imported = import_records(&bytes, &selected)?;
        assert_eq!(imported.width(), 2);

        match import_records(&bytes, &[RecordColumn::Date]) {
            Err(ExportError::MissingHeader(name)) => assert_eq!(name, "date"),
            other => panic!("Expected MissingHeader, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_seasonal_sheet_layout() -> Result<(), Box<dyn std::error::Error>> {
        let df = records_to_frame(&records())?;
        let table = seasonal_statistics(&MAIN_METRICS, &df)?;
        let bytes = export_seasonal_statistics(&table)?;

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let range = workbook.worksheet_range(SEASONAL_SHEET_NAME)?;
        assert_eq!(range.get_size(), (6, 1 + MAIN_METRICS.len() * 4));
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("avg_temp_c".into())));
        assert_eq!(range.get_value((1, 2)), Some(&Data::String("median".into())));
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("Winter".into())));
        assert_eq!(range.get_value((4, 1)), Some(&Data::Float(24.25)));
        Ok(())
    }
}
