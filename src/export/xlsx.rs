//! Spreadsheet encoder
//!
//! One worksheet named after the tab, a bold frozen header row, then one row
//! per [`TabularRecord`](super::TabularRecord) in collection order.

use async_trait::async_trait;
use parfait_types::ExportFormat;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, XlsxError};

use super::encoder::ExportEncoder;
use super::tabular::{tabulate, TabularExport};
use super::ExportSnapshot;
use crate::error::ExportError;

const MIN_COLUMN_WIDTH: usize = 12;
const MAX_COLUMN_WIDTH: usize = 60;

/// `.xlsx` workbook of the tabular view
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxEncoder;

#[async_trait]
impl ExportEncoder for XlsxEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    async fn encode(&self, snapshot: &ExportSnapshot) -> Result<Vec<u8>, ExportError> {
        let table = tabulate(snapshot);
        write_workbook(snapshot.tab.title(), &table)
            .map_err(|e| ExportError::encoder(ExportFormat::Xlsx, e.to_string()))
    }
}

fn write_workbook(sheet_name: &str, table: &TabularExport) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in table.headers.iter().enumerate() {
        let col = column(col)?;
        worksheet.write_string_with_format(0, col, header.as_str(), &header_format)?;

        let widest = table
            .records
            .iter()
            .filter_map(|r| r.cells().get(usize::from(col)).map(|c| c.chars().count()))
            .chain(std::iter::once(header.chars().count()))
            .max()
            .unwrap_or(MIN_COLUMN_WIDTH);
        let width = widest.clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) as u16;
        worksheet.set_column_width(col, width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, record) in table.records.iter().enumerate() {
        let row = RowNum::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, cell) in record.cells().into_iter().enumerate() {
            worksheet.write_string(row, column(col)?, cell)?;
        }
    }

    workbook.save_to_buffer()
}

fn column(index: usize) -> Result<ColNum, XlsxError> {
    ColNum::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}
