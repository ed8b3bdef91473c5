use anyhow::{Context, Result};
use meto_core::{Table, TabularSink};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

/// Writes a table as a single-sheet xlsx workbook
#[derive(Debug, Clone, Default)]
pub struct XlsxSink;

impl XlsxSink {
    pub fn new() -> Self {
        Self
    }
}

impl TabularSink for XlsxSink {
    fn write_table(&self, table: &Table) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(table.sheet_name.as_str())
            .with_context(|| format!("Invalid sheet name: {}", table.sheet_name))?;

        fill(sheet, table).context("Failed to write worksheet")?;

        let bytes = workbook
            .save_to_buffer()
            .context("Failed to serialize workbook")?;
        debug!(rows = table.rows.len(), bytes = bytes.len(), "Wrote xlsx");
        Ok(bytes)
    }
}

fn fill(sheet: &mut Worksheet, table: &Table) -> Result<(), rust_xlsxwriter::XlsxError> {
    let header = Format::new().set_bold();
    for (col, name) in Table::COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    sheet.set_column_width(0, 22)?;
    sheet.set_freeze_panes(1, 0)?;

    for (i, row) in table.rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, row.timestamp.as_str())?;
        // absent measurements stay blank cells
        if let Some(t) = row.temperature {
            sheet.write_number(r, 1, t)?;
        }
        if let Some(h) = row.humidity {
            sheet.write_number(r, 2, h)?;
        }
        sheet.write_number(r, 3, row.latitude)?;
        sheet.write_number(r, 4, row.longitude)?;
    }
    Ok(())
}
