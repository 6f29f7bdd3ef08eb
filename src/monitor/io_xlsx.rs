use calamine::{open_workbook, DataType, Reader, Xlsx};

use muni_digital::{Cell, RawTable};

use crate::monitor::io_common::{cell_from_text, simplify_file_name};
use crate::monitor::*;

/// Reads the survey from a workbook: the named worksheet (or the first one),
/// with the header in the first row.
pub fn read_excel_table(path: &str, worksheet: Option<&str>) -> MonitorResult<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange_o = match worksheet {
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    let wrange = wrange_o
        .context(EmptyExcelSnafu {})?
        .context(OpeningExcelSnafu { path })?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu {})?;
    let columns: Vec<String> = header
        .iter()
        .map(|c| cell_from_calamine(c).to_string().trim().to_string())
        .collect();
    debug!("read_excel_table: header: {:?}", columns);

    let rows: Vec<Vec<Cell>> = iter
        .map(|row| row.iter().map(cell_from_calamine).collect())
        .collect();
    info!(
        "read_excel_table: {}: {} rows",
        simplify_file_name(path),
        rows.len()
    );
    Ok(RawTable { columns, rows })
}

fn cell_from_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) | DataType::DateTime(f) => Cell::Number(*f),
        DataType::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        DataType::String(s) => cell_from_text(s),
        _ => Cell::Empty,
    }
}
