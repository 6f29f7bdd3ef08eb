// Primitives for reading the survey as CSV.

use std::io::Read;

use muni_digital::RawTable;

use crate::monitor::io_common::{cell_from_text, decode_survey_bytes, simplify_file_name};
use crate::monitor::*;

/// Reads a survey table with a header row. Short rows are accepted; the
/// missing answers are filled when the rows are assembled.
pub fn read_csv_table<R: Read>(input: R) -> MonitorResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let columns: Vec<String> = rdr
        .headers()
        .context(CsvHeaderSnafu {})?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    debug!("read_csv_table: columns: {:?}", columns);

    let mut rows = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        rows.push(line.iter().map(cell_from_text).collect());
    }
    Ok(RawTable { columns, rows })
}

pub fn read_csv_text(text: &str) -> MonitorResult<RawTable> {
    read_csv_table(text.as_bytes())
}

pub fn read_csv_file(path: &str) -> MonitorResult<RawTable> {
    let bytes = fs::read(path).context(OpeningFileSnafu { path })?;
    let table = read_csv_text(&decode_survey_bytes(&bytes))?;
    info!(
        "read_csv_file: {}: {} rows",
        simplify_file_name(path),
        table.rows.len()
    );
    Ok(table)
}
