use log::{debug, info};

use crate::model::*;

/// The names of the P19 sub-questions, in order.
pub fn p19_block() -> Vec<String> {
    (1..=P19_BLOCK_LEN).map(|i| format!("P19.{}", i)).collect()
}

/// Scans the schema of the survey for the fields of each block.
///
/// The main questions and the P19 block come from fixed lists and keep their
/// order. The P34 block is every column starting with `P34`, in the order of
/// the schema, so that new sub-questions are picked up without changes.
pub fn discover_fields(columns: &[String]) -> FieldLists {
    let present = |name: &String| columns.contains(name);
    let main: Vec<String> = MAIN_QUESTIONS
        .iter()
        .map(|s| s.to_string())
        .filter(present)
        .collect();
    let p19: Vec<String> = p19_block().into_iter().filter(present).collect();
    let p34: Vec<String> = columns
        .iter()
        .filter(|c| c.starts_with(P34_PREFIX))
        .cloned()
        .collect();
    debug!(
        "discover_fields: main: {:?} p19: {:?} p34: {:?}",
        main, p19, p34
    );
    FieldLists { main, p19, p34 }
}

/// Reduces a cell to 0 or 1.
///
/// Anything that is not a number equal to 0 or 1 becomes 0.
pub fn binarize(cell: &Cell) -> u8 {
    match cell.as_number() {
        Some(x) if x == 1.0 => 1,
        _ => 0,
    }
}

/// Binarizes the questions of every row and computes the indicators.
pub fn derive(rows: Vec<SurveyRow>, fields: &FieldLists) -> Vec<SurveyRow> {
    info!(
        "derive: {} rows, {} main questions, {} P19 fields, {} P34 fields",
        rows.len(),
        fields.main.len(),
        fields.p19.len(),
        fields.p34.len()
    );
    rows.into_iter().map(|row| derive_row(row, fields)).collect()
}

fn derive_row(mut row: SurveyRow, fields: &FieldLists) -> SurveyRow {
    let empty = Cell::Empty;
    for field in fields
        .main
        .iter()
        .chain(fields.p19.iter())
        .chain(fields.p34.iter())
    {
        let value = binarize(row.raw.get(field).unwrap_or(&empty));
        row.binary.insert(field.clone(), value);
    }

    row.p19_average = if fields.p19.is_empty() {
        0.0
    } else {
        let total: u32 = fields.p19.iter().map(|f| binary_value(&row, f)).sum();
        total as f64 / fields.p19.len() as f64
    };
    row.digitalization_index = fields.p34.iter().map(|f| binary_value(&row, f)).sum();
    // Always from the index, never from the raw fields.
    row.maturity_level = MaturityLevel::from_index(row.digitalization_index);
    row
}

fn binary_value(row: &SurveyRow, field: &str) -> u32 {
    row.flag(field).unwrap_or(0) as u32
}
