use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Cell;

// Only the first one found is removed.
const INSTITUTIONAL_PREFIXES: [&str; 3] = [
    "ILUSTRE MUNICIPALIDAD DE ",
    "MUNICIPALIDAD DE ",
    "MUNICIPALIDAD ",
];

const SEPARATORS: [char; 3] = [' ', '-', '\''];

/// Decomposes the text (NFD) and drops the combining marks.
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// The join key of a municipality or commune name.
///
/// Names that only differ by accents, case, the institutional prefix or the
/// separators map to the same key:
///
/// ```
/// use muni_digital::normalize_key;
///
/// assert_eq!(normalize_key("Ilustre Municipalidad de Ñuñoa"), "NUNOA");
/// assert_eq!(normalize_key("Ñuñoa"), "NUNOA");
/// ```
pub fn normalize_key(name: &str) -> String {
    let upper = strip_accents(name).to_uppercase();
    let unprefixed = match INSTITUTIONAL_PREFIXES.iter().find(|p| upper.contains(*p)) {
        Some(prefix) => upper.replace(prefix, ""),
        None => upper,
    };
    unprefixed
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Same as [normalize_key], for a cell that may not hold text.
///
/// Numbers are written in their shortest form: `13101.0` gives "13101".
pub fn normalize_cell(cell: &Cell) -> String {
    normalize_key(&cell.to_string())
}
