use log::debug;
use std::path::Path;

use muni_digital::Cell;

const UTF8_BOM: &str = "\u{feff}";

/// Short name of a file, for the logs.
pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Decodes the bytes of the survey.
///
/// The dump of the portal is UTF-8 with a BOM, but older exports are in Latin-1.
pub fn decode_survey_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix(UTF8_BOM).unwrap_or(s).to_string(),
        Err(e) => {
            debug!(
                "decode_survey_bytes: not UTF-8 ({}), decoding as Latin-1",
                e
            );
            // Latin-1 maps each byte to the code point of the same value.
            bytes.iter().map(|b| *b as char).collect()
        }
    }
}

/// Blank fields are missing answers.
pub fn cell_from_text(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8_and_latin1() {
        let utf8 = "\u{feff}MUNICIPALIDAD\nÑuñoa\n".as_bytes();
        assert_eq!(decode_survey_bytes(utf8), "MUNICIPALIDAD\nÑuñoa\n");

        let latin1: Vec<u8> = vec![0xD1, b'u', 0xF1, b'o', b'a'];
        assert_eq!(decode_survey_bytes(&latin1), "Ñuñoa");
    }

    #[test]
    fn blank_cells_are_empty() {
        assert_eq!(cell_from_text("  "), Cell::Empty);
        assert_eq!(cell_from_text("1"), Cell::Text("1".to_string()));
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/encuesta.csv"), "encuesta.csv");
        assert_eq!(simplify_file_name("encuesta.csv"), "encuesta.csv");
    }
}
