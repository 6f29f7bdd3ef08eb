// The reference tables of the DPA (División Político Administrativa).

use muni_digital::{DpaEntry, GeoLevel};
use std::path::Path;

use crate::monitor::*;

/// Parses a DPA table: a JSON array of objects with at least `codigo`,
/// `codigo_padre` and `nombre`. Other fields are ignored.
pub fn parse_dpa_json(bytes: &[u8]) -> MonitorResult<Vec<DpaEntry>> {
    serde_json::from_slice(bytes).context(ParsingJsonSnafu {})
}

/// The local dump of a level, named after its endpoint (`comunas.json`, ...).
pub fn dpa_file_path(dir: &str, level: GeoLevel) -> String {
    Path::new(dir)
        .join(format!("{}.json", level.endpoint()))
        .display()
        .to_string()
}

pub fn read_dpa_file(path: &str) -> MonitorResult<Vec<DpaEntry>> {
    let bytes = fs::read(path).context(OpeningJsonSnafu { path })?;
    let entries = parse_dpa_json(&bytes)?;
    debug!("read_dpa_file: {}: {} entries", path, entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_as_strings() {
        let entries = parse_dpa_json(
            r#"[
                {"codigo": "13101", "tipo": "comuna", "nombre": "Santiago", "lat": -33.4, "codigo_padre": "131"},
                {"codigo": 13, "nombre": "Metropolitana de Santiago"},
                {"nombre": "Sin código"}
            ]"#
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code.as_deref(), Some("13101"));
        assert_eq!(entries[0].parent_code.as_deref(), Some("131"));
        assert_eq!(entries[1].code.as_deref(), Some("13"));
        assert_eq!(entries[1].parent_code, None);
        assert_eq!(entries[2].code, None);
    }

    #[test]
    fn malformed_tables() {
        assert!(matches!(
            parse_dpa_json(b"{\"error\": \"rate limited\"}"),
            Err(MonitorError::ParsingJson { .. })
        ));
    }

    #[test]
    fn dump_file_names() {
        assert_eq!(
            dpa_file_path("/data/dpa", GeoLevel::Provincias),
            "/data/dpa/provincias.json"
        );
    }
}
