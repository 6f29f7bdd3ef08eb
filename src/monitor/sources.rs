use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use muni_digital::{DataSource, DpaEntry, GeoLevel, RawTable, SourceError};

use crate::monitor::config_reader::{InputType, Settings};
use crate::monitor::io_common::decode_survey_bytes;
use crate::monitor::io_csv::{read_csv_file, read_csv_text};
use crate::monitor::io_dpa::{dpa_file_path, parse_dpa_json, read_dpa_file};
use crate::monitor::io_xlsx::read_excel_table;
use crate::monitor::*;

/// The DPA API rejects requests without a browser-like agent.
const DPA_USER_AGENT: &str = "Mozilla";

/// Fetches the survey and the DPA tables, from local files when they are
/// configured and from the web otherwise.
pub struct MonitorSource {
    settings: Settings,
    client: Client,
}

impl MonitorSource {
    pub fn new(settings: Settings) -> MonitorResult<MonitorSource> {
        let client = Client::builder().build().context(HttpClientSnafu {})?;
        Ok(MonitorSource { settings, client })
    }

    /// A single GET, no retry.
    fn http_get(
        &self,
        url: &str,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> MonitorResult<Vec<u8>> {
        debug!("http_get: {} (timeout {:?})", url, timeout);
        let mut request = self.client.get(url).timeout(timeout);
        if let Some(ua) = user_agent {
            request = request.header(USER_AGENT, ua);
        }
        let response = request.send().context(HttpRequestSnafu { url })?;
        let status = response.status();
        ensure!(
            status.is_success(),
            HttpStatusSnafu {
                url,
                status: status.as_u16()
            }
        );
        let body = response.bytes().context(HttpRequestSnafu { url })?;
        Ok(body.to_vec())
    }

    fn read_survey(&self) -> MonitorResult<RawTable> {
        match &self.settings.survey_path {
            Some(path) => match self.settings.input_type {
                InputType::Csv => read_csv_file(path),
                InputType::Xlsx => {
                    read_excel_table(path, self.settings.excel_worksheet_name.as_deref())
                }
            },
            None => {
                let url = self.settings.survey_url.as_str();
                let bytes = self.http_get(url, self.settings.survey_timeout, None)?;
                info!("read_survey: downloaded {} bytes from {}", bytes.len(), url);
                read_csv_text(&decode_survey_bytes(&bytes))
            }
        }
    }

    fn read_geo(&self, level: GeoLevel) -> MonitorResult<Vec<DpaEntry>> {
        match &self.settings.geo_dir {
            Some(dir) => read_dpa_file(&dpa_file_path(dir, level)),
            None => {
                let url = format!(
                    "{}/{}",
                    self.settings.dpa_base_url.trim_end_matches('/'),
                    level.endpoint()
                );
                let bytes =
                    self.http_get(&url, self.settings.geo_timeout, Some(DPA_USER_AGENT))?;
                parse_dpa_json(&bytes)
            }
        }
    }
}

/// Content that was received but could not be read is malformed, anything
/// else is an unavailable source.
fn to_source_error(e: MonitorError) -> SourceError {
    match e {
        MonitorError::CsvHeader { .. }
        | MonitorError::CsvLineParse { .. }
        | MonitorError::EmptyExcel {}
        | MonitorError::ParsingJson { .. } => SourceError::Malformed(e.to_string()),
        _ => SourceError::Unavailable(e.to_string()),
    }
}

impl DataSource for MonitorSource {
    fn fetch_survey(&self) -> Result<RawTable, SourceError> {
        self.read_survey().map_err(to_source_error)
    }

    fn fetch_geo(&self, level: GeoLevel) -> Result<Vec<DpaEntry>, SourceError> {
        self.read_geo(level).map_err(to_source_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &std::path::Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn local_files_build_a_dataset() {
        let dir = std::env::temp_dir().join("munimonitor_sources_fixture");
        fs::create_dir_all(&dir).unwrap();
        write_fixture(
            &dir,
            "encuesta.csv",
            "MUNICIPALIDAD,P10,P34.1,P34.2\nMunicipalidad de Ñuñoa,1,1,1\nIlustre Municipalidad de Renca,0,0,\n",
        );
        write_fixture(
            &dir,
            "comunas.json",
            r#"[{"codigo": "13120", "codigo_padre": "131", "nombre": "Ñuñoa"},
                {"codigo": "13128", "codigo_padre": "131", "nombre": "Renca"}]"#,
        );
        write_fixture(&dir, "provincias.json", r#"[{"codigo": "131", "codigo_padre": "13", "nombre": "Santiago"}]"#);
        write_fixture(&dir, "regiones.json", r#"[{"codigo": "13", "nombre": "Metropolitana de Santiago"}]"#);

        let dir_s = dir.display().to_string();
        let settings = Settings {
            survey_path: Some(format!("{}/encuesta.csv", dir_s)),
            geo_dir: Some(dir_s),
            ..Settings::default()
        };
        let source = MonitorSource::new(settings).unwrap();
        let ds = muni_digital::build(&source);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0].comuna_key, "NUNOA");
        assert_eq!(ds.rows[0].region_name(), "Metropolitana de Santiago");
        assert_eq!(ds.rows[0].digitalization_index, 2);
        assert_eq!(ds.rows[1].region_name(), "Metropolitana de Santiago");
    }

    #[test]
    fn missing_dump_is_an_unavailable_level() {
        let settings = Settings {
            geo_dir: Some("/nonexistent".to_string()),
            ..Settings::default()
        };
        let source = MonitorSource::new(settings).unwrap();
        assert!(matches!(
            source.fetch_geo(GeoLevel::Regiones),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn error_classification() {
        let e = parse_dpa_json(b"not json").unwrap_err();
        assert!(matches!(to_source_error(e), SourceError::Malformed(_)));
        let e = MonitorError::HttpStatus {
            url: "http://localhost".to_string(),
            status: 503,
        };
        assert!(matches!(to_source_error(e), SourceError::Unavailable(_)));
    }
}
