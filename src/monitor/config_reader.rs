use crate::monitor::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SURVEY_URL: &str =
    "https://datos.gob.cl/datastore/dump/a6e3cfd1-08d7-4221-abb8-ee6d766a4820?bom=True";
pub const DEFAULT_DPA_BASE_URL: &str = "https://apis.digital.gob.cl/dpa";
pub const DEFAULT_SURVEY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 5;

/// The configuration file, as written by the user. All the entries are optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "surveyUrl")]
    pub survey_url: Option<String>,
    #[serde(rename = "dpaBaseUrl")]
    pub dpa_base_url: Option<String>,
    #[serde(rename = "surveyTimeoutSecs")]
    pub survey_timeout_secs: Option<u64>,
    #[serde(rename = "geoTimeoutSecs")]
    pub geo_timeout_secs: Option<u64>,
    #[serde(rename = "surveyPath")]
    pub survey_path: Option<String>,
    #[serde(rename = "inputType")]
    pub input_type: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "geoDir")]
    pub geo_dir: Option<String>,
}

impl MonitorConfig {
    /// The entries of `other` take precedence.
    pub fn merge(self, other: MonitorConfig) -> MonitorConfig {
        MonitorConfig {
            survey_url: other.survey_url.or(self.survey_url),
            dpa_base_url: other.dpa_base_url.or(self.dpa_base_url),
            survey_timeout_secs: other.survey_timeout_secs.or(self.survey_timeout_secs),
            geo_timeout_secs: other.geo_timeout_secs.or(self.geo_timeout_secs),
            survey_path: other.survey_path.or(self.survey_path),
            input_type: other.input_type.or(self.input_type),
            excel_worksheet_name: other.excel_worksheet_name.or(self.excel_worksheet_name),
            geo_dir: other.geo_dir.or(self.geo_dir),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Csv,
    Xlsx,
}

impl InputType {
    pub fn parse(s: &str) -> MonitorResult<InputType> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(InputType::Csv),
            "xlsx" | "excel" => Ok(InputType::Xlsx),
            _ => UnknownInputTypeSnafu { input_type: s }.fail(),
        }
    }

    /// Guesses the type from the extension of the file. CSV by default.
    pub fn from_path(path: &str) -> InputType {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => InputType::Xlsx,
            _ => InputType::Csv,
        }
    }
}

/// The validated configuration, with all the defaults filled in.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub survey_url: String,
    pub dpa_base_url: String,
    pub survey_timeout: Duration,
    pub geo_timeout: Duration,
    pub survey_path: Option<String>,
    pub input_type: InputType,
    pub excel_worksheet_name: Option<String>,
    pub geo_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            survey_url: DEFAULT_SURVEY_URL.to_string(),
            dpa_base_url: DEFAULT_DPA_BASE_URL.to_string(),
            survey_timeout: Duration::from_secs(DEFAULT_SURVEY_TIMEOUT_SECS),
            geo_timeout: Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS),
            survey_path: None,
            input_type: InputType::Csv,
            excel_worksheet_name: None,
            geo_dir: None,
        }
    }
}

impl Settings {
    pub fn from_config(config: &MonitorConfig) -> MonitorResult<Settings> {
        let input_type = match (&config.input_type, &config.survey_path) {
            (Some(t), _) => InputType::parse(t)?,
            (None, Some(path)) => InputType::from_path(path),
            (None, None) => InputType::Csv,
        };
        let default = Settings::default();
        Ok(Settings {
            survey_url: config.survey_url.clone().unwrap_or(default.survey_url),
            dpa_base_url: config.dpa_base_url.clone().unwrap_or(default.dpa_base_url),
            survey_timeout: config
                .survey_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default.survey_timeout),
            geo_timeout: config
                .geo_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default.geo_timeout),
            survey_path: config.survey_path.clone(),
            input_type,
            excel_worksheet_name: config.excel_worksheet_name.clone(),
            geo_dir: config.geo_dir.clone(),
        })
    }
}

/// Reads the configuration file.
///
/// The relative paths of the file are resolved from the directory of the file.
pub fn read_config(path: &str) -> MonitorResult<MonitorConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config = parse_config(&contents)?;
    let root_p = Path::new(path).parent().context(MissingParentDirSnafu {})?;
    debug!("read_config: {:?} (root {:?})", config, root_p);
    Ok(MonitorConfig {
        survey_path: config.survey_path.map(|p| resolve_path(root_p, &p)),
        geo_dir: config.geo_dir.map(|p| resolve_path(root_p, &p)),
        ..config
    })
}

pub fn parse_config(contents: &str) -> MonitorResult<MonitorConfig> {
    serde_json::from_str(contents).context(ParsingJsonSnafu {})
}

fn resolve_path(root_p: &Path, p: &str) -> String {
    if Path::new(p).is_absolute() {
        p.to_string()
    } else {
        root_p.join(p).display().to_string()
    }
}
