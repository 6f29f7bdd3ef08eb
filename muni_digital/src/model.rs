// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Deserializer};

/// The column holding the name of the municipality in the survey.
pub const MUNICIPALITY_COLUMN: &str = "MUNICIPALIDAD";

/// The yes/no questions about the web site, social networks and online procedures.
pub const MAIN_QUESTIONS: [&str; 3] = ["P10", "P11", "P12"];

/// Number of sub-questions in the P19 block (P19.1 to P19.11).
pub const P19_BLOCK_LEN: u32 = 11;

/// Every column starting with this prefix belongs to the P34 block.
pub const P34_PREFIX: &str = "P34";

/// A cell of the survey, as received from the source.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Numeric coercion of the cell.
    ///
    /// Text is trimmed and parsed as a float. Empty cells, unparsable text and
    /// non-finite numbers do not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(x) => Some(*x).filter(|x| x.is_finite()),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Number(x) => write!(f, "{}", x),
        }
    }
}

/// The survey table before any cleaning.
///
/// Every row is expected to have one cell per column. Missing trailing cells
/// are read as empty.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// The three levels of the administrative hierarchy served by the DPA API.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum GeoLevel {
    Comunas,
    Provincias,
    Regiones,
}

impl GeoLevel {
    pub const ALL: [GeoLevel; 3] = [GeoLevel::Comunas, GeoLevel::Provincias, GeoLevel::Regiones];

    /// The name of the endpoint (and of the local dump file) for this level.
    pub fn endpoint(&self) -> &'static str {
        match self {
            GeoLevel::Comunas => "comunas",
            GeoLevel::Provincias => "provincias",
            GeoLevel::Regiones => "regiones",
        }
    }
}

/// One entry of a DPA reference table.
///
/// The API serves the codes as strings ("13", "131", "13101") but numbers are
/// accepted as well. All the fields are optional at this stage: incomplete
/// entries are dropped when the tables are renamed into the join schema.
#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
pub struct DpaEntry {
    #[serde(rename = "codigo", default, deserialize_with = "code_string")]
    pub code: Option<String>,
    #[serde(rename = "codigo_padre", default, deserialize_with = "code_string")]
    pub parent_code: Option<String>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeRepr {
    Text(String),
    Int(i64),
}

fn code_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<CodeRepr> = Option::deserialize(deserializer)?;
    Ok(repr.map(|r| match r {
        CodeRepr::Text(s) => s,
        CodeRepr::Int(i) => i.to_string(),
    }))
}

/// Failure of one of the external sources.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SourceError {
    /// The source could not be reached, timed out or answered with a failure.
    Unavailable(String),
    /// The source answered but the content could not be understood.
    Malformed(String),
}

impl Error for SourceError {}

impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "source unavailable: {}", msg),
            SourceError::Malformed(msg) => write!(f, "malformed source: {}", msg),
        }
    }
}

// ******** Output data structures *********

/// The region a municipality has been assigned to.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum RegionAssignment {
    Resolved(String),
    /// The geography was available but the municipality did not match any commune.
    Unresolved,
    /// The geography could not be loaded at all.
    Unclassified,
}

impl RegionAssignment {
    pub const UNRESOLVED_LABEL: &'static str = "Desconocida";
    pub const UNCLASSIFIED_LABEL: &'static str = "Sin clasificar";

    pub fn name(&self) -> &str {
        match self {
            RegionAssignment::Resolved(name) => name.as_str(),
            RegionAssignment::Unresolved => Self::UNRESOLVED_LABEL,
            RegionAssignment::Unclassified => Self::UNCLASSIFIED_LABEL,
        }
    }

    /// The name of the region, only when it has been resolved.
    pub fn resolved(&self) -> Option<&str> {
        match self {
            RegionAssignment::Resolved(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl Display for RegionAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Digital maturity of a municipality, derived from its digitalization index.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum MaturityLevel {
    Low,
    Medium,
    High,
}

impl MaturityLevel {
    /// The order used by the distribution charts.
    pub const DESCENDING: [MaturityLevel; 3] =
        [MaturityLevel::High, MaturityLevel::Medium, MaturityLevel::Low];

    /// Index up to 3 is low, 4 to 7 is medium, 8 and more is high.
    pub fn from_index(index: u32) -> MaturityLevel {
        match index {
            0..=3 => MaturityLevel::Low,
            4..=7 => MaturityLevel::Medium,
            _ => MaturityLevel::High,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaturityLevel::Low => "Bajo (Iniciando)",
            MaturityLevel::Medium => "Medio (En desarrollo)",
            MaturityLevel::High => "Alto (Avanzado)",
        }
    }
}

impl Display for MaturityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One municipality of the survey, with its region and its indicators.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyRow {
    /// The name as received from the survey.
    pub municipality_name: String,
    pub comuna_key: String,
    pub region: RegionAssignment,
    /// All the fields of the survey, untouched.
    pub raw: BTreeMap<String, Cell>,
    /// The binarized questions (main questions, P19 and P34 blocks).
    pub binary: BTreeMap<String, u8>,
    pub p19_average: f64,
    pub digitalization_index: u32,
    pub maturity_level: MaturityLevel,
}

impl SurveyRow {
    pub fn new(municipality_name: String, comuna_key: String, raw: BTreeMap<String, Cell>) -> SurveyRow {
        SurveyRow {
            municipality_name,
            comuna_key,
            region: RegionAssignment::Unresolved,
            raw,
            binary: BTreeMap::new(),
            p19_average: 0.0,
            digitalization_index: 0,
            maturity_level: MaturityLevel::Low,
        }
    }

    pub fn region_name(&self) -> &str {
        self.region.name()
    }

    /// The binarized value of a question, if this question was derived.
    pub fn flag(&self, field: &str) -> Option<u8> {
        self.binary.get(field).cloned()
    }
}

/// The survey fields found in the schema of the source, per block.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FieldLists {
    pub main: Vec<String>,
    pub p19: Vec<String>,
    pub p34: Vec<String>,
}

/// The cleaned and enriched survey.
///
/// An empty dataset means that the survey could not be loaded: callers should
/// stop there instead of showing partial views.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<SurveyRow>,
    pub fields: FieldLists,
}

impl Dataset {
    pub fn empty() -> Dataset {
        Dataset::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn main_fields(&self) -> &[String] {
        &self.fields.main
    }

    pub fn p19_fields(&self) -> &[String] {
        &self.fields.p19
    }

    pub fn p34_fields(&self) -> &[String] {
        &self.fields.p34
    }

    /// The rows and the three presence lists (main, P19, P34).
    pub fn into_parts(self) -> (Vec<SurveyRow>, Vec<String>, Vec<String>, Vec<String>) {
        (self.rows, self.fields.main, self.fields.p19, self.fields.p34)
    }
}
