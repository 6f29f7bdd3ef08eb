use log::{debug, error, info, warn};

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::geo::*;
use crate::indicators::{derive, discover_fields};
use crate::model::*;
use crate::normalize::normalize_cell;

/// The external collaborators of the pipeline: the survey and the DPA
/// reference tables.
pub trait DataSource {
    fn fetch_survey(&self) -> Result<RawTable, SourceError>;

    fn fetch_geo(&self, level: GeoLevel) -> Result<Vec<DpaEntry>, SourceError>;
}

/// Builds the cleaned and enriched dataset.
///
/// Only the survey is required: when it cannot be loaded, the result is an
/// empty dataset. A missing geography level only degrades the regions to
/// unclassified.
pub fn build<S: DataSource + ?Sized>(source: &S) -> Dataset {
    let table = match source.fetch_survey() {
        Ok(t) => t,
        Err(e) => {
            error!("build: could not load the survey: {}", e);
            return Dataset::empty();
        }
    };
    info!(
        "build: survey with {} rows and {} columns",
        table.rows.len(),
        table.columns.len()
    );

    let rows = match survey_rows(&table) {
        Some(rows) => rows,
        None => {
            error!("build: the survey has no {} column", MUNICIPALITY_COLUMN);
            return Dataset::empty();
        }
    };
    let fields = discover_fields(&table.columns);

    let comunas = fetch_level(source, GeoLevel::Comunas);
    let provinces = fetch_level(source, GeoLevel::Provincias);
    let regions = fetch_level(source, GeoLevel::Regiones);

    let rows = resolve_regions(
        rows,
        &comunas_from_dpa(&comunas),
        &provinces_from_dpa(&provinces),
        &regions_from_dpa(&regions),
    );
    let rows = derive(rows, &fields);
    Dataset { rows, fields }
}

/// Keys every row of the survey. None if the municipality column is missing.
fn survey_rows(table: &RawTable) -> Option<Vec<SurveyRow>> {
    let name_idx = table.column_index(MUNICIPALITY_COLUMN)?;
    let rows = table
        .rows
        .iter()
        .map(|cells| {
            let name_cell = cells.get(name_idx).cloned().unwrap_or(Cell::Empty);
            let raw: BTreeMap<String, Cell> = table
                .columns
                .iter()
                .enumerate()
                .map(|(idx, col)| (col.clone(), cells.get(idx).cloned().unwrap_or(Cell::Empty)))
                .collect();
            SurveyRow::new(name_cell.to_string(), normalize_cell(&name_cell), raw)
        })
        .collect();
    Some(rows)
}

fn fetch_level<S: DataSource + ?Sized>(source: &S, level: GeoLevel) -> Vec<DpaEntry> {
    match source.fetch_geo(level) {
        Ok(entries) => {
            debug!("fetch_level: {} entries for {}", entries.len(), level.endpoint());
            entries
        }
        Err(e) => {
            warn!("fetch_level: {} unavailable: {}", level.endpoint(), e);
            Vec::new()
        }
    }
}

/// Memoizes the dataset of a source.
///
/// The dataset is built on the first call to [SnapshotCache::get] and reused
/// until [SnapshotCache::refresh] or [SnapshotCache::invalidate] is called.
/// An empty dataset is memoized as well: the sources are only contacted again
/// on an explicit refresh.
pub struct SnapshotCache<S: DataSource> {
    source: S,
    snapshot: Option<Rc<Dataset>>,
}

impl<S: DataSource> SnapshotCache<S> {
    pub fn new(source: S) -> SnapshotCache<S> {
        SnapshotCache {
            source,
            snapshot: None,
        }
    }

    pub fn get(&mut self) -> Rc<Dataset> {
        if let Some(ds) = &self.snapshot {
            return ds.clone();
        }
        self.refresh()
    }

    /// Rebuilds the dataset right away.
    pub fn refresh(&mut self) -> Rc<Dataset> {
        info!("SnapshotCache: building a new snapshot");
        let ds = Rc::new(build(&self.source));
        self.snapshot = Some(ds.clone());
        ds
    }

    /// Drops the current snapshot. The next [SnapshotCache::get] rebuilds it.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as StdCell;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn entry(code: &str, parent_code: Option<&str>, name: Option<&str>) -> DpaEntry {
        DpaEntry {
            code: Some(code.to_string()),
            parent_code: parent_code.map(|s| s.to_string()),
            name: name.map(|s| s.to_string()),
        }
    }

    struct FakeSource {
        survey: Result<RawTable, SourceError>,
        comunas: Result<Vec<DpaEntry>, SourceError>,
        provinces: Result<Vec<DpaEntry>, SourceError>,
        regions: Result<Vec<DpaEntry>, SourceError>,
        survey_calls: StdCell<u32>,
    }

    impl DataSource for FakeSource {
        fn fetch_survey(&self) -> Result<RawTable, SourceError> {
            self.survey_calls.set(self.survey_calls.get() + 1);
            self.survey.clone()
        }

        fn fetch_geo(&self, level: GeoLevel) -> Result<Vec<DpaEntry>, SourceError> {
            match level {
                GeoLevel::Comunas => self.comunas.clone(),
                GeoLevel::Provincias => self.provinces.clone(),
                GeoLevel::Regiones => self.regions.clone(),
            }
        }
    }

    fn survey() -> RawTable {
        let columns = ["MUNICIPALIDAD", "P10", "P19.1", "P19.2", "P34.1", "P34.2", "P34.3"];
        RawTable {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: vec![
                vec![
                    text("Ilustre Municipalidad de Ñuñoa"),
                    text("1"),
                    text("1"),
                    text("0"),
                    Cell::Number(1.0),
                    Cell::Number(0.0),
                    text("yes"),
                ],
                vec![
                    text("Municipalidad de Santiago"),
                    text("0"),
                    text("1"),
                    text("1"),
                    Cell::Number(1.0),
                    Cell::Number(1.0),
                    Cell::Number(1.0),
                ],
                // Short row: the missing cells are empty.
                vec![text("Municipalidad de Atlantis"), text("1")],
            ],
        }
    }

    fn full_source() -> FakeSource {
        FakeSource {
            survey: Ok(survey()),
            comunas: Ok(vec![
                entry("13120", Some("131"), Some("Ñuñoa")),
                entry("13101", Some("131"), Some("Santiago Centro")),
            ]),
            provinces: Ok(vec![entry("131", Some("13"), Some("Santiago"))]),
            regions: Ok(vec![entry("13", None, Some("Metropolitana de Santiago"))]),
            survey_calls: StdCell::new(0),
        }
    }

    #[test]
    fn build_enriches_the_survey() {
        init();
        let ds = build(&full_source());
        assert_eq!(ds.rows.len(), 3);
        assert_eq!(ds.main_fields(), &["P10".to_string()]);
        assert_eq!(ds.p19_fields().len(), 2);
        assert_eq!(ds.p34_fields().len(), 3);

        let nunoa = &ds.rows[0];
        assert_eq!(nunoa.comuna_key, "NUNOA");
        assert_eq!(nunoa.region_name(), "Metropolitana de Santiago");
        assert_eq!(nunoa.p19_average, 0.5);
        assert_eq!(nunoa.digitalization_index, 1);
        assert_eq!(nunoa.maturity_level, MaturityLevel::Low);

        // Fixed by the override table.
        let santiago = &ds.rows[1];
        assert_eq!(santiago.region_name(), "Metropolitana de Santiago");
        assert_eq!(santiago.digitalization_index, 3);

        let atlantis = &ds.rows[2];
        assert_eq!(atlantis.region, RegionAssignment::Unresolved);
        assert_eq!(atlantis.digitalization_index, 0);
        assert_eq!(atlantis.raw.get("P34.1"), Some(&Cell::Empty));
    }

    #[test]
    fn survey_failure_gives_an_empty_dataset() {
        init();
        let mut source = full_source();
        source.survey = Err(SourceError::Unavailable("network down".to_string()));
        let ds = build(&source);
        assert!(ds.is_empty());
        let (rows, main, p19, p34) = ds.into_parts();
        assert!(rows.is_empty() && main.is_empty() && p19.is_empty() && p34.is_empty());
    }

    #[test]
    fn survey_without_municipalities_is_unavailable() {
        init();
        let mut source = full_source();
        source.survey = Ok(RawTable {
            columns: vec!["P10".to_string()],
            rows: vec![vec![text("1")]],
        });
        assert!(build(&source).is_empty());
    }

    #[test]
    fn geography_failure_degrades_to_unclassified() {
        init();
        let mut source = full_source();
        source.comunas = Err(SourceError::Unavailable("timeout".to_string()));
        source.provinces = Err(SourceError::Unavailable("timeout".to_string()));
        source.regions = Err(SourceError::Unavailable("timeout".to_string()));
        let ds = build(&source);
        assert_eq!(ds.rows.len(), 3);
        assert!(ds
            .rows
            .iter()
            .all(|r| r.region == RegionAssignment::Unclassified));
        // The indicators do not depend on the geography.
        assert_eq!(ds.rows[1].digitalization_index, 3);
    }

    #[test]
    fn partial_geography_is_unavailable_geography() {
        init();
        let mut source = full_source();
        source.provinces = Ok(vec![]);
        let ds = build(&source);
        assert!(ds
            .rows
            .iter()
            .all(|r| r.region == RegionAssignment::Unclassified));
    }

    #[test]
    fn cache_builds_once_until_refreshed() {
        init();
        let mut cache = SnapshotCache::new(full_source());
        assert!(!cache.is_cached());
        let first = cache.get();
        let second = cache.get();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.source().survey_calls.get(), 1);

        let third = cache.refresh();
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
        assert_eq!(cache.source().survey_calls.get(), 2);

        cache.invalidate();
        assert!(!cache.is_cached());
        cache.get();
        assert_eq!(cache.source().survey_calls.get(), 3);
    }
}
