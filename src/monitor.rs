use log::{debug, info, warn};

use muni_digital::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::monitor::config_reader::*;
use crate::monitor::sources::MonitorSource;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_dpa;
mod io_xlsx;
mod sources;

#[derive(Debug, Snafu)]
pub enum MonitorError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading the CSV header"))]
    CsvHeader { source: csv::Error },
    #[snafu(display("Error reading the CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no worksheet or no header"))]
    EmptyExcel {},
    #[snafu(display("Could not create the HTTP client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("Request to {url} failed"))]
    HttpRequest { source: reqwest::Error, url: String },
    #[snafu(display("Request to {url} answered with status {status}"))]
    HttpStatus { url: String, status: u16 },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Unknown input type {input_type:?} (expected csv or xlsx)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display(
        "The survey data could not be loaded. Check the connection or the input file and try again."
    ))]
    DataUnavailable {},
    #[snafu(display("Region {region:?} is not one of the valid regions"))]
    UnknownRegion { region: String },
    #[snafu(display("Municipality {municipality:?} is not in the survey"))]
    UnknownMunicipality { municipality: String },
    #[snafu(display("Error writing the report to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// What the user picked in the filters.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Selection {
    pub region: Option<String>,
    pub municipality: Option<String>,
}

fn row_summary_js(row: &SurveyRow) -> JSValue {
    json!({
        "municipality": row.municipality_name,
        "region": row.region_name(),
        "maturityLevel": row.maturity_level.label(),
        "digitalizationIndex": row.digitalization_index,
        "p19Average": row.p19_average,
    })
}

/// The bars of a ranked chart.
fn chart_js(rows: &[&SurveyRow], metric: Metric) -> JSValue {
    let top = top_n(rows, metric, TOP_N);
    let bars: Vec<JSValue> = top
        .items
        .iter()
        .map(|r| {
            json!({
                "label": abbreviate(&r.municipality_name, LABEL_WIDTH),
                "municipality": r.municipality_name,
                "value": metric.value(r),
            })
        })
        .collect();
    json!({
        "metric": metric.label(),
        "truncated": top.truncated,
        "bars": bars,
    })
}

fn overview_js(rows: &[&SurveyRow]) -> JSValue {
    match overview(rows) {
        Some(ov) => json!({
            "municipalities": ov.municipalities,
            "meanDigitalizationIndex": ov.mean_digitalization_index,
            "meanP19Average": ov.mean_p19_average,
            "highMaturity": ov.high_maturity,
        }),
        None => JSValue::Null,
    }
}

fn channels_js(rows: &[&SurveyRow], main_fields: &[String]) -> Vec<JSValue> {
    main_fields
        .iter()
        .filter_map(|field| {
            flag_split(rows, field).map(|split| json!({"field": field, "yes": split.yes, "no": split.no}))
        })
        .collect()
}

/// The scatter of the P19 average against the index, one series per maturity level.
fn relation_js(rows: &[&SurveyRow]) -> Vec<JSValue> {
    maturity_relation(rows)
        .into_iter()
        .map(|(level, points)| {
            let points: Vec<JSValue> = points
                .iter()
                .map(|(p19, index)| json!({"p19Average": p19, "digitalizationIndex": index}))
                .collect();
            json!({"level": level.label(), "points": points})
        })
        .collect()
}

fn region_means_js(rows: &[SurveyRow], metric: Metric) -> Vec<JSValue> {
    region_means(rows, metric)
        .into_iter()
        .map(|(region, mean)| json!({"region": region, "mean": mean}))
        .collect()
}

fn profile_js(profile: &MunicipalityProfile) -> JSValue {
    json!({"value": profile.value, "regionalMean": profile.regional_mean})
}

/// The regional explorer: the table of the communes of the region, or the
/// profile of one municipality.
fn explorer_js(
    region: &str,
    region_rows: &[&SurveyRow],
    municipality: Option<&str>,
    p34_fields: &[String],
) -> MonitorResult<JSValue> {
    let municipality = match municipality {
        None => {
            let communes: Vec<JSValue> = sort_by_name(region_rows)
                .iter()
                .map(|r| row_summary_js(r))
                .collect();
            return Ok(json!({
                "region": region,
                "communes": communes,
                "p19Chart": chart_js(region_rows, Metric::P19Average),
                "indexChart": chart_js(region_rows, Metric::DigitalizationIndex),
            }));
        }
        Some(m) => m,
    };

    let p19 = municipality_profile(region_rows, municipality, Metric::P19Average)
        .context(UnknownMunicipalitySnafu { municipality })?;
    let p34 = municipality_profile(region_rows, municipality, Metric::DigitalizationIndex)
        .context(UnknownMunicipalitySnafu { municipality })?;
    let items = active_p34_items(p34.row, p34_fields);
    if items.items.is_empty() {
        info!("explorer_js: {} declares no active P34 system", municipality);
    }
    let active: Vec<JSValue> = items
        .items
        .iter()
        .map(|i| json!({"field": i.field, "label": i.label, "value": i.value}))
        .collect();
    Ok(json!({
        "region": region,
        "municipality": row_summary_js(p34.row),
        "p19": profile_js(&p19),
        "digitalizationIndex": profile_js(&p34),
        "activeP34": active,
        "activeP34Truncated": items.truncated,
    }))
}

/// Finds the region to explore, from the selected region or municipality.
fn selected_scope(ds: &Dataset, valid: &[String], selection: &Selection) -> MonitorResult<Scope> {
    if let Some(region) = &selection.region {
        ensure!(
            valid.contains(region),
            UnknownRegionSnafu {
                region: region.clone()
            }
        );
        return Ok(Scope::Region(region.clone()));
    }
    if let Some(municipality) = &selection.municipality {
        let all: Vec<&SurveyRow> = ds.rows.iter().collect();
        let row = find_municipality(&all, municipality).context(UnknownMunicipalitySnafu {
            municipality: municipality.clone(),
        })?;
        let region = row.region.resolved().context(UnknownRegionSnafu {
            region: row.region_name(),
        })?;
        debug!("selected_scope: {} is in region {}", municipality, region);
        return Ok(Scope::Region(region.to_string()));
    }
    Ok(Scope::Country)
}

pub fn build_report(ds: &Dataset, selection: &Selection) -> MonitorResult<JSValue> {
    let valid = valid_regions(&ds.rows);
    let scope = selected_scope(ds, &valid, selection)?;
    info!("build_report: scope {}", scope.label());

    let all: Vec<&SurveyRow> = ds.rows.iter().collect();
    let scoped = filter_scope(&ds.rows, &scope);

    let maturity: Vec<JSValue> = maturity_distribution(&scoped)
        .into_iter()
        .map(|(level, count)| json!({"level": level.label(), "count": count}))
        .collect();
    let ranking: Vec<JSValue> = ranking(&ds.rows, &scope)
        .iter()
        .map(|r| row_summary_js(r))
        .collect();

    let mut report = json!({
        "fields": {
            "main": ds.main_fields(),
            "p19": ds.p19_fields(),
            "p34": ds.p34_fields(),
        },
        "validRegions": valid,
        "scope": scope.label(),
        "overview": overview_js(&scoped),
        "indexChart": chart_js(&scoped, Metric::DigitalizationIndex),
        "channels": channels_js(&scoped, ds.main_fields()),
        "maturity": maturity,
        "regionMeans": {
            "digitalizationIndex": region_means_js(&ds.rows, Metric::DigitalizationIndex),
            "p19Average": region_means_js(&ds.rows, Metric::P19Average),
        },
        "relation": relation_js(&all),
        "correlation": correlation(&all),
        "ranking": ranking,
    });

    if let Scope::Region(region) = &scope {
        report["explorer"] = explorer_js(
            region,
            &scoped,
            selection.municipality.as_deref(),
            ds.p34_fields(),
        )?;
    }
    Ok(report)
}

/// Reads a report and prints it back in the canonical form used for comparisons.
fn read_reference(path: &str) -> MonitorResult<String> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})
}

pub fn run_monitor(
    settings: Settings,
    selection: &Selection,
    out: Option<String>,
    reference: Option<String>,
) -> MonitorResult<()> {
    info!("settings: {:?}", settings);
    let source = MonitorSource::new(settings)?;
    let mut cache = SnapshotCache::new(source);
    let ds = cache.get();
    ensure!(!ds.is_empty(), DataUnavailableSnafu {});
    info!(
        "run_monitor: {} municipalities, {} valid regions",
        ds.rows.len(),
        valid_regions(&ds.rows).len()
    );

    let report = build_report(&ds, selection)?;
    let pretty_report = serde_json::to_string_pretty(&report).context(ParsingJsonSnafu {})?;

    match out.as_deref() {
        None | Some("stdout") | Some("") => println!("{}", pretty_report),
        Some(path) => {
            info!("run_monitor: writing the report to {}", path);
            fs::write(path, &pretty_report).context(WritingOutputSnafu { path })?;
        }
    }

    // The reference report, if provided for comparison
    if let Some(reference_p) = reference {
        let pretty_reference = read_reference(&reference_p)?;
        if pretty_reference != pretty_report {
            warn!("Found differences with the reference report");
            print_diff(pretty_reference.as_str(), pretty_report.as_str(), "\n");
            whatever!("Difference detected between the computed report and the reference report")
        }
    }
    Ok(())
}

pub fn run_with_args(args: &Args) -> MonitorResult<()> {
    let file_config = match &args.config {
        Some(path) => read_config(path)?,
        None => MonitorConfig::default(),
    };
    let cli_config = MonitorConfig {
        survey_url: args.survey_url.clone(),
        survey_path: args.input.clone(),
        input_type: args.input_type.clone(),
        excel_worksheet_name: args.excel_worksheet_name.clone(),
        geo_dir: args.geo_dir.clone(),
        ..MonitorConfig::default()
    };
    let settings = Settings::from_config(&file_config.merge(cli_config))?;
    let selection = Selection {
        region: args.region.clone(),
        municipality: args.municipality.clone(),
    };
    run_monitor(settings, &selection, args.out.clone(), args.reference.clone())
}
