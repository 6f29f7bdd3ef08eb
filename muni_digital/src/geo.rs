use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

use crate::model::{DpaEntry, RegionAssignment, SurveyRow};
use crate::normalize::normalize_key;

/// Communes whose join result is known to be wrong, with the code of the
/// region they belong to.
///
/// The keys are join keys (see [normalize_key]).
pub const REGION_OVERRIDES: &[(&str, &str)] = &[
    ("SANTIAGO", "13"),
    ("LLAYLLAY", "05"),
    ("LACALERA", "05"),
    ("MARCHIGUE", "06"),
    ("TREHUACO", "16"),
    ("PAIHUANO", "04"),
    ("OHIGGINS", "11"),
];

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ComunaRecord {
    pub code: String,
    pub province_code: String,
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProvinceRecord {
    pub code: String,
    pub region_code: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionRecord {
    pub code: String,
    pub name: String,
}

/// The comparable form of a DPA code.
///
/// The API serves zero-padded text ("05") but numbers (5) are valid too: numeric
/// codes compare by value. Other codes compare as trimmed text.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum CodeKey {
    Number(u64),
    Text(String),
}

pub fn code_key(code: &str) -> CodeKey {
    let code = code.trim();
    match code.parse::<u64>() {
        Ok(n) => CodeKey::Number(n),
        Err(_) => CodeKey::Text(code.to_string()),
    }
}

/// A commune of the reference tables with the name of its region.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct GeoRecord {
    pub comuna_key: String,
    pub region_name: String,
}

// The renaming of the DPA tables into the join schema.
// Incomplete entries cannot take part in the join and are dropped.

pub fn comunas_from_dpa(entries: &[DpaEntry]) -> Vec<ComunaRecord> {
    entries
        .iter()
        .filter_map(|e| match (&e.code, &e.parent_code, &e.name) {
            (Some(code), Some(province_code), Some(name)) => Some(ComunaRecord {
                code: code.clone(),
                province_code: province_code.clone(),
                name: name.clone(),
            }),
            _ => {
                debug!("comunas_from_dpa: dropping incomplete entry {:?}", e);
                None
            }
        })
        .collect()
}

pub fn provinces_from_dpa(entries: &[DpaEntry]) -> Vec<ProvinceRecord> {
    entries
        .iter()
        .filter_map(|e| match (&e.code, &e.parent_code) {
            (Some(code), Some(region_code)) => Some(ProvinceRecord {
                code: code.clone(),
                region_code: region_code.clone(),
            }),
            _ => {
                debug!("provinces_from_dpa: dropping incomplete entry {:?}", e);
                None
            }
        })
        .collect()
}

pub fn regions_from_dpa(entries: &[DpaEntry]) -> Vec<RegionRecord> {
    entries
        .iter()
        .filter_map(|e| match (&e.code, &e.name) {
            (Some(code), Some(name)) => Some(RegionRecord {
                code: code.clone(),
                name: name.clone(),
            }),
            _ => {
                debug!("regions_from_dpa: dropping incomplete entry {:?}", e);
                None
            }
        })
        .collect()
}

/// Joins communes to provinces to regions on their codes (see [code_key]).
///
/// Communes whose province or region is not in the tables are left out. The
/// (key, region) pairs are unique and keep the order of the commune table.
pub fn join_hierarchy(
    comunas: &[ComunaRecord],
    provinces: &[ProvinceRecord],
    regions: &[RegionRecord],
) -> Vec<GeoRecord> {
    let province_regions: HashMap<CodeKey, CodeKey> = provinces
        .iter()
        .map(|p| (code_key(&p.code), code_key(&p.region_code)))
        .collect();
    let region_names: HashMap<CodeKey, &str> = regions
        .iter()
        .map(|r| (code_key(&r.code), r.name.as_str()))
        .collect();

    let mut seen: HashSet<GeoRecord> = HashSet::new();
    let mut res: Vec<GeoRecord> = Vec::new();
    for c in comunas.iter() {
        let region_name = province_regions
            .get(&code_key(&c.province_code))
            .and_then(|region_code| region_names.get(region_code));
        if let Some(region_name) = region_name {
            let rec = GeoRecord {
                comuna_key: normalize_key(&c.name),
                region_name: region_name.to_string(),
            };
            if seen.insert(rec.clone()) {
                res.push(rec);
            }
        } else {
            debug!("join_hierarchy: no region for commune {:?}", c);
        }
    }
    res
}

/// Assigns a region to every survey row.
///
/// When any of the reference tables is empty, the geography is considered
/// unavailable and all the rows are unclassified. Otherwise the rows are
/// matched on their key, the rows without a match are unresolved, and the
/// [REGION_OVERRIDES] are applied last.
pub fn resolve_regions(
    rows: Vec<SurveyRow>,
    comunas: &[ComunaRecord],
    provinces: &[ProvinceRecord],
    regions: &[RegionRecord],
) -> Vec<SurveyRow> {
    if comunas.is_empty() || provinces.is_empty() || regions.is_empty() {
        warn!(
            "resolve_regions: geography unavailable (comunas: {}, provinces: {}, regions: {}), all rows are unclassified",
            comunas.len(),
            provinces.len(),
            regions.len()
        );
        return rows
            .into_iter()
            .map(|row| SurveyRow {
                region: RegionAssignment::Unclassified,
                ..row
            })
            .collect();
    }

    let geo = join_hierarchy(comunas, provinces, regions);
    info!("resolve_regions: {} communes in the reference tables", geo.len());

    let mut key_regions: HashMap<&str, &str> = HashMap::new();
    for rec in geo.iter() {
        let previous = key_regions
            .entry(rec.comuna_key.as_str())
            .or_insert_with(|| rec.region_name.as_str());
        if *previous != rec.region_name.as_str() {
            warn!(
                "resolve_regions: key {} found in regions {} and {}, keeping the first one",
                rec.comuna_key, previous, rec.region_name
            );
        }
    }

    let mut res: Vec<SurveyRow> = rows
        .into_iter()
        .map(|row| {
            let region = match key_regions.get(row.comuna_key.as_str()) {
                Some(name) => RegionAssignment::Resolved(name.to_string()),
                None => {
                    debug!(
                        "resolve_regions: no commune for {:?} (key {})",
                        row.municipality_name, row.comuna_key
                    );
                    RegionAssignment::Unresolved
                }
            };
            SurveyRow { region, ..row }
        })
        .collect();

    apply_overrides(&mut res, regions, REGION_OVERRIDES);
    res
}

/// Overwrites the region of all the rows with an overridden key.
///
/// An override is only applied when its region code is in the region table.
pub fn apply_overrides(rows: &mut [SurveyRow], regions: &[RegionRecord], overrides: &[(&str, &str)]) {
    for (key, region_code) in overrides.iter() {
        let wanted = code_key(region_code);
        let region = match regions.iter().find(|r| code_key(&r.code) == wanted) {
            Some(r) => r,
            None => {
                debug!("apply_overrides: region code {} not found, skipping {}", region_code, key);
                continue;
            }
        };
        for row in rows.iter_mut().filter(|row| row.comuna_key == *key) {
            row.region = RegionAssignment::Resolved(region.name.clone());
        }
    }
}
