//! Read-only projections of the dataset, as consumed by the display layer.
//!
//! All the functions work on slices of borrowed rows, so that the views can be
//! chained (filter by region, then rank, then truncate) without copying the
//! dataset.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::*;

/// Maximum number of bars in a ranked chart.
pub const TOP_N: usize = 20;

/// Maximum width of a municipality label in a chart.
pub const LABEL_WIDTH: usize = 16;

pub const COUNTRY_LABEL: &str = "Todo el país";

/// The indicator a chart or a ranking is built on.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Metric {
    DigitalizationIndex,
    P19Average,
}

impl Metric {
    pub fn value(&self, row: &SurveyRow) -> f64 {
        match self {
            Metric::DigitalizationIndex => row.digitalization_index as f64,
            Metric::P19Average => row.p19_average,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::DigitalizationIndex => "Índice de digitalización (P34)",
            Metric::P19Average => "Digitalización interna (P19)",
        }
    }
}

/// The part of the country a view is restricted to.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Scope {
    Country,
    Region(String),
}

impl Scope {
    pub fn label(&self) -> &str {
        match self {
            Scope::Country => COUNTRY_LABEL,
            Scope::Region(name) => name.as_str(),
        }
    }

    pub fn contains(&self, row: &SurveyRow) -> bool {
        match self {
            Scope::Country => true,
            Scope::Region(name) => row.region.resolved() == Some(name.as_str()),
        }
    }
}

/// A list cut to a maximum length, remembering if something was left out.
#[derive(PartialEq, Debug, Clone)]
pub struct Truncated<T> {
    pub items: Vec<T>,
    pub truncated: bool,
}

impl<T> Truncated<T> {
    pub fn new(mut items: Vec<T>, max_len: usize) -> Truncated<T> {
        let truncated = items.len() > max_len;
        items.truncate(max_len);
        Truncated { items, truncated }
    }
}

/// The regions that can be selected: the resolved names, sorted.
pub fn valid_regions(rows: &[SurveyRow]) -> Vec<String> {
    let names: BTreeSet<&str> = rows.iter().filter_map(|r| r.region.resolved()).collect();
    names.into_iter().map(|s| s.to_string()).collect()
}

pub fn filter_scope<'a>(rows: &'a [SurveyRow], scope: &Scope) -> Vec<&'a SurveyRow> {
    rows.iter().filter(|r| scope.contains(r)).collect()
}

/// The first row with exactly this municipality name.
pub fn find_municipality<'a>(rows: &[&'a SurveyRow], name: &str) -> Option<&'a SurveyRow> {
    rows.iter().find(|r| r.municipality_name == name).cloned()
}

/// The distinct municipality names, sorted.
pub fn municipality_names(rows: &[&SurveyRow]) -> Vec<String> {
    let names: BTreeSet<&str> = rows.iter().map(|r| r.municipality_name.as_str()).collect();
    names.into_iter().map(|s| s.to_string()).collect()
}

pub fn sort_by_name<'a>(rows: &[&'a SurveyRow]) -> Vec<&'a SurveyRow> {
    let mut res = rows.to_vec();
    res.sort_by(|a, b| a.municipality_name.cmp(&b.municipality_name));
    res
}

fn sort_descending<'a>(rows: &[&'a SurveyRow], metric: Metric) -> Vec<&'a SurveyRow> {
    let mut res = rows.to_vec();
    res.sort_by(|a, b| metric.value(b).total_cmp(&metric.value(a)));
    res
}

/// The rows with the highest values of the metric, at most `n` of them.
pub fn top_n<'a>(rows: &[&'a SurveyRow], metric: Metric, n: usize) -> Truncated<&'a SurveyRow> {
    Truncated::new(sort_descending(rows, metric), n)
}

/// All the rows of the scope, by decreasing digitalization index.
pub fn ranking<'a>(rows: &'a [SurveyRow], scope: &Scope) -> Vec<&'a SurveyRow> {
    sort_descending(&filter_scope(rows, scope), Metric::DigitalizationIndex)
}

pub fn mean(rows: &[&SurveyRow], metric: Metric) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let total: f64 = rows.iter().map(|r| metric.value(r)).sum();
    Some(total / rows.len() as f64)
}

/// The key figures of a view.
#[derive(PartialEq, Debug, Clone)]
pub struct Overview {
    pub municipalities: usize,
    pub mean_digitalization_index: f64,
    pub mean_p19_average: f64,
    pub high_maturity: usize,
}

/// None when the view is empty.
pub fn overview(rows: &[&SurveyRow]) -> Option<Overview> {
    Some(Overview {
        municipalities: rows.len(),
        mean_digitalization_index: mean(rows, Metric::DigitalizationIndex)?,
        mean_p19_average: mean(rows, Metric::P19Average)?,
        high_maturity: rows
            .iter()
            .filter(|r| r.maturity_level == MaturityLevel::High)
            .count(),
    })
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct FlagSplit {
    pub yes: usize,
    pub no: usize,
}

/// How many municipalities answered yes and no to a question.
///
/// None when the question is not in the dataset or the view is empty.
pub fn flag_split(rows: &[&SurveyRow], field: &str) -> Option<FlagSplit> {
    if !rows.iter().any(|r| r.binary.contains_key(field)) {
        return None;
    }
    let yes = rows.iter().filter(|r| r.flag(field) == Some(1)).count();
    Some(FlagSplit {
        yes,
        no: rows.len() - yes,
    })
}

/// Number of municipalities per maturity level, from the highest level down.
/// Levels without municipalities are included.
pub fn maturity_distribution(rows: &[&SurveyRow]) -> Vec<(MaturityLevel, usize)> {
    MaturityLevel::DESCENDING
        .iter()
        .map(|level| {
            let count = rows.iter().filter(|r| r.maturity_level == *level).count();
            (*level, count)
        })
        .collect()
}

/// The (P19 average, digitalization index) points of each maturity level,
/// from the highest level down.
pub fn maturity_relation(rows: &[&SurveyRow]) -> Vec<(MaturityLevel, Vec<(f64, u32)>)> {
    MaturityLevel::DESCENDING
        .iter()
        .map(|level| {
            let points = rows
                .iter()
                .filter(|r| r.maturity_level == *level)
                .map(|r| (r.p19_average, r.digitalization_index))
                .collect();
            (*level, points)
        })
        .collect()
}

/// The mean of the metric in each valid region, by increasing mean.
pub fn region_means(rows: &[SurveyRow], metric: Metric) -> Vec<(String, f64)> {
    let mut groups: BTreeMap<&str, Vec<&SurveyRow>> = BTreeMap::new();
    for row in rows.iter() {
        if let Some(name) = row.region.resolved() {
            groups.entry(name).or_default().push(row);
        }
    }
    let mut res: Vec<(String, f64)> = groups
        .iter()
        .filter_map(|(name, group)| mean(group, metric).map(|m| (name.to_string(), m)))
        .collect();
    res.sort_by(|a, b| a.1.total_cmp(&b.1));
    res
}

/// Pearson correlation between the P19 average and the digitalization index.
///
/// None with fewer than two rows or when one of the indicators is constant.
pub fn correlation(rows: &[&SurveyRow]) -> Option<f64> {
    if rows.len() < 2 {
        return None;
    }
    let xs: Vec<f64> = rows.iter().map(|r| Metric::P19Average.value(r)).collect();
    let ys: Vec<f64> = rows
        .iter()
        .map(|r| Metric::DigitalizationIndex.value(r))
        .collect();
    let n = rows.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// A municipality compared with the mean of its region.
#[derive(PartialEq, Debug, Clone)]
pub struct MunicipalityProfile<'a> {
    pub row: &'a SurveyRow,
    pub value: f64,
    pub regional_mean: f64,
}

pub fn municipality_profile<'a>(
    region_rows: &[&'a SurveyRow],
    name: &str,
    metric: Metric,
) -> Option<MunicipalityProfile<'a>> {
    let row = find_municipality(region_rows, name)?;
    Some(MunicipalityProfile {
        row,
        value: metric.value(row),
        regional_mean: mean(region_rows, metric)?,
    })
}

/// A P34 system declared by a municipality.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct P34Item {
    pub field: String,
    pub label: String,
    pub value: u8,
}

/// The P34 systems active in a municipality, in the order of the schema.
pub fn active_p34_items(row: &SurveyRow, p34_fields: &[String]) -> Truncated<P34Item> {
    let items: Vec<P34Item> = p34_fields
        .iter()
        .filter_map(|f| match row.flag(f) {
            Some(value) if value > 0 => Some(P34Item {
                field: f.clone(),
                label: f.replace(P34_PREFIX, "").replace('_', " ").trim().to_string(),
                value,
            }),
            _ => None,
        })
        .collect();
    Truncated::new(items, TOP_N)
}

/// Shortens a label to at most `max_len` characters, ending with "...".
pub fn abbreviate(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        return name.to_string();
    }
    let mut res: String = name.chars().take(max_len.saturating_sub(3)).collect();
    res.push_str("...");
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, region: RegionAssignment, index: u32, p19: f64) -> SurveyRow {
        let mut r = SurveyRow::new(name.to_string(), name.to_uppercase(), BTreeMap::new());
        r.region = region;
        r.digitalization_index = index;
        r.p19_average = p19;
        r.maturity_level = MaturityLevel::from_index(index);
        r
    }

    fn resolved(name: &str) -> RegionAssignment {
        RegionAssignment::Resolved(name.to_string())
    }

    fn sample() -> Vec<SurveyRow> {
        vec![
            row("Ñuñoa", resolved("Metropolitana"), 10, 0.9),
            row("Maipú", resolved("Metropolitana"), 6, 0.5),
            row("Valparaíso", resolved("Valparaíso"), 2, 0.2),
            row("Atlantis", RegionAssignment::Unresolved, 4, 0.4),
            row("Lemuria", RegionAssignment::Unclassified, 0, 0.0),
        ]
    }

    fn all(rows: &[SurveyRow]) -> Vec<&SurveyRow> {
        rows.iter().collect()
    }

    #[test]
    fn valid_regions_exclude_the_sentinels() {
        let rows = sample();
        assert_eq!(valid_regions(&rows), vec!["Metropolitana", "Valparaíso"]);

        let unclassified: Vec<SurveyRow> = rows
            .into_iter()
            .map(|r| SurveyRow {
                region: RegionAssignment::Unclassified,
                ..r
            })
            .collect();
        assert!(valid_regions(&unclassified).is_empty());
    }

    #[test]
    fn scope_filters_on_the_region_name() {
        let rows = sample();
        assert_eq!(filter_scope(&rows, &Scope::Country).len(), 5);
        let metro = filter_scope(&rows, &Scope::Region("Metropolitana".to_string()));
        assert_eq!(municipality_names(&metro), vec!["Maipú", "Ñuñoa"]);
        // The sentinels are not regions.
        assert!(filter_scope(&rows, &Scope::Region("Desconocida".to_string())).is_empty());
    }

    #[test]
    fn top_n_truncates_long_lists() {
        let rows: Vec<SurveyRow> = (0..25)
            .map(|i| row(&format!("M{}", i), resolved("R"), i, 0.0))
            .collect();
        let top = top_n(&all(&rows), Metric::DigitalizationIndex, TOP_N);
        assert!(top.truncated);
        assert_eq!(top.items.len(), 20);
        assert_eq!(top.items[0].municipality_name, "M24");
        assert_eq!(top.items[19].municipality_name, "M5");

        let small = top_n(&all(&rows[..3]), Metric::DigitalizationIndex, TOP_N);
        assert!(!small.truncated);
        assert_eq!(small.items.len(), 3);
    }

    #[test]
    fn ranking_is_by_decreasing_index() {
        let rows = sample();
        let names: Vec<&str> = ranking(&rows, &Scope::Country)
            .iter()
            .map(|r| r.municipality_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ñuñoa", "Maipú", "Atlantis", "Valparaíso", "Lemuria"]);
        assert_eq!(ranking(&rows, &Scope::Region("Valparaíso".to_string())).len(), 1);
    }

    #[test]
    fn overview_of_a_view() {
        let rows = sample();
        let ov = overview(&all(&rows)).unwrap();
        assert_eq!(ov.municipalities, 5);
        assert_eq!(ov.mean_digitalization_index, 4.4);
        assert_eq!(ov.high_maturity, 1);
        assert!(overview(&[]).is_none());
    }

    #[test]
    fn flag_split_counts_answers() {
        let mut rows = sample();
        rows[0].binary.insert("P10".to_string(), 1);
        rows[1].binary.insert("P10".to_string(), 0);
        rows[2].binary.insert("P10".to_string(), 1);
        let split = flag_split(&all(&rows), "P10").unwrap();
        assert_eq!(split, FlagSplit { yes: 2, no: 3 });
        assert!(flag_split(&all(&rows), "P12").is_none());
        assert!(flag_split(&[], "P10").is_none());
    }

    #[test]
    fn maturity_distribution_keeps_empty_levels() {
        let rows = sample();
        let dist = maturity_distribution(&all(&rows[2..3]));
        assert_eq!(
            dist,
            vec![
                (MaturityLevel::High, 0),
                (MaturityLevel::Medium, 0),
                (MaturityLevel::Low, 1)
            ]
        );
        let dist = maturity_distribution(&all(&rows));
        assert_eq!(dist.iter().map(|(_, c)| c).sum::<usize>(), 5);
    }

    #[test]
    fn relation_points_by_maturity_level() {
        let rows = sample();
        let relation = maturity_relation(&all(&rows));
        assert_eq!(
            relation,
            vec![
                (MaturityLevel::High, vec![(0.9, 10)]),
                (MaturityLevel::Medium, vec![(0.5, 6), (0.4, 4)]),
                (MaturityLevel::Low, vec![(0.2, 2), (0.0, 0)]),
            ]
        );
    }

    #[test]
    fn region_means_by_increasing_value() {
        let rows = sample();
        let means = region_means(&rows, Metric::DigitalizationIndex);
        assert_eq!(
            means,
            vec![("Valparaíso".to_string(), 2.0), ("Metropolitana".to_string(), 8.0)]
        );
    }

    #[test]
    fn correlation_of_the_indicators() {
        let rows = sample();
        let c = correlation(&all(&rows)).unwrap();
        assert!(c > 0.9 && c <= 1.0);
        assert!(correlation(&all(&rows[..1])).is_none());
        let flat = vec![
            row("A", resolved("R"), 3, 0.5),
            row("B", resolved("R"), 5, 0.5),
        ];
        assert!(correlation(&all(&flat)).is_none());
    }

    #[test]
    fn profile_against_the_regional_mean() {
        let rows = sample();
        let metro = filter_scope(&rows, &Scope::Region("Metropolitana".to_string()));
        let p = municipality_profile(&metro, "Maipú", Metric::DigitalizationIndex).unwrap();
        assert_eq!(p.value, 6.0);
        assert_eq!(p.regional_mean, 8.0);
        assert!(municipality_profile(&metro, "Valparaíso", Metric::P19Average).is_none());
    }

    #[test]
    fn active_p34_items_with_labels() {
        let mut r = row("Ñuñoa", resolved("Metropolitana"), 2, 0.0);
        r.binary.insert("P34.1".to_string(), 1);
        r.binary.insert("P34.2".to_string(), 0);
        r.binary.insert("P34_salud_municipal".to_string(), 1);
        let fields: Vec<String> = ["P34.1", "P34.2", "P34_salud_municipal"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let items = active_p34_items(&r, &fields);
        assert!(!items.truncated);
        let labels: Vec<&str> = items.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec![".1", "salud municipal"]);
    }

    #[test]
    fn abbreviate_long_names() {
        assert_eq!(abbreviate("Ñuñoa", LABEL_WIDTH), "Ñuñoa");
        assert_eq!(abbreviate("Pedro Aguirre Cerda", LABEL_WIDTH), "Pedro Aguirre...");
        assert_eq!(abbreviate("Pedro Aguirre Cerda", LABEL_WIDTH).chars().count(), 16);
        assert_eq!(abbreviate("0123456789abcdef", LABEL_WIDTH), "0123456789abcdef");
    }
}
