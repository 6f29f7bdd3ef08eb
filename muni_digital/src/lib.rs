/*!
Cleaning and enrichment of the survey on the digitalization of the Chilean
municipalities.

The survey is joined with the administrative hierarchy of the DPA
(communes, provinces, regions) and summarized into a few indicators:
the P19 average, the digitalization index (sum of the P34 block) and a
maturity level. See the [manual] for the definitions.

```
use muni_digital::*;

let table = RawTable {
    columns: vec!["MUNICIPALIDAD".to_string(), "P34.1".to_string(), "P34.2".to_string()],
    rows: vec![vec![
        Cell::Text("Municipalidad de Ñuñoa".to_string()),
        Cell::Text("1".to_string()),
        Cell::Text("yes".to_string()),
    ]],
};

struct Offline(RawTable);

impl DataSource for Offline {
    fn fetch_survey(&self) -> Result<RawTable, SourceError> {
        Ok(self.0.clone())
    }
    fn fetch_geo(&self, _level: GeoLevel) -> Result<Vec<DpaEntry>, SourceError> {
        Err(SourceError::Unavailable("offline".to_string()))
    }
}

let ds = build(&Offline(table));
assert_eq!(ds.rows[0].comuna_key, "NUNOA");
assert_eq!(ds.rows[0].digitalization_index, 1);
assert_eq!(ds.rows[0].region, RegionAssignment::Unclassified);
assert!(valid_regions(&ds.rows).is_empty());
```
*/

mod geo;
mod indicators;
pub mod manual;
mod model;
mod normalize;
mod pipeline;
mod views;

pub use crate::geo::*;
pub use crate::indicators::*;
pub use crate::model::*;
pub use crate::normalize::*;
pub use crate::pipeline::*;
pub use crate::views::*;
