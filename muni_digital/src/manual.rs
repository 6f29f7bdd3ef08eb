/*!

This is the long-form manual for `muni_digital` and `munimonitor`.

## Sources

* The survey of the digitalization of the municipalities, published on
  `datos.gob.cl` as a CSV file (one row per municipality).
* The DPA API (`https://apis.digital.gob.cl/dpa`) for the communes, the
  provinces and the regions.

Only the survey is required. When any of the three DPA tables cannot be
loaded, the municipalities are all reported in the region `Sin clasificar`.
Municipalities that do not match any commune are reported in the region
`Desconocida`. Neither of these two labels is offered as a region filter.

## Matching municipalities and communes

Both names are reduced to a key: accents removed, upper case, without the
`ILUSTRE MUNICIPALIDAD DE`, `MUNICIPALIDAD DE` or `MUNICIPALIDAD` prefix, and
without spaces, hyphens and apostrophes.

| name in the source               | key        |
|----------------------------------|------------|
| `Ilustre Municipalidad de Ñuñoa` | `NUNOA`    |
| `Municipalidad de Llay-Llay`     | `LLAYLLAY` |
| `O'Higgins`                      | `OHIGGINS` |

A few communes do not match (or match the wrong region) and are corrected
with a fixed table, see [crate::REGION_OVERRIDES].

## Indicators

All the questions used below are yes/no questions. A value is counted as a
yes only if it is exactly the number 1. Anything else (0, 2, `yes`, blank)
counts as a no.

### `P10`, `P11`, `P12`

Web site, social networks and online procedures.

### P19 average

The share of the `P19.1` to `P19.11` functions of the IT department that the
municipality declares, between 0 and 1. It is 0 when the survey does not
contain the P19 block.

### Digitalization index

The number of municipal areas with an administration system: the sum of all
the columns starting with `P34`. New `P34` columns are picked up
automatically.

### Maturity level

| index     | level                   |
|-----------|-------------------------|
| 0 to 3    | `Bajo (Iniciando)`      |
| 4 to 7    | `Medio (En desarrollo)` |
| 8 or more | `Alto (Avanzado)`       |

## Configuration

`munimonitor` reads an optional configuration file in JSON:

```text
{
  "surveyUrl": "https://datos.gob.cl/datastore/dump/a6e3cfd1-08d7-4221-abb8-ee6d766a4820?bom=True",
  "dpaBaseUrl": "https://apis.digital.gob.cl/dpa",
  "surveyTimeoutSecs": 30,
  "geoTimeoutSecs": 5,
  "surveyPath": "encuesta.csv",
  "inputType": "csv",
  "geoDir": "dpa"
}
```

All the keys are optional. When `surveyPath` is set, the survey is read from
this file (`csv` or `xlsx`) instead of the URL. When `geoDir` is set, the DPA
tables are read from `comunas.json`, `provincias.json` and `regiones.json` in
this directory. The command line options take precedence over the file.

 */
