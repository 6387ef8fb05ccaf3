//! Wide-to-long normalizer: heterogeneous wide extracts in, canonical
//! `LongObservation` rows out.
//!
//! Layout handling is driven entirely by the source descriptor; there is
//! no per-source logic here.

use crate::error::PipelineError;
use crate::registry::{SourceDescriptor, SourceLayout};
use crate::types::{LongObservation, WideRecord};
use crate::util::parse_cell;
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use std::collections::{BTreeSet, HashSet};

/// Per-batch diagnostics. Row-level problems never abort the batch; they
/// are counted here for the caller to report.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub rows_seen: usize,
    pub observations: usize,
    /// Rows with every identifier column blank or missing.
    pub rows_dropped: usize,
    /// Repeated (geo_id, metric, period) keys within the batch; the first
    /// occurrence wins.
    pub duplicates_skipped: usize,
}

/// Recognizes the fixed 7-character `YYYY-MM` month tokens that mark a
/// time-series column. Anything else is either an identifier or metadata.
pub fn is_period_column(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 7
        && b[4] == b'-'
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[5..].iter().all(u8::is_ascii_digit)
}

/// Month token -> first-of-month date. `None` for out-of-range months.
pub fn period_date(token: &str) -> Option<NaiveDate> {
    if !is_period_column(token) {
        return None;
    }
    let year: i32 = token[..4].parse().ok()?;
    let month: u32 = token[5..].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Recognized period columns across the batch, sorted ascending. The
/// `YYYY-MM` token format makes lexicographic order chronological.
pub fn period_columns(records: &[WideRecord]) -> Vec<String> {
    let cols: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.keys())
        .filter(|c| period_date(c).is_some())
        .cloned()
        .collect();
    cols.into_iter().collect()
}

/// Geography identity for one row, or `None` when every identifier column
/// is blank/missing and the row must be dropped.
pub(crate) fn row_identity(row: &WideRecord, desc: &SourceDescriptor) -> Option<(String, String)> {
    let cell = |col: &str| {
        row.get(col)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let first_present = desc.id_columns.iter().find_map(|c| cell(c))?;
    let geo_id = cell(desc.geo_id_column()).unwrap_or_else(|| first_present.clone());
    let geo_name = cell(desc.geo_name_column()).unwrap_or_else(|| geo_id.clone());
    Some((geo_id, geo_name))
}

/// Convert a wide batch into long observations.
///
/// `survey_period` is the shared period for coded-variable extracts (all
/// variables in one extract belong to one survey year); time-series
/// extracts carry their periods in the column headers and ignore it.
pub fn normalize(
    records: &[WideRecord],
    desc: &SourceDescriptor,
    survey_period: NaiveDate,
    ingested_at: DateTime<Utc>,
) -> Result<(Vec<LongObservation>, NormalizeReport), PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::EmptyBatch(desc.id.to_string()));
    }

    let mut report = NormalizeReport::default();
    let mut seen: HashSet<(String, String, NaiveDate)> = HashSet::new();
    let mut out: Vec<LongObservation> = Vec::new();

    let mut emit = |geo_id: &str,
                    geo_name: &str,
                    metric: &str,
                    period: NaiveDate,
                    value: Option<f64>,
                    report: &mut NormalizeReport| {
        let key = (geo_id.to_string(), metric.to_string(), period);
        if !seen.insert(key) {
            report.duplicates_skipped += 1;
            return;
        }
        out.push(LongObservation {
            geo_id: geo_id.to_string(),
            geo_name: geo_name.to_string(),
            geo_level: desc.geo_level,
            metric_name: metric.to_string(),
            period,
            value,
            source: desc.id.to_string(),
            ingested_at,
        });
        report.observations += 1;
    };

    match desc.layout {
        SourceLayout::TimeSeriesWide { metric } => {
            let periods: Vec<(String, NaiveDate)> = period_columns(records)
                .into_iter()
                .filter_map(|c| period_date(&c).map(|d| (c, d)))
                .collect();
            for row in records {
                report.rows_seen += 1;
                let Some((geo_id, geo_name)) = row_identity(row, desc) else {
                    report.rows_dropped += 1;
                    continue;
                };
                for (col, period) in &periods {
                    let value = row.get(col).and_then(|v| parse_cell(v));
                    emit(&geo_id, &geo_name, metric, *period, value, &mut report);
                }
            }
        }
        SourceLayout::CodedVariableWide { variable_map } => {
            // An empty variable map is a descriptor bug, not a data problem.
            assert!(
                !variable_map.is_empty(),
                "coded-variable source {} has an empty variable map",
                desc.id
            );
            for row in records {
                report.rows_seen += 1;
                let Some((geo_id, geo_name)) = row_identity(row, desc) else {
                    report.rows_dropped += 1;
                    continue;
                };
                for (code, metric) in variable_map {
                    // Only codes actually present in the extract emit rows.
                    let Some(raw) = row.get(*code) else { continue };
                    let value = parse_cell(raw);
                    emit(&geo_id, &geo_name, metric, survey_period, value, &mut report);
                }
            }
        }
    }

    Ok((out, report))
}

/// Read a headered wide CSV into raw records. Stands in for the upstream
/// retrieval collaborator in the CLI driver.
pub fn read_wide_csv(path: &str) -> Result<Vec<WideRecord>, PipelineError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize::<WideRecord>() {
        rows.push(result?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::describe;
    use chrono::Datelike;

    fn record(pairs: &[(&str, &str)]) -> WideRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn survey() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
    }

    #[test]
    fn recognizes_month_tokens_only() {
        assert!(is_period_column("2024-01"));
        assert!(is_period_column("1999-12"));
        assert!(!is_period_column("2024-1"));
        assert!(!is_period_column("RegionID"));
        assert!(!is_period_column("2024/01"));
        assert!(!is_period_column("SizeRank"));
        // Token shape alone is not enough; the month must exist.
        assert!(period_date("2024-13").is_none());
        assert_eq!(
            period_date("2024-02"),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn time_series_row_count_is_rows_times_periods() {
        let desc = describe("zhvi_metro").unwrap();
        let rows = vec![
            record(&[
                ("RegionID", "394913"),
                ("RegionName", "New York, NY"),
                ("SizeRank", "1"),
                ("2024-01", "650000"),
                ("2024-02", "652000"),
            ]),
            record(&[
                ("RegionID", "753899"),
                ("RegionName", "Austin, TX"),
                ("SizeRank", "28"),
                ("2024-01", "450000"),
                ("2024-02", ""),
            ]),
        ];
        let (obs, report) = normalize(&rows, desc, survey(), now()).unwrap();
        assert_eq!(report.rows_seen, 2);
        assert_eq!(report.rows_dropped, 0);
        assert_eq!(obs.len(), 2 * 2);
        // SizeRank is metadata: ignored, never an observation.
        assert!(obs.iter().all(|o| o.metric_name == "home_value_index"));
        // Blank cell becomes a null value, not zero.
        let austin_feb = obs
            .iter()
            .find(|o| o.geo_id == "753899" && o.period.month() == 2)
            .unwrap();
        assert_eq!(austin_feb.value, None);
        assert_eq!(austin_feb.period.year(), 2024);
    }

    #[test]
    fn rows_without_any_identifier_are_dropped_not_fatal() {
        let desc = describe("zhvi_metro").unwrap();
        let rows = vec![
            record(&[("RegionID", ""), ("RegionName", " "), ("2024-01", "100")]),
            record(&[
                ("RegionID", "1"),
                ("RegionName", "Somewhere"),
                ("2024-01", "100"),
            ]),
        ];
        let (obs, report) = normalize(&rows, desc, survey(), now()).unwrap();
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(obs.len(), 1);
    }

    #[test]
    fn sentinel_cells_normalize_to_null() {
        let desc = describe("price_cuts_metro").unwrap();
        let rows = vec![record(&[
            ("RegionID", "10"),
            ("RegionName", "Boise, ID"),
            ("2024-01", "-"),
            ("2024-02", "12.4"),
        ])];
        let (obs, _) = normalize(&rows, desc, survey(), now()).unwrap();
        let by_month: Vec<Option<f64>> = {
            let mut v = obs.clone();
            v.sort_by_key(|o| o.period);
            v.into_iter().map(|o| o.value).collect()
        };
        assert_eq!(by_month, vec![None, Some(12.4)]);
    }

    #[test]
    fn coded_layout_maps_variable_codes_to_metrics() {
        let desc = describe("census_acs_zip").unwrap();
        let rows = vec![record(&[
            ("zip code tabulation area", "83702"),
            ("NAME", "ZCTA5 83702"),
            ("B25077_001E", "485000"),
            ("B19013_001E", "68000"),
            ("B25064_001E", "-"),
            ("UNLISTED_CODE", "7"),
        ])];
        let (obs, report) = normalize(&rows, desc, survey(), now()).unwrap();
        // Only mapped codes present in the row emit observations.
        assert_eq!(obs.len(), 3);
        assert_eq!(report.observations, 3);
        let value_of = |m: &str| obs.iter().find(|o| o.metric_name == m).map(|o| o.value);
        assert_eq!(value_of("median_home_value"), Some(Some(485000.0)));
        assert_eq!(value_of("median_household_income"), Some(Some(68000.0)));
        assert_eq!(value_of("median_gross_rent"), Some(None));
        assert!(obs.iter().all(|o| o.period == survey()));
        assert!(obs.iter().all(|o| o.geo_id == "83702"));
    }

    #[test]
    fn duplicate_keys_collapse_within_one_batch() {
        let desc = describe("zhvi_metro").unwrap();
        let row = record(&[
            ("RegionID", "394913"),
            ("RegionName", "New York, NY"),
            ("2024-01", "650000"),
        ]);
        let rows = vec![row.clone(), row];
        let (obs, report) = normalize(&rows, desc, survey(), now()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(report.duplicates_skipped, 1);

        // Re-running on identical input yields the same keyed set, so a
        // keyed upsert downstream collapses to the same record count.
        let rows2 = vec![record(&[
            ("RegionID", "394913"),
            ("RegionName", "New York, NY"),
            ("2024-01", "650000"),
        ])];
        let (obs2, _) = normalize(&rows2, desc, survey(), now()).unwrap();
        assert_eq!(obs2.len(), obs.len());
        assert_eq!(obs2[0].geo_id, obs[0].geo_id);
        assert_eq!(obs2[0].period, obs[0].period);
    }

    #[test]
    fn empty_batch_is_a_typed_error() {
        let desc = describe("zhvi_metro").unwrap();
        match normalize(&[], desc, survey(), now()) {
            Err(PipelineError::EmptyBatch(id)) => assert_eq!(id, "zhvi_metro"),
            other => panic!("expected EmptyBatch, got {other:?}"),
        }
    }
}
