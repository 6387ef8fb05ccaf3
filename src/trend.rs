//! Trend extraction over time-series-wide extracts: current-month
//! snapshot and year-over-year change.

use crate::error::PipelineError;
use crate::normalize::{period_columns, period_date, row_identity, NormalizeReport};
use crate::registry::{SourceDescriptor, SourceLayout};
use crate::types::{LongObservation, WideRecord};
use crate::util::{parse_cell, round_to};
use chrono::{DateTime, NaiveDate, Utc};

/// Minimum monthly columns for a year-over-year comparison: the latest
/// month plus the twelve before it.
const YOY_MIN_PERIODS: usize = 13;

/// Year-over-year change for one geography, anchored at the latest month.
/// `yoy_change` is null when the year-ago value is null or zero; a
/// division error never escapes.
#[derive(Debug, Clone)]
pub struct YoyChange {
    pub geo_id: String,
    pub geo_name: String,
    pub period: NaiveDate,
    pub current_value: Option<f64>,
    pub year_ago_value: Option<f64>,
    pub yoy_change: Option<f64>,
}

fn time_series_metric(desc: &SourceDescriptor) -> &'static str {
    match desc.layout {
        SourceLayout::TimeSeriesWide { metric } => metric,
        // Trend math over a coded-variable extract is a caller bug.
        SourceLayout::CodedVariableWide { .. } => {
            panic!("trend extraction requires a time-series-wide source, got {}", desc.id)
        }
    }
}

/// Snapshot of the most recent month: one observation per surviving row
/// for the lexicographically maximal period column. Returns empty when no
/// period column is recognized.
pub fn latest_values(
    records: &[WideRecord],
    desc: &SourceDescriptor,
    ingested_at: DateTime<Utc>,
) -> (Vec<LongObservation>, NormalizeReport) {
    let metric = time_series_metric(desc);
    let mut report = NormalizeReport::default();

    let periods = period_columns(records);
    let Some(latest_col) = periods.last() else {
        return (Vec::new(), report);
    };
    let period = period_date(latest_col).expect("recognized period column must parse");

    let mut out = Vec::new();
    for row in records {
        report.rows_seen += 1;
        let Some((geo_id, geo_name)) = row_identity(row, desc) else {
            report.rows_dropped += 1;
            continue;
        };
        out.push(LongObservation {
            geo_id,
            geo_name,
            geo_level: desc.geo_level,
            metric_name: metric.to_string(),
            period,
            value: row.get(latest_col).and_then(|v| parse_cell(v)),
            source: desc.id.to_string(),
            ingested_at,
        });
        report.observations += 1;
    }
    (out, report)
}

/// Year-over-year percentage change per geography.
///
/// Requires at least [`YOY_MIN_PERIODS`] recognized monthly columns;
/// anything less is a typed `InsufficientHistory`, not a zero-based
/// answer and not a silent empty success.
pub fn year_over_year(
    records: &[WideRecord],
    desc: &SourceDescriptor,
) -> Result<(Vec<YoyChange>, NormalizeReport), PipelineError> {
    let _ = time_series_metric(desc);
    let periods = period_columns(records);
    if periods.len() < YOY_MIN_PERIODS {
        return Err(PipelineError::InsufficientHistory {
            needed: YOY_MIN_PERIODS,
            found: periods.len(),
        });
    }
    let latest_col = &periods[periods.len() - 1];
    let year_ago_col = &periods[periods.len() - YOY_MIN_PERIODS];
    let period = period_date(latest_col).expect("recognized period column must parse");

    let mut report = NormalizeReport::default();
    let mut out = Vec::new();
    for row in records {
        report.rows_seen += 1;
        let Some((geo_id, geo_name)) = row_identity(row, desc) else {
            report.rows_dropped += 1;
            continue;
        };
        let current = row.get(latest_col).and_then(|v| parse_cell(v));
        let year_ago = row.get(year_ago_col).and_then(|v| parse_cell(v));
        let yoy_change = match (current, year_ago) {
            (Some(c), Some(y)) if y != 0.0 => Some(round_to((c - y) / y * 100.0, 2)),
            // Null or zero denominator resolves to null for this row only.
            _ => None,
        };
        out.push(YoyChange {
            geo_id,
            geo_name,
            period,
            current_value: current,
            year_ago_value: year_ago,
            yoy_change,
        });
        report.observations += 1;
    }
    Ok((out, report))
}
