use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tabled::Tabled;

/// One raw row of a wide extract, as handed over by the retrieval side:
/// column header -> raw cell text. Lives only for the duration of
/// normalization.
pub type WideRecord = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoLevel {
    Zip,
    Metro,
    State,
    County,
    Place,
    Tract,
}

impl GeoLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            GeoLevel::Zip => "zip",
            GeoLevel::Metro => "metro",
            GeoLevel::State => "state",
            GeoLevel::County => "county",
            GeoLevel::Place => "place",
            GeoLevel::Tract => "tract",
        }
    }
}

/// Canonical long-format unit: one (geography, metric, period) observation.
///
/// `value` stays `None` for blank/sentinel cells; a null must never turn
/// into a zero anywhere downstream. (geo_id, metric_name, period, source)
/// is unique within one normalization pass.
#[derive(Debug, Clone, Serialize)]
pub struct LongObservation {
    pub geo_id: String,
    pub geo_name: String,
    pub geo_level: GeoLevel,
    pub metric_name: String,
    pub period: NaiveDate,
    pub value: Option<f64>,
    pub source: String,
    pub ingested_at: DateTime<Utc>,
}

/// Metric name -> nullable value for a single (geo_id, period).
///
/// Input contract for the derived-metrics calculator and both scorers.
/// An absent key and a present-but-null value both read as "not
/// available" through [`MetricsBundle::get`].
#[derive(Debug, Clone)]
pub struct MetricsBundle {
    pub geo_id: String,
    pub period: NaiveDate,
    pub values: BTreeMap<String, Option<f64>>,
}

impl MetricsBundle {
    pub fn new(geo_id: impl Into<String>, period: NaiveDate) -> Self {
        MetricsBundle {
            geo_id: geo_id.into(),
            period,
            values: BTreeMap::new(),
        }
    }

    /// Available value for a metric, or `None` if the key is absent or null.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied().flatten()
    }

    pub fn set(&mut self, metric: impl Into<String>, value: f64) {
        self.values.insert(metric.into(), Some(value));
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.get(metric).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    Forecast,
    CrashRisk,
}

/// One scored input with its transform output and weight, kept for
/// breakdown reporting. Crash components carry a weight of 1.0.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub score: f64,
    pub weight: f64,
}

/// Composite 0-100 score for one (geo_id, period). Never mutated after
/// creation; a changed bundle produces a new `Score`.
///
/// An empty `components` vector means no input metric was available and
/// the value is the documented no-data sentinel (50 forecast, 30 crash),
/// not a computed result.
#[derive(Debug, Clone, Serialize)]
pub struct Score {
    pub score_type: ScoreType,
    pub geo_id: String,
    pub period: NaiveDate,
    pub value: u8,
    pub components: Vec<ScoreComponent>,
}

impl Score {
    pub fn is_no_data(&self) -> bool {
        self.components.is_empty()
    }
}

/// Console/CSV row for the score report.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ScoreSummaryRow {
    #[serde(rename = "GeoId")]
    #[tabled(rename = "GeoId")]
    pub geo_id: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "ForecastScore")]
    #[tabled(rename = "ForecastScore")]
    pub forecast_score: String,
    #[serde(rename = "CrashRisk")]
    #[tabled(rename = "CrashRisk")]
    pub crash_risk: String,
    #[serde(rename = "Components")]
    #[tabled(rename = "Components")]
    pub components: String,
}

/// Console/CSV row for the year-over-year trend report.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendSummaryRow {
    #[serde(rename = "GeoId")]
    #[tabled(rename = "GeoId")]
    pub geo_id: String,
    #[serde(rename = "GeoName")]
    #[tabled(rename = "GeoName")]
    pub geo_name: String,
    #[serde(rename = "CurrentValue")]
    #[tabled(rename = "CurrentValue")]
    pub current_value: String,
    #[serde(rename = "YearAgoValue")]
    #[tabled(rename = "YearAgoValue")]
    pub year_ago_value: String,
    #[serde(rename = "YoYChange")]
    #[tabled(rename = "YoYChange")]
    pub yoy_change: String,
}
