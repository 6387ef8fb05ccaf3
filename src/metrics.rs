//! Derived housing indicators computed from a normalized metrics bundle.
//!
//! Availability-driven: a derived metric is computed only when every
//! input is present and non-null and every denominator is non-zero;
//! otherwise the key is simply absent. Missing inputs are not errors.

use crate::types::{LongObservation, MetricsBundle};
use crate::util::round_to;
use std::collections::BTreeMap;

// Fixed business parameters of the affordability estimate, not
// configuration. Numeric parity with published figures depends on these
// exact constants.
const MORTGAGE_RATE: f64 = 0.07;
const TERM_MONTHS: f64 = 360.0;
const DOWN_PAYMENT_SHARE: f64 = 0.20;
const HOUSING_INCOME_SHARE: f64 = 0.28;

/// Group observations into one bundle per (geo_id, period), projecting
/// metric_name -> value. Ordering is deterministic (geo_id, then period).
pub fn build_bundles(observations: &[LongObservation]) -> Vec<MetricsBundle> {
    let mut grouped: BTreeMap<(String, chrono::NaiveDate), MetricsBundle> = BTreeMap::new();
    for obs in observations {
        let key = (obs.geo_id.clone(), obs.period);
        let bundle = grouped
            .entry(key)
            .or_insert_with(|| MetricsBundle::new(obs.geo_id.clone(), obs.period));
        bundle
            .values
            .entry(obs.metric_name.clone())
            .or_insert(obs.value);
    }
    grouped.into_values().collect()
}

/// Numerator / denominator when both are available and the denominator is
/// non-zero; `None` otherwise. The zero guard is what keeps NaN and
/// infinity out of the canonical data.
fn guarded_ratio(bundle: &MetricsBundle, numerator: &str, denominator: &str) -> Option<f64> {
    let n = bundle.get(numerator)?;
    let d = bundle.get(denominator)?;
    if d == 0.0 {
        return None;
    }
    Some(n / d)
}

/// Income needed to afford a home at `value`: 20% down, 7% annual rate,
/// 30-year amortization, 28% of income to housing.
fn income_needed(value: f64) -> f64 {
    let monthly_rate = MORTGAGE_RATE / 12.0;
    let principal = (1.0 - DOWN_PAYMENT_SHARE) * value;
    let monthly_payment =
        principal * monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-TERM_MONTHS));
    (monthly_payment * 12.0 / HOUSING_INCOME_SHARE).round()
}

/// Augmented copy of `bundle` with every derived metric whose inputs are
/// available. The input bundle is never mutated; each derivation is
/// independent of the others.
pub fn derive(bundle: &MetricsBundle) -> MetricsBundle {
    let mut out = bundle.clone();

    if let Some(r) = guarded_ratio(bundle, "vacant_housing_units", "total_housing_units") {
        out.set("vacancy_rate", round_to(r * 100.0, 2));
    }
    if let Some(r) = guarded_ratio(bundle, "owner_occupied_units", "occupied_housing_units") {
        out.set("owner_occupied_pct", round_to(r * 100.0, 2));
    }
    if let Some(r) = guarded_ratio(bundle, "median_home_value", "median_household_income") {
        out.set("price_to_income", round_to(r, 2));
    }
    if let (Some(value), Some(rent)) = (
        bundle.get("median_home_value"),
        bundle.get("median_gross_rent"),
    ) {
        if rent != 0.0 {
            out.set("price_to_rent", round_to(value / (rent * 12.0), 1));
        }
    }
    if let Some(value) = bundle.get("median_home_value") {
        out.set("income_needed", income_needed(value));
    }

    out
}
