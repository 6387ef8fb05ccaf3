//! Composite 0-100 scoring over a metrics bundle.
//!
//! Both scorers are stateless pure functions: component transforms clamp
//! to 0..=100 individually, aggregation averages whatever components are
//! available, and rounding to an integer happens exactly once at the end.

use crate::types::{MetricsBundle, Score, ScoreComponent, ScoreType};

/// Sentinel returned when no forecast input is available. A "no data"
/// signal (empty component breakdown), not a computed neutral.
pub const FORECAST_NO_DATA: u8 = 50;

/// Sentinel returned when no crash-risk input is available.
pub const CRASH_NO_DATA: u8 = 30;

fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Near-term price-forecast favorability: weighted average of whichever
/// components have inputs in the bundle. Absent components drop out of
/// both the numerator and the weight denominator.
///
/// Components (input, transform, weight):
/// - inventory: `inventory_vs_avg`, `100 - (ratio - 1) * 50`, 0.20
/// - days_on_market: `days_on_market`, `100 - (dom - 30) * 1.5`, 0.20
/// - price_cuts: `price_cut_pct`, `100 - pct * 3`, 0.20
/// - appreciation: `yoy_price_change`, `50 + yoy * 5`, 0.25
/// - rate_impact: `mortgage_rate`, `100 - (rate - 5) * 15`, 0.15
pub fn forecast_score(bundle: &MetricsBundle) -> Score {
    let mut components: Vec<ScoreComponent> = Vec::new();
    let mut push = |name: &'static str, score: f64, weight: f64| {
        components.push(ScoreComponent {
            name,
            score: clamp_score(score),
            weight,
        });
    };

    if let Some(ratio) = bundle.get("inventory_vs_avg") {
        push("inventory", 100.0 - (ratio - 1.0) * 50.0, 0.20);
    }
    if let Some(dom) = bundle.get("days_on_market") {
        push("days_on_market", 100.0 - (dom - 30.0) * 1.5, 0.20);
    }
    if let Some(pct) = bundle.get("price_cut_pct") {
        push("price_cuts", 100.0 - pct * 3.0, 0.20);
    }
    if let Some(yoy) = bundle.get("yoy_price_change") {
        push("appreciation", 50.0 + yoy * 5.0, 0.25);
    }
    if let Some(rate) = bundle.get("mortgage_rate") {
        push("rate_impact", 100.0 - (rate - 5.0) * 15.0, 0.15);
    }

    let value = if components.is_empty() {
        FORECAST_NO_DATA
    } else {
        let total_weight: f64 = components.iter().map(|c| c.weight).sum();
        let weighted_sum: f64 = components.iter().map(|c| c.score * c.weight).sum();
        (weighted_sum / total_weight).round() as u8
    };

    Score {
        score_type: ScoreType::Forecast,
        geo_id: bundle.geo_id.clone(),
        period: bundle.period,
        value,
        components,
    }
}

/// Crash-potential score: simple (unweighted) average of whichever risk
/// components have inputs. Higher = more risk.
///
/// Components (input, transform):
/// - price_to_income: `(pti - 3) * 25` (3x income is healthy, 5x+ risky)
/// - rapid_appreciation: `three_year_appreciation`, `(app3y - 15) * 2`
/// - inventory_surge: `inventory_yoy_change`, `change * 1.5`
pub fn crash_risk_score(bundle: &MetricsBundle) -> Score {
    let mut components: Vec<ScoreComponent> = Vec::new();
    let mut push = |name: &'static str, score: f64| {
        components.push(ScoreComponent {
            name,
            score: clamp_score(score),
            weight: 1.0,
        });
    };

    if let Some(pti) = bundle.get("price_to_income") {
        push("price_to_income", (pti - 3.0) * 25.0);
    }
    if let Some(app3y) = bundle.get("three_year_appreciation") {
        push("rapid_appreciation", (app3y - 15.0) * 2.0);
    }
    if let Some(change) = bundle.get("inventory_yoy_change") {
        push("inventory_surge", change * 1.5);
    }

    let value = if components.is_empty() {
        CRASH_NO_DATA
    } else {
        let sum: f64 = components.iter().map(|c| c.score).sum();
        (sum / components.len() as f64).round() as u8
    };

    Score {
        score_type: ScoreType::CrashRisk,
        geo_id: bundle.geo_id.clone(),
        period: bundle.period,
        value,
        components,
    }
}
