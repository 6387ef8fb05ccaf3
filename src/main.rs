// Entry point and high-level CLI flow.
//
// The pipeline core is pure; this driver wires the seams together:
// - Option [1] reads a wide extract from disk, normalizes it against its
//   source descriptor, and prints batch diagnostics.
// - Option [2] runs the trend calculator, the derived-metrics pass, and
//   both composite scorers over the loaded batch, exporting CSV/JSON.
// - Option [3] lists the configured source catalog.
mod error;
mod metrics;
mod normalize;
mod output;
mod registry;
mod score;
mod trend;
mod types;
mod util;

use chrono::{NaiveDate, Utc};
use error::PipelineError;
use once_cell::sync::Lazy;
use registry::{SourceDescriptor, SourceLayout};
use std::io::{self, Write};
use std::sync::Mutex;
use types::{LongObservation, MetricsBundle, ScoreSummaryRow, TrendSummaryRow, WideRecord};

// Simple in-memory app state so one loaded extract can feed several
// report runs in a single session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        records: None,
        descriptor: None,
        observations: None,
    })
});

struct AppState {
    records: Option<Vec<WideRecord>>,
    descriptor: Option<&'static SourceDescriptor>,
    observations: Option<Vec<LongObservation>>,
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to go back to the menu after generating reports.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: read, normalize, and stash a wide extract.
fn handle_load() {
    let source_id = read_line("Source id (e.g. zhvi_metro, census_acs_zip): ");
    let descriptor = match registry::describe(&source_id) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}\n", e);
            return;
        }
    };

    let path = read_line("CSV path: ");
    let survey_year: i32 = match read_line("Survey year [2022]: ").as_str() {
        "" => 2022,
        s => match s.parse() {
            Ok(y) => y,
            Err(_) => {
                eprintln!("Invalid year: {}\n", s);
                return;
            }
        },
    };
    // Survey extracts share one period; month columns override it.
    let survey_period = NaiveDate::from_ymd_opt(survey_year, 1, 1)
        .expect("January 1 exists for any year");

    let run = || -> Result<(), PipelineError> {
        let records = normalize::read_wide_csv(&path)?;
        let (observations, report) =
            normalize::normalize(&records, descriptor, survey_period, Utc::now())?;

        println!(
            "Normalized {} rows into {} observations ({} level, source {}).",
            util::format_int(report.rows_seen as i64),
            util::format_int(report.observations as i64),
            descriptor.geo_level.as_str(),
            descriptor.id
        );
        if report.rows_dropped > 0 {
            println!(
                "Note: {} rows dropped (no identifier columns).",
                util::format_int(report.rows_dropped as i64)
            );
        }
        if report.duplicates_skipped > 0 {
            println!(
                "Note: {} duplicate observation keys skipped.",
                util::format_int(report.duplicates_skipped as i64)
            );
        }

        let file = "observations_long.csv";
        if let Err(e) = output::write_csv(file, &observations) {
            eprintln!("Write error: {}", e);
        } else {
            println!("(Canonical long-format rows exported to {})", file);
        }
        println!();

        let mut state = APP_STATE.lock().unwrap();
        state.records = Some(records);
        state.descriptor = Some(descriptor);
        state.observations = Some(observations);
        Ok(())
    };

    if let Err(e) = run() {
        eprintln!("Failed to load extract: {}\n", e);
    }
}

/// Bundles for scoring: one per geography at the latest period, with the
/// home-value year-over-year change folded in as `yoy_price_change`.
fn scoring_bundles(
    records: &[WideRecord],
    descriptor: &SourceDescriptor,
    observations: &[LongObservation],
) -> (Vec<MetricsBundle>, Vec<TrendSummaryRow>) {
    let mut trend_rows = Vec::new();

    match descriptor.layout {
        SourceLayout::TimeSeriesWide { .. } => {
            let (latest, _) = trend::latest_values(records, descriptor, Utc::now());
            let mut bundles = metrics::build_bundles(&latest);

            match trend::year_over_year(records, descriptor) {
                Ok((changes, _)) => {
                    for change in &changes {
                        if let Some(yoy) = change.yoy_change {
                            if let Some(bundle) =
                                bundles.iter_mut().find(|b| b.geo_id == change.geo_id)
                            {
                                bundle.set("yoy_price_change", yoy);
                            }
                        }
                        trend_rows.push(TrendSummaryRow {
                            geo_id: change.geo_id.clone(),
                            geo_name: change.geo_name.clone(),
                            current_value: util::format_opt(change.current_value, 2),
                            year_ago_value: util::format_opt(change.year_ago_value, 2),
                            yoy_change: util::format_opt(change.yoy_change, 2),
                        });
                    }
                }
                // Short history skips the trend report; the snapshot
                // bundles still get scored.
                Err(e) => println!("Note: {}", e),
            }
            (bundles, trend_rows)
        }
        SourceLayout::CodedVariableWide { .. } => {
            (metrics::build_bundles(observations), trend_rows)
        }
    }
}

/// Handle option [2]: derived metrics, trends, and composite scores.
fn handle_generate_reports() {
    let (records, descriptor, observations) = {
        let state = APP_STATE.lock().unwrap();
        (
            state.records.clone(),
            state.descriptor,
            state.observations.clone(),
        )
    };
    let (Some(records), Some(descriptor), Some(observations)) =
        (records, descriptor, observations)
    else {
        println!("Error: No extract loaded. Please load one first (option 1).\n");
        return;
    };

    println!("Generating reports...\n");

    let (bundles, trend_rows) = scoring_bundles(&records, descriptor, &observations);

    if !trend_rows.is_empty() {
        let file = "trend_yoy.csv";
        if let Err(e) = output::write_csv(file, &trend_rows) {
            eprintln!("Write error: {}", e);
        }
        println!("Year-over-Year Change ({})", descriptor.id);
        output::preview_table_rows(&trend_rows, 3);
        println!("(Full table exported to {})\n", file);
    }

    let mut score_rows: Vec<ScoreSummaryRow> = Vec::new();
    let mut no_data = 0usize;
    for bundle in &bundles {
        let enriched = metrics::derive(bundle);
        let forecast = score::forecast_score(&enriched);
        let crash = score::crash_risk_score(&enriched);
        if forecast.is_no_data() && crash.is_no_data() {
            no_data += 1;
        }
        score_rows.push(ScoreSummaryRow {
            geo_id: enriched.geo_id.clone(),
            period: enriched.period.to_string(),
            forecast_score: forecast.value.to_string(),
            crash_risk: crash.value.to_string(),
            components: format!(
                "{}+{}",
                forecast.components.len(),
                crash.components.len()
            ),
        });
    }

    let file = "composite_scores.csv";
    if let Err(e) = output::write_csv(file, &score_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Composite Scores (forecast favorability / crash risk)");
    output::preview_table_rows(&score_rows, 3);
    println!("(Full table exported to {})\n", file);

    let summary = serde_json::json!({
        "source": descriptor.id,
        "geo_level": descriptor.geo_level.as_str(),
        "observations": observations.len(),
        "bundles_scored": bundles.len(),
        "no_data_scores": no_data,
    });
    if let Err(e) = output::write_json("summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Summary (summary.json): {} bundles scored, {} with no usable inputs.\n",
        util::format_int(bundles.len() as i64),
        util::format_int(no_data as i64)
    );
}

fn handle_list_sources() {
    println!("Configured sources:");
    for source in registry::all_sources() {
        let layout = match source.layout {
            SourceLayout::TimeSeriesWide { metric } => format!("monthly series of {}", metric),
            SourceLayout::CodedVariableWide { variable_map } => {
                format!("{} coded survey variables", variable_map.len())
            }
        };
        println!(
            "  {:22} {:7} {}",
            source.id,
            source.geo_level.as_str(),
            layout
        );
    }
    println!();
}

fn main() {
    loop {
        println!("Housing market pipeline:");
        println!("[1] Load and normalize an extract");
        println!("[2] Generate reports and scores");
        println!("[3] List sources\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(),
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_list_sources(),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
