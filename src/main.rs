// Demo entry point - load settings and a reading snapshot, print the glucose outlook
use std::{path::Path, sync::Arc};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use glucose_forecast::application::cob_calculator::{CarbAbsorption, CobCalculator};
use glucose_forecast::application::iob_calculator::IobCalculator;
use glucose_forecast::domain::on_board::{CobValue, IobValue};
use glucose_forecast::infrastructure::config::load_prediction_settings;
use glucose_forecast::infrastructure::memory_store::InMemoryStore;
use glucose_forecast::{LowGlucosePrediction, PredictionPoint, PredictionService};

const SETTINGS_PATH: &str = "config/prediction.toml";
const DEFAULT_SNAPSHOT_PATH: &str = "data/snapshot.json";

#[derive(Serialize)]
struct Outlook {
    generated_at: DateTime<Utc>,
    predictions: Vec<PredictionPoint>,
    low_glucose: Option<LowGlucosePrediction>,
    iob: Option<IobValue>,
    cob: Option<CobValue>,
    iob_curve: Vec<IobValue>,
    cob_curve: Vec<CobValue>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let settings = load_prediction_settings(Path::new(SETTINGS_PATH))?;
    let snapshot_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string());
    let store = Arc::new(InMemoryStore::load(Path::new(&snapshot_path))?);

    // Anchor "now" at the newest reading so recorded snapshots still forecast
    let now = store
        .latest_reading_time()
        .context("Snapshot contains no glucose readings")?;
    tracing::info!("Forecasting from {} readings as of {}", store.readings().len(), now);

    let service = PredictionService::new(Arc::new(settings.clone()))
        .with_reading_source(store.clone())
        .with_treatment_source(store.clone())
        .with_reference_time(now);

    let interval = Duration::minutes(i64::from(settings.interval_minutes.max(1)));
    let iob_curve = IobCalculator::new(store.clone()).compute_iob_curve(
        now,
        settings.time_horizon(),
        interval,
        &settings.insulin_profile(),
        settings.insulin_sensitivity,
    );
    let cob_curve = CobCalculator::new(store).compute_cob_curve(
        now,
        settings.time_horizon(),
        interval,
        &CarbAbsorption {
            rate: settings.carb_absorption_rate,
            delay: settings.carb_absorption_delay,
            carb_ratio: settings.carb_ratio,
            insulin_sensitivity: settings.insulin_sensitivity,
        },
    );

    let outlook = Outlook {
        generated_at: now,
        predictions: service.forecast_from_source(),
        low_glucose: service.low_glucose_from_source(),
        iob: service.current_iob(now),
        cob: service.current_cob(now),
        iob_curve,
        cob_curve,
    };

    println!("{}", serde_json::to_string_pretty(&outlook)?);
    Ok(())
}
