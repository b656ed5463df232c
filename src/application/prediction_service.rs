// Prediction service - validates readings, picks a trend model, builds the forecast
use crate::application::cob_calculator::{CarbAbsorption, CobCalculator};
use crate::application::iob_calculator::IobCalculator;
use crate::application::model_selector::{self, ModelSelectionPolicy};
use crate::application::repositories::{ReadingSource, SettingsProvider, TreatmentSource};
use crate::domain::glucose::{validate_readings, GlucoseSample, GlucoseSeries};
use crate::domain::on_board::{CobValue, IobValue};
use crate::domain::prediction::{
    clamp_confidence, LowGlucosePrediction, LowSeverity, PredictionPoint, MIN_CONFIDENCE,
};
use crate::error::PredictionError;
use crate::infrastructure::config::PredictionSettings;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const MIN_READINGS: usize = 3;
pub const MAX_READINGS: usize = 20;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;
pub const DEFAULT_LOW_THRESHOLD: f64 = 70.0;
pub const DEFAULT_MAX_HOURS_AHEAD: f64 = 4.0;

/// How far back `*_from_source` looks for readings.
const SOURCE_LOOKBACK_HOURS: i64 = 2;
const LOW_SEARCH_PRECISION_SECONDS: f64 = 60.0;
/// Upper bound on the forecast buffer reserved up front.
const MAX_PREALLOCATED_POINTS: usize = 1024;

// Confidence heuristics
const BASE_CONFIDENCE: f64 = 0.9;
const MAX_ERROR_PENALTY: f64 = 0.5;
const ERROR_PENALTY_SCALE: f64 = 1000.0;
const HORIZON_PENALTY_MINUTES: f64 = 120.0;
const TREATMENT_CONFIDENCE_FACTOR: f64 = 0.9;

/// Confidence for a point `minutes_ahead` of the last reading, given the
/// model's error variance. Non-increasing in both arguments.
pub fn confidence(error_variance: f64, minutes_ahead: f64) -> f64 {
    let error_penalty = (error_variance / ERROR_PENALTY_SCALE).min(MAX_ERROR_PENALTY);
    let horizon_penalty = minutes_ahead / HORIZON_PENALTY_MINUTES;
    clamp_confidence(BASE_CONFIDENCE - error_penalty - horizon_penalty)
}

#[derive(Clone)]
pub struct PredictionService {
    settings: Arc<dyn SettingsProvider>,
    readings: Option<Arc<dyn ReadingSource>>,
    iob: Option<IobCalculator>,
    cob: Option<CobCalculator>,
    reference_time: Option<DateTime<Utc>>,
}

impl PredictionService {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            settings,
            readings: None,
            iob: None,
            cob: None,
            reference_time: None,
        }
    }

    pub fn with_reading_source(mut self, readings: Arc<dyn ReadingSource>) -> Self {
        self.readings = Some(readings);
        self
    }

    /// Enables the IOB/COB calculators used for treatment adjustment.
    pub fn with_treatment_source(mut self, treatments: Arc<dyn TreatmentSource>) -> Self {
        self.iob = Some(IobCalculator::new(treatments.clone()));
        self.cob = Some(CobCalculator::new(treatments));
        self
    }

    /// Pin "now" instead of reading the wall clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Forecast points every `interval_minutes` up to `time_horizon` past the
    /// newest reading. Empty when no forecast is possible.
    pub fn generate_predictions(
        &self,
        readings: &[GlucoseSample],
        time_horizon: Duration,
        interval_minutes: u32,
        policy: ModelSelectionPolicy,
    ) -> Vec<PredictionPoint> {
        match self.try_generate_predictions(readings, time_horizon, interval_minutes, policy) {
            Ok(points) => points,
            Err(e) => {
                tracing::info!("No glucose prediction: {}", e);
                Vec::new()
            }
        }
    }

    pub fn try_generate_predictions(
        &self,
        readings: &[GlucoseSample],
        time_horizon: Duration,
        interval_minutes: u32,
        policy: ModelSelectionPolicy,
    ) -> Result<Vec<PredictionPoint>, PredictionError> {
        let interval_seconds = i64::from(interval_minutes) * 60;
        if interval_seconds == 0 {
            return Err(PredictionError::EmptyHorizon);
        }
        let steps = time_horizon.num_seconds() / interval_seconds;
        if steps <= 0 {
            return Err(PredictionError::EmptyHorizon);
        }

        let series = self.prepare_series(readings)?;
        let fit = model_selector::resolve(policy, &series)?;
        tracing::info!(
            model = ?fit.model(),
            error_variance = fit.error_variance(),
            "Selected trend model"
        );

        let start = series.last_timestamp();
        let fallback = series.last_value().unwrap_or_default();
        let mut points = Vec::with_capacity((steps as usize).min(MAX_PREALLOCATED_POINTS));

        for step in 1..=steps {
            let timestamp = Duration::try_seconds(step * interval_seconds)
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or(PredictionError::HorizonOutOfRange)?;
            let minutes_ahead = (step * interval_seconds) as f64 / 60.0;

            let raw = fit.predict(series.offset_of(timestamp));
            let value = if raw.is_nan() { fallback } else { raw };

            points.push(PredictionPoint::new(
                timestamp,
                value,
                confidence(fit.error_variance(), minutes_ahead),
                fit.model().kind(),
            ));
        }

        let settings = self.settings.prediction_settings();
        if settings.treatment_adjustment {
            self.apply_treatment_effects(&mut points, start, &settings);
        }

        tracing::debug!(
            "Generated {} predictions up to {} minutes ahead",
            points.len(),
            time_horizon.num_minutes()
        );
        Ok(points)
    }

    /// Time until glucose is forecast to reach `threshold`, searched over
    /// `max_hours_ahead` with one-minute precision on the raw trend.
    pub fn predict_low_glucose(
        &self,
        readings: &[GlucoseSample],
        threshold: f64,
        max_hours_ahead: f64,
    ) -> Option<LowGlucosePrediction> {
        match self.try_predict_low_glucose(readings, threshold, max_hours_ahead) {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::info!("No low glucose prediction: {}", e);
                None
            }
        }
    }

    pub fn try_predict_low_glucose(
        &self,
        readings: &[GlucoseSample],
        threshold: f64,
        max_hours_ahead: f64,
    ) -> Result<Option<LowGlucosePrediction>, PredictionError> {
        let series = self.prepare_series(readings)?;
        let current = series.last_value().ok_or(PredictionError::InsufficientData {
            valid: 0,
            required: MIN_READINGS,
        })?;

        if current <= threshold {
            return Ok(Some(LowGlucosePrediction {
                seconds_to_low: 0.0,
                severity: LowSeverity::Immediate,
            }));
        }

        let max_seconds = max_hours_ahead * 3600.0;
        if !max_seconds.is_finite() || max_seconds <= 0.0 {
            return Ok(None);
        }

        let policy = self.settings.prediction_settings().selection_policy();
        let fit = model_selector::resolve(policy, &series)?;
        let last = series.last_time();

        let mut low = 0.0;
        let mut high = max_seconds;
        while high - low > LOW_SEARCH_PRECISION_SECONDS {
            let mid = (low + high) / 2.0;
            if fit.predict(last + mid / 3600.0) <= threshold {
                high = mid;
            } else {
                low = mid;
            }
        }

        if high >= max_seconds {
            return Ok(None);
        }

        let severity = LowSeverity::from_minutes(high / 60.0);
        tracing::info!(
            "Low glucose predicted in {:.1} minutes (severity: {})",
            high / 60.0,
            severity.display_name()
        );
        Ok(Some(LowGlucosePrediction {
            seconds_to_low: high,
            severity,
        }))
    }

    /// Forecast from the injected reading source using the settings'
    /// horizon, interval and model policy.
    pub fn forecast_from_source(&self) -> Vec<PredictionPoint> {
        let settings = self.settings.prediction_settings();
        let readings = self.recent_readings();
        self.generate_predictions(
            &readings,
            settings.time_horizon(),
            settings.interval_minutes,
            settings.selection_policy(),
        )
    }

    /// Low glucose outlook from the injected reading source, using the
    /// configured threshold.
    pub fn low_glucose_from_source(&self) -> Option<LowGlucosePrediction> {
        let settings = self.settings.prediction_settings();
        let readings = self.recent_readings();
        self.predict_low_glucose(&readings, settings.low_threshold, DEFAULT_MAX_HOURS_AHEAD)
    }

    /// IOB at `at` with the configured insulin; `None` without a treatment source.
    pub fn current_iob(&self, at: DateTime<Utc>) -> Option<IobValue> {
        let settings = self.settings.prediction_settings();
        self.iob.as_ref().map(|iob| {
            iob.compute_iob_with_profile(at, &settings.insulin_profile(), settings.insulin_sensitivity)
        })
    }

    /// COB at `at` with the configured carb parameters; `None` without a treatment source.
    pub fn current_cob(&self, at: DateTime<Utc>) -> Option<CobValue> {
        let settings = self.settings.prediction_settings();
        self.cob
            .as_ref()
            .map(|cob| cob.compute_cob_with(at, &carb_absorption(&settings)))
    }

    fn recent_readings(&self) -> Vec<GlucoseSample> {
        let Some(source) = &self.readings else {
            tracing::warn!("No reading source configured");
            return Vec::new();
        };

        let now = self.now();
        match source.readings_between(now - Duration::hours(SOURCE_LOOKBACK_HOURS), now) {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!("Reading source failed: {}", e);
                Vec::new()
            }
        }
    }

    fn prepare_series(&self, readings: &[GlucoseSample]) -> Result<GlucoseSeries, PredictionError> {
        if readings.len() < MIN_READINGS {
            return Err(PredictionError::InsufficientData {
                valid: readings.len(),
                required: MIN_READINGS,
            });
        }

        let validated = validate_readings(readings, self.now());
        if validated.discarded > 0 {
            tracing::debug!(
                accepted = validated.samples.len(),
                discarded = validated.discarded,
                "Discarded invalid glucose readings"
            );
        }

        let insufficient = PredictionError::InsufficientData {
            valid: validated.samples.len(),
            required: MIN_READINGS,
        };
        if validated.samples.len() < MIN_READINGS {
            return Err(insufficient);
        }
        GlucoseSeries::from_sorted(&validated.samples, MAX_READINGS).ok_or(insufficient)
    }

    /// Shift each point by the net IOB/COB glucose rate accumulated since the
    /// forecast start. No-op without a treatment source.
    fn apply_treatment_effects(
        &self,
        points: &mut [PredictionPoint],
        start: DateTime<Utc>,
        settings: &PredictionSettings,
    ) {
        let (Some(iob_calculator), Some(cob_calculator)) = (&self.iob, &self.cob) else {
            return;
        };

        let profile = settings.insulin_profile();
        let absorption = carb_absorption(settings);

        for point in points.iter_mut() {
            let iob = iob_calculator.compute_iob_with_profile(point.timestamp, &profile, settings.insulin_sensitivity);
            let cob = cob_calculator.compute_cob_with(point.timestamp, &absorption);

            let net_rate = cob.glucose_rise_rate_per_minute - iob.glucose_drop_rate_per_minute;
            let minutes_from_start = (point.timestamp - start).num_milliseconds() as f64 / 60_000.0;

            *point = PredictionPoint::new(
                point.timestamp,
                point.value + net_rate * minutes_from_start,
                (point.confidence * TREATMENT_CONFIDENCE_FACTOR).max(MIN_CONFIDENCE),
                point.model,
            );
        }
    }
}

fn carb_absorption(settings: &PredictionSettings) -> CarbAbsorption {
    CarbAbsorption {
        rate: settings.carb_absorption_rate,
        delay: settings.carb_absorption_delay,
        carb_ratio: settings.carb_ratio,
        insulin_sensitivity: settings.insulin_sensitivity,
    }
}
