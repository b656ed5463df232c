// COB calculator - carbs still absorbing from recent meals
use crate::application::repositories::TreatmentSource;
use crate::domain::on_board::CobValue;
use crate::domain::treatment::{TreatmentKind, TreatmentRecord};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Carb entries older than this never contribute.
const MAX_ABSORPTION_HOURS: i64 = 6;

/// Linear absorption parameters for one COB evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarbAbsorption {
    /// grams per hour
    pub rate: f64,
    /// minutes before absorption starts
    pub delay: f64,
    /// grams per unit of insulin
    pub carb_ratio: f64,
    /// mg/dL per unit of insulin
    pub insulin_sensitivity: f64,
}

impl CarbAbsorption {
    /// mg/dL raised by one gram of carbohydrate.
    pub fn glucose_per_gram(&self) -> f64 {
        if self.carb_ratio <= 0.0 {
            return 0.0;
        }
        self.insulin_sensitivity / self.carb_ratio
    }
}

#[derive(Clone)]
pub struct CobCalculator {
    treatments: Arc<dyn TreatmentSource>,
}

impl CobCalculator {
    pub fn new(treatments: Arc<dyn TreatmentSource>) -> Self {
        Self { treatments }
    }

    pub fn compute_cob(
        &self,
        at: DateTime<Utc>,
        absorption_rate: f64,
        delay_minutes: f64,
        carb_ratio: f64,
        insulin_sensitivity: f64,
    ) -> CobValue {
        self.compute_cob_with(
            at,
            &CarbAbsorption {
                rate: absorption_rate,
                delay: delay_minutes,
                carb_ratio,
                insulin_sensitivity,
            },
        )
    }

    /// COB at `at` from carb entries in the trailing six hours. A failed
    /// treatment read counts as no carbs.
    pub fn compute_cob_with(&self, at: DateTime<Utc>, absorption: &CarbAbsorption) -> CobValue {
        let window_start = at - Duration::hours(MAX_ABSORPTION_HOURS);
        let records = match self.treatments.treatments_between(window_start, at) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Treatment read failed, assuming no carbs on board: {}", e);
                Vec::new()
            }
        };

        let (carbs_remaining, absorption_rate) = sum_carbs(&records, at, absorption);
        let glucose_rise_rate_per_minute = (absorption_rate / 60.0) * absorption.glucose_per_gram();

        tracing::debug!(
            carbs_remaining,
            absorption_rate,
            glucose_rise_rate_per_minute,
            "COB calculated"
        );

        CobValue {
            carbs_remaining_grams: carbs_remaining,
            absorption_rate_grams_per_hour: absorption_rate,
            glucose_rise_rate_per_minute,
            computed_at: at,
        }
    }

    /// COB sampled from `start` through `start + duration` inclusive.
    pub fn compute_cob_curve(
        &self,
        start: DateTime<Utc>,
        duration: Duration,
        interval: Duration,
        absorption: &CarbAbsorption,
    ) -> Vec<CobValue> {
        if interval <= Duration::zero() {
            return Vec::new();
        }

        let Some(end) = start.checked_add_signed(duration) else {
            return Vec::new();
        };
        let mut curve = Vec::new();
        let mut current = Some(start);
        while let Some(at) = current.filter(|at| *at <= end) {
            curve.push(self.compute_cob_with(at, absorption));
            current = at.checked_add_signed(interval);
        }
        curve
    }
}

/// Returns `(grams remaining, absorption rate in g/h)`.
fn sum_carbs(records: &[TreatmentRecord], at: DateTime<Utc>, absorption: &CarbAbsorption) -> (f64, f64) {
    let max_minutes = (MAX_ABSORPTION_HOURS * 60) as f64;
    let mut total_cob = 0.0;
    let mut total_rate = 0.0;

    for record in records {
        if record.kind != TreatmentKind::Carbs || record.amount <= 0.0 {
            continue;
        }

        let elapsed = record.minutes_before(at);
        if elapsed < 0.0 || elapsed > max_minutes {
            continue;
        }

        // Still inside the delay: nothing absorbed yet
        if elapsed < absorption.delay {
            total_cob += record.amount;
            continue;
        }

        let hours_absorbing = (elapsed - absorption.delay) / 60.0;
        let absorbed = record.amount.min(hours_absorbing * absorption.rate.max(0.0));
        let remaining = record.amount - absorbed;

        if remaining > 0.0 {
            total_cob += remaining;
            total_rate += absorption.rate.max(0.0).min(remaining);
        }
    }

    (total_cob, total_rate)
}
