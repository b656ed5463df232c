// IOB calculator - insulin still on board from recent boluses
use crate::application::repositories::TreatmentSource;
use crate::domain::insulin::{InsulinProfile, InsulinType};
use crate::domain::on_board::IobValue;
use crate::domain::treatment::{TreatmentKind, TreatmentRecord};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct IobCalculator {
    treatments: Arc<dyn TreatmentSource>,
}

impl IobCalculator {
    pub fn new(treatments: Arc<dyn TreatmentSource>) -> Self {
        Self { treatments }
    }

    pub fn compute_iob(&self, at: DateTime<Utc>, insulin_type: InsulinType, insulin_sensitivity: f64) -> IobValue {
        self.compute_iob_with_profile(at, &insulin_type.profile(), insulin_sensitivity)
    }

    /// IOB at `at` for boluses within the profile's duration. A failed
    /// treatment read counts as no boluses.
    pub fn compute_iob_with_profile(
        &self,
        at: DateTime<Utc>,
        profile: &InsulinProfile,
        insulin_sensitivity: f64,
    ) -> IobValue {
        if !profile.is_valid() {
            tracing::warn!(?profile, "Invalid insulin profile, assuming no insulin on board");
            return IobValue::zero(at);
        }
        let Some(window_start) = at.checked_sub_signed(minutes(profile.duration_minutes)) else {
            return IobValue::zero(at);
        };

        let records = match self.treatments.treatments_between(window_start, at) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Treatment read failed, assuming no insulin on board: {}", e);
                Vec::new()
            }
        };

        let (iob_units, activity) = sum_insulin(&records, at, profile);
        let glucose_drop_rate_per_minute = activity * insulin_sensitivity / profile.duration_minutes;

        tracing::debug!(
            iob_units,
            activity,
            glucose_drop_rate_per_minute,
            "IOB calculated"
        );

        IobValue {
            iob_units,
            activity_units_per_hour: activity,
            glucose_drop_rate_per_minute,
            computed_at: at,
        }
    }

    /// IOB sampled from `start` through `start + duration` inclusive.
    pub fn compute_iob_curve(
        &self,
        start: DateTime<Utc>,
        duration: Duration,
        interval: Duration,
        profile: &InsulinProfile,
        insulin_sensitivity: f64,
    ) -> Vec<IobValue> {
        if interval <= Duration::zero() {
            return Vec::new();
        }

        let Some(end) = start.checked_add_signed(duration) else {
            return Vec::new();
        };
        let mut curve = Vec::new();
        let mut current = Some(start);
        while let Some(at) = current.filter(|at| *at <= end) {
            curve.push(self.compute_iob_with_profile(at, profile, insulin_sensitivity));
            current = at.checked_add_signed(interval);
        }
        curve
    }
}

/// Returns `(remaining units, summed activity)`.
fn sum_insulin(records: &[TreatmentRecord], at: DateTime<Utc>, profile: &InsulinProfile) -> (f64, f64) {
    let mut total_iob = 0.0;
    let mut total_activity = 0.0;

    for record in records {
        if record.kind != TreatmentKind::Insulin || record.amount <= 0.0 {
            continue;
        }

        let elapsed = record.minutes_before(at);
        if elapsed < 0.0 || elapsed > profile.duration_minutes {
            continue;
        }

        total_iob += record.amount * profile.iob_fraction(elapsed);
        total_activity += record.amount * profile.activity(elapsed);
    }

    (total_iob, total_activity)
}

fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}
