// Insulin-on-board / carbs-on-board snapshots
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Insulin still active at `computed_at`. Computed fresh on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IobValue {
    pub iob_units: f64,
    /// Sum over boluses of `units * relative activity`.
    pub activity_units_per_hour: f64,
    /// mg/dL per minute
    pub glucose_drop_rate_per_minute: f64,
    pub computed_at: DateTime<Utc>,
}

impl IobValue {
    pub fn zero(at: DateTime<Utc>) -> Self {
        Self {
            iob_units: 0.0,
            activity_units_per_hour: 0.0,
            glucose_drop_rate_per_minute: 0.0,
            computed_at: at,
        }
    }

    /// Rough total drop (mg/dL) if all remaining insulin acts.
    pub fn expected_glucose_drop(&self, insulin_sensitivity: f64) -> f64 {
        self.iob_units * insulin_sensitivity
    }
}

/// Carbohydrate not yet absorbed at `computed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CobValue {
    pub carbs_remaining_grams: f64,
    pub absorption_rate_grams_per_hour: f64,
    /// mg/dL per minute
    pub glucose_rise_rate_per_minute: f64,
    pub computed_at: DateTime<Utc>,
}

impl CobValue {
    pub fn zero(at: DateTime<Utc>) -> Self {
        Self {
            carbs_remaining_grams: 0.0,
            absorption_rate_grams_per_hour: 0.0,
            glucose_rise_rate_per_minute: 0.0,
            computed_at: at,
        }
    }

    /// Rough total rise (mg/dL) once the remaining carbs are absorbed.
    pub fn expected_glucose_rise(&self, insulin_sensitivity: f64, carb_ratio: f64) -> f64 {
        if carb_ratio <= 0.0 {
            return 0.0;
        }
        self.carbs_remaining_grams * insulin_sensitivity / carb_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_totals() {
        let now = Utc::now();
        let iob = IobValue {
            iob_units: 2.0,
            ..IobValue::zero(now)
        };
        assert_eq!(iob.expected_glucose_drop(54.0), 108.0);

        let cob = CobValue {
            carbs_remaining_grams: 20.0,
            ..CobValue::zero(now)
        };
        assert_eq!(cob.expected_glucose_rise(54.0, 10.0), 108.0);
        assert_eq!(cob.expected_glucose_rise(54.0, 0.0), 0.0);
    }
}
