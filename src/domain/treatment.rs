// Treatment domain models (insulin boluses, carb entries)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentKind {
    Insulin,
    Carbs,
    Exercise,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub timestamp: DateTime<Utc>,
    /// Units for insulin, grams for carbs, minutes for exercise.
    pub amount: f64,
    pub kind: TreatmentKind,
}

impl TreatmentRecord {
    pub fn new(timestamp: DateTime<Utc>, amount: f64, kind: TreatmentKind) -> Self {
        Self {
            timestamp,
            amount,
            kind,
        }
    }

    pub fn insulin(timestamp: DateTime<Utc>, units: f64) -> Self {
        Self::new(timestamp, units, TreatmentKind::Insulin)
    }

    pub fn carbs(timestamp: DateTime<Utc>, grams: f64) -> Self {
        Self::new(timestamp, grams, TreatmentKind::Carbs)
    }

    /// Minutes elapsed between this treatment and `at` (negative if it lies in the future).
    pub fn minutes_before(&self, at: DateTime<Utc>) -> f64 {
        (at - self.timestamp).num_milliseconds() as f64 / 60_000.0
    }
}
