// Read-only collaborators the engine consumes
use crate::domain::glucose::GlucoseSample;
use crate::domain::treatment::TreatmentRecord;
use crate::infrastructure::config::PredictionSettings;
use chrono::{DateTime, Utc};

pub trait ReadingSource: Send + Sync {
    /// Glucose samples with `from <= timestamp <= to`, in any order.
    fn readings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<GlucoseSample>>;
}

pub trait TreatmentSource: Send + Sync {
    /// Treatment records of every kind with `from <= timestamp <= to`.
    fn treatments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TreatmentRecord>>;
}

/// Polled once per engine call.
pub trait SettingsProvider: Send + Sync {
    fn prediction_settings(&self) -> PredictionSettings;
}
