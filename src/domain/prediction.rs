// Forecast output domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const MIN_PREDICTED_MG_DL: f64 = 20.0;
pub const MAX_PREDICTED_MG_DL: f64 = 600.0;
pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Curve family that produced a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Polynomial,
    Logarithmic,
    Exponential,
    Power,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Polynomial => "Polynomial",
            ModelKind::Logarithmic => "Logarithmic",
            ModelKind::Exponential => "Exponential",
            ModelKind::Power => "Power",
        };
        f.write_str(name)
    }
}

/// One forecast sample. Ordering compares timestamps only; equality compares
/// every field.
///
/// The two disagree: points at the same instant with different values are
/// `!=` yet `partial_cmp` reports `Equal`. Sort forecasts by time with it, but
/// do not key sorted sets, `dedup` or binary searches on whole points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionPoint {
    pub timestamp: DateTime<Utc>,
    /// mg/dL, always within `[20, 600]`
    pub value: f64,
    /// Always within `[0.1, 1.0]`
    pub confidence: f64,
    pub model: ModelKind,
}

impl PredictionPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64, confidence: f64, model: ModelKind) -> Self {
        Self {
            timestamp,
            value: clamp_glucose(value),
            confidence: clamp_confidence(confidence),
            model,
        }
    }
}

impl PartialOrd for PredictionPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.timestamp.cmp(&other.timestamp))
    }
}

pub fn clamp_glucose(value: f64) -> f64 {
    value.clamp(MIN_PREDICTED_MG_DL, MAX_PREDICTED_MG_DL)
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// How soon a predicted low arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LowSeverity {
    Immediate,
    Urgent,
    Warning,
    Watch,
}

impl LowSeverity {
    /// <=15 min Immediate, <=30 Urgent, <=60 Warning, otherwise Watch.
    pub fn from_minutes(minutes_to_low: f64) -> Self {
        if minutes_to_low <= 15.0 {
            LowSeverity::Immediate
        } else if minutes_to_low <= 30.0 {
            LowSeverity::Urgent
        } else if minutes_to_low <= 60.0 {
            LowSeverity::Warning
        } else {
            LowSeverity::Watch
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LowSeverity::Immediate => "Immediate",
            LowSeverity::Urgent => "Urgent",
            LowSeverity::Warning => "Warning",
            LowSeverity::Watch => "Watch",
        }
    }

    pub fn color_name(&self) -> &'static str {
        match self {
            LowSeverity::Immediate => "red",
            LowSeverity::Urgent => "orange",
            LowSeverity::Warning => "yellow",
            LowSeverity::Watch => "blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LowGlucosePrediction {
    pub seconds_to_low: f64,
    pub severity: LowSeverity,
}
