// Prediction engine error taxonomy
use thiserror::Error;

/// Why a forecast could not be produced.
///
/// None of these are fatal: `generate_predictions` and `predict_low_glucose` turn them into an
/// empty forecast or `None` and the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("insufficient glucose readings: {valid} valid, {required} required")]
    InsufficientData { valid: usize, required: usize },

    #[error("no trend model produced a finite fit")]
    NoModelAvailable,

    #[error("forecast horizon contains no prediction steps")]
    EmptyHorizon,

    #[error("forecast horizon extends past the representable time range")]
    HorizonOutOfRange,
}
