// Model selector - pick the trend model that best explains the history
use crate::domain::glucose::GlucoseSeries;
use crate::domain::trend_model::{ModelFit, TrendModel};
use crate::error::PredictionError;

/// Error variances closer than this (mg/dL squared) count as a tie.
const VARIANCE_TIE_TOLERANCE: f64 = 1e-9;

/// How the orchestrator picks a trend model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelSelectionPolicy {
    /// Lowest finite error variance among [`TrendModel::CANDIDATES`].
    #[default]
    Auto,
    /// Always use this model, even when it can only fall back.
    Fixed(TrendModel),
}

/// Fit every candidate and keep the lowest finite error variance. A later
/// candidate has to beat the current best by more than
/// [`VARIANCE_TIE_TOLERANCE`], so ties (including rounding noise on exact
/// fits) keep the earlier candidate.
pub fn select_best(candidates: &[TrendModel], series: &GlucoseSeries) -> Result<ModelFit, PredictionError> {
    let mut best: Option<ModelFit> = None;

    for model in candidates {
        let fit = model.fit(series);
        tracing::debug!(?model, error_variance = fit.error_variance(), "evaluated trend model");

        if !fit.is_trusted() {
            continue;
        }
        let better = match &best {
            Some(current) => fit.error_variance() < current.error_variance() - VARIANCE_TIE_TOLERANCE,
            None => true,
        };
        if better {
            best = Some(fit);
        }
    }

    best.ok_or(PredictionError::NoModelAvailable)
}

/// Apply a selection policy to a normalized series.
pub fn resolve(policy: ModelSelectionPolicy, series: &GlucoseSeries) -> Result<ModelFit, PredictionError> {
    match policy {
        ModelSelectionPolicy::Auto => select_best(&TrendModel::CANDIDATES, series),
        ModelSelectionPolicy::Fixed(model) => Ok(model.fit(series)),
    }
}
