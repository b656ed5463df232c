// Trend models - curve families fitted to a glucose series
use super::glucose::GlucoseSeries;
use super::prediction::ModelKind;
use super::statistics::{self, LinearFit};
use serde::Serialize;

/// Used when a model has to fall back and there is no history at all.
const FALLBACK_MG_DL: f64 = 100.0;

/// A trend model candidate. Times are hours from the first sample of the
/// series; values are mg/dL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrendModel {
    /// Degree is always within `1..=3`; build with [`TrendModel::polynomial`].
    Polynomial { degree: usize },
    /// `y = slope * ln(t - t0 + 1) + intercept`
    Logarithmic,
    /// `y = a * e^(b * t)`
    Exponential,
    /// `y = a * (t - t0 + 1)^b`
    Power,
}

impl TrendModel {
    /// Auto-selection candidates, in tie-break order.
    pub const CANDIDATES: [TrendModel; 6] = [
        TrendModel::Polynomial { degree: 1 },
        TrendModel::Polynomial { degree: 2 },
        TrendModel::Polynomial { degree: 3 },
        TrendModel::Logarithmic,
        TrendModel::Exponential,
        TrendModel::Power,
    ];

    pub fn polynomial(degree: usize) -> Self {
        TrendModel::Polynomial {
            degree: degree.clamp(1, 3),
        }
    }

    /// Build a model by kind; `degree` only matters for polynomials.
    pub fn from_kind(kind: ModelKind, degree: usize) -> Self {
        match kind {
            ModelKind::Polynomial => TrendModel::polynomial(degree),
            ModelKind::Logarithmic => TrendModel::Logarithmic,
            ModelKind::Exponential => TrendModel::Exponential,
            ModelKind::Power => TrendModel::Power,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            TrendModel::Polynomial { .. } => ModelKind::Polynomial,
            TrendModel::Logarithmic => ModelKind::Logarithmic,
            TrendModel::Exponential => ModelKind::Exponential,
            TrendModel::Power => ModelKind::Power,
        }
    }

    pub fn min_points(&self) -> usize {
        match self {
            TrendModel::Polynomial { degree } => (*degree).clamp(1, 3) + 1,
            _ => 2,
        }
    }

    /// Fit the model. Too little history yields a last-value fit with
    /// infinite error variance, which selection never picks.
    pub fn fit(&self, series: &GlucoseSeries) -> ModelFit {
        let times = &series.times;
        let values = &series.values;

        if values.len() != times.len() || values.len() < self.min_points() {
            return ModelFit {
                model: *self,
                curve: Curve::LastValue(series.last_value().unwrap_or(FALLBACK_MG_DL)),
                error_variance: f64::INFINITY,
            };
        }

        let t0 = times.iter().copied().fold(f64::INFINITY, f64::min);
        let curve = match *self {
            TrendModel::Polynomial { degree } => {
                Curve::Polynomial(statistics::polynomial_regression(times, values, degree.clamp(1, 3)))
            }
            TrendModel::Logarithmic => {
                let log_times: Vec<f64> = times.iter().map(|&t| shifted(t, t0).ln()).collect();
                Curve::Logarithmic {
                    fit: statistics::linear_regression(&log_times, values),
                    t0,
                }
            }
            TrendModel::Exponential => {
                let fit = statistics::linear_regression(times, &log_values(values));
                Curve::Exponential {
                    a: fit.intercept.exp(),
                    b: fit.slope,
                }
            }
            TrendModel::Power => {
                let log_times: Vec<f64> = times.iter().map(|&t| shifted(t, t0).ln()).collect();
                let fit = statistics::linear_regression(&log_times, &log_values(values));
                Curve::Power {
                    a: fit.intercept.exp(),
                    b: fit.slope,
                    t0,
                }
            }
        };

        let fitted: Vec<f64> = times.iter().map(|&t| curve.evaluate(t)).collect();
        ModelFit {
            model: *self,
            error_variance: statistics::error_variance(values, &fitted),
            curve,
        }
    }

    /// Fit and evaluate at `future_time` (hours on the series clock).
    pub fn predict(&self, series: &GlucoseSeries, future_time: f64) -> f64 {
        self.fit(series).predict(future_time)
    }

    pub fn error_variance(&self, series: &GlucoseSeries) -> f64 {
        self.fit(series).error_variance
    }
}

/// Time shifted so the first sample sits at 1.0, floored at 1.0 for logs.
fn shifted(t: f64, t0: f64) -> f64 {
    (t - t0 + 1.0).max(1.0)
}

fn log_values(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| v.max(1.0).ln()).collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Curve {
    LastValue(f64),
    Polynomial(Vec<f64>),
    Logarithmic { fit: LinearFit, t0: f64 },
    Exponential { a: f64, b: f64 },
    Power { a: f64, b: f64, t0: f64 },
}

impl Curve {
    fn evaluate(&self, t: f64) -> f64 {
        match self {
            Curve::LastValue(value) => *value,
            Curve::Polynomial(coefficients) => statistics::evaluate_polynomial(coefficients, t),
            Curve::Logarithmic { fit, t0 } => fit.evaluate(shifted(t, *t0).ln()),
            Curve::Exponential { a, b } => a * (b * t).exp(),
            Curve::Power { a, b, t0 } => a * shifted(t, *t0).powf(*b),
        }
    }
}

/// A fitted model: its curve plus the residual variance used for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFit {
    model: TrendModel,
    curve: Curve,
    error_variance: f64,
}

impl ModelFit {
    pub fn model(&self) -> TrendModel {
        self.model
    }

    pub fn error_variance(&self) -> f64 {
        self.error_variance
    }

    /// Whether the fit can be ranked (finite error variance).
    pub fn is_trusted(&self) -> bool {
        self.error_variance.is_finite()
    }

    pub fn predict(&self, t: f64) -> f64 {
        self.curve.evaluate(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn series(times: &[f64], values: &[f64]) -> GlucoseSeries {
        GlucoseSeries {
            origin: Utc::now(),
            times: times.to_vec(),
            values: values.to_vec(),
        }
    }

    fn minutes_as_hours(minutes: &[f64]) -> Vec<f64> {
        minutes.iter().map(|m| m / 60.0).collect()
    }

    #[test]
    fn test_linear_history_fits_degree_one() {
        let times = minutes_as_hours(&[0.0, 5.0, 10.0, 15.0]);
        let s = series(&times, &[100.0, 110.0, 120.0, 130.0]);

        let model = TrendModel::polynomial(1);
        assert!(model.error_variance(&s) < 1e-9);
        assert!((model.predict(&s, 20.0 / 60.0) - 140.0).abs() < 1e-6);
    }

    #[test]
    fn test_degree_is_clamped() {
        assert_eq!(TrendModel::polynomial(0), TrendModel::Polynomial { degree: 1 });
        assert_eq!(TrendModel::polynomial(7), TrendModel::Polynomial { degree: 3 });
        assert_eq!(TrendModel::from_kind(ModelKind::Polynomial, 9).min_points(), 4);
        assert_eq!(TrendModel::from_kind(ModelKind::Power, 9), TrendModel::Power);
    }

    #[test]
    fn test_insufficient_points_fall_back_to_last_value() {
        let s = series(&[0.0, 0.1, 0.2], &[100.0, 105.0, 111.0]);
        let cubic = TrendModel::polynomial(3);
        assert!(cubic.error_variance(&s).is_infinite());
        assert_eq!(cubic.predict(&s, 1.0), 111.0);
        assert!(!cubic.fit(&s).is_trusted());

        let single = series(&[0.0], &[95.0]);
        for model in TrendModel::CANDIDATES {
            assert!(model.error_variance(&single).is_infinite());
            assert_eq!(model.predict(&single, 1.0), 95.0);
        }

        let empty = series(&[], &[]);
        assert_eq!(TrendModel::Exponential.predict(&empty, 1.0), 100.0);
    }

    #[test]
    fn test_fit_reproduces_generating_curves() {
        let times: Vec<f64> = (0..8).map(|i| i as f64 * 0.25).collect();

        let quadratic: Vec<f64> = times.iter().map(|t| 150.0 - 20.0 * t + 6.0 * t * t).collect();
        let exponential: Vec<f64> = times.iter().map(|t| 90.0 * (0.2 * t).exp()).collect();
        let logarithmic: Vec<f64> = times.iter().map(|t| 110.0 + 25.0 * (t + 1.0).ln()).collect();
        let power: Vec<f64> = times.iter().map(|t| 120.0 * (t + 1.0).powf(-0.3)).collect();

        let cases = [
            (TrendModel::polynomial(2), quadratic),
            (TrendModel::Exponential, exponential),
            (TrendModel::Logarithmic, logarithmic),
            (TrendModel::Power, power),
        ];

        for (model, values) in cases {
            let s = series(&times, &values);
            let fit = model.fit(&s);
            assert!(fit.error_variance() < 1e-8, "{:?} variance {}", model, fit.error_variance());
            for (t, v) in times.iter().zip(&values) {
                assert!((fit.predict(*t) - v).abs() < 1e-6, "{:?} at {}", model, t);
            }
        }
    }

    #[test]
    fn test_noisy_history_has_positive_variance() {
        let s = series(&[0.0, 0.1, 0.2, 0.3, 0.4], &[100.0, 112.0, 104.0, 118.0, 109.0]);
        for model in TrendModel::CANDIDATES {
            let variance = model.error_variance(&s);
            assert!(variance.is_finite() && variance > 0.0, "{:?}", model);
        }
    }
}
