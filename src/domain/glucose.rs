// Glucose reading domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readings at or above this are treated as sensor garbage.
pub const MAX_PLAUSIBLE_MG_DL: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSample {
    pub timestamp: DateTime<Utc>,
    /// mg/dL
    pub value: f64,
}

impl GlucoseSample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// A sample is usable when its value is finite and inside `(0, 1000)` and
    /// it is not stamped after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.value.is_finite()
            && self.value > 0.0
            && self.value < MAX_PLAUSIBLE_MG_DL
            && self.timestamp <= now
    }
}

/// Outcome of filtering raw samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReadings {
    /// Valid samples, sorted ascending by timestamp.
    pub samples: Vec<GlucoseSample>,
    pub discarded: usize,
}

/// Drop invalid samples and sort the rest chronologically.
pub fn validate_readings(readings: &[GlucoseSample], now: DateTime<Utc>) -> ValidatedReadings {
    let mut samples: Vec<GlucoseSample> = readings
        .iter()
        .filter(|s| s.is_valid_at(now))
        .copied()
        .collect();
    samples.sort_by_key(|s| s.timestamp);

    ValidatedReadings {
        discarded: readings.len() - samples.len(),
        samples,
    }
}

/// Readings re-expressed as hours since the first sample, which keeps the
/// polynomial design matrix well conditioned.
#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseSeries {
    pub origin: DateTime<Utc>,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl GlucoseSeries {
    /// Build from chronologically sorted samples, keeping at most the
    /// `max_samples` most recent. Returns `None` for empty input.
    pub fn from_sorted(samples: &[GlucoseSample], max_samples: usize) -> Option<Self> {
        let start = samples.len().saturating_sub(max_samples);
        let recent = &samples[start..];
        let origin = recent.first()?.timestamp;

        let times = recent.iter().map(|s| hours_between(origin, s.timestamp)).collect();
        let values = recent.iter().map(|s| s.value).collect();

        Some(Self {
            origin,
            times,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Offset (hours) of the newest sample.
    pub fn last_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::milliseconds((self.last_time() * 3_600_000.0).round() as i64)
    }

    /// Series offset (hours) of an absolute timestamp.
    pub fn offset_of(&self, timestamp: DateTime<Utc>) -> f64 {
        hours_between(self.origin, timestamp)
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn test_validate_filters_and_sorts() {
        let now = at(30);
        let readings = vec![
            GlucoseSample::new(at(10), 120.0),
            GlucoseSample::new(at(0), 110.0),
            GlucoseSample::new(at(5), 0.0),
            GlucoseSample::new(at(15), 1200.0),
            GlucoseSample::new(at(20), f64::NAN),
            GlucoseSample::new(at(45), 130.0),
            GlucoseSample::new(at(30), 125.0),
        ];

        let validated = validate_readings(&readings, now);
        assert_eq!(validated.discarded, 4);
        let values: Vec<f64> = validated.samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![110.0, 120.0, 125.0]);
    }

    #[test]
    fn test_series_keeps_most_recent_and_uses_hours() {
        let samples: Vec<GlucoseSample> = (0..25)
            .map(|i| GlucoseSample::new(at(i * 5), 100.0 + i as f64))
            .collect();

        let series = GlucoseSeries::from_sorted(&samples, 20).unwrap();
        assert_eq!(series.len(), 20);
        assert_eq!(series.origin, at(25));
        assert_eq!(series.times[0], 0.0);
        assert!((series.times[12] - 1.0).abs() < 1e-12);
        assert_eq!(series.last_value(), Some(124.0));
        assert_eq!(series.last_timestamp(), at(120));
        assert!((series.offset_of(at(130)) - (105.0 / 60.0)).abs() < 1e-12);
    }

    #[test]
    fn test_series_from_empty() {
        assert!(GlucoseSeries::from_sorted(&[], 20).is_none());
    }
}
