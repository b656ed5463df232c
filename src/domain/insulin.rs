// Insulin types and their activity/absorption curves
use serde::{Deserialize, Serialize};

/// Integration step (minutes) for the cumulative absorption curve.
const ABSORPTION_STEP_MINUTES: f64 = 5.0;

/// Longest insulin action accepted for a profile (24 hours).
pub const MAX_DURATION_MINUTES: f64 = 24.0 * 60.0;

/// Defaults used when the settings provider has nothing configured.
pub mod defaults {
    /// mg/dL dropped per unit of insulin.
    pub const INSULIN_SENSITIVITY_MG_DL: f64 = 54.0;
    /// Grams of carbohydrate covered by one unit.
    pub const CARB_RATIO: f64 = 10.0;
    /// Grams per hour.
    pub const CARB_ABSORPTION_RATE: f64 = 35.0;
    /// Minutes before carbs start absorbing.
    pub const CARB_ABSORPTION_DELAY: f64 = 15.0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulinType {
    #[default]
    RapidActing,
    ShortActing,
    HumalogNovolog,
    Fiasp,
    Apidra,
    Custom,
}

impl InsulinType {
    pub const ALL: [InsulinType; 6] = [
        InsulinType::RapidActing,
        InsulinType::ShortActing,
        InsulinType::HumalogNovolog,
        InsulinType::Fiasp,
        InsulinType::Apidra,
        InsulinType::Custom,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            InsulinType::RapidActing => "Rapid-Acting (Generic)",
            InsulinType::ShortActing => "Short-Acting (Generic)",
            InsulinType::HumalogNovolog => "Humalog/Novolog/Novorapid",
            InsulinType::Fiasp => "Fiasp",
            InsulinType::Apidra => "Apidra",
            InsulinType::Custom => "Custom Profile",
        }
    }

    /// Built-in onset/peak/duration for this type. `Custom` starts from the
    /// rapid-acting curve; configured overrides are applied by the settings layer.
    pub fn profile(&self) -> InsulinProfile {
        match self {
            InsulinType::RapidActing | InsulinType::Custom => InsulinProfile::new(15.0, 75.0, 180.0),
            InsulinType::ShortActing => InsulinProfile::new(30.0, 120.0, 300.0),
            InsulinType::HumalogNovolog => InsulinProfile::new(10.0, 75.0, 180.0),
            InsulinType::Fiasp => InsulinProfile::new(2.0, 45.0, 300.0),
            InsulinType::Apidra => InsulinProfile::new(10.0, 60.0, 300.0),
        }
    }
}

/// Triangular insulin action curve: zero until onset, linear rise to 1.0 at
/// peak, linear fall back to zero at the end of the duration. All in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulinProfile {
    pub onset_minutes: f64,
    pub peak_minutes: f64,
    pub duration_minutes: f64,
}

impl InsulinProfile {
    pub fn new(onset_minutes: f64, peak_minutes: f64, duration_minutes: f64) -> Self {
        Self {
            onset_minutes,
            peak_minutes,
            duration_minutes,
        }
    }

    /// Finite, `0 <= onset < peak < duration <= MAX_DURATION_MINUTES`.
    pub fn is_valid(&self) -> bool {
        let finite = [self.onset_minutes, self.peak_minutes, self.duration_minutes]
            .iter()
            .all(|m| m.is_finite());

        finite
            && self.onset_minutes >= 0.0
            && self.onset_minutes < self.peak_minutes
            && self.peak_minutes < self.duration_minutes
            && self.duration_minutes <= MAX_DURATION_MINUTES
    }

    /// Relative activity (0.0..=1.0) `minutes` after the bolus.
    pub fn activity(&self, minutes: f64) -> f64 {
        if minutes < self.onset_minutes || minutes > self.duration_minutes {
            return 0.0;
        }

        if minutes <= self.peak_minutes {
            let rise = self.peak_minutes - self.onset_minutes;
            if rise <= 0.0 {
                1.0
            } else {
                (minutes - self.onset_minutes) / rise
            }
        } else {
            let fall = self.duration_minutes - self.peak_minutes;
            if fall <= 0.0 {
                0.0
            } else {
                (self.duration_minutes - minutes) / fall
            }
        }
    }

    /// Fraction of the dose absorbed after `minutes`: trapezoidal area under
    /// [`activity`](Self::activity) from zero, normalized by the full curve.
    pub fn absorption(&self, minutes: f64) -> f64 {
        if minutes <= 0.0 {
            return 0.0;
        }
        if minutes >= self.duration_minutes {
            return 1.0;
        }

        let total = self.area_until(self.duration_minutes);
        if total <= 0.0 {
            return 1.0;
        }
        (self.area_until(minutes) / total).clamp(0.0, 1.0)
    }

    /// Fraction of the dose still on board.
    pub fn iob_fraction(&self, minutes: f64) -> f64 {
        1.0 - self.absorption(minutes)
    }

    fn area_until(&self, end: f64) -> f64 {
        let mut area = 0.0;
        let mut t = 0.0;
        while t < end {
            let next = (t + ABSORPTION_STEP_MINUTES).min(end);
            area += (self.activity(t) + self.activity(next)) * 0.5 * (next - t);
            t = next;
        }
        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_activity_shape() {
        let profile = InsulinType::RapidActing.profile();
        assert_eq!(profile.activity(0.0), 0.0);
        assert_eq!(profile.activity(14.9), 0.0);
        assert_eq!(profile.activity(15.0), 0.0);
        assert!((profile.activity(45.0) - 0.5).abs() < EPS);
        assert!((profile.activity(75.0) - 1.0).abs() < EPS);
        assert!((profile.activity(127.5) - 0.5).abs() < EPS);
        assert_eq!(profile.activity(180.0), 0.0);
        assert_eq!(profile.activity(200.0), 0.0);
    }

    #[test]
    fn test_absorption_bounds_and_monotonic() {
        let profile = InsulinType::RapidActing.profile();
        assert_eq!(profile.absorption(0.0), 0.0);
        assert_eq!(profile.absorption(-5.0), 0.0);
        assert_eq!(profile.absorption(180.0), 1.0);
        assert_eq!(profile.absorption(400.0), 1.0);

        let mut previous = 0.0;
        for minute in 0..=180 {
            let absorbed = profile.absorption(minute as f64);
            assert!(absorbed >= previous - EPS, "absorption decreased at {minute}");
            previous = absorbed;
        }
    }

    #[test]
    fn test_absorption_matches_triangle_area() {
        // Rising leg area = 0.5 * 60 = 30, total = 0.5 * 165 = 82.5
        let profile = InsulinType::RapidActing.profile();
        assert!((profile.absorption(75.0) - 30.0 / 82.5).abs() < 1e-9);
        assert!((profile.iob_fraction(75.0) - 52.5 / 82.5).abs() < 1e-9);
    }

    #[test]
    fn test_every_type_has_consistent_profile() {
        for insulin in InsulinType::ALL {
            let profile = insulin.profile();
            assert!(profile.onset_minutes < profile.peak_minutes, "{}", insulin.display_name());
            assert!(profile.peak_minutes < profile.duration_minutes);
            assert!((profile.activity(profile.peak_minutes) - 1.0).abs() < EPS);
            assert_eq!(profile.iob_fraction(profile.duration_minutes), 0.0);
            assert!(profile.is_valid());
        }
    }

    #[test]
    fn test_rejects_malformed_profiles() {
        assert!(!InsulinProfile::new(f64::NAN, 75.0, 180.0).is_valid());
        assert!(!InsulinProfile::new(15.0, f64::INFINITY, 180.0).is_valid());
        assert!(!InsulinProfile::new(-1.0, 75.0, 180.0).is_valid());
        assert!(!InsulinProfile::new(90.0, 75.0, 180.0).is_valid());
        assert!(!InsulinProfile::new(15.0, 180.0, 180.0).is_valid());
        assert!(!InsulinProfile::new(15.0, 75.0, 1.0e12).is_valid());
        assert!(InsulinProfile::new(0.0, 60.0, MAX_DURATION_MINUTES).is_valid());
    }
}
