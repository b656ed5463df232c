// Settings loading (Settings Provider backed by a TOML file)
use crate::application::model_selector::ModelSelectionPolicy;
use crate::application::repositories::SettingsProvider;
use crate::domain::insulin::{defaults, InsulinProfile, InsulinType};
use crate::domain::prediction::ModelKind;
use crate::domain::trend_model::TrendModel;
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

/// User-tunable prediction settings. Every field has a default, so an empty
/// or missing settings file is valid.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PredictionSettings {
    pub insulin_type: InsulinType,
    /// Only consulted when `insulin_type` is `custom`.
    pub custom_insulin: Option<InsulinProfile>,
    /// mg/dL per unit
    pub insulin_sensitivity: f64,
    /// grams per unit
    pub carb_ratio: f64,
    /// grams per hour
    pub carb_absorption_rate: f64,
    /// minutes
    pub carb_absorption_delay: f64,
    pub auto_select_model: bool,
    pub forced_model: ModelKind,
    pub forced_polynomial_degree: usize,
    pub treatment_adjustment: bool,
    /// mg/dL
    pub low_threshold: f64,
    pub time_horizon_minutes: u32,
    pub interval_minutes: u32,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            insulin_type: InsulinType::RapidActing,
            custom_insulin: None,
            insulin_sensitivity: defaults::INSULIN_SENSITIVITY_MG_DL,
            carb_ratio: defaults::CARB_RATIO,
            carb_absorption_rate: defaults::CARB_ABSORPTION_RATE,
            carb_absorption_delay: defaults::CARB_ABSORPTION_DELAY,
            auto_select_model: true,
            forced_model: ModelKind::Polynomial,
            forced_polynomial_degree: 2,
            treatment_adjustment: false,
            low_threshold: 70.0,
            time_horizon_minutes: 30,
            interval_minutes: 5,
        }
    }
}

impl PredictionSettings {
    /// Insulin curve to use, honoring a configured custom profile. A
    /// malformed custom profile falls back to the built-in curve.
    pub fn insulin_profile(&self) -> InsulinProfile {
        match (self.insulin_type, self.custom_insulin) {
            (InsulinType::Custom, Some(profile)) if profile.is_valid() => profile,
            (InsulinType::Custom, Some(profile)) => {
                tracing::warn!(?profile, "Ignoring invalid custom insulin profile");
                self.insulin_type.profile()
            }
            (insulin_type, _) => insulin_type.profile(),
        }
    }

    pub fn selection_policy(&self) -> ModelSelectionPolicy {
        if self.auto_select_model {
            ModelSelectionPolicy::Auto
        } else {
            ModelSelectionPolicy::Fixed(TrendModel::from_kind(
                self.forced_model,
                self.forced_polynomial_degree,
            ))
        }
    }

    pub fn time_horizon(&self) -> Duration {
        Duration::minutes(i64::from(self.time_horizon_minutes))
    }
}

impl SettingsProvider for PredictionSettings {
    fn prediction_settings(&self) -> PredictionSettings {
        self.clone()
    }
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_prediction_settings(path: &Path) -> anyhow::Result<PredictionSettings> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_prediction_settings(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, PredictionSettings::default());
        assert_eq!(settings.selection_policy(), ModelSelectionPolicy::Auto);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prediction.toml");
        fs::write(
            &path,
            r#"
insulin_type = "custom"
carb_ratio = 12.5
auto_select_model = false
forced_model = "exponential"
treatment_adjustment = true

[custom_insulin]
onset_minutes = 20.0
peak_minutes = 90.0
duration_minutes = 240.0
"#,
        )
        .unwrap();

        let settings = load_prediction_settings(&path).unwrap();
        assert_eq!(settings.carb_ratio, 12.5);
        assert!(settings.treatment_adjustment);
        assert_eq!(settings.insulin_sensitivity, 54.0);
        assert_eq!(settings.insulin_profile(), InsulinProfile::new(20.0, 90.0, 240.0));
        assert_eq!(
            settings.selection_policy(),
            ModelSelectionPolicy::Fixed(TrendModel::Exponential)
        );
    }

    #[test]
    fn test_custom_without_profile_uses_rapid_acting() {
        let settings = PredictionSettings {
            insulin_type: InsulinType::Custom,
            ..PredictionSettings::default()
        };
        assert_eq!(settings.insulin_profile(), InsulinType::RapidActing.profile());
    }

    #[test]
    fn test_invalid_custom_profile_uses_rapid_acting() {
        for profile in [
            InsulinProfile::new(15.0, 75.0, 1.0e12),
            InsulinProfile::new(90.0, 75.0, 180.0),
            InsulinProfile::new(f64::NAN, 75.0, 180.0),
        ] {
            let settings = PredictionSettings {
                insulin_type: InsulinType::Custom,
                custom_insulin: Some(profile),
                ..PredictionSettings::default()
            };
            assert_eq!(settings.insulin_profile(), InsulinType::RapidActing.profile());
        }
    }

    #[test]
    fn test_forced_polynomial_degree_is_clamped() {
        let settings = PredictionSettings {
            auto_select_model: false,
            forced_polynomial_degree: 5,
            ..PredictionSettings::default()
        };
        assert_eq!(
            settings.selection_policy(),
            ModelSelectionPolicy::Fixed(TrendModel::Polynomial { degree: 3 })
        );
        assert_eq!(settings.time_horizon(), Duration::minutes(30));
    }
}
