// Glucose prediction engine - trend models, IOB/COB and forecast generation
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::model_selector::ModelSelectionPolicy;
pub use application::prediction_service::PredictionService;
pub use domain::glucose::GlucoseSample;
pub use domain::prediction::{LowGlucosePrediction, LowSeverity, ModelKind, PredictionPoint};
pub use domain::treatment::{TreatmentKind, TreatmentRecord};
pub use error::PredictionError;
pub use infrastructure::config::PredictionSettings;
