// Application layer - collaborators, calculators and the prediction use case
pub mod cob_calculator;
pub mod iob_calculator;
pub mod model_selector;
pub mod prediction_service;
pub mod repositories;
