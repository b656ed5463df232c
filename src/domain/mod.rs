// Domain layer - value objects and pure math
pub mod glucose;
pub mod insulin;
pub mod on_board;
pub mod prediction;
pub mod statistics;
pub mod treatment;
pub mod trend_model;
