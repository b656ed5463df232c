// Infrastructure layer - settings loading and storage adapters
pub mod config;
pub mod memory_store;
