// src/config/mod.rs
pub mod aggregator;
pub mod ai;

pub use aggregator::{AggregatorConfig, SelectionMode};
pub use ai::AiConfig;
