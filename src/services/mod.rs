pub mod cache;
pub mod catalog;
pub mod combine;
pub mod engine;
pub mod enrich;
pub mod llm;
pub mod profile;
pub mod rules;
pub mod scoring;

pub use engine::{EngineSettings, RecommendationEngine, StatsSnapshot};
