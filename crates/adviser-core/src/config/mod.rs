mod config;
mod source;

pub use config::{AdviserConfig, DecisionType, PredictorConfig, RecommendationType, UnitEntry};
pub use source::{ConfigLoader, ConfigSource};
