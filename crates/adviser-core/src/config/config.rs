use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::RuntimeEnvironment;
use crate::error::{AdviserError, Result};

/// What kind of stack the adviser should recommend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Latest,
    Stable,
    Testing,
    Performance,
    Security,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::Latest => "latest",
            RecommendationType::Stable => "stable",
            RecommendationType::Testing => "testing",
            RecommendationType::Performance => "performance",
            RecommendationType::Security => "security",
        }
    }
}

impl FromStr for RecommendationType {
    type Err = AdviserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(RecommendationType::Latest),
            "stable" => Ok(RecommendationType::Stable),
            "testing" => Ok(RecommendationType::Testing),
            "performance" => Ok(RecommendationType::Performance),
            "security" => Ok(RecommendationType::Security),
            other => Err(AdviserError::Config(format!("Unknown recommendation type: {}", other))),
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How dependency-monkey picks the stacks it generates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    Random,
    All,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Random => "random",
            DecisionType::All => "all",
        }
    }
}

impl FromStr for DecisionType {
    type Err = AdviserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "random" => Ok(DecisionType::Random),
            "all" => Ok(DecisionType::All),
            other => Err(AdviserError::Config(format!("Unknown decision type: {}", other))),
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_temperature() -> f64 {
    1.0
}

fn default_policy_size() -> usize {
    8192
}

fn default_policy_check_interval() -> usize {
    1000
}

/// Predictor selection and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PredictorConfig {
    AdaptiveSimulatedAnnealing {
        #[serde(default = "default_temperature")]
        temperature: f64,
    },
    HillClimbing,
    ApproximatingLatest,
    TemporalDifference {
        #[serde(default = "default_temperature")]
        temperature: f64,
        #[serde(default = "default_policy_size")]
        policy_size: usize,
        #[serde(default = "default_policy_check_interval")]
        policy_check_interval: usize,
    },
    Mcts {
        #[serde(default = "default_temperature")]
        temperature: f64,
        #[serde(default = "default_policy_size")]
        policy_size: usize,
        #[serde(default = "default_policy_check_interval")]
        policy_check_interval: usize,
    },
    RandomWalk,
    PackageCombinations {
        #[serde(default)]
        package_combinations: Vec<String>,
    },
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig::AdaptiveSimulatedAnnealing {
            temperature: default_temperature(),
        }
    }
}

impl PredictorConfig {
    /// Predictor with default parameters, selected by its kebab-case name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "adaptive-simulated-annealing" | "annealing" => Ok(Self::default()),
            "hill-climbing" => Ok(PredictorConfig::HillClimbing),
            "approximating-latest" => Ok(PredictorConfig::ApproximatingLatest),
            "temporal-difference" | "td" => Ok(PredictorConfig::TemporalDifference {
                temperature: default_temperature(),
                policy_size: default_policy_size(),
                policy_check_interval: default_policy_check_interval(),
            }),
            "mcts" => Ok(PredictorConfig::Mcts {
                temperature: default_temperature(),
                policy_size: default_policy_size(),
                policy_check_interval: default_policy_check_interval(),
            }),
            "random-walk" | "sampling" => Ok(PredictorConfig::RandomWalk),
            "package-combinations" => Ok(PredictorConfig::PackageCombinations {
                package_combinations: Vec::new(),
            }),
            other => Err(AdviserError::Config(format!("Unknown predictor: {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PredictorConfig::AdaptiveSimulatedAnnealing { .. } => "adaptive-simulated-annealing",
            PredictorConfig::HillClimbing => "hill-climbing",
            PredictorConfig::ApproximatingLatest => "approximating-latest",
            PredictorConfig::TemporalDifference { .. } => "temporal-difference",
            PredictorConfig::Mcts { .. } => "mcts",
            PredictorConfig::RandomWalk => "random-walk",
            PredictorConfig::PackageCombinations { .. } => "package-combinations",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PredictorConfig::AdaptiveSimulatedAnnealing { temperature } => validate_temperature(*temperature),
            PredictorConfig::TemporalDifference {
                temperature,
                policy_size,
                policy_check_interval,
            }
            | PredictorConfig::Mcts {
                temperature,
                policy_size,
                policy_check_interval,
            } => {
                validate_temperature(*temperature)?;
                if *policy_size == 0 {
                    return Err(AdviserError::Config("policy_size must be at least 1".to_string()));
                }
                if *policy_check_interval == 0 {
                    return Err(AdviserError::Config(
                        "policy_check_interval must be at least 1".to_string(),
                    ));
                }
                Ok(())
            }
            PredictorConfig::PackageCombinations { package_combinations } => {
                if package_combinations.is_empty() {
                    return Err(AdviserError::Config(
                        "package-combinations predictor requires at least one package name".to_string(),
                    ));
                }
                Ok(())
            }
            PredictorConfig::HillClimbing | PredictorConfig::ApproximatingLatest | PredictorConfig::RandomWalk => Ok(()),
        }
    }
}

fn validate_temperature(temperature: f64) -> Result<()> {
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(AdviserError::Config(format!(
            "temperature must be a finite non-negative number, got {}",
            temperature
        )));
    }
    Ok(())
}

/// An explicitly configured pipeline unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub name: String,
    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

fn default_beam_width() -> usize {
    5000
}

fn default_limit() -> usize {
    10_000
}

fn default_count() -> usize {
    3
}

fn default_progress_interval() -> usize {
    1000
}

/// Settings of one resolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviserConfig {
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    /// Maximum number of iterations
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Number of stacks to return
    #[serde(default = "default_count")]
    pub count: usize,
    /// Random seed; drawn at random and reported when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    #[serde(default)]
    pub recommendation_type: Option<RecommendationType>,
    #[serde(default)]
    pub decision_type: Option<DecisionType>,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub runtime_environment: RuntimeEnvironment,
    /// Explicit pipeline; units are discovered when absent
    #[serde(default)]
    pub pipeline: Option<Vec<UnitEntry>>,
    /// Log a progress line every this many iterations
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for AdviserConfig {
    fn default() -> Self {
        Self {
            beam_width: default_beam_width(),
            limit: default_limit(),
            count: default_count(),
            seed: None,
            time_limit_secs: None,
            recommendation_type: Some(RecommendationType::Stable),
            decision_type: None,
            predictor: PredictorConfig::default(),
            runtime_environment: RuntimeEnvironment::default(),
            pipeline: None,
            progress_interval: default_progress_interval(),
        }
    }
}

impl AdviserConfig {
    /// Parse TOML configuration
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Parse JSON configuration
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Switch to adviser mode
    pub fn with_recommendation_type(mut self, recommendation_type: RecommendationType) -> Self {
        self.recommendation_type = Some(recommendation_type);
        self.decision_type = None;
        self
    }

    /// Switch to dependency-monkey mode
    pub fn with_decision_type(mut self, decision_type: DecisionType) -> Self {
        self.decision_type = Some(decision_type);
        self.recommendation_type = None;
        self
    }

    pub fn with_predictor(mut self, predictor: PredictorConfig) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// The predictor a run uses.
    ///
    /// Dependency-monkey runs configured with the default annealing predictor
    /// derive their strategy from the decision type instead: `random` samples
    /// the beam uniformly, `all` walks it depth first.
    pub fn effective_predictor(&self) -> PredictorConfig {
        match (self.decision_type, &self.predictor) {
            (Some(decision_type), PredictorConfig::AdaptiveSimulatedAnnealing { .. }) => match decision_type {
                DecisionType::Random => PredictorConfig::RandomWalk,
                DecisionType::All => PredictorConfig::HillClimbing,
            },
            _ => self.predictor.clone(),
        }
    }

    /// Reject invalid settings; nothing is defaulted silently
    pub fn validate(&self) -> Result<()> {
        if self.beam_width == 0 {
            return Err(AdviserError::Config("beam_width must be at least 1".to_string()));
        }
        if self.limit == 0 {
            return Err(AdviserError::Config("limit must be at least 1".to_string()));
        }
        if self.count == 0 {
            return Err(AdviserError::Config("count must be at least 1".to_string()));
        }
        match (self.recommendation_type, self.decision_type) {
            (Some(_), Some(_)) => {
                return Err(AdviserError::Config(
                    "recommendation_type and decision_type are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(AdviserError::Config(
                    "one of recommendation_type or decision_type must be set".to_string(),
                ))
            }
            _ => {}
        }
        self.predictor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AdviserConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.count, 3);
        assert_eq!(config.recommendation_type, Some(RecommendationType::Stable));
    }

    #[test]
    fn test_parse_toml_with_predictor() {
        let config = AdviserConfig::from_toml(
            r#"
            beam_width = 10
            limit = 200
            seed = 42
            recommendation_type = "security"

            [predictor]
            type = "temporal-difference"
            temperature = 2.5

            [runtime_environment]
            os_name = "fedora"
            os_version = "38"
            python_version = "3.11"
            "#,
        )
        .unwrap();

        assert_eq!(config.beam_width, 10);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.count, 3);
        assert_eq!(config.recommendation_type, Some(RecommendationType::Security));
        assert_eq!(
            config.predictor,
            PredictorConfig::TemporalDifference {
                temperature: 2.5,
                policy_size: 8192,
                policy_check_interval: 1000,
            }
        );
        assert_eq!(config.runtime_environment.python_version.as_deref(), Some("3.11"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_must_be_exactly_one() {
        let neither = AdviserConfig::from_json("{}").unwrap();
        assert!(neither.validate().is_err());

        let mut both = AdviserConfig::default();
        both.decision_type = Some(DecisionType::Random);
        assert!(both.validate().is_err());

        let monkey = AdviserConfig::default().with_decision_type(DecisionType::All);
        assert!(monkey.validate().is_ok());
    }

    #[test]
    fn test_effective_predictor_for_dependency_monkey() {
        let random = AdviserConfig::default().with_decision_type(DecisionType::Random);
        assert_eq!(random.effective_predictor(), PredictorConfig::RandomWalk);

        let all = AdviserConfig::default().with_decision_type(DecisionType::All);
        assert_eq!(all.effective_predictor(), PredictorConfig::HillClimbing);

        let pinned = AdviserConfig::default()
            .with_decision_type(DecisionType::Random)
            .with_predictor(PredictorConfig::Mcts {
                temperature: 1.0,
                policy_size: 10,
                policy_check_interval: 10,
            });
        assert_eq!(pinned.effective_predictor().name(), "mcts");

        let adviser = AdviserConfig::default();
        assert_eq!(adviser.effective_predictor(), PredictorConfig::default());
    }

    #[test]
    fn test_package_combinations_requires_names() {
        let config = AdviserConfig::default().with_predictor(PredictorConfig::PackageCombinations {
            package_combinations: vec![],
        });
        assert!(config.validate().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_negative_temperature_rejected() {
        let config = AdviserConfig::default()
            .with_predictor(PredictorConfig::AdaptiveSimulatedAnnealing { temperature: -1.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_predictor_from_name() {
        assert_eq!(PredictorConfig::from_name("hill-climbing").unwrap(), PredictorConfig::HillClimbing);
        assert_eq!(PredictorConfig::from_name("mcts").unwrap().name(), "mcts");
        assert!(PredictorConfig::from_name("genetic").is_err());
    }

    #[test]
    fn test_explicit_pipeline_entries() {
        let config = AdviserConfig::from_toml(
            r#"
            recommendation_type = "latest"

            [[pipeline]]
            name = "LimitLatestVersionsSieve"
            configuration = { limit_latest_versions = 2 }

            [[pipeline]]
            name = "UniqueStackStride"
            "#,
        )
        .unwrap();
        let pipeline = config.pipeline.unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline[0].configuration["limit_latest_versions"], 2);
        assert!(pipeline[1].configuration.is_empty());
    }
}
