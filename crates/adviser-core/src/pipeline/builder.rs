//! Registry of the known units and pipeline assembly.

use std::fmt;

use serde_json::{json, Value};

use super::boots::EnvironmentInfoBoot;
use super::sieves::{CutPreReleasesSieve, CveSieve, LimitLatestVersionsSieve, SolvedSieve};
use super::steps::{CvePenalizationStep, LatestVersionStep};
use super::strides::{ScoreThresholdStride, UniqueStackStride};
use super::wraps::CveWarningWrap;
use super::{Boot, Pipeline, Sieve, Step, Stride, UnitConfiguration, Wrap};
use crate::config::{DecisionType, RecommendationType, UnitEntry};
use crate::environment::RuntimeEnvironment;
use crate::error::{AdviserError, Result};
use crate::project::Project;

/// Upper bound on discovery rounds; every unit includes itself at most a few times.
const MAX_DISCOVERY_ROUNDS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitCategory {
    Boot,
    Sieve,
    Step,
    Stride,
    Wrap,
}

impl UnitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCategory::Boot => "boot",
            UnitCategory::Sieve => "sieve",
            UnitCategory::Step => "step",
            UnitCategory::Stride => "stride",
            UnitCategory::Wrap => "wrap",
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An instantiated unit of any category
pub enum UnitInstance {
    Boot(Box<dyn Boot>),
    Sieve(Box<dyn Sieve>),
    Step(Box<dyn Step>),
    Stride(Box<dyn Stride>),
    Wrap(Box<dyn Wrap>),
}

/// What the builder knows when deciding which units to include
#[derive(Debug, Clone)]
pub struct BuilderContext {
    pub project: Project,
    pub runtime_environment: RuntimeEnvironment,
    pub recommendation_type: Option<RecommendationType>,
    pub decision_type: Option<DecisionType>,
    included: Vec<(UnitKind, UnitConfiguration)>,
}

impl BuilderContext {
    pub fn new(
        project: Project,
        runtime_environment: RuntimeEnvironment,
        recommendation_type: Option<RecommendationType>,
        decision_type: Option<DecisionType>,
    ) -> Self {
        Self {
            project,
            runtime_environment,
            recommendation_type,
            decision_type,
            included: Vec::new(),
        }
    }

    pub fn is_adviser_pipeline(&self) -> bool {
        self.recommendation_type.is_some()
    }

    pub fn is_dependency_monkey_pipeline(&self) -> bool {
        self.decision_type.is_some()
    }

    pub fn is_included(&self, kind: UnitKind) -> bool {
        self.included.iter().any(|(k, _)| *k == kind)
    }

    /// Units included so far, in inclusion order
    pub fn included(&self) -> &[(UnitKind, UnitConfiguration)] {
        &self.included
    }

    fn include(&mut self, kind: UnitKind, configuration: UnitConfiguration) {
        self.included.push((kind, configuration));
    }
}

/// Every unit the builder knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    EnvironmentInfoBoot,
    CveSieve,
    SolvedSieve,
    CutPreReleasesSieve,
    LimitLatestVersionsSieve,
    CvePenalizationStep,
    LatestVersionStep,
    UniqueStackStride,
    ScoreThresholdStride,
    CveWarningWrap,
}

impl UnitKind {
    /// All kinds in discovery order
    pub fn all() -> &'static [UnitKind] {
        &[
            UnitKind::EnvironmentInfoBoot,
            UnitKind::SolvedSieve,
            UnitKind::CveSieve,
            UnitKind::CutPreReleasesSieve,
            UnitKind::LimitLatestVersionsSieve,
            UnitKind::CvePenalizationStep,
            UnitKind::LatestVersionStep,
            UnitKind::UniqueStackStride,
            UnitKind::ScoreThresholdStride,
            UnitKind::CveWarningWrap,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnitKind::EnvironmentInfoBoot => "EnvironmentInfoBoot",
            UnitKind::CveSieve => "CveSieve",
            UnitKind::SolvedSieve => "SolvedSieve",
            UnitKind::CutPreReleasesSieve => "CutPreReleasesSieve",
            UnitKind::LimitLatestVersionsSieve => "LimitLatestVersionsSieve",
            UnitKind::CvePenalizationStep => "CvePenalizationStep",
            UnitKind::LatestVersionStep => "LatestVersionStep",
            UnitKind::UniqueStackStride => "UniqueStackStride",
            UnitKind::ScoreThresholdStride => "ScoreThresholdStride",
            UnitKind::CveWarningWrap => "CveWarningWrap",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| AdviserError::Config(format!("Unknown pipeline unit: {}", name)))
    }

    pub fn category(&self) -> UnitCategory {
        match self {
            UnitKind::EnvironmentInfoBoot => UnitCategory::Boot,
            UnitKind::CveSieve
            | UnitKind::SolvedSieve
            | UnitKind::CutPreReleasesSieve
            | UnitKind::LimitLatestVersionsSieve => UnitCategory::Sieve,
            UnitKind::CvePenalizationStep | UnitKind::LatestVersionStep => UnitCategory::Step,
            UnitKind::UniqueStackStride | UnitKind::ScoreThresholdStride => UnitCategory::Stride,
            UnitKind::CveWarningWrap => UnitCategory::Wrap,
        }
    }

    /// Configurations this unit should be included with; empty means "do not include"
    pub fn should_include(&self, builder_context: &BuilderContext) -> Vec<UnitConfiguration> {
        if builder_context.is_included(*self) {
            return Vec::new();
        }

        let recommendation_type = builder_context.recommendation_type;
        let include = match self {
            UnitKind::EnvironmentInfoBoot | UnitKind::SolvedSieve => true,
            UnitKind::CveSieve => recommendation_type == Some(RecommendationType::Security),
            UnitKind::CutPreReleasesSieve => matches!(
                recommendation_type,
                Some(RecommendationType::Stable | RecommendationType::Security | RecommendationType::Performance)
            ),
            UnitKind::LimitLatestVersionsSieve => recommendation_type == Some(RecommendationType::Latest),
            UnitKind::CvePenalizationStep => matches!(
                recommendation_type,
                Some(RecommendationType::Stable | RecommendationType::Testing | RecommendationType::Performance)
            ),
            UnitKind::LatestVersionStep | UnitKind::CveWarningWrap => builder_context.is_adviser_pipeline(),
            UnitKind::UniqueStackStride => builder_context.is_dependency_monkey_pipeline(),
            // Only used when listed explicitly.
            UnitKind::ScoreThresholdStride => false,
        };
        if !include {
            return Vec::new();
        }

        vec![self.default_configuration()]
    }

    fn default_configuration(&self) -> UnitConfiguration {
        let value = match self {
            UnitKind::CveSieve | UnitKind::CutPreReleasesSieve => json!({ "package_name": null }),
            UnitKind::SolvedSieve => json!({ "without_error": true }),
            UnitKind::LimitLatestVersionsSieve => json!({ "limit_latest_versions": 5 }),
            UnitKind::CvePenalizationStep => json!({ "cve_penalization": CvePenalizationStep::DEFAULT_PENALIZATION }),
            UnitKind::LatestVersionStep => json!({ "multiplier": 1.0 }),
            _ => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => UnitConfiguration::new(),
        }
    }

    /// Create a unit from a configuration, validating it
    pub fn instantiate(&self, configuration: UnitConfiguration) -> Result<UnitInstance> {
        let unit = match self {
            UnitKind::EnvironmentInfoBoot => UnitInstance::Boot(Box::new(EnvironmentInfoBoot::new(configuration)?)),
            UnitKind::CveSieve => UnitInstance::Sieve(Box::new(CveSieve::new(configuration)?)),
            UnitKind::SolvedSieve => UnitInstance::Sieve(Box::new(SolvedSieve::new(configuration)?)),
            UnitKind::CutPreReleasesSieve => UnitInstance::Sieve(Box::new(CutPreReleasesSieve::new(configuration)?)),
            UnitKind::LimitLatestVersionsSieve => {
                UnitInstance::Sieve(Box::new(LimitLatestVersionsSieve::new(configuration)?))
            }
            UnitKind::CvePenalizationStep => UnitInstance::Step(Box::new(CvePenalizationStep::new(configuration)?)),
            UnitKind::LatestVersionStep => UnitInstance::Step(Box::new(LatestVersionStep::new(configuration)?)),
            UnitKind::UniqueStackStride => UnitInstance::Stride(Box::new(UniqueStackStride::new(configuration)?)),
            UnitKind::ScoreThresholdStride => UnitInstance::Stride(Box::new(ScoreThresholdStride::new(configuration)?)),
            UnitKind::CveWarningWrap => UnitInstance::Wrap(Box::new(CveWarningWrap::new(configuration)?)),
        };
        Ok(unit)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Assembles a [`Pipeline`] by discovery or from an explicit unit list
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Ask every unit kind for configurations until no new unit is included
    pub fn discover_configurations(builder_context: &mut BuilderContext) -> Result<()> {
        for round in 0.. {
            if round >= MAX_DISCOVERY_ROUNDS {
                return Err(AdviserError::Config(
                    "Pipeline discovery did not settle; a unit keeps including itself".to_string(),
                ));
            }

            let mut changed = false;
            for kind in UnitKind::all() {
                for configuration in kind.should_include(builder_context) {
                    log::debug!("Including {} {} with configuration {}", kind.category(), kind, Value::Object(configuration.clone()));
                    builder_context.include(*kind, configuration);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Ok(())
    }

    /// Discover and instantiate the units for `builder_context`
    pub fn discover(builder_context: &mut BuilderContext) -> Result<Pipeline> {
        Self::discover_configurations(builder_context)?;
        let mut pipeline = Pipeline::new();
        for (kind, configuration) in builder_context.included() {
            pipeline.add(kind.instantiate(configuration.clone())?);
        }
        Ok(pipeline)
    }

    /// Instantiate an explicitly configured unit list
    pub fn from_entries(entries: &[UnitEntry]) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new();
        for entry in entries {
            let kind = UnitKind::from_name(&entry.name)?;
            pipeline.add(kind.instantiate(entry.configuration.clone())?);
        }
        Ok(pipeline)
    }

    /// Explicit units when configured, discovered units otherwise
    pub fn build(builder_context: &mut BuilderContext, entries: Option<&[UnitEntry]>) -> Result<Pipeline> {
        match entries {
            Some(entries) => Self::from_entries(entries),
            None => Self::discover(builder_context),
        }
    }
}
