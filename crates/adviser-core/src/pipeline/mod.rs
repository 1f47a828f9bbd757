//! Pipeline units hooked into the resolution loop.
//!
//! Units come in five categories, each with its own trait:
//!
//! - [`Boot`]: runs once before the search starts
//! - [`Sieve`]: filters candidate releases before they enter a state
//! - [`Step`]: scores (or rejects) resolving one release in a state
//! - [`Stride`]: accepts or rejects a final state
//! - [`Wrap`]: annotates an accepted final state
//!
//! Policy decisions are returned as outcome values. Errors are reserved for
//! failures that must abort the run.

mod boots;
mod builder;
mod config;
mod sieves;
mod steps;
mod strides;
mod wraps;

pub use boots::EnvironmentInfoBoot;
pub use builder::{BuilderContext, PipelineBuilder, UnitCategory, UnitInstance, UnitKind};
pub use sieves::{CutPreReleasesSieve, CveSieve, LimitLatestVersionsSieve, SolvedSieve};
pub use steps::{CvePenalizationStep, LatestVersionStep};
pub use strides::{ScoreThresholdStride, UniqueStackStride};
pub use wraps::CveWarningWrap;

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::justification::Justification;
use crate::package::PackageVersion;
use crate::state::State;

/// Configuration of one unit instance
pub type UnitConfiguration = serde_json::Map<String, serde_json::Value>;

/// Result of running the steps for one resolution step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Resolve the release, adding `score` to the state
    Accepted {
        score: f64,
        justification: Vec<Justification>,
    },
    /// The release must not be resolved in this state
    Rejected { reason: String },
    /// Drop the dependency from the state without resolving it
    Skipped,
}

impl StepOutcome {
    /// Accepted without changing the score
    pub fn neutral() -> Self {
        StepOutcome::Accepted {
            score: 0.0,
            justification: Vec::new(),
        }
    }
}

/// Result of final state acceptance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrideOutcome {
    Accepted,
    Rejected(String),
}

/// Behaviour shared by every unit
pub trait PipelineUnit {
    fn name(&self) -> &'static str;

    fn configuration(&self) -> &UnitConfiguration;

    /// Called before the search starts
    fn pre_run(&mut self, _context: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Called once the search finished
    fn post_run(&mut self, _context: &mut Context) {}
}

pub trait Boot: PipelineUnit {
    fn run(&mut self, context: &mut Context) -> Result<()>;
}

pub trait Sieve: PipelineUnit {
    /// Return the releases that may be considered, preserving order
    fn run(&mut self, context: &mut Context, package_versions: Vec<Arc<PackageVersion>>) -> Result<Vec<Arc<PackageVersion>>>;
}

pub trait Step: PipelineUnit {
    fn run(&mut self, context: &mut Context, state: &State, package_version: &PackageVersion) -> Result<StepOutcome>;
}

pub trait Stride: PipelineUnit {
    fn run(&mut self, context: &mut Context, state: &State) -> Result<StrideOutcome>;
}

pub trait Wrap: PipelineUnit {
    fn run(&mut self, context: &mut Context, state: &mut State) -> Result<()>;
}

/// The instantiated units of a run, in execution order per category
#[derive(Default)]
pub struct Pipeline {
    boots: Vec<Box<dyn Boot>>,
    sieves: Vec<Box<dyn Sieve>>,
    steps: Vec<Box<dyn Step>>,
    strides: Vec<Box<dyn Stride>>,
    wraps: Vec<Box<dyn Wrap>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: UnitInstance) {
        match unit {
            UnitInstance::Boot(unit) => self.boots.push(unit),
            UnitInstance::Sieve(unit) => self.sieves.push(unit),
            UnitInstance::Step(unit) => self.steps.push(unit),
            UnitInstance::Stride(unit) => self.strides.push(unit),
            UnitInstance::Wrap(unit) => self.wraps.push(unit),
        }
    }

    pub fn with_unit(mut self, unit: UnitInstance) -> Self {
        self.add(unit);
        self
    }

    pub fn len(&self) -> usize {
        self.boots.len() + self.sieves.len() + self.steps.len() + self.strides.len() + self.wraps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(category, unit name)` of every unit in execution order
    pub fn unit_names(&self) -> Vec<(UnitCategory, &'static str)> {
        let mut names = Vec::with_capacity(self.len());
        names.extend(self.boots.iter().map(|u| (UnitCategory::Boot, u.name())));
        names.extend(self.sieves.iter().map(|u| (UnitCategory::Sieve, u.name())));
        names.extend(self.steps.iter().map(|u| (UnitCategory::Step, u.name())));
        names.extend(self.strides.iter().map(|u| (UnitCategory::Stride, u.name())));
        names.extend(self.wraps.iter().map(|u| (UnitCategory::Wrap, u.name())));
        names
    }

    /// Call `pre_run` on every unit, then run the boots
    pub fn pre_run(&mut self, context: &mut Context) -> Result<()> {
        for unit in &mut self.boots {
            unit.pre_run(context)?;
        }
        for unit in &mut self.sieves {
            unit.pre_run(context)?;
        }
        for unit in &mut self.steps {
            unit.pre_run(context)?;
        }
        for unit in &mut self.strides {
            unit.pre_run(context)?;
        }
        for unit in &mut self.wraps {
            unit.pre_run(context)?;
        }

        for boot in &mut self.boots {
            log::debug!("Running boot {}", boot.name());
            boot.run(context)?;
        }
        Ok(())
    }

    pub fn post_run(&mut self, context: &mut Context) {
        for unit in &mut self.boots {
            unit.post_run(context);
        }
        for unit in &mut self.sieves {
            unit.post_run(context);
        }
        for unit in &mut self.steps {
            unit.post_run(context);
        }
        for unit in &mut self.strides {
            unit.post_run(context);
        }
        for unit in &mut self.wraps {
            unit.post_run(context);
        }
    }

    pub fn run_sieves(
        &mut self,
        context: &mut Context,
        mut package_versions: Vec<Arc<PackageVersion>>,
    ) -> Result<Vec<Arc<PackageVersion>>> {
        for sieve in &mut self.sieves {
            if package_versions.is_empty() {
                break;
            }
            package_versions = sieve.run(context, package_versions)?;
        }
        Ok(package_versions)
    }

    /// Run every step; the first rejection or skip ends the evaluation
    pub fn run_steps(&mut self, context: &mut Context, state: &State, package_version: &PackageVersion) -> Result<StepOutcome> {
        let mut total = 0.0;
        let mut records = Vec::new();
        for step in &mut self.steps {
            match step.run(context, state, package_version)? {
                StepOutcome::Accepted { score, justification } => {
                    total += score;
                    records.extend(justification);
                }
                StepOutcome::Rejected { reason } => {
                    log::trace!(
                        "Step {} rejected {}: {}",
                        step.name(),
                        package_version.tuple(),
                        reason
                    );
                    return Ok(StepOutcome::Rejected { reason });
                }
                StepOutcome::Skipped => {
                    log::trace!("Step {} skipped {}", step.name(), package_version.tuple());
                    return Ok(StepOutcome::Skipped);
                }
            }
        }
        Ok(StepOutcome::Accepted {
            score: total,
            justification: records,
        })
    }

    pub fn run_strides(&mut self, context: &mut Context, state: &State) -> Result<StrideOutcome> {
        for stride in &mut self.strides {
            if let StrideOutcome::Rejected(reason) = stride.run(context, state)? {
                log::debug!("Stride {} rejected final state {}: {}", stride.name(), state.id(), reason);
                return Ok(StrideOutcome::Rejected(reason));
            }
        }
        Ok(StrideOutcome::Accepted)
    }

    pub fn run_wraps(&mut self, context: &mut Context, state: &mut State) -> Result<()> {
        for wrap in &mut self.wraps {
            wrap.run(context, state)?;
        }
        Ok(())
    }
}
