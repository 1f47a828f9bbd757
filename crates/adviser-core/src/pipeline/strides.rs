//! Strides deciding whether a final state is accepted.

use std::collections::HashSet;

use super::config::ConfigReader;
use super::{PipelineUnit, Stride, StrideOutcome, UnitConfiguration};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::State;

/// Rejects final states whose pinned set was already produced in this run.
pub struct UniqueStackStride {
    configuration: UnitConfiguration,
    seen: HashSet<Vec<PackageTuple>>,
}

impl UniqueStackStride {
    pub const NAME: &'static str = "UniqueStackStride";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        ConfigReader::new(Self::NAME, &configuration, &[])?;
        Ok(Self {
            configuration,
            seen: HashSet::new(),
        })
    }

    fn fingerprint(state: &State) -> Vec<PackageTuple> {
        let mut stack: Vec<PackageTuple> = state.iter_resolved_dependencies().cloned().collect();
        stack.sort();
        stack
    }
}

impl PipelineUnit for UniqueStackStride {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }

    fn pre_run(&mut self, _context: &mut Context) -> Result<()> {
        self.seen.clear();
        Ok(())
    }

    fn post_run(&mut self, _context: &mut Context) {
        log::debug!("{} unique stacks seen", self.seen.len());
    }
}

impl Stride for UniqueStackStride {
    fn run(&mut self, _context: &mut Context, state: &State) -> Result<StrideOutcome> {
        if self.seen.insert(Self::fingerprint(state)) {
            Ok(StrideOutcome::Accepted)
        } else {
            Ok(StrideOutcome::Rejected("stack already produced".to_string()))
        }
    }
}

/// Rejects final states scoring below `score_threshold`.
pub struct ScoreThresholdStride {
    configuration: UnitConfiguration,
    score_threshold: f64,
}

impl ScoreThresholdStride {
    pub const NAME: &'static str = "ScoreThresholdStride";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["score_threshold"])?;
        let score_threshold = reader.required_f64("score_threshold")?;
        Ok(Self {
            configuration,
            score_threshold,
        })
    }
}

impl PipelineUnit for ScoreThresholdStride {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Stride for ScoreThresholdStride {
    fn run(&mut self, _context: &mut Context, state: &State) -> Result<StrideOutcome> {
        if state.score < self.score_threshold {
            return Ok(StrideOutcome::Rejected(format!(
                "score {} is below threshold {}",
                state.score, self.score_threshold
            )));
        }
        Ok(StrideOutcome::Accepted)
    }
}
