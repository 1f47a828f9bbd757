//! Greedy hill climbing.

use super::{latest_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::StateId;

/// Always expand the top state, resolving its most recently added dependency.
#[derive(Debug, Default)]
pub struct HillClimbing;

impl HillClimbing {
    pub fn new() -> Self {
        Self
    }
}

impl Predictor for HillClimbing {
    fn name(&self) -> &'static str {
        "hill-climbing"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        latest_dependency(context.beam.top()?)
    }
}
