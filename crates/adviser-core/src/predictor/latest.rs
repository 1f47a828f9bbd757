//! Approximation of the latest-versions stack.

use super::{latest_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Greedy approximation of "always pick the newest release".
///
/// Keeps extending the most recently added state with the newest candidate of
/// its newest dependency, and orders the beam by resolution depth so that the
/// deepest chain is continued when the last state was finished.
#[derive(Debug, Default)]
pub struct ApproximatingLatest;

impl ApproximatingLatest {
    pub fn new() -> Self {
        Self
    }
}

impl Predictor for ApproximatingLatest {
    fn name(&self) -> &'static str {
        "approximating-latest"
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = match context.beam.get_last() {
            Some(state) => state,
            None => context.beam.top()?,
        };
        latest_dependency(state)
    }

    fn beam_key(&self, state: &State) -> Option<f64> {
        Some(state.resolved_dependencies().len() as f64)
    }
}
