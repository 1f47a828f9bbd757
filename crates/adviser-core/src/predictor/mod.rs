//! Predictors decide which state to expand next and which of its
//! unresolved dependencies to resolve.
//!
//! Every strategy implements [`Predictor`] directly. Strategies that need a
//! cooling schedule hold an [`AnnealingSchedule`]; strategies that learn from
//! rewards hold a bounded [`PolicyTable`].

mod annealing;
mod combinations;
mod hill_climbing;
mod latest;
mod mcts;
mod policy;
mod sampling;
mod schedule;
mod td;

pub use annealing::AdaptiveSimulatedAnnealing;
pub use combinations::PackageCombinations;
pub use hill_climbing::HillClimbing;
pub use latest::ApproximatingLatest;
pub use mcts::Mcts;
pub use policy::{PolicyEntry, PolicyTable};
pub use sampling::RandomWalk;
pub use schedule::{acceptance_probability, AnnealingSchedule, TemperatureSchedule};
pub use td::TemporalDifference;

use rand::Rng;

use crate::config::PredictorConfig;
use crate::context::Context;
use crate::error::{AdviserError, Result};
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Strategy choosing the next `(state, dependency)` pair to expand.
///
/// The resolver calls `pre_run` once, then alternates `run` and
/// `set_reward_signal` until the run ends, then calls `post_run`.
pub trait Predictor {
    fn name(&self) -> &'static str;

    /// Reset learned parameters and reseed from the context
    fn pre_run(&mut self, _context: &Context) {}

    /// Pick a state in the beam and one of its unresolved candidates
    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)>;

    /// Outcome of the last expansion.
    ///
    /// `state` is the child created by the expansion. `reward` is NaN when
    /// the child was rejected, `+inf` when it is an accepted final state and
    /// the finite score delta otherwise.
    fn set_reward_signal(&mut self, _context: &Context, _state: &State, _package_tuple: &PackageTuple, _reward: f64) {}

    fn post_run(&mut self, _context: &Context) {}

    /// Beam ordering key overriding the state score, if this strategy uses one
    fn beam_key(&self, _state: &State) -> Option<f64> {
        None
    }
}

impl PredictorConfig {
    /// Instantiate the configured predictor
    pub fn build(&self) -> Result<Box<dyn Predictor>> {
        self.validate()?;
        let predictor: Box<dyn Predictor> = match self {
            PredictorConfig::AdaptiveSimulatedAnnealing { temperature } => {
                Box::new(AdaptiveSimulatedAnnealing::new(*temperature))
            }
            PredictorConfig::HillClimbing => Box::new(HillClimbing::new()),
            PredictorConfig::ApproximatingLatest => Box::new(ApproximatingLatest::new()),
            PredictorConfig::TemporalDifference {
                temperature,
                policy_size,
                policy_check_interval,
            } => Box::new(TemporalDifference::new(*temperature, *policy_size, *policy_check_interval)),
            PredictorConfig::Mcts {
                temperature,
                policy_size,
                policy_check_interval,
            } => Box::new(Mcts::new(*temperature, *policy_size, *policy_check_interval)),
            PredictorConfig::RandomWalk => Box::new(RandomWalk::new()),
            PredictorConfig::PackageCombinations { package_combinations } => {
                Box::new(PackageCombinations::new(package_combinations.clone())?)
            }
        };
        Ok(predictor)
    }
}

/// Draw an unresolved candidate of `state`
fn random_dependency<R: Rng + ?Sized>(
    state: &State,
    rng: &mut R,
    prefer_recent: bool,
) -> Result<(StateId, PackageTuple)> {
    state
        .get_random_unresolved_dependency(rng, prefer_recent)
        .map(|package_tuple| (state.id(), package_tuple))
        .ok_or(AdviserError::NoUnresolvedDependency(state.id().value()))
}

/// The first candidate of the most recently added unresolved name
fn latest_dependency(state: &State) -> Result<(StateId, PackageTuple)> {
    state
        .latest_unresolved_dependency(true)
        .map(|package_tuple| (state.id(), package_tuple.clone()))
        .ok_or(AdviserError::NoUnresolvedDependency(state.id().value()))
}
