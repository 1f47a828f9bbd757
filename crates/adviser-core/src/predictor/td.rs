//! Temporal difference predictor.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::policy::PolicyTable;
use super::schedule::{AnnealingSchedule, TemperatureSchedule};
use super::{random_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Temporal difference learning over package tuples.
///
/// The annealing test decides between exploration (a random state and a
/// random dependency) and exploitation (the top state and its unresolved
/// dependency with the best average reward so far).
#[derive(Debug)]
pub struct TemporalDifference {
    schedule: AnnealingSchedule,
    policy: PolicyTable,
    rng: StdRng,
}

impl TemporalDifference {
    pub fn new(temperature: f64, policy_size: usize, policy_check_interval: usize) -> Self {
        Self {
            schedule: AnnealingSchedule::new(TemperatureSchedule::AcceptedStates, temperature),
            policy: PolicyTable::new(policy_size, policy_check_interval),
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut PolicyTable {
        &mut self.policy
    }

    pub fn temperature(&self) -> f64 {
        self.schedule.temperature()
    }
}

impl Predictor for TemporalDifference {
    fn name(&self) -> &'static str {
        "temporal-difference"
    }

    fn pre_run(&mut self, context: &Context) {
        self.schedule.reset();
        self.policy.clear();
        self.rng = StdRng::seed_from_u64(context.seed());
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        self.policy.maybe_shrink(context.iteration);
        explore_or_exploit(&mut self.schedule, &self.policy, &mut self.rng, context)
    }

    fn set_reward_signal(&mut self, context: &Context, state: &State, package_tuple: &PackageTuple, reward: f64) {
        if reward.is_nan() {
            return;
        }
        if reward.is_infinite() {
            credit_final_state(&mut self.policy, state);
        } else {
            self.policy.record(package_tuple, reward);
        }
        self.policy.maybe_shrink(context.iteration);
    }
}

/// One temporal difference decision, shared with [`super::Mcts`]
pub(super) fn explore_or_exploit(
    schedule: &mut AnnealingSchedule,
    policy: &PolicyTable,
    rng: &mut StdRng,
    context: &Context,
) -> Result<(StateId, PackageTuple)> {
    schedule.update(context);
    let beam = &context.beam;
    let top = beam.top()?;

    if beam.size() > 1 {
        let candidate = beam.get_random(rng)?;
        if candidate.id() != top.id() && schedule.accept(rng, top.score, candidate.score) {
            log::trace!("Exploring state {} at temperature {}", candidate.id(), schedule.temperature());
            return random_dependency(candidate, rng, false);
        }
    }

    exploit(policy, rng, top)
}

/// The unresolved candidate of `state` with the highest average reward
fn exploit(policy: &PolicyTable, rng: &mut StdRng, state: &State) -> Result<(StateId, PackageTuple)> {
    let mut best: Option<(f64, &PackageTuple)> = None;
    for package_tuple in state.iter_unresolved_dependencies() {
        if let Some(average) = policy.average(package_tuple) {
            if best.map_or(true, |(score, _)| average > score) {
                best = Some((average, package_tuple));
            }
        }
    }

    match best {
        Some((_, package_tuple)) => Ok((state.id(), package_tuple.clone())),
        None => random_dependency(state, rng, true),
    }
}

/// Credit every resolved dependency of a final state with the state's score
pub(super) fn credit_final_state(policy: &mut PolicyTable, state: &State) {
    for package_tuple in state.iter_resolved_dependencies() {
        policy.record(package_tuple, state.score);
    }
}
