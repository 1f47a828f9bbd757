//! Monte Carlo tree search predictor.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::policy::PolicyTable;
use super::schedule::{AnnealingSchedule, TemperatureSchedule};
use super::td::{credit_final_state, explore_or_exploit};
use super::{random_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Monte Carlo tree search style rollouts on top of temporal difference.
///
/// After a successful expansion the new child is remembered and, while it is
/// still the most recently added beam member, expanded again directly. This
/// plays a branch out to a final state before falling back to the temporal
/// difference decision. Only final states feed the policy.
#[derive(Debug)]
pub struct Mcts {
    schedule: AnnealingSchedule,
    policy: PolicyTable,
    rng: StdRng,
    next_state: Option<StateId>,
}

impl Mcts {
    pub fn new(temperature: f64, policy_size: usize, policy_check_interval: usize) -> Self {
        Self {
            schedule: AnnealingSchedule::new(TemperatureSchedule::AcceptedStates, temperature),
            policy: PolicyTable::new(policy_size, policy_check_interval),
            rng: StdRng::seed_from_u64(0),
            next_state: None,
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn next_state(&self) -> Option<StateId> {
        self.next_state
    }
}

impl Predictor for Mcts {
    fn name(&self) -> &'static str {
        "mcts"
    }

    fn pre_run(&mut self, context: &Context) {
        self.schedule.reset();
        self.policy.clear();
        self.next_state = None;
        self.rng = StdRng::seed_from_u64(context.seed());
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        self.policy.maybe_shrink(context.iteration);

        if let Some(next_state) = self.next_state.take() {
            if let Some(last) = context.beam.get_last() {
                if last.id() == next_state {
                    return random_dependency(last, &mut self.rng, true);
                }
            }
        }

        explore_or_exploit(&mut self.schedule, &self.policy, &mut self.rng, context)
    }

    fn set_reward_signal(&mut self, context: &Context, state: &State, _package_tuple: &PackageTuple, reward: f64) {
        if reward.is_nan() {
            self.next_state = None;
            return;
        }
        if reward.is_infinite() {
            self.next_state = None;
            credit_final_state(&mut self.policy, state);
            self.policy.maybe_shrink(context.iteration);
            return;
        }
        self.next_state = Some(state.id());
    }
}
