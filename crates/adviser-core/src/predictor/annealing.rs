//! Adaptive simulated annealing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::schedule::{AnnealingSchedule, TemperatureSchedule};
use super::{random_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::StateId;

/// Stochastic hill climbing with a cooling temperature.
///
/// Each round compares the top state with a random lower ranked neighbour and
/// moves to the neighbour with probability `exp((neighbour - top) / T)`.
#[derive(Debug)]
pub struct AdaptiveSimulatedAnnealing {
    schedule: AnnealingSchedule,
    rng: StdRng,
}

impl AdaptiveSimulatedAnnealing {
    pub fn new(temperature: f64) -> Self {
        Self {
            schedule: AnnealingSchedule::new(TemperatureSchedule::Iterations, temperature),
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.schedule.temperature()
    }
}

impl Predictor for AdaptiveSimulatedAnnealing {
    fn name(&self) -> &'static str {
        "adaptive-simulated-annealing"
    }

    fn pre_run(&mut self, context: &Context) {
        self.schedule.reset();
        self.rng = StdRng::seed_from_u64(context.seed());
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let temperature = self.schedule.update(context);
        let beam = &context.beam;
        let top = beam.top()?;

        if beam.size() == 1 {
            return random_dependency(top, &mut self.rng, true);
        }

        // Rank 0 is the top state itself.
        let rank = self.rng.gen_range(1..beam.size());
        let neighbour = beam.get(rank)?;
        if self.schedule.accept(&mut self.rng, top.score, neighbour.score) {
            log::trace!(
                "Expanding neighbour {} (score {}) over top {} (score {}) at temperature {}",
                neighbour.id(),
                neighbour.score,
                top.id(),
                top.score,
                temperature
            );
            return random_dependency(neighbour, &mut self.rng, true);
        }

        random_dependency(top, &mut self.rng, true)
    }
}
