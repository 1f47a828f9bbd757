//! Random walk over the beam.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{random_dependency, Predictor};
use crate::context::Context;
use crate::error::Result;
use crate::package::PackageTuple;
use crate::state::StateId;

/// Uniform sampling of a beam state and one of its unresolved candidates.
#[derive(Debug)]
pub struct RandomWalk {
    rng: StdRng,
}

impl RandomWalk {
    pub fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for RandomWalk {
    fn name(&self) -> &'static str {
        "random-walk"
    }

    fn pre_run(&mut self, context: &Context) {
        self.rng = StdRng::seed_from_u64(context.seed());
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = context.beam.get_random(&mut self.rng)?;
        random_dependency(state, &mut self.rng, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::test_support::{context, push_state};

    #[test]
    fn test_same_seed_same_walk() {
        let mut context = context(100, 1);
        for i in 0..5 {
            push_state(&mut context, i as f64, &[("a", "1.0"), ("b", "1.0"), ("c", "2.0")]);
        }

        let walk = |context: &Context| {
            let mut predictor = RandomWalk::new();
            predictor.pre_run(context);
            (0..30).map(|_| predictor.run(context).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(walk(&context), walk(&context));
    }

    #[test]
    fn test_visits_every_state() {
        let mut context = context(100, 1);
        for i in 0..4 {
            push_state(&mut context, i as f64, &[("a", "1.0")]);
        }
        let mut predictor = RandomWalk::new();
        predictor.pre_run(&context);
        let seen: std::collections::HashSet<StateId> =
            (0..200).map(|_| predictor.run(&context).unwrap().0).collect();
        assert_eq!(seen.len(), 4);
    }
}
