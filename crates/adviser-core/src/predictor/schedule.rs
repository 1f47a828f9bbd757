//! Cooling schedules shared by the stochastic predictors.

use rand::Rng;

use crate::context::Context;

/// How the temperature decays over a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureSchedule {
    /// Linear decay over the iteration budget; accepted final states speed it up
    Iterations,
    /// Decay with the number of accepted final states relative to `count`.
    /// Stays at zero until the first final state is accepted.
    AcceptedStates,
}

/// Temperature state of an annealing style predictor
#[derive(Debug, Clone)]
pub struct AnnealingSchedule {
    schedule: TemperatureSchedule,
    t0: f64,
    temperature: f64,
}

impl AnnealingSchedule {
    pub fn new(schedule: TemperatureSchedule, t0: f64) -> Self {
        let t0 = if t0.is_finite() { t0.max(0.0) } else { 0.0 };
        Self {
            schedule,
            t0,
            temperature: t0,
        }
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn reset(&mut self) {
        self.temperature = self.t0;
    }

    /// Recompute the temperature for the current point of the run
    pub fn update(&mut self, context: &Context) -> f64 {
        self.temperature = match self.schedule {
            TemperatureSchedule::Iterations => iteration_temperature(
                self.t0,
                context.iteration,
                context.accepted_final_states_count(),
                context.limit(),
            ),
            TemperatureSchedule::AcceptedStates => {
                accepted_states_temperature(self.t0, context.accepted_final_states_count(), context.count())
            }
        };
        self.temperature
    }

    /// Decide whether to move from the top state to a neighbour
    pub fn accept<R: Rng + ?Sized>(&self, rng: &mut R, top_score: f64, neighbour_score: f64) -> bool {
        let probability = acceptance_probability(top_score, neighbour_score, self.temperature);
        rng.gen::<f64>() < probability
    }
}

/// `t0 * (1 - progress)` where progress counts iterations and accepted states
/// against the iteration limit. Never negative.
pub(crate) fn iteration_temperature(t0: f64, iteration: usize, accepted: usize, limit: usize) -> f64 {
    if t0 <= 0.0 || limit == 0 {
        return 0.0;
    }
    let progress = (iteration as f64 + accepted as f64) / limit as f64;
    if progress >= 1.0 {
        return 0.0;
    }
    (t0 * (1.0 - progress)).max(0.0)
}

/// `t0 * (1 - accepted / (count + 1))`, zero before the first accepted state.
pub(crate) fn accepted_states_temperature(t0: f64, accepted: usize, count: usize) -> f64 {
    if t0 <= 0.0 || accepted == 0 || count == 0 {
        return 0.0;
    }
    let ratio = accepted.min(count) as f64 / (count as f64 + 1.0);
    (t0 * (1.0 - ratio)).max(0.0)
}

/// Probability of accepting a move from `top_score` to `neighbour_score`.
///
/// A strictly better neighbour is always accepted. At zero temperature a
/// worse or equal neighbour never is.
pub fn acceptance_probability(top_score: f64, neighbour_score: f64, temperature: f64) -> f64 {
    if neighbour_score > top_score {
        return 1.0;
    }
    if temperature <= 0.0 || temperature.is_nan() {
        return 0.0;
    }
    let probability = ((neighbour_score - top_score) / temperature).exp();
    if probability.is_nan() {
        return 0.0;
    }
    probability.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_better_neighbour_always_accepted() {
        for temperature in [0.0, 0.5, 1.0, 1e9] {
            assert_eq!(acceptance_probability(5.0, 7.0, temperature), 1.0);
        }
    }

    #[test]
    fn test_zero_temperature_never_accepts_worse() {
        assert_eq!(acceptance_probability(5.0, 3.0, 0.0), 0.0);
        assert_eq!(acceptance_probability(5.0, 5.0, 0.0), 0.0);
    }

    #[test]
    fn test_acceptance_probability_bounded() {
        let scores = [-1e6, -10.0, -1.0, 0.0, 0.5, 1.0, 10.0, 1e6];
        let temperatures = [0.0, 1e-9, 0.1, 1.0, 100.0, 1e12];
        for top in scores {
            for neighbour in scores {
                for temperature in temperatures {
                    let p = acceptance_probability(top, neighbour, temperature);
                    assert!((0.0..=1.0).contains(&p), "p={} for {} {} {}", p, top, neighbour, temperature);
                }
            }
        }
    }

    #[test]
    fn test_temperatures_never_negative() {
        for t0 in [0.0, 0.1, 1.0, 50.0] {
            for limit in [1usize, 2, 10, 1000] {
                for iteration in [0usize, 1, 9, 10, 5000] {
                    for accepted in [0usize, 1, 3, 10_000] {
                        let t = iteration_temperature(t0, iteration, accepted, limit);
                        assert!(t >= 0.0 && !t.is_nan());
                    }
                }
            }
            for count in [0usize, 1, 3, 100] {
                for accepted in [0usize, 1, 3, 10_000] {
                    let t = accepted_states_temperature(t0, accepted, count);
                    assert!(t >= 0.0 && !t.is_nan());
                }
            }
        }
    }

    #[test]
    fn test_iteration_temperature_decays() {
        assert_eq!(iteration_temperature(10.0, 0, 0, 100), 10.0);
        assert_eq!(iteration_temperature(10.0, 50, 0, 100), 5.0);
        assert!(iteration_temperature(10.0, 50, 10, 100) < 5.0);
        assert_eq!(iteration_temperature(10.0, 100, 0, 100), 0.0);
    }

    #[test]
    fn test_accepted_states_temperature() {
        assert_eq!(accepted_states_temperature(3.0, 0, 2), 0.0);
        assert!((accepted_states_temperature(3.0, 1, 2) - 2.0).abs() < 1e-9);
        assert!((accepted_states_temperature(3.0, 2, 2) - 1.0).abs() < 1e-9);
        // Saturates once `count` states were accepted.
        assert_eq!(
            accepted_states_temperature(3.0, 10, 2),
            accepted_states_temperature(3.0, 2, 2)
        );
    }

    #[test]
    fn test_accept_at_zero_temperature() {
        let schedule = AnnealingSchedule::new(TemperatureSchedule::Iterations, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(!schedule.accept(&mut rng, 1.0, 0.5));
            assert!(schedule.accept(&mut rng, 1.0, 1.5));
        }
    }
}
