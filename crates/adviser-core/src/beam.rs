//! Bounded, priority ordered population of states awaiting expansion.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::error::{AdviserError, Result};
use crate::state::{State, StateId};

/// Total order over state priorities
#[derive(Debug, Clone, Copy)]
struct Priority(f64);

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ordering key: priority first, then insertion sequence (newer wins ties)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BeamKey {
    priority: Priority,
    sequence: u64,
}

/// The beam of states.
///
/// The beam never holds more than `width` states. Once full, a new state is
/// only admitted if it ranks above the current worst member, which is then
/// evicted.
#[derive(Debug)]
pub struct Beam {
    width: usize,
    states: BTreeMap<BeamKey, State>,
    index: HashMap<StateId, BeamKey>,
    sequence: u64,
    last_added: Option<StateId>,
}

impl Beam {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            states: BTreeMap::new(),
            index: HashMap::new(),
            sequence: 0,
            last_added: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn size(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.index.contains_key(&id)
    }

    /// Insert a state, evicting the worst member if the beam is full.
    ///
    /// Returns false if the state was dropped instead of inserted.
    pub fn add_state(&mut self, state: State) -> bool {
        let priority = state.priority();
        if !priority.is_finite() {
            log::warn!("Dropping state {} with non-finite priority {}", state.id(), priority);
            return false;
        }

        if self.states.len() >= self.width {
            let Some((&worst_key, _)) = self.states.first_key_value() else {
                return false;
            };
            if priority <= worst_key.priority.0 {
                log::trace!(
                    "Beam full, dropping state {} with priority {} (worst is {})",
                    state.id(),
                    priority,
                    worst_key.priority.0
                );
                return false;
            }
            if let Some(evicted) = self.states.remove(&worst_key) {
                log::trace!("Evicting state {} with priority {}", evicted.id(), worst_key.priority.0);
                self.index.remove(&evicted.id());
            }
        }

        self.sequence += 1;
        let key = BeamKey {
            priority: Priority(priority),
            sequence: self.sequence,
        };
        let id = state.id();
        self.index.insert(id, key);
        self.states.insert(key, state);
        self.last_added = Some(id);
        true
    }

    /// The best ranked state
    pub fn top(&self) -> Result<&State> {
        self.states
            .last_key_value()
            .map(|(_, state)| state)
            .ok_or(AdviserError::EmptyBeam)
    }

    /// Alias of [`Beam::top`]
    pub fn max(&self) -> Result<&State> {
        self.top()
    }

    /// The state at `rank`, where rank 0 is the top state
    pub fn get(&self, rank: usize) -> Result<&State> {
        if self.states.is_empty() {
            return Err(AdviserError::EmptyBeam);
        }
        self.states
            .values()
            .rev()
            .nth(rank)
            .ok_or(AdviserError::BeamIndexOutOfRange {
                index: rank,
                size: self.states.len(),
            })
    }

    /// A state drawn uniformly at random
    pub fn get_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&State> {
        if self.states.is_empty() {
            return Err(AdviserError::EmptyBeam);
        }
        let rank = rng.gen_range(0..self.states.len());
        self.get(rank)
    }

    /// The most recently inserted state, if it is still in the beam
    pub fn get_last(&self) -> Option<&State> {
        self.last_added.and_then(|id| self.get_state(id))
    }

    pub fn get_state(&self, id: StateId) -> Option<&State> {
        self.index.get(&id).and_then(|key| self.states.get(key))
    }

    /// Mutate a member in place, keeping its insertion sequence.
    pub fn with_state_mut<F, T>(&mut self, id: StateId, f: F) -> Option<T>
    where
        F: FnOnce(&mut State) -> T,
    {
        let key = self.index.get(&id).copied()?;
        let mut state = self.states.remove(&key)?;
        let result = f(&mut state);
        let key = BeamKey {
            priority: Priority(state.priority()),
            sequence: key.sequence,
        };
        self.index.insert(id, key);
        self.states.insert(key, state);
        Some(result)
    }

    pub fn remove(&mut self, id: StateId) -> Option<State> {
        let key = self.index.remove(&id)?;
        self.states.remove(&key)
    }

    /// Iterate members in no particular order
    pub fn iter_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.values()
    }

    /// Iterate members best first
    pub fn iter_states_sorted(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.values().rev()
    }

    /// Highest and lowest priority currently in the beam
    pub fn score_range(&self) -> Option<(f64, f64)> {
        let (low, _) = self.states.first_key_value()?;
        let (high, _) = self.states.last_key_value()?;
        Some((high.priority.0, low.priority.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(id: u64, score: f64) -> State {
        let mut state = State::new(StateId::new(id), 0);
        state.score = score;
        state
    }

    fn scores(beam: &Beam) -> Vec<f64> {
        beam.iter_states_sorted().map(|s| s.score).collect()
    }

    #[test]
    fn test_width_two_keeps_best_two() {
        let mut beam = Beam::new(2);
        assert!(beam.add_state(state(1, 0.0)));
        assert!(beam.add_state(state(2, 1.0)));
        assert!(beam.add_state(state(3, 2.0)));
        assert!(!beam.add_state(state(4, 0.5)));

        assert_eq!(scores(&beam), vec![2.0, 1.0]);
        assert!(!beam.contains(StateId::new(1)));
        assert!(!beam.contains(StateId::new(4)));
    }

    #[test]
    fn test_size_never_exceeds_width() {
        let mut beam = Beam::new(3);
        for i in 0..50u64 {
            let score = ((i * 37) % 11) as f64 - 5.0;
            beam.add_state(state(i, score));
            assert!(beam.size() <= 3);
        }
        assert_eq!(beam.size(), 3);
    }

    #[test]
    fn test_equal_score_tie_broken_by_recency() {
        let mut beam = Beam::new(4);
        beam.add_state(state(1, 1.0));
        beam.add_state(state(2, 1.0));
        assert_eq!(beam.top().unwrap().id(), StateId::new(2));
        assert_eq!(beam.get(1).unwrap().id(), StateId::new(1));
        // Stable across repeated calls.
        assert_eq!(beam.top().unwrap().id(), beam.max().unwrap().id());
    }

    #[test]
    fn test_equal_score_does_not_evict() {
        let mut beam = Beam::new(1);
        beam.add_state(state(1, 1.0));
        assert!(!beam.add_state(state(2, 1.0)));
        assert_eq!(beam.top().unwrap().id(), StateId::new(1));
    }

    #[test]
    fn test_empty_beam_signals_empty() {
        let beam = Beam::new(2);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(beam.top(), Err(AdviserError::EmptyBeam)));
        assert!(matches!(beam.get(0), Err(AdviserError::EmptyBeam)));
        assert!(matches!(beam.get_random(&mut rng), Err(AdviserError::EmptyBeam)));
        assert!(beam.get_last().is_none());
    }

    #[test]
    fn test_get_out_of_range() {
        let mut beam = Beam::new(2);
        beam.add_state(state(1, 1.0));
        assert!(matches!(
            beam.get(1),
            Err(AdviserError::BeamIndexOutOfRange { index: 1, size: 1 })
        ));
    }

    #[test]
    fn test_get_last_tracks_most_recent_member() {
        let mut beam = Beam::new(2);
        beam.add_state(state(1, 5.0));
        beam.add_state(state(2, 1.0));
        assert_eq!(beam.get_last().unwrap().id(), StateId::new(2));
        beam.remove(StateId::new(2));
        assert!(beam.get_last().is_none());
    }

    #[test]
    fn test_get_random_covers_all_members() {
        let mut beam = Beam::new(3);
        for i in 0..3 {
            beam.add_state(state(i, i as f64));
        }
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(beam.get_random(&mut rng).unwrap().id());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_with_state_mut_reorders() {
        let mut beam = Beam::new(3);
        beam.add_state(state(1, 1.0));
        beam.add_state(state(2, 2.0));
        beam.with_state_mut(StateId::new(1), |s| s.score = 3.0).unwrap();
        assert_eq!(beam.top().unwrap().id(), StateId::new(1));
        assert_eq!(beam.size(), 2);
    }

    #[test]
    fn test_beam_key_overrides_score() {
        let mut beam = Beam::new(3);
        let mut deep = state(1, 0.0);
        deep.beam_key = Some(10.0);
        beam.add_state(deep);
        beam.add_state(state(2, 5.0));
        assert_eq!(beam.top().unwrap().id(), StateId::new(1));
    }

    #[test]
    fn test_non_finite_priority_rejected() {
        let mut beam = Beam::new(3);
        assert!(!beam.add_state(state(1, f64::NAN)));
        assert!(beam.is_empty());
    }
}
