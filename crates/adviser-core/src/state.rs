//! Partial resolution states explored by the search.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use rand::Rng;

use crate::justification::Justification;
use crate::package::PackageTuple;

/// Identifier of a state, unique within one resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u64);

impl StateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A partial resolution: what has been pinned so far and what is still open.
///
/// `resolved_dependencies` keeps resolution order. `unresolved_dependencies`
/// maps a package name to its candidate releases, newest name last, and the
/// candidates of one name in the order they were registered (the resolver
/// registers them newest version first).
#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    parent: Option<StateId>,
    pub score: f64,
    pub iteration: usize,
    /// Overrides `score` as the beam ordering key when set
    pub beam_key: Option<f64>,
    resolved_dependencies: IndexMap<String, PackageTuple>,
    unresolved_dependencies: IndexMap<String, IndexSet<PackageTuple>>,
    justification: Vec<Justification>,
}

impl State {
    /// Create an empty root state
    pub fn new(id: StateId, iteration: usize) -> Self {
        Self {
            id,
            parent: None,
            score: 0.0,
            iteration,
            beam_key: None,
            resolved_dependencies: IndexMap::new(),
            unresolved_dependencies: IndexMap::new(),
            justification: Vec::new(),
        }
    }

    /// Deep copy this state as a child with a new identity and iteration stamp.
    ///
    /// The beam key is not inherited.
    pub fn fork(&self, id: StateId, iteration: usize) -> Self {
        Self {
            id,
            parent: Some(self.id),
            score: self.score,
            iteration,
            beam_key: None,
            resolved_dependencies: self.resolved_dependencies.clone(),
            unresolved_dependencies: self.unresolved_dependencies.clone(),
            justification: self.justification.clone(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Whether every dependency has been resolved
    pub fn is_final(&self) -> bool {
        self.unresolved_dependencies.is_empty()
    }

    /// The key the beam orders this state by
    pub fn priority(&self) -> f64 {
        self.beam_key.unwrap_or(self.score)
    }

    /// Pin `package_tuple` for its name; a previous pin for that name is replaced.
    pub fn add_resolved_dependency(&mut self, package_tuple: PackageTuple) {
        self.resolved_dependencies.shift_remove(&package_tuple.name);
        self.resolved_dependencies
            .insert(package_tuple.name.clone(), package_tuple);
    }

    pub fn resolved_dependencies(&self) -> &IndexMap<String, PackageTuple> {
        &self.resolved_dependencies
    }

    pub fn get_resolved(&self, name: &str) -> Option<&PackageTuple> {
        self.resolved_dependencies.get(name)
    }

    pub fn iter_resolved_dependencies(&self) -> impl Iterator<Item = &PackageTuple> + '_ {
        self.resolved_dependencies.values()
    }

    /// Register one candidate release for the tuple's name
    pub fn add_unresolved_dependency(&mut self, package_tuple: PackageTuple) {
        self.unresolved_dependencies
            .entry(package_tuple.name.clone())
            .or_default()
            .insert(package_tuple);
    }

    pub fn add_unresolved_dependencies<I>(&mut self, package_tuples: I)
    where
        I: IntoIterator<Item = PackageTuple>,
    {
        for package_tuple in package_tuples {
            self.add_unresolved_dependency(package_tuple);
        }
    }

    pub fn unresolved_dependencies(&self) -> &IndexMap<String, IndexSet<PackageTuple>> {
        &self.unresolved_dependencies
    }

    pub fn unresolved_candidates(&self, name: &str) -> Option<&IndexSet<PackageTuple>> {
        self.unresolved_dependencies.get(name)
    }

    pub fn has_unresolved(&self, name: &str) -> bool {
        self.unresolved_dependencies.contains_key(name)
    }

    pub fn iter_unresolved_dependencies(&self) -> impl Iterator<Item = &PackageTuple> + '_ {
        self.unresolved_dependencies.values().flatten()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved_dependencies.len()
    }

    /// Drop every candidate registered for `name`
    pub fn remove_unresolved_dependency(&mut self, name: &str) -> Option<IndexSet<PackageTuple>> {
        self.unresolved_dependencies.shift_remove(name)
    }

    /// Drop one candidate. Returns true if it was the last candidate of its name,
    /// in which case the name is removed as well.
    pub fn remove_unresolved_candidate(&mut self, package_tuple: &PackageTuple) -> bool {
        let Some(candidates) = self.unresolved_dependencies.get_mut(&package_tuple.name) else {
            return false;
        };
        candidates.shift_remove(package_tuple);
        if candidates.is_empty() {
            self.unresolved_dependencies.shift_remove(&package_tuple.name);
            return true;
        }
        false
    }

    /// Keep only the candidates of `name` accepted by `keep`; returns how many remain
    pub fn retain_unresolved_candidates<F>(&mut self, name: &str, mut keep: F) -> usize
    where
        F: FnMut(&PackageTuple) -> bool,
    {
        match self.unresolved_dependencies.get_mut(name) {
            Some(candidates) => {
                candidates.retain(|t| keep(t));
                candidates.len()
            }
            None => 0,
        }
    }

    /// Pick a pseudo-random unresolved candidate.
    ///
    /// With `prefer_recent` the package name is drawn with a weight growing
    /// linearly with its insertion position, so the most recently added
    /// dependency chains are resolved first.
    pub fn get_random_unresolved_dependency<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        prefer_recent: bool,
    ) -> Option<PackageTuple> {
        let names = self.unresolved_dependencies.len();
        if names == 0 {
            return None;
        }

        let index = if prefer_recent {
            let total = names * (names + 1) / 2;
            let mut draw = rng.gen_range(0..total);
            let mut picked = names - 1;
            for i in 0..names {
                let weight = i + 1;
                if draw < weight {
                    picked = i;
                    break;
                }
                draw -= weight;
            }
            picked
        } else {
            rng.gen_range(0..names)
        };

        let (_, candidates) = self.unresolved_dependencies.get_index(index)?;
        let pick = rng.gen_range(0..candidates.len());
        candidates.get_index(pick).cloned()
    }

    /// The first registered candidate of the newest (or oldest) unresolved name
    pub fn latest_unresolved_dependency(&self, prefer_recent: bool) -> Option<&PackageTuple> {
        let entry = if prefer_recent {
            self.unresolved_dependencies.last()
        } else {
            self.unresolved_dependencies.first()
        };
        entry.and_then(|(_, candidates)| candidates.first())
    }

    pub fn add_justification<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = Justification>,
    {
        self.justification.extend(records);
    }

    pub fn justification(&self) -> &[Justification] {
        &self.justification
    }
}
