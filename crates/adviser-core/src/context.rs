//! Shared state of one resolution run.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::beam::Beam;
use crate::config::{AdviserConfig, DecisionType, RecommendationType};
use crate::environment::{EnvironmentKey, RuntimeEnvironment};
use crate::error::{AdviserError, Result};
use crate::justification::Justification;
use crate::knowledge::KnowledgeBase;
use crate::package::{PackageTuple, PackageVersion, Requirement};
use crate::project::Project;
use crate::state::{State, StateId};

/// Parameters needed to set up a [`Context`]
#[derive(Debug, Clone)]
pub struct ContextParams {
    pub project: Project,
    pub runtime_environment: RuntimeEnvironment,
    pub recommendation_type: Option<RecommendationType>,
    pub decision_type: Option<DecisionType>,
    pub beam_width: usize,
    pub limit: usize,
    pub count: usize,
    pub seed: u64,
}

impl ContextParams {
    pub fn from_config(config: &AdviserConfig, project: Project, seed: u64) -> Self {
        Self {
            project,
            runtime_environment: config.runtime_environment.clone(),
            recommendation_type: config.recommendation_type,
            decision_type: config.decision_type,
            beam_width: config.beam_width,
            limit: config.limit,
            count: config.count,
            seed,
        }
    }
}

/// An accepted final state in the bounded top-`count` heap.
///
/// Ordered by score, then by insertion order with earlier states ranking
/// higher, so that equal scores never evict an earlier state.
#[derive(Debug)]
struct AcceptedState {
    score: f64,
    order: Reverse<u64>,
    state: State,
}

impl PartialEq for AcceptedState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AcceptedState {}

impl PartialOrd for AcceptedState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AcceptedState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.order.cmp(&other.order))
    }
}

type DependencyIndex = HashMap<String, HashMap<PackageTuple, HashSet<PackageTuple>>>;
type DependentIndex = HashMap<String, HashMap<PackageTuple, HashSet<(PackageTuple, EnvironmentKey)>>>;

/// Context of one resolution run.
///
/// Owns the beam, the run counters, the package registry, the
/// dependency/dependents graph observed during the search and the accepted
/// final states. Caches of knowledge base answers live here so nothing leaks
/// between runs.
pub struct Context {
    pub beam: Beam,
    pub iteration: usize,
    /// Justifications describing the whole run
    pub stack_info: Vec<Justification>,
    project: Project,
    runtime_environment: RuntimeEnvironment,
    recommendation_type: Option<RecommendationType>,
    decision_type: Option<DecisionType>,
    limit: usize,
    count: usize,
    seed: u64,
    accepted_final_states_count: usize,
    discarded_final_states_count: usize,
    dependencies: DependencyIndex,
    dependents: DependentIndex,
    direct_dependencies: HashSet<PackageTuple>,
    package_versions: HashMap<PackageTuple, Arc<PackageVersion>>,
    candidate_cache: HashMap<String, Option<Vec<PackageTuple>>>,
    requirement_cache: HashMap<PackageTuple, Option<Arc<Vec<Requirement>>>>,
    accepted_final_states: BinaryHeap<Reverse<AcceptedState>>,
    accepted_sequence: u64,
    state_sequence: u64,
    knowledge_base: Arc<dyn KnowledgeBase>,
}

impl Context {
    /// Create a context; exactly one of recommendation type and decision type must be set.
    pub fn new(params: ContextParams, knowledge_base: Arc<dyn KnowledgeBase>) -> Result<Self> {
        match (params.recommendation_type, params.decision_type) {
            (Some(_), Some(_)) => {
                return Err(AdviserError::Config(
                    "Context cannot be both an adviser and a dependency-monkey run".to_string(),
                ))
            }
            (None, None) => {
                return Err(AdviserError::Config(
                    "Context requires either a recommendation type or a decision type".to_string(),
                ))
            }
            _ => {}
        }
        if params.beam_width == 0 {
            return Err(AdviserError::Config("beam_width must be at least 1".to_string()));
        }
        if params.limit == 0 || params.count == 0 {
            return Err(AdviserError::Config("limit and count must be at least 1".to_string()));
        }

        Ok(Self {
            beam: Beam::new(params.beam_width),
            iteration: 0,
            stack_info: Vec::new(),
            project: params.project,
            runtime_environment: params.runtime_environment,
            recommendation_type: params.recommendation_type,
            decision_type: params.decision_type,
            limit: params.limit,
            count: params.count,
            seed: params.seed,
            accepted_final_states_count: 0,
            discarded_final_states_count: 0,
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
            direct_dependencies: HashSet::new(),
            package_versions: HashMap::new(),
            candidate_cache: HashMap::new(),
            requirement_cache: HashMap::new(),
            accepted_final_states: BinaryHeap::new(),
            accepted_sequence: 0,
            state_sequence: 0,
            knowledge_base,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn runtime_environment(&self) -> &RuntimeEnvironment {
        &self.runtime_environment
    }

    pub fn recommendation_type(&self) -> Option<RecommendationType> {
        self.recommendation_type
    }

    pub fn decision_type(&self) -> Option<DecisionType> {
        self.decision_type
    }

    pub fn is_adviser(&self) -> bool {
        self.recommendation_type.is_some()
    }

    pub fn is_dependency_monkey(&self) -> bool {
        self.decision_type.is_some()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn accepted_final_states_count(&self) -> usize {
        self.accepted_final_states_count
    }

    pub fn discarded_final_states_count(&self) -> usize {
        self.discarded_final_states_count
    }

    pub fn knowledge_base(&self) -> &dyn KnowledgeBase {
        self.knowledge_base.as_ref()
    }

    fn next_state_id(&mut self) -> StateId {
        self.state_sequence += 1;
        StateId::new(self.state_sequence)
    }

    /// A fresh root state
    pub fn new_state(&mut self) -> State {
        let id = self.next_state_id();
        State::new(id, self.iteration)
    }

    /// Deep copy `parent` as a new state stamped with the current iteration
    pub fn fork_state(&mut self, parent: &State) -> State {
        let id = self.next_state_id();
        parent.fork(id, self.iteration)
    }

    /// Fork the beam member `parent`, or `None` if it is no longer in the beam
    pub fn fork_beam_state(&mut self, parent: StateId) -> Option<State> {
        if !self.beam.contains(parent) {
            return None;
        }
        let id = self.next_state_id();
        let iteration = self.iteration;
        self.beam.get_state(parent).map(|state| state.fork(id, iteration))
    }

    /// Register a release, returning the shared instance if it is already known
    pub fn register_package_version(&mut self, package_tuple: PackageTuple) -> Result<Arc<PackageVersion>> {
        if let Some(existing) = self.package_versions.get(&package_tuple) {
            return Ok(Arc::clone(existing));
        }
        let package_version = Arc::new(PackageVersion::from_tuple(package_tuple.clone())?);
        self.package_versions
            .insert(package_tuple, Arc::clone(&package_version));
        Ok(package_version)
    }

    /// Look up a registered release; `graceful` turns a miss into `Ok(None)`
    pub fn get_package_version(
        &self,
        package_tuple: &PackageTuple,
        graceful: bool,
    ) -> Result<Option<Arc<PackageVersion>>> {
        match self.package_versions.get(package_tuple) {
            Some(package_version) => Ok(Some(Arc::clone(package_version))),
            None if graceful => Ok(None),
            None => Err(AdviserError::PackageNotFound(package_tuple.clone())),
        }
    }

    pub fn package_versions_count(&self) -> usize {
        self.package_versions.len()
    }

    /// Known releases of `name`, queried from the knowledge base once per run
    pub fn candidate_versions(&mut self, name: &str) -> Result<Option<Vec<PackageTuple>>> {
        if let Some(cached) = self.candidate_cache.get(name) {
            return Ok(cached.clone());
        }
        let candidates = self
            .knowledge_base
            .candidate_versions(name, &self.runtime_environment)?;
        self.candidate_cache
            .insert(name.to_string(), candidates.clone());
        Ok(candidates)
    }

    /// Parsed direct requirements of a release, queried once per run
    pub fn package_requirements(&mut self, package_tuple: &PackageTuple) -> Result<Option<Arc<Vec<Requirement>>>> {
        if let Some(cached) = self.requirement_cache.get(package_tuple) {
            return Ok(cached.clone());
        }
        let requirements = match self
            .knowledge_base
            .dependencies(package_tuple, &self.runtime_environment)?
        {
            Some(records) => Some(Arc::new(
                records
                    .iter()
                    .map(|r| Requirement::parse(&r.name, &r.specifier))
                    .collect::<Result<Vec<_>>>()?,
            )),
            None => None,
        };
        self.requirement_cache
            .insert(package_tuple.clone(), requirements.clone());
        Ok(requirements)
    }

    /// Record that `package_tuple` depends on `dependency` in this environment
    pub fn register_dependency(&mut self, package_tuple: &PackageTuple, dependency: &PackageTuple) {
        self.dependencies
            .entry(package_tuple.name.clone())
            .or_default()
            .entry(package_tuple.clone())
            .or_default()
            .insert(dependency.clone());

        self.dependents
            .entry(dependency.name.clone())
            .or_default()
            .entry(dependency.clone())
            .or_default()
            .insert((package_tuple.clone(), self.runtime_environment.key()));
    }

    /// Record a candidate for one of the project's direct requirements
    pub fn register_direct_dependency(&mut self, package_tuple: &PackageTuple) {
        self.direct_dependencies.insert(package_tuple.clone());
    }

    pub fn is_direct_dependency(&self, package_tuple: &PackageTuple) -> bool {
        self.direct_dependencies.contains(package_tuple)
    }

    /// Releases `package_tuple` was seen depending on
    pub fn dependencies_of(&self, package_tuple: &PackageTuple) -> Option<&HashSet<PackageTuple>> {
        self.dependencies
            .get(&package_tuple.name)
            .and_then(|by_tuple| by_tuple.get(package_tuple))
    }

    /// Releases seen depending on `package_tuple`, with the environment they were seen in
    pub fn dependents_of(&self, package_tuple: &PackageTuple) -> Option<&HashSet<(PackageTuple, EnvironmentKey)>> {
        self.dependents
            .get(&package_tuple.name)
            .and_then(|by_tuple| by_tuple.get(package_tuple))
    }

    /// Keep `state` if it ranks among the best `count` accepted final states
    pub fn register_accepted_final_state(&mut self, state: State) {
        self.accepted_final_states_count += 1;
        self.accepted_sequence += 1;

        let entry = AcceptedState {
            score: state.score,
            order: Reverse(self.accepted_sequence),
            state,
        };

        if self.accepted_final_states.len() < self.count {
            self.accepted_final_states.push(Reverse(entry));
            return;
        }

        let replaces_worst = match self.accepted_final_states.peek() {
            Some(Reverse(worst)) => entry > *worst,
            None => true,
        };
        if replaces_worst {
            self.accepted_final_states.pop();
            self.accepted_final_states.push(Reverse(entry));
        } else {
            log::trace!(
                "Final state {} with score {} does not make the top {}",
                entry.state.id(),
                entry.score,
                self.count
            );
        }
    }

    pub fn register_discarded_final_state(&mut self) {
        self.discarded_final_states_count += 1;
    }

    /// The best accepted final state
    pub fn get_top_accepted_final_state(&self) -> Option<&State> {
        self.accepted_final_states
            .iter()
            .map(|Reverse(entry)| entry)
            .max()
            .map(|entry| &entry.state)
    }

    /// Accepted final states currently kept, in no particular order
    pub fn iter_accepted_final_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.accepted_final_states
            .iter()
            .map(|Reverse(entry)| &entry.state)
    }

    pub fn accepted_final_states_len(&self) -> usize {
        self.accepted_final_states.len()
    }

    /// Drain the kept final states, best first
    pub fn take_accepted_final_states(&mut self) -> Vec<State> {
        let mut entries: Vec<AcceptedState> = std::mem::take(&mut self.accepted_final_states)
            .into_iter()
            .map(|Reverse(entry)| entry)
            .collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| entry.state).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::InMemoryKnowledgeBase;

    fn params(count: usize) -> ContextParams {
        ContextParams {
            project: Project::new(),
            runtime_environment: RuntimeEnvironment::new("fedora", "38", "3.11"),
            recommendation_type: Some(RecommendationType::Stable),
            decision_type: None,
            beam_width: 10,
            limit: 100,
            count,
            seed: 42,
        }
    }

    fn context(count: usize) -> Context {
        Context::new(params(count), Arc::new(InMemoryKnowledgeBase::new())).unwrap()
    }

    fn scored(context: &mut Context, score: f64) -> State {
        let mut state = context.new_state();
        state.score = score;
        state
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let kb: Arc<dyn KnowledgeBase> = Arc::new(InMemoryKnowledgeBase::new());

        let mut narrow = params(3);
        narrow.beam_width = 0;
        assert!(matches!(Context::new(narrow, Arc::clone(&kb)), Err(AdviserError::Config(_))));

        let mut no_limit = params(3);
        no_limit.limit = 0;
        assert!(Context::new(no_limit, Arc::clone(&kb)).is_err());

        assert!(Context::new(params(0), kb).is_err());
    }

    #[test]
    fn test_mode_is_exclusive() {
        let kb: Arc<dyn KnowledgeBase> = Arc::new(InMemoryKnowledgeBase::new());

        let mut both = params(3);
        both.decision_type = Some(DecisionType::Random);
        assert!(Context::new(both, Arc::clone(&kb)).is_err());

        let mut neither = params(3);
        neither.recommendation_type = None;
        assert!(Context::new(neither, Arc::clone(&kb)).is_err());

        let mut monkey = params(3);
        monkey.recommendation_type = None;
        monkey.decision_type = Some(DecisionType::All);
        let context = Context::new(monkey, kb).unwrap();
        assert!(context.is_dependency_monkey());
        assert!(!context.is_adviser());
    }

    #[test]
    fn test_accepted_final_states_keep_top_count() {
        let mut context = context(3);
        for score in [0.0, 1.0, 2.0, 0.5] {
            let state = scored(&mut context, score);
            context.register_accepted_final_state(state);
        }

        assert_eq!(context.accepted_final_states_count(), 4);
        assert_eq!(context.accepted_final_states_len(), 3);
        assert_eq!(context.get_top_accepted_final_state().unwrap().score, 2.0);

        let scores: Vec<f64> = context
            .take_accepted_final_states()
            .iter()
            .map(|s| s.score)
            .collect();
        assert_eq!(scores, vec![2.0, 1.0, 0.5]);
    }

    #[test]
    fn test_equal_scores_keep_earliest() {
        let mut context = context(2);
        let first = scored(&mut context, 1.0);
        let second = scored(&mut context, 1.0);
        let third = scored(&mut context, 1.0);
        let (first_id, second_id) = (first.id(), second.id());
        context.register_accepted_final_state(first);
        context.register_accepted_final_state(second);
        context.register_accepted_final_state(third);

        let ids: Vec<StateId> = context
            .take_accepted_final_states()
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(ids, vec![first_id, second_id]);
    }

    #[test]
    fn test_package_version_registry() {
        let mut context = context(1);
        let tuple = PackageTuple::new("flask", "1.0", "idx");

        assert!(context.get_package_version(&tuple, true).unwrap().is_none());
        assert!(matches!(
            context.get_package_version(&tuple, false),
            Err(AdviserError::PackageNotFound(_))
        ));

        let first = context.register_package_version(tuple.clone()).unwrap();
        let second = context.register_package_version(tuple.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(context.package_versions_count(), 1);
        assert!(context.get_package_version(&tuple, false).unwrap().is_some());
    }

    #[test]
    fn test_dependency_graph_indices() {
        let mut context = context(1);
        let flask = PackageTuple::new("flask", "1.0", "idx");
        let click = PackageTuple::new("click", "7.0", "idx");
        context.register_direct_dependency(&flask);
        context.register_dependency(&flask, &click);

        assert!(context.is_direct_dependency(&flask));
        assert!(!context.is_direct_dependency(&click));
        assert!(context.dependencies_of(&flask).unwrap().contains(&click));

        let dependents = context.dependents_of(&click).unwrap();
        let (parent, environment) = dependents.iter().next().unwrap();
        assert_eq!(parent, &flask);
        assert_eq!(environment.python_version.as_deref(), Some("3.11"));
    }

    #[test]
    fn test_fork_state_stamps_iteration() {
        let mut context = context(1);
        let root = context.new_state();
        context.iteration = 7;
        let child = context.fork_state(&root);
        assert_eq!(child.iteration, 7);
        assert_ne!(child.id(), root.id());
        assert_eq!(child.parent(), Some(root.id()));
    }
}
