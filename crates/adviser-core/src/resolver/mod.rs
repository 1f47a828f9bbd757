//! The resolution loop.
//!
//! A [`Resolver`] owns the pipeline and the predictor of one run. Each
//! iteration asks the predictor for a `(state, package)` pair, forks the
//! state, runs the steps for the package and either puts the child back into
//! the beam or, once nothing is left to resolve, sends it through the strides
//! and wraps to the accepted final states of the context.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AdviserConfig;
use crate::context::{Context, ContextParams};
use crate::error::{AdviserError, Result};
use crate::justification::Justification;
use crate::knowledge::KnowledgeBase;
use crate::package::{PackageTuple, Requirement};
use crate::pipeline::{BuilderContext, Pipeline, PipelineBuilder, StepOutcome, StrideOutcome};
use crate::predictor::Predictor;
use crate::product::{Product, Report};
use crate::project::Project;
use crate::state::State;

/// Default number of iterations between two progress lines
const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

pub struct Resolver {
    pipeline: Pipeline,
    predictor: Box<dyn Predictor>,
    time_limit: Option<Duration>,
    progress_interval: usize,
    /// Releases reported as lacking dependency information in this run
    unanalysed: HashSet<PackageTuple>,
}

impl Resolver {
    pub fn new(pipeline: Pipeline, predictor: Box<dyn Predictor>) -> Self {
        Self {
            pipeline,
            predictor,
            time_limit: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            unanalysed: HashSet::new(),
        }
    }

    /// Stop the search once `time_limit` has elapsed
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Log progress every `interval` iterations; 0 disables progress lines
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn predictor_name(&self) -> &'static str {
        self.predictor.name()
    }

    /// Run the search to completion and collect the report.
    ///
    /// Policy rejections only end the branch they occur in. Knowledge base
    /// failures and malformed data abort the run.
    pub fn resolve(&mut self, context: &mut Context) -> Result<Report> {
        let start = Instant::now();
        log::info!(
            "Resolving with predictor {} (seed {}, beam width {}, limit {}, count {})",
            self.predictor.name(),
            context.seed(),
            context.beam.width(),
            context.limit(),
            context.count()
        );

        self.unanalysed.clear();
        self.pipeline.pre_run(context)?;
        self.init_root(context)?;
        self.predictor.pre_run(context);

        while !self.should_stop(context, start) {
            context.iteration += 1;
            self.expand(context)?;

            if self.progress_interval > 0 && context.iteration % self.progress_interval == 0 {
                log::info!(
                    "Iteration {}/{}: beam size {}, {} accepted, {} discarded final states",
                    context.iteration,
                    context.limit(),
                    context.beam.size(),
                    context.accepted_final_states_count(),
                    context.discarded_final_states_count()
                );
            }
        }

        self.predictor.post_run(context);
        self.pipeline.post_run(context);

        let elapsed = start.elapsed();
        log::info!(
            "Resolution finished after {} iterations in {:.3} seconds: {} accepted, {} discarded final states",
            context.iteration,
            elapsed.as_secs_f64(),
            context.accepted_final_states_count(),
            context.discarded_final_states_count()
        );

        let products: Vec<Product> = context
            .take_accepted_final_states()
            .iter()
            .map(Product::from_state)
            .collect();
        if products.is_empty() {
            context.stack_info.push(Justification::error(
                "No stack satisfying the project requirements was found",
            ));
        }

        Ok(Report {
            products,
            stack_info: std::mem::take(&mut context.stack_info),
            seed: context.seed(),
            iterations: context.iteration,
            accepted_final_states_count: context.accepted_final_states_count(),
            discarded_final_states_count: context.discarded_final_states_count(),
            elapsed_secs: elapsed.as_secs_f64(),
        })
    }

    fn should_stop(&self, context: &Context, start: Instant) -> bool {
        if context.beam.is_empty() {
            log::debug!("Beam exhausted after {} iterations", context.iteration);
            return true;
        }
        if context.iteration >= context.limit() {
            log::debug!("Iteration limit {} reached", context.limit());
            return true;
        }
        if let Some(time_limit) = self.time_limit {
            if start.elapsed() >= time_limit {
                log::warn!("Time limit of {:?} reached after {} iterations", time_limit, context.iteration);
                return true;
            }
        }
        if context.is_dependency_monkey() && context.accepted_final_states_count() >= context.count() {
            log::debug!("Produced {} stacks", context.accepted_final_states_count());
            return true;
        }
        false
    }

    /// Build the root state from the project's direct requirements
    fn init_root(&mut self, context: &mut Context) -> Result<()> {
        let requirements = context.project().requirements.clone();
        let mut root = context.new_state();

        for requirement in &requirements {
            let candidates = self.resolve_candidates(context, requirement)?;

            if root.has_unresolved(&requirement.name) {
                // Repeated requirement: both specifiers must hold
                let allowed: HashSet<PackageTuple> = candidates.into_iter().collect();
                if root.retain_unresolved_candidates(&requirement.name, |t| allowed.contains(t)) == 0 {
                    return Err(unresolvable(context, requirement));
                }
                continue;
            }

            if candidates.is_empty() {
                return Err(unresolvable(context, requirement));
            }
            for candidate in &candidates {
                context.register_direct_dependency(candidate);
            }
            log::debug!("{} candidate versions for direct requirement {}", candidates.len(), requirement);
            root.add_unresolved_dependencies(candidates);
        }

        if root.is_final() {
            log::warn!("Project declares no requirements, nothing to resolve");
            context
                .stack_info
                .push(Justification::warning("Project declares no requirements"));
            return Ok(());
        }

        context.beam.add_state(root);
        Ok(())
    }

    /// Releases satisfying `requirement` that pass the sieves, newest first
    fn resolve_candidates(&mut self, context: &mut Context, requirement: &Requirement) -> Result<Vec<PackageTuple>> {
        let Some(tuples) = context.candidate_versions(&requirement.name)? else {
            log::debug!("No releases of {} known", requirement.name);
            return Ok(Vec::new());
        };

        let mut matching = Vec::with_capacity(tuples.len());
        for package_tuple in tuples {
            let package_version = context.register_package_version(package_tuple)?;
            if requirement.is_satisfied_by(&package_version) {
                matching.push(package_version);
            }
        }

        let mut sieved = self.pipeline.run_sieves(context, matching)?;
        sieved.sort_by(|a, b| b.version().cmp(a.version()));
        Ok(sieved.iter().map(|package_version| package_version.to_tuple()).collect())
    }

    /// One iteration: resolve one package in one state
    fn expand(&mut self, context: &mut Context) -> Result<()> {
        let (state_id, package_tuple) = self.predictor.run(context)?;

        let mut child = context
            .fork_beam_state(state_id)
            .ok_or(AdviserError::StateNotFound(state_id.value()))?;
        let is_candidate = child
            .unresolved_candidates(&package_tuple.name)
            .is_some_and(|candidates| candidates.contains(&package_tuple));
        if !is_candidate {
            return Err(AdviserError::NoUnresolvedDependency(state_id.value()));
        }

        // The parent keeps its remaining alternatives
        let exhausted = context
            .beam
            .with_state_mut(state_id, |parent| parent.remove_unresolved_candidate(&package_tuple))
            .unwrap_or(false);
        if exhausted {
            log::trace!("State {} has no alternatives left for {}", state_id, package_tuple.name);
            context.beam.remove(state_id);
        }
        child.remove_unresolved_dependency(&package_tuple.name);

        let package_version = context
            .get_package_version(&package_tuple, false)?
            .ok_or_else(|| AdviserError::PackageNotFound(package_tuple.clone()))?;

        let delta = match self.pipeline.run_steps(context, &child, &package_version)? {
            StepOutcome::Rejected { .. } => {
                self.predictor
                    .set_reward_signal(context, &child, &package_tuple, f64::NAN);
                return Ok(());
            }
            StepOutcome::Skipped => 0.0,
            StepOutcome::Accepted { score, justification } => {
                child.score += score;
                child.add_justification(justification);
                child.add_resolved_dependency(package_tuple.clone());
                if !self.expand_dependencies(context, &mut child, &package_tuple)? {
                    log::trace!("Dependencies of {} cannot be satisfied in state {}", package_tuple, child.id());
                    self.predictor
                        .set_reward_signal(context, &child, &package_tuple, f64::NAN);
                    return Ok(());
                }
                score
            }
        };

        if child.is_final() {
            return self.finalize(context, child, &package_tuple);
        }

        child.beam_key = self.predictor.beam_key(&child);
        self.predictor
            .set_reward_signal(context, &child, &package_tuple, delta);
        context.beam.add_state(child);
        Ok(())
    }

    /// Add the dependencies of the freshly pinned `package_tuple` to `state`.
    ///
    /// Returns false if they conflict with what the state already holds.
    fn expand_dependencies(&mut self, context: &mut Context, state: &mut State, package_tuple: &PackageTuple) -> Result<bool> {
        let Some(requirements) = context.package_requirements(package_tuple)? else {
            if self.unanalysed.insert(package_tuple.clone()) {
                log::debug!("No dependency information for {}", package_tuple);
                context.stack_info.push(
                    Justification::warning(format!(
                        "No dependency information for {} in version {}, it cannot be resolved",
                        package_tuple.name, package_tuple.version
                    ))
                    .with_field("package_name", package_tuple.name.as_str())
                    .with_field("package_version", package_tuple.version.as_str())
                    .with_field("index_url", package_tuple.index_url.as_str()),
                );
            }
            return Ok(false);
        };

        for requirement in requirements.iter() {
            if let Some(resolved) = state.get_resolved(&requirement.name).cloned() {
                let package_version = context.register_package_version(resolved.clone())?;
                if !requirement.is_satisfied_by(&package_version) {
                    return Ok(false);
                }
                context.register_dependency(package_tuple, &resolved);
                continue;
            }

            if let Some(candidates) = state.unresolved_candidates(&requirement.name) {
                let mut kept = HashSet::new();
                for candidate in candidates {
                    let satisfied = context
                        .get_package_version(candidate, true)?
                        .is_some_and(|package_version| requirement.is_satisfied_by(&package_version));
                    if satisfied {
                        kept.insert(candidate.clone());
                    }
                }
                if state.retain_unresolved_candidates(&requirement.name, |t| kept.contains(t)) == 0 {
                    return Ok(false);
                }
                for dependency in &kept {
                    context.register_dependency(package_tuple, dependency);
                }
                continue;
            }

            let candidates = self.resolve_candidates(context, requirement)?;
            if candidates.is_empty() {
                return Ok(false);
            }
            for dependency in &candidates {
                context.register_dependency(package_tuple, dependency);
            }
            state.add_unresolved_dependencies(candidates);
        }
        Ok(true)
    }

    fn finalize(&mut self, context: &mut Context, mut state: State, package_tuple: &PackageTuple) -> Result<()> {
        match self.pipeline.run_strides(context, &state)? {
            StrideOutcome::Rejected(_) => {
                context.register_discarded_final_state();
                self.predictor
                    .set_reward_signal(context, &state, package_tuple, f64::NAN);
            }
            StrideOutcome::Accepted => {
                self.pipeline.run_wraps(context, &mut state)?;
                log::debug!(
                    "Accepted final state {} with score {} at iteration {}",
                    state.id(),
                    state.score,
                    context.iteration
                );
                self.predictor
                    .set_reward_signal(context, &state, package_tuple, f64::INFINITY);
                context.register_accepted_final_state(state);
            }
        }
        Ok(())
    }
}

fn unresolvable(context: &mut Context, requirement: &Requirement) -> AdviserError {
    AdviserError::UnresolvableRequirement {
        name: requirement.name.clone(),
        specifier: if requirement.specifier.is_any() {
            String::new()
        } else {
            requirement.specifier.to_string()
        },
        stack_info: std::mem::take(&mut context.stack_info),
    }
}

/// Run one complete resolution for `project` as described by `config`.
///
/// The seed is drawn at random when the configuration has none; the report
/// carries the seed either way so the run can be reproduced.
pub fn advise(config: &AdviserConfig, project: Project, knowledge_base: Arc<dyn KnowledgeBase>) -> Result<Report> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(rand::random);

    let mut builder_context = BuilderContext::new(
        project.clone(),
        config.runtime_environment.clone(),
        config.recommendation_type,
        config.decision_type,
    );
    let pipeline = PipelineBuilder::build(&mut builder_context, config.pipeline.as_deref())?;
    let predictor = config.effective_predictor().build()?;

    let mut context = Context::new(ContextParams::from_config(config, project, seed), knowledge_base)?;
    let mut resolver = Resolver::new(pipeline, predictor)
        .with_time_limit(config.time_limit())
        .with_progress_interval(config.progress_interval);
    resolver.resolve(&mut context)
}

#[cfg(test)]
mod tests;
