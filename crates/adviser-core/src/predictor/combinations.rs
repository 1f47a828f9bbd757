//! Package combinations enumeration.

use std::collections::HashSet;

use super::{latest_dependency, Predictor};
use crate::context::Context;
use crate::error::{AdviserError, Result};
use crate::package::PackageTuple;
use crate::state::{State, StateId};

/// Enumerate combinations of selected packages.
///
/// Resolution runs depth first from the most recently added state. Candidates
/// of the target packages are taken one by one, newest first, so the parent
/// stays in the beam with the remaining releases; other packages are resolved
/// to their newest candidate.
#[derive(Debug)]
pub struct PackageCombinations {
    package_names: Vec<String>,
    targets: HashSet<String>,
}

impl PackageCombinations {
    pub fn new(package_names: Vec<String>) -> Result<Self> {
        if package_names.is_empty() {
            return Err(AdviserError::Config(
                "package-combinations predictor requires at least one package name".to_string(),
            ));
        }
        let targets = package_names.iter().cloned().collect();
        Ok(Self { package_names, targets })
    }

    pub fn package_names(&self) -> &[String] {
        &self.package_names
    }

    fn pick(&self, state: &State) -> Result<(StateId, PackageTuple)> {
        let target = state
            .unresolved_dependencies()
            .iter()
            .rev()
            .find(|(name, _)| self.targets.contains(name.as_str()))
            .and_then(|(_, candidates)| candidates.first());

        match target {
            Some(package_tuple) => Ok((state.id(), package_tuple.clone())),
            None => latest_dependency(state),
        }
    }
}

impl Predictor for PackageCombinations {
    fn name(&self) -> &'static str {
        "package-combinations"
    }

    fn pre_run(&mut self, context: &Context) {
        for name in &self.package_names {
            let required = context
                .project()
                .requirements
                .iter()
                .any(|requirement| &requirement.name == name);
            if !required {
                log::debug!("Package {} is not a direct requirement; combinations cover it only if pulled in", name);
            }
        }
    }

    fn run(&mut self, context: &Context) -> Result<(StateId, PackageTuple)> {
        let state = match context.beam.get_last() {
            Some(state) => state,
            None => context.beam.top()?,
        };
        self.pick(state)
    }
}
