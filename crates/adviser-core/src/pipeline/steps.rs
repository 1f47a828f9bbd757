//! Steps scoring one resolution step.

use super::config::ConfigReader;
use super::{PipelineUnit, Step, StepOutcome, UnitConfiguration};
use crate::context::Context;
use crate::error::Result;
use crate::justification::Justification;
use crate::package::PackageVersion;
use crate::state::State;

/// Penalizes releases with known CVEs, once per CVE.
pub struct CvePenalizationStep {
    configuration: UnitConfiguration,
    cve_penalization: f64,
}

impl CvePenalizationStep {
    pub const NAME: &'static str = "CvePenalizationStep";
    pub const DEFAULT_PENALIZATION: f64 = -0.2;

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["cve_penalization"])?;
        let cve_penalization = reader.f64_or("cve_penalization", Self::DEFAULT_PENALIZATION)?;
        Ok(Self {
            configuration,
            cve_penalization,
        })
    }
}

impl PipelineUnit for CvePenalizationStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Step for CvePenalizationStep {
    fn run(&mut self, context: &mut Context, _state: &State, package_version: &PackageVersion) -> Result<StepOutcome> {
        let cves = context
            .knowledge_base()
            .cves(package_version.name(), package_version.locked_version())?
            .unwrap_or_default();
        if cves.is_empty() {
            return Ok(StepOutcome::neutral());
        }

        let justification = cves
            .iter()
            .map(|cve| {
                let record = Justification::warning(format!(
                    "Package {} in version {} has a known vulnerability {}",
                    package_version.name(),
                    package_version.locked_version(),
                    cve.id
                ))
                .with_field("package_name", package_version.name())
                .with_field("cve_id", cve.id.as_str());
                match &cve.link {
                    Some(link) => record.with_link(link.as_str()),
                    None => record,
                }
            })
            .collect();

        Ok(StepOutcome::Accepted {
            score: self.cve_penalization * cves.len() as f64,
            justification,
        })
    }
}

/// Rewards newer releases relative to the other known releases of a package.
///
/// The newest release scores `multiplier`; older ones decrease linearly with
/// their rank.
pub struct LatestVersionStep {
    configuration: UnitConfiguration,
    multiplier: f64,
}

impl LatestVersionStep {
    pub const NAME: &'static str = "LatestVersionStep";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["multiplier"])?;
        let multiplier = reader.f64_or("multiplier", 1.0)?;
        Ok(Self {
            configuration,
            multiplier,
        })
    }
}

impl PipelineUnit for LatestVersionStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Step for LatestVersionStep {
    fn run(&mut self, context: &mut Context, _state: &State, package_version: &PackageVersion) -> Result<StepOutcome> {
        let Some(candidates) = context.candidate_versions(package_version.name())? else {
            return Ok(StepOutcome::neutral());
        };

        let mut versions = Vec::with_capacity(candidates.len());
        for tuple in &candidates {
            if let Some(known) = context.get_package_version(tuple, true)? {
                versions.push(known.version().clone());
            }
        }
        versions.sort_by(|a, b| b.cmp(a));
        versions.dedup();
        if versions.is_empty() {
            return Ok(StepOutcome::neutral());
        }

        let rank = versions
            .iter()
            .position(|v| v == package_version.version())
            .unwrap_or(versions.len());
        let score = self.multiplier * (1.0 - rank as f64 / versions.len() as f64);
        Ok(StepOutcome::Accepted {
            score,
            justification: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{CveRecord, InMemoryKnowledgeBase};
    use crate::package::PackageTuple;
    use crate::pipeline::test_support::{context_with, package_version, INDEX};

    #[test]
    fn test_cve_penalization() {
        let mut kb = InMemoryKnowledgeBase::new();
        kb.add_package("flask", "0.12", INDEX, &[])
            .add_cve(
                "flask",
                "0.12",
                CveRecord {
                    id: "CVE-1".to_string(),
                    details: String::new(),
                    link: Some("https://example.com/cve-1".to_string()),
                },
            )
            .add_cve(
                "flask",
                "0.12",
                CveRecord {
                    id: "CVE-2".to_string(),
                    details: String::new(),
                    link: None,
                },
            );
        let mut context = context_with(kb);
        let state = context.new_state();
        let mut step = CvePenalizationStep::new(UnitConfiguration::new()).unwrap();

        match step.run(&mut context, &state, &package_version("flask", "0.12")).unwrap() {
            StepOutcome::Accepted { score, justification } => {
                assert!((score - 2.0 * CvePenalizationStep::DEFAULT_PENALIZATION).abs() < 1e-12);
                assert_eq!(justification.len(), 2);
                assert_eq!(justification[0].link.as_deref(), Some("https://example.com/cve-1"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        assert_eq!(
            step.run(&mut context, &state, &package_version("flask", "1.0")).unwrap(),
            StepOutcome::neutral()
        );
    }

    #[test]
    fn test_latest_version_ranking() {
        let mut kb = InMemoryKnowledgeBase::new();
        for version in ["1.0", "2.0", "3.0", "4.0"] {
            kb.add_package("six", version, INDEX, &[]);
        }
        let mut context = context_with(kb);
        for version in ["1.0", "2.0", "3.0", "4.0"] {
            context
                .register_package_version(PackageTuple::new("six", version, INDEX))
                .unwrap();
        }
        let state = context.new_state();
        let mut step = LatestVersionStep::new(UnitConfiguration::new()).unwrap();

        let score = |outcome: StepOutcome| match outcome {
            StepOutcome::Accepted { score, .. } => score,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(score(step.run(&mut context, &state, &package_version("six", "4.0")).unwrap()), 1.0);
        assert_eq!(score(step.run(&mut context, &state, &package_version("six", "2.0")).unwrap()), 0.5);
    }
}
