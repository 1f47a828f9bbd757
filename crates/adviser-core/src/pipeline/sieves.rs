//! Sieves filtering candidate releases.

use std::collections::HashSet;
use std::sync::Arc;

use super::config::ConfigReader;
use super::{PipelineUnit, Sieve, UnitConfiguration};
use crate::context::Context;
use crate::error::{AdviserError, Result};
use crate::justification::Justification;
use crate::package::{PackageTuple, PackageVersion};

/// Whether a sieve restricted to `package_name` applies to `package_version`
fn applies_to(package_name: &Option<String>, package_version: &PackageVersion) -> bool {
    package_name
        .as_deref()
        .map_or(true, |name| name == package_version.name())
}

/// Removes releases with known CVEs.
pub struct CveSieve {
    configuration: UnitConfiguration,
    package_name: Option<String>,
    reported: HashSet<PackageTuple>,
}

impl CveSieve {
    pub const NAME: &'static str = "CveSieve";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["package_name"])?;
        let package_name = reader.optional_string("package_name")?;
        Ok(Self {
            configuration,
            package_name,
            reported: HashSet::new(),
        })
    }
}

impl PipelineUnit for CveSieve {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }

    fn pre_run(&mut self, _context: &mut Context) -> Result<()> {
        self.reported.clear();
        Ok(())
    }
}

impl Sieve for CveSieve {
    fn run(&mut self, context: &mut Context, package_versions: Vec<Arc<PackageVersion>>) -> Result<Vec<Arc<PackageVersion>>> {
        let mut kept = Vec::with_capacity(package_versions.len());
        for package_version in package_versions {
            if !applies_to(&self.package_name, &package_version) {
                kept.push(package_version);
                continue;
            }

            let cves = context
                .knowledge_base()
                .cves(package_version.name(), package_version.locked_version())?
                .unwrap_or_default();
            if cves.is_empty() {
                kept.push(package_version);
                continue;
            }

            if self.reported.insert(package_version.to_tuple()) {
                let ids: Vec<&str> = cves.iter().map(|cve| cve.id.as_str()).collect();
                log::debug!("Removing {} with CVEs {}", package_version.tuple(), ids.join(", "));
                context.stack_info.push(
                    Justification::warning(format!(
                        "Package {} in version {} from {} was removed due to CVEs {}",
                        package_version.name(),
                        package_version.locked_version(),
                        package_version.index_url(),
                        ids.join(", ")
                    ))
                    .with_field("package_name", package_version.name()),
                );
            }
        }
        Ok(kept)
    }
}

/// Removes releases the solver could not install in the runtime environment.
///
/// Releases without a solver record are kept.
pub struct SolvedSieve {
    configuration: UnitConfiguration,
    without_error: bool,
    reported: HashSet<PackageTuple>,
}

impl SolvedSieve {
    pub const NAME: &'static str = "SolvedSieve";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["without_error"])?;
        let without_error = reader.bool_or("without_error", true)?;
        Ok(Self {
            configuration,
            without_error,
            reported: HashSet::new(),
        })
    }
}

impl PipelineUnit for SolvedSieve {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }

    fn pre_run(&mut self, _context: &mut Context) -> Result<()> {
        self.reported.clear();
        Ok(())
    }
}

impl Sieve for SolvedSieve {
    fn run(&mut self, context: &mut Context, package_versions: Vec<Arc<PackageVersion>>) -> Result<Vec<Arc<PackageVersion>>> {
        if !self.without_error {
            return Ok(package_versions);
        }

        let mut kept = Vec::with_capacity(package_versions.len());
        for package_version in package_versions {
            let status = context
                .knowledge_base()
                .solver_status(package_version.tuple(), context.runtime_environment())?;
            match status {
                Some(status) if status.error => {
                    if self.reported.insert(package_version.to_tuple()) {
                        let mut message = format!(
                            "Removing package {} as it was not installable in the runtime environment",
                            package_version.tuple()
                        );
                        if let Some(detail) = &status.message {
                            message.push_str(&format!(": {}", detail));
                        }
                        log::debug!("{}", message);
                        context.stack_info.push(
                            Justification::warning(message).with_field("package_name", package_version.name()),
                        );
                    }
                }
                _ => kept.push(package_version),
            }
        }
        Ok(kept)
    }
}

/// Removes pre-releases and development releases.
pub struct CutPreReleasesSieve {
    configuration: UnitConfiguration,
    package_name: Option<String>,
}

impl CutPreReleasesSieve {
    pub const NAME: &'static str = "CutPreReleasesSieve";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["package_name"])?;
        let package_name = reader.optional_string("package_name")?;
        Ok(Self {
            configuration,
            package_name,
        })
    }
}

impl PipelineUnit for CutPreReleasesSieve {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Sieve for CutPreReleasesSieve {
    fn run(&mut self, _context: &mut Context, package_versions: Vec<Arc<PackageVersion>>) -> Result<Vec<Arc<PackageVersion>>> {
        Ok(package_versions
            .into_iter()
            .filter(|package_version| {
                let cut = applies_to(&self.package_name, package_version) && package_version.version().is_prerelease();
                if cut {
                    log::trace!("Removing pre-release {}", package_version.tuple());
                }
                !cut
            })
            .collect())
    }
}

/// Keeps only the newest `limit_latest_versions` releases of each package.
pub struct LimitLatestVersionsSieve {
    configuration: UnitConfiguration,
    limit_latest_versions: usize,
}

impl LimitLatestVersionsSieve {
    pub const NAME: &'static str = "LimitLatestVersionsSieve";

    pub fn new(configuration: UnitConfiguration) -> Result<Self> {
        let reader = ConfigReader::new(Self::NAME, &configuration, &["limit_latest_versions"])?;
        let limit_latest_versions = reader.usize_or("limit_latest_versions", 5)?;
        if limit_latest_versions == 0 {
            return Err(AdviserError::UnitConfiguration {
                unit: Self::NAME.to_string(),
                message: "'limit_latest_versions' must be at least 1".to_string(),
            });
        }
        Ok(Self {
            configuration,
            limit_latest_versions,
        })
    }
}

impl PipelineUnit for LimitLatestVersionsSieve {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configuration(&self) -> &UnitConfiguration {
        &self.configuration
    }
}

impl Sieve for LimitLatestVersionsSieve {
    fn run(&mut self, _context: &mut Context, package_versions: Vec<Arc<PackageVersion>>) -> Result<Vec<Arc<PackageVersion>>> {
        let mut names: Vec<&str> = package_versions.iter().map(|pv| pv.name()).collect();
        names.sort_unstable();
        names.dedup();

        let mut allowed: HashSet<PackageTuple> = HashSet::new();
        for name in names {
            let mut versions: Vec<&Arc<PackageVersion>> =
                package_versions.iter().filter(|pv| pv.name() == name).collect();
            versions.sort_by(|a, b| b.version().cmp(a.version()));

            let mut distinct = Vec::new();
            for package_version in versions {
                if !distinct.contains(&package_version.version()) {
                    if distinct.len() == self.limit_latest_versions {
                        break;
                    }
                    distinct.push(package_version.version());
                }
                allowed.insert(package_version.to_tuple());
            }
        }

        Ok(package_versions
            .into_iter()
            .filter(|pv| allowed.contains(pv.tuple()))
            .collect())
    }
}
