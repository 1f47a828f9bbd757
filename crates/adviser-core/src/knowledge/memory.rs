use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{CveRecord, KnowledgeBase, SolverStatus};
use crate::environment::RuntimeEnvironment;
use crate::error::{AdviserError, Result};
use crate::package::PackageTuple;

/// A dependency as stored in the knowledge base, specifier unparsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRecord {
    pub name: String,
    #[serde(default)]
    pub specifier: String,
}

impl RequirementRecord {
    pub fn new(name: &str, specifier: &str) -> Self {
        Self {
            name: name.to_string(),
            specifier: specifier.to_string(),
        }
    }
}

/// Everything known about one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub index_url: String,
    /// `None` if the release has not been analysed yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<RequirementRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cves: Option<Vec<CveRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_status: Option<SolverStatus>,
}

impl PackageRecord {
    pub fn tuple(&self) -> PackageTuple {
        PackageTuple::new(&self.name, &self.version, &self.index_url)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KnowledgeBaseFile {
    #[serde(default)]
    packages: Vec<PackageRecord>,
}

/// Knowledge base held entirely in memory.
///
/// Releases are kept in insertion order so that query results are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    packages: IndexMap<String, Vec<PackageRecord>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a JSON document `{"packages": [...]}`
    pub fn from_json(contents: &str) -> Result<Self> {
        let file: KnowledgeBaseFile = serde_json::from_str(contents)?;
        let mut kb = Self::new();
        for record in file.packages {
            kb.insert(record);
        }
        Ok(kb)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            AdviserError::KnowledgeBase(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Insert or replace a release record
    pub fn insert(&mut self, record: PackageRecord) {
        let releases = self.packages.entry(record.name.clone()).or_default();
        match releases
            .iter_mut()
            .find(|r| r.version == record.version && r.index_url == record.index_url)
        {
            Some(existing) => *existing = record,
            None => releases.push(record),
        }
    }

    /// Add an analysed release with the given `(name, specifier)` requirements
    pub fn add_package(&mut self, name: &str, version: &str, index_url: &str, requires: &[(&str, &str)]) -> &mut Self {
        self.insert(PackageRecord {
            name: name.to_string(),
            version: version.to_string(),
            index_url: index_url.to_string(),
            requires: Some(
                requires
                    .iter()
                    .map(|(n, s)| RequirementRecord::new(n, s))
                    .collect(),
            ),
            cves: None,
            solver_status: None,
        });
        self
    }

    /// Attach a CVE to an existing release
    pub fn add_cve(&mut self, name: &str, version: &str, cve: CveRecord) -> &mut Self {
        for record in self.records_mut(name, version) {
            record.cves.get_or_insert_with(Vec::new).push(cve.clone());
        }
        self
    }

    /// Record a solver result for an existing release
    pub fn set_solver_status(&mut self, name: &str, version: &str, status: SolverStatus) -> &mut Self {
        for record in self.records_mut(name, version) {
            record.solver_status = Some(status.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn records_mut<'a>(&'a mut self, name: &str, version: &'a str) -> impl Iterator<Item = &'a mut PackageRecord> + 'a {
        self.packages
            .get_mut(name)
            .into_iter()
            .flatten()
            .filter(move |r| r.version == version)
    }

    fn record(&self, package: &PackageTuple) -> Option<&PackageRecord> {
        self.packages.get(&package.name)?.iter().find(|r| {
            r.version == package.version && r.index_url == package.index_url
        })
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn candidate_versions(&self, name: &str, _environment: &RuntimeEnvironment) -> Result<Option<Vec<PackageTuple>>> {
        Ok(self
            .packages
            .get(name)
            .map(|releases| releases.iter().map(PackageRecord::tuple).collect()))
    }

    fn dependencies(
        &self,
        package: &PackageTuple,
        _environment: &RuntimeEnvironment,
    ) -> Result<Option<Vec<RequirementRecord>>> {
        Ok(self.record(package).and_then(|r| r.requires.clone()))
    }

    fn cves(&self, name: &str, version: &str) -> Result<Option<Vec<CveRecord>>> {
        let Some(releases) = self.packages.get(name) else {
            return Ok(None);
        };
        let mut found = false;
        let mut cves = Vec::new();
        for record in releases.iter().filter(|r| r.version == version) {
            if let Some(records) = &record.cves {
                found = true;
                for cve in records {
                    if !cves.contains(cve) {
                        cves.push(cve.clone());
                    }
                }
            }
        }
        Ok(found.then_some(cves))
    }

    fn solver_status(&self, package: &PackageTuple, _environment: &RuntimeEnvironment) -> Result<Option<SolverStatus>> {
        Ok(self.record(package).and_then(|r| r.solver_status.clone()))
    }
}
