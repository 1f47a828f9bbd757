//! Knowledge base access.
//!
//! The knowledge base answers questions about packages: which releases
//! exist, what they depend on, which CVEs affect them and whether they could
//! be installed at all. Every lookup returns `Ok(None)` when the knowledge
//! base has no record, which is distinct from a record that is present but
//! empty. Errors are reserved for infrastructure failures and abort a run.

mod memory;

pub use memory::{InMemoryKnowledgeBase, PackageRecord, RequirementRecord};

use serde::{Deserialize, Serialize};

use crate::environment::RuntimeEnvironment;
use crate::error::Result;
use crate::package::PackageTuple;

/// A known vulnerability affecting a package release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CveRecord {
    pub id: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Outcome of installing a release in a solver environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStatus {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub trait KnowledgeBase {
    /// All known releases of `name` for the runtime environment
    fn candidate_versions(&self, name: &str, environment: &RuntimeEnvironment) -> Result<Option<Vec<PackageTuple>>>;

    /// Direct dependencies of a release
    fn dependencies(
        &self,
        package: &PackageTuple,
        environment: &RuntimeEnvironment,
    ) -> Result<Option<Vec<RequirementRecord>>>;

    /// CVE records for a release
    fn cves(&self, name: &str, version: &str) -> Result<Option<Vec<CveRecord>>>;

    /// Solver (installability) status of a release
    fn solver_status(&self, package: &PackageTuple, environment: &RuntimeEnvironment) -> Result<Option<SolverStatus>>;
}
