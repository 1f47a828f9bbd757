use thiserror::Error;

use crate::justification::Justification;
use crate::package::PackageTuple;

#[derive(Error, Debug)]
pub enum AdviserError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration for unit {unit}: {message}")]
    UnitConfiguration { unit: String, message: String },

    // Lookup errors
    #[error("Package not found: {0}")]
    PackageNotFound(PackageTuple),

    #[error("State {0} not found in beam")]
    StateNotFound(u64),

    // Beam errors
    #[error("Beam is empty")]
    EmptyBeam,

    #[error("Beam index {index} out of range for beam of size {size}")]
    BeamIndexOutOfRange { index: usize, size: usize },

    #[error("State {0} has no unresolved dependencies")]
    NoUnresolvedDependency(u64),

    // Resolution errors
    /// `stack_info` holds what the boots and sieves recorded before the abort
    #[error("No candidate versions satisfy direct requirement {name}{specifier}")]
    UnresolvableRequirement {
        name: String,
        specifier: String,
        stack_info: Vec<Justification>,
    },

    // Knowledge base errors
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Invalid version in knowledge base data: {0}")]
    Version(#[from] adviser_version::VersionError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AdviserError {
    /// Whether the error originates from invalid configuration rather than the run itself
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, AdviserError::Config(_) | AdviserError::UnitConfiguration { .. })
    }

    /// Justification gathered by the run before it aborted
    pub fn stack_info(&self) -> &[Justification] {
        match self {
            AdviserError::UnresolvableRequirement { stack_info, .. } => stack_info,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, AdviserError>;
