use thiserror::Error;

/// Error type for version and specifier parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{0}\"")]
    InvalidVersion(String),
    #[error("Invalid operator \"{0}\"")]
    InvalidOperator(String),
    #[error("Could not parse specifier {specifier}: {reason}")]
    InvalidSpecifier { specifier: String, reason: String },
}
