//! Package identities and the richer version objects built from them.

use std::fmt;

use adviser_version::{SpecifierSet, Version};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The `(name, version, index_url)` identity of a package release.
///
/// Two tuples are equal only if all three fields match exactly; no name or
/// version normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageTuple {
    pub name: String,
    pub version: String,
    pub index_url: String,
}

impl PackageTuple {
    pub fn new(name: impl Into<String>, version: impl Into<String>, index_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            index_url: index_url.into(),
        }
    }
}

impl fmt::Display for PackageTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={} from {}", self.name, self.version, self.index_url)
    }
}

/// A package release with its parsed version.
///
/// Built once per tuple and shared through the context registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    tuple: PackageTuple,
    version: Version,
}

impl PackageVersion {
    pub fn from_tuple(tuple: PackageTuple) -> Result<Self> {
        let version = Version::parse(&tuple.version)?;
        Ok(Self { tuple, version })
    }

    pub fn name(&self) -> &str {
        &self.tuple.name
    }

    pub fn locked_version(&self) -> &str {
        &self.tuple.version
    }

    pub fn index_url(&self) -> &str {
        &self.tuple.index_url
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn to_tuple(&self) -> PackageTuple {
        self.tuple.clone()
    }

    pub fn tuple(&self) -> &PackageTuple {
        &self.tuple
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tuple)
    }
}

/// A dependency on `name` restricted by a specifier set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(default)]
    pub specifier: SpecifierSet,
}

impl Requirement {
    pub fn new(name: impl Into<String>, specifier: SpecifierSet) -> Self {
        Self {
            name: name.into(),
            specifier,
        }
    }

    /// Parse a requirement from a name and a specifier string
    pub fn parse(name: &str, specifier: &str) -> Result<Self> {
        Ok(Self::new(name, SpecifierSet::parse(specifier)?))
    }

    /// Whether the given package version satisfies this requirement
    pub fn is_satisfied_by(&self, package_version: &PackageVersion) -> bool {
        package_version.name() == self.name && self.specifier.contains(package_version.version())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifier.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}", self.name, self.specifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_identity_is_exact() {
        let a = PackageTuple::new("flask", "1.0", "https://pypi.org/simple");
        let b = PackageTuple::new("Flask", "1.0", "https://pypi.org/simple");
        let c = PackageTuple::new("flask", "1.0.0", "https://pypi.org/simple");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_package_version_parses_version() {
        let pv = PackageVersion::from_tuple(PackageTuple::new("flask", "1.0rc1", "idx")).unwrap();
        assert!(pv.version().is_prerelease());
        assert_eq!(pv.locked_version(), "1.0rc1");
        assert!(PackageVersion::from_tuple(PackageTuple::new("flask", "nightly", "idx")).is_err());
    }

    #[test]
    fn test_requirement_satisfaction() {
        let req = Requirement::parse("flask", ">=1.0,<2.0").unwrap();
        let ok = PackageVersion::from_tuple(PackageTuple::new("flask", "1.1.2", "idx")).unwrap();
        let too_new = PackageVersion::from_tuple(PackageTuple::new("flask", "2.0.0", "idx")).unwrap();
        let other = PackageVersion::from_tuple(PackageTuple::new("django", "1.1", "idx")).unwrap();
        assert!(req.is_satisfied_by(&ok));
        assert!(!req.is_satisfied_by(&too_new));
        assert!(!req.is_satisfied_by(&other));
        assert_eq!(req.to_string(), "flask>=1.0,<2.0");
    }
}
