//! Requirement specifiers such as `>=1.0,<2.0` or `~=1.4.2`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;
use crate::operator::Operator;
use crate::version::Version;

/// A single `<operator><version>` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    operator: Operator,
    version: String,
    parsed: Option<Version>,
    wildcard: Option<Vec<u64>>,
}

impl Specifier {
    /// Parse one clause, e.g. `>=1.2` or `==1.4.*`
    pub fn parse(clause: &str) -> Result<Self, VersionError> {
        let clause = clause.trim();
        let split = clause
            .find(|c: char| !matches!(c, '=' | '!' | '<' | '>' | '~'))
            .unwrap_or(clause.len());
        let (op_str, rest) = clause.split_at(split);
        let version = rest.trim();

        if version.is_empty() {
            return Err(VersionError::InvalidSpecifier {
                specifier: clause.to_string(),
                reason: "missing version".to_string(),
            });
        }

        // A bare version means an exact pin.
        let operator = if op_str.is_empty() {
            Operator::Equal
        } else {
            Operator::parse(op_str)?
        };

        if operator == Operator::Arbitrary {
            return Ok(Self {
                operator,
                version: version.to_string(),
                parsed: None,
                wildcard: None,
            });
        }

        if let Some(prefix) = version.strip_suffix(".*") {
            if !operator.allows_wildcard() {
                return Err(VersionError::InvalidSpecifier {
                    specifier: clause.to_string(),
                    reason: format!("wildcard not allowed with {}", operator),
                });
            }
            let parsed = Version::parse(prefix)?;
            let segments = parsed.release().to_vec();
            return Ok(Self {
                operator,
                version: version.to_string(),
                parsed: Some(parsed),
                wildcard: Some(segments),
            });
        }

        let parsed = Version::parse(version)?;
        if operator == Operator::Compatible && parsed.release().len() < 2 {
            return Err(VersionError::InvalidSpecifier {
                specifier: clause.to_string(),
                reason: "~= requires at least two release segments".to_string(),
            });
        }

        Ok(Self {
            operator,
            version: version.to_string(),
            parsed: Some(parsed),
            wildcard: None,
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Check whether `candidate` satisfies this clause
    pub fn contains(&self, candidate: &Version) -> bool {
        let target = match &self.parsed {
            Some(target) => target,
            None => return candidate.as_str().eq_ignore_ascii_case(&self.version),
        };

        if let Some(prefix) = &self.wildcard {
            let matches = candidate.epoch() == target.epoch() && candidate.release_starts_with(prefix);
            return match self.operator {
                Operator::NotEqual => !matches,
                _ => matches,
            };
        }

        match self.operator {
            Operator::Equal => equals(candidate, target),
            Operator::NotEqual => !equals(candidate, target),
            Operator::LessThan => candidate.cmp_public(target).is_lt(),
            Operator::LessThanOrEqual => candidate.cmp_public(target).is_le(),
            Operator::GreaterThan => candidate.cmp_public(target).is_gt(),
            Operator::GreaterThanOrEqual => candidate.cmp_public(target).is_ge(),
            Operator::Compatible => {
                let release = target.release();
                let prefix = &release[..release.len() - 1];
                candidate.cmp_public(target).is_ge()
                    && candidate.epoch() == target.epoch()
                    && candidate.release_starts_with(prefix)
            }
            Operator::Arbitrary => candidate.as_str() == self.version,
        }
    }
}

// A pin without a local label matches every local build of that version.
fn equals(candidate: &Version, target: &Version) -> bool {
    if target.local().is_some() {
        candidate == target
    } else {
        candidate.cmp_public(target).is_eq()
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A comma separated conjunction of clauses.
///
/// An empty set (written as `""` or `"*"`) matches every version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    /// A set matching every version
    pub fn any() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() || input == "*" {
            return Ok(Self::any());
        }

        let specifiers = input
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(Specifier::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { specifiers })
    }

    pub fn is_any(&self) -> bool {
        self.specifiers.is_empty()
    }

    pub fn specifiers(&self) -> &[Specifier] {
        &self.specifiers
    }

    /// Check whether `candidate` satisfies every clause
    pub fn contains(&self, candidate: &Version) -> bool {
        self.specifiers.iter().all(|s| s.contains(candidate))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifiers.is_empty() {
            return write!(f, "*");
        }
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", clauses.join(","))
    }
}

impl FromStr for SpecifierSet {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecifierSet::parse(s)
    }
}

impl Serialize for SpecifierSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpecifierSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SpecifierSet::parse(&raw).map_err(serde::de::Error::custom)
    }
}
