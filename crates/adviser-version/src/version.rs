//! Version parsing and ordering module

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"(?ix)
        ^\s*v?
        (?:(?P<epoch>\d+)!)?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre_label>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_number>\d+)?)?
        (?:(?:-(?P<post_implicit>\d+))|(?:[-_.]?(?P<post_label>post|rev|r)[-_.]?(?P<post_number>\d+)?))?
        (?:[-_.]?(?P<dev_label>dev)[-_.]?(?P<dev_number>\d+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$"
    ).unwrap();
}

/// Pre-release phases, ordered from least to most mature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreRelease {
    fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "a" | "alpha" => PreRelease::Alpha,
            "b" | "beta" => PreRelease::Beta,
            _ => PreRelease::ReleaseCandidate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreRelease::Alpha => "a",
            PreRelease::Beta => "b",
            PreRelease::ReleaseCandidate => "rc",
        }
    }
}

/// A parsed package version.
///
/// Equality and ordering follow PEP 440: trailing zero release segments are
/// insignificant, a `.devN` release sorts before every pre-release of the
/// same release, and post-releases sort after the final release.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
    original: String,
}

// Ordering keys for the suffix segments.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Final,
}

fn parse_number(value: &str, version: &str) -> Result<u64, VersionError> {
    value
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidVersion(version.to_string()))
}

impl Version {
    /// Parse a version string
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let caps = VERSION_RE
            .captures(version)
            .ok_or_else(|| VersionError::InvalidVersion(version.to_string()))?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(m.as_str(), version)?,
            None => 0,
        };

        let release = caps["release"]
            .split('.')
            .map(|segment| parse_number(segment, version))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_label") {
            Some(label) => {
                let number = match caps.name("pre_number") {
                    Some(m) => parse_number(m.as_str(), version)?,
                    None => 0,
                };
                Some((PreRelease::from_label(label.as_str()), number))
            }
            None => None,
        };

        let post = if let Some(m) = caps.name("post_implicit") {
            Some(parse_number(m.as_str(), version)?)
        } else if caps.name("post_label").is_some() {
            match caps.name("post_number") {
                Some(m) => Some(parse_number(m.as_str(), version)?),
                None => Some(0),
            }
        } else {
            None
        };

        let dev = if caps.name("dev_label").is_some() {
            match caps.name("dev_number") {
                Some(m) => Some(parse_number(m.as_str(), version)?),
                None => Some(0),
            }
        } else {
            None
        };

        let local = caps.name("local").map(|m| m.as_str().to_lowercase());

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
            original: version.trim().to_string(),
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// The version string as it was given
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Whether this is a pre-release or development release
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Canonical string form, e.g. `1!2.0rc1.post3.dev4+abc`
    pub fn normalized(&self) -> String {
        let mut out = String::new();
        if self.epoch != 0 {
            out.push_str(&format!("{}!", self.epoch));
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        out.push_str(&release.join("."));
        if let Some((phase, number)) = self.pre {
            out.push_str(&format!("{}{}", phase.as_str(), number));
        }
        if let Some(post) = self.post {
            out.push_str(&format!(".post{}", post));
        }
        if let Some(dev) = self.dev {
            out.push_str(&format!(".dev{}", dev));
        }
        if let Some(local) = &self.local {
            out.push_str(&format!("+{}", local));
        }
        out
    }

    /// Compare ignoring the local version label
    pub fn cmp_public(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| trimmed(&self.release).cmp(trimmed(&other.release)))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }

    /// Whether the release segments start with `prefix` (missing segments count as zero)
    pub fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, segment)| self.release.get(i).copied().unwrap_or(0) == *segment)
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (Some((phase, number)), _, _) => PreKey::Pre(phase, number),
            (None, None, Some(_)) => PreKey::DevOnly,
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Final,
        }
    }
}

fn trimmed(release: &[u64]) -> &[u64] {
    let end = release
        .iter()
        .rposition(|segment| *segment != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &release[..end]
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_public(other)
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        trimmed(&self.release).hash(state);
        self.pre.hash(state);
        self.post.hash(state);
        self.dev.hash(state);
        self.local.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
