//! The project whose direct requirements seed the search.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AdviserError, Result};
use crate::package::Requirement;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: Option<String>,
    /// Direct requirements in declaration order
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a direct requirement
    pub fn require(mut self, name: &str, specifier: &str) -> Result<Self> {
        self.requirements.push(Requirement::parse(name, specifier)?);
        Ok(self)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load a project file, TOML unless the extension is `.json`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let project = if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }?;

        if project.requirements.is_empty() {
            return Err(AdviserError::Config(format!(
                "Project {} declares no requirements",
                path.display()
            )));
        }
        Ok(project)
    }
}
