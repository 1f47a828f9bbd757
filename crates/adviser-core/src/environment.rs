use std::fmt;

use serde::{Deserialize, Serialize};

/// The runtime environment a stack is resolved for
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub python_version: Option<String>,
}

impl RuntimeEnvironment {
    pub fn new(os_name: &str, os_version: &str, python_version: &str) -> Self {
        Self {
            os_name: Some(os_name.to_string()),
            os_version: Some(os_version.to_string()),
            python_version: Some(python_version.to_string()),
        }
    }

    pub fn key(&self) -> EnvironmentKey {
        EnvironmentKey {
            os_name: self.os_name.clone(),
            os_version: self.os_version.clone(),
            python_version: self.python_version.clone(),
        }
    }
}

/// `(os_name, os_version, python_version)` used to key dependents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentKey {
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub python_version: Option<String>,
}

impl fmt::Display for EnvironmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:python{}",
            self.os_name.as_deref().unwrap_or("any"),
            self.os_version.as_deref().unwrap_or("any"),
            self.python_version.as_deref().unwrap_or("any"),
        )
    }
}
