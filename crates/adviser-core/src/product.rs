//! Rendered recommendations and the run report.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::justification::Justification;
use crate::package::PackageTuple;
use crate::state::State;

/// One recommended stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub score: f64,
    /// Pins in resolution order
    pub packages: Vec<PackageTuple>,
    #[serde(default)]
    pub justification: Vec<Justification>,
}

impl Product {
    pub fn from_state(state: &State) -> Self {
        Self {
            score: state.score,
            packages: state.iter_resolved_dependencies().cloned().collect(),
            justification: state.justification().to_vec(),
        }
    }

    /// Render as a pip requirements file, grouping pins by index
    pub fn to_requirements(&self) -> String {
        let mut indexes: Vec<&str> = Vec::new();
        for package in &self.packages {
            if !indexes.contains(&package.index_url.as_str()) {
                indexes.push(&package.index_url);
            }
        }

        let mut output = String::new();
        for (i, index_url) in indexes.iter().enumerate() {
            if i == 0 {
                let _ = writeln!(output, "--index-url {}", index_url);
            } else {
                let _ = writeln!(output, "--extra-index-url {}", index_url);
            }
        }

        let mut pins: Vec<&PackageTuple> = self.packages.iter().collect();
        pins.sort_by(|a, b| a.name.cmp(&b.name));
        for pin in pins {
            let _ = writeln!(output, "{}=={}", pin.name, pin.version);
        }
        output
    }
}

/// Outcome of one resolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Recommended stacks, best first
    pub products: Vec<Product>,
    pub stack_info: Vec<Justification>,
    pub seed: u64,
    pub iterations: usize,
    pub accepted_final_states_count: usize,
    pub discarded_final_states_count: usize,
    pub elapsed_secs: f64,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
