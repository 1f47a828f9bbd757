//! The `show-pipeline` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use adviser_core::config::{ConfigLoader, DecisionType, RecommendationType};
use adviser_core::pipeline::{BuilderContext, PipelineBuilder, UnitConfiguration, UnitKind};
use adviser_core::{AdviserConfig, Project};

use crate::output;

#[derive(Args, Debug)]
pub struct ShowPipelineArgs {
    /// Project file; discovery sees an empty project when omitted
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the adviser pipeline for this recommendation type
    #[arg(short = 't', long, conflicts_with = "decision_type")]
    pub recommendation_type: Option<String>,

    /// Show the dependency-monkey pipeline for this decision type
    #[arg(short = 'd', long)]
    pub decision_type: Option<String>,

    /// Print the units as JSON
    #[arg(long)]
    pub json: bool,
}

/// One unit as listed by `show-pipeline`
#[derive(Debug, Serialize)]
pub struct UnitListing {
    pub category: &'static str,
    pub name: &'static str,
    pub configuration: UnitConfiguration,
}

pub fn execute(args: ShowPipelineArgs) -> Result<i32> {
    let (mut config, _) = ConfigLoader::new(false).load(args.config.as_deref())?;
    if let Some(recommendation_type) = &args.recommendation_type {
        config = config.with_recommendation_type(recommendation_type.parse::<RecommendationType>()?);
    }
    if let Some(decision_type) = &args.decision_type {
        config = config.with_decision_type(decision_type.parse::<DecisionType>()?);
    }

    let project = match &args.project {
        Some(path) => Project::load(path).with_context(|| format!("Failed to load project {}", path.display()))?,
        None => Project::new(),
    };

    let units = list_units(&config, project)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else {
        output::print_units(&units);
    }
    Ok(0)
}

/// Units of the configured pipeline, or of the discovered one if none is configured
pub fn list_units(config: &AdviserConfig, project: Project) -> Result<Vec<UnitListing>> {
    let mut units = Vec::new();

    if let Some(entries) = &config.pipeline {
        for entry in entries {
            let kind = UnitKind::from_name(&entry.name)?;
            kind.instantiate(entry.configuration.clone())?;
            units.push(listing(kind, entry.configuration.clone()));
        }
        return Ok(units);
    }

    let mut builder_context = BuilderContext::new(
        project,
        config.runtime_environment.clone(),
        config.recommendation_type,
        config.decision_type,
    );
    PipelineBuilder::discover_configurations(&mut builder_context)?;
    for (kind, configuration) in builder_context.included() {
        units.push(listing(*kind, configuration.clone()));
    }
    Ok(units)
}

fn listing(kind: UnitKind, configuration: UnitConfiguration) -> UnitListing {
    UnitListing {
        category: kind.category().as_str(),
        name: kind.name(),
        configuration,
    }
}
