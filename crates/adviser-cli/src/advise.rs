//! The `advise` and `dependency-monkey` commands.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use adviser_core::config::{ConfigLoader, DecisionType, PredictorConfig, RecommendationType};
use adviser_core::{advise, AdviserConfig, InMemoryKnowledgeBase, Project};

use crate::output;

/// Inputs and run settings shared by every resolving command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project file listing the direct requirements (TOML or JSON)
    #[arg(short, long, default_value = "project.toml")]
    pub project: PathBuf,

    /// Knowledge base file (JSON)
    #[arg(short = 'k', long)]
    pub knowledge_base: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Random seed; a random one is drawn and reported when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of iterations
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of stacks to produce
    #[arg(long)]
    pub count: Option<usize>,

    /// Maximum number of states kept in the beam
    #[arg(long)]
    pub beam_width: Option<usize>,

    /// Stop the search after this many seconds
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// Predictor to use (e.g. hill-climbing, temporal-difference, mcts)
    #[arg(long)]
    pub predictor: Option<String>,

    /// Package names for the package-combinations predictor
    #[arg(long, value_delimiter = ',')]
    pub package_combinations: Vec<String>,

    /// Ignore ADVISER_* environment variables
    #[arg(long)]
    pub no_env: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AdviseArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Kind of stack to recommend: latest, stable, testing, performance or security
    #[arg(short = 't', long)]
    pub recommendation_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct DependencyMonkeyArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// How stacks are picked: random or all
    #[arg(short = 'd', long, default_value = "random")]
    pub decision_type: String,
}

pub fn execute_advise(args: AdviseArgs) -> Result<i32> {
    let mut config = load_config(&args.run)?;
    if let Some(recommendation_type) = &args.recommendation_type {
        let recommendation_type: RecommendationType = recommendation_type.parse()?;
        config = config.with_recommendation_type(recommendation_type);
    } else if config.recommendation_type.is_none() {
        bail!("The configuration selects dependency-monkey mode; pass --recommendation-type to advise");
    }
    run(&args.run, &config)
}

pub fn execute_dependency_monkey(args: DependencyMonkeyArgs) -> Result<i32> {
    let decision_type: DecisionType = args.decision_type.parse()?;
    let config = load_config(&args.run)?.with_decision_type(decision_type);
    run(&args.run, &config)
}

/// Configuration file, then environment, then command line flags
pub fn load_config(args: &RunArgs) -> Result<AdviserConfig> {
    let loader = ConfigLoader::new(!args.no_env);
    let (mut config, sources) = loader.load(args.config.as_deref())?;
    for source in &sources {
        log::debug!("Configuration loaded from {}", source.as_str());
    }

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(limit) = args.limit {
        config.limit = limit;
    }
    if let Some(count) = args.count {
        config.count = count;
    }
    if let Some(beam_width) = args.beam_width {
        config.beam_width = beam_width;
    }
    if let Some(time_limit) = args.time_limit {
        config.time_limit_secs = Some(time_limit);
    }
    if let Some(name) = &args.predictor {
        config.predictor = PredictorConfig::from_name(name)?;
    }
    if !args.package_combinations.is_empty() {
        match &mut config.predictor {
            PredictorConfig::PackageCombinations { package_combinations } => {
                *package_combinations = args.package_combinations.clone();
            }
            _ => bail!("--package-combinations requires --predictor package-combinations"),
        }
    }
    Ok(config)
}

fn run(args: &RunArgs, config: &AdviserConfig) -> Result<i32> {
    config.validate()?;

    let project = Project::load(&args.project)
        .with_context(|| format!("Failed to load project {}", args.project.display()))?;
    let knowledge_base = InMemoryKnowledgeBase::load(&args.knowledge_base)
        .with_context(|| format!("Failed to load knowledge base {}", args.knowledge_base.display()))?;
    log::info!(
        "Loaded {} requirements and {} releases",
        project.requirements.len(),
        knowledge_base.len()
    );

    let report = match advise(config, project, Arc::new(knowledge_base)) {
        Ok(report) => report,
        Err(e) => {
            // Explain what was excluded before the run gave up
            if args.json {
                let stack_info = serde_json::json!({ "stack_info": e.stack_info() });
                println!("{}", serde_json::to_string_pretty(&stack_info)?);
            } else {
                output::print_stack_info(e.stack_info());
            }
            return Err(anyhow::Error::new(e).context("Resolution failed"));
        }
    };

    if args.json {
        println!("{}", report.to_json(true)?);
    } else {
        output::print_report(&report);
    }

    Ok(if report.is_empty() { 1 } else { 0 })
}
