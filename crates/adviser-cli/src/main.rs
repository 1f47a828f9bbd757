mod advise;
mod output;
mod show_pipeline;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "adviser")]
#[command(about = "Recommend Python package stacks by searching a knowledge base")]
#[command(version)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recommend the best stacks for a project
    Advise(advise::AdviseArgs),

    /// Generate stacks without scoring them for a recommendation
    DependencyMonkey(advise::DependencyMonkeyArgs),

    /// Print the pipeline units a run would use
    ShowPipeline(show_pipeline::ShowPipelineArgs),
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Advise(args) => advise::execute_advise(args),
        Commands::DependencyMonkey(args) => advise::execute_dependency_monkey(args),
        Commands::ShowPipeline(args) => show_pipeline::execute(args),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
