use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{arg, Command};
use routelang_core::configuration::{Configuration, SolverBackend};
use routelang_core::io::json::Scenario;
use routelang_core::scenario::{parse_constraints, solve_scenario};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Only the frontend looks at the environment, the library gets the key passed in
const API_KEY_VARIABLE: &str = "OPENAI_API_KEY";

fn cli() -> Command {
    Command::new("routelang")
        .about("Solves vehicle routing problems with constraints written in plain language")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("solve")
                .about("Solves a scenario and prints the solution json")
                .arg(
                    arg!(<SCENARIO> "Path to a scenario json file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--constraints <TEXT> "Constraint text, replaces the one in the scenario")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--"time-limit" <SECONDS> "Solver time limit in seconds")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--gap <GAP> "Relative optimality gap")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--backend <BACKEND> "Solver backend, microlp or highs")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output <PATH> "Write the solution json to this file instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Interprets constraint text against a scenario without solving")
                .arg(
                    arg!(<SCENARIO> "Path to a scenario json file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(arg!(<TEXT> "Constraint text").value_parser(clap::value_parser!(String))),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("solve", sub_m)) => solve(
            sub_m.get_one::<PathBuf>("SCENARIO").unwrap(),
            sub_m.get_one::<String>("constraints").cloned(),
            sub_m.get_one::<f64>("time-limit").copied(),
            sub_m.get_one::<f64>("gap").copied(),
            sub_m.get_one::<String>("backend").map(String::as_str),
            sub_m.get_one::<PathBuf>("output").map(PathBuf::as_path),
        ),
        Some(("parse", sub_m)) => parse(
            sub_m.get_one::<PathBuf>("SCENARIO").unwrap(),
            sub_m.get_one::<String>("TEXT").unwrap(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Configuration with the LLM key taken from the environment
fn base_configuration() -> Configuration {
    let mut configuration = Configuration::default();
    configuration.llm.api_key = std::env::var(API_KEY_VARIABLE).ok();
    if !configuration.llm.is_configured() {
        info!("{API_KEY_VARIABLE} not set, constraints are parsed without the LLM");
    }
    configuration
}

fn solve(
    scenario_path: &Path,
    constraints: Option<String>,
    time_limit: Option<f64>,
    gap: Option<f64>,
    backend: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::read_json(scenario_path)?;
    let mut configuration = base_configuration();
    if let Some(seconds) = time_limit {
        configuration.solver.time_limit = Duration::try_from_secs_f64(seconds)
            .map_err(|e| anyhow!("Invalid time limit {}: {}", seconds, e))?;
    }
    if let Some(gap) = gap {
        if !(0.0..=1.0).contains(&gap) {
            return Err(anyhow!("Gap must be between 0 and 1, got {}", gap));
        }
        configuration.solver.mip_gap = gap;
    }
    if let Some(backend) = backend {
        configuration.solver.backend = backend.parse::<SolverBackend>().map_err(|e| anyhow!(e))?;
    }

    let text = constraints.unwrap_or(scenario.constraints);
    let solution = solve_scenario(&scenario.context, &text, &configuration);
    match output {
        Some(path) => {
            solution.write_json(path)?;
            info!(path = %path.display(), status = ?solution.status, "solution written");
        }
        None => println!("{}", solution.to_json_string()?),
    }
    Ok(())
}

fn parse(scenario_path: &Path, text: &str) -> Result<()> {
    let scenario = Scenario::read_json(scenario_path)?;
    let report = parse_constraints(&scenario.context, text, &base_configuration());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
