//! Resolve command - solve a scenario file and print the transaction.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;

use depsat_pm::scenario::Scenario;
use depsat_pm::solver::{Operation, Problem, Transaction};
use depsat_pm::SolverError;

pub const EXIT_OK: u8 = 0;
pub const EXIT_UNRESOLVABLE: u8 = 1;
pub const EXIT_CONFIGURATION: u8 = 2;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Scenario file (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Prefer the lowest matching versions
    #[arg(long)]
    pub prefer_lowest: bool,

    /// Never remove installed packages to reach a solution
    #[arg(long)]
    pub no_uninstall: bool,

    /// Never downgrade installed packages to reach a solution
    #[arg(long)]
    pub no_downgrade: bool,

    /// Give up after this many branching decisions
    #[arg(long, value_name = "N")]
    pub max_steps: Option<u64>,

    /// Give up after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct OperationOutput {
    job: String,
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
}

impl From<&Operation> for OperationOutput {
    fn from(op: &Operation) -> Self {
        let package = op.package();
        Self {
            job: op.kind().to_string(),
            name: package.name.clone(),
            version: package.pretty_version().to_string(),
            from: op.previous_package().map(|p| p.pretty_version().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProblemOutput {
    id: u32,
    #[serde(rename = "type")]
    rule_type: String,
    weak: bool,
    disabled: bool,
    rule: String,
    reason: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ResolveOutput {
    Ok { operations: Vec<OperationOutput> },
    Unresolvable { problems: Vec<ProblemOutput> },
    Error { message: String },
}

pub fn execute(args: ResolveArgs) -> Result<u8> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read scenario file {}", args.file.display()))?;
    let mut scenario = Scenario::from_json(&content)
        .with_context(|| format!("Failed to parse scenario file {}", args.file.display()))?;
    apply_overrides(&mut scenario, &args);

    log::debug!(
        "Resolving {} jobs against {} repositories",
        scenario.request.len(),
        scenario.repositories.len()
    );

    let started = Instant::now();
    let result = scenario.resolve();
    log::info!("Resolution finished in {:?}", started.elapsed());

    match result {
        Ok(transaction) => {
            if args.json {
                print_json(&ResolveOutput::Ok {
                    operations: transaction.operations.iter().map(OperationOutput::from).collect(),
                })?;
            } else {
                print_transaction(&transaction);
            }
            Ok(EXIT_OK)
        }
        Err(SolverError::Unresolvable(err)) => {
            if args.json {
                print_json(&ResolveOutput::Unresolvable {
                    problems: problem_output(&err.problem),
                })?;
            } else {
                eprintln!(
                    "{} Your requirements could not be resolved to an installable set of packages.",
                    style("Error:").red().bold()
                );
                eprintln!();
                eprintln!("{}", err.problem);
            }
            Ok(EXIT_UNRESOLVABLE)
        }
        Err(err @ SolverError::Timeout { .. }) => {
            report_error(&args, &err.to_string())?;
            Ok(EXIT_UNRESOLVABLE)
        }
        Err(SolverError::Configuration(err)) => {
            report_error(&args, &err.to_string())?;
            Ok(EXIT_CONFIGURATION)
        }
    }
}

fn apply_overrides(scenario: &mut Scenario, args: &ResolveArgs) {
    if args.prefer_lowest {
        scenario.policy.prefer_lowest = true;
    }
    if args.no_uninstall {
        scenario.policy.allow_uninstall = false;
    }
    if args.no_downgrade {
        scenario.policy.allow_downgrade = false;
    }
    if args.max_steps.is_some() {
        scenario.solver.max_steps = args.max_steps;
    }
    if args.timeout_ms.is_some() {
        scenario.solver.timeout_ms = args.timeout_ms;
    }
}

fn print_transaction(transaction: &Transaction) {
    if transaction.is_empty() {
        println!("{}", style("Nothing to install, update or remove").green());
        return;
    }

    println!(
        "{} Package operations: {} install{}, {} update{}, {} removal{}",
        style("Resolved:").green().bold(),
        transaction.new_installs().count(),
        plural(transaction.new_installs().count()),
        transaction.updates().count(),
        plural(transaction.updates().count()),
        transaction.removals().count(),
        plural(transaction.removals().count()),
    );
    for op in &transaction.operations {
        let line = match op {
            Operation::Install(_) => style(op.to_string()).green(),
            Operation::Update { .. } => style(op.to_string()).cyan(),
            Operation::Uninstall(_) => style(op.to_string()).red(),
        };
        println!("  - {}", line);
    }
}

fn problem_output(problem: &Problem) -> Vec<ProblemOutput> {
    problem
        .rules
        .iter()
        .map(|rule| ProblemOutput {
            id: rule.rule_id,
            rule_type: rule.rule_type.to_string(),
            weak: rule.weak,
            disabled: rule.disabled,
            rule: rule.rendered.clone(),
            reason: rule.reason.clone(),
        })
        .collect()
}

fn report_error(args: &ResolveArgs, message: &str) -> Result<()> {
    if args.json {
        print_json(&ResolveOutput::Error {
            message: message.to_string(),
        })
    } else {
        eprintln!("{} {}", style("Error:").red().bold(), message);
        Ok(())
    }
}

fn print_json(output: &ResolveOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
