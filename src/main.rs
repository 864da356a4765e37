use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use mprot_analyzer::domain::analyzer::analyzer::Analyzer;
use mprot_analyzer::domain::analyzer::budget::SearchBudget;
use mprot_analyzer::domain::analyzer::report::{AnalysisReport, Check, Verdict};
use mprot_analyzer::domain::plan::plan::Plan;
use mprot_analyzer::{load_application, load_plan, logger};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CheckArg {
    Valid,
    WeaklyValid,
    NotValid,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::Valid => Check::Valid,
            CheckArg::WeaklyValid => Check::WeaklyValid,
            CheckArg::NotValid => Check::NotValid,
        }
    }
}

/// Checks whether a management plan is valid for an application.
#[derive(Debug, Parser)]
#[command(name = "mprot-analyzer", version)]
struct Args {
    /// Application definition (JSON).
    #[arg(long)]
    application: PathBuf,

    /// Management plan (JSON).
    #[arg(long)]
    plan: PathBuf,

    #[arg(long, value_enum, default_value_t = CheckArg::Valid)]
    check: CheckArg,

    /// Analyse the plan's actions in the order they are listed, ignoring constraints.
    #[arg(long)]
    sequence: bool,

    /// Give up after exploring this many search nodes.
    #[arg(long)]
    max_branches: Option<u64>,

    /// Give up after this many milliseconds.
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logger::init();

    let application = load_application(&args.application).with_context(|| format!("loading application '{}'", args.application.display()))?;
    let plan = load_plan(&args.plan).with_context(|| format!("loading plan '{}'", args.plan.display()))?;

    let mut budget = SearchBudget::unlimited();
    if let Some(max_branches) = args.max_branches {
        budget = budget.with_max_branches(max_branches);
    }
    if let Some(time_limit_ms) = args.time_limit_ms {
        budget = budget.with_time_limit(Duration::from_millis(time_limit_ms));
    }
    let analyzer = Analyzer::with_budget(budget);

    let check = Check::from(args.check);
    let plan = if args.sequence { Plan::from_sequence(plan.actions().map(|(_, action)| action.clone()).collect()) } else { plan };
    let report = analyzer.check_plan(&application, &plan, check);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing the report")?);
    } else {
        print_report(&report);
    }

    Ok(match report.verdict {
        Verdict::Holds => ExitCode::SUCCESS,
        Verdict::DoesNotHold => ExitCode::from(1),
        Verdict::Inconclusive => ExitCode::from(2),
    })
}

fn print_report(report: &AnalysisReport) {
    let verdict = match report.verdict {
        Verdict::Holds => "holds".green().bold(),
        Verdict::DoesNotHold => "does not hold".red().bold(),
        Verdict::Inconclusive => "inconclusive (search budget exhausted)".yellow().bold(),
    };
    println!("Check '{}' for '{}': {}", report.check, report.application, verdict);
    println!("{}", format!("explored {} search nodes over {} linearizations", report.explored_branches, report.linearizations).dimmed());

    if let Some(failure) = &report.failure {
        println!();
        println!("{}", "Failing branch".bold());
        println!("{}", failure);
    }
}
