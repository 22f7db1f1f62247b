use anyhow::{bail, Context};
use clap::Parser;
use formula_debugger::config::{parse_assignment, LaunchConfig};
use formula_debugger::debugger::FormulaDebugger;
use formula_debugger::{dap, executor, parser};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FORMULA_DEBUGGER_LOG";

/// Step through the evaluation of a formula.
#[derive(Debug, Parser)]
#[command(name = "formula-debugger", version, about)]
struct Cli {
    /// Formula to debug. Overrides the formula from `--config`.
    formula: Option<String>,

    /// Set a variable; the value is itself a formula, e.g. `--var 'names=[1, 2]'`.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// JSON launch configuration with `formula`, `variables` and `stopOnEntry`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run to the end instead of stopping at the first node.
    #[arg(long)]
    no_stop_on_entry: bool,

    /// Speak the Debug Adapter Protocol on stdio.
    #[arg(long, alias = "debug-adapter")]
    dap: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    if cli.dap {
        dap::run_dap_mode().context("dap server failed")?;
        return Ok(());
    }
    run_interactive_mode(cli)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_interactive_mode(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => LaunchConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LaunchConfig::new(String::new()),
    };
    if let Some(formula) = cli.formula {
        config.formula = formula;
    }
    if cli.no_stop_on_entry {
        config.stop_on_entry = false;
    }
    if config.formula.trim().is_empty() {
        bail!("no formula given; pass one as an argument or through --config");
    }

    let mut variables = config.to_variables()?;
    for assignment in &cli.vars {
        let (name, value) = parse_assignment(assignment)?;
        variables.insert(name, value);
    }

    let formula = parser::parse_formula(&config.formula)
        .with_context(|| format!("parsing '{}'", config.formula))?;
    let mut debugger = FormulaDebugger::new(&formula, &variables);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    executor::run_interactive(&mut debugger, config.stop_on_entry, stdin.lock(), &mut stdout)?;

    if let Some(err) = debugger.failure() {
        bail!("{err}");
    }
    Ok(())
}
