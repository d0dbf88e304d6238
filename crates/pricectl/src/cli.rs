//! Clap CLI definitions for the `pricectl` command.

use clap::{Args, Parser, Subcommand};

/// pricectl -- evaluate pricing strategies from definition files.
#[derive(Parser, Debug)]
#[command(
    name = "pricectl",
    about = "Evaluate pricing strategies from definition files",
    long_about = "Runs data-defined pricing strategies: named variables, boolean conditions, \
                  numeric calculations and ordered rules that stack into a total.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Definitions file or name (default: from .pricing/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub defs: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Bound on nested calculation references.
    #[arg(long, global = true, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pricing strategy and print the per-rule report and total.
    #[command(alias = "calc")]
    Calculate(CalculateArgs),

    /// List the variables a pricing strategy needs.
    Describe(DescribeArgs),

    /// Evaluate a single condition.
    Condition(EvalArgs),

    /// Evaluate a single calculation.
    Calculation(EvalArgs),

    /// List declared variables.
    Variables,

    /// Load and validate the definitions.
    Validate,

    /// Show the effective configuration.
    Config,

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

/// Arguments for `pricectl calculate`.
#[derive(Args, Debug)]
pub struct CalculateArgs {
    /// Pricing strategy name.
    pub pricing: String,

    /// Input value (repeatable). Values are read as JSON when they parse,
    /// otherwise as text.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
}

/// Arguments for `pricectl describe`.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Pricing strategy name.
    pub pricing: String,
}

/// Arguments for `pricectl condition` and `pricectl calculation`.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Condition or calculation name.
    pub name: String,

    /// Input value (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Starting value of `running_total`.
    #[arg(long, value_name = "AMOUNT", allow_hyphen_values = true)]
    pub running_total: Option<f64>,
}

/// Arguments for `pricectl completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
