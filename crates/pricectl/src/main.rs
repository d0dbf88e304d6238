//! `pricectl` -- pricing engine CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cli = Cli::parse();
    let json = cli.global.json;

    let ctx = match RuntimeContext::from_global_args(&cli.global) {
        Ok(ctx) => ctx,
        Err(e) => exit_with_error(&e, json),
    };

    // -v wins over a configured filter.
    let filter = if ctx.verbose {
        Some("pricectl=debug,pricing_formula=debug".to_string())
    } else {
        ctx.config.log.clone()
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Some(Commands::Calculate(args)) => commands::calculate::run(&ctx, &args),
        Some(Commands::Describe(args)) => commands::describe::run(&ctx, &args),
        Some(Commands::Condition(args)) => commands::evaluate::run_condition(&ctx, &args),
        Some(Commands::Calculation(args)) => commands::evaluate::run_calculation(&ctx, &args),
        Some(Commands::Variables) => commands::variables::run(&ctx),
        Some(Commands::Validate) => commands::validate::run(&ctx),
        Some(Commands::Config) => commands::config_cmd::run(&ctx),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        exit_with_error(&e, json);
    }
}

/// Print an error (as JSON in `--json` mode) and exit with code 1.
fn exit_with_error(e: &anyhow::Error, json: bool) -> ! {
    if json {
        let err_json = serde_json::json!({
            "error": format!("{:#}", e),
        });
        if let Ok(s) = serde_json::to_string_pretty(&err_json) {
            eprintln!("{}", s);
        }
    } else {
        eprintln!("Error: {:#}", e);
    }
    std::process::exit(1);
}
