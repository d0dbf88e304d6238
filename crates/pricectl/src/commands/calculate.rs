//! `pricectl calculate` -- run a pricing strategy.
//!
//! Loads the definitions, merges `--var` inputs over the declared defaults,
//! and applies the strategy's rules in order. Rule failures show up in the
//! report; only unknown strategies and invalid inputs abort the command.

use anyhow::{Context, Result};

use pricing_formula::price;

use crate::cli::CalculateArgs;
use crate::commands::parse_var_flags;
use crate::context::RuntimeContext;
use crate::output::{format_rule, output_json};

/// Execute the `pricectl calculate` command.
pub fn run(ctx: &RuntimeContext, args: &CalculateArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let inputs = parse_var_flags(&args.vars)?;

    let report = price(&catalog, &args.pricing, &inputs, &ctx.engine_options())
        .with_context(|| format!("cannot run pricing '{}'", args.pricing))?;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("Pricing: {}", report.pricing);
    if report.results.is_empty() {
        println!("  (no rules)");
    }
    for result in &report.results {
        println!("{}", format_rule(result, |v| ctx.amount(v)));
    }
    println!("Total: {}", ctx.amount(report.total));
    Ok(())
}
