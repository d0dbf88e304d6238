//! `pricectl condition` / `pricectl calculation` -- evaluate one definition.

use anyhow::{Context, Result};

use pricing_formula::{Catalog, Environment, Evaluator};

use crate::cli::EvalArgs;
use crate::commands::parse_var_flags;
use crate::context::RuntimeContext;
use crate::output::output_json;

fn evaluator<'a>(ctx: &RuntimeContext, catalog: &'a Catalog, args: &EvalArgs) -> Result<Evaluator<'a>> {
    let inputs = parse_var_flags(&args.vars)?;
    let env = Environment::resolve(catalog, &inputs)?;
    let mut ev = Evaluator::new(catalog, env).with_max_depth(ctx.config.max_depth);
    if let Some(start) = args.running_total {
        ev.add_to_running_total(start);
    }
    Ok(ev)
}

/// Execute the `pricectl condition` command.
pub fn run_condition(ctx: &RuntimeContext, args: &EvalArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let mut ev = evaluator(ctx, &catalog, args)?;
    let value = ev
        .evaluate_condition(&args.name)
        .with_context(|| format!("condition '{}'", args.name))?;

    if ctx.json {
        output_json(&serde_json::json!({
            "condition": args.name,
            "value": value,
        }));
    } else {
        println!("{}", value);
    }
    Ok(())
}

/// Execute the `pricectl calculation` command.
pub fn run_calculation(ctx: &RuntimeContext, args: &EvalArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let mut ev = evaluator(ctx, &catalog, args)?;
    let value = ev
        .calculate(&args.name)
        .with_context(|| format!("calculation '{}'", args.name))?;

    if ctx.json {
        output_json(&serde_json::json!({
            "calculation": args.name,
            "value": value,
        }));
    } else {
        println!("{}", ctx.amount(value));
    }
    Ok(())
}
