//! `pricectl describe` -- list the variables a pricing strategy needs.

use anyhow::Result;

use pricing_formula::required_variables_for;

use crate::cli::DescribeArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table, variable_row};

/// Execute the `pricectl describe` command.
pub fn run(ctx: &RuntimeContext, args: &DescribeArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let vars = required_variables_for(&catalog, &args.pricing)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "pricing": args.pricing,
            "variables": vars,
        }));
        return Ok(());
    }

    if vars.is_empty() {
        println!("Pricing '{}' needs no variables.", args.pricing);
        return Ok(());
    }
    println!("Variables for pricing '{}':", args.pricing);
    let rows: Vec<Vec<String>> = vars.iter().map(|v| variable_row(v)).collect();
    output_table(&["NAME", "TYPE", "DEFAULT", "KIND", "DESCRIPTION"], &rows);
    Ok(())
}
