//! `pricectl variables` -- list declared variables, system ones first.

use anyhow::Result;

use crate::context::RuntimeContext;
use crate::output::{output_json, output_table, variable_row};

/// Execute the `pricectl variables` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let catalog = ctx.catalog()?;
    let vars = catalog.variables();

    if ctx.json {
        output_json(&vars);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = vars.iter().map(|v| variable_row(v)).collect();
    output_table(&["NAME", "TYPE", "DEFAULT", "KIND", "DESCRIPTION"], &rows);
    Ok(())
}
