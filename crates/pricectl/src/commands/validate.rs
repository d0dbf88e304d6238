//! `pricectl validate` -- check a definitions file without running anything.
//!
//! Runs every definition-time check (constraints, defaults, duplicate and
//! reserved names, expression syntax) and reports constraints that do not
//! apply to their variable's type.

use anyhow::{Context, Result};
use tracing::warn;

use pricing_core::validation::unused_constraints;
use pricing_formula::Catalog;
use pricing_formula::parser::load_definitions;

use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `pricectl validate` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let path = &ctx.definitions;
    let defs = load_definitions(path)
        .with_context(|| format!("failed to read definitions from {}", path.display()))?;

    let warnings: Vec<String> = defs
        .variables
        .iter()
        .flat_map(|var| {
            unused_constraints(var.value_type, &var.constraints)
                .into_iter()
                .map(move |name| {
                    format!(
                        "variable {}: constraint {} does not apply to {}",
                        var.name, name, var.value_type
                    )
                })
        })
        .collect();
    for w in &warnings {
        warn!("{}", w);
    }

    let catalog = Catalog::new(defs)
        .with_context(|| format!("invalid definitions in {}", path.display()))?;
    let counts = [
        ("variables", catalog.variables().len()),
        ("conditions", catalog.conditions().count()),
        ("calculations", catalog.calculations().count()),
        ("pricings", catalog.pricings().count()),
    ];

    if ctx.json {
        let mut out = serde_json::json!({
            "valid": true,
            "path": path.display().to_string(),
            "warnings": warnings,
        });
        for (name, count) in counts {
            out[name] = serde_json::json!(count);
        }
        output_json(&out);
        return Ok(());
    }

    let summary: Vec<String> = counts
        .iter()
        .map(|(name, count)| format!("{} {}", count, name))
        .collect();
    println!("{}: OK ({})", path.display(), summary.join(", "));
    for w in &warnings {
        println!("  warning: {}", w);
    }
    Ok(())
}
