//! `pricectl config` -- show the effective configuration.

use anyhow::Result;

use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `pricectl config` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    if ctx.json {
        output_json(&serde_json::json!({
            "pricing_dir": ctx.pricing_dir,
            "definitions_file": ctx.definitions,
            "config": ctx.config,
        }));
        return Ok(());
    }

    match ctx.pricing_dir {
        Some(ref dir) => println!("# .pricing directory: {}", dir.display()),
        None => println!("# no .pricing directory found"),
    }
    println!("# definitions file: {}", ctx.definitions.display());
    print!("{}", serde_yaml::to_string(&ctx.config)?);
    Ok(())
}
