//! Required-variable discovery for a pricing strategy.
//!
//! This is a static walk over compiled expressions; no values are needed.
//! Condition references are taken as-is, while calculation references are
//! followed transitively. Names that resolve to nothing are skipped.

use std::collections::{BTreeMap, HashSet};

use pricing_core::{ALWAYS, Pricing, Variable};

use crate::catalog::Catalog;
use crate::types::EngineError;

/// Returns the variables a caller must supply to run `pricing`, system
/// variables first, then by name.
pub fn required_variables<'c>(catalog: &'c Catalog, pricing: &Pricing) -> Vec<&'c Variable> {
    let mut found: BTreeMap<&'c str, &'c Variable> = BTreeMap::new();
    let mut visited: HashSet<&'c str> = HashSet::new();

    for rule in &pricing.rules {
        if rule.condition_name != ALWAYS {
            if let Some(cond) = catalog.condition(&rule.condition_name) {
                for name in cond.expr.references() {
                    if let Some(var) = catalog.variable(name) {
                        found.insert(&var.name, var);
                    }
                }
            }
        }
        scan_calculation(catalog, &rule.calculation_name, &mut visited, &mut found);
    }

    let mut vars: Vec<&Variable> = found.into_values().collect();
    vars.sort_by(|a, b| Variable::listing_order(a, b));
    vars
}

/// Looks up a pricing strategy by name and returns its required variables.
pub fn required_variables_for<'c>(
    catalog: &'c Catalog,
    name: &str,
) -> Result<Vec<&'c Variable>, EngineError> {
    let pricing = catalog
        .pricing(name)
        .ok_or_else(|| EngineError::UnknownPricing(name.to_string()))?;
    Ok(required_variables(catalog, pricing))
}

fn scan_calculation<'c>(
    catalog: &'c Catalog,
    name: &str,
    visited: &mut HashSet<&'c str>,
    found: &mut BTreeMap<&'c str, &'c Variable>,
) {
    let Some(calc) = catalog.calculation(name) else {
        return;
    };
    if !visited.insert(&calc.def.name) {
        return;
    }
    for reference in calc.expr.references() {
        if let Some(var) = catalog.variable(reference) {
            found.insert(&var.name, var);
        } else {
            scan_calculation(catalog, reference, visited, found);
        }
    }
}
