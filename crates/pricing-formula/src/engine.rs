//! Pricing runs: ordered rule application with a running total.

use std::collections::BTreeMap;

use tracing::debug;

use pricing_core::Pricing;

use crate::catalog::Catalog;
use crate::eval::{DEFAULT_MAX_DEPTH, Environment, Evaluator};
use crate::types::{EngineError, PricingReport, RuleOutcome, RuleResult};

/// Knobs for a pricing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Bound on nested calculation references.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Applies every rule of `pricing` in order.
///
/// Each rule whose condition holds adds its calculation's value to the
/// total and to the running total seen by later rules. A failing rule is
/// recorded and skipped; it never stops the run.
pub fn apply(ev: &mut Evaluator<'_>, pricing: &Pricing) -> PricingReport {
    ev.reset_running_total();

    let mut results = Vec::with_capacity(pricing.rules.len());
    let mut total = 0.0;
    let mut summary: BTreeMap<String, f64> = BTreeMap::new();

    for rule in &pricing.rules {
        let mut result = RuleResult {
            condition_name: rule.condition_name.clone(),
            calculation_name: rule.calculation_name.clone(),
            display_name: String::new(),
            formula: String::new(),
            outcome: RuleOutcome::NotMet,
        };

        result.outcome = match ev.evaluate_condition(&rule.condition_name) {
            Err(error) => RuleOutcome::Failed {
                condition_met: false,
                error,
            },
            Ok(false) => RuleOutcome::NotMet,
            Ok(true) => match ev.calculate(&rule.calculation_name) {
                Err(error) => RuleOutcome::Failed {
                    condition_met: true,
                    error,
                },
                Ok(value) => {
                    total += value;
                    ev.add_to_running_total(value);
                    *summary.entry(rule.calculation_name.clone()).or_insert(0.0) += value;
                    if let Some(calc) = ev.catalog().calculation(&rule.calculation_name) {
                        result.display_name = calc.def.display_name.clone();
                        result.formula = calc.def.tokens.to_string();
                    }
                    RuleOutcome::Applied(value)
                }
            },
        };

        debug!(
            pricing = %pricing.name,
            condition = %rule.condition_name,
            calculation = %rule.calculation_name,
            outcome = ?result.outcome,
            "rule evaluated"
        );
        results.push(result);
    }

    PricingReport {
        pricing: pricing.name.clone(),
        results,
        total,
        summary,
    }
}

/// Runs the named pricing strategy against caller inputs with a fresh
/// evaluator.
pub fn price(
    catalog: &Catalog,
    name: &str,
    inputs: &BTreeMap<String, serde_json::Value>,
    opts: &EngineOptions,
) -> Result<PricingReport, EngineError> {
    let pricing = catalog
        .pricing(name)
        .ok_or_else(|| EngineError::UnknownPricing(name.to_string()))?;
    let env = Environment::resolve(catalog, inputs)?;
    let mut ev = Evaluator::new(catalog, env).with_max_depth(opts.max_depth);
    Ok(apply(&mut ev, pricing))
}
