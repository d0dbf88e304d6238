//! Validated, compiled snapshot of all definitions.
//!
//! A [`Catalog`] is built once from a [`Definitions`] set. Building it runs
//! every definition-time check and compiles each condition and calculation
//! into an [`Expr`], so evaluation never re-parses tokens.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::info;

use pricing_core::validation::validate_variable;
use pricing_core::{
    ALWAYS, Calculation, Condition, DefinitionError, Definitions, Pricing, RUNNING_TOTAL, Tokens,
    Value, ValueType, Variable,
};

use crate::ast::Expr;
use crate::compile::compile;

/// A definition together with its compiled expression.
#[derive(Debug, Clone)]
pub struct Compiled<T> {
    pub def: T,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
struct VariableEntry {
    def: Variable,
    default: Option<Value>,
}

/// Immutable, validated definitions for evaluation runs.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    variables: BTreeMap<String, VariableEntry>,
    conditions: BTreeMap<String, Compiled<Condition>>,
    calculations: BTreeMap<String, Compiled<Calculation>>,
    pricings: BTreeMap<String, Pricing>,
}

impl Catalog {
    /// Validates and compiles a definition set.
    ///
    /// Rejects invalid variable constraints or defaults, duplicate names,
    /// a calculation sharing a name with a variable, a condition named
    /// `always`, empty token sequences and syntax errors. A `running_total`
    /// system variable is added unless one is declared; a declared one must
    /// be a number defaulting to 0.
    pub fn new(defs: Definitions) -> Result<Self, DefinitionError> {
        let mut catalog = Catalog::default();

        for var in defs.variables {
            let default = validate_variable(&var)?;
            if var.name == RUNNING_TOTAL {
                check_running_total(&var, default.as_ref())?;
            }
            insert_unique(&mut catalog.variables, "variable", var.name.clone(), VariableEntry {
                def: var,
                default,
            })?;
        }
        catalog
            .variables
            .entry(RUNNING_TOTAL.to_string())
            .or_insert_with(running_total_variable);

        for cond in defs.conditions {
            if cond.name == ALWAYS {
                return Err(DefinitionError::ReservedName {
                    kind: "condition",
                    name: cond.name,
                });
            }
            let expr = compile_tokens("condition", &cond.name, &cond.tokens)?;
            insert_unique(&mut catalog.conditions, "condition", cond.name.clone(), Compiled {
                def: cond,
                expr,
            })?;
        }

        for calc in defs.calculations {
            if catalog.variables.contains_key(&calc.name) {
                return Err(DefinitionError::DuplicateName {
                    kind: "variable/calculation",
                    name: calc.name,
                });
            }
            let expr = compile_tokens("calculation", &calc.name, &calc.tokens)?;
            insert_unique(&mut catalog.calculations, "calculation", calc.name.clone(), Compiled {
                def: calc,
                expr,
            })?;
        }

        for pricing in defs.pricings {
            insert_unique(&mut catalog.pricings, "pricing", pricing.name.clone(), pricing)?;
        }

        info!(
            variables = catalog.variables.len(),
            conditions = catalog.conditions.len(),
            calculations = catalog.calculations.len(),
            pricings = catalog.pricings.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name).map(|e| &e.def)
    }

    /// The validated, typed default of a variable.
    pub fn default_value(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).and_then(|e| e.default.as_ref())
    }

    /// All variables, system variables first, then by name.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.variables.values().map(|e| &e.def).collect();
        vars.sort_by(|a, b| Variable::listing_order(a, b));
        vars
    }

    /// Variables that declare a default, with their typed defaults.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables
            .iter()
            .filter_map(|(name, e)| e.default.as_ref().map(|d| (name.as_str(), d)))
    }

    pub fn condition(&self, name: &str) -> Option<&Compiled<Condition>> {
        self.conditions.get(name)
    }

    pub fn calculation(&self, name: &str) -> Option<&Compiled<Calculation>> {
        self.calculations.get(name)
    }

    pub fn pricing(&self, name: &str) -> Option<&Pricing> {
        self.pricings.get(name)
    }

    pub fn pricings(&self) -> impl Iterator<Item = &Pricing> {
        self.pricings.values()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values().map(|c| &c.def)
    }

    pub fn calculations(&self) -> impl Iterator<Item = &Calculation> {
        self.calculations.values().map(|c| &c.def)
    }
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    name: String,
    value: T,
) -> Result<(), DefinitionError> {
    match map.entry(name) {
        Entry::Occupied(e) => Err(DefinitionError::DuplicateName {
            kind,
            name: e.key().clone(),
        }),
        Entry::Vacant(e) => {
            e.insert(value);
            Ok(())
        }
    }
}

fn compile_tokens(kind: &'static str, name: &str, tokens: &Tokens) -> Result<Expr, DefinitionError> {
    if tokens.is_empty() {
        return Err(DefinitionError::EmptyExpression {
            kind,
            name: name.to_string(),
        });
    }
    compile(tokens.as_slice()).map_err(|e| DefinitionError::Syntax {
        kind,
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Every run starts its running total at 0, whatever the declaration says.
fn check_running_total(var: &Variable, default: Option<&Value>) -> Result<(), DefinitionError> {
    let starts_at_zero = default.is_none_or(|v| *v == Value::Number(0.0));
    if var.value_type == ValueType::Number && starts_at_zero {
        return Ok(());
    }
    Err(DefinitionError::InvalidDefault {
        variable: var.name.clone(),
        reason: "running_total is a number that always starts at 0".to_string(),
    })
}

fn running_total_variable() -> VariableEntry {
    let mut def = Variable::new(RUNNING_TOTAL, ValueType::Number)
        .with_default(0)
        .system();
    def.display_name = "Running total".to_string();
    def.category = "system".to_string();
    VariableEntry {
        def,
        default: Some(Value::Number(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defs() -> Definitions {
        Definitions {
            variables: vec![
                Variable::new("base_price", ValueType::Number).with_default("100"),
                Variable::new("qty", ValueType::Number),
            ],
            conditions: vec![Condition::new("bulk", ["qty", ">=", "10"])],
            calculations: vec![Calculation::new("markup", ["base_price", "*", "1.5"])],
            pricings: vec![Pricing::new("standard", vec![])],
        }
    }

    #[test]
    fn builds_and_adds_running_total() {
        let catalog = Catalog::new(defs()).unwrap();
        let names: Vec<&str> = catalog.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["running_total", "base_price", "qty"]);
        assert_eq!(catalog.default_value("base_price"), Some(&Value::Number(100.0)));
        assert_eq!(catalog.default_value("running_total"), Some(&Value::Number(0.0)));
        assert!(catalog.default_value("qty").is_none());
        assert_eq!(catalog.calculation("markup").unwrap().expr.to_string(), "(base_price * 1.5)");
    }

    #[test]
    fn declared_running_total_is_kept() {
        let mut d = defs();
        let mut total = Variable::new(RUNNING_TOTAL, ValueType::Number)
            .with_default(0)
            .system();
        total.display_name = "Subtotal so far".to_string();
        d.variables.push(total);
        let catalog = Catalog::new(d).unwrap();
        assert_eq!(catalog.default_value(RUNNING_TOTAL), Some(&Value::Number(0.0)));
        assert_eq!(catalog.variable(RUNNING_TOTAL).unwrap().display_name, "Subtotal so far");
    }

    #[test]
    fn declared_running_total_must_start_at_zero() {
        for var in [
            Variable::new(RUNNING_TOTAL, ValueType::Number).with_default(5),
            Variable::new(RUNNING_TOTAL, ValueType::Text),
        ] {
            let mut d = defs();
            d.variables.push(var);
            assert!(matches!(
                Catalog::new(d),
                Err(DefinitionError::InvalidDefault { ref variable, .. }) if variable == RUNNING_TOTAL
            ));
        }
    }

    #[test]
    fn rejects_duplicates() {
        let mut d = defs();
        d.calculations.push(Calculation::new("markup", ["1"]));
        assert!(matches!(
            Catalog::new(d),
            Err(DefinitionError::DuplicateName { kind: "calculation", .. })
        ));

        let mut d = defs();
        d.calculations.push(Calculation::new("qty", ["1"]));
        assert!(matches!(
            Catalog::new(d),
            Err(DefinitionError::DuplicateName { kind: "variable/calculation", .. })
        ));
    }

    #[test]
    fn rejects_reserved_always() {
        let mut d = defs();
        d.conditions.push(Condition::new("always", ["false"]));
        assert!(matches!(Catalog::new(d), Err(DefinitionError::ReservedName { .. })));
    }

    #[test]
    fn rejects_empty_and_malformed_expressions() {
        let mut d = defs();
        d.calculations.push(Calculation::new("nothing", Vec::<String>::new()));
        assert!(matches!(Catalog::new(d), Err(DefinitionError::EmptyExpression { .. })));

        let mut d = defs();
        d.conditions.push(Condition::new("broken", ["(", "qty", ">", "1"]));
        match Catalog::new(d) {
            Err(DefinitionError::Syntax { kind, name, .. }) => {
                assert_eq!(kind, "condition");
                assert_eq!(name, "broken");
            }
            other => panic!("expected Syntax, got {:?}", other),
        }
    }

    #[test]
    fn rejects_invalid_variable() {
        let mut d = defs();
        d.variables.push(Variable::new("tier", ValueType::Enum));
        assert!(matches!(Catalog::new(d), Err(DefinitionError::InvalidConstraint { .. })));
    }
}
