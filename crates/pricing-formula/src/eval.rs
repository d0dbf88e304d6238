//! Expression evaluation.
//!
//! An [`Evaluator`] owns the per-run state: the variable environment, the
//! running total and a memo of calculation results. It borrows the catalog
//! read-only, so any number of evaluators can run against one snapshot.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use pricing_core::value::{parse_date, parse_datetime};
use pricing_core::{ALWAYS, RUNNING_TOTAL, Value};

use crate::ast::{BinaryOp, Expr};
use crate::catalog::Catalog;
use crate::types::{EngineError, EvalError};

/// Default bound on nested calculation references.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Variable values for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an environment with every declared default.
    pub fn from_defaults(catalog: &Catalog) -> Self {
        let values = catalog
            .defaults()
            .filter(|(name, _)| *name != RUNNING_TOTAL)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self { values }
    }

    /// Merges caller inputs over the declared defaults.
    ///
    /// Inputs for declared variables are coerced to the declared type; other
    /// inputs are inferred from their JSON shape. An input that does not fit
    /// is kept as text, so only the rules reading it fail. `null` leaves the
    /// default in place and `running_total` cannot be set by a caller.
    ///
    /// Inputs may not share a name with a calculation.
    pub fn resolve(
        catalog: &Catalog,
        inputs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, EngineError> {
        let mut env = Self::from_defaults(catalog);
        for (name, raw) in inputs {
            if name == RUNNING_TOTAL {
                warn!("ignoring caller-supplied {}", RUNNING_TOTAL);
                continue;
            }
            if catalog.calculation(name).is_some() {
                return Err(EngineError::InvalidInput {
                    name: name.clone(),
                    reason: "names a calculation".to_string(),
                });
            }
            if raw.is_null() {
                continue;
            }
            let typed = match catalog.variable(name) {
                Some(var) => var.value_type.coerce_json(raw),
                None => Value::from_json(raw),
            };
            let value = typed.unwrap_or_else(|err| {
                warn!(input = %name, error = %err, "keeping input as text");
                match raw {
                    serde_json::Value::String(s) => Value::Text(s.clone()),
                    other => Value::Text(other.to_string()),
                }
            });
            env.set(name.clone(), value);
        }
        debug!(values = env.values.len(), "environment resolved");
        Ok(env)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// A calculation being evaluated and the tallest calculation subtree seen
/// beneath it so far.
struct Frame<'a> {
    name: &'a str,
    below: usize,
}

/// Evaluates conditions and calculations against one environment.
pub struct Evaluator<'a> {
    catalog: &'a Catalog,
    env: Environment,
    running_total: f64,
    /// Value and subtree height of each finished calculation.
    memo: HashMap<&'a str, (f64, usize)>,
    stack: Vec<Frame<'a>>,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(catalog: &'a Catalog, env: Environment) -> Self {
        Self {
            catalog,
            env,
            running_total: 0.0,
            memo: HashMap::new(),
            stack: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the bound on nested calculation references.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn running_total(&self) -> f64 {
        self.running_total
    }

    pub fn reset_running_total(&mut self) {
        self.running_total = 0.0;
        self.memo.clear();
    }

    pub fn add_to_running_total(&mut self, delta: f64) {
        self.running_total += delta;
        self.memo.clear();
    }

    /// Evaluates a condition by name. `always` holds without a lookup.
    pub fn evaluate_condition(&mut self, name: &str) -> Result<bool, EvalError> {
        if name == ALWAYS {
            return Ok(true);
        }
        let catalog = self.catalog;
        let cond = catalog
            .condition(name)
            .ok_or_else(|| EvalError::UnknownReference(name.to_string()))?;
        let value = self.eval(&cond.expr)?;
        value.as_bool().ok_or_else(|| EvalError::NotBoolean {
            name: name.to_string(),
            found: value.kind().to_string(),
        })
    }

    /// Evaluates a calculation by name.
    pub fn calculate(&mut self, name: &str) -> Result<f64, EvalError> {
        let catalog = self.catalog;
        match catalog.calculation(name) {
            Some(calc) => self.calculation_value(&calc.def.name),
            None => Err(EvalError::UnknownReference(name.to_string())),
        }
    }

    /// Memoized results still count toward the depth limit: a hit is only
    /// accepted if re-evaluating its subtree here would fit.
    fn calculation_value(&mut self, name: &'a str) -> Result<f64, EvalError> {
        if let Some(&(value, height)) = self.memo.get(name) {
            self.check_depth(height)?;
            self.record_height(height);
            return Ok(value);
        }
        if let Some(pos) = self.stack.iter().position(|f| f.name == name) {
            let mut chain: Vec<String> =
                self.stack[pos..].iter().map(|f| f.name.to_string()).collect();
            chain.push(name.to_string());
            return Err(EvalError::CyclicReference { chain });
        }
        self.check_depth(1)?;
        let catalog = self.catalog;
        let calc = catalog
            .calculation(name)
            .ok_or_else(|| EvalError::UnknownReference(name.to_string()))?;

        self.stack.push(Frame { name, below: 0 });
        let result = self.eval(&calc.expr);
        let frame = self.stack.pop();

        let value = result?;
        let n = value.to_float().map_err(|_| EvalError::NotNumeric {
            name: name.to_string(),
            found: value.kind().to_string(),
        })?;
        let height = frame.map_or(0, |f| f.below) + 1;
        self.memo.insert(name, (n, height));
        self.record_height(height);
        Ok(n)
    }

    /// Checks that a subtree `height` calculations tall fits under the
    /// current stack.
    fn check_depth(&self, height: usize) -> Result<(), EvalError> {
        if self.stack.len() + height > self.max_depth {
            return Err(EvalError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn record_height(&mut self, height: usize) {
        if let Some(parent) = self.stack.last_mut() {
            parent.below = parent.below.max(height);
        }
    }

    fn resolve(&mut self, name: &'a str) -> Result<Value, EvalError> {
        if name == RUNNING_TOTAL {
            return Ok(Value::Number(self.running_total));
        }
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        if self.catalog.variable(name).is_some() {
            return Err(EvalError::MissingValue(name.to_string()));
        }
        if self.catalog.calculation(name).is_some() {
            return self.calculation_value(name).map(Value::Number);
        }
        Err(EvalError::UnknownReference(name.to_string()))
    }

    fn eval(&mut self, expr: &'a Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Const(v) => Ok(v.clone()),
            Expr::Ref(name) => self.resolve(name),
            Expr::Neg(inner) => {
                let v = self.eval(inner)?;
                let n = v
                    .to_float()
                    .map_err(|_| EvalError::type_mismatch("-", &[&v]))?;
                Ok(Value::Number(-n))
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And | BinaryOp::Or => self.logical(*op, lhs, rhs),
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    let l = self.eval(lhs)?;
                    let r = self.eval(rhs)?;
                    arithmetic(*op, &l, &r).map(Value::Number)
                }
                _ => {
                    let l = self.eval(lhs)?;
                    let r = self.eval(rhs)?;
                    compare(*op, &l, &r).map(Value::Boolean)
                }
            },
        }
    }

    fn logical(&mut self, op: BinaryOp, lhs: &'a Expr, rhs: &'a Expr) -> Result<Value, EvalError> {
        let l = self.eval(lhs)?;
        let Some(lb) = l.as_bool() else {
            return Err(EvalError::type_mismatch(op.as_str(), &[&l]));
        };
        match (op, lb) {
            (BinaryOp::And, false) => return Ok(Value::Boolean(false)),
            (BinaryOp::Or, true) => return Ok(Value::Boolean(true)),
            _ => {}
        }
        let r = self.eval(rhs)?;
        r.as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| EvalError::type_mismatch(op.as_str(), &[&r]))
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<f64, EvalError> {
    let (Ok(l), Ok(r)) = (lhs.to_float(), rhs.to_float()) else {
        return Err(EvalError::type_mismatch(op.as_str(), &[lhs, rhs]));
    };
    match op {
        BinaryOp::Add => Ok(l + r),
        BinaryOp::Sub => Ok(l - r),
        BinaryOp::Mul => Ok(l * r),
        BinaryOp::Div if r == 0.0 => Err(EvalError::DivideByZero),
        BinaryOp::Div => Ok(l / r),
        _ => Err(EvalError::type_mismatch(op.as_str(), &[lhs, rhs])),
    }
}

/// Comparison: chronological when either side is a date, numeric when both
/// sides coerce to numbers, structural equality otherwise.
fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let mismatch = || EvalError::type_mismatch(op.as_str(), &[lhs, rhs]);

    if is_temporal(lhs) || is_temporal(rhs) {
        let (Some(l), Some(r)) = (as_datetime(lhs), as_datetime(rhs)) else {
            return Err(mismatch());
        };
        return Ok(ordering_holds(op, l.cmp(&r)));
    }

    if let (Ok(l), Ok(r)) = (lhs.to_float(), rhs.to_float()) {
        return Ok(match op {
            BinaryOp::Gt => l > r,
            BinaryOp::Lt => l < r,
            BinaryOp::Ge => l >= r,
            BinaryOp::Le => l <= r,
            BinaryOp::Eq => l == r,
            BinaryOp::Ne => l != r,
            _ => return Err(mismatch()),
        });
    }

    let equal = match (lhs, rhs) {
        (Value::Text(a) | Value::Enum(a), Value::Text(b) | Value::Enum(b)) => a == b,
        (Value::Array(_), Value::Array(_)) | (Value::Point { .. }, Value::Point { .. }) => lhs == rhs,
        _ => return Err(mismatch()),
    };
    match op {
        BinaryOp::Eq => Ok(equal),
        BinaryOp::Ne => Ok(!equal),
        _ => Err(mismatch()),
    }
}

fn ordering_holds(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Ge => ord != Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Eq => ord == Ordering::Equal,
        _ => ord != Ordering::Equal,
    }
}

fn is_temporal(v: &Value) -> bool {
    matches!(v, Value::Date(_) | Value::DateTime(_))
}

/// Dates compare as midnight of that day; text is parsed as a datetime or
/// a date.
fn as_datetime(v: &Value) -> Option<NaiveDateTime> {
    match v {
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::DateTime(dt) => Some(*dt),
        Value::Text(s) => parse_datetime(s)
            .ok()
            .or_else(|| parse_date(s).ok().map(|d| d.and_time(NaiveTime::MIN))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pricing_core::{
        Calculation, Condition, Constraints, Definitions, ValueType, Variable,
    };
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::new(Definitions {
            variables: vec![
                Variable::new("base_price", ValueType::Number).with_default(100),
                Variable::new("qty", ValueType::Number),
                Variable::new("vip", ValueType::Boolean).with_default("false"),
                Variable::new("signup", ValueType::Date),
                Variable::new("tier", ValueType::Enum).with_constraints(Constraints {
                    values: Some(vec!["gold".into(), "silver".into()]),
                    ..Default::default()
                }),
                Variable::new("label", ValueType::Text).with_default("box"),
            ],
            conditions: vec![
                Condition::new("bulk", ["qty", ">=", "10"]),
                Condition::new("gold", ["tier", "==", "'gold'"]),
                Condition::new("early", ["signup", "<", "'2024-01-01'"]),
                Condition::new("lazy", ["vip", "&&", "nope", ">", "1"]),
                Condition::new("numeric", ["base_price"]),
                Condition::new("ghost", ["missing", ">", "1"]),
            ],
            calculations: vec![
                Calculation::new("markup", ["base_price", "*", "1.5"]),
                Calculation::new("per_unit", ["base_price", "/", "qty"]),
                Calculation::new("nested", ["markup", "+", "per_unit"]),
                Calculation::new("loop_a", ["loop_b", "+", "1"]),
                Calculation::new("loop_b", ["loop_a", "+", "1"]),
                Calculation::new("with_total", ["running_total", "*", "0.1"]),
                Calculation::new("bad_mul", ["label", "*", "2"]),
                Calculation::new("flag", ["vip"]),
                Calculation::new("leaf", ["base_price"]),
                Calculation::new("mid", ["leaf", "*", "2"]),
                Calculation::new("top", ["mid", "+", "1"]),
            ],
            pricings: vec![],
        })
        .unwrap()
    }

    fn env(pairs: &[(&str, serde_json::Value)]) -> Environment {
        let inputs: BTreeMap<String, serde_json::Value> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Environment::resolve(&catalog(), &inputs).unwrap()
    }

    #[test]
    fn always_holds_in_empty_environment() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, Environment::new());
        assert!(ev.evaluate_condition("always").unwrap());
    }

    #[test]
    fn conditions_compare_numbers_and_enums() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[("qty", json!("12")), ("tier", json!("gold"))]));
        assert!(ev.evaluate_condition("bulk").unwrap());
        assert!(ev.evaluate_condition("gold").unwrap());

        let mut ev = Evaluator::new(&catalog, env(&[("qty", json!(3)), ("tier", json!("silver"))]));
        assert!(!ev.evaluate_condition("bulk").unwrap());
        assert!(!ev.evaluate_condition("gold").unwrap());
    }

    #[test]
    fn dates_compare_chronologically() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[("signup", json!("2023-06-30"))]));
        assert!(ev.evaluate_condition("early").unwrap());
        let mut ev = Evaluator::new(&catalog, env(&[("signup", json!("2024-06-30"))]));
        assert!(!ev.evaluate_condition("early").unwrap());
    }

    #[test]
    fn logical_operators_short_circuit() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[]));
        assert!(!ev.evaluate_condition("lazy").unwrap());

        let mut ev = Evaluator::new(&catalog, env(&[("vip", json!(true))]));
        assert_eq!(
            ev.evaluate_condition("lazy").unwrap_err(),
            EvalError::UnknownReference("nope".into())
        );
    }

    #[test]
    fn condition_errors() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[]));
        assert_eq!(
            ev.evaluate_condition("ghost").unwrap_err(),
            EvalError::UnknownReference("missing".into())
        );
        assert_eq!(
            ev.evaluate_condition("bulk").unwrap_err(),
            EvalError::MissingValue("qty".into())
        );
        assert!(matches!(
            ev.evaluate_condition("numeric"),
            Err(EvalError::NotBoolean { .. })
        ));
        assert!(matches!(
            ev.evaluate_condition("undefined"),
            Err(EvalError::UnknownReference(_))
        ));
    }

    #[test]
    fn calculations_recurse() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[("qty", json!(4))]));
        assert_eq!(ev.calculate("markup").unwrap(), 150.0);
        assert_eq!(ev.calculate("nested").unwrap(), 175.0);
        assert_eq!(ev.calculate("flag").unwrap(), 0.0);
    }

    #[test]
    fn calculation_errors() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[("qty", json!(0))]));
        assert_eq!(ev.calculate("per_unit").unwrap_err(), EvalError::DivideByZero);
        assert_eq!(
            ev.calculate("bad_mul").unwrap_err().to_string(),
            "type mismatch: * cannot be applied to text and number"
        );
        assert_eq!(
            ev.calculate("loop_a").unwrap_err(),
            EvalError::CyclicReference {
                chain: vec!["loop_a".into(), "loop_b".into(), "loop_a".into()]
            }
        );
    }

    #[test]
    fn depth_limit() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[("qty", json!(4))])).with_max_depth(1);
        assert_eq!(ev.calculate("markup").unwrap(), 150.0);
        assert_eq!(ev.calculate("nested").unwrap_err(), EvalError::DepthExceeded { limit: 1 });
    }

    #[test]
    fn depth_limit_counts_memoized_subtrees() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[])).with_max_depth(2);
        let too_deep = EvalError::DepthExceeded { limit: 2 };
        assert_eq!(ev.calculate("top").unwrap_err(), too_deep);
        assert_eq!(ev.calculate("mid").unwrap(), 200.0);
        assert_eq!(ev.calculate("top").unwrap_err(), too_deep);

        let mut ev = Evaluator::new(&catalog, env(&[])).with_max_depth(3);
        assert_eq!(ev.calculate("mid").unwrap(), 200.0);
        assert_eq!(ev.calculate("top").unwrap(), 201.0);
    }

    #[test]
    fn running_total_is_visible_and_invalidates_memo() {
        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, env(&[]));
        assert_eq!(ev.calculate("with_total").unwrap(), 0.0);
        ev.add_to_running_total(200.0);
        assert_eq!(ev.calculate("with_total").unwrap(), 20.0);
        ev.reset_running_total();
        assert_eq!(ev.running_total(), 0.0);
        assert_eq!(ev.calculate("with_total").unwrap(), 0.0);
    }

    #[test]
    fn resolve_coerces_and_skips() {
        let e = env(&[
            ("qty", json!("7")),
            ("running_total", json!(999)),
            ("label", json!(null)),
            ("extra", json!([1, 2])),
        ]);
        assert_eq!(e.get("qty"), Some(&Value::Number(7.0)));
        assert_eq!(e.get("running_total"), None);
        assert_eq!(e.get("label"), Some(&Value::Text("box".into())));
        assert_eq!(
            e.get("extra"),
            Some(&Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]))
        );

    }

    #[test]
    fn resolve_keeps_unfit_inputs_as_text() {
        let e = env(&[
            ("qty", json!("many")),
            ("vip", json!(1)),
            ("extra", json!({"a": 1})),
        ]);
        assert_eq!(e.get("qty"), Some(&Value::Text("many".into())));
        assert_eq!(e.get("vip"), Some(&Value::Text("1".into())));
        assert_eq!(e.get("extra"), Some(&Value::Text(r#"{"a":1}"#.into())));

        let catalog = catalog();
        let mut ev = Evaluator::new(&catalog, e);
        assert_eq!(ev.calculate("markup").unwrap(), 150.0);
        assert!(matches!(
            ev.calculate("per_unit"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn resolve_accepts_booleans_for_numbers() {
        let e = env(&[("qty", json!(true))]);
        assert_eq!(e.get("qty"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn resolve_rejects_inputs_named_after_calculations() {
        let inputs = BTreeMap::from([("markup".to_string(), json!(1))]);
        let err = Environment::resolve(&catalog(), &inputs).unwrap_err();
        assert!(matches!(&err, EngineError::InvalidInput { name, .. } if name == "markup"));
        assert_eq!(err.to_string(), "invalid input for markup: names a calculation");
    }

    #[test]
    fn comparison_semantics() {
        let gold = Value::Enum("gold".into());
        assert!(compare(BinaryOp::Eq, &gold, &Value::Text("gold".into())).unwrap());
        assert!(compare(BinaryOp::Ne, &Value::Point { x: 1.0, y: 2.0 }, &Value::Point { x: 1.0, y: 3.0 }).unwrap());
        assert!(compare(BinaryOp::Eq, &Value::Boolean(true), &Value::Number(1.0)).unwrap());
        assert!(compare(BinaryOp::Lt, &gold, &Value::Text("silver".into())).is_err());
        assert!(compare(BinaryOp::Eq, &gold, &Value::Number(1.0)).is_err());
    }
}
