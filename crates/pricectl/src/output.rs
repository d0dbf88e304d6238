//! Output formatting helpers for the `pricectl` CLI.

use std::io::{self, Write};

use serde::Serialize;

use pricing_core::Variable;
use pricing_formula::{RuleOutcome, RuleResult};

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in render_table(headers, rows) {
        let _ = writeln!(handle, "{}", line);
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let join = |cells: Vec<String>| cells.join("  ").trim_end().to_string();
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join(
        headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:<w$}", h, w = *w))
            .collect(),
    ));
    lines.push(join(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        lines.push(join(
            row.iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(w) => format!("{:<w$}", cell, w = *w),
                    None => cell.clone(),
                })
                .collect(),
        ));
    }
    lines
}

/// One report line for a rule: `status  condition -> calculation  detail`.
pub fn format_rule(result: &RuleResult, amount: impl Fn(f64) -> String) -> String {
    let (status, detail) = match result.outcome {
        RuleOutcome::Applied(v) => {
            let label = if result.display_name.is_empty() {
                String::new()
            } else {
                format!(" ({})", result.display_name)
            };
            ("applied", format!("{}{}", amount(v), label))
        }
        RuleOutcome::NotMet => ("skipped", "condition not met".to_string()),
        RuleOutcome::Failed { ref error, .. } => ("failed", error.to_string()),
    };
    format!(
        "  {:<8}{} -> {}  {}",
        status, result.condition_name, result.calculation_name, detail
    )
}

/// Table row for a variable listing.
pub fn variable_row(var: &Variable) -> Vec<String> {
    let default = var
        .default_value
        .as_ref()
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    vec![
        var.name.clone(),
        var.value_type.to_string(),
        default,
        (if var.is_system { "system" } else { "" }).to_string(),
        var.description.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pricing_core::ValueType;
    use pricing_formula::EvalError;

    #[test]
    fn table_alignment() {
        let rows = vec![
            vec!["qty".to_string(), "number".to_string()],
            vec!["running_total".to_string(), "number".to_string()],
        ];
        assert_eq!(
            render_table(&["NAME", "TYPE"], &rows),
            vec![
                "NAME           TYPE",
                "-------------  ------",
                "qty            number",
                "running_total  number",
            ]
        );
    }

    #[test]
    fn rule_lines() {
        let amount = |v: f64| format!("{:.2}", v);
        let applied = RuleResult {
            condition_name: "always".into(),
            calculation_name: "markup".into(),
            display_name: "Markup".into(),
            formula: "base_price * 1.5".into(),
            outcome: RuleOutcome::Applied(150.0),
        };
        insta::assert_snapshot!(format_rule(&applied, amount).trim(), @"applied always -> markup  150.00 (Markup)");

        let failed = RuleResult {
            outcome: RuleOutcome::Failed {
                condition_met: true,
                error: EvalError::DivideByZero,
            },
            ..applied
        };
        insta::assert_snapshot!(format_rule(&failed, amount).trim(), @"failed  always -> markup  division by zero");
    }

    #[test]
    fn variable_rows() {
        let var = Variable::new("tier", ValueType::Enum).with_default("gold");
        assert_eq!(variable_row(&var), vec!["tier", "enum", "gold", "", ""]);
    }
}
