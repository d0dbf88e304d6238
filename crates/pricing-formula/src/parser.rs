//! Parse definition files (TOML and JSON) and resolve definition paths.

use std::path::{Path, PathBuf};

use tracing::debug;

use pricing_core::Definitions;

use crate::catalog::Catalog;
use crate::types::LoadError;

/// Parse definitions from a TOML string.
pub fn parse_toml(content: &str) -> Result<Definitions, LoadError> {
    toml::from_str(content).map_err(|e| LoadError::Parse(e.to_string()))
}

/// Parse definitions from a JSON string.
pub fn parse_json(content: &str) -> Result<Definitions, LoadError> {
    serde_json::from_str(content).map_err(|e| LoadError::Parse(e.to_string()))
}

/// Load definitions from a file path (auto-detect TOML vs JSON by extension).
pub fn load_definitions(path: &Path) -> Result<Definitions, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let defs = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_toml(&content)?,
        Some("json") => parse_json(&content)?,
        _ => parse_json(&content).or_else(|_| parse_toml(&content))?,
    };
    debug!(path = %path.display(), "definitions parsed");
    Ok(defs)
}

/// Load, validate and compile a definitions file.
pub fn load_catalog(path: &Path) -> Result<Catalog, LoadError> {
    let defs = load_definitions(path)?;
    Ok(Catalog::new(defs)?)
}

/// Search for a definitions file by name.
///
/// Search order:
/// 1. Exact path (absolute, or relative to `cwd`)
/// 2. `cwd` with standard extensions
/// 3. `.pricing/` under `cwd` with standard extensions
pub fn find_definitions(name: &str, cwd: &Path) -> Result<PathBuf, LoadError> {
    let exact = Path::new(name);
    if exact.is_absolute() && exact.exists() {
        return Ok(exact.to_path_buf());
    }
    let relative = cwd.join(name);
    if relative.is_file() {
        return Ok(relative);
    }

    let suffixes = [".pricing.toml", ".pricing.json", ".toml", ".json"];
    let dirs = [cwd.to_path_buf(), cwd.join(".pricing")];
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        for suffix in &suffixes {
            let candidate = dir.join(format!("{}{}", name, suffix));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(LoadError::NotFound(format!(
        "'{}' (searched {} and .pricing/)",
        name,
        cwd.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pricing_core::{DefinitionError, PricingRule, ValueType};

    const TOML_DEFS: &str = r#"
[[variables]]
name = "base_price"
type = "number"
default = 100
constraints = { min = 0 }

[[variables]]
name = "tier"
value_type = "enum"
constraints = { values = ["gold", "silver"] }

[[conditions]]
name = "gold"
formula = "tier == 'gold'"

[[calculations]]
name = "markup"
display_name = "Markup"
tokens = ["base_price", "*", "1.5"]

[[pricings]]
name = "standard"
rules = [{ condition = "always", calculation = "markup" }]
"#;

    #[test]
    fn parse_toml_definitions() {
        let defs = parse_toml(TOML_DEFS).unwrap();
        assert_eq!(defs.variables.len(), 2);
        assert_eq!(defs.variables[1].value_type, ValueType::Enum);
        assert_eq!(defs.conditions[0].tokens.as_slice(), ["tier", "==", "'gold'"]);
        assert_eq!(defs.pricings[0].rules, vec![PricingRule::new("always", "markup")]);
    }

    #[test]
    fn parse_json_definitions() {
        let json = r#"{
            "variables": [{"name": "qty", "type": "number"}],
            "calculations": [{"name": "double", "formula": "qty*2"}]
        }"#;
        let defs = parse_json(json).unwrap();
        assert_eq!(defs.calculations[0].tokens.as_slice(), ["qty", "*", "2"]);
        assert!(defs.pricings.is_empty());
    }

    #[test]
    fn parse_errors_are_reported() {
        assert!(matches!(parse_json("{"), Err(LoadError::Parse(_))));
        assert!(matches!(
            parse_toml("[[variables]]\nname = \"x\"\ntype = \"money\"\n"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn load_catalog_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.toml");
        std::fs::write(&path, TOML_DEFS).unwrap();
        let catalog = load_catalog(&path).unwrap();
        assert!(catalog.pricing("standard").is_some());
        assert!(catalog.condition("gold").is_some());
    }

    #[test]
    fn load_catalog_rejects_invalid_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.json");
        std::fs::write(
            &path,
            r#"{"conditions": [{"name": "always", "tokens": ["true"]}]}"#,
        )
        .unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Definition(DefinitionError::ReservedName { .. })
        ));
        assert!(err.is_definition_error());
    }

    #[test]
    fn find_definitions_search_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".pricing")).unwrap();
        std::fs::write(dir.path().join(".pricing").join("shop.pricing.toml"), "").unwrap();
        assert_eq!(
            find_definitions("shop", dir.path()).unwrap(),
            dir.path().join(".pricing").join("shop.pricing.toml")
        );

        std::fs::write(dir.path().join("shop.json"), "{}").unwrap();
        assert_eq!(
            find_definitions("shop", dir.path()).unwrap(),
            dir.path().join("shop.json")
        );

        assert!(matches!(
            find_definitions("missing", dir.path()),
            Err(LoadError::NotFound(_))
        ));
    }
}
