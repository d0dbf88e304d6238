//! Command handlers. Each module exposes a `run` entry point taking the
//! [`RuntimeContext`](crate::context::RuntimeContext).

pub mod calculate;
pub mod completion;
pub mod config_cmd;
pub mod describe;
pub mod evaluate;
pub mod validate;
pub mod variables;

use std::collections::BTreeMap;

use anyhow::{Result, bail};

/// Parse `--var key=value` flags.
///
/// Values that parse as JSON keep their JSON type (`3`, `true`, `[1,2]`,
/// `{"x":1,"y":2}`); anything else is taken as text.
pub(crate) fn parse_var_flags(vars: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut map = BTreeMap::new();
    for v in vars {
        let Some((key, raw)) = v.split_once('=') else {
            bail!("invalid variable format '{}': expected key=value", v);
        };
        if key.is_empty() {
            bail!("invalid variable format '{}': empty key", v);
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}
