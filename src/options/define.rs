// src/options/define.rs

use std::collections::BTreeMap;

use crate::errors::Result;

/// Compile-time replacements: the explicit `define` map plus two keys per
/// environment variable, `process.env.KEY` and `import.meta.env.KEY`, each
/// mapped to the value as a JSON string literal.
pub fn build_define(
    define: &BTreeMap<String, String>,
    env: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut out = define.clone();
    for (key, value) in env {
        let literal = serde_json::to_string(value)?;
        out.insert(format!("process.env.{key}"), literal.clone());
        out.insert(format!("import.meta.env.{key}"), literal);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_become_json_literals() {
        let env = BTreeMap::from([("API".to_string(), "a \"b\"".to_string())]);
        let define = BTreeMap::from([("__DEV__".to_string(), "false".to_string())]);

        let out = build_define(&define, &env).unwrap();
        assert_eq!(out["__DEV__"], "false");
        assert_eq!(out["process.env.API"], r#""a \"b\"""#);
        assert_eq!(out["import.meta.env.API"], r#""a \"b\"""#);
        assert_eq!(out.len(), 3);
    }
}
