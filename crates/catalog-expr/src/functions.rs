//! Helper functions available to every expression.

use rhai::{Array, Dynamic, EvalAltResult, FuncRegistration, Map, Module};

/// Module of helper functions, built once and shared by every engine.
pub(crate) fn module() -> Module {
    let mut module = Module::new();
    FuncRegistration::new("pluck").set_into_module(&mut module, pluck);
    FuncRegistration::new("first").set_into_module(&mut module, first);
    FuncRegistration::new("coalesce")
        .set_into_module(&mut module, |a: Dynamic, b: Dynamic| coalesce([a, b]));
    FuncRegistration::new("coalesce").set_into_module(
        &mut module,
        |a: Dynamic, b: Dynamic, c: Dynamic| coalesce([a, b, c]),
    );
    FuncRegistration::new("coalesce").set_into_module(
        &mut module,
        |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| coalesce([a, b, c, d]),
    );
    FuncRegistration::new("trim_prefix").set_into_module(&mut module, trim_prefix);
    FuncRegistration::new("replace_regex").set_into_module(&mut module, replace_regex);
    FuncRegistration::new("get_or").set_into_module(&mut module, get_or);
    module
}

/// `pluck(list, key)`: the `key` field of every map in `list`.
fn pluck(list: Array, key: &str) -> Array {
    list.into_iter()
        .map(|item| {
            item.try_cast::<Map>()
                .and_then(|map| map.get(key).cloned())
                .unwrap_or(Dynamic::UNIT)
        })
        .collect()
}

fn first(list: Array) -> Dynamic {
    list.into_iter().next().unwrap_or(Dynamic::UNIT)
}

/// First argument that is neither `()` nor an empty string.
fn coalesce<const N: usize>(values: [Dynamic; N]) -> Dynamic {
    values
        .into_iter()
        .find(|value| !is_blank(value))
        .unwrap_or(Dynamic::UNIT)
}

fn is_blank(value: &Dynamic) -> bool {
    value.is_unit()
        || (value.is_string() && value.clone().into_string().is_ok_and(|s| s.is_empty()))
}

fn trim_prefix(input: &str, prefix: &str) -> String {
    input.strip_prefix(prefix).unwrap_or(input).to_string()
}

fn replace_regex(
    input: &str,
    pattern: &str,
    replacement: &str,
) -> Result<String, Box<EvalAltResult>> {
    let re = regex::Regex::new(pattern)
        .map_err(|e| format!("invalid pattern {pattern:?}: {e}"))?;
    Ok(re.replace_all(input, replacement).into_owned())
}

fn get_or(map: Map, key: &str, default: Dynamic) -> Dynamic {
    map.get(key)
        .filter(|value| !value.is_unit())
        .cloned()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_prefix() {
        assert_eq!(trim_prefix("team:payments", "team:"), "payments");
        assert_eq!(trim_prefix("payments", "team:"), "payments");
    }

    #[test]
    fn test_replace_regex() {
        assert_eq!(replace_regex("a-b_c", "[-_]", " ").unwrap(), "a b c");
        assert!(replace_regex("x", "(", "").is_err());
    }

    #[test]
    fn test_coalesce_skips_blank() {
        let picked = coalesce([Dynamic::UNIT, Dynamic::from(""), Dynamic::from("x")]);
        assert_eq!(picked.into_string().unwrap(), "x");
        assert!(coalesce([Dynamic::UNIT, Dynamic::from("")]).is_unit());
    }

    #[test]
    fn test_pluck_and_first() {
        let mut map = Map::new();
        map.insert("id".into(), Dynamic::from("a"));
        let list: Array = vec![Dynamic::from_map(map), Dynamic::from(3_i64)];
        let plucked = pluck(list, "id");
        assert_eq!(plucked.len(), 2);
        assert!(plucked[1].is_unit());
        assert_eq!(first(plucked).into_string().unwrap(), "a");
        assert!(first(Array::new()).is_unit());
    }
}
