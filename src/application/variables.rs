// Template variable substitution for query targets
use serde_json::Value;
use std::collections::HashMap;

/// Grafana built-in variables with sensible defaults. These are computed by
/// Grafana's frontend and are not available through the API.
pub const GRAFANA_BUILTINS: [(&str, &str); 6] = [
    ("__rate_interval", "5m"),
    ("__interval", "1m"),
    ("__interval_ms", "60000"),
    ("__range", "1h"),
    ("__range_s", "3600"),
    ("__range_ms", "3600000"),
];

/// Recursively substitute `${name}` and bare `$name` patterns in the string
/// leaves of a JSON tree, returning a new tree.
///
/// User variables shadow built-ins on name collision. Longer names are
/// substituted first so `$__interval` never clips `$__interval_ms`.
pub fn substitute_variables(value: &Value, variables: &HashMap<String, Value>) -> Value {
    let resolved = resolve_variables(variables);
    substitute(value, &resolved)
}

fn resolve_variables(variables: &HashMap<String, Value>) -> Vec<(String, String)> {
    let mut resolved: Vec<(String, String)> = GRAFANA_BUILTINS
        .iter()
        .filter(|(name, _)| !variables.contains_key(*name))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    resolved.extend(
        variables
            .iter()
            .map(|(name, value)| (name.clone(), stringify(value))),
    );

    resolved.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    resolved
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn substitute(value: &Value, resolved: &[(String, String)]) -> Value {
    match value {
        Value::String(s) => {
            let mut out = s.clone();
            for (name, replacement) in resolved {
                out = out.replace(&format!("${{{name}}}"), replacement);
                out = out.replace(&format!("${name}"), replacement);
            }
            Value::String(out)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, resolved)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute(v, resolved)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_substitutes_both_forms() {
        let variables = vars(&[("ds", json!("uid-1"))]);
        let result = substitute_variables(
            &json!({"datasource": "$ds", "expr": "rate(metric{id=\"${ds}\"}[5m])"}),
            &variables,
        );
        assert_eq!(result["datasource"], json!("uid-1"));
        assert_eq!(result["expr"], json!("rate(metric{id=\"uid-1\"}[5m])"));
    }

    #[test]
    fn test_builtins_always_available() {
        let result = substitute_variables(
            &json!("rate(http_requests_total[$__rate_interval])"),
            &HashMap::new(),
        );
        assert_eq!(result, json!("rate(http_requests_total[5m])"));
    }

    #[test]
    fn test_user_variables_shadow_builtins() {
        let variables = vars(&[("__interval", json!("30s"))]);
        let result = substitute_variables(&json!("avg_over_time(m[$__interval])"), &variables);
        assert_eq!(result, json!("avg_over_time(m[30s])"));
    }

    #[test]
    fn test_longer_names_win_over_prefixes() {
        let result = substitute_variables(
            &json!("$__interval_ms and $__range_ms"),
            &HashMap::new(),
        );
        assert_eq!(result, json!("60000 and 3600000"));
    }

    #[test]
    fn test_recurses_and_preserves_shape() {
        let variables = vars(&[("env", json!("prod")), ("port", json!(9090))]);
        let input = json!({
            "queries": [{"expr": "up{env=\"$env\", port=\"$port\"}", "limit": 10}],
            "enabled": true
        });
        let result = substitute_variables(&input, &variables);
        assert_eq!(
            result["queries"][0]["expr"],
            json!("up{env=\"prod\", port=\"9090\"}")
        );
        // Non-string leaves pass through untouched.
        assert_eq!(result["queries"][0]["limit"], json!(10));
        assert_eq!(result["enabled"], json!(true));
    }

    #[test]
    fn test_input_not_mutated() {
        let variables = vars(&[("x", json!("y"))]);
        let input = json!({"a": "$x"});
        let _ = substitute_variables(&input, &variables);
        assert_eq!(input["a"], json!("$x"));
    }
}
