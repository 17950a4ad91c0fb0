//! Cache key normalization.
use std::collections::BTreeMap;

use serde_json::Value;

/// Stringify one parameter value, or `None` if it counts as empty.
fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Non-empty parameters as sorted `(name, value)` pairs.
///
/// Anything other than a JSON object yields no pairs.
pub fn query_pairs(params: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = params else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(name, value)| param_value(value).map(|v| (name.clone(), v)))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect()
}

/// Build the key for `url` and `params`.
///
/// One trailing slash is stripped (except for the root), empty parameters are dropped,
/// and the rest are appended as a sorted, form-encoded query string.
pub fn cache_key(url: &str, params: Option<&Value>) -> String {
    let base = if url.len() > 1 { url.strip_suffix('/').unwrap_or(url) } else { url };

    let pairs = query_pairs(params);
    if pairs.is_empty() {
        return base.to_string();
    }

    let query = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(&pairs).finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}
