use serde_yaml_ng::{Mapping, Value};

/// Legacy reference prefixes and their new-dialect locations.
pub const REF_REWRITES: [(&str, &str); 3] = [
    ("#/definitions/", "#/components/schemas/"),
    ("#/parameters/", "#/components/parameters/"),
    ("#/responses/", "#/components/responses/"),
];

pub const LEGACY_SCHEMA_PREFIX: &str = "#/definitions/";
pub const NEW_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Result of rewriting one `$ref` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefRewrite {
    Rewritten(String),
    /// A local fragment outside the legacy sections, including the new layout.
    Unchanged,
    /// Not a local fragment; kept as-is.
    Unresolved,
}

pub fn rewrite_ref(reference: &str) -> RefRewrite {
    for (legacy, new) in REF_REWRITES {
        if let Some(name) = reference.strip_prefix(legacy) {
            return RefRewrite::Rewritten(format!("{new}{name}"));
        }
    }
    if reference.starts_with("#/") {
        RefRewrite::Unchanged
    } else {
        RefRewrite::Unresolved
    }
}

/// A rewritten tree plus the references that could not be mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub value: Value,
    pub unresolved: Vec<String>,
}

/// Return a copy of `value` with every legacy `$ref` pointed at the new
/// locations. The input is never modified.
pub fn rewrite_refs(value: &Value) -> RewriteOutcome {
    let mut unresolved = Vec::new();
    let value = rewrite_value(value, &mut unresolved);
    RewriteOutcome { value, unresolved }
}

fn rewrite_value(value: &Value, unresolved: &mut Vec<String>) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(rewrite_mapping(map, unresolved)),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| rewrite_value(item, unresolved))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn rewrite_mapping(map: &Mapping, unresolved: &mut Vec<String>) -> Mapping {
    let mut out = Mapping::with_capacity(map.len());
    for (key, child) in map {
        let child = match (key.as_str(), child) {
            (Some("$ref"), Value::String(reference)) => match rewrite_ref(reference) {
                RefRewrite::Rewritten(new) => Value::String(new),
                RefRewrite::Unchanged => child.clone(),
                RefRewrite::Unresolved => {
                    log::warn!("leaving unrecognised reference {reference} unchanged");
                    unresolved.push(reference.clone());
                    child.clone()
                }
            },
            _ => rewrite_value(child, unresolved),
        };
        out.insert(key.clone(), child);
    }
    out
}

/// Collect every `$ref` string in a tree, in document order.
pub fn collect_refs(value: &Value) -> Vec<String> {
    let mut refs = Vec::new();
    collect_into(value, &mut refs);
    refs
}

fn collect_into(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    (Some("$ref"), Value::String(r)) => refs.push(r.clone()),
                    _ => collect_into(child, refs),
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| collect_into(item, refs)),
        _ => {}
    }
}
