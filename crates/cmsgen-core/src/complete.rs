use heck::ToTitleCase;
use serde_yaml_ng::{Mapping, Value};

use crate::document::{LEGACY_MARKER, NEW_MARKER, SpecDocument, is_http_method, value_kind};
use crate::error::SpecError;

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const DEFAULT_SECURITY_SCHEME: &str = "basicAuth";
pub const DEFAULT_RESPONSE_STATUS: &str = "200";
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "successful response";

/// Return a structurally complete copy of a legacy document.
///
/// Missing sections are filled with defaults derived from `module`, present
/// values always win. `host` and `basePath` are never touched. Completing an
/// already-completed document returns it unchanged.
pub fn complete(doc: &SpecDocument, module: &str) -> Result<SpecDocument, SpecError> {
    let source = strip_mapping(doc.root());

    let mut out = Mapping::new();
    for marker in [LEGACY_MARKER, NEW_MARKER] {
        if let Some(v) = source.get(marker) {
            out.insert(marker.into(), v.clone());
        }
    }
    out.insert("info".into(), Value::Mapping(complete_info(source.get("info"), module)?));

    for (key, value) in &source {
        if matches!(key.as_str(), Some(LEGACY_MARKER | NEW_MARKER | "info")) {
            continue;
        }
        let value = match key.as_str() {
            Some("paths") => Value::Mapping(complete_paths(value)?),
            _ => value.clone(),
        };
        out.insert(key.clone(), value);
    }

    for key in ["consumes", "produces"] {
        if !out.contains_key(key) {
            out.insert(key.into(), Value::Sequence(vec![JSON_MEDIA_TYPE.into()]));
        }
    }
    for key in ["paths", "definitions"] {
        match out.get(key) {
            None | Some(Value::Null) => {
                out.insert(key.into(), Value::Mapping(Mapping::new()));
            }
            Some(Value::Mapping(_)) => {}
            Some(other) => {
                return Err(SpecError::SpecRead(format!(
                    "`{key}` must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        }
    }

    let has_schemes = out
        .get("securityDefinitions")
        .and_then(Value::as_mapping)
        .is_some_and(|m| !m.is_empty());
    if !has_schemes {
        let mut basic = Mapping::new();
        basic.insert("type".into(), "basic".into());
        let mut defs = Mapping::new();
        defs.insert(DEFAULT_SECURITY_SCHEME.into(), Value::Mapping(basic));
        out.insert("securityDefinitions".into(), Value::Mapping(defs));

        if !out.contains_key("security") {
            let mut requirement = Mapping::new();
            requirement.insert(DEFAULT_SECURITY_SCHEME.into(), Value::Sequence(Vec::new()));
            out.insert(
                "security".into(),
                Value::Sequence(vec![Value::Mapping(requirement)]),
            );
        }
    }

    log::debug!("completed spec for module {module}");
    Ok(SpecDocument::new(out))
}

/// Synthesized defaults first, existing entries layered on top.
fn complete_info(info: Option<&Value>, module: &str) -> Result<Mapping, SpecError> {
    let mut merged = Mapping::new();
    merged.insert(
        "title".into(),
        format!("{} API", module.to_title_case()).into(),
    );
    merged.insert("version".into(), "1".into());
    merged.insert(
        "description".into(),
        format!("Content services {module} API").into(),
    );

    match info {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(existing)) => {
            for (k, v) in existing {
                merged.insert(k.clone(), v.clone());
            }
        }
        Some(other) => {
            return Err(SpecError::SpecRead(format!(
                "`info` must be a mapping, found {}",
                value_kind(other)
            )));
        }
    }
    Ok(merged)
}

/// Give every operation at least one response.
fn complete_paths(paths: &Value) -> Result<Mapping, SpecError> {
    let paths = match paths {
        Value::Null => return Ok(Mapping::new()),
        Value::Mapping(m) => m,
        other => {
            return Err(SpecError::SpecRead(format!(
                "`paths` must be a mapping, found {}",
                value_kind(other)
            )));
        }
    };

    let mut out = Mapping::new();
    for (path, item) in paths {
        let item = item.as_mapping().ok_or_else(|| {
            SpecError::SpecRead(format!(
                "path item {} must be a mapping, found {}",
                path.as_str().unwrap_or("?"),
                value_kind(item)
            ))
        })?;

        let mut completed = Mapping::new();
        for (key, value) in item {
            let is_op = key.as_str().is_some_and(is_http_method);
            if !is_op {
                completed.insert(key.clone(), value.clone());
                continue;
            }
            let op = value.as_mapping().ok_or_else(|| {
                SpecError::SpecRead(format!(
                    "operation {} {} must be a mapping",
                    key.as_str().unwrap_or("?"),
                    path.as_str().unwrap_or("?")
                ))
            })?;
            completed.insert(key.clone(), Value::Mapping(ensure_response(op)));
        }
        out.insert(path.clone(), Value::Mapping(completed));
    }
    Ok(out)
}

fn ensure_response(op: &Mapping) -> Mapping {
    let has_responses = op
        .get("responses")
        .and_then(Value::as_mapping)
        .is_some_and(|r| !r.is_empty());
    let mut op = op.clone();
    if !has_responses {
        let mut ok = Mapping::new();
        ok.insert("description".into(), DEFAULT_RESPONSE_DESCRIPTION.into());
        let mut responses = Mapping::new();
        responses.insert(DEFAULT_RESPONSE_STATUS.into(), Value::Mapping(ok));
        op.insert("responses".into(), Value::Mapping(responses));
    }
    op
}

/// Drop `required: <bool>` from inside property definitions.
///
/// Schema-level `required` lists are left alone; only a boolean sitting in a
/// single property's definition is removed.
pub fn strip_property_required(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(strip_mapping(map)),
        Value::Sequence(items) => {
            Value::Sequence(items.iter().map(strip_property_required).collect())
        }
        other => other.clone(),
    }
}

fn strip_mapping(map: &Mapping) -> Mapping {
    let mut out = Mapping::with_capacity(map.len());
    for (key, child) in map {
        let child = match (key.as_str(), child) {
            (Some("properties"), Value::Mapping(props)) => {
                Value::Mapping(strip_from_properties(props))
            }
            _ => strip_property_required(child),
        };
        out.insert(key.clone(), child);
    }
    out
}

fn strip_from_properties(props: &Mapping) -> Mapping {
    props
        .iter()
        .map(|(name, prop)| {
            let prop = match strip_property_required(prop) {
                Value::Mapping(mut def) => {
                    if matches!(def.get("required"), Some(Value::Bool(_))) {
                        def.shift_remove("required");
                    }
                    Value::Mapping(def)
                }
                other => other,
            };
            (name.clone(), prop)
        })
        .collect()
}
