use serde_yaml_ng::{Mapping, Value};

use super::content::{ContentContext, migrate_reusable_parameters, migrate_reusable_responses};
use super::security::convert_schemes;
use crate::document::value_kind;
use crate::error::SpecError;

/// Sections of `components`, in the order they are written.
const SECTIONS: [&str; 5] = [
    "schemas",
    "parameters",
    "requestBodies",
    "responses",
    "securitySchemes",
];

/// Build the new-dialect `components` object from the legacy top-level
/// `definitions`, `parameters`, `responses` and `securityDefinitions`.
///
/// A `components` section already present in the legacy document is merged
/// in first. Any name that would land twice in the same section is an error.
pub fn relocate(root: &Mapping, ctx: &ContentContext) -> Result<Mapping, SpecError> {
    let mut sections: Vec<(String, Mapping)> = SECTIONS
        .iter()
        .map(|name| (name.to_string(), Mapping::new()))
        .collect();

    if let Some(existing) = root.get("components") {
        let existing = existing.as_mapping().ok_or_else(|| {
            SpecError::Conversion(format!(
                "`components` must be a mapping, found {}",
                value_kind(existing)
            ))
        })?;
        for (key, value) in existing {
            let Some(name) = key.as_str() else { continue };
            merge_into(&mut sections, name, section(value, name)?)?;
        }
    }

    let definitions = section(root.get("definitions").unwrap_or(&Value::Null), "definitions")?;
    merge_into(&mut sections, "schemas", definitions)?;

    let params = section(root.get("parameters").unwrap_or(&Value::Null), "parameters")?;
    let (parameters, bodies) = migrate_reusable_parameters(&params, ctx);
    merge_into(&mut sections, "parameters", parameters)?;
    merge_into(&mut sections, "requestBodies", bodies)?;

    let responses = section(root.get("responses").unwrap_or(&Value::Null), "responses")?;
    merge_into(&mut sections, "responses", migrate_reusable_responses(&responses, ctx))?;

    let schemes = section(
        root.get("securityDefinitions").unwrap_or(&Value::Null),
        "securityDefinitions",
    )?;
    merge_into(&mut sections, "securitySchemes", convert_schemes(&schemes))?;

    Ok(sections
        .into_iter()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(name, entries)| (Value::from(name), Value::Mapping(entries)))
        .collect())
}

fn section(value: &Value, name: &str) -> Result<Mapping, SpecError> {
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(m) => Ok(m.clone()),
        other => Err(SpecError::Conversion(format!(
            "`{name}` must be a mapping, found {}",
            value_kind(other)
        ))),
    }
}

fn merge_into(
    sections: &mut Vec<(String, Mapping)>,
    name: &str,
    entries: Mapping,
) -> Result<(), SpecError> {
    let index = match sections.iter().position(|(n, _)| *n == name) {
        Some(index) => index,
        None => {
            // Unknown component kinds (`headers`, `examples`, ...) keep their place at the end.
            sections.push((name.to_string(), Mapping::new()));
            sections.len() - 1
        }
    };
    let target = &mut sections[index].1;
    for (key, value) in entries {
        if target.contains_key(&key) {
            return Err(SpecError::Conversion(format!(
                "`{}` is declared twice in components.{name}",
                key.as_str().unwrap_or("?")
            )));
        }
        target.insert(key, value);
    }
    Ok(())
}
