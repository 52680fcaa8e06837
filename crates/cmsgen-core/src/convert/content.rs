use std::collections::{HashMap, HashSet};

use serde_yaml_ng::{Mapping, Value};

use crate::complete::JSON_MEDIA_TYPE;
use crate::document::{is_http_method, string_list, value_kind};
use crate::error::SpecError;

pub const MULTIPART_FORM: &str = "multipart/form-data";
pub const URLENCODED_FORM: &str = "application/x-www-form-urlencoded";

/// Parameter keywords that describe the value's type and move under `schema`.
const SCHEMA_KEYWORDS: [&str; 17] = [
    "type",
    "format",
    "items",
    "default",
    "enum",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
    "collectionFormat",
];

/// Document-wide inputs to the per-operation content rewrite.
#[derive(Debug, Clone, Default)]
pub struct ContentContext {
    /// Document-level `consumes`, inherited by operations without their own.
    pub consumes: Vec<String>,
    /// Document-level `produces`.
    pub produces: Vec<String>,
    /// Names of reusable parameters declared `in: body`.
    pub body_parameters: HashSet<String>,
    /// Reusable `in: formData` parameters, folded into each referencing
    /// operation's form body.
    pub form_parameters: HashMap<String, Mapping>,
}

impl ContentContext {
    pub fn from_root(root: &Mapping) -> Self {
        let body_parameters = root
            .get("parameters")
            .and_then(Value::as_mapping)
            .map(|params| {
                params
                    .iter()
                    .filter(|(_, p)| location(p) == Some("body"))
                    .filter_map(|(name, _)| name.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let form_parameters = root
            .get("parameters")
            .and_then(Value::as_mapping)
            .map(|params| {
                params
                    .iter()
                    .filter(|(_, p)| location(p) == Some("formData"))
                    .filter_map(|(name, p)| {
                        Some((name.as_str()?.to_string(), p.as_mapping()?.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            consumes: string_list(root.get("consumes")).unwrap_or_default(),
            produces: string_list(root.get("produces")).unwrap_or_default(),
            body_parameters,
            form_parameters,
        }
    }
}

fn location(param: &Value) -> Option<&str> {
    param.get("in").and_then(Value::as_str)
}

/// An empty payload-type list falls back to JSON: a body cannot be expressed
/// without at least one content entry.
fn or_json(types: Vec<String>) -> Vec<String> {
    if types.is_empty() {
        vec![JSON_MEDIA_TYPE.to_string()]
    } else {
        types
    }
}

/// Rewrite every operation of every path item.
pub fn migrate_paths(paths: &Mapping, ctx: &ContentContext) -> Result<Mapping, SpecError> {
    let mut out = Mapping::new();
    for (path, item) in paths {
        let path_name = path.as_str().unwrap_or("?");
        let item = item.as_mapping().ok_or_else(|| {
            SpecError::Conversion(format!(
                "path item {path_name} must be a mapping, found {}",
                value_kind(item)
            ))
        })?;
        out.insert(path.clone(), Value::Mapping(migrate_path_item(path_name, item, ctx)?));
    }
    Ok(out)
}

/// Path-level body and form parameters cannot stay on the path item in the
/// new dialect; they are pushed down into each operation instead.
fn migrate_path_item(
    path: &str,
    item: &Mapping,
    ctx: &ContentContext,
) -> Result<Mapping, SpecError> {
    let shared = match item.get("parameters") {
        Some(Value::Sequence(params)) => params.as_slice(),
        Some(other) if !other.is_null() => {
            return Err(SpecError::Conversion(format!(
                "parameters of {path} must be a list, found {}",
                value_kind(other)
            )));
        }
        _ => &[][..],
    };
    let (payload, plain): (Vec<&Value>, Vec<&Value>) =
        shared.iter().partition(|p| is_payload(p, ctx));

    let mut out = Mapping::new();
    for (key, value) in item {
        let Some(name) = key.as_str() else {
            out.insert(key.clone(), value.clone());
            continue;
        };
        if name == "parameters" {
            if !plain.is_empty() {
                let params = plain.iter().map(|p| migrate_parameter(p)).collect();
                out.insert(key.clone(), Value::Sequence(params));
            }
            continue;
        }
        if !is_http_method(name) {
            out.insert(key.clone(), value.clone());
            continue;
        }
        let op = value.as_mapping().ok_or_else(|| {
            SpecError::Conversion(format!("operation {name} {path} must be a mapping"))
        })?;
        let op = inherit_parameters(op, &payload);
        let migrated = migrate_operation(&op, ctx).map_err(|e| match e {
            SpecError::Conversion(msg) => SpecError::Conversion(format!("{name} {path}: {msg}")),
            other => other,
        })?;
        out.insert(key.clone(), Value::Mapping(migrated));
    }
    Ok(out)
}

/// Whether a parameter, directly or through a reusable reference, describes
/// the request payload rather than a query/path/header value.
fn is_payload(param: &Value, ctx: &ContentContext) -> bool {
    match param.get("$ref").and_then(Value::as_str) {
        Some(reference) => {
            reusable_body_name(reference, ctx).is_some()
                || reusable_form_field(reference, ctx).is_some()
        }
        None => matches!(location(param), Some("body" | "formData")),
    }
}

/// Prepend shared parameters the operation does not override. A parameter is
/// identified by its `$ref`, or by `name` and `in`.
fn inherit_parameters(op: &Mapping, shared: &[&Value]) -> Mapping {
    if shared.is_empty() {
        return op.clone();
    }
    let own: Vec<Value> = op
        .get("parameters")
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();
    let identity = |p: &Value| {
        (
            p.get("$ref").cloned(),
            p.get("name").cloned(),
            p.get("in").cloned(),
        )
    };
    let overridden = |p: &Value| own.iter().any(|o| identity(o) == identity(p));
    let mut params: Vec<Value> = shared
        .iter()
        .copied()
        .filter(|p| !overridden(*p))
        .cloned()
        .collect();
    params.extend(own.iter().cloned());

    let mut op = op.clone();
    op.insert("parameters".into(), Value::Sequence(params));
    op
}

/// Rewrite one operation: drop `consumes`/`produces`, turn body and form
/// parameters into a `requestBody`, move response schemas under `content`.
pub fn migrate_operation(op: &Mapping, ctx: &ContentContext) -> Result<Mapping, SpecError> {
    let consumes = string_list(op.get("consumes")).unwrap_or_else(|| ctx.consumes.clone());
    let produces = string_list(op.get("produces")).unwrap_or_else(|| ctx.produces.clone());

    let params = match op.get("parameters") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Sequence(p)) => p.as_slice(),
        Some(other) => {
            return Err(SpecError::Conversion(format!(
                "parameters must be a list, found {}",
                value_kind(other)
            )));
        }
    };

    let mut parameters = Vec::new();
    let mut body: Option<&Mapping> = None;
    let mut body_ref: Option<String> = None;
    let mut form_fields: Vec<&Mapping> = Vec::new();
    for param in params {
        let param_map = param.as_mapping().ok_or_else(|| {
            SpecError::Conversion(format!("parameter must be a mapping, found {}", value_kind(param)))
        })?;
        if let Some(reference) = param_map.get("$ref").and_then(Value::as_str) {
            if let Some(name) = reusable_body_name(reference, ctx) {
                body_ref = Some(name.to_string());
            } else if let Some(field) = reusable_form_field(reference, ctx) {
                form_fields.push(field);
            } else {
                parameters.push(param.clone());
            }
            continue;
        }
        match location(param) {
            Some("body") => body = Some(param_map),
            Some("formData") => form_fields.push(param_map),
            _ => parameters.push(migrate_parameter(param)),
        }
    }

    let request_body = if let Some(param) = body {
        Some(body_request(param, &or_json(consumes)))
    } else if let Some(name) = body_ref {
        let mut reference = Mapping::new();
        reference.insert(
            "$ref".into(),
            format!("#/components/requestBodies/{name}").into(),
        );
        Some(reference)
    } else if !form_fields.is_empty() {
        Some(form_request(&form_fields, &consumes))
    } else {
        None
    };

    let mut out = Mapping::new();
    let mut body_written = false;
    for (key, value) in op {
        match key.as_str() {
            Some("consumes" | "produces") => {}
            Some("parameters") => {
                if !parameters.is_empty() {
                    out.insert(key.clone(), Value::Sequence(parameters.clone()));
                }
                if let Some(ref rb) = request_body {
                    out.insert("requestBody".into(), Value::Mapping(rb.clone()));
                    body_written = true;
                }
            }
            Some("responses") => {
                out.insert(key.clone(), Value::Mapping(migrate_responses(value, &produces)?));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    if let (Some(rb), false) = (request_body, body_written) {
        out.insert("requestBody".into(), Value::Mapping(rb));
    }
    Ok(out)
}

fn reusable_body_name<'a>(reference: &'a str, ctx: &ContentContext) -> Option<&'a str> {
    let name = reference.strip_prefix("#/parameters/")?;
    ctx.body_parameters.contains(name).then_some(name)
}

fn reusable_form_field<'c>(reference: &str, ctx: &'c ContentContext) -> Option<&'c Mapping> {
    let name = reference.strip_prefix("#/parameters/")?;
    ctx.form_parameters.get(name)
}

/// Move type keywords of a non-body parameter under `schema`.
pub fn migrate_parameter(param: &Value) -> Value {
    let Some(map) = param.as_mapping() else {
        return param.clone();
    };
    if map.contains_key("$ref") || map.contains_key("schema") {
        return param.clone();
    }

    let mut out = Mapping::new();
    let mut schema = Mapping::new();
    let mut collection_format = None;
    for (key, value) in map {
        match key.as_str() {
            Some("collectionFormat") => collection_format = value.as_str(),
            Some("items") => {
                schema.insert(key.clone(), strip_collection_format(value));
            }
            Some(k) if SCHEMA_KEYWORDS.contains(&k) => {
                schema.insert(key.clone(), value.clone());
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    match collection_format {
        Some("multi") => {
            out.insert("style".into(), "form".into());
            out.insert("explode".into(), true.into());
        }
        Some("ssv") => {
            out.insert("style".into(), "spaceDelimited".into());
        }
        Some("pipes") => {
            out.insert("style".into(), "pipeDelimited".into());
        }
        Some("csv") if location(param) == Some("query") => {
            out.insert("explode".into(), false.into());
        }
        _ => {}
    }

    if !schema.is_empty() {
        out.insert("schema".into(), Value::Mapping(schema));
    }
    Value::Mapping(out)
}

fn strip_collection_format(items: &Value) -> Value {
    match items.as_mapping() {
        Some(map) => Value::Mapping(
            map.iter()
                .filter(|(k, _)| k.as_str() != Some("collectionFormat"))
                .map(|(k, v)| (k.clone(), strip_collection_format_nested(k, v)))
                .collect(),
        ),
        None => items.clone(),
    }
}

fn strip_collection_format_nested(key: &Value, value: &Value) -> Value {
    if key.as_str() == Some("items") {
        strip_collection_format(value)
    } else {
        value.clone()
    }
}

/// The schema used for multipart uploads: the original body schema cannot
/// describe a file part.
pub fn multipart_schema() -> Value {
    let mut file = Mapping::new();
    file.insert("type".into(), "string".into());
    file.insert("format".into(), "binary".into());
    let mut properties = Mapping::new();
    properties.insert("file".into(), Value::Mapping(file));
    let mut schema = Mapping::new();
    schema.insert("type".into(), "object".into());
    schema.insert("properties".into(), Value::Mapping(properties));
    Value::Mapping(schema)
}

/// Build a `requestBody` from a legacy `in: body` parameter.
pub fn body_request(param: &Mapping, types: &[String]) -> Mapping {
    let schema = param
        .get("schema")
        .cloned()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()));

    let mut content = Mapping::new();
    for media_type in types {
        let media_schema = if media_type == MULTIPART_FORM {
            multipart_schema()
        } else {
            schema.clone()
        };
        let mut entry = Mapping::new();
        entry.insert("schema".into(), media_schema);
        content.insert(media_type.as_str().into(), Value::Mapping(entry));
    }

    let mut body = Mapping::new();
    if let Some(description) = param.get("description") {
        body.insert("description".into(), description.clone());
    }
    body.insert("content".into(), Value::Mapping(content));
    if let Some(required) = param.get("required") {
        body.insert("required".into(), required.clone());
    }
    if let Some(name) = param.get("name") {
        body.insert("x-codegen-request-body-name".into(), name.clone());
    }
    body
}

/// Fold legacy `formData` parameters into one object-schema request body.
fn form_request(fields: &[&Mapping], consumes: &[String]) -> Mapping {
    let has_file = fields
        .iter()
        .any(|f| f.get("type").and_then(Value::as_str) == Some("file"));

    let mut properties = Mapping::new();
    let mut required = Vec::new();
    for field in fields {
        let Some(name) = field.get("name") else {
            continue;
        };
        let field_schema = if field.get("type").and_then(Value::as_str) == Some("file") {
            let mut file = Mapping::new();
            file.insert("type".into(), "string".into());
            file.insert("format".into(), "binary".into());
            Value::Mapping(file)
        } else {
            migrate_parameter(&Value::Mapping((*field).clone()))
                .get("schema")
                .cloned()
                .unwrap_or_else(|| Value::Mapping(Mapping::new()))
        };
        let field_schema = match (field.get("description"), field_schema) {
            (Some(description), Value::Mapping(mut s)) => {
                s.insert("description".into(), description.clone());
                Value::Mapping(s)
            }
            (_, s) => s,
        };
        properties.insert(name.clone(), field_schema);
        if field.get("required").and_then(Value::as_bool) == Some(true) {
            required.push(name.clone());
        }
    }

    let mut schema = Mapping::new();
    schema.insert("type".into(), "object".into());
    schema.insert("properties".into(), Value::Mapping(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Sequence(required));
    }

    let mut types: Vec<&str> = consumes
        .iter()
        .map(String::as_str)
        .filter(|t| *t == MULTIPART_FORM || *t == URLENCODED_FORM)
        .collect();
    if types.is_empty() {
        types.push(if has_file { MULTIPART_FORM } else { URLENCODED_FORM });
    }

    let mut content = Mapping::new();
    for media_type in types {
        let mut entry = Mapping::new();
        entry.insert("schema".into(), Value::Mapping(schema.clone()));
        content.insert(media_type.into(), Value::Mapping(entry));
    }
    let mut body = Mapping::new();
    body.insert("content".into(), Value::Mapping(content));
    body
}

fn migrate_responses(responses: &Value, produces: &[String]) -> Result<Mapping, SpecError> {
    let responses = match responses {
        Value::Mapping(m) => m,
        Value::Null => return Ok(Mapping::new()),
        other => {
            return Err(SpecError::Conversion(format!(
                "responses must be a mapping, found {}",
                value_kind(other)
            )));
        }
    };
    let produces = or_json(produces.to_vec());
    Ok(responses
        .iter()
        .map(|(status, response)| (status_key(status), migrate_response(response, &produces)))
        .collect())
}

/// Status codes written unquoted in YAML come back as numbers.
fn status_key(status: &Value) -> Value {
    match status {
        Value::Number(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

/// Move a response's inline `schema` into a `content` map keyed by every
/// produced media type. Responses without a schema are copied as-is apart
/// from their headers.
pub fn migrate_response(response: &Value, produces: &[String]) -> Value {
    let Some(map) = response.as_mapping() else {
        return response.clone();
    };
    if map.contains_key("$ref") {
        return response.clone();
    }

    let examples = map.get("examples").and_then(Value::as_mapping);
    let mut out = Mapping::new();
    if !map.contains_key("description") {
        out.insert("description".into(), "".into());
    }
    for (key, value) in map {
        match key.as_str() {
            Some("schema") => {
                let mut content = Mapping::new();
                for media_type in produces {
                    let mut entry = Mapping::new();
                    entry.insert("schema".into(), value.clone());
                    if let Some(example) = examples.and_then(|e| e.get(media_type.as_str())) {
                        entry.insert("example".into(), example.clone());
                    }
                    content.insert(media_type.as_str().into(), Value::Mapping(entry));
                }
                out.insert("content".into(), Value::Mapping(content));
            }
            Some("examples") => {}
            Some("headers") => {
                out.insert(key.clone(), migrate_headers(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Mapping(out)
}

fn migrate_headers(headers: &Value) -> Value {
    let Some(map) = headers.as_mapping() else {
        return headers.clone();
    };
    Value::Mapping(
        map.iter()
            .map(|(name, header)| {
                let mut migrated = migrate_parameter(header);
                if let Value::Mapping(ref mut m) = migrated {
                    m.shift_remove("name");
                    m.shift_remove("in");
                }
                (name.clone(), migrated)
            })
            .collect(),
    )
}

/// Relocate reusable parameters: body ones become `requestBodies`, form ones
/// are dropped (operations fold them into their own form body), the rest are
/// migrated in place. Returns `(parameters, requestBodies)`.
pub fn migrate_reusable_parameters(
    params: &Mapping,
    ctx: &ContentContext,
) -> (Mapping, Mapping) {
    let mut parameters = Mapping::new();
    let mut bodies = Mapping::new();
    let consumes = or_json(ctx.consumes.clone());
    for (name, param) in params {
        match (location(param), param.as_mapping()) {
            (Some("body"), Some(map)) => {
                bodies.insert(name.clone(), Value::Mapping(body_request(map, &consumes)));
            }
            (Some("formData"), _) => {
                log::debug!(
                    "reusable form parameter {} folded into referencing operations",
                    name.as_str().unwrap_or("?")
                );
            }
            _ => {
                parameters.insert(name.clone(), migrate_parameter(param));
            }
        }
    }
    (parameters, bodies)
}

/// Rewrite reusable responses against the document-level `produces`.
pub fn migrate_reusable_responses(responses: &Mapping, ctx: &ContentContext) -> Mapping {
    let produces = or_json(ctx.produces.clone());
    responses
        .iter()
        .map(|(name, response)| (name.clone(), migrate_response(response, &produces)))
        .collect()
}
