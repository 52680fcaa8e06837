use serde_yaml_ng::{Mapping, Value};

/// Convert legacy `securityDefinitions` into new-dialect `securitySchemes`.
pub fn convert_schemes(definitions: &Mapping) -> Mapping {
    definitions
        .iter()
        .map(|(name, scheme)| (name.clone(), convert_scheme(scheme)))
        .collect()
}

/// `basic` becomes an HTTP scheme, `oauth2` gets a `flows` object, anything
/// else (`apiKey`, unknown kinds) is copied through.
pub fn convert_scheme(scheme: &Value) -> Value {
    let Some(map) = scheme.as_mapping() else {
        return scheme.clone();
    };
    match map.get("type").and_then(Value::as_str) {
        Some("basic") => {
            let mut out = Mapping::new();
            out.insert("type".into(), "http".into());
            out.insert("scheme".into(), "basic".into());
            copy_keys(map, &mut out, |k| k == "description" || k.starts_with("x-"));
            Value::Mapping(out)
        }
        Some("oauth2") => Value::Mapping(convert_oauth2(map)),
        _ => scheme.clone(),
    }
}

fn convert_oauth2(map: &Mapping) -> Mapping {
    let mut out = Mapping::new();
    out.insert("type".into(), "oauth2".into());
    copy_keys(map, &mut out, |k| k == "description");

    let flow_name = match map.get("flow").and_then(Value::as_str) {
        Some("implicit") => "implicit",
        Some("password") => "password",
        Some("application") => "clientCredentials",
        Some("accessCode") => "authorizationCode",
        other => {
            log::warn!("unknown oauth2 flow {other:?}, defaulting to implicit");
            "implicit"
        }
    };

    let mut flow = Mapping::new();
    if matches!(flow_name, "implicit" | "authorizationCode") {
        if let Some(url) = map.get("authorizationUrl") {
            flow.insert("authorizationUrl".into(), url.clone());
        }
    }
    if matches!(
        flow_name,
        "password" | "clientCredentials" | "authorizationCode"
    ) {
        if let Some(url) = map.get("tokenUrl") {
            flow.insert("tokenUrl".into(), url.clone());
        }
    }
    let scopes = map
        .get("scopes")
        .cloned()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()));
    flow.insert("scopes".into(), scopes);

    let mut flows = Mapping::new();
    flows.insert(flow_name.into(), Value::Mapping(flow));
    out.insert("flows".into(), Value::Mapping(flows));
    copy_keys(map, &mut out, |k| k.starts_with("x-"));
    out
}

fn copy_keys(from: &Mapping, to: &mut Mapping, keep: impl Fn(&str) -> bool) {
    for (key, value) in from {
        if key.as_str().is_some_and(&keep) {
            to.insert(key.clone(), value.clone());
        }
    }
}
