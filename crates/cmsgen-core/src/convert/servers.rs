use serde_yaml_ng::{Mapping, Value};

use crate::document::string_list;

/// Build the new-dialect `servers` list from legacy connection metadata.
///
/// - `host` present: one absolute URL per scheme (`https` when none declared).
/// - only `basePath` present: a single relative URL.
/// - neither: `None`, the document stays host-relative.
pub fn build_servers(root: &Mapping) -> Option<Vec<Value>> {
    let host = root
        .get("host")
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty());
    let base_path = root
        .get("basePath")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty());

    let urls = match (host, base_path) {
        (Some(host), base) => {
            let base = base.unwrap_or("");
            let schemes = string_list(root.get("schemes"))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| vec!["https".to_string()]);
            schemes
                .iter()
                .map(|scheme| format!("{scheme}://{host}{base}"))
                .collect()
        }
        (None, Some(base)) => vec![base.to_string()],
        (None, None) => return None,
    };

    Some(urls.into_iter().map(server_entry).collect())
}

fn server_entry(url: String) -> Value {
    let mut entry = Mapping::new();
    entry.insert("url".into(), url.into());
    Value::Mapping(entry)
}
