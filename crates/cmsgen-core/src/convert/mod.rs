pub mod components;
pub mod content;
pub mod refs;
pub mod security;
pub mod servers;

use serde_yaml_ng::{Mapping, Value};

use crate::document::{Dialect, NEW_MARKER, SpecDocument, value_kind};
use crate::error::SpecError;

use content::ContentContext;
use refs::rewrite_refs;

/// Dialect version written by the converter.
pub const NEW_DIALECT_VERSION: &str = "3.0.3";

/// A converted document plus the references left unrewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: SpecDocument,
    pub warnings: Vec<String>,
}

/// Convert a completed legacy document into the new dialect.
///
/// Keys are emitted in a fixed order (`openapi`, `info`, `servers`,
/// `security`, `tags`, `externalDocs`, extensions, `components`, `paths`)
/// so generated output diffs cleanly between runs.
pub fn convert(doc: &SpecDocument) -> Result<Conversion, SpecError> {
    if !matches!(doc.dialect(), Dialect::Legacy(_)) {
        return Err(SpecError::NotLegacyDialect(doc.dialect().to_string()));
    }
    let root = doc.root();
    let ctx = ContentContext::from_root(root);

    let mut out = Mapping::new();
    out.insert(NEW_MARKER.into(), NEW_DIALECT_VERSION.into());
    out.insert(
        "info".into(),
        root.get("info")
            .cloned()
            .unwrap_or_else(|| Value::Mapping(Mapping::new())),
    );

    if let Some(servers) = servers::build_servers(root) {
        out.insert("servers".into(), Value::Sequence(servers));
    }
    if let Some(security) = root.get("security") {
        out.insert("security".into(), security.clone());
    }
    for key in ["tags", "externalDocs"] {
        if let Some(value) = root.get(key) {
            out.insert(key.into(), value.clone());
        }
    }
    for (key, value) in extensions(root) {
        out.insert(key, value);
    }

    let components = components::relocate(root, &ctx)?;
    if !components.is_empty() {
        out.insert("components".into(), Value::Mapping(components));
    }

    let paths = match root.get("paths") {
        None | Some(Value::Null) => Mapping::new(),
        Some(Value::Mapping(paths)) => content::migrate_paths(paths, &ctx)?,
        Some(other) => {
            return Err(SpecError::Conversion(format!(
                "`paths` must be a mapping, found {}",
                value_kind(other)
            )));
        }
    };
    out.insert("paths".into(), Value::Mapping(paths));

    let outcome = rewrite_refs(&Value::Mapping(out));
    let Value::Mapping(rewritten) = outcome.value else {
        return Err(SpecError::Conversion(
            "reference rewrite did not return a mapping".to_string(),
        ));
    };

    log::debug!(
        "converted spec to openapi {NEW_DIALECT_VERSION} with {} unresolved references",
        outcome.unresolved.len()
    );
    Ok(Conversion {
        document: SpecDocument::new(rewritten),
        warnings: outcome.unresolved,
    })
}

/// Vendor extensions of the legacy root, then the original payload-type
/// lists, which have no document-level home in the new dialect.
fn extensions(root: &Mapping) -> Mapping {
    let mut ext: Mapping = root
        .iter()
        .filter(|(k, _)| k.as_str().is_some_and(|k| k.starts_with("x-")))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (legacy, preserved) in [
        ("consumes", "x-original-consumes"),
        ("produces", "x-original-produces"),
    ] {
        if let Some(types) = root.get(legacy) {
            ext.insert(preserved.into(), types.clone());
        }
    }
    ext
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(yaml: &str) -> SpecDocument {
        SpecDocument::from_yaml_str(yaml).unwrap()
    }

    fn top_keys(doc: &SpecDocument) -> Vec<&str> {
        doc.root().keys().filter_map(Value::as_str).collect()
    }

    #[test]
    fn test_rejects_documents_without_legacy_marker() {
        let err = convert(&legacy("openapi: 3.0.0\ninfo: {}\n")).unwrap_err();
        assert!(matches!(err, SpecError::NotLegacyDialect(_)));

        let err = convert(&legacy("info: {}\n")).unwrap_err();
        assert!(matches!(err, SpecError::NotLegacyDialect(_)));
    }

    #[test]
    fn test_key_order() {
        let converted = convert(&legacy(
            r#"
paths: {}
definitions:
  Error: {type: object}
security:
  - basicAuth: []
securityDefinitions:
  basicAuth: {type: basic}
produces: [application/json]
x-logo: cms.png
host: localhost
info: {title: Core, version: '1'}
swagger: '2.0'
"#,
        ))
        .unwrap();
        assert_eq!(
            top_keys(&converted.document),
            vec![
                "openapi",
                "info",
                "servers",
                "security",
                "x-logo",
                "x-original-produces",
                "components",
                "paths"
            ]
        );
        let components = converted.document.get("components").unwrap();
        assert_eq!(components["securitySchemes"]["basicAuth"]["type"].as_str(), Some("http"));
        assert!(components["schemas"].get("Error").is_some());
    }

    #[test]
    fn test_schema_collision_fails_fast() {
        let err = convert(&legacy(
            r#"
swagger: '2.0'
definitions:
  Node: {type: object}
components:
  schemas:
    Node: {type: string}
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, SpecError::Conversion(msg) if msg.contains("Node")));
    }

    #[test]
    fn test_unknown_refs_become_warnings() {
        let converted = convert(&legacy(
            r#"
swagger: '2.0'
paths:
  /a:
    get:
      responses:
        '200':
          description: ok
          schema:
            $ref: 'external.yaml#/Thing'
"#,
        ))
        .unwrap();
        assert_eq!(converted.warnings, vec!["external.yaml#/Thing".to_string()]);
    }

    #[test]
    fn test_reusable_sections_are_relocated() {
        let converted = convert(&legacy(
            r#"
swagger: '2.0'
consumes: [application/json]
parameters:
  skipCount:
    name: skipCount
    in: query
    type: integer
    minimum: 0
  nodeBody:
    name: nodeBody
    in: body
    schema:
      $ref: '#/definitions/Node'
responses:
  Error:
    description: error
    schema:
      $ref: '#/definitions/Error'
definitions:
  Node: {type: object}
  Error: {type: object}
paths:
  /nodes:
    post:
      parameters:
        - $ref: '#/parameters/skipCount'
        - $ref: '#/parameters/nodeBody'
      responses:
        default:
          $ref: '#/responses/Error'
"#,
        ))
        .unwrap();
        let doc = &converted.document;
        let components = doc.get("components").unwrap();
        assert_eq!(
            components["parameters"]["skipCount"]["schema"]["minimum"].as_i64(),
            Some(0)
        );
        assert_eq!(
            components["requestBodies"]["nodeBody"]["content"]["application/json"]["schema"]
                ["$ref"]
                .as_str(),
            Some("#/components/schemas/Node")
        );
        assert_eq!(
            components["responses"]["Error"]["content"]["application/json"]["schema"]["$ref"]
                .as_str(),
            Some("#/components/schemas/Error")
        );

        let post = &doc.get("paths").unwrap()["/nodes"]["post"];
        assert_eq!(
            post["parameters"][0]["$ref"].as_str(),
            Some("#/components/parameters/skipCount")
        );
        assert_eq!(
            post["requestBody"]["$ref"].as_str(),
            Some("#/components/requestBodies/nodeBody")
        );
        assert_eq!(
            post["responses"]["default"]["$ref"].as_str(),
            Some("#/components/responses/Error")
        );
    }
}
