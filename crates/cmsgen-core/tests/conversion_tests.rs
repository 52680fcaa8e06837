use cmsgen_core::convert::content::MULTIPART_FORM;
use cmsgen_core::convert::refs::{LEGACY_SCHEMA_PREFIX, NEW_SCHEMA_PREFIX, collect_refs};
use cmsgen_core::document::string_list;
use cmsgen_core::{SpecDocument, complete, convert};
use serde_yaml_ng::Value;

const CORE: &str = include_str!("fixtures/core-legacy.yaml");
const UPLOAD: &str = include_str!("fixtures/upload-legacy.yaml");
const RELATIVE: &str = include_str!("fixtures/relative-legacy.yaml");
const REUSABLE: &str = include_str!("fixtures/reusable-legacy.yaml");

fn string_list_of(value: Option<&Value>) -> Vec<String> {
    string_list(value).unwrap_or_default()
}

fn completed(source: &str, module: &str) -> SpecDocument {
    let doc = SpecDocument::from_yaml_str(source).unwrap();
    complete(&doc, module).unwrap()
}

fn converted(source: &str, module: &str) -> SpecDocument {
    convert(&completed(source, module)).unwrap().document
}

/// Every `#/components/<section>/<name>` reference must name an entry that
/// exists in the converted document.
fn assert_refs_resolve(doc: &SpecDocument, module: &str) {
    let components = doc.get("components");
    for r in collect_refs(&Value::Mapping(doc.root().clone())) {
        let Some(target) = r.strip_prefix("#/components/") else {
            panic!("{module}: reference outside components: {r}");
        };
        let (section, name) = target.split_once('/').unwrap();
        let found = components
            .and_then(|c| c.get(section))
            .and_then(|s| s.get(name))
            .is_some();
        assert!(found, "{module}: dangling reference {r}");
    }
}

#[test]
fn every_reference_resolves() {
    for (source, module) in [
        (CORE, "core"),
        (UPLOAD, "upload"),
        (RELATIVE, "search"),
        (REUSABLE, "nodes"),
    ] {
        assert_refs_resolve(&converted(source, module), module);
    }
}

#[test]
fn path_level_reusable_body_becomes_request_body() {
    let doc = converted(REUSABLE, "nodes");
    let item = &doc.get("paths").unwrap()["/nodes/{nodeId}/children"];

    let shared: Vec<_> = item["parameters"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|p| p["$ref"].as_str())
        .collect();
    assert_eq!(
        shared,
        vec![
            "#/components/parameters/nodeIdParam",
            "#/components/parameters/includeParam"
        ]
    );

    let post = &item["post"];
    assert_eq!(
        post["requestBody"]["$ref"].as_str(),
        Some("#/components/requestBodies/nodeBodyCreate")
    );
    assert!(post.get("parameters").is_none());

    let get = &doc.get("paths").unwrap()["/nodes/{nodeId}/parents"]["get"];
    assert!(get.get("requestBody").is_none());
    let own: Vec<_> = get["parameters"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(|p| p["$ref"].as_str())
        .collect();
    assert_eq!(
        own,
        vec![
            "#/components/parameters/skipCountParam",
            "#/components/parameters/fieldsParam"
        ]
    );
}

#[test]
fn reusable_form_parameter_is_folded_into_operation() {
    let conversion = convert(&completed(REUSABLE, "nodes")).unwrap();
    assert!(conversion.warnings.is_empty(), "{:?}", conversion.warnings);
    let doc = conversion.document;

    let components = doc.get("components").unwrap();
    assert!(components["parameters"].get("fileDataParam").is_none());
    assert!(components["parameters"].get("skipCountParam").is_some());
    assert!(components["requestBodies"].get("nodeBodyCreate").is_some());

    let post = &doc.get("paths").unwrap()["/nodes/{nodeId}/upload"]["post"];
    let params = post["parameters"].as_sequence().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(
        params[0]["$ref"].as_str(),
        Some("#/components/parameters/nodeIdParam")
    );

    let content = &post["requestBody"]["content"];
    let types: Vec<_> = content
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(types, vec![MULTIPART_FORM]);
    let schema = &content[MULTIPART_FORM]["schema"];
    assert_eq!(schema["properties"]["filedata"]["type"].as_str(), Some("string"));
    assert_eq!(schema["properties"]["filedata"]["format"].as_str(), Some("binary"));
    assert_eq!(
        schema["properties"]["filedata"]["description"].as_str(),
        Some("The content being uploaded.")
    );
    assert_eq!(schema["properties"]["name"]["type"].as_str(), Some("string"));
    assert_eq!(string_list_of(schema.get("required")), vec!["filedata"]);
}

#[test]
fn no_reference_points_at_legacy_definitions() {
    for (source, module) in [(CORE, "core"), (UPLOAD, "upload"), (RELATIVE, "search")] {
        let doc = converted(source, module);
        let refs = collect_refs(&Value::Mapping(doc.root().clone()));
        assert!(!refs.is_empty());
        for r in refs {
            assert!(!r.contains(LEGACY_SCHEMA_PREFIX), "{module}: stale reference {r}");
            assert!(r.starts_with(NEW_SCHEMA_PREFIX), "{module}: unexpected reference {r}");
        }
        assert!(doc.get("definitions").is_none());
    }
}

#[test]
fn json_body_post_end_to_end() {
    let legacy = SpecDocument::from_yaml_str(CORE).unwrap();
    let doc = converted(CORE, "core");

    assert_eq!(doc.get("openapi").and_then(Value::as_str), Some("3.0.3"));
    assert!(doc.get("swagger").is_none());
    assert!(doc.get("consumes").is_none());

    let post = &doc.get("paths").unwrap()["/tags"]["post"];
    assert!(post.get("parameters").is_none(), "body parameter was not removed");
    assert!(post.get("consumes").is_none());

    let original_schema = &legacy.get("paths").unwrap()["/tags"]["post"]["parameters"][0]["schema"];
    let mut expected = original_schema.clone();
    if let Value::Mapping(ref mut m) = expected {
        m.insert("$ref".into(), "#/components/schemas/TagBody".into());
    }
    assert_eq!(
        post["requestBody"]["content"]["application/json"]["schema"],
        expected
    );
    assert_eq!(post["requestBody"]["required"].as_bool(), Some(true));
    assert_eq!(
        post["requestBody"]["description"].as_str(),
        Some("The new tag.")
    );

    let schemas = doc.get("components").unwrap()["schemas"].as_mapping().unwrap();
    let names: Vec<_> = schemas.keys().filter_map(Value::as_str).collect();
    assert_eq!(names, vec!["TagBody", "TagPaging", "Error"]);
}

#[test]
fn request_body_content_matches_declared_types() {
    for (source, module) in [(CORE, "core"), (UPLOAD, "upload"), (RELATIVE, "search")] {
        let legacy = completed(source, module);
        let global = string_list_of(legacy.get("consumes"));
        let doc = converted(source, module);

        for (path, method, op) in legacy.operations() {
            let params = op.get("parameters").and_then(Value::as_sequence);
            let has_body = params
                .is_some_and(|ps| ps.iter().any(|p| p["in"].as_str() == Some("body")));
            if !has_body {
                continue;
            }
            let declared = op
                .get("consumes")
                .map(|c| string_list_of(Some(c)))
                .unwrap_or_else(|| global.clone());
            assert!(!declared.is_empty());

            let new_op = &doc.get("paths").unwrap()[path][method];
            if let Some(new_params) = new_op.get("parameters").and_then(Value::as_sequence) {
                assert!(
                    new_params.iter().all(|p| p["in"].as_str() != Some("body")),
                    "{method} {path} kept a body parameter"
                );
            }
            let keys: Vec<String> = new_op["requestBody"]["content"]
                .as_mapping()
                .unwrap()
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect();
            assert_eq!(keys, declared, "{method} {path}");
        }
    }
}

#[test]
fn multipart_payload_gets_single_binary_field() {
    let doc = converted(UPLOAD, "upload");
    let post = &doc.get("paths").unwrap()["/nodes/{nodeId}/children"]["post"];
    let schema = &post["requestBody"]["content"][MULTIPART_FORM]["schema"];
    assert_eq!(schema["type"].as_str(), Some("object"));
    let properties = schema["properties"].as_mapping().unwrap();
    assert_eq!(properties.len(), 1);
    let (_, field) = properties.iter().next().unwrap();
    assert_eq!(field["type"].as_str(), Some("string"));
    assert_eq!(field["format"].as_str(), Some("binary"));

    assert_eq!(
        post["requestBody"]["content"]["application/json"]["schema"]["$ref"].as_str(),
        Some("#/components/schemas/NodeBodyCreate")
    );
}

#[test]
fn responses_move_under_content() {
    let doc = converted(UPLOAD, "upload");
    let put = &doc.get("paths").unwrap()["/nodes/{nodeId}/content"]["put"];
    assert_eq!(
        put["requestBody"]["content"]["application/octet-stream"]["schema"]["format"].as_str(),
        Some("binary")
    );
    let ok = &put["responses"]["200"];
    assert!(ok.get("schema").is_none());
    assert_eq!(
        ok["content"]["application/json"]["schema"]["$ref"].as_str(),
        Some("#/components/schemas/NodeEntry")
    );
}

#[test]
fn host_relative_spec_gets_relative_server_only() {
    let doc = converted(RELATIVE, "search");
    let servers = doc.get("servers").and_then(Value::as_sequence).unwrap();
    assert_eq!(servers.len(), 1);
    let url = servers[0]["url"].as_str().unwrap();
    assert!(url.starts_with('/'), "server url {url} is not relative");
    assert!(!url.contains("://"));
}

#[test]
fn spec_without_connection_metadata_has_no_servers() {
    let source = "swagger: '2.0'\ninfo: {title: Auth, version: '1'}\npaths: {}\n";
    let doc = converted(source, "auth");
    assert!(doc.get("servers").is_none());
}

#[test]
fn absolute_servers_per_scheme() {
    let doc = converted(CORE, "core");
    let urls: Vec<_> = doc
        .get("servers")
        .and_then(Value::as_sequence)
        .unwrap()
        .iter()
        .filter_map(|s| s["url"].as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:8080/alfresco/api/-default-/public/alfresco/versions/1",
            "https://localhost:8080/alfresco/api/-default-/public/alfresco/versions/1",
        ]
    );
}

#[test]
fn security_and_payload_lists_are_preserved() {
    let doc = converted(CORE, "core");
    assert_eq!(
        doc.get("security").unwrap()[0]["basicAuth"].as_sequence().map(Vec::len),
        Some(0)
    );
    let scheme = &doc.get("components").unwrap()["securitySchemes"]["basicAuth"];
    assert_eq!(scheme["type"].as_str(), Some("http"));
    assert_eq!(scheme["scheme"].as_str(), Some("basic"));
    assert_eq!(
        string_list_of(doc.get("x-original-consumes")),
        vec!["application/json"]
    );
    assert_eq!(
        string_list_of(doc.get("x-original-produces")),
        vec!["application/json"]
    );
}

#[test]
fn query_parameters_gain_schemas() {
    let doc = converted(CORE, "core");
    let params = doc.get("paths").unwrap()["/tags"]["get"]["parameters"]
        .as_sequence()
        .unwrap()
        .clone();
    assert_eq!(params[0]["schema"]["type"].as_str(), Some("integer"));
    assert_eq!(params[0]["schema"]["default"].as_i64(), Some(0));
    assert!(params[0].get("type").is_none());
    assert_eq!(params[1]["schema"]["items"]["type"].as_str(), Some("string"));
    assert_eq!(params[1]["explode"].as_bool(), Some(false));
}

#[test]
fn converted_document_is_stable_across_runs() {
    let first = converted(CORE, "core").to_yaml_string().unwrap();
    let second = converted(CORE, "core").to_yaml_string().unwrap();
    assert_eq!(first, second);
    assert!(first.starts_with("openapi:"));
    assert!(first.find("\ninfo:").unwrap() < first.find("\ncomponents:").unwrap());
    assert!(first.find("\ncomponents:").unwrap() < first.find("\npaths:").unwrap());
}
