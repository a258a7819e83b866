//! Collection workflow integration tests
//!
//! Globals, an environment and request-local values layered together, used to
//! resolve a request's URL, headers and body.

use rest_collection::config::load_config;
use rest_collection::variables::{shared, SharedVariableList};
use rest_collection::{
    Header, PropertyList, TrackingOptions, Variable, VariableList, VariableScope, VariableType,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::init_test_env;

fn globals() -> SharedVariableList {
    let list = VariableList::from_json(&json!([
        {"key": "scheme", "value": "https"},
        {"key": "host", "value": "api.example.com"},
        {"key": "timeout", "value": "30", "type": "number"}
    ]))
    .expect("valid globals");
    shared(list)
}

#[test]
fn test_request_resolved_through_layers() {
    init_test_env();

    let globals = globals();
    let environment = VariableScope::from_json(&json!({
        "name": "staging",
        "values": [
            {"key": "host", "value": "staging.example.com"},
            {"key": "token", "value": "abc123"}
        ]
    }))
    .expect("valid environment")
    .with_layer(Arc::clone(&globals));

    let mut local = VariableScope::new()
        .with_layers(vec![environment.share(), Arc::clone(&globals)]);
    local.set("userId", 42, None);

    let url = local.replace("{{scheme}}://{{host}}/users/{{userId}}?t={{timeout}}");
    assert_eq!(url, "https://staging.example.com/users/42?t=30");

    let mut headers: PropertyList<Header> = PropertyList::new();
    headers.populate_str("Authorization: Bearer {{token}}\nAccept: application/json\nX-Trace: {{missing}}");

    let resolved: Vec<String> = headers
        .iter()
        .map(|header| local.replace(&header.to_string()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            "Authorization: Bearer abc123",
            "Accept: application/json",
            "X-Trace: {{missing}}"
        ]
    );

    let body = local.substitute(&json!({"owner": "{{userId}}", "meta": {"env": "{{host}}"}}));
    assert_eq!(body, json!({"owner": "42", "meta": {"env": "staging.example.com"}}));
}

#[test]
fn test_layer_updates_seen_by_dependent_scopes() {
    init_test_env();

    let globals = globals();
    let scope = VariableScope::new().with_layer(Arc::clone(&globals));
    assert_eq!(scope.get("timeout"), Some(json!(30)));

    globals
        .write()
        .expect("lock")
        .set_variable("timeout", json!("45"), None);

    assert_eq!(scope.get("timeout"), Some(json!(45)));
    assert_eq!(scope.to_object().get("timeout"), Some(&json!(45)));
    assert!(scope.variables().is_empty());
}

#[test]
fn test_headers_keep_order_and_duplicates() {
    init_test_env();

    let mut headers: PropertyList<Header> = PropertyList::new();
    headers.append(Header::new("Accept", "text/html"));
    headers.append(Header::new("Set-Cookie", "a=1"));
    headers.append(Header::new("set-cookie", "b=2"));
    headers.insert(Header::new("Host", "example.com"), Some("ACCEPT"));

    assert_eq!(
        headers.map(|header| header.key.clone()),
        vec!["Host", "Accept", "Set-Cookie", "set-cookie"]
    );
    assert_eq!(headers.all("SET-COOKIE").len(), 2);
    assert_eq!(
        Value::Object(headers.to_object(true, false, true)),
        json!({"host": "example.com", "accept": "text/html", "set-cookie": ["a=1", "b=2"]})
    );

    let removed = headers.remove("Set-Cookie");
    assert_eq!(removed.len(), 2);
    assert_eq!(headers.count(), 2);
}

#[test]
fn test_environment_persisted_and_restored() {
    init_test_env();

    let config = load_config(Some(json!({
        "collection": {"tracking": {"autoCompact": true}}
    })))
    .expect("valid config");

    let mut environment = VariableScope::from(vec![
        Variable::with_type("page", 1, VariableType::Number),
        Variable::new("cursor", Value::Null),
    ]);
    environment.id = Some("env-1".to_string());
    environment.enable_tracking(config.tracking);

    for page in 2..=5 {
        environment.set("page", page, None);
    }
    environment.set("cursor", "c-5", None);
    environment.unset("cursor");

    let saved = environment.to_json().expect("serializable");
    assert_eq!(saved["mutations"]["autoCompact"], json!(true));
    assert_eq!(
        saved["mutations"]["stream"],
        json!([["set", "page", 5], ["unset", "cursor"]])
    );

    let restored = VariableScope::from_json(&saved).expect("restorable");
    assert_eq!(restored.id.as_deref(), Some("env-1"));
    assert_eq!(restored.get("page"), Some(json!(5)));
    assert!(!restored.has("cursor"));
    assert_eq!(restored.to_json().expect("serializable"), saved);
}

#[test]
fn test_mutations_replayed_onto_fresh_scope() {
    init_test_env();

    let mut source = VariableScope::from(vec![Variable::new("keep", "x")]);
    source.enable_tracking(TrackingOptions::default());
    source.set("a", "1", Some(VariableType::Number));
    source.set("b", true, None);
    source.set("a", "2", None);
    source.unset("keep");

    let mut replica = VariableScope::from(vec![Variable::new("keep", "x")]);
    let log = source.mutations().expect("tracking enabled");
    log.apply_on(&mut replica);

    assert_eq!(replica.to_object(), source.to_object());
    assert!(replica.mutations().is_none());
}

#[test]
fn test_sync_from_plain_object() {
    init_test_env();

    let mut scope = VariableScope::from(vec![
        Variable::with_type("count", 0, VariableType::Number),
        Variable::new("obsolete", 1),
    ]);

    let incoming = json!({"count": "12", "added": [1, 2]});
    let report = scope
        .sync_variables_from(incoming.as_object().expect("object"), true)
        .expect("report requested");

    assert_eq!(report.created, vec!["added"]);
    assert_eq!(report.deleted, vec!["obsolete"]);
    assert_eq!(scope.get("count"), Some(json!(12)));
    assert_eq!(scope.replace("{{added}}"), "{{added}}");
}
