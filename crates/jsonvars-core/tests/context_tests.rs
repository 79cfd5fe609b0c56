//! Context and processor lifecycle

use jsonvars_core::{Element, Error, VariablesProcessor, load_config};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_import_object_assigns_every_leaf() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();
    let document = Element::from(json!({
        "server": {"host": "localhost", "port": 8080, "tls": {"enabled": true}},
        "tags": ["a", "b"],
        "empty": {},
    }));

    ctx.import_object("app", &document).unwrap();

    assert_eq!(
        ctx.variables(),
        vec![
            "app",
            "app.server",
            "app.server.host",
            "app.server.port",
            "app.server.tls",
            "app.server.tls.enabled",
            "app.tags",
            "app.empty",
        ]
    );
    assert_eq!(ctx.get_variable("app.tags").unwrap(), json!(["a", "b"]));
    assert_eq!(ctx.get_variable("app.empty").unwrap(), json!({}));
    assert_eq!(
        ctx.get_variable("app.server").unwrap(),
        json!({"host": "localhost", "port": 8080, "tls": {"enabled": true}})
    );
}

#[test]
fn test_import_object_base_key_trailing_dot() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();
    ctx.import_object("env.", &Element::from(json!({"name": "prod"})))
        .unwrap();
    assert_eq!(ctx.get_variable("env.name").unwrap(), json!("prod"));
}

#[test]
fn test_import_object_rejects_non_objects() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();
    let err = ctx.import_object("", &Element::from(json!([1, 2]))).unwrap_err();
    assert!(matches!(
        err,
        Error::TypeMismatch {
            expected: "object",
            found: "array"
        }
    ));
}

#[test]
fn test_import_object_with_unaddressable_key_changes_nothing() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();

    for document in [
        json!({"first": 1, "": 2, "third": 3}),
        json!({"first": 1, "tpl": {"{x}": 1}}),
        json!({"first": 1, "trailing.": 2}),
    ] {
        let err = ctx.import_object("", &Element::from(document)).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }), "got {:?}", err);
        assert!(ctx.is_empty(), "partial import left {:?}", ctx.variables());
    }
}

#[test]
fn test_import_object_reports_offending_path() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();
    let err = ctx
        .import_object("", &Element::from(json!({"tpl": {"{x}": 1}})))
        .unwrap_err();
    match err {
        Error::InvalidPath { path, .. } => assert_eq!(path, "tpl.{x}"),
        other => panic!("expected InvalidPath, got {:?}", other),
    }
}

#[test]
fn test_child_enumeration() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("db.primary.host", "a").unwrap();
    ctx.assign_variable("db.replica.host", "b").unwrap();
    ctx.assign_variable("db.Name", "main").unwrap();

    assert_eq!(
        ctx.get_child_variables("DB"),
        vec!["db.primary", "db.replica", "db.Name"]
    );
    assert_eq!(ctx.get_child_variable_names("db"), vec!["primary", "replica", "Name"]);
    assert_eq!(
        ctx.get_child_variables_recursive("db"),
        vec!["db.primary", "db.primary.host", "db.replica", "db.replica.host", "db.Name"]
    );
    assert!(ctx.get_child_variables("").is_empty());
    assert!(ctx.get_child_variables("missing").is_empty());
    assert!(ctx.get_child_variables("db.Name").is_empty());
    assert_eq!(ctx.root_names(), vec!["db"]);
}

#[test]
fn test_import_context_under_base_key() {
    let processor = VariablesProcessor::new();
    let source = processor.create_context();
    source.assign_variable("host", "h").unwrap();
    source.assign_variable("db.port", 5432).unwrap();

    let destination = processor.create_context();
    destination.import_context("remote", &source).unwrap();

    assert_eq!(
        destination.variables(),
        vec!["remote", "remote.host", "remote.db", "remote.db.port"]
    );
    assert_eq!(
        destination.get_variable("remote").unwrap(),
        json!({"host": "h", "db": {"port": 5432}})
    );
}

#[test]
fn test_duplicate_binds_to_new_processor() {
    let first = VariablesProcessor::new();
    let ctx = first.create_context();
    ctx.assign_variable("greeting", "hello {name}").unwrap();
    first.root_context().assign_variable("name", "first").unwrap();

    let second = VariablesProcessor::new();
    second.root_context().assign_variable("name", "second").unwrap();
    let copy = ctx.duplicate(&second).unwrap();

    assert!(copy.processor().unwrap().ptr_eq(&second));
    assert_eq!(
        ctx.get_variable("greeting").unwrap().as_string().unwrap(),
        "hello first"
    );
    assert_eq!(
        copy.get_variable("greeting").unwrap().as_string().unwrap(),
        "hello second"
    );

    copy.assign_variable("greeting", "bye").unwrap();
    assert_eq!(ctx.get_variable("greeting").unwrap().raw_value(), json!("hello {name}"));
}

#[test]
fn test_chain_precedence() {
    let processor = VariablesProcessor::new();
    let first = processor.create_context();
    let second = processor.create_context();
    first.assign_variable("env", "first").unwrap();
    second.assign_variable("env", "second").unwrap();
    second.assign_variable("only", "second").unwrap();
    processor.add_context(&first).unwrap();
    processor.add_context(&second).unwrap();

    let env = processor.wrap("{env}/{only}");
    assert_eq!(env.as_string().unwrap(), "first/second");

    processor.root_context().assign_variable("env", "root").unwrap();
    assert_eq!(env.as_string().unwrap(), "root/second");

    processor.root_context().remove_variable("env");
    assert!(processor.remove_context(&first));
    assert_eq!(env.as_string().unwrap(), "second/second");
    assert_eq!(processor.contexts(), vec![second]);
}

#[test]
fn test_resolution_is_by_full_path() {
    let processor = VariablesProcessor::new();
    let nested = processor.create_context();
    nested.assign_variable("outer.inner", 1).unwrap();
    processor.add_context(&nested).unwrap();

    assert!(processor.resolve_variable("outer.inner").is_some());
    assert!(processor.resolve_variable("inner").is_none());
}

#[test]
fn test_close_disposes_contexts_except_retained() {
    let processor = VariablesProcessor::new();
    let scratch = processor.create_context();
    let kept = processor.create_context();
    scratch.assign_variable("a", 1).unwrap();
    kept.assign_variable("b", 2).unwrap();
    kept.retain();
    processor.root_context().assign_variable("c", 3).unwrap();
    processor.add_context(&scratch).unwrap();
    processor.add_context(&kept).unwrap();

    processor.close();

    assert!(scratch.is_empty());
    assert!(kept.is_retained());
    assert!(kept.has_variable("b"));
    assert!(processor.root_context().is_empty());
    assert!(processor.contexts().is_empty());

    processor.close();
}

#[test]
fn test_dispose_is_idempotent() {
    let processor = VariablesProcessor::new();
    let ctx = processor.create_context();
    ctx.assign_variable("a.b", 1).unwrap();
    ctx.dispose();
    ctx.dispose();
    assert!(ctx.is_empty());
    assert!(ctx.variables().is_empty());

    ctx.assign_variable("a.c", 2).unwrap();
    assert_eq!(ctx.get_variable("a").unwrap(), json!({"c": 2}));
}

#[test]
fn test_values_survive_after_processor_drop() {
    let ctx = {
        let processor = VariablesProcessor::new();
        let ctx = processor.create_context();
        ctx.assign_variable("x", "{y}").unwrap();
        ctx
    };
    assert!(ctx.processor().is_none());
    assert_eq!(ctx.get_variable("x").unwrap().as_string().unwrap(), "{y}");
}

#[test]
fn test_loaded_config_feeds_context() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("app.json");
    std::fs::write(
        &file,
        r#"{"service": {"name": "api", "url": "http://{service.name}:{port}"}, "port": 80}"#,
    )
    .unwrap();

    let processor = VariablesProcessor::new();
    let config = load_config(&file).unwrap();
    processor.root_context().import_object("", &config).unwrap();

    let url = processor.resolve_variable("service.url").unwrap();
    assert_eq!(url.as_string().unwrap(), "http://api:80");

    let service = config.as_object().unwrap().require_object("config", "service").unwrap();
    assert_eq!(service.require_string("service", "name").unwrap(), "api");
}
