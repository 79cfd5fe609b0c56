//! Behavioural guarantees of the variable engine

use jsonvars_core::{Element, Error, VariablesProcessor};
use proptest::prelude::*;
use serde_json::{Value, json};

mod round_trip {
    use super::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_-]{0,8}"
    }

    fn dotted_path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("."))
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z ]{0,12}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn test_assign_then_get(path in dotted_path(), value in leaf()) {
            let processor = VariablesProcessor::new();
            let ctx = processor.root_context();
            ctx.assign_variable(&path, value.clone()).unwrap();

            prop_assert!(ctx.has_variable(&path));
            prop_assert_eq!(ctx.get_variable(&path).unwrap().raw_value(), value.clone());
            prop_assert!(ctx.has_variable(&path.to_uppercase()));
        }

        #[test]
        fn test_every_prefix_is_vivified(path in dotted_path()) {
            let processor = VariablesProcessor::new();
            let ctx = processor.root_context();
            ctx.assign_variable(&path, 1).unwrap();

            let segments: Vec<&str> = path.split('.').collect();
            for end in 1..=segments.len() {
                let prefix = segments[..end].join(".");
                prop_assert!(ctx.has_variable(&prefix), "missing prefix {}", prefix);
            }
        }
    }
}

#[test]
fn test_auto_vivification() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a.b.c", 1).unwrap();

    assert!(ctx.has_variable("a"));
    assert!(ctx.has_variable("a.b"));
    assert!(ctx.has_variable("a.b.c"));
    assert_eq!(ctx.get_child_variable_names("a"), vec!["b"]);
    assert_eq!(ctx.get_variable("a.b").unwrap(), json!({"c": 1}));
}

#[test]
fn test_live_mirroring_without_rewrap() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("x", 1).unwrap();

    let wrapped = processor.wrap(json!({"y": "{x}"}));
    let y = wrapped.get("y").unwrap().unwrap();
    assert_eq!(y.as_string().unwrap(), "1");

    ctx.assign_variable("x", 2).unwrap();
    assert_eq!(y.as_string().unwrap(), "2");
}

#[test]
fn test_whole_value_keeps_type() {
    let processor = VariablesProcessor::new();
    processor.root_context().assign_variable("n", 42).unwrap();

    let field = processor.wrap("{n}");
    assert!(field.is_number());
    assert!(!field.is_string());
    assert_eq!(field.as_i64().unwrap(), 42);
}

#[test]
fn test_whole_value_object_and_array() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("db", json!({"host": "h", "port": 5432})).unwrap();
    ctx.assign_variable("tags", json!(["a", "b"])).unwrap();
    ctx.assign_variable("debug", true).unwrap();

    let db = processor.wrap("{db}");
    assert!(db.is_object());
    assert_eq!(db.get("port").unwrap().unwrap().as_i64().unwrap(), 5432);

    let tags = processor.wrap("{tags}");
    assert!(tags.is_array());
    assert_eq!(tags.as_array().unwrap().len(), 2);

    assert!(processor.wrap("{debug}").as_bool().unwrap());
}

#[test]
fn test_cycle_is_detected() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a", processor.wrap("{b}")).unwrap();
    ctx.assign_variable("b", processor.wrap("{a}")).unwrap();

    for name in ["a", "b"] {
        let value = ctx.get_variable(name).unwrap();
        let err = value.resolved().unwrap_err();
        assert!(
            matches!(err, Error::CycleDetected { .. }),
            "expected CycleDetected reading {}, got {:?}",
            name,
            err
        );
        assert!(value.as_string().is_err());
    }
}

#[test]
fn test_cyclic_value_matches_no_kind() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a", "{b}").unwrap();
    ctx.assign_variable("b", "{a}").unwrap();

    let value = processor.wrap("{a}");
    assert!(!value.is_string());
    assert!(!value.is_number());
    assert!(!value.is_object());
    assert!(!value.is_null());
    match value.kind().unwrap_err() {
        Error::CycleDetected { chain, .. } => assert_eq!(chain, vec!["a", "b", "a"]),
        other => panic!("expected CycleDetected, got {:?}", other),
    }
}

#[test]
fn test_whole_float_reads_as_integer() {
    let processor = VariablesProcessor::new();
    processor.root_context().assign_variable("n", 42.0).unwrap();
    assert_eq!(processor.wrap("{n}").as_i64().unwrap(), 42);
}

#[test]
fn test_self_reference_is_a_cycle() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a", "{a}").unwrap();

    let err = processor.wrap("{a}").resolved().unwrap_err();
    match err {
        Error::CycleDetected { name, chain } => {
            assert_eq!(name, "a");
            assert_eq!(chain, vec!["a", "a"]);
        }
        other => panic!("expected CycleDetected, got {:?}", other),
    }
}

#[test]
fn test_inline_cycle_is_detected() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a", "x-{b}").unwrap();
    ctx.assign_variable("b", "y-{a}").unwrap();

    let err = processor.wrap("{a}").as_string().unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
}

#[test]
fn test_cycle_through_object_is_detected() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a", json!({"self": "{a}"})).unwrap();

    let wrapped = processor.wrap("{a}");
    assert!(wrapped.is_object());
    assert!(matches!(
        wrapped.to_value().unwrap_err(),
        Error::CycleDetected { .. }
    ));
    assert!(matches!(
        processor.resolve_str("value: {a}").unwrap_err(),
        Error::CycleDetected { .. }
    ));
}

#[test]
fn test_unknown_reference_is_literal() {
    let processor = VariablesProcessor::new();
    let field = processor.wrap("{missing}");
    assert_eq!(field.as_string().unwrap(), "{missing}");
    assert!(field.is_string());
}

#[test]
fn test_removal_cascades() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("a.b.c", 1).unwrap();

    assert!(ctx.remove_variable("a").is_some());

    assert!(!ctx.has_variable("a"));
    assert!(!ctx.has_variable("a.b"));
    assert!(!ctx.has_variable("a.b.c"));
    assert!(ctx.remove_variable("a").is_none());
}

#[test]
fn test_import_context_is_a_snapshot() {
    let processor = VariablesProcessor::new();
    let source = processor.create_context();
    let destination = processor.create_context();
    source.assign_variable("server.port", 80).unwrap();

    destination.import_context("", &source).unwrap();

    source.assign_variable("server.port", 81).unwrap();
    assert_eq!(destination.get_variable("server.port").unwrap(), json!(80));

    destination.assign_variable("server.port", 82).unwrap();
    destination.assign_variable("server.host", "h").unwrap();
    assert_eq!(source.get_variable("server.port").unwrap(), json!(81));
    assert!(!source.has_variable("server.host"));
    assert_eq!(source.get_variable("server").unwrap(), json!({"port": 81}));
}

#[test]
fn test_absent_differs_from_null() {
    let processor = VariablesProcessor::new();
    let ctx = processor.root_context();
    ctx.assign_variable("nothing", Value::Null).unwrap();

    assert!(ctx.has_variable("nothing"));
    assert_eq!(ctx.get_variable("nothing"), Some(Element::Null));
    assert!(!ctx.has_variable("absent"));
    assert_eq!(ctx.get_variable("absent"), None);
}
