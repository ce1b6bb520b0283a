//! Field get/set/delete against mapping and attribute roots.

use fieldmap::{Cast, CastError, CastPosition, Field, NodeKind, PathError, Record, SetCast, Value};
use proptest::prelude::*;
use serde_json::json;

fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn array_data() -> Value {
    Value::from(json!({
        "test": {"array": [[{"correct": false}], [null, {"correct": true}]]}
    }))
}

#[test]
fn test_get_nested_index() {
    let field = Field::new("test.array[1][1].correct").expect("field");
    assert_eq!(field.get(&array_data()).expect("get"), Value::Bool(true));
    assert_eq!(field.get(&array_data().into_objects()).expect("get"), Value::Bool(true));
}

#[test]
fn test_get_missing_is_lookup_error() {
    let root = Value::from(json!({"test": {"name": "Test Example"}}));
    let err = Field::new("test.age").expect("field").get(&root).unwrap_err();
    assert!(err.is_lookup());
    assert!(matches!(err, PathError::MissingKey(_)));

    let err = Field::new("test.array[3]").expect("field").get(&array_data()).unwrap_err();
    assert!(err.is_lookup());
}

#[test]
fn test_get_cast_applies_only_on_mismatch() {
    let root = Value::from(json!({"test": {"id": 41561234, "name": "x"}}));
    let id = Field::builder("test.id").get_cast(Cast::string()).build().expect("field");
    assert_eq!(id.get(&root).expect("get"), Value::from("41561234"));
    let name = Field::builder("test.name").get_cast(Cast::string()).build().expect("field");
    assert_eq!(name.get(&root).expect("get"), Value::from("x"));
    assert_eq!(name.get_ref(&root).expect("get"), &Value::from("x"));
}

#[test]
fn test_set_positional_casts_on_attribute_root() {
    setup();
    let field = Field::builder("test.user.name")
        .set_cast(vec![
            Cast::object_class("TypeA"),
            Cast::dict(),
            Cast::object_class("TypeB"),
            Cast::string(),
        ])
        .build()
        .expect("field");
    let mut root = Value::Null;
    field.bootstrap(&mut root, NodeKind::Attributes).expect("bootstrap");
    field.set(&mut root, Value::Int(7)).expect("set");

    assert_eq!(root.class(), Some("TypeA"));
    let test = root.attr("test").expect("test");
    assert!(matches!(test, Value::Map(_)));
    let user = test.key("user").expect("user");
    assert_eq!(user.class(), Some("TypeB"));
    assert_eq!(user.attr("name"), Some(&Value::from("7")));
    assert_eq!(field.get(&root).expect("get"), Value::from("7"));
}

#[test]
fn test_set_single_cast_only_touches_final_value() {
    let field = Field::builder("test.age").set_cast(Cast::int()).build().expect("field");
    let mut root = Value::map();
    field.set(&mut root, Value::from("29")).expect("set");
    assert_eq!(serde_json::Value::from(&root), json!({"test": {"age": 29}}));

    let mut root = Value::object();
    field.set(&mut root, Value::from("29")).expect("set");
    assert!(matches!(root.attr("test"), Some(Value::Object(r)) if r.class().is_none()));
}

#[test]
fn test_set_rejects_wrong_cast_length() {
    let field = Field::builder("test.user.name")
        .set_cast(vec![Cast::object(), Cast::object(), Cast::string()])
        .build()
        .expect("field");
    let err = field.validate().unwrap_err();
    assert_eq!(err, CastError::LengthMismatch { expected: 4, actual: 3 });
    let mut root = Value::object();
    assert!(matches!(
        field.set(&mut root, Value::from("x")),
        Err(PathError::Cast(CastError::LengthMismatch { .. }))
    ));
    assert_eq!(root, Value::object());
}

#[test]
fn test_validate_counts_indices() {
    let ok = Field::builder("users[1][1].scores[3]")
        .set_cast(vec![Cast::dict(); 6])
        .build()
        .expect("field");
    assert_eq!(ok.expected_cast_len(), 6);
    assert!(ok.validate().is_ok());
    let single = Field::builder("a.b").set_cast(Cast::int()).build().expect("field");
    assert!(single.validate().is_ok());
}

#[test]
fn test_set_indexed_with_positional_casts() {
    setup();
    let field = Field::builder("test.array[1][0].correct")
        .set_cast(vec![
            Cast::dict(),
            Cast::dict(),
            Cast::list_class("Rows"),
            Cast::list_class("Row"),
            Cast::object_class("ArrayElement"),
            Cast::bool(),
        ])
        .build()
        .expect("field");
    let mut root = Value::map();
    field.set(&mut root, Value::Int(1)).expect("set");

    let array = root.key("test").and_then(|t| t.key("array")).expect("array");
    assert_eq!(array.class(), Some("Rows"));
    assert!(array.at(0).is_some_and(Value::is_null));
    let row = array.at(1).expect("row");
    assert_eq!(row.class(), Some("Row"));
    let element = row.at(0).expect("element");
    assert_eq!(element.class(), Some("ArrayElement"));
    assert_eq!(element.attr("correct"), Some(&Value::Bool(true)));
}

#[test]
fn test_custom_separator() {
    let field = Field::builder("test name").separator(" ").build().expect("field");
    let mut root = Value::map();
    field.set(&mut root, Value::from("Test Example")).expect("set");
    assert_eq!(serde_json::Value::from(&root), json!({"test": {"name": "Test Example"}}));

    let dotted = Field::builder("test.age").separator(" ").build().expect("field");
    assert_eq!(dotted.segments().len(), 1);
    dotted.set(&mut root, Value::Int(3)).expect("set");
    assert_eq!(root.key("test.age"), Some(&Value::Int(3)));
}

#[test]
fn test_malformed_targets_fail_at_build() {
    for target in ["", "[0]", "a..b", "a[x]", "a[1]b"] {
        let err = Field::new(target).unwrap_err();
        assert!(matches!(err, PathError::MalformedPath { .. }), "{}: {:?}", target, err);
    }
}

#[test]
fn test_delete_then_set_restores() {
    setup();
    let field = Field::builder("test.array[1][1].correct").clear_parent(true).build().expect("field");
    let mut root = array_data();
    let removed = field.delete(&mut root).expect("delete");
    assert_eq!(removed, Value::Bool(true));
    assert_eq!(
        serde_json::Value::from(&root),
        json!({"test": {"array": [[{"correct": false}]]}})
    );
    assert!(field.get(&root).unwrap_err().is_lookup());

    field.set(&mut root, removed).expect("set");
    assert_eq!(field.get(&root).expect("get"), Value::Bool(true));
}

#[test]
fn test_delete_without_clear_parent_keeps_containers() {
    let field = Field::new("test.array[1][1]").expect("field");
    let mut root = array_data();
    field.delete(&mut root).expect("delete");
    assert_eq!(
        serde_json::Value::from(&root),
        json!({"test": {"array": [[{"correct": false}], [null, null]]}})
    );

    let name = Field::new("test.name").expect("field");
    let mut root = Value::from(json!({"test": {"name": "n"}})).into_objects();
    name.delete(&mut root).expect("delete");
    assert!(matches!(root.attr("test"), Some(Value::Object(r)) if r.is_empty()));
    assert!(matches!(name.delete(&mut root), Err(PathError::MissingAttribute(_))));
}

#[test]
fn test_cast_type_contract() {
    let obj = Cast::object_class("Obj1");
    let field = Field::builder("a.b").set_cast(obj.clone()).build().expect("field");
    assert_eq!(field.cast_type(CastPosition::Final, None, false).expect("cast"), obj);
    assert!(matches!(
        field.cast_type(CastPosition::At(0), None, true),
        Err(CastError::NoDefault { .. })
    ));

    let plain = Field::new("a.b").expect("field");
    assert_eq!(plain.cast_type(CastPosition::At(1), Some(&Cast::dict()), false).expect("cast"), Cast::dict());

    let positional = Field::builder("a.b")
        .set_cast(SetCast::Positional(vec![Cast::object(), Cast::dict(), Cast::int()]))
        .build()
        .expect("field");
    assert_eq!(positional.cast_type(CastPosition::At(1), None, false).expect("cast"), Cast::dict());
    assert!(positional.cast_type(CastPosition::At(3), None, false).is_err());
}

#[test]
fn test_metadata_is_free_form() {
    let field = Field::builder("test.name")
        .meta("description", "user name")
        .meta("order", 1)
        .build()
        .expect("field");
    assert_eq!(field.meta("description"), Some(&Value::from("user name")));
    assert_eq!(field.metadata().len(), 2);
    assert!(field.meta("missing").is_none());
}

#[test]
fn test_custom_cast_wraps_value() {
    let wrap = Cast::custom("IntegerField", |v| {
        let mut record = Record::with_class("IntegerField");
        record.insert("value", v);
        Ok(Value::Object(record))
    });
    let field = Field::builder("test.count").set_cast(wrap).build().expect("field");
    let mut root = Value::map();
    field.set(&mut root, Value::Int(5)).expect("set");
    let stored = field.get_ref(&root).expect("get");
    assert_eq!(stored.class(), Some("IntegerField"));
    assert_eq!(stored.attr("value"), Some(&Value::Int(5)));
}

fn segment_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[ -~]{0,12}".prop_map(Value::Str),
    ]
}

fn target() -> impl Strategy<Value = String> {
    prop::collection::vec((segment_name(), prop::collection::vec(0usize..4, 0..3)), 1..5).prop_map(|segments| {
        segments
            .into_iter()
            .map(|(name, indices)| {
                let subscripts: String = indices.iter().map(|i| format!("[{}]", i)).collect();
                format!("{}{}", name, subscripts)
            })
            .collect::<Vec<_>>()
            .join(".")
    })
}

proptest! {
    #[test]
    fn prop_get_after_set(target in target(), value in scalar(), asdict in any::<bool>()) {
        let field = Field::new(target.as_str()).expect("field");
        let mut root = if asdict { Value::map() } else { Value::object() };
        field.set(&mut root, value.clone()).expect("set");
        prop_assert_eq!(field.get(&root).expect("get"), value);
    }
}
