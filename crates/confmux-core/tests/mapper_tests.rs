//! Tests for the schema trie

use std::collections::BTreeMap;
use std::sync::Arc;

use confmux_core::{
    ConvMapper, Converter, Error, FnMapper, Key, KeyValue, Mapper, MapperNode, Result, SELF_KEY,
    Schema, Value, convert,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn passthrough() -> Arc<dyn Mapper> {
    Arc::new(FnMapper::new(Ok))
}

fn squaring() -> Arc<dyn Mapper> {
    Arc::new(FnMapper::new(|kv: KeyValue| match kv.value() {
        Value::Int(v) => {
            let squared = v * v;
            Ok(kv.with_value(squared))
        }
        other => Err(Error::custom(format!("not an int: {other:?}"))),
    }))
}

#[derive(Debug, Clone, PartialEq)]
struct Foo {
    bar: i64,
}

fn foo_mapper() -> Arc<dyn Mapper> {
    Arc::new(FnMapper::new(|kv: KeyValue| {
        let bar = kv
            .value()
            .as_map()
            .and_then(|fields| fields.get("bar"))
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::custom("foo needs an integer bar"))?;
        Ok(kv.with_value(Value::any(Foo { bar })))
    }))
}

fn failing() -> Arc<dyn Mapper> {
    Arc::new(FnMapper::new(|_kv: KeyValue| -> Result<KeyValue> {
        Err(Error::custom("This mapper returns an error"))
    }))
}

mod insert_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_flat_key() {
        let mpr = passthrough();
        let mut root = MapperNode::new();
        root.insert(&Key::new("foo"), mpr.clone());

        let mut expected = MapperNode::new();
        expected.insert(&Key::new("foo"), mpr.clone());
        assert_eq!(root, expected);
        assert!(Arc::ptr_eq(root.child("foo").unwrap().mapper().unwrap(), &mpr));
        assert!(root.mapper().is_none());
    }

    #[test]
    fn test_insert_nested_key_leaves_interior_empty() {
        let mpr = passthrough();
        let mut root = MapperNode::new();
        root.insert(&Key::new("foo.bar"), mpr.clone());

        let foo = root.child("foo").unwrap();
        assert!(foo.mapper().is_none());
        assert!(Arc::ptr_eq(foo.child("bar").unwrap().mapper().unwrap(), &mpr));
    }

    #[test]
    fn test_insert_empty_key_leaves_root_untouched() {
        let mut root = MapperNode::new();
        root.insert(&Key::new(""), passthrough());
        assert_eq!(root, MapperNode::new());
    }
}

mod find_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case(&["foo", "*"], "foo")]
    #[case(&["foo.bar", "foo.*", "*.bar", "*.*"], "foo.bar")]
    #[case(
        &["foo.bar.baz", "foo.bar.*", "foo.*.baz", "foo.*.*", "*.bar.baz", "*.bar.*", "*.*.baz", "*.*.*"],
        "foo.bar.baz"
    )]
    fn test_single_entry_lookup(#[case] insert_paths: &[&str], #[case] lookup: &str) {
        for path in insert_paths {
            let mpr = passthrough();
            let mut root = MapperNode::new();
            root.insert(&Key::new(path), mpr.clone());

            let node = root
                .find(&Key::new(lookup))
                .unwrap_or_else(|| panic!("{path} should match {lookup}"));
            assert!(
                Arc::ptr_eq(node.mapper().unwrap(), &mpr),
                "{path} returned the wrong mapper for {lookup}"
            );
        }
    }

    #[rstest]
    #[case("foo", &["*"])]
    #[case("foo.bar", &["foo.*", "*.bar", "*.*"])]
    #[case(
        "foo.bar.baz",
        &["foo.bar.*", "foo.*.baz", "foo.*.*", "*.bar.baz", "*.bar.*", "*.*.baz", "*.*.*"]
    )]
    fn test_exact_path_wins(#[case] exact: &str, #[case] wildcard_paths: &[&str]) {
        let exact_mpr = passthrough();
        let wild_mpr = passthrough();
        let mut root = MapperNode::new();
        root.insert(&Key::new(exact), exact_mpr.clone());
        for path in wildcard_paths {
            root.insert(&Key::new(path), wild_mpr.clone());
        }

        let node = root.find(&Key::new(exact)).unwrap();
        assert!(Arc::ptr_eq(node.mapper().unwrap(), &exact_mpr));
    }

    #[test]
    fn test_exact_path_wins_regardless_of_insert_order() {
        let exact_mpr = passthrough();
        let mut root = MapperNode::new();
        for path in ["*.*", "foo.*", "*.bar"] {
            root.insert(&Key::new(path), passthrough());
        }
        root.insert(&Key::new("foo.bar"), exact_mpr.clone());

        let node = root.find(&Key::new("foo.bar")).unwrap();
        assert!(Arc::ptr_eq(node.mapper().unwrap(), &exact_mpr));
    }

    #[test]
    fn test_missing_path() {
        let mut root = MapperNode::new();
        root.insert(&Key::new("foo.bar"), passthrough());
        assert!(root.find(&Key::new("foo.baz")).is_none());
        assert!(root.find(&Key::new("moo")).is_none());
    }
}

mod conv_mapper_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::to_int(
        convert::to_int,
        Value::Int(42),
        vec![Value::Int(42), Value::from("42"), Value::reference(42)],
        vec![Value::Bool(true), Value::from(""), Value::Char('0'), Value::Null]
    )]
    #[case::to_str(
        convert::to_str,
        Value::from("42"),
        vec![Value::from("42"), Value::Int(42), Value::reference("42")],
        vec![Value::reference(42), Value::Null, Value::Bool(false), Value::Char('0')]
    )]
    #[case::to_bool(
        convert::to_bool,
        Value::Bool(true),
        vec![
            Value::Bool(true),
            Value::reference(true),
            Value::from("true"),
            Value::from("y"),
            Value::Int(1),
            Value::from("1"),
        ],
        vec![Value::Int(123), Value::from("asdf"), Value::Null]
    )]
    fn test_conv_mapper(
        #[case] conv: fn(&Value) -> Result<Value>,
        #[case] expected: Value,
        #[case] valid: Vec<Value>,
        #[case] invalid: Vec<Value>,
    ) {
        let mpr = ConvMapper::new(Converter::new(conv));
        for input in valid {
            let out = mpr
                .map(KeyValue::new(Key::root(), input.clone()))
                .unwrap_or_else(|e| panic!("mapping {input:?} failed: {e}"));
            assert_eq!(out.value(), &expected, "input {input:?}");
        }
        for input in invalid {
            assert!(
                mpr.map(KeyValue::new(Key::root(), input.clone())).is_err(),
                "expected {input:?} to be rejected"
            );
        }
    }
}

mod define_schema_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn defined(schema: Schema) -> MapperNode {
        let mut node = MapperNode::new();
        node.define_schema(schema).expect("schema should be valid");
        node
    }

    #[test]
    fn test_empty_schema() {
        assert_eq!(defined(Schema::empty()), MapperNode::new());
    }

    #[test]
    fn test_bare_mapper_at_root_is_discarded() {
        assert_eq!(defined(Schema::Mapper(passthrough())), MapperNode::new());
    }

    #[test]
    fn test_bare_converter_at_root_is_discarded() {
        assert_eq!(
            defined(Schema::converter(convert::to_int)),
            MapperNode::new()
        );
    }

    #[test]
    fn test_flat_key() {
        let mpr = passthrough();
        let node = defined(Schema::map([("foo", Schema::Mapper(mpr.clone()))]));

        let mut expected = MapperNode::new();
        expected.insert(&Key::new("foo"), mpr);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_simple_self() {
        let mpr = passthrough();
        let node = defined(Schema::map([(
            "foo",
            Schema::map([(SELF_KEY, Schema::Mapper(mpr.clone()))]),
        )]));

        let mut expected = MapperNode::new();
        expected.insert(&Key::new("foo"), mpr);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_nested_structure() {
        let mpr1 = passthrough();
        let mpr2 = passthrough();
        let node = defined(Schema::map([
            (
                "foo",
                Schema::map([("bar", Schema::map([("baz", Schema::Mapper(mpr1.clone()))]))]),
            ),
            ("moo", Schema::Mapper(mpr2.clone())),
        ]));

        let mut expected = MapperNode::new();
        expected.insert(&Key::new("foo.bar.baz"), mpr1);
        expected.insert(&Key::new("moo"), mpr2);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_converter_is_wrapped() {
        let node = defined(Schema::map([("port", Schema::converter(convert::to_int))]));
        let out = node.map(KeyValue::new("port", "80")).unwrap();
        assert_eq!(out.value(), &Value::Int(80));
    }

    #[test]
    fn test_self_at_top_level_targets_root() {
        let mpr = passthrough();
        let node = defined(Schema::map([(SELF_KEY, Schema::Mapper(mpr.clone()))]));
        assert!(Arc::ptr_eq(node.mapper().unwrap(), &mpr));
    }
}

mod map_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn foo_schema() -> Schema {
        Schema::map([(
            "foo",
            Schema::map([
                (SELF_KEY, Schema::Mapper(foo_mapper())),
                ("bar", Schema::Mapper(squaring())),
            ]),
        )])
    }

    fn mapped(schema: Schema, input: KeyValue) -> Result<KeyValue> {
        let mut node = MapperNode::new();
        node.define_schema(schema)?;
        node.map(input)
    }

    #[test]
    fn test_empty_schema_passes_through() {
        let input = KeyValue::new("foo", 42);
        assert_eq!(mapped(Schema::empty(), input.clone()).unwrap(), input);
    }

    #[test]
    fn test_matching_key() {
        let out = mapped(
            Schema::map([("foo", Schema::Mapper(squaring()))]),
            KeyValue::new("foo", 4),
        )
        .unwrap();
        assert_eq!(out, KeyValue::new("foo", 16));
    }

    #[test]
    fn test_unknown_key_passes_through() {
        let out = mapped(
            Schema::map([("foo", Schema::Mapper(squaring()))]),
            KeyValue::new("bar", 4),
        )
        .unwrap();
        assert_eq!(out, KeyValue::new("bar", 4));
    }

    #[test]
    fn test_nested_leaf() {
        let out = mapped(foo_schema(), KeyValue::new("foo.bar", 4)).unwrap();
        assert_eq!(out, KeyValue::new("foo.bar", 16));
    }

    #[test]
    fn test_composite_key_is_not_preconverted() {
        let mut fields = BTreeMap::new();
        fields.insert("bar".to_string(), Value::Int(4));

        let out = mapped(foo_schema(), KeyValue::new("foo", Value::Map(fields))).unwrap();
        assert_eq!(out.key(), &Key::new("foo"));
        // bar reaches the self mapper unsquared
        assert_eq!(out.value().downcast_ref::<Foo>(), Some(&Foo { bar: 4 }));
    }

    #[test]
    fn test_failing_mapper_error_is_unwrapped() {
        let err = mapped(
            Schema::map([("foo", Schema::Mapper(failing()))]),
            KeyValue::new("foo", 42),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Custom(ref msg) if msg == "This mapper returns an error"));
    }

    #[test]
    fn test_wildcard_mapper_sees_concrete_key() {
        let echo_key: Arc<dyn Mapper> = Arc::new(FnMapper::new(|kv: KeyValue| {
            let name = kv.key().to_string();
            Ok(kv.with_value(name))
        }));
        let out = mapped(
            Schema::map([("plugins", Schema::map([("*", Schema::Mapper(echo_key))]))]),
            KeyValue::new("plugins.auth", Value::Null),
        )
        .unwrap();
        assert_eq!(out.value(), &Value::from("plugins.auth"));
    }
}
