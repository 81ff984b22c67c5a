use std::fs;
use std::path::Path;

use proptest::prelude::*;
use serde_json::{json, Value};
use structeq_core::json::JsonInput;
use structeq_core::{compare_json, compare_text, CompareOptions, Format};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/json").join(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {path:?}: {err}"))
}

const STATION_CONTAINMENT: &[(&str, &str, bool)] = &[
    ("two_stations_regular_virtual.json", "three_stations.json", true),
    ("two_stations_regular_virtual.json", "three_stations_reordered.json", true),
    ("two_stations_scanning_virtual.json", "three_stations.json", true),
    ("two_stations_scanning_virtual.json", "three_stations_reordered.json", true),
    ("two_stations_regular_scanning.json", "three_stations.json", true),
    ("two_stations_regular_scanning.json", "three_stations_reordered.json", true),
    ("one_station_regular.json", "three_stations.json", true),
    ("one_station_regular.json", "three_stations_reordered.json", true),
    ("one_station_regular.json", "two_stations_regular_virtual.json", true),
    ("one_station_regular.json", "two_stations_regular_scanning.json", true),
    ("one_station_virtual.json", "three_stations.json", true),
    ("one_station_virtual.json", "three_stations_reordered.json", true),
    ("one_station_virtual.json", "two_stations_regular_virtual.json", true),
    ("one_station_virtual.json", "two_stations_scanning_virtual.json", true),
    ("two_stations_regular_virtual.json", "two_stations_scanning_virtual.json", false),
    ("one_station_regular.json", "two_stations_scanning_virtual.json", false),
    ("one_station_virtual.json", "two_stations_regular_scanning.json", false),
    ("one_station_scanning.json", "two_stations_regular_virtual.json", false),
];

#[test]
fn station_groups_are_contained_by_descendant_query() {
    for &(left, right, expected) in STATION_CONTAINMENT {
        let (a, b) = (fixture(left), fixture(right));
        let actual = compare_json(a.as_str(), b.as_str(), Some("$..stations")).unwrap();
        assert_eq!(actual, expected, "{left} in {right}");
    }
}

#[test]
fn parsed_trees_compare_like_text() {
    for &(left, right, expected) in STATION_CONTAINMENT {
        let a: Value = serde_json::from_str(&fixture(left)).unwrap();
        let b: Value = serde_json::from_str(&fixture(right)).unwrap();
        let actual = compare_json(&a, &b, Some("$..stations")).unwrap();
        assert_eq!(actual, expected, "{left} in {right}");
    }
}

#[test]
fn reordered_station_groups_are_equal() {
    let (a, b) = (fixture("three_stations_reordered.json"), fixture("three_stations.json"));
    assert!(compare_json(a.as_str(), b.as_str(), None).unwrap());
}

#[test]
fn whole_documents_detect_single_edits() {
    let base = fixture("stations.json");
    let cases = [
        ("stations_reordered.json", true),
        ("stations_total_changed.json", false),
        ("stations_timestamp_changed.json", false),
        ("stations_key_renamed.json", false),
        ("stations_field_missing.json", false),
    ];
    for (other, expected) in cases {
        let other_text = fixture(other);
        let actual = compare_json(base.as_str(), other_text.as_str(), None).unwrap();
        assert_eq!(actual, expected, "{other}");
    }
}

#[test]
fn report_lists_missing_station_groups() {
    let a = fixture("two_stations_regular_virtual.json");
    let b = fixture("two_stations_scanning_virtual.json");
    let opts = CompareOptions::default();
    let report = compare_text(&a, &b, Format::Json, Some("$..stations"), &opts).unwrap();
    assert!(!report.is_match());
    assert_eq!(report.left().len(), 2);
    assert_eq!(report.missing(), &report.left()[..1]);
}

#[test]
fn yaml_documents_use_the_json_model() {
    let yaml = "stations:\n  regular:\n    - id: 1\n  virtual_agent: []\n";
    let json = r#"{"stations": {"virtual_agent": [], "regular": [{"id": 1}]}}"#;
    let opts = CompareOptions::default();
    let a = compare_text(yaml, yaml, Format::Yaml, Some("$..stations"), &opts).unwrap();
    assert!(a.is_match());

    let from_yaml = JsonInput::Yaml(yaml).parse().unwrap();
    assert!(compare_json(&*from_yaml, json, None).unwrap());
}

#[test]
fn integers_and_floats_are_distinct() {
    assert!(!compare_json("[1]", "[1.0]", None).unwrap());
    assert!(compare_json("[1.5, 2]", "[2, 1.5]", None).unwrap());
}

#[test]
fn empty_selection_is_vacuously_contained() {
    assert!(compare_json(r#"{"a": 1}"#, r#"{"b": 2}"#, Some("$.missing")).unwrap());
    assert!(!compare_json(r#"{"a": [1]}"#, r#"{"b": 2}"#, Some("$.a")).unwrap());
}

#[test]
fn scalar_top_level_tree_is_rejected() {
    let value = json!("plain");
    assert!(compare_json(&value, &value, None).is_err());
}

fn arb_json() -> impl Strategy<Value = Value> {
    use proptest::{collection, string::string_regex};

    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        string_regex("[a-z0-9]{0,5}").unwrap().prop_map(Value::String),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            collection::btree_map(string_regex("[a-z]{1,4}").unwrap(), inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn arb_document() -> impl Strategy<Value = Value> {
    proptest::collection::vec(arb_json(), 0..5).prop_map(Value::Array)
}

/// Reverses every array in the tree.
fn reversed(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().rev().map(reversed).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), reversed(v))).collect())
        }
        other => other.clone(),
    }
}

/// Writes `value` as JSON text with every object's members rotated by `shift`,
/// then reversed for even non-zero shifts.
fn permuted_text(value: &Value, shift: usize) -> String {
    match value {
        Value::Object(map) => {
            let mut members: Vec<_> = map.iter().collect();
            if !members.is_empty() {
                let len = members.len();
                members.rotate_left(shift % len);
            }
            if shift > 0 && shift % 2 == 0 {
                members.reverse();
            }
            let body: Vec<String> = members
                .into_iter()
                .map(|(key, item)| format!("{}:{}", json!(key), permuted_text(item, shift)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(|item| permuted_text(item, shift)).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

#[test]
fn permuted_text_moves_members() {
    let doc = json!({"a": 1, "b": {"c": 2, "d": 3}});
    assert_eq!(permuted_text(&doc, 0), r#"{"a":1,"b":{"c":2,"d":3}}"#);
    assert_eq!(permuted_text(&doc, 1), r#"{"b":{"d":3,"c":2},"a":1}"#);
    assert_eq!(permuted_text(&doc, 2), r#"{"b":{"d":3,"c":2},"a":1}"#);
}

proptest! {
    #[test]
    fn object_member_order_never_matters(doc in arb_document(), shift in 0usize..8) {
        let base = doc.to_string();
        let permuted = permuted_text(&doc, shift);
        prop_assert!(compare_json(base.as_str(), permuted.as_str(), None).unwrap());
        prop_assert!(compare_json(permuted.as_str(), base.as_str(), Some("$..*")).unwrap());
    }

    #[test]
    fn array_order_never_matters(doc in arb_document()) {
        prop_assert!(compare_json(&doc, &reversed(&doc), None).unwrap());
    }

    #[test]
    fn equality_is_symmetric(a in arb_document(), b in arb_document()) {
        prop_assert_eq!(
            compare_json(&a, &b, None).unwrap(),
            compare_json(&b, &a, None).unwrap()
        );
    }

    #[test]
    fn appended_leaf_breaks_equality(doc in arb_document()) {
        let mut grown = doc.clone();
        if let Value::Array(items) = &mut grown {
            items.push(json!("appended-leaf"));
        }
        prop_assert!(!compare_json(&doc, &grown, None).unwrap());
    }

    #[test]
    fn subset_of_elements_is_contained(doc in arb_document(), keep in 0usize..5) {
        let Value::Array(items) = &doc else { unreachable!() };
        let subset = Value::Array(items.iter().take(keep).cloned().collect());
        prop_assert!(compare_json(&subset, &doc, Some("$")).unwrap());
    }
}
