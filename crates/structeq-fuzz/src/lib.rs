//! Fuzzing harnesses for `structeq`.
//!
//! Each public function accepts raw bytes so it can be driven from
//! `cargo fuzz` targets as well as from plain unit tests. Parse failures are
//! swallowed; violated comparison invariants panic so the fuzzer reports
//! them.
//!
//! # Examples
//!
//! ```
//! structeq_fuzz::fuzz_canonicalization(b"{\"a\":1}");
//! structeq_fuzz::fuzz_compare(&[1, 2, 3, 4]);
//! structeq_fuzz::fuzz_query(b"$..stations");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt::Write as _;

use arbitrary::Unstructured;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use structeq_core::json::{self, JsonInput, JsonPath};
use structeq_core::xml::{self, XmlInput, XmlPath};
use structeq_core::{
    canonicalize, documents_equivalent, documents_equivalent_scoped, fingerprint, render_json,
    render_xml,
};

const MAX_DEPTH: usize = 4;
const MAX_ARRAY_LEN: u8 = 6;
const MAX_OBJECT_LEN: u8 = 6;
const MAX_STRING_LEN: u8 = 12;
const MAX_CHILDREN: u8 = 4;

const TAGS: [&str; 3] = ["a", "b", "c"];
const ATTRIBUTES: [&str; 3] = ["x", "y", "z"];

const QUERY_JSON: &str = r#"{"stations": {"regular": [{"id": 1}], "virtual": []}, "n": [1, 2.5]}"#;
const QUERY_XML: &str = concat!(
    r#"<data><country name="A"><rank>1</rank></country>"#,
    r#"<country name="B"/><x:c xmlns:x="urn:x"/></data>"#,
);

/// Feeds arbitrary text through the JSON, YAML and XML canonicalizers and
/// formatters, ignoring every error.
///
/// ```
/// structeq_fuzz::fuzz_canonicalization(b"<a k='v'>text</a>");
/// ```
pub fn fuzz_canonicalization(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for input in [JsonInput::Text(text), JsonInput::Yaml(text)] {
        if let Ok(form) = canonicalize(&input) {
            let _ = fingerprint(&form);
        }
        let _ = render_json(input, true);
    }
    if let Ok(form) = canonicalize(&XmlInput::Text(text)) {
        let _ = fingerprint(&form);
        let _ = render_xml(XmlInput::Text(text), true);
    }
}

/// Checks that reordering a randomly generated document never changes the
/// comparison verdict, for both JSON trees and XML elements.
///
/// ```
/// structeq_fuzz::fuzz_compare(b"seed");
/// ```
pub fn fuzz_compare(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);

    if let Ok(value) = json_document(&mut unstructured) {
        let reordered = reverse_arrays(&value);
        let (a, b) = (JsonInput::Value(&value), JsonInput::Value(&reordered));
        assert!(matches!(documents_equivalent(&a, &b), Ok(true)), "JSON reordering: {value}");
        assert!(matches!(documents_equivalent_scoped(&a, &b, "$"), Ok(true)));
    }

    if let Ok(element) = random_element(&mut unstructured, 0) {
        let forward = element.write(false);
        let backward = element.write(true);
        let (a, b) = (XmlInput::Text(&forward), XmlInput::Text(&backward));
        assert!(matches!(documents_equivalent(&a, &b), Ok(true)), "XML reordering: {forward}");
        assert!(matches!(documents_equivalent_scoped(&a, &b, ".//*"), Ok(true)));
    }
}

/// Parses arbitrary text as a JSONPath and as an element path, evaluating
/// whatever parses against small fixed documents.
///
/// ```
/// structeq_fuzz::fuzz_query(b".//country[@name='A']");
/// ```
pub fn fuzz_query(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(query) = text.parse::<JsonPath>() {
        if let Ok(doc) = serde_json::from_str::<JsonValue>(QUERY_JSON) {
            let _ = json::select(&doc, Some(&query));
        }
    }
    if let (Ok(query), Ok(doc)) = (text.parse::<XmlPath>(), xml::parse_document(QUERY_XML)) {
        let _ = xml::select(doc.root_element(), Some(&query));
    }
}

fn json_document(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_ARRAY_LEN)?);
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(json_value_from_unstructured(unstructured, 1)?);
    }
    Ok(JsonValue::Array(items))
}

fn json_value_from_unstructured(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if depth >= MAX_DEPTH {
        return json_leaf(unstructured);
    }

    let choice = unstructured.int_in_range::<u8>(0..=5)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        3 => Ok(JsonValue::String(random_string(unstructured)?)),
        4 => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_ARRAY_LEN)?);
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(json_value_from_unstructured(unstructured, depth + 1)?);
            }
            Ok(JsonValue::Array(items))
        }
        _ => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_OBJECT_LEN)?);
            let mut map = JsonMap::new();
            for _ in 0..len {
                let key = random_string(unstructured)?;
                let value = json_value_from_unstructured(unstructured, depth + 1)?;
                map.insert(key, value);
            }
            Ok(JsonValue::Object(map))
        }
    }
}

fn json_leaf(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    let choice = unstructured.int_in_range::<u8>(0..=3)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        _ => Ok(JsonValue::String(random_string(unstructured)?)),
    }
}

fn random_number(unstructured: &mut Unstructured<'_>) -> Result<JsonNumber, arbitrary::Error> {
    if unstructured.arbitrary()? {
        let int = unstructured.arbitrary::<i64>()?;
        Ok(JsonNumber::from(int))
    } else {
        let numerator = f64::from(unstructured.arbitrary::<i32>()?);
        let denominator = f64::from(unstructured.int_in_range::<u16>(1..=1024)?);
        JsonNumber::from_f64(numerator / denominator).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

fn random_string(unstructured: &mut Unstructured<'_>) -> Result<String, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_STRING_LEN)?);
    let mut string = String::with_capacity(len);
    for _ in 0..len {
        let byte = unstructured.int_in_range::<u8>(0x20..=0x7e)?;
        string.push(char::from(byte));
    }
    Ok(string)
}

fn reverse_arrays(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().rev().map(reverse_arrays).collect())
        }
        JsonValue::Object(map) => {
            JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), reverse_arrays(v))).collect())
        }
        other => other.clone(),
    }
}

struct Element {
    tag: &'static str,
    attributes: Vec<(&'static str, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Serializes the element; `reversed` flips attribute and child order.
    fn write(&self, reversed: bool) -> String {
        let mut out = String::new();
        self.write_into(&mut out, reversed);
        out
    }

    fn write_into(&self, out: &mut String, reversed: bool) {
        out.push('<');
        out.push_str(self.tag);
        let mut attributes: Vec<_> = self.attributes.iter().collect();
        if reversed {
            attributes.reverse();
        }
        for (name, value) in attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text));
        }
        let mut children: Vec<_> = self.children.iter().collect();
        if reversed {
            children.reverse();
        }
        for child in children {
            child.write_into(out, reversed);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn random_element(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<Element, arbitrary::Error> {
    let tag = *unstructured.choose(&TAGS)?;
    let mut attributes = Vec::new();
    for name in ATTRIBUTES {
        if unstructured.arbitrary()? {
            attributes.push((name, random_string(unstructured)?));
        }
    }
    let text = if unstructured.arbitrary()? { Some(random_string(unstructured)?) } else { None };
    let mut children = Vec::new();
    if depth < MAX_DEPTH {
        let len = unstructured.int_in_range::<u8>(0..=MAX_CHILDREN)?;
        for _ in 0..len {
            children.push(random_element(unstructured, depth + 1)?);
        }
    }
    Ok(Element { tag, attributes, text, children })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_handles_utf8() {
        fuzz_canonicalization(br"{}");
        fuzz_canonicalization(b"<r>\n  <a k='&amp;'>t</a>\n</r>");
        fuzz_canonicalization(&[0xff, 0xfe]);
    }

    #[test]
    fn compare_harness_runs() {
        fuzz_compare(b"compare");
        fuzz_compare(&(0..=255).collect::<Vec<u8>>());
    }

    #[test]
    fn query_harness_runs() {
        fuzz_query(b"$..stations[?(@.id == 1)]");
        fuzz_query(b"country[last()]/rank");
        fuzz_query(b"[[[");
    }

    #[test]
    fn reversed_element_keeps_text_first() {
        let element = Element {
            tag: "a",
            attributes: vec![("x", "1".into()), ("y", "2".into())],
            text: Some("t".into()),
            children: vec![
                Element { tag: "b", attributes: Vec::new(), text: None, children: Vec::new() },
                Element { tag: "c", attributes: Vec::new(), text: None, children: Vec::new() },
            ],
        };
        assert_eq!(element.write(true), r#"<a y="2" x="1">t<c></c><b></b></a>"#);
    }
}
