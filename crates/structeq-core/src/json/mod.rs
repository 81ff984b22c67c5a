//! JSON (and YAML) pipeline: parsing, canonical forms, JSONPath selection
//! and formatting.

mod path;

use std::borrow::Cow;

use serde_json::{Map as JsonMap, Value as JsonValue};
use serde_yaml::Value as YamlValue;
use tracing::debug;

pub use path::JsonPath;

use crate::{CanonicalForm, Canonicalize, CompareError, CompareOptions, Number, ParseError, Scalar};

/// A JSON document handed to the comparator.
///
/// Text is parsed on demand. An already-parsed tree must be an object or an
/// array; YAML text is converted into the JSON data model first.
#[derive(Clone, Copy, Debug)]
pub enum JsonInput<'a> {
    /// Raw JSON text.
    Text(&'a str),
    /// Raw YAML text.
    Yaml(&'a str),
    /// An already-parsed tree.
    Value(&'a JsonValue),
}

impl<'a> From<&'a str> for JsonInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for JsonInput<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a JsonValue> for JsonInput<'a> {
    fn from(value: &'a JsonValue) -> Self {
        Self::Value(value)
    }
}

impl<'a> JsonInput<'a> {
    /// Parses the input into a JSON tree, borrowing when it is already parsed.
    ///
    /// ```
    /// # use structeq_core::json::JsonInput;
    /// let value = JsonInput::Yaml("answer: 42").parse()?;
    /// assert_eq!(value["answer"], 42);
    /// # Ok::<(), structeq_core::CompareError>(())
    /// ```
    pub fn parse(self) -> Result<Cow<'a, JsonValue>, CompareError> {
        match self {
            Self::Text(text) => {
                let value = serde_json::from_str(text).map_err(ParseError::from)?;
                Ok(Cow::Owned(value))
            }
            Self::Yaml(text) => {
                let value: YamlValue = serde_yaml::from_str(text).map_err(ParseError::from)?;
                Ok(Cow::Owned(from_yaml_value(value)?))
            }
            Self::Value(value) => match value {
                JsonValue::Object(_) | JsonValue::Array(_) => Ok(Cow::Borrowed(value)),
                other => Err(CompareError::InvalidInputType {
                    expected: "JSON object or array",
                    found: kind_name(other).to_owned(),
                }),
            },
        }
    }
}

impl Canonicalize for JsonInput<'_> {
    type Query = JsonPath;

    fn canonical_form(&self, options: &CompareOptions) -> Result<CanonicalForm, CompareError> {
        let value = self.parse()?;
        canonicalize(&value, options)
    }

    fn canonical_selection(
        &self,
        query: &JsonPath,
        options: &CompareOptions,
    ) -> Result<Vec<CanonicalForm>, CompareError> {
        let value = self.parse()?;
        select(&value, Some(query))
            .iter()
            .map(|subtree| canonicalize(subtree, options))
            .collect()
    }
}

/// Converts a JSON value into its canonical form.
///
/// Object members become sorted labels, arrays become sorted sequences, and
/// scalars are kept as they are.
///
/// ```
/// # use structeq_core::{json, CompareOptions};
/// let opts = CompareOptions::default();
/// let lhs = json::canonicalize(&serde_json::json!({"a": [1, 2], "b": "xy"}), &opts)?;
/// let rhs = json::canonicalize(&serde_json::json!({"b": "xy", "a": [2, 1]}), &opts)?;
/// assert_eq!(lhs, rhs);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn canonicalize(
    value: &JsonValue,
    options: &CompareOptions,
) -> Result<CanonicalForm, CompareError> {
    canonicalize_at(value, 1, options.max_depth())
}

fn canonicalize_at(
    value: &JsonValue,
    depth: usize,
    limit: usize,
) -> Result<CanonicalForm, CompareError> {
    if depth > limit {
        return Err(CompareError::DepthExceeded { limit });
    }
    let form = match value {
        JsonValue::Null => CanonicalForm::Scalar(Scalar::Null),
        JsonValue::Bool(v) => CanonicalForm::Scalar(Scalar::Bool(*v)),
        JsonValue::Number(num) => {
            CanonicalForm::Scalar(Scalar::Number(Number::from_json_number(num)?))
        }
        JsonValue::String(s) => CanonicalForm::Scalar(Scalar::String(s.clone())),
        JsonValue::Array(items) => {
            let mut forms = Vec::with_capacity(items.len());
            for item in items {
                forms.push(canonicalize_at(item, depth + 1, limit)?);
            }
            CanonicalForm::unordered(forms)
        }
        JsonValue::Object(map) => {
            let mut members = Vec::with_capacity(map.len());
            for (key, item) in map {
                members.push(CanonicalForm::labeled(key, canonicalize_at(item, depth + 1, limit)?));
            }
            CanonicalForm::unordered(members)
        }
    };
    Ok(form)
}

/// Selects the subtrees of `value` addressed by `query`.
///
/// Without a query the whole document is the only subtree. When the query
/// matches exactly one node its value is unwrapped: array elements become
/// separate subtrees, and an object is split into one single-member object per
/// key. Several matches are returned as they are.
///
/// ```
/// # use structeq_core::json::{self, JsonPath};
/// let doc = serde_json::json!({"stations": {"a": 1, "b": 2}});
/// let query: JsonPath = "$.stations".parse()?;
/// let parts = json::select(&doc, Some(&query));
/// assert_eq!(parts.len(), 2);
/// assert_eq!(*parts[0], serde_json::json!({"a": 1}));
/// # Ok::<(), structeq_core::QueryError>(())
/// ```
#[must_use]
pub fn select<'v>(value: &'v JsonValue, query: Option<&JsonPath>) -> Vec<Cow<'v, JsonValue>> {
    let Some(query) = query else {
        return vec![Cow::Borrowed(value)];
    };
    let matches = query.find(value);
    debug!(query = %query, matches = matches.len(), "evaluated JSON path");
    match matches.as_slice() {
        [single] => unwrap_single(single),
        _ => matches.into_iter().map(Cow::Borrowed).collect(),
    }
}

fn unwrap_single(value: &JsonValue) -> Vec<Cow<'_, JsonValue>> {
    match value {
        JsonValue::Array(items) => items.iter().map(Cow::Borrowed).collect(),
        JsonValue::Object(map) => map
            .iter()
            .map(|(key, item)| {
                let mut single = JsonMap::new();
                single.insert(key.clone(), item.clone());
                Cow::Owned(JsonValue::Object(single))
            })
            .collect(),
        scalar => vec![Cow::Borrowed(scalar)],
    }
}

/// Formats a JSON document.
///
/// Unformatted text is returned untouched; parsed trees are serialized
/// compactly. Pretty output uses two-space indentation (YAML input is
/// re-emitted as YAML).
///
/// ```
/// # use structeq_core::json::{render, JsonInput};
/// let pretty = render(JsonInput::Text("{\"a\":[1]}"), true)?;
/// assert_eq!(pretty, "{\n  \"a\": [\n    1\n  ]\n}");
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn render(input: JsonInput<'_>, pretty: bool) -> Result<String, CompareError> {
    match (input, pretty) {
        (JsonInput::Text(text) | JsonInput::Yaml(text), false) => Ok(text.to_owned()),
        (JsonInput::Yaml(_), true) => {
            let value = input.parse()?;
            Ok(serde_yaml::to_string(value.as_ref()).map_err(ParseError::from)?)
        }
        (_, true) => {
            let value = input.parse()?;
            Ok(serde_json::to_string_pretty(value.as_ref()).map_err(ParseError::from)?)
        }
        (JsonInput::Value(value), false) => {
            Ok(serde_json::to_string(value).map_err(ParseError::from)?)
        }
    }
}

fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn from_yaml_value(value: YamlValue) -> Result<JsonValue, ParseError> {
    match value {
        YamlValue::Null => Ok(JsonValue::Null),
        YamlValue::Bool(v) => Ok(JsonValue::Bool(v)),
        YamlValue::Number(num) => {
            if let Some(i) = num.as_i64() {
                return Ok(JsonValue::from(i));
            }
            if let Some(u) = num.as_u64() {
                return Ok(JsonValue::from(u));
            }
            match num.as_f64() {
                Some(f) => serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or(ParseError::NotFinite { value: f }),
                None => Err(ParseError::NumberOutOfRange { value: num.to_string() }),
            }
        }
        YamlValue::String(s) => Ok(JsonValue::String(s)),
        YamlValue::Sequence(seq) => {
            let mut items = Vec::with_capacity(seq.len());
            for value in seq {
                items.push(from_yaml_value(value)?);
            }
            Ok(JsonValue::Array(items))
        }
        YamlValue::Mapping(map) => {
            let mut object = JsonMap::new();
            for (key, value) in map {
                let key = match key {
                    YamlValue::String(s) => s,
                    other => {
                        return Err(ParseError::NonStringYamlKey { found: format!("{other:?}") });
                    }
                };
                object.insert(key, from_yaml_value(value)?);
            }
            Ok(JsonValue::Object(object))
        }
        YamlValue::Tagged(tagged) => {
            Err(ParseError::UnsupportedYamlTag { tag: tagged.tag.to_string() })
        }
    }
}
