//! Text-in, text-out entry points keyed by [`Format`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::json::{self, JsonInput, JsonPath};
use crate::xml::{self, XmlInput, XmlPath};
use crate::{
    fingerprint, Canonicalize, Comparator, CompareError, CompareOptions, ComparisonReport,
    Fingerprint, ParseError,
};

/// The document syntaxes understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON text, queried with JSONPath.
    Json,
    /// YAML text, converted to the JSON data model and queried with JSONPath.
    Yaml,
    /// XML text, queried with element paths.
    Xml,
}

impl Format {
    /// Maps a file extension (`json`, `yaml`, `yml`, `xml`) to a format.
    ///
    /// ```
    /// # use std::path::Path;
    /// # use structeq_core::Format;
    /// assert_eq!(Format::from_extension(Path::new("a/b.YML")), Some(Format::Yaml));
    /// assert_eq!(Format::from_extension(Path::new("notes.txt")), None);
    /// ```
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [("json", Self::Json), ("yaml", Self::Yaml), ("yml", Self::Yaml), ("xml", Self::Xml)]
            .into_iter()
            .find(|(name, _)| ext.eq_ignore_ascii_case(name))
            .map(|(_, format)| format)
    }

    /// Guesses the format from the first significant character: `<` is XML,
    /// `{` or `[` is JSON, anything else is read as YAML.
    ///
    /// ```
    /// # use structeq_core::Format;
    /// assert_eq!(Format::sniff("  <?xml version='1.0'?><a/>"), Format::Xml);
    /// assert_eq!(Format::sniff("\n{\"a\": 1}"), Format::Json);
    /// assert_eq!(Format::sniff("a: 1"), Format::Yaml);
    /// ```
    #[must_use]
    pub fn sniff(text: &str) -> Self {
        let body = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        match body.chars().next() {
            Some('<') => Self::Xml,
            Some('{' | '[') => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Uses the path's extension when it is recognised, otherwise sniffs `text`.
    #[must_use]
    pub fn detect(path: Option<&Path>, text: &str) -> Self {
        path.and_then(Self::from_extension).unwrap_or_else(|| Self::sniff(text))
    }

    /// Lowercase name of the format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects subtrees of a document and renders each one back to text.
///
/// JSON subtrees are written as JSON, YAML subtrees as YAML and XML subtrees
/// as elements.
///
/// ```
/// # use structeq_core::{select, Format};
/// let doc = r#"{"stations": {"regular": 1, "virtual": 2}}"#;
/// let parts = select(doc, Format::Json, Some("$.stations"), false)?;
/// assert_eq!(parts, ["{\"regular\":1}", "{\"virtual\":2}"]);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn select(
    text: &str,
    format: Format,
    query: Option<&str>,
    pretty: bool,
) -> Result<Vec<String>, CompareError> {
    match format {
        Format::Json | Format::Yaml => {
            let input =
                if format == Format::Json { JsonInput::Text(text) } else { JsonInput::Yaml(text) };
            let value = input.parse()?;
            let query = query.map(str::parse::<JsonPath>).transpose()?;
            json::select(&value, query.as_ref())
                .iter()
                .map(|subtree| write_json(subtree, format, pretty))
                .collect()
        }
        Format::Xml => {
            let doc = xml::parse_document(text)?;
            let query = query.map(str::parse::<XmlPath>).transpose()?;
            xml::select(doc.root_element(), query.as_ref())
                .into_iter()
                .map(|element| xml::render(XmlInput::Element(element), pretty))
                .collect()
        }
    }
}

fn write_json(value: &JsonValue, format: Format, pretty: bool) -> Result<String, CompareError> {
    let text = match (format, pretty) {
        (Format::Yaml, _) => {
            serde_yaml::to_string(value).map_err(ParseError::from)?.trim_end().to_owned()
        }
        (_, true) => serde_json::to_string_pretty(value).map_err(ParseError::from)?,
        (_, false) => serde_json::to_string(value).map_err(ParseError::from)?,
    };
    Ok(text)
}

/// Fingerprints the whole document, or each subtree `query` selects.
///
/// ```
/// # use structeq_core::{fingerprints, CompareOptions, Format};
/// let opts = CompareOptions::default();
/// let a = fingerprints("<a x='1' y='2'/>", Format::Xml, None, &opts)?;
/// let b = fingerprints("<a y='2' x='1'/>", Format::Xml, None, &opts)?;
/// assert_eq!(a, b);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn fingerprints(
    text: &str,
    format: Format,
    query: Option<&str>,
    options: &CompareOptions,
) -> Result<Vec<Fingerprint>, CompareError> {
    match format {
        Format::Json => fingerprints_of(&JsonInput::Text(text), query, options),
        Format::Yaml => fingerprints_of(&JsonInput::Yaml(text), query, options),
        Format::Xml => fingerprints_of(&XmlInput::Text(text), query, options),
    }
}

fn fingerprints_of<T: Canonicalize>(
    input: &T,
    query: Option<&str>,
    options: &CompareOptions,
) -> Result<Vec<Fingerprint>, CompareError> {
    let forms = match query {
        None => vec![input.canonical_form(options)?],
        Some(query) => input.canonical_selection(&query.parse()?, options)?,
    };
    Ok(forms.iter().map(fingerprint).collect())
}

/// Compares two documents of the same format and returns the full report.
///
/// ```
/// # use structeq_core::{compare_text, CompareOptions, Format};
/// let opts = CompareOptions::default();
/// let report = compare_text("a: [1, 2]", "a: [2, 1]", Format::Yaml, None, &opts)?;
/// assert!(report.is_match());
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn compare_text(
    a: &str,
    b: &str,
    format: Format,
    query: Option<&str>,
    options: &CompareOptions,
) -> Result<ComparisonReport, CompareError> {
    let comparator = Comparator::new(options.clone());
    match format {
        Format::Json => report_of(&comparator, &JsonInput::Text(a), &JsonInput::Text(b), query),
        Format::Yaml => report_of(&comparator, &JsonInput::Yaml(a), &JsonInput::Yaml(b), query),
        Format::Xml => report_of(&comparator, &XmlInput::Text(a), &XmlInput::Text(b), query),
    }
}

fn report_of<T: Canonicalize>(
    comparator: &Comparator,
    a: &T,
    b: &T,
    query: Option<&str>,
) -> Result<ComparisonReport, CompareError> {
    let query = query.map(str::parse::<T::Query>).transpose()?;
    comparator.report(a, b, query.as_ref())
}

/// Formats a document in its own syntax.
pub fn render_text(text: &str, format: Format, pretty: bool) -> Result<String, CompareError> {
    match format {
        Format::Json => json::render(JsonInput::Text(text), pretty),
        Format::Yaml => json::render(JsonInput::Yaml(text), pretty),
        Format::Xml => xml::render(XmlInput::Text(text), pretty),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn detection_prefers_extension_over_content() {
        let path = PathBuf::from("doc.json");
        assert_eq!(Format::detect(Some(path.as_path()), "<a/>"), Format::Json);
        assert_eq!(Format::detect(Some(Path::new("doc")), "<a/>"), Format::Xml);
        assert_eq!(Format::detect(None, "\u{feff}[1]"), Format::Json);
    }

    #[test]
    fn format_names_round_trip_through_serde() {
        let parsed: Format = serde_json::from_str("\"xml\"").unwrap();
        assert_eq!(parsed, Format::Xml);
        assert_eq!(Format::Yaml.to_string(), "yaml");
    }

    #[test]
    fn xml_selection_renders_each_element() {
        let doc = r#"<data><country name="A"><rank>1</rank></country><country name="B"/></data>"#;
        let parts = select(doc, Format::Xml, Some("country"), false).unwrap();
        assert_eq!(
            parts,
            [r#"<country name="A"><rank>1</rank></country>"#, r#"<country name="B" />"#]
        );
    }

    #[test]
    fn yaml_selection_renders_yaml() {
        let parts = select("items:\n  - a: 1\n", Format::Yaml, Some("$.items"), false).unwrap();
        assert_eq!(parts, ["a: 1"]);
    }

    #[test]
    fn selection_without_query_is_whole_document() {
        assert_eq!(select("[1,2]", Format::Json, None, false).unwrap(), ["[1,2]"]);
    }

    #[test]
    fn scalar_subtrees_render() {
        let parts = select(r#"{"a": {"b": "x"}}"#, Format::Json, Some("$.a.b"), false).unwrap();
        assert_eq!(parts, ["\"x\""]);
    }

    #[test]
    fn fingerprints_follow_selection_size() {
        let opts = CompareOptions::default();
        let doc = "<r><c/><c/><d/></r>";
        assert_eq!(fingerprints(doc, Format::Xml, Some("c"), &opts).unwrap().len(), 2);
        assert_eq!(fingerprints(doc, Format::Xml, None, &opts).unwrap().len(), 1);
    }

    #[test]
    fn compare_text_reports_missing_subtrees() {
        let opts = CompareOptions::default();
        let (a, b) = (r#"{"a": [1, 2]}"#, r#"{"a": [2, 3]}"#);
        let report = compare_text(a, b, Format::Json, Some("$.a"), &opts).unwrap();
        assert_eq!(report.left().len(), 2);
        assert_eq!(report.missing().len(), 1);
    }

    #[test]
    fn query_errors_surface_per_format() {
        let opts = CompareOptions::default();
        let err = compare_text("<a/>", "<a/>", Format::Xml, Some("/a"), &opts).unwrap_err();
        assert!(matches!(err, CompareError::Query(_)));
    }
}
