//! Fingerprint-based equality and containment checks.
//!
//! Both pipelines feed the same comparator through [`Canonicalize`]. Without
//! a query the whole documents are compared; with one, every subtree selected
//! from the left document must appear among the subtrees selected from the
//! right document.

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, trace};

use crate::json::JsonInput;
use crate::xml::XmlInput;
use crate::{fingerprint, CanonicalForm, CompareError, CompareOptions, Fingerprint, QueryError};

/// A document that can be reduced to canonical forms.
///
/// Implementors parse their input on demand and pair it with the path
/// language used to select subtrees.
pub trait Canonicalize {
    /// The parsed path expression type for this format.
    type Query: FromStr<Err = QueryError>;

    /// Canonicalizes the whole document.
    fn canonical_form(&self, options: &CompareOptions) -> Result<CanonicalForm, CompareError>;

    /// Canonicalizes every subtree the query selects, in selection order.
    fn canonical_selection(
        &self,
        query: &Self::Query,
        options: &CompareOptions,
    ) -> Result<Vec<CanonicalForm>, CompareError>;
}

/// Compares documents under a fixed set of options.
///
/// ```
/// # use structeq_core::{json::JsonInput, Comparator, CompareOptions};
/// let comparator = Comparator::new(CompareOptions::default());
/// let a = JsonInput::Text(r#"{"x": [1, 2], "y": null}"#);
/// let b = JsonInput::Text(r#"{"y": null, "x": [2, 1]}"#);
/// assert!(comparator.equivalent(&a, &b)?);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Comparator {
    options: CompareOptions,
}

impl Comparator {
    /// Creates a comparator that canonicalizes with `options`.
    #[must_use]
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    #[must_use]
    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Whole-document equality: true iff both fingerprints are equal.
    pub fn equivalent<T: Canonicalize>(&self, a: &T, b: &T) -> Result<bool, CompareError> {
        Ok(self.report(a, b, None)?.is_match())
    }

    /// Scoped containment: true iff every subtree `query` selects from `a`
    /// also appears among the subtrees it selects from `b`.
    ///
    /// The check is one-directional. Extra or repeated subtrees in `b` are
    /// allowed, and an empty selection from `a` is trivially contained.
    ///
    /// ```
    /// # use structeq_core::{json::{JsonInput, JsonPath}, Comparator};
    /// let query: JsonPath = "$.items".parse()?;
    /// let small = JsonInput::Text(r#"{"items": [2]}"#);
    /// let large = JsonInput::Text(r#"{"items": [1, 2, 3]}"#);
    /// let comparator = Comparator::default();
    /// assert!(comparator.equivalent_scoped(&small, &large, &query)?);
    /// assert!(!comparator.equivalent_scoped(&large, &small, &query)?);
    /// # Ok::<(), structeq_core::CompareError>(())
    /// ```
    pub fn equivalent_scoped<T: Canonicalize>(
        &self,
        a: &T,
        b: &T,
        query: &T::Query,
    ) -> Result<bool, CompareError> {
        Ok(self.report(a, b, Some(query))?.is_match())
    }

    /// Runs either comparison mode and keeps the fingerprints for inspection.
    pub fn report<T: Canonicalize>(
        &self,
        a: &T,
        b: &T,
        query: Option<&T::Query>,
    ) -> Result<ComparisonReport, CompareError> {
        let (left, right) = match query {
            None => (
                vec![fingerprint(&a.canonical_form(&self.options)?)],
                vec![fingerprint(&b.canonical_form(&self.options)?)],
            ),
            Some(query) => (
                fingerprint_all(&a.canonical_selection(query, &self.options)?),
                fingerprint_all(&b.canonical_selection(query, &self.options)?),
            ),
        };
        let report = ComparisonReport::new(left, right);
        debug!(
            scoped = query.is_some(),
            left = report.left.len(),
            right = report.right.len(),
            missing = report.missing.len(),
            "compared documents"
        );
        Ok(report)
    }
}

fn fingerprint_all(forms: &[CanonicalForm]) -> Vec<Fingerprint> {
    forms.iter().map(fingerprint).collect()
}

/// Outcome of a comparison with the fingerprints that decided it.
///
/// In whole-document mode `left` and `right` each hold one fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    left: Vec<Fingerprint>,
    right: Vec<Fingerprint>,
    missing: Vec<Fingerprint>,
}

impl ComparisonReport {
    /// Builds a report, listing every left fingerprint absent on the right.
    ///
    /// ```
    /// # use structeq_core::{ComparisonReport, Fingerprint};
    /// let a = Fingerprint::of_bytes(b"a");
    /// let b = Fingerprint::of_bytes(b"b");
    /// let report = ComparisonReport::new(vec![a, b], vec![b, b]);
    /// assert_eq!(report.missing(), &[a]);
    /// assert!(!report.is_match());
    /// ```
    #[must_use]
    pub fn new(left: Vec<Fingerprint>, right: Vec<Fingerprint>) -> Self {
        for fp in &left {
            trace!(fingerprint = %fp, side = "left", "subtree fingerprint");
        }
        for fp in &right {
            trace!(fingerprint = %fp, side = "right", "subtree fingerprint");
        }
        let present: HashSet<&Fingerprint> = right.iter().collect();
        let missing = left.iter().filter(|fp| !present.contains(fp)).copied().collect();
        Self { left, right, missing }
    }

    /// True when nothing on the left is missing from the right.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fingerprints of the left document's subtrees, in selection order.
    #[must_use]
    pub fn left(&self) -> &[Fingerprint] {
        &self.left
    }

    /// Fingerprints of the right document's subtrees, in selection order.
    #[must_use]
    pub fn right(&self) -> &[Fingerprint] {
        &self.right
    }

    /// Left fingerprints with no equal fingerprint on the right.
    #[must_use]
    pub fn missing(&self) -> &[Fingerprint] {
        &self.missing
    }
}

/// Canonicalizes a whole document with default options.
///
/// ```
/// # use structeq_core::{canonicalize, json::JsonInput};
/// let form = canonicalize(&JsonInput::Text(r#"{"b": 2, "a": 1}"#))?;
/// assert_eq!(form.to_string(), r#"[("a", 1), ("b", 2)]"#);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn canonicalize<T: Canonicalize>(input: &T) -> Result<CanonicalForm, CompareError> {
    input.canonical_form(&CompareOptions::default())
}

/// Whole-document equality with default options.
///
/// Symmetric: swapping the arguments never changes the answer.
///
/// ```
/// # use structeq_core::{documents_equivalent, xml::XmlInput};
/// let a = XmlInput::Text(r#"<s type="regular"><x id="1" os="0"/></s>"#);
/// let b = XmlInput::Text(r#"<s type="regular"><x os="0" id="1"/></s>"#);
/// assert!(documents_equivalent(&a, &b)?);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn documents_equivalent<T: Canonicalize>(a: &T, b: &T) -> Result<bool, CompareError> {
    Comparator::default().equivalent(a, b)
}

/// Scoped containment with default options; `query` is parsed in the
/// document's own path language.
///
/// ```
/// # use structeq_core::{documents_equivalent_scoped, json::JsonInput};
/// let a = JsonInput::Text(r#"{"tags": []}"#);
/// let b = JsonInput::Text(r#"{"other": 1}"#);
/// // Nothing selected from `a`, so it is trivially contained.
/// assert!(documents_equivalent_scoped(&a, &b, "$.tags")?);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn documents_equivalent_scoped<T: Canonicalize>(
    a: &T,
    b: &T,
    query: &str,
) -> Result<bool, CompareError> {
    let query: T::Query = query.parse()?;
    Comparator::default().equivalent_scoped(a, b, &query)
}

/// Compares two JSON documents: whole-document equality without a query,
/// scoped containment of `a` in `b` with one.
///
/// ```
/// # use structeq_core::compare_json;
/// let a = r#"{"name": "x", "ports": [80, 443]}"#;
/// let b = r#"{"ports": [443, 80], "name": "x"}"#;
/// assert!(compare_json(a, b, None)?);
/// assert!(compare_json(a, b, Some("$.ports"))?);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn compare_json<'a>(
    a: impl Into<JsonInput<'a>>,
    b: impl Into<JsonInput<'a>>,
    query: Option<&str>,
) -> Result<bool, CompareError> {
    compare_with(&a.into(), &b.into(), query)
}

/// Compares two XML documents: whole-document equality without a query,
/// scoped containment of `a` in `b` with one.
///
/// ```
/// # use structeq_core::compare_xml;
/// let part = "<data><country name='Panama'/></data>";
/// let full = "<data><country name='Chile'/><country name='Panama'/></data>";
/// assert!(compare_xml(part, full, Some("country"))?);
/// assert!(!compare_xml(part, full, None)?);
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn compare_xml<'a, 'input: 'a>(
    a: impl Into<XmlInput<'a, 'input>>,
    b: impl Into<XmlInput<'a, 'input>>,
    query: Option<&str>,
) -> Result<bool, CompareError> {
    compare_with(&a.into(), &b.into(), query)
}

fn compare_with<T: Canonicalize>(a: &T, b: &T, query: Option<&str>) -> Result<bool, CompareError> {
    match query {
        None => documents_equivalent(a, b),
        Some(query) => documents_equivalent_scoped(a, b, query),
    }
}
