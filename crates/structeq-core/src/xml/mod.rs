//! XML pipeline: parsing, canonical forms, element-path selection and
//! formatting.
//!
//! An element canonicalizes to the three-part sequence
//! `[tag, attributes, children]`. Attributes become sorted labels, child
//! elements are sorted, and non-blank leading text is kept in front of the
//! sorted children.

mod path;
mod render;

use roxmltree::{Document, Node, NodeType, ParsingOptions};
use tracing::debug;

pub use path::XmlPath;
pub use render::render;

use crate::{CanonicalForm, Canonicalize, CompareError, CompareOptions, ParseError};

/// An XML document handed to the comparator.
#[derive(Clone, Copy, Debug)]
pub enum XmlInput<'a, 'input> {
    /// Raw XML text; its root element is compared.
    Text(&'a str),
    /// An element of an already-parsed document.
    Element(Node<'a, 'input>),
}

impl<'a> From<&'a str> for XmlInput<'a, '_> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a, 'input> From<Node<'a, 'input>> for XmlInput<'a, 'input> {
    fn from(value: Node<'a, 'input>) -> Self {
        Self::Element(value)
    }
}

/// Parses XML text. DTDs are accepted; entity expansion stays bounded by the
/// parser's own limits.
///
/// ```
/// let doc = structeq_core::xml::parse_document("<a b='1'/>")?;
/// assert_eq!(doc.root_element().attribute("b"), Some("1"));
/// # Ok::<(), structeq_core::ParseError>(())
/// ```
pub fn parse_document(text: &str) -> Result<Document<'_>, ParseError> {
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    Ok(Document::parse_with_options(text, options)?)
}

impl Canonicalize for XmlInput<'_, '_> {
    type Query = XmlPath;

    fn canonical_form(&self, options: &CompareOptions) -> Result<CanonicalForm, CompareError> {
        match *self {
            Self::Text(text) => {
                let doc = parse_document(text)?;
                canonicalize(doc.root_element(), options)
            }
            Self::Element(node) => canonicalize(node, options),
        }
    }

    fn canonical_selection(
        &self,
        query: &XmlPath,
        options: &CompareOptions,
    ) -> Result<Vec<CanonicalForm>, CompareError> {
        match *self {
            Self::Text(text) => {
                let doc = parse_document(text)?;
                canonical_selection(doc.root_element(), query, options)
            }
            Self::Element(node) => canonical_selection(require_element(node)?, query, options),
        }
    }
}

fn canonical_selection(
    root: Node<'_, '_>,
    query: &XmlPath,
    options: &CompareOptions,
) -> Result<Vec<CanonicalForm>, CompareError> {
    select(root, Some(query)).into_iter().map(|element| canonicalize(element, options)).collect()
}

/// Converts an element into its canonical form.
///
/// ```
/// # use structeq_core::{xml, CompareOptions};
/// let opts = CompareOptions::default();
/// let a = xml::parse_document(r#"<n a="1" b="2"><x/><y/></n>"#)?;
/// let b = xml::parse_document(r#"<n b="2" a="1"><y/><x/></n>"#)?;
/// assert_eq!(
///     xml::canonicalize(a.root_element(), &opts)?,
///     xml::canonicalize(b.root_element(), &opts)?,
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn canonicalize(
    element: Node<'_, '_>,
    options: &CompareOptions,
) -> Result<CanonicalForm, CompareError> {
    canonicalize_at(require_element(element)?, 1, options.max_depth())
}

fn canonicalize_at(
    element: Node<'_, '_>,
    depth: usize,
    limit: usize,
) -> Result<CanonicalForm, CompareError> {
    if depth > limit {
        return Err(CompareError::DepthExceeded { limit });
    }
    let attributes = element
        .attributes()
        .map(|attr| {
            let name = expanded(attr.namespace(), attr.name());
            CanonicalForm::labeled(name, CanonicalForm::from(attr.value()))
        })
        .collect();

    let mut children = Vec::new();
    for child in element.children().filter(Node::is_element) {
        children.push(canonicalize_at(child, depth + 1, limit)?);
    }
    children.sort();
    if let Some(text) = leading_text(element) {
        children.insert(0, CanonicalForm::from(text));
    }

    let tag = element.tag_name();
    Ok(CanonicalForm::ordered(vec![
        CanonicalForm::from(expanded(tag.namespace(), tag.name())),
        CanonicalForm::unordered(attributes),
        CanonicalForm::ordered(children),
    ]))
}

/// Selects the elements under `root` addressed by `query`.
///
/// Without a query `root` itself is the only subtree; otherwise every
/// matched element is one subtree.
///
/// ```
/// # use structeq_core::xml::{self, XmlPath};
/// let doc = xml::parse_document("<data><country/><country/></data>")?;
/// let query: XmlPath = "country".parse()?;
/// assert_eq!(xml::select(doc.root_element(), Some(&query)).len(), 2);
/// assert_eq!(xml::select(doc.root_element(), None).len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn select<'a, 'input>(
    root: Node<'a, 'input>,
    query: Option<&XmlPath>,
) -> Vec<Node<'a, 'input>> {
    let Some(query) = query else {
        return vec![root];
    };
    let matches = query.find(root);
    debug!(query = %query, matches = matches.len(), "evaluated XML path");
    matches
}

/// Text before the first child element, trimmed; `None` when blank.
///
/// Comments and processing instructions are skipped, so text on either side
/// of them joins up.
fn leading_text(element: Node<'_, '_>) -> Option<String> {
    let mut text = String::new();
    for child in element.children() {
        if child.is_element() {
            break;
        }
        if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn expanded(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(uri) => format!("{{{uri}}}{local}"),
        None => local.to_owned(),
    }
}

fn require_element<'a, 'input>(node: Node<'a, 'input>) -> Result<Node<'a, 'input>, CompareError> {
    if node.is_element() {
        return Ok(node);
    }
    let found = match node.node_type() {
        NodeType::Root => "document root",
        NodeType::Element => "element",
        NodeType::PI => "processing instruction",
        NodeType::Comment => "comment",
        NodeType::Text => "text node",
    };
    Err(CompareError::InvalidInputType { expected: "XML element", found: found.to_owned() })
}
