//! Order-independent structural comparison of JSON, YAML and XML documents.
//!
//! Every document is reduced to a [`CanonicalForm`] in which unordered
//! structure (object members, array elements, XML attributes and child
//! elements) is sorted, then hashed into a SHA-256 [`Fingerprint`]. Two
//! documents are equal when their fingerprints are; with a path query, the
//! subtrees selected from the first document must all appear among those
//! selected from the second.
//!
//! ```
//! use structeq_core::{compare_json, compare_xml};
//!
//! fn main() -> Result<(), structeq_core::CompareError> {
//!     assert!(compare_json(r#"{"a": 1, "b": [1, 2]}"#, r#"{"b": [2, 1], "a": 1}"#, None)?);
//!
//!     let part = r#"<data><country name="Panama"/></data>"#;
//!     let full = r#"<data><country name="Chile"/><country name="Panama"/></data>"#;
//!     assert!(compare_xml(part, full, Some("country"))?);
//!     assert!(!compare_xml(full, part, Some("country"))?);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod canonical;
mod compare;
mod document;
mod error;
mod fingerprint;
pub mod json;
mod number;
mod options;
pub mod xml;

pub use canonical::{CanonicalForm, Scalar};
pub use compare::{
    canonicalize, compare_json, compare_xml, documents_equivalent, documents_equivalent_scoped,
    Canonicalize, Comparator, ComparisonReport,
};
pub use document::{compare_text, fingerprints, render_text, select, Format};
pub use error::{CompareError, OptionsError, ParseError, QueryError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use json::render as render_json;
pub use number::Number;
pub use options::{CompareOptions, DEFAULT_MAX_DEPTH};
pub use xml::render as render_xml;

/// Returns the semantic version of the `structeq-core` crate.
///
/// ```
/// assert!(!structeq_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
