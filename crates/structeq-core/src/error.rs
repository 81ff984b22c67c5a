use thiserror::Error;

/// Top-level error returned by canonicalization, selection, and comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The input document could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The input was handed in as an already-parsed tree of the wrong kind.
    #[error("invalid input: expected {expected}, found {found}")]
    InvalidInputType {
        /// What the pipeline accepts at this position.
        expected: &'static str,
        /// A description of what was supplied instead.
        found: String,
    },
    /// The path query could not be parsed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The document nests deeper than
    /// [`CompareOptions::max_depth`](crate::CompareOptions::max_depth).
    #[error("document nesting exceeds the configured limit of {limit}")]
    DepthExceeded {
        /// The limit that was hit.
        limit: usize,
    },
}

/// Errors that can occur while parsing external data into a tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The provided JSON input was invalid.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The provided YAML input was invalid.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The provided XML input was invalid.
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    /// YAML maps may only contain string keys.
    #[error("unsupported YAML key type: {found}")]
    NonStringYamlKey {
        /// A description of the key that triggered the error.
        found: String,
    },
    /// YAML tags have no JSON counterpart.
    #[error("unsupported YAML tag: {tag}")]
    UnsupportedYamlTag {
        /// The tag identifier encountered in the document.
        tag: String,
    },
    /// Encountered a number that cannot be represented by [`Number`](crate::Number).
    #[error("number {value} cannot be represented")]
    NumberOutOfRange {
        /// The textual representation of the offending number.
        value: String,
    },
    /// Attempted to construct a [`Number`](crate::Number) that is not finite.
    #[error("non-finite number encountered: {value}")]
    NotFinite {
        /// The offending numeric value.
        value: f64,
    },
}

/// A malformed path expression.
///
/// ```
/// # use structeq_core::json::JsonPath;
/// let err = "$.a[".parse::<JsonPath>().unwrap_err();
/// assert_eq!(err.position(), 4);
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path query at offset {position}: {message}")]
pub struct QueryError {
    position: usize,
    message: String,
}

impl QueryError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }

    /// Byte offset into the expression where parsing failed.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Human readable description of the problem.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors emitted when constructing [`CompareOptions`](crate::CompareOptions).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// The nesting limit must allow at least the root node.
    #[error("max depth must be at least 1")]
    ZeroDepth,
}
