//! The order-independent tree every document is normalized into.
//!
//! A [`CanonicalForm`] is built once per comparison call, then fingerprinted.
//! Unordered collections (object members, array elements, XML attributes and
//! child elements) are stored as sorted [`CanonicalForm::Sequence`]s so that
//! two inputs carrying the same information in a different order produce
//! identical forms.

use std::fmt;

use crate::Number;

/// A leaf value. Strings are atomic: their characters are never reordered.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string, XML tag name, attribute value, or element text.
    String(String),
}

/// The normalized representation of a document or subtree.
///
/// The derived ordering is the canonical total order: scalars sort before
/// labels, labels before sequences; within a variant values compare
/// structurally (`(key, value)` for labels, element by element for
/// sequences). Sorting therefore never fails on heterogeneous content.
///
/// ```
/// # use structeq_core::CanonicalForm;
/// let lhs = CanonicalForm::unordered(vec![CanonicalForm::from(2), CanonicalForm::from("a")]);
/// let rhs = CanonicalForm::unordered(vec![CanonicalForm::from("a"), CanonicalForm::from(2)]);
/// assert_eq!(lhs, rhs);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanonicalForm {
    /// A leaf value.
    Scalar(Scalar),
    /// A named member: JSON object entry or XML attribute.
    Labeled(String, Box<CanonicalForm>),
    /// An ordered list of forms.
    Sequence(Vec<CanonicalForm>),
}

const TAG_NULL: u8 = b'n';
const TAG_BOOL: u8 = b'b';
const TAG_STRING: u8 = b's';
const TAG_LABELED: u8 = b'l';
const TAG_SEQUENCE: u8 = b'q';

impl CanonicalForm {
    /// Builds a sequence from an unordered collection by sorting it.
    #[must_use]
    pub fn unordered(mut items: Vec<CanonicalForm>) -> Self {
        items.sort();
        Self::Sequence(items)
    }

    /// Builds a sequence whose order is significant and kept as given.
    #[must_use]
    pub fn ordered(items: Vec<CanonicalForm>) -> Self {
        Self::Sequence(items)
    }

    /// Builds a labeled member.
    #[must_use]
    pub fn labeled(key: impl Into<String>, value: CanonicalForm) -> Self {
        Self::Labeled(key.into(), Box::new(value))
    }

    /// Returns the sequence items when this form is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[CanonicalForm]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Serializes the form into the byte stream that fingerprints are computed from.
    ///
    /// The encoding is prefix-free: every variant starts with a tag byte and
    /// every variable-length part carries a little-endian `u64` length, so
    /// distinct forms never share an encoding.
    ///
    /// ```
    /// # use structeq_core::CanonicalForm;
    /// let bytes = CanonicalForm::from("ab").to_canonical_bytes();
    /// assert_eq!(bytes[0], b's');
    /// assert_eq!(&bytes[9..], b"ab");
    /// ```
    #[must_use]
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Self::Scalar(Scalar::Null) => out.push(TAG_NULL),
            Self::Scalar(Scalar::Bool(value)) => {
                out.push(TAG_BOOL);
                out.push(u8::from(*value));
            }
            Self::Scalar(Scalar::Number(number)) => number.write_canonical(out),
            Self::Scalar(Scalar::String(text)) => {
                out.push(TAG_STRING);
                write_str(text, out);
            }
            Self::Labeled(key, value) => {
                out.push(TAG_LABELED);
                write_str(key, out);
                value.write_canonical(out);
            }
            Self::Sequence(items) => {
                out.push(TAG_SEQUENCE);
                write_len(items.len(), out);
                for item in items {
                    item.write_canonical(out);
                }
            }
        }
    }
}

fn write_len(len: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

fn write_str(text: &str, out: &mut Vec<u8>) {
    write_len(text.len(), out);
    out.extend_from_slice(text.as_bytes());
}

impl From<Scalar> for CanonicalForm {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for CanonicalForm {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_owned()))
    }
}

impl From<String> for CanonicalForm {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::String(value))
    }
}

impl From<bool> for CanonicalForm {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for CanonicalForm {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Number(Number::Integer(i128::from(value))))
    }
}

impl From<Number> for CanonicalForm {
    fn from(value: Number) -> Self {
        Self::Scalar(Scalar::Number(value))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::String(text) => write!(f, "{text:?}"),
        }
    }
}

/// Renders the form in a compact list/tuple notation, e.g. `[("a", 1), ("b", [2, 3])]`.
impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Labeled(key, value) => write!(f, "({key:?}, {value})"),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_rank_orders_mixed_content() {
        let form = CanonicalForm::unordered(vec![
            CanonicalForm::ordered(vec![]),
            CanonicalForm::labeled("k", CanonicalForm::from(1)),
            CanonicalForm::from("x"),
            CanonicalForm::from(3),
            CanonicalForm::from(true),
            CanonicalForm::Scalar(Scalar::Null),
        ]);
        assert_eq!(form.to_string(), "[null, true, 3, \"x\", (\"k\", 1), []]");
    }

    #[test]
    fn labels_sort_by_key_then_value() {
        let form = CanonicalForm::unordered(vec![
            CanonicalForm::labeled("b", CanonicalForm::from(1)),
            CanonicalForm::labeled("a", CanonicalForm::from(2)),
            CanonicalForm::labeled("a", CanonicalForm::from(1)),
        ]);
        assert_eq!(form.to_string(), "[(\"a\", 1), (\"a\", 2), (\"b\", 1)]");
    }

    #[test]
    fn encoding_separates_adjacent_strings() {
        let pair = |a: &str, b: &str| {
            CanonicalForm::ordered(vec![CanonicalForm::from(a), CanonicalForm::from(b)])
        };
        let (joined, split) = (pair("ab", "c"), pair("a", "bc"));
        assert_ne!(joined.to_canonical_bytes(), split.to_canonical_bytes());
    }

    #[test]
    fn label_differs_from_pair_sequence() {
        let label = CanonicalForm::labeled("a", CanonicalForm::from(1));
        let pair = CanonicalForm::ordered(vec![CanonicalForm::from("a"), CanonicalForm::from(1)]);
        assert_ne!(label, pair);
        assert_ne!(label.to_canonical_bytes(), pair.to_canonical_bytes());
    }
}
