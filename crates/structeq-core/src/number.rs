use std::cmp::Ordering;
use std::fmt;

use serde_json::Number as JsonNumber;

use crate::ParseError;

/// A numeric scalar that keeps the integer/float distinction of its source.
///
/// `1` and `1.0` are different scalars: the comparison engine never
/// unifies values that were written differently in the document.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    /// Any integer representable as `i64` or `u64`.
    Integer(i128),
    /// A finite IEEE-754 double.
    Float(f64),
}

impl Number {
    /// Creates a float [`Number`] after validating finiteness.
    ///
    /// ```
    /// # use structeq_core::Number;
    /// let num = Number::float(4.5)?;
    /// assert_eq!(num.as_f64(), 4.5);
    /// assert!(Number::float(f64::NAN).is_err());
    /// # Ok::<(), structeq_core::ParseError>(())
    /// ```
    pub fn float(value: f64) -> Result<Self, ParseError> {
        if value.is_finite() {
            Ok(Self::Float(value))
        } else {
            Err(ParseError::NotFinite { value })
        }
    }

    /// Converts a `serde_json` number, preferring the integer representation.
    pub fn from_json_number(num: &JsonNumber) -> Result<Self, ParseError> {
        if let Some(i) = num.as_i64() {
            return Ok(Self::Integer(i128::from(i)));
        }
        if let Some(u) = num.as_u64() {
            return Ok(Self::Integer(i128::from(u)));
        }
        match num.as_f64() {
            Some(f) => Self::float(f),
            None => Err(ParseError::NumberOutOfRange { value: num.to_string() }),
        }
    }

    /// Returns the value as a double, rounding large integers.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub(crate) fn write_canonical(self, out: &mut Vec<u8>) {
        match self {
            Self::Integer(i) => {
                out.push(b'i');
                out.extend_from_slice(&i.to_le_bytes());
            }
            Self::Float(f) => {
                out.push(b'f');
                out.extend_from_slice(&f.to_bits().to_le_bytes());
            }
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(&b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(&b),
            (Self::Integer(a), Self::Float(b)) => {
                cmp_integer_float(a, b).then(Ordering::Less)
            }
            (Self::Float(a), Self::Integer(b)) => {
                cmp_integer_float(b, a).reverse().then(Ordering::Greater)
            }
        }
    }
}

/// Exact numeric comparison of an integer against a finite float.
fn cmp_integer_float(int: i128, float: f64) -> Ordering {
    // 2^127: every float below it in magnitude truncates into i128 exactly.
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    #[allow(clippy::cast_possible_truncation)]
    let truncated = whole as i128;
    int.cmp(&truncated).then_with(|| {
        let fraction = float - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_float_are_distinct() {
        assert_ne!(Number::Integer(1), Number::Float(1.0));
        assert!(Number::Integer(1) < Number::Float(1.0));
    }

    #[test]
    fn order_is_numeric_across_kinds() {
        let mut values = vec![
            Number::Float(2.5),
            Number::Integer(-3),
            Number::Integer(10),
            Number::Float(-0.5),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Number::Integer(-3),
                Number::Float(-0.5),
                Number::Float(2.5),
                Number::Integer(10),
            ]
        );
    }

    #[test]
    fn integers_beyond_float_precision_order_exactly() {
        let two_53 = 9_007_199_254_740_992_i128;
        assert!(Number::Integer(two_53 + 1) > Number::Float(9_007_199_254_740_992.0));
        assert!(Number::Float(9_007_199_254_740_992.0) < Number::Integer(two_53 + 1));
        assert!(Number::Integer(two_53 - 1) < Number::Float(9_007_199_254_740_992.0));
        assert!(Number::Integer(2) < Number::Float(2.5));
        assert!(Number::Integer(-2) > Number::Float(-2.5));
        assert!(Number::Integer(i128::from(u64::MAX)) < Number::Float(1e300));
        assert!(Number::Integer(i128::from(i64::MIN)) > Number::Float(-1e300));
    }

    #[test]
    fn large_unsigned_integers_survive() {
        let json: JsonNumber = serde_json::from_str("18446744073709551615").unwrap();
        let num = Number::from_json_number(&json).unwrap();
        assert_eq!(num, Number::Integer(i128::from(u64::MAX)));
        assert_ne!(num, Number::Integer(i128::from(u64::MAX) - 1));
    }

    #[test]
    fn display_keeps_float_marker() {
        assert_eq!(Number::Integer(7).to_string(), "7");
        assert_eq!(Number::Float(7.0).to_string(), "7.0");
    }
}
