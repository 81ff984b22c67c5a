use std::fmt;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::CanonicalForm;

/// A SHA-256 digest of a canonical form's byte encoding.
///
/// Fingerprints are pure functions of content, so they can be compared
/// across calls, processes, and machines.
///
/// ```
/// # use structeq_core::{fingerprint, CanonicalForm};
/// let a = fingerprint(&CanonicalForm::from("station"));
/// let b = fingerprint(&CanonicalForm::from("station"));
/// assert_eq!(a, b);
/// assert_eq!(a.to_string().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hashes an arbitrary byte string.
    ///
    /// ```
    /// # use structeq_core::Fingerprint;
    /// assert_eq!(Fingerprint::of_bytes(b"abc"), Fingerprint::of_bytes(b"abc"));
    /// ```
    #[must_use]
    pub fn of_bytes(input: &[u8]) -> Self {
        Self(Sha256::digest(input).into())
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Computes the fingerprint of a canonical form.
#[must_use]
pub fn fingerprint(form: &CanonicalForm) -> Fingerprint {
    Fingerprint::of_bytes(&form.to_canonical_bytes())
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Serializes as the lowercase hex digest.
impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
