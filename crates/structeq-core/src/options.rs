use serde::{Deserialize, Serialize};

use crate::OptionsError;

/// Nesting limit applied when no other value is configured.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration knobs passed to canonicalization and comparison.
///
/// ```
/// # use structeq_core::CompareOptions;
/// let opts: CompareOptions = serde_yaml::from_str("max_depth: 64").unwrap();
/// assert_eq!(opts.max_depth(), 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareOptions {
    max_depth: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

impl CompareOptions {
    /// Returns the maximum nesting depth canonicalization accepts.
    ///
    /// ```
    /// # use structeq_core::{CompareOptions, DEFAULT_MAX_DEPTH};
    /// assert_eq!(CompareOptions::default().max_depth(), DEFAULT_MAX_DEPTH);
    /// ```
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Sets the maximum nesting depth.
    ///
    /// ```
    /// # use structeq_core::CompareOptions;
    /// let opts = CompareOptions::default().with_max_depth(8).expect("valid depth");
    /// assert_eq!(opts.max_depth(), 8);
    /// assert!(CompareOptions::default().with_max_depth(0).is_err());
    /// ```
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self, OptionsError> {
        self.max_depth = max_depth;
        self.validate()?;
        Ok(self)
    }

    /// Checks invariants that deserialization cannot express.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_depth == 0 {
            return Err(OptionsError::ZeroDepth);
        }
        Ok(())
    }
}
