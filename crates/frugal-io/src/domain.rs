//! Domain types for frugal-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_word_characters() {
        let name = ExperimentName::new("heart_v2-test".into()).unwrap();
        assert_eq!(name.as_str(), "heart_v2-test");
        assert_eq!(name.to_string(), "heart_v2-test");
    }

    #[test]
    fn rejects_empty_and_path_characters() {
        for bad in ["", "../out", "a b", "x.json"] {
            let err = ExperimentName::new(bad.into()).unwrap_err();
            assert!(matches!(err, IoError::InvalidExperimentName { .. }), "{bad}");
        }
    }
}
