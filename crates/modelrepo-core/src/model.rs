//! Model identity types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RepoError, RepoResult};
use crate::version::VersionTag;

/// Resolved identity of one model artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    /// Model name (e.g., "cat_dog_other_classifier")
    pub name: String,
    /// Concrete version tag
    pub version: VersionTag,
}

impl ModelKey {
    /// Create a new model key
    pub fn new(name: impl Into<String>, version: VersionTag) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Key used by in-memory caches (`name:version`)
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Check that a model name can be used as a single directory or key segment.
pub fn validate_model_name(name: &str) -> RepoResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if invalid {
        return Err(RepoError::InvalidModelName(name.to_string()));
    }
    Ok(())
}
