//! Version tags and version resolution
//!
//! A version tag has the form `v<integer>` and tags are ordered by that
//! integer, so `v10` sorts after `v9`. A request for `latest` resolves
//! against the tags one store (or one composition of stores) knows about.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{RepoError, RepoResult};

/// Symbolic version that resolves to the highest available tag
pub const LATEST: &str = "latest";

/// A concrete `v<integer>` version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(u64);

impl VersionTag {
    /// Create a tag from its integer value
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// The embedded integer
    pub fn number(&self) -> u64 {
        self.0
    }

    /// Parse a single path or key segment, returning `None` unless the whole
    /// segment is `v` followed by digits in canonical form.
    ///
    /// Leading zeros are rejected so that every accepted segment renders back
    /// to itself: stores rebuild paths and keys from the tag.
    pub fn from_segment(segment: &str) -> Option<Self> {
        let digits = segment.strip_prefix('v')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_segment(s).ok_or_else(|| RepoError::InvalidVersion(s.to_string()))
    }
}

impl TryFrom<String> for VersionTag {
    type Error = RepoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.to_string()
    }
}

/// A requested version: either `latest` or a concrete tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionSpec {
    /// Highest tag available at lookup time
    #[default]
    Latest,
    /// A specific tag
    Exact(VersionTag),
}

impl VersionSpec {
    /// Whether this is the symbolic `latest` request
    pub fn is_latest(&self) -> bool {
        matches!(self, VersionSpec::Latest)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str(LATEST),
            VersionSpec::Exact(tag) => tag.fmt(f),
        }
    }
}

impl FromStr for VersionSpec {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == LATEST {
            Ok(VersionSpec::Latest)
        } else {
            s.parse().map(VersionSpec::Exact)
        }
    }
}

impl From<VersionTag> for VersionSpec {
    fn from(tag: VersionTag) -> Self {
        VersionSpec::Exact(tag)
    }
}

/// Deduplicate tags and return them in ascending order.
pub fn sorted_versions<I>(tags: I) -> Vec<VersionTag>
where
    I: IntoIterator<Item = VersionTag>,
{
    tags.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Extract version tags from raw locations. Locations that carry no
/// parseable version are skipped.
pub fn versions_from_locations<I, F>(locations: I, extract: F) -> Vec<VersionTag>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Option<VersionTag>,
{
    sorted_versions(locations.into_iter().filter_map(extract))
}

/// Resolve a version request against the tags known for `name`.
///
/// `latest` picks the highest tag and fails with not-found when there are
/// none; an exact request is returned unchanged without checking presence.
pub fn resolve_version(
    name: &str,
    spec: VersionSpec,
    available: &[VersionTag],
) -> RepoResult<VersionTag> {
    match spec {
        VersionSpec::Exact(tag) => Ok(tag),
        VersionSpec::Latest => available
            .iter()
            .max()
            .copied()
            .ok_or_else(|| RepoError::not_found(name, spec)),
    }
}
