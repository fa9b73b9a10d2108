/*!
Hostname types shared by every stage of a run
*/

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized hostname. Only the normalizer creates these, so the inner string is always
/// trimmed, non-empty and lowercase. Serialize-only: deserializing would skip normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Subdomain(String);

impl Subdomain {
    pub(crate) fn from_canonical(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An apex domain the operator asked us to enumerate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDomain(String);

impl TargetDomain {
    /// Returns `None` for blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `name` is this domain or nested beneath it
    pub fn covers(&self, name: &str) -> bool {
        name == self.0
            || name
                .strip_suffix(self.0.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique subdomains, kept sorted so written files are stable between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubdomainSet(BTreeSet<Subdomain>);

impl SubdomainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the name was not already present
    pub fn insert(&mut self, subdomain: Subdomain) -> bool {
        self.0.insert(subdomain)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subdomain> {
        self.0.iter()
    }

    /// Union in place
    pub fn merge(&mut self, other: SubdomainSet) {
        self.0.extend(other.0);
    }

    /// Names present here but absent from `baseline`
    pub fn difference(&self, baseline: &SubdomainSet) -> SubdomainSet {
        Self(self.0.difference(&baseline.0).cloned().collect())
    }

    /// One name per line, sorted, with a trailing newline when non-empty
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for subdomain in &self.0 {
            out.push_str(subdomain.as_str());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Subdomain> for SubdomainSet {
    fn from_iter<I: IntoIterator<Item = Subdomain>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Subdomain> for SubdomainSet {
    fn extend<I: IntoIterator<Item = Subdomain>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for SubdomainSet {
    type Item = Subdomain;
    type IntoIter = std::collections::btree_set::IntoIter<Subdomain>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SubdomainSet {
    type Item = &'a Subdomain;
    type IntoIter = std::collections::btree_set::Iter<'a, Subdomain>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
