/*!
Turns raw source output into canonical subdomains
*/

use super::subdomain::{Subdomain, SubdomainSet, TargetDomain};

/// Marker that certificate and DNS sources use for wildcard names
pub const WILDCARD_MARKER: char = '*';

/// A cleaned candidate, classified by whether it names one host or many
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Concrete(Subdomain),
    Wildcard(Subdomain),
}

impl Candidate {
    pub fn subdomain(&self) -> &Subdomain {
        match self {
            Candidate::Concrete(s) | Candidate::Wildcard(s) => s,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Candidate::Wildcard(_))
    }

    /// Wildcards are in scope when the name they expand under is
    pub fn in_scope(&self, target: &TargetDomain) -> bool {
        match self {
            Candidate::Concrete(s) => target.covers(s.as_str()),
            Candidate::Wildcard(s) => {
                let name = s.as_str();
                let base = name.strip_prefix("*.").unwrap_or(name);
                target.covers(base)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    wildcard_marker: char,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            wildcard_marker: WILDCARD_MARKER,
        }
    }
}

impl Normalizer {
    pub fn new(wildcard_marker: char) -> Self {
        Self { wildcard_marker }
    }

    /// Trim, drop a trailing root dot and lowercase. Blank names and names with inner
    /// whitespace are rejected.
    pub fn normalize(&self, raw: &str) -> Option<Candidate> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }

        let subdomain = Subdomain::from_canonical(trimmed.to_lowercase());
        if trimmed.contains(self.wildcard_marker) {
            Some(Candidate::Wildcard(subdomain))
        } else {
            Some(Candidate::Concrete(subdomain))
        }
    }

    /// Normalize a batch of lines into one set, ignoring the concrete/wildcard split.
    /// Used when reading back files this tool wrote.
    pub fn collect_lines<'a, I>(&self, lines: I) -> SubdomainSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| self.normalize(line))
            .map(|candidate| match candidate {
                Candidate::Concrete(s) | Candidate::Wildcard(s) => s,
            })
            .collect()
    }
}
