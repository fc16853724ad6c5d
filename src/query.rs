use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Matches a "featuring" annotation, e.g. ` feat.`, ` (ft `, `FEAT`
static FEATURING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\(?\b(?:feat|ft)\b").unwrap());

/// A cleaned search term. May be empty; callers decide whether that is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTerm(String);

impl NormalizedTerm {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encoded (spaces as `%20`), for upstreams that take the term inside the URL path
    pub fn as_path_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for NormalizedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns whatever a caller typed (or pasted) into a catalog search term.
#[derive(Debug, Clone, Default)]
pub struct QueryNormalizer {
    site_prefixes: Vec<String>,
}

impl QueryNormalizer {
    pub fn new(site_prefixes: Vec<String>) -> Self {
        Self { site_prefixes }
    }

    pub fn normalize(&self, raw: &str) -> NormalizedTerm {
        let decoded = raw.replace('+', " ").replace("%26", "&");
        let mut term = decoded.trim();

        if let Some(rest) = self
            .site_prefixes
            .iter()
            .find_map(|prefix| term.strip_prefix(prefix.as_str()))
        {
            term = rest;
        }

        let head = match FEATURING.find(term) {
            Some(m) => &term[..m.start()],
            None => term,
        };

        NormalizedTerm(head.trim().to_string())
    }
}
