//! Prefix table for namespace-qualified path queries.

use std::collections::BTreeMap;

/// Dublin Core elements.
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// OAI-PMH envelope: records, headers, identifiers, resumption tokens.
pub const OAI_NS: &str = "http://www.openarchives.org/OAI/2.0/";

/// OAI Dublin Core container element.
pub const OAI_DC_NS: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";

/// PMC archive-article (JATS) markup.
pub const ARCHIVE_NS: &str = "http://dtd.nlm.nih.gov/2.0/xsd/archivearticle";

/// Mapping from query prefixes to namespace URIs.
///
/// Prefixes only exist on the query side; documents may use any prefix (or
/// a default namespace) for the same URI.
///
/// # Examples
/// ```
/// use pmc_harvester::xml::{Namespaces, DC_NS};
///
/// let ns = Namespaces::default();
/// assert_eq!(ns.uri("dc"), Some(DC_NS));
/// assert_eq!(ns.uri("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    bindings: BTreeMap<String, String>,
}

impl Namespaces {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bind a prefix, replacing an earlier binding.
    #[must_use]
    pub fn bind(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.bindings.insert(prefix.into(), uri.into());
        self
    }

    /// Resolve a prefix.
    #[must_use]
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// All bindings, ordered by prefix.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }
}

impl Default for Namespaces {
    /// The bindings used by the harvester and normalizer:
    /// `dc`, `oai`, `oai_dc` and `arch`.
    fn default() -> Self {
        Self::new()
            .bind("dc", DC_NS)
            .bind("oai", OAI_NS)
            .bind("oai_dc", OAI_DC_NS)
            .bind("arch", ARCHIVE_NS)
    }
}
