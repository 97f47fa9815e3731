//! Core data types for the harvester.
//!
//! Records travel through three shapes: a [`RawRecord`] straight off a
//! ListRecords page, a [`RawDocument`] ready to be handed to storage, and a
//! [`CanonicalRecord`] produced by the normalizer.

use std::fmt;

use roxmltree::Document;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata formats offered by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    /// Full JATS archive-article markup (`metadataPrefix=pmc`).
    Jats,

    /// Flat Dublin Core (`metadataPrefix=oai_dc`).
    DublinCore,
}

impl MetadataFormat {
    /// Formats in harvest order. JATS records come first in the output.
    pub const HARVEST_ORDER: [Self; 2] = [Self::Jats, Self::DublinCore];

    /// The OAI-PMH `metadataPrefix` value.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Jats => "pmc",
            Self::DublinCore => "oai_dc",
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One `<record>` element from a ListRecords response.
///
/// The XML is a standalone serialization of the record subtree: every
/// namespace in scope on the page is declared on the root element, so the
/// record can be parsed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Format of the query that produced the record.
    pub format: MetadataFormat,

    /// Serialized `<record>` element.
    pub xml: String,
}

impl RawRecord {
    /// Parse the record XML.
    pub fn parse(&self) -> Result<Document<'_>> {
        Ok(Document::parse(&self.xml)?)
    }
}

/// A harvested record ready for storage or normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Full XML document, including the XML declaration.
    pub doc: String,

    /// Source name (always [`crate::config::SOURCE_NAME`]).
    pub source: String,

    /// OAI header identifier (e.g., "oai:pubmedcentral.nih.gov:1234567").
    pub doc_id: String,

    /// Declared file type (always [`crate::config::FILETYPE`]).
    pub filetype: String,
}

/// A contributor to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Display name; "surname, given-names" for JATS records.
    pub full_name: String,

    /// E-mail address, empty when unknown.
    pub email: String,
}

impl Contributor {
    /// Contributor without an e-mail address.
    #[must_use]
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: String::new(),
        }
    }
}

/// Identifiers of a normalized article. Empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    /// Resolvable article URL. Never empty in a normalized record.
    pub url: String,

    /// DOI without resolver prefix.
    pub doi: String,

    /// PubMed identifier.
    pub pmid: String,

    /// OAI header identifier of the harvested record.
    pub service_id: String,
}

/// The normalized, schema-independent shape of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub title: String,
    pub contributors: Vec<Contributor>,
    pub description: String,
    pub id: Identifiers,
    pub tags: Vec<String>,
    pub date_created: String,
    pub source: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_prefixes() {
        assert_eq!(MetadataFormat::Jats.prefix(), "pmc");
        assert_eq!(MetadataFormat::DublinCore.prefix(), "oai_dc");
        assert_eq!(MetadataFormat::DublinCore.to_string(), "oai_dc");
    }

    #[test]
    fn test_harvest_order_puts_jats_first() {
        assert_eq!(
            MetadataFormat::HARVEST_ORDER,
            [MetadataFormat::Jats, MetadataFormat::DublinCore]
        );
    }

    #[test]
    fn test_raw_record_parse() {
        let record = RawRecord {
            format: MetadataFormat::Jats,
            xml: "<record><header/></record>".to_string(),
        };
        let doc = record.parse().unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "record");
    }

    #[test]
    fn test_canonical_record_serializes_id_key() {
        let record = CanonicalRecord {
            title: "T".to_string(),
            contributors: vec![Contributor::named("Doe, Jane")],
            description: "D".to_string(),
            id: Identifiers {
                url: "http://dx.doi.org/10.1/x".to_string(),
                doi: "10.1/x".to_string(),
                pmid: String::new(),
                service_id: "oai:x:1".to_string(),
            },
            tags: Vec::new(),
            date_created: "2020-03-07".to_string(),
            source: "pubmedcentral".to_string(),
            timestamp: "2020-03-08T00:00:00".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"]["doi"], "10.1/x");
        assert_eq!(value["contributors"][0]["email"], "");
    }
}
