//! Normalization of harvested records into [`CanonicalRecord`]s.
//!
//! Each field is resolved by a [`FieldChain`]: Dublin Core extractors first,
//! JATS archive-article extractors second. Title, contributors, description
//! and tags degrade to sentinel or empty values; the article URL and the
//! creation date are required.

mod chain;
mod fields;

pub use chain::{Extractor, FieldChain};
pub use fields::{
    clean_tag, contributor_chain, date_chain, description_chain, identifier_chain, tag_chain,
    title_chain, ArticleIds, DcCreators, DcIdentifiers, FirstText, JatsArticleIds,
    JatsContributors, JatsDate, JatsKeywords, JoinedText, DOI_URL_PREFIX, PUBMED_URL_PREFIX,
};

use roxmltree::Document;

use crate::config::SOURCE_NAME;
use crate::error::{HarvesterError, Result};
use crate::types::{CanonicalRecord, Contributor, Identifiers, RawDocument};
use crate::xml::{first_non_blank, Namespaces, Selector};

/// Title used when neither schema has one.
pub const NO_TITLE: &str = "No title available.";

/// Description used when neither schema has one.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Contributor name used when neither schema lists anyone.
pub const NO_CONTRIBUTORS: &str = "no contributors";

/// Field resolver for raw documents.
pub struct Normalizer {
    title: FieldChain<String>,
    contributors: FieldChain<Vec<Contributor>>,
    description: FieldChain<String>,
    identifiers: FieldChain<ArticleIds>,
    tags: FieldChain<Vec<String>>,
    date_created: FieldChain<String>,
    contributor_names: [Selector; 2],
}

impl Normalizer {
    /// Build every field chain against a namespace table.
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            title: title_chain(namespaces)?,
            contributors: contributor_chain(namespaces)?,
            description: description_chain(namespaces)?,
            identifiers: identifier_chain(namespaces)?,
            tags: tag_chain(namespaces)?,
            date_created: date_chain(namespaces)?,
            contributor_names: [
                Selector::compile("//dc:creator", namespaces)?,
                Selector::compile("//arch:contrib/arch:name/arch:surname", namespaces)?,
            ],
        })
    }

    /// Normalize one raw document.
    ///
    /// The result depends only on `raw` and `timestamp`.
    ///
    /// # Errors
    /// * `XmlParse` if the document is not XML
    /// * `UnresolvableIdentifier` if no article URL can be derived
    /// * `MissingDate` if neither schema carries a creation date
    pub fn normalize(&self, raw: &RawDocument, timestamp: &str) -> Result<CanonicalRecord> {
        let doc = Document::parse(&raw.doc)?;

        let ids = self.identifiers.resolve(&doc).ok_or_else(|| {
            HarvesterError::UnresolvableIdentifier {
                doc_id: raw.doc_id.clone(),
            }
        })?;

        let date_created = self
            .date_created
            .resolve(&doc)
            .ok_or_else(|| HarvesterError::MissingDate {
                doc_id: raw.doc_id.clone(),
            })?;

        let title = self.title.resolve(&doc).unwrap_or_else(|| {
            tracing::debug!(doc_id = %raw.doc_id, "No title in either schema");
            NO_TITLE.to_string()
        });

        let contributors = self
            .contributors
            .resolve(&doc)
            .unwrap_or_else(|| vec![Contributor::named(NO_CONTRIBUTORS)]);

        let description = self
            .description
            .resolve(&doc)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Ok(CanonicalRecord {
            title,
            contributors,
            description,
            id: Identifiers {
                url: ids.url,
                doi: ids.doi,
                pmid: ids.pmid,
                service_id: raw.doc_id.clone(),
            },
            tags: self.tags.resolve(&doc).unwrap_or_default(),
            date_created,
            source: SOURCE_NAME.to_string(),
            timestamp: timestamp.to_string(),
        })
    }

    /// Normalize a batch, collecting per-document failures instead of
    /// stopping at the first one.
    pub fn normalize_all(
        &self,
        documents: &[RawDocument],
        timestamp: &str,
    ) -> (Vec<CanonicalRecord>, Vec<(String, HarvesterError)>) {
        let mut records = Vec::with_capacity(documents.len());
        let mut failures = Vec::new();

        for raw in documents {
            match self.normalize(raw, timestamp) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(doc_id = %raw.doc_id, error = %e, "Normalization failed");
                    failures.push((raw.doc_id.clone(), e));
                }
            }
        }

        (records, failures)
    }

    /// Whether either schema names at least one contributor: a
    /// `dc:creator` or a JATS `contrib/name/surname` with text.
    #[must_use]
    pub fn has_contributors(&self, doc: &Document<'_>) -> bool {
        self.contributor_names
            .iter()
            .any(|selector| first_non_blank(&selector.select(doc.root())).is_some())
    }
}

/// Normalize one raw document with the default namespace table.
pub fn normalize(raw: &RawDocument, timestamp: &str) -> Result<CanonicalRecord> {
    Normalizer::new(&Namespaces::default())?.normalize(raw, timestamp)
}
