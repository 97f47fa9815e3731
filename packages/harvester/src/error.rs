//! Error types for the harvester.
//!
//! Harvest-level failures (transport, malformed responses, protocol errors)
//! abort a whole harvest call. Document-level failures (missing identifier,
//! unresolvable article URL, missing date) only affect the record or
//! document they were raised for.

use thiserror::Error;

use crate::types::MetadataFormat;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// The remote could not be reached or the body could not be read.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success status.
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Response body exceeded the configured limit.
    #[error("Response from {url} is {size} bytes, limit is {limit}")]
    ResponseTooLarge { url: String, size: u64, limit: u64 },

    /// A harvested page is not well-formed XML.
    #[error("Malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: roxmltree::Error,
    },

    /// XML parsing of a stored document failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The repository reported an OAI-PMH error.
    #[error("OAI-PMH error '{code}': {message}")]
    OaiProtocol { code: String, message: String },

    /// Pagination went past the page ceiling.
    #[error("Harvest exceeded the limit of {limit} pages")]
    PageLimitExceeded { limit: usize },

    /// The repository issued a token that was already followed.
    #[error("Repository repeated resumption token '{token}'")]
    RepeatedResumptionToken { token: String },

    /// A harvested record has no header identifier.
    #[error("Record in {format} harvest has no header identifier")]
    MissingIdentifier { format: MetadataFormat },

    /// Neither schema yields an article URL.
    #[error("Cannot derive an article URL for {doc_id}")]
    UnresolvableIdentifier { doc_id: String },

    /// Neither schema yields a creation date.
    #[error("No creation date found for {doc_id}")]
    MissingDate { doc_id: String },

    /// Invalid selector path.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Endpoint is not a usable URL.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Invalid date format.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD (e.g., 2025-01-01)")]
    InvalidDate(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Whether the error only concerns a single record or document.
    ///
    /// Batch callers use this to keep going past bad records.
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentifier { .. }
                | Self::UnresolvableIdentifier { .. }
                | Self::MissingDate { .. }
                | Self::XmlParse(_)
        )
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
