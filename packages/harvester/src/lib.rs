//! PMC Harvester - Harvest PubMed Central metadata over OAI-PMH.
//!
//! Records are harvested in two metadata formats (JATS archive-article and
//! Dublin Core), wrapped as raw XML documents, and normalized into one
//! canonical record shape.
//!
//! # Example
//!
//! ```
//! use pmc_harvester::config::{list_records_url, TimeWindow};
//! use pmc_harvester::types::MetadataFormat;
//!
//! let window = TimeWindow::since(chrono::NaiveDate::from_ymd_opt(2020, 3, 7).unwrap());
//! let url = list_records_url("http://example.org/oai", MetadataFormat::Jats, &window).unwrap();
//! assert!(url.ends_with("metadataPrefix=pmc&from=2020-03-07"));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, harvest settings, time window and URL building
//! - [`types`]: Raw records, raw documents and canonical records
//! - [`error`]: Error types and Result alias
//! - [`http`]: Fetcher trait and HTTP implementation
//! - [`xml`]: Namespace tables, path queries and serialization
//! - [`client`]: Paginated ListRecords client
//! - [`harvester`]: Harvest orchestration across metadata formats
//! - [`normalize`]: Field extraction chains and the normalizer
//! - [`output`]: YAML/JSON rendering
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod normalize;
pub mod output;
pub mod types;
pub mod xml;

// Re-export main functions
pub use harvester::{harvest, Harvester};
pub use normalize::{normalize, Normalizer};

// Re-export commonly used items
pub use config::{HarvestConfig, TimeWindow};
pub use error::{HarvesterError, Result};
pub use types::{CanonicalRecord, Contributor, Identifiers, MetadataFormat, RawDocument, RawRecord};
