//! Harvest orchestration: one paginated query per metadata format, merged,
//! filtered and wrapped as raw documents.

use roxmltree::Document;

use crate::client::HarvestClient;
use crate::config::{HarvestConfig, TimeWindow, FILETYPE, SOURCE_NAME, XML_DECLARATION};
use crate::error::{HarvesterError, Result};
use crate::http::{create_client, Fetcher, HttpFetcher};
use crate::normalize::Normalizer;
use crate::types::{MetadataFormat, RawDocument, RawRecord};
use crate::xml::{get_text, Selector};

/// Harvests every supported metadata format for a time window.
pub struct Harvester<F> {
    config: HarvestConfig,
    client: HarvestClient<F>,
    normalizer: Normalizer,
    header_identifier: Selector,
}

impl Harvester<HttpFetcher> {
    /// Harvester over HTTP with the limits in `config`.
    pub fn over_http(config: HarvestConfig) -> Result<Self> {
        let fetcher = HttpFetcher::with_client(create_client()?, config.max_response_size);
        Self::new(fetcher, config)
    }
}

impl<F: Fetcher> Harvester<F> {
    pub fn new(fetcher: F, config: HarvestConfig) -> Result<Self> {
        Ok(Self {
            client: HarvestClient::new(fetcher, &config)?,
            normalizer: Normalizer::new(&config.namespaces)?,
            header_identifier: Selector::compile("//oai:header/oai:identifier", &config.namespaces)?,
            config,
        })
    }

    /// Harvest records changed in the last `days_back` days.
    pub fn harvest(&self, days_back: u32) -> Result<Vec<RawDocument>> {
        self.harvest_window(&TimeWindow::from_days_back(days_back))
    }

    /// Harvest records changed since the start of `window`.
    ///
    /// JATS records come before Dublin Core records. Records without any
    /// contributor are dropped; records without a header identifier are
    /// skipped with a warning. Any transport or parse failure aborts the
    /// whole harvest.
    pub fn harvest_window(&self, window: &TimeWindow) -> Result<Vec<RawDocument>> {
        let mut records: Vec<RawRecord> = Vec::new();

        for format in MetadataFormat::HARVEST_ORDER {
            let url = self.config.list_records_url(format, window)?;
            tracing::info!(format = %format, from = %window.from_param(), "Harvesting");
            let harvested = self.client.fetch_all(&url, format)?;
            tracing::info!(format = %format, records = harvested.len(), "Harvested");
            records.extend(harvested);
        }

        let mut documents = Vec::with_capacity(records.len());
        for record in &records {
            match self.wrap_record(record) {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(e) if e.is_document_error() => {
                    tracing::warn!(error = %e, "Skipping record");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            harvested = records.len(),
            kept = documents.len(),
            "Harvest complete"
        );
        Ok(documents)
    }

    /// Wrap a record as a raw document.
    ///
    /// Returns `Ok(None)` for records without contributors in either schema.
    pub fn wrap_record(&self, record: &RawRecord) -> Result<Option<RawDocument>> {
        let doc = record.parse()?;

        if !self.normalizer.has_contributors(&doc) {
            tracing::debug!(format = %record.format, "Dropping record without contributors");
            return Ok(None);
        }

        let doc_id = self.header_identifier(&doc).ok_or(HarvesterError::MissingIdentifier {
            format: record.format,
        })?;

        Ok(Some(RawDocument {
            doc: format!("{XML_DECLARATION}\n{}", record.xml),
            source: SOURCE_NAME.to_string(),
            doc_id,
            filetype: FILETYPE.to_string(),
        }))
    }

    fn header_identifier(&self, doc: &Document<'_>) -> Option<String> {
        self.header_identifier
            .first(doc.root())
            .map(get_text)
            .filter(|id| !id.is_empty())
    }

    /// The normalizer built from this harvester's namespace table.
    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Harvest the default endpoint over HTTP.
pub fn harvest(days_back: u32) -> Result<Vec<RawDocument>> {
    Harvester::over_http(HarvestConfig::default())?.harvest(days_back)
}
