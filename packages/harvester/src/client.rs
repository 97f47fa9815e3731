//! OAI-PMH ListRecords client that drains a paginated result set.
//!
//! A result set is delivered as a chain of pages. Each page but the last
//! carries a resumption token; the next page is requested with
//! `verb=ListRecords&resumptionToken=<token>`.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use roxmltree::Document;

use crate::config::{resumption_url, HarvestConfig};
use crate::error::{HarvesterError, Result};
use crate::http::Fetcher;
use crate::types::{MetadataFormat, RawRecord};
use crate::xml::{get_text, serialize_element, Namespaces, Selector};

/// OAI-PMH error code for an empty result set.
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

/// One parsed ListRecords response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Serialized `<record>` elements in page order.
    pub records: Vec<String>,

    /// Token for the next page, if the result set continues.
    pub token: Option<String>,
}

/// Selectors for the OAI-PMH envelope.
#[derive(Debug, Clone)]
struct EnvelopeSelectors {
    record: Selector,
    token: Selector,
    error: Selector,
}

impl EnvelopeSelectors {
    fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            record: Selector::compile("//oai:record", namespaces)?,
            token: Selector::compile("//oai:resumptionToken", namespaces)?,
            error: Selector::compile("//oai:error", namespaces)?,
        })
    }
}

/// Paginating ListRecords client.
pub struct HarvestClient<F> {
    fetcher: F,
    endpoint: String,
    page_delay: Duration,
    max_pages: usize,
    selectors: EnvelopeSelectors,
}

impl<F: Fetcher> HarvestClient<F> {
    /// Create a client for the endpoint and limits in `config`.
    pub fn new(fetcher: F, config: &HarvestConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            endpoint: config.endpoint.clone(),
            page_delay: config.page_delay,
            max_pages: config.max_pages,
            selectors: EnvelopeSelectors::new(&config.namespaces)?,
        })
    }

    /// Fetch every page of the result set starting at `query_url`.
    ///
    /// Records are returned in page-arrival order, first page first. A
    /// transport or parse failure on any page aborts the whole call.
    ///
    /// # Errors
    /// * `Transport`/`HttpStatus`/`ResponseTooLarge` from the fetcher
    /// * `MalformedResponse` if a page is not XML
    /// * `OaiProtocol` if the repository reports an error
    /// * `PageLimitExceeded` if the result set runs past `max_pages`
    /// * `RepeatedResumptionToken` if a token already followed is issued again
    pub fn fetch_all(&self, query_url: &str, format: MetadataFormat) -> Result<Vec<RawRecord>> {
        let mut records: Vec<RawRecord> = Vec::new();
        let mut url = query_url.to_string();
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                return Err(HarvesterError::PageLimitExceeded {
                    limit: self.max_pages,
                });
            }
            pages += 1;

            let page = self.fetch_page(&url)?;
            tracing::info!(
                format = %format,
                page = pages,
                records = page.records.len(),
                more = page.token.is_some(),
                "Fetched ListRecords page"
            );

            records.extend(page.records.into_iter().map(|xml| RawRecord { format, xml }));

            let Some(token) = page.token else {
                break;
            };
            if seen_tokens.contains(&token) {
                return Err(HarvesterError::RepeatedResumptionToken { token });
            }

            if !self.page_delay.is_zero() {
                tracing::debug!(delay_ms = self.page_delay.as_millis() as u64, "Pacing before next page");
                thread::sleep(self.page_delay);
            }

            url = resumption_url(&self.endpoint, &token)?;
            seen_tokens.insert(token);
        }

        Ok(records)
    }

    /// Fetch and parse a single page.
    pub fn fetch_page(&self, url: &str) -> Result<Page> {
        let bytes = self.fetcher.fetch(url)?;
        let body = bytes_to_string(&bytes, url);
        let doc = Document::parse(&body).map_err(|source| HarvesterError::MalformedResponse {
            url: url.to_string(),
            source,
        })?;
        self.parse_page(&doc)
    }

    fn parse_page(&self, doc: &Document<'_>) -> Result<Page> {
        if let Some(error) = self.selectors.error.first(doc.root()) {
            let code = error.attribute("code").unwrap_or_default();
            if code == NO_RECORDS_MATCH {
                tracing::debug!("Repository reports no matching records");
                return Ok(Page::default());
            }
            return Err(HarvesterError::OaiProtocol {
                code: code.to_string(),
                message: get_text(error),
            });
        }

        let records = self
            .selectors
            .record
            .select(doc.root())
            .into_iter()
            .map(serialize_element)
            .collect();

        // An empty <resumptionToken/> marks the last page.
        let tokens: Vec<String> = self
            .selectors
            .token
            .select(doc.root())
            .into_iter()
            .map(get_text)
            .filter(|t| !t.is_empty())
            .collect();

        let token = match tokens.len() {
            1 => tokens.into_iter().next(),
            0 => None,
            n => {
                tracing::warn!(count = n, "Multiple resumption tokens on one page, stopping");
                None
            }
        };

        Ok(Page { records, token })
    }
}

/// Decode a response body, replacing invalid UTF-8.
fn bytes_to_string(bytes: &[u8], url: &str) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => {
            tracing::warn!(url, "Response is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const ENDPOINT: &str = "http://example.org/oai";

    /// Serves canned pages by URL and records every request.
    struct ScriptedFetcher {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<(String, String)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| HarvesterError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn page(ids: &[&str], token: Option<&str>) -> String {
        let records: String = ids
            .iter()
            .map(|id| format!("<record><header><identifier>{id}</identifier></header></record>"))
            .collect();
        let token = match token {
            Some(t) => format!("<resumptionToken>{t}</resumptionToken>"),
            None => r#"<resumptionToken completeListSize="3"/>"#.to_string(),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords>{records}{token}</ListRecords></OAI-PMH>"#
        )
    }

    fn first_url() -> String {
        format!("{ENDPOINT}?verb=ListRecords&metadataPrefix=pmc&from=2020-03-07")
    }

    fn token_url(token: &str) -> String {
        format!("{ENDPOINT}?verb=ListRecords&resumptionToken={token}")
    }

    fn client(fetcher: &ScriptedFetcher) -> HarvestClient<&ScriptedFetcher> {
        let config = HarvestConfig::with_endpoint(ENDPOINT).page_delay(Duration::ZERO);
        HarvestClient::new(fetcher, &config).unwrap()
    }

    fn identifiers(records: &[RawRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| {
                let doc = r.parse().unwrap();
                let id = doc
                    .descendants()
                    .find(|n| n.has_tag_name("identifier"))
                    .unwrap();
                get_text(id)
            })
            .collect()
    }

    #[test]
    fn test_single_page_without_token() {
        let fetcher = ScriptedFetcher::new(vec![(first_url(), page(&["a", "b"], None))]);
        let records = client(&fetcher).fetch_all(&first_url(), MetadataFormat::Jats).unwrap();

        assert_eq!(identifiers(&records), vec!["a", "b"]);
        assert_eq!(fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_follows_tokens_in_page_order() {
        let fetcher = ScriptedFetcher::new(vec![
            (first_url(), page(&["a", "b"], Some("t1"))),
            (token_url("t1"), page(&["c"], Some("t2"))),
            (token_url("t2"), page(&["d", "e"], None)),
        ]);
        let records = client(&fetcher).fetch_all(&first_url(), MetadataFormat::Jats).unwrap();

        assert_eq!(identifiers(&records), vec!["a", "b", "c", "d", "e"]);
        assert!(records.iter().all(|r| r.format == MetadataFormat::Jats));

        // The first URL is requested once, follow-ups only by token.
        let requests = fetcher.requests.borrow();
        assert_eq!(
            *requests,
            vec![first_url(), token_url("t1"), token_url("t2")]
        );
    }

    #[test]
    fn test_records_are_standalone_xml() {
        let fetcher = ScriptedFetcher::new(vec![(first_url(), page(&["a"], None))]);
        let records = client(&fetcher).fetch_all(&first_url(), MetadataFormat::Jats).unwrap();

        let doc = records[0].parse().unwrap();
        assert!(doc
            .root_element()
            .has_tag_name(("http://www.openarchives.org/OAI/2.0/", "record")));
    }

    #[test]
    fn test_repeated_token_is_an_error() {
        let fetcher = ScriptedFetcher::new(vec![
            (first_url(), page(&["a"], Some("same"))),
            (token_url("same"), page(&["b"], Some("same"))),
        ]);
        let err = client(&fetcher)
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::RepeatedResumptionToken { token } if token == "same"));
    }

    #[test]
    fn test_token_cycle_is_an_error() {
        let fetcher = ScriptedFetcher::new(vec![
            (first_url(), page(&["a"], Some("t1"))),
            (token_url("t1"), page(&["b"], Some("t2"))),
            (token_url("t2"), page(&["c"], Some("t1"))),
        ]);
        let err = client(&fetcher)
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::RepeatedResumptionToken { token } if token == "t1"));
        assert_eq!(fetcher.requests.borrow().len(), 3);
    }

    #[test]
    fn test_page_limit() {
        let fetcher = ScriptedFetcher::new(vec![
            (first_url(), page(&["a"], Some("t1"))),
            (token_url("t1"), page(&["b"], Some("t2"))),
            (token_url("t2"), page(&["c"], None)),
        ]);
        let config = HarvestConfig::with_endpoint(ENDPOINT)
            .page_delay(Duration::ZERO)
            .max_pages(2);
        let client = HarvestClient::new(&fetcher, &config).unwrap();

        let err = client
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::PageLimitExceeded { limit: 2 }));
        assert_eq!(fetcher.requests.borrow().len(), 2);
    }

    #[test]
    fn test_multiple_tokens_stop_pagination() {
        let body = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords>
            <record><header><identifier>a</identifier></header></record>
            <resumptionToken>t1</resumptionToken><resumptionToken>t2</resumptionToken>
        </ListRecords></OAI-PMH>"#;
        let fetcher = ScriptedFetcher::new(vec![(first_url(), body.to_string())]);
        let records = client(&fetcher).fetch_all(&first_url(), MetadataFormat::Jats).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_no_records_match_is_empty() {
        let body = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><error code="noRecordsMatch">No matches</error></OAI-PMH>"#;
        let fetcher = ScriptedFetcher::new(vec![(first_url(), body.to_string())]);
        let records = client(&fetcher).fetch_all(&first_url(), MetadataFormat::Jats).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_other_oai_errors_propagate() {
        let body = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><error code="badResumptionToken">expired</error></OAI-PMH>"#;
        let fetcher = ScriptedFetcher::new(vec![(first_url(), body.to_string())]);
        let err = client(&fetcher)
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert_eq!(err.to_string(), "OAI-PMH error 'badResumptionToken': expired");
    }

    #[test]
    fn test_malformed_page() {
        let fetcher = ScriptedFetcher::new(vec![(first_url(), "<OAI-PMH><ListRecords>".to_string())]);
        let err = client(&fetcher)
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::MalformedResponse { .. }));
    }

    #[test]
    fn test_transport_error_on_later_page_aborts() {
        let fetcher = ScriptedFetcher::new(vec![(first_url(), page(&["a"], Some("gone")))]);
        let err = client(&fetcher)
            .fetch_all(&first_url(), MetadataFormat::Jats)
            .unwrap_err();
        assert!(matches!(err, HarvesterError::HttpStatus { status: 404, .. }));
    }
}
