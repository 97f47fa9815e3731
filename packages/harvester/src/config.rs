//! Configuration constants, harvest settings and URL construction.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use regex::Regex;
use reqwest::Url;

use crate::error::{HarvesterError, Result};
use crate::types::MetadataFormat;
use crate::xml::Namespaces;

/// OAI-PMH endpoint of PubMed Central.
pub const DEFAULT_ENDPOINT: &str = "https://www.ncbi.nlm.nih.gov/pmc/oai/oai.cgi";

/// Source name stamped on every raw and normalized document.
pub const SOURCE_NAME: &str = "pubmedcentral";

/// File type declared on raw documents.
pub const FILETYPE: &str = "xml";

/// Declaration prepended to every serialized record.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default maximum HTTP response size in bytes (50 MB).
///
/// A ListRecords page of full JATS front matter stays well below this.
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// Pause before requesting the next page of a result set.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;

/// Maximum number of pages fetched for one query.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Default harvest window: records changed since today.
pub const DEFAULT_DAYS_BACK: u32 = 0;

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Validate and parse a date in YYYY-MM-DD format.
///
/// # Examples
/// ```
/// use pmc_harvester::config::validate_date;
///
/// assert!(validate_date("2025-01-01").is_ok());
/// assert!(validate_date("invalid").is_err());
/// assert!(validate_date("2025-13-01").is_err()); // Invalid month
/// ```
pub fn validate_date(date_str: &str) -> Result<NaiveDate> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(HarvesterError::InvalidDate(date_str.to_string()));
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| HarvesterError::InvalidDate(date_str.to_string()))
}

/// Start of a harvest window. The end is implicitly "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    from: NaiveDate,
}

impl TimeWindow {
    /// Window starting `days_back` days before the local date.
    #[must_use]
    pub fn from_days_back(days_back: u32) -> Self {
        Self::starting_from(Local::now().date_naive(), days_back)
    }

    /// Window starting `days_back` days before `today`.
    #[must_use]
    pub fn starting_from(today: NaiveDate, days_back: u32) -> Self {
        let from = today
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        Self { from }
    }

    /// Window starting at an explicit date.
    #[must_use]
    pub fn since(from: NaiveDate) -> Self {
        Self { from }
    }

    /// First day of the window.
    #[must_use]
    pub fn from_date(&self) -> NaiveDate {
        self.from
    }

    /// The `from` query parameter value.
    #[must_use]
    pub fn from_param(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }
}

/// Settings for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// OAI-PMH base URL, without query string.
    pub endpoint: String,

    /// Prefix table used by every path query.
    pub namespaces: Namespaces,

    /// Pause before each follow-up page.
    pub page_delay: Duration,

    /// Pagination ceiling per query.
    pub max_pages: usize,

    /// Largest accepted response body.
    pub max_response_size: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespaces: Namespaces::default(),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            max_pages: DEFAULT_MAX_PAGES,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl HarvestConfig {
    /// Default settings against another endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Pagination ceiling. At least one page is always allowed.
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// URL of the first ListRecords page for a format and window.
    pub fn list_records_url(&self, format: MetadataFormat, window: &TimeWindow) -> Result<String> {
        list_records_url(&self.endpoint, format, window)
    }

    /// URL of a follow-up page.
    pub fn resumption_url(&self, token: &str) -> Result<String> {
        resumption_url(&self.endpoint, token)
    }
}

/// Build the first-page ListRecords URL.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use pmc_harvester::config::{list_records_url, TimeWindow};
/// use pmc_harvester::types::MetadataFormat;
///
/// let date = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
/// let url = list_records_url(
///     "http://example.org/oai",
///     MetadataFormat::DublinCore,
///     &TimeWindow::since(date),
/// )
/// .unwrap();
/// assert_eq!(
///     url,
///     "http://example.org/oai?verb=ListRecords&metadataPrefix=oai_dc&from=2020-03-07"
/// );
/// ```
pub fn list_records_url(
    endpoint: &str,
    format: MetadataFormat,
    window: &TimeWindow,
) -> Result<String> {
    let from = window.from_param();
    build_url(
        endpoint,
        &[
            ("verb", "ListRecords"),
            ("metadataPrefix", format.prefix()),
            ("from", from.as_str()),
        ],
    )
}

/// Build the URL of the page identified by a resumption token.
pub fn resumption_url(endpoint: &str, token: &str) -> Result<String> {
    build_url(
        endpoint,
        &[("verb", "ListRecords"), ("resumptionToken", token)],
    )
}

fn build_url(endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = Url::parse_with_params(endpoint, params).map_err(|e| {
        HarvesterError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(url.into())
}
