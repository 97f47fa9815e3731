//! Field extractors for the Dublin Core and JATS archive-article schemas,
//! and the per-field chains built from them.

use roxmltree::{Document, Node};

use super::chain::{Extractor, FieldChain};
use crate::error::Result;
use crate::types::Contributor;
use crate::xml::{collect_text, first_non_blank, get_text, squash_whitespace, Namespaces, Selector};

/// Resolver prefix for DOI-derived article URLs.
pub const DOI_URL_PREFIX: &str = "http://dx.doi.org/";

/// PubMed prefix for PMID-derived article URLs.
pub const PUBMED_URL_PREFIX: &str = "http://www.ncbi.nlm.nih.gov/pubmed/";

/// Prefixes recognized as DOI resolvers in Dublin Core identifiers.
const DOI_RESOLVER_PREFIXES: [&str; 4] = [
    "http://dx.doi.org/",
    "https://dx.doi.org/",
    "http://doi.org/",
    "https://doi.org/",
];

/// Length of a PubMed identifier at the end of a PubMed URL.
const PMID_SUFFIX_LEN: usize = 8;

/// Article identifiers found in a record. `url` is never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleIds {
    pub url: String,
    pub doi: String,
    pub pmid: String,
}

/// First non-blank text of the selected elements.
pub struct FirstText {
    name: &'static str,
    selector: Selector,
}

impl FirstText {
    pub fn new(name: &'static str, path: &str, namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            name,
            selector: Selector::compile(path, namespaces)?,
        })
    }
}

impl Extractor<String> for FirstText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, doc: &Document<'_>) -> Option<String> {
        first_non_blank(&self.selector.select(doc.root()))
    }
}

/// All text fragments of the selected elements, trimmed and joined by
/// single spaces.
pub struct JoinedText {
    name: &'static str,
    selector: Selector,
}

impl JoinedText {
    pub fn new(name: &'static str, path: &str, namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            name,
            selector: Selector::compile(path, namespaces)?,
        })
    }
}

impl Extractor<String> for JoinedText {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, doc: &Document<'_>) -> Option<String> {
        let joined = self
            .selector
            .select(doc.root())
            .into_iter()
            .flat_map(|node| node.descendants().filter(|n| n.is_text()))
            .filter_map(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Some(joined).filter(|s| !s.is_empty())
    }
}

/// Dublin Core `dc:creator` elements, one contributor each.
pub struct DcCreators {
    creator: Selector,
}

impl DcCreators {
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            creator: Selector::compile("//dc:creator", namespaces)?,
        })
    }
}

impl Extractor<Vec<Contributor>> for DcCreators {
    fn name(&self) -> &'static str {
        "dc:creator"
    }

    fn extract(&self, doc: &Document<'_>) -> Option<Vec<Contributor>> {
        let contributors: Vec<Contributor> = self
            .creator
            .select(doc.root())
            .into_iter()
            .map(|n| squash_whitespace(&collect_text(n)))
            .filter(|name| !name.is_empty())
            .map(Contributor::named)
            .collect();
        Some(contributors).filter(|c| !c.is_empty())
    }
}

/// JATS contributors as "surname, given-names".
///
/// Surnames and given names are paired by position across the whole
/// document; pairing stops at the shorter list. E-mail addresses from
/// `contrib/email` are attached only when there is exactly one per
/// contributor. Otherwise only the first contributor is kept, with a blank
/// e-mail.
pub struct JatsContributors {
    surname: Selector,
    given_names: Selector,
    email: Selector,
}

impl JatsContributors {
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            surname: Selector::compile("//arch:contrib/arch:name/arch:surname", namespaces)?,
            given_names: Selector::compile(
                "//arch:contrib/arch:name/arch:given-names",
                namespaces,
            )?,
            email: Selector::compile("//arch:contrib/arch:email", namespaces)?,
        })
    }

    fn texts(selector: &Selector, doc: &Document<'_>) -> Vec<String> {
        selector
            .select(doc.root())
            .into_iter()
            .map(get_text)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Extractor<Vec<Contributor>> for JatsContributors {
    fn name(&self) -> &'static str {
        "arch:contrib"
    }

    fn extract(&self, doc: &Document<'_>) -> Option<Vec<Contributor>> {
        let surnames = Self::texts(&self.surname, doc);
        let given_names = Self::texts(&self.given_names, doc);
        let names: Vec<String> = surnames
            .iter()
            .zip(&given_names)
            .map(|(surname, given)| format!("{surname}, {given}"))
            .collect();
        if names.is_empty() {
            return None;
        }

        let emails = Self::texts(&self.email, doc);
        if emails.len() != names.len() {
            tracing::debug!(
                contributors = names.len(),
                emails = emails.len(),
                "E-mail count does not match contributors, keeping the first contributor"
            );
            return names.into_iter().next().map(|name| vec![Contributor::named(name)]);
        }

        Some(
            names
                .into_iter()
                .zip(emails)
                .map(|(full_name, email)| Contributor { full_name, email })
                .collect(),
        )
    }
}

/// Positional Dublin Core identifiers.
///
/// Only lists of exactly two or three entries are trusted: the second entry
/// is the article URL, the third a DOI. Any other shape defers to the next
/// extractor.
pub struct DcIdentifiers {
    identifier: Selector,
}

impl DcIdentifiers {
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            identifier: Selector::compile("//dc:identifier", namespaces)?,
        })
    }
}

impl Extractor<ArticleIds> for DcIdentifiers {
    fn name(&self) -> &'static str {
        "dc:identifier"
    }

    fn extract(&self, doc: &Document<'_>) -> Option<ArticleIds> {
        let entries: Vec<String> = self
            .identifier
            .select(doc.root())
            .into_iter()
            .map(|n| squash_whitespace(&collect_text(n)))
            .filter(|s| !s.is_empty())
            .collect();

        if !(2..=3).contains(&entries.len()) {
            return None;
        }

        let url = entries[1].as_str();
        let (mut doi, pmid) = match DOI_RESOLVER_PREFIXES
            .iter()
            .find_map(|prefix| url.strip_prefix(prefix))
        {
            Some(doi) => (doi.to_string(), String::new()),
            None => (String::new(), trailing_chars(url, PMID_SUFFIX_LEN)),
        };

        if let Some(literal) = entries.get(2) {
            doi = literal.clone();
        }

        Some(ArticleIds {
            url: url.to_string(),
            doi,
            pmid,
        })
    }
}

/// JATS `article-id` elements typed `doi` and `pmid`.
///
/// The URL is built from the DOI when there is one, otherwise from the PMID.
pub struct JatsArticleIds {
    doi: Selector,
    pmid: Selector,
}

impl JatsArticleIds {
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            doi: Selector::compile("//arch:article-id[@pub-id-type='doi']", namespaces)?,
            pmid: Selector::compile("//arch:article-id[@pub-id-type='pmid']", namespaces)?,
        })
    }
}

impl Extractor<ArticleIds> for JatsArticleIds {
    fn name(&self) -> &'static str {
        "arch:article-id"
    }

    fn extract(&self, doc: &Document<'_>) -> Option<ArticleIds> {
        let doi = first_non_blank(&self.doi.select(doc.root())).unwrap_or_default();
        let pmid = first_non_blank(&self.pmid.select(doc.root())).unwrap_or_default();

        let url = if !doi.is_empty() {
            format!("{DOI_URL_PREFIX}{doi}")
        } else if !pmid.is_empty() {
            format!("{PUBMED_URL_PREFIX}{pmid}")
        } else {
            return None;
        };

        Some(ArticleIds { url, doi, pmid })
    }
}

/// JATS `kwd` elements as cleaned-up tags.
pub struct JatsKeywords {
    keyword: Selector,
}

impl JatsKeywords {
    pub fn new(namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            keyword: Selector::compile("//arch:kwd", namespaces)?,
        })
    }
}

impl Extractor<Vec<String>> for JatsKeywords {
    fn name(&self) -> &'static str {
        "arch:kwd"
    }

    fn extract(&self, doc: &Document<'_>) -> Option<Vec<String>> {
        let fragments = self
            .keyword
            .select(doc.root())
            .into_iter()
            .flat_map(|kwd| kwd.children())
            .filter_map(|child| {
                if child.is_element() {
                    Some(collect_text(child))
                } else if child.is_text() {
                    child
                        .text()
                        .filter(|t| !t.trim().is_empty() && t.trim() != ")")
                        .map(String::from)
                } else {
                    None
                }
            });

        let tags: Vec<String> = fragments.filter_map(|f| clean_tag(&f)).collect();
        Some(tags).filter(|t| !t.is_empty())
    }
}

/// Strip the " (" artifact left by parenthesized keyword markup.
///
/// # Examples
/// ```
/// use pmc_harvester::normalize::clean_tag;
///
/// assert_eq!(clean_tag(" foo "), Some("foo".to_string()));
/// assert_eq!(clean_tag(" ("), None);
/// ```
#[must_use]
pub fn clean_tag(fragment: &str) -> Option<String> {
    let cleaned = fragment.replace(" (", "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// A JATS date element (`year`, `month`, `day` children) as `YYYY-MM-DD`.
///
/// Month and day default to `01` when missing; an element without a year is
/// skipped.
pub struct JatsDate {
    name: &'static str,
    date: Selector,
    year: Selector,
    month: Selector,
    day: Selector,
}

impl JatsDate {
    pub fn new(name: &'static str, path: &str, namespaces: &Namespaces) -> Result<Self> {
        Ok(Self {
            name,
            date: Selector::compile(path, namespaces)?,
            year: Selector::compile("arch:year", namespaces)?,
            month: Selector::compile("arch:month", namespaces)?,
            day: Selector::compile("arch:day", namespaces)?,
        })
    }

    fn part(selector: &Selector, date: Node<'_, '_>) -> Option<String> {
        selector.first(date).map(get_text).filter(|s| !s.is_empty())
    }
}

impl Extractor<String> for JatsDate {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, doc: &Document<'_>) -> Option<String> {
        self.date.select(doc.root()).into_iter().find_map(|date| {
            let year = Self::part(&self.year, date)?;
            let month = Self::part(&self.month, date).unwrap_or_else(|| "1".to_string());
            let day = Self::part(&self.day, date).unwrap_or_else(|| "1".to_string());
            Some(format!("{year}-{month:0>2}-{day:0>2}"))
        })
    }
}

/// Last `n` characters of `s` (all of it when shorter).
fn trailing_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

pub fn title_chain(namespaces: &Namespaces) -> Result<FieldChain<String>> {
    Ok(FieldChain::new("title")
        .then(FirstText::new("dc:title", "//dc:title", namespaces)?)
        .then(JoinedText::new(
            "arch:article-title",
            "//arch:title-group/arch:article-title",
            namespaces,
        )?))
}

pub fn contributor_chain(namespaces: &Namespaces) -> Result<FieldChain<Vec<Contributor>>> {
    Ok(FieldChain::new("contributors")
        .then(DcCreators::new(namespaces)?)
        .then(JatsContributors::new(namespaces)?))
}

pub fn description_chain(namespaces: &Namespaces) -> Result<FieldChain<String>> {
    Ok(FieldChain::new("description")
        .then(FirstText::new("dc:description", "//dc:description", namespaces)?)
        .then(FirstText::new(
            "arch:abstract",
            "//arch:abstract/arch:p",
            namespaces,
        )?))
}

pub fn identifier_chain(namespaces: &Namespaces) -> Result<FieldChain<ArticleIds>> {
    Ok(FieldChain::new("identifiers")
        .then(DcIdentifiers::new(namespaces)?)
        .then(JatsArticleIds::new(namespaces)?))
}

pub fn tag_chain(namespaces: &Namespaces) -> Result<FieldChain<Vec<String>>> {
    Ok(FieldChain::new("tags").then(JatsKeywords::new(namespaces)?))
}

pub fn date_chain(namespaces: &Namespaces) -> Result<FieldChain<String>> {
    Ok(FieldChain::new("date_created")
        .then(FirstText::new("dc:date", "//dc:date", namespaces)?)
        .then(JatsDate::new(
            "arch:date[received]",
            "//arch:date[@date-type='received']",
            namespaces,
        )?)
        .then(JatsDate::new(
            "arch:pub-date[epub]",
            "//arch:pub-date[@pub-type='epub']",
            namespaces,
        )?))
}
