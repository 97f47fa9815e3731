//! Namespace-qualified path queries over `roxmltree` documents.
//!
//! Supports the subset of XPath the harvester needs:
//!
//! - `//` descendant steps and `/` child steps (a path without a leading
//!   `//` starts with a child step)
//! - `prefix:local` element names, resolved through [`Namespaces`]
//! - one `[@attr='value']` predicate per step
//!
//! `//` from a context node searches its descendants, not the node itself.

use roxmltree::Node;

use super::namespaces::Namespaces;
use crate::error::{HarvesterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    namespace: Option<String>,
    local: String,
    attribute: Option<(String, String)>,
}

impl Step {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        if !node.is_element() {
            return false;
        }
        let name = node.tag_name();
        if name.name() != self.local || name.namespace() != self.namespace.as_deref() {
            return false;
        }
        match &self.attribute {
            Some((attr, value)) => node.attribute(attr.as_str()) == Some(value.as_str()),
            None => true,
        }
    }
}

/// A compiled path query.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use pmc_harvester::xml::{Namespaces, Selector};
///
/// let xml = r#"<a xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>T</dc:title></a>"#;
/// let doc = Document::parse(xml).unwrap();
/// let selector = Selector::compile("//dc:title", &Namespaces::default()).unwrap();
/// let found = selector.select(doc.root());
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].text(), Some("T"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    path: String,
    steps: Vec<Step>,
}

impl Selector {
    /// Compile a path, resolving prefixes against `namespaces`.
    pub fn compile(path: &str, namespaces: &Namespaces) -> Result<Self> {
        let invalid = |reason: &str| HarvesterError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut steps = Vec::new();
        let mut rest = path;
        let mut first = true;

        while !rest.is_empty() {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                if first {
                    return Err(invalid("absolute paths are not supported"));
                }
                rest = r;
                Axis::Child
            } else if first {
                Axis::Child
            } else {
                return Err(invalid("expected '/' between steps"));
            };
            first = false;

            let end = step_end(rest);
            let (raw_step, remainder) = rest.split_at(end);
            rest = remainder;

            steps.push(parse_step(raw_step, axis, namespaces).map_err(|r| invalid(&r))?);
        }

        if steps.is_empty() {
            return Err(invalid("empty path"));
        }

        Ok(Self {
            path: path.to_string(),
            steps,
        })
    }

    /// The path this selector was compiled from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All matching elements in document order.
    #[must_use]
    pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let mut current = vec![context];

        for step in &self.steps {
            let mut next: Vec<Node<'a, 'input>> = Vec::new();
            for node in &current {
                match step.axis {
                    Axis::Child => next.extend(node.children().filter(|c| step.matches(*c))),
                    Axis::Descendant => next.extend(
                        node.descendants()
                            .skip(1)
                            .filter(|d| step.matches(*d)),
                    ),
                }
            }
            // Nested contexts can reach the same node twice.
            next.sort_by_key(|n| n.id().get());
            next.dedup_by_key(|n| n.id().get());
            current = next;
        }

        current
    }

    /// First matching element.
    #[must_use]
    pub fn first<'a, 'input>(&self, context: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
        self.select(context).into_iter().next()
    }
}

/// Compile `path` and run it once.
pub fn select<'a, 'input>(
    context: Node<'a, 'input>,
    path: &str,
    namespaces: &Namespaces,
) -> Result<Vec<Node<'a, 'input>>> {
    Ok(Selector::compile(path, namespaces)?.select(context))
}

/// Index of the first '/' outside a predicate.
fn step_end(rest: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return i,
            _ => {}
        }
    }
    rest.len()
}

fn parse_step(
    raw: &str,
    axis: Axis,
    namespaces: &Namespaces,
) -> std::result::Result<Step, String> {
    let (name, predicate) = match raw.find('[') {
        Some(open) => {
            let inner = raw[open..]
                .strip_prefix('[')
                .and_then(|p| p.strip_suffix(']'))
                .ok_or_else(|| format!("unterminated predicate in '{raw}'"))?;
            (&raw[..open], Some(inner))
        }
        None => (raw, None),
    };

    if name.is_empty() {
        return Err("empty step".to_string());
    }

    let (namespace, local) = match name.split_once(':') {
        Some((prefix, local)) => {
            let uri = namespaces
                .uri(prefix)
                .ok_or_else(|| format!("unknown prefix '{prefix}'"))?;
            (Some(uri.to_string()), local)
        }
        None => (None, name),
    };

    let attribute = predicate.map(parse_predicate).transpose()?;

    Ok(Step {
        axis,
        namespace,
        local: local.to_string(),
        attribute,
    })
}

/// Parse `@attr='value'` (single or double quotes).
fn parse_predicate(predicate: &str) -> std::result::Result<(String, String), String> {
    let (attr, value) = predicate
        .strip_prefix('@')
        .and_then(|p| p.split_once('='))
        .ok_or_else(|| format!("unsupported predicate '{predicate}'"))?;

    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| format!("unquoted value in '{predicate}'"))?;

    Ok((attr.trim().to_string(), unquoted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const ARTICLE: &str = r#"<article xmlns="http://dtd.nlm.nih.gov/2.0/xsd/archivearticle">
  <front>
    <article-meta>
      <article-id pub-id-type="pmid">12345678</article-id>
      <article-id pub-id-type="doi">10.1/x</article-id>
      <title-group><article-title>Title</article-title></title-group>
    </article-meta>
  </front>
</article>"#;

    fn ns() -> Namespaces {
        Namespaces::default()
    }

    #[test]
    fn test_descendant_then_child() {
        let doc = Document::parse(ARTICLE).unwrap();
        let found = select(doc.root(), "//arch:title-group/arch:article-title", &ns()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(), Some("Title"));
    }

    #[test]
    fn test_attribute_predicate() {
        let doc = Document::parse(ARTICLE).unwrap();
        let found = select(doc.root(), "//arch:article-id[@pub-id-type='doi']", &ns()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(), Some("10.1/x"));

        let found =
            select(doc.root(), r#"//arch:article-id[@pub-id-type="pmcid"]"#, &ns()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_namespace_must_match() {
        let doc = Document::parse("<root><title>T</title></root>").unwrap();
        assert!(select(doc.root(), "//dc:title", &ns()).unwrap().is_empty());
        assert_eq!(select(doc.root(), "//title", &ns()).unwrap().len(), 1);
    }

    #[test]
    fn test_relative_child_path() {
        let xml = r#"<record xmlns="http://www.openarchives.org/OAI/2.0/"><header><identifier>oai:x:1</identifier></header></record>"#;
        let doc = Document::parse(xml).unwrap();
        let record = doc.root_element();
        let selector = Selector::compile("oai:header/oai:identifier", &ns()).unwrap();
        assert_eq!(selector.first(record).and_then(|n| n.text()), Some("oai:x:1"));
    }

    #[test]
    fn test_nested_matches_are_not_duplicated() {
        let doc = Document::parse("<a><b><b><c/></b></b></a>").unwrap();
        let found = select(doc.root(), "//b//c", &ns()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_matches_in_document_order() {
        let xml = r#"<a><b><c n="1"/><b><c n="2"/></b></b><b><c n="3"/></b></a>"#;
        let doc = Document::parse(xml).unwrap();
        let found = select(doc.root(), "//b//c", &ns()).unwrap();
        let order: Vec<_> = found.iter().filter_map(|n| n.attribute("n")).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_descendant_excludes_context() {
        let doc = Document::parse("<a><a/></a>").unwrap();
        let found = select(doc.root_element(), "//a", &ns()).unwrap();
        assert_eq!(found.len(), 1);
        assert_ne!(found[0], doc.root_element());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(Selector::compile("", &ns()).is_err());
        assert!(Selector::compile("/oai:record", &ns()).is_err());
        assert!(Selector::compile("//x:record", &ns()).is_err());
        assert!(Selector::compile("//oai:record[@a='b'", &ns()).is_err());
        assert!(Selector::compile("//oai:record[position()=1]", &ns()).is_err());
    }

    #[test]
    fn test_unknown_prefix_reason() {
        let err = Selector::compile("//x:record", &ns()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid path '//x:record': unknown prefix 'x'"
        );
    }
}
