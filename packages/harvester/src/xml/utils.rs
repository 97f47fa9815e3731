//! Text extraction helpers for DOM nodes.

use roxmltree::Node;

/// Get the direct text content of a node, trimmed.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use pmc_harvester::xml::get_text;
///
/// let doc = Document::parse("<title>  Hello  </title>").unwrap();
/// assert_eq!(get_text(doc.root_element()), "Hello");
/// ```
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// All text below a node, in document order, concatenated and trimmed.
///
/// Inline markup (`<italic>`, `<sup>`, ...) is flattened into the text.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use pmc_harvester::xml::collect_text;
///
/// let doc = Document::parse("<p>Effects of <italic>E. coli</italic> on mice</p>").unwrap();
/// assert_eq!(collect_text(doc.root_element()), "Effects of E. coli on mice");
/// ```
pub fn collect_text(node: Node<'_, '_>) -> String {
    text_fragments(node).concat().trim().to_string()
}

/// The text nodes below a node, in document order, untrimmed.
pub fn text_fragments<'a, 'input>(node: Node<'a, 'input>) -> Vec<&'a str> {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Collapse runs of whitespace into single spaces and trim.
///
/// # Examples
/// ```
/// use pmc_harvester::xml::squash_whitespace;
///
/// assert_eq!(squash_whitespace("  a\n   b\tc "), "a b c");
/// ```
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first node with non-blank content.
pub fn first_non_blank(nodes: &[Node<'_, '_>]) -> Option<String> {
    nodes
        .iter()
        .map(|n| squash_whitespace(&collect_text(*n)))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_text_without_text() {
        let doc = Document::parse("<root><child/></root>").unwrap();
        assert_eq!(get_text(doc.root_element()), "");
    }

    #[test]
    fn test_text_fragments_order() {
        let doc = Document::parse("<t>a <i>b</i> c</t>").unwrap();
        assert_eq!(text_fragments(doc.root_element()), vec!["a ", "b", " c"]);
    }

    #[test]
    fn test_collect_text_nested() {
        let doc = Document::parse("<t> <b>bold <i>and italic</i></b>! </t>").unwrap();
        assert_eq!(collect_text(doc.root_element()), "bold and italic!");
    }

    #[test]
    fn test_first_non_blank_skips_empty() {
        let doc = Document::parse("<r><p>  </p><p>second\n  line</p><p>third</p></r>").unwrap();
        let paragraphs: Vec<_> = doc.root_element().children().filter(|n| n.is_element()).collect();
        assert_eq!(first_non_blank(&paragraphs), Some("second line".to_string()));
    }

    #[test]
    fn test_first_non_blank_none() {
        assert_eq!(first_non_blank(&[]), None);
    }
}
