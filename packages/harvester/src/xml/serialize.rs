//! Serialization of element subtrees back to XML text.

use roxmltree::Node;

const XML_PREFIX: &str = "xml";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Serialize an element and its descendants.
///
/// Every namespace in scope on `node` is declared on the output root, so
/// the result parses to the same expanded names outside its original
/// document. Descendants only declare namespaces their parent did not have.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use pmc_harvester::xml::serialize_element;
///
/// let xml = r#"<page xmlns="urn:a"><record id="1">x &amp; y</record></page>"#;
/// let doc = Document::parse(xml).unwrap();
/// let record = doc.root_element().first_element_child().unwrap();
/// assert_eq!(
///     serialize_element(record),
///     r#"<record xmlns="urn:a" id="1">x &amp; y</record>"#
/// );
/// ```
#[must_use]
pub fn serialize_element(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    write_node(node, None, &mut out);
    out
}

fn write_node(node: Node<'_, '_>, parent: Option<Node<'_, '_>>, out: &mut String) {
    if node.is_element() {
        write_element(node, parent, out);
    } else if node.is_text() {
        if let Some(text) = node.text() {
            escape_into(text, false, out);
        }
    } else if node.is_comment() {
        if let Some(text) = node.text() {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    } else if let Some(pi) = node.pi() {
        out.push_str("<?");
        out.push_str(pi.target);
        if let Some(value) = pi.value {
            out.push(' ');
            out.push_str(value);
        }
        out.push_str("?>");
    }
}

fn write_element(node: Node<'_, '_>, parent: Option<Node<'_, '_>>, out: &mut String) {
    let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());

    out.push('<');
    out.push_str(&name);
    write_namespace_declarations(node, parent, out);

    for attr in node.attributes() {
        out.push(' ');
        out.push_str(&attribute_name(node, attr.namespace(), attr.name()));
        out.push_str("=\"");
        escape_into(attr.value(), true, out);
        out.push('"');
    }

    if !node.has_children() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in node.children() {
        write_node(child, Some(node), out);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn write_namespace_declarations(
    node: Node<'_, '_>,
    parent: Option<Node<'_, '_>>,
    out: &mut String,
) {
    for ns in node.namespaces() {
        if ns.name() == Some(XML_PREFIX) {
            continue;
        }
        let inherited = parent.is_some_and(|p| {
            p.namespaces()
                .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
        });
        if inherited {
            continue;
        }
        match ns.name() {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        escape_into(ns.uri(), true, out);
        out.push('"');
    }

    // A child that undeclares the parent's default namespace.
    let parent_has_default = parent.is_some_and(|p| p.namespaces().any(|ns| ns.name().is_none()));
    let has_default = node.namespaces().any(|ns| ns.name().is_none());
    if parent_has_default && !has_default {
        out.push_str(" xmlns=\"\"");
    }
}

fn qualified_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Namespaced attributes need a prefix; the default namespace never applies
/// to them.
fn attribute_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let Some(uri) = namespace else {
        return local.to_string();
    };
    if uri == XML_NS {
        return format!("{XML_PREFIX}:{local}");
    }
    match node
        .namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
    {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
