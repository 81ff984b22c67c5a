use roxmltree::{Node, NodeType};

use super::{parse_document, require_element, XmlInput};
use crate::CompareError;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Formats an XML document or element.
///
/// Unformatted text is returned untouched and parsed elements are written
/// back compactly. Pretty output puts every element on its own line indented
/// by two spaces, drops whitespace-only text and keeps text-only elements on
/// one line. Empty elements are written as `<tag />`.
///
/// ```
/// # use structeq_core::xml::{render, XmlInput};
/// let pretty = render(XmlInput::Text("<a><b>1</b><c/></a>"), true)?;
/// assert_eq!(pretty, "<a>\n  <b>1</b>\n  <c />\n</a>");
/// # Ok::<(), structeq_core::CompareError>(())
/// ```
pub fn render(input: XmlInput<'_, '_>, pretty: bool) -> Result<String, CompareError> {
    match input {
        XmlInput::Text(text) if !pretty => Ok(text.to_owned()),
        XmlInput::Text(text) => {
            let doc = parse_document(text)?;
            Ok(write_element(doc.root_element(), true))
        }
        XmlInput::Element(node) => Ok(write_element(require_element(node)?, pretty)),
    }
}

enum Frame<'a, 'input> {
    Open(Node<'a, 'input>, usize),
    Close(Node<'a, 'input>, usize),
}

struct Writer {
    out: String,
    pretty: bool,
}

/// Walks the subtree with an explicit stack; output nesting is unbounded.
fn write_element(root: Node<'_, '_>, pretty: bool) -> String {
    let mut writer = Writer { out: String::new(), pretty };
    let mut stack = vec![Frame::Open(root, 0)];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Open(node, depth) => match node.node_type() {
                NodeType::Element => {
                    writer.newline(depth);
                    writer.start_tag(node, root);
                    if pretty && !node.children().any(|child| child.is_element()) {
                        writer.leaf_content(node);
                    } else if node.has_children() {
                        writer.out.push('>');
                        stack.push(Frame::Close(node, depth));
                        let children: Vec<_> = node.children().collect();
                        stack.extend(
                            children.into_iter().rev().map(|child| Frame::Open(child, depth + 1)),
                        );
                    } else {
                        writer.out.push_str(" />");
                    }
                }
                NodeType::Text => {
                    let text = node.text().unwrap_or_default();
                    if !pretty {
                        escape_text(text, &mut writer.out);
                    } else if !text.trim().is_empty() {
                        writer.newline(depth);
                        escape_text(text.trim(), &mut writer.out);
                    }
                }
                NodeType::Comment => {
                    writer.newline(depth);
                    writer.out.push_str("<!--");
                    writer.out.push_str(node.text().unwrap_or_default());
                    writer.out.push_str("-->");
                }
                NodeType::PI => {
                    if let Some(pi) = node.pi() {
                        writer.newline(depth);
                        writer.out.push_str("<?");
                        writer.out.push_str(pi.target);
                        if let Some(value) = pi.value {
                            writer.out.push(' ');
                            writer.out.push_str(value);
                        }
                        writer.out.push_str("?>");
                    }
                }
                NodeType::Root => {}
            },
            Frame::Close(node, depth) => {
                writer.newline(depth);
                writer.end_tag(node);
            }
        }
    }
    writer.out
}

impl Writer {
    fn newline(&mut self, depth: usize) {
        if self.pretty && !self.out.is_empty() {
            self.out.push('\n');
            self.out.push_str(&"  ".repeat(depth));
        }
    }

    fn start_tag<'a, 'input>(&mut self, node: Node<'a, 'input>, root: Node<'a, 'input>) {
        self.out.push('<');
        self.qualified_name(node, node.tag_name().namespace(), node.tag_name().name(), false);

        let inherited: Vec<(Option<&str>, &str)> = if node == root {
            Vec::new()
        } else {
            node.parent_element()
                .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
                .unwrap_or_default()
        };
        for ns in node.namespaces() {
            if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
                continue;
            }
            match ns.name() {
                Some(prefix) => {
                    self.out.push_str(" xmlns:");
                    self.out.push_str(prefix);
                }
                None => self.out.push_str(" xmlns"),
            }
            self.out.push_str("=\"");
            escape_attribute(ns.uri(), &mut self.out);
            self.out.push('"');
        }

        for attr in node.attributes() {
            self.out.push(' ');
            self.qualified_name(node, attr.namespace(), attr.name(), true);
            self.out.push_str("=\"");
            escape_attribute(attr.value(), &mut self.out);
            self.out.push('"');
        }
    }

    /// Writes the body of an element without child elements on one line.
    fn leaf_content(&mut self, node: Node<'_, '_>) {
        let text: String = node.children().filter(Node::is_text).filter_map(|n| n.text()).collect();
        if text.trim().is_empty() {
            self.out.push_str(" />");
        } else {
            self.out.push('>');
            escape_text(&text, &mut self.out);
            self.end_tag(node);
        }
    }

    fn end_tag(&mut self, node: Node<'_, '_>) {
        self.out.push_str("</");
        self.qualified_name(node, node.tag_name().namespace(), node.tag_name().name(), false);
        self.out.push('>');
    }

    /// Attributes never take the default namespace, so they need a prefixed binding.
    fn qualified_name(
        &mut self,
        scope: Node<'_, '_>,
        namespace: Option<&str>,
        local: &str,
        attribute: bool,
    ) {
        let prefix = namespace.and_then(|uri| {
            if uri == XML_NAMESPACE {
                return Some("xml");
            }
            scope
                .namespaces()
                .find(|ns| ns.uri() == uri && (!attribute || ns.name().is_some()))
                .and_then(|ns| ns.name())
        });
        if let Some(prefix) = prefix {
            self.out.push_str(prefix);
            self.out.push(':');
        }
        self.out.push_str(local);
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Canonicalize, CompareOptions};

    fn pretty(text: &str) -> String {
        render(XmlInput::Text(text), true).unwrap()
    }

    #[test]
    fn unformatted_text_is_returned_as_is() {
        let text = "<a>  <b/>\n</a>";
        assert_eq!(render(XmlInput::Text(text), false).unwrap(), text);
    }

    #[test]
    fn pretty_indents_nested_elements() {
        assert_eq!(
            pretty("<a><b x=\"1\"><c>t</c></b><d/></a>"),
            "<a>\n  <b x=\"1\">\n    <c>t</c>\n  </b>\n  <d />\n</a>"
        );
    }

    #[test]
    fn pretty_drops_blank_text_and_keeps_mixed_text() {
        assert_eq!(pretty("<a>\n   <b>  </b>\n</a>"), "<a>\n  <b />\n</a>");
        assert_eq!(pretty("<a>hi<b/></a>"), "<a>\n  hi\n  <b />\n</a>");
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(
            pretty(r#"<a k="&quot;&lt;">x &amp; y</a>"#),
            r#"<a k="&quot;&lt;">x &amp; y</a>"#
        );
    }

    #[test]
    fn namespaces_are_declared_where_introduced() {
        assert_eq!(
            pretty(r#"<p:r xmlns:p="urn:p"><p:c p:k="v"/></p:r>"#),
            "<p:r xmlns:p=\"urn:p\">\n  <p:c p:k=\"v\" />\n</p:r>"
        );
    }

    #[test]
    fn rendered_subtree_redeclares_inherited_namespaces() {
        let doc = parse_document(r#"<r xmlns="urn:d"><c/></r>"#).unwrap();
        let child = doc.root_element().first_element_child().unwrap();
        assert_eq!(render(XmlInput::Element(child), false).unwrap(), r#"<c xmlns="urn:d" />"#);
    }

    #[test]
    fn compact_element_keeps_whitespace() {
        let doc = parse_document("<a> <b/>x</a>").unwrap();
        assert_eq!(render(XmlInput::Element(doc.root_element()), false).unwrap(), "<a> <b />x</a>");
    }

    #[test]
    fn pretty_output_preserves_canonical_form() {
        let text = concat!(
            r#"<data><country name="Panama"><rank>68</rank>"#,
            r#"<neighbor name="Colombia" direction="E"/></country></data>"#,
        );
        let formatted = pretty(text);
        let opts = CompareOptions::default();
        assert_eq!(
            XmlInput::Text(&formatted).canonical_form(&opts).unwrap(),
            XmlInput::Text(text).canonical_form(&opts).unwrap()
        );
    }
}
