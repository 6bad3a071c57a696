//! Markup serialization and escaping

use std::borrow::Cow;

use super::{Document, NodeKind, VOID_ELEMENTS};

/// Escape text for use as element content
pub fn escape_html(text: &str) -> Cow<'_, str> {
    escape(text, false)
}

/// Escape text for use inside a double-quoted attribute value
pub fn escape_attribute(text: &str) -> Cow<'_, str> {
    escape(text, true)
}

fn escape(text: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>') || (attribute && c == '"');
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub(super) fn write_node(doc: &Document, id: super::NodeId, out: &mut String) {
    match doc.kind(id) {
        Some(NodeKind::Text) => {
            let text = doc.text(id).unwrap_or_default();
            let raw = doc
                .parent(id)
                .and_then(|parent| doc.tag(parent))
                .is_some_and(|tag| matches!(tag, "script" | "style"));
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_html(text));
            }
        }
        Some(NodeKind::Element) => {
            let tag = doc.tag(id).unwrap_or_default();
            out.push('<');
            out.push_str(tag);
            for (name, value) in doc.attributes(id) {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag) {
                return;
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        None => {}
    }
}
