//! Tolerant HTML fragment parser
//!
//! Handles the subset of HTML that component templates produce: elements with
//! quoted, unquoted and boolean attributes, void elements, self-closing tags,
//! raw-text elements (`textarea`, `script`, `style`), comments and character
//! references. Malformed input never fails; stray end tags are ignored and
//! unclosed elements are closed at the end of the fragment. A `<` that does
//! not start a tag is kept as text.

use super::{Document, NodeId, VOID_ELEMENTS};

const RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "script", "style"];

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Advance past the next occurrence of `needle`, or to the end
    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(offset) => self.pos += offset + needle.len(),
            None => self.pos = self.src.len(),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

/// Whether the text at `rest` opens markup rather than being a literal `<`
fn opens_markup(rest: &str) -> bool {
    let mut chars = rest.chars();
    if chars.next() != Some('<') {
        return false;
    }
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => true,
        Some('!') | Some('?') => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

struct StartTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

fn read_start_tag(cursor: &mut Cursor<'_>) -> StartTag {
    cursor.bump(); // '<'
    let name = cursor.take_while(is_name_char).to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some('>') => {
                cursor.bump();
                break;
            }
            Some('/') if cursor.starts_with("/>") => {
                cursor.pos += 2;
                self_closing = true;
                break;
            }
            _ => {}
        }

        let attr = cursor
            .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
            .to_ascii_lowercase();
        if attr.is_empty() {
            // lone '/' or other junk
            cursor.bump();
            continue;
        }

        cursor.skip_whitespace();
        let value = if cursor.peek() == Some('=') {
            cursor.bump();
            cursor.skip_whitespace();
            match cursor.peek() {
                Some(quote @ ('"' | '\'')) => {
                    cursor.bump();
                    let raw = cursor.take_while(|c| c != quote);
                    cursor.bump();
                    decode_entities(raw)
                }
                _ => decode_entities(cursor.take_while(|c| !c.is_whitespace() && c != '>')),
            }
        } else {
            String::new()
        };

        if !attributes.iter().any(|(name, _)| *name == attr) {
            attributes.push((attr, value));
        }
    }

    StartTag {
        name,
        attributes,
        self_closing,
    }
}

fn read_end_tag(cursor: &mut Cursor<'_>) -> String {
    cursor.pos += 2; // '</'
    let name = cursor.take_while(is_name_char).to_ascii_lowercase();
    cursor.skip_past(">");
    name
}

/// Text up to (not including) the next markup opener
fn read_text<'a>(cursor: &mut Cursor<'a>) -> &'a str {
    let start = cursor.pos;
    // always consume at least one char so a literal '<' makes progress
    cursor.bump();
    loop {
        match cursor.rest().find('<') {
            Some(offset) => {
                cursor.pos += offset;
                if opens_markup(cursor.rest()) {
                    break;
                }
                cursor.bump();
            }
            None => {
                cursor.pos = cursor.src.len();
                break;
            }
        }
    }
    &cursor.src[start..cursor.pos]
}

/// Raw content of a raw-text element up to its end tag
fn read_raw_text<'a>(cursor: &mut Cursor<'a>, tag: &str) -> &'a str {
    let start = cursor.pos;
    let closing = format!("</{tag}");
    let lower = cursor.rest().to_ascii_lowercase();
    match lower.find(&closing) {
        Some(offset) => {
            cursor.pos += offset;
            let raw = &cursor.src[start..cursor.pos];
            cursor.skip_past(">");
            raw
        }
        None => {
            cursor.pos = cursor.src.len();
            &cursor.src[start..]
        }
    }
}

fn attach(doc: &mut Document, stack: &[NodeId], roots: &mut Vec<NodeId>, node: NodeId) {
    match stack.last() {
        Some(&parent) => doc.append_child(parent, node),
        None => roots.push(node),
    }
}

pub(super) fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let mut cursor = Cursor { src: markup, pos: 0 };
    let mut roots = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();

    while !cursor.eof() {
        if cursor.starts_with("<!--") {
            cursor.skip_past("-->");
        } else if cursor.starts_with("<!") || cursor.starts_with("<?") {
            cursor.skip_past(">");
        } else if cursor.starts_with("</") && opens_markup(cursor.rest()) {
            let name = read_end_tag(&mut cursor);
            if let Some(open) = stack
                .iter()
                .rposition(|&id| doc.tag(id) == Some(name.as_str()))
            {
                stack.truncate(open);
            }
        } else if opens_markup(cursor.rest()) {
            let tag = read_start_tag(&mut cursor);
            let element = doc.create_element(&tag.name);
            for (name, value) in tag.attributes {
                doc.set_attribute(element, &name, value);
            }
            attach(doc, &stack, &mut roots, element);

            if tag.self_closing || VOID_ELEMENTS.contains(&tag.name.as_str()) {
                continue;
            }
            if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                let raw = read_raw_text(&mut cursor, &tag.name);
                if !raw.is_empty() {
                    let text = if tag.name == "textarea" {
                        decode_entities(raw)
                    } else {
                        raw.to_string()
                    };
                    let text = doc.create_text(text);
                    doc.append_child(element, text);
                }
            } else {
                stack.push(element);
            }
        } else {
            let text = read_text(&mut cursor);
            let node = doc.create_text(decode_entities(text));
            attach(doc, &stack, &mut roots, node);
        }
    }

    roots
}

/// Decode the character references component markup commonly uses
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    fn roundtrip(markup: &str) -> String {
        let doc = Document::from_markup(markup);
        doc.inner_html(doc.body())
    }

    #[test]
    fn test_nested_elements_and_text() {
        assert_eq!(
            roundtrip("<div class=\"w\"><h3>Title</h3> <p>Body</p></div>"),
            "<div class=\"w\"><h3>Title</h3> <p>Body</p></div>"
        );
    }

    #[test]
    fn test_attribute_forms() {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment("<input type=text disabled value='a \"b\"' data-x=\"1\">");
        let input = nodes[0];

        assert_eq!(doc.attribute(input, "type"), Some("text"));
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
        assert_eq!(doc.attribute(input, "value"), Some("a \"b\""));
        assert_eq!(doc.attribute(input, "data-x"), Some("1"));
        assert!(doc.children(input).is_empty());
    }

    #[test]
    fn test_literal_angle_bracket_is_text() {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment("<h3>Celsius <-> Fahrenheit</h3>");
        assert_eq!(doc.text_content(nodes[0]), "Celsius <-> Fahrenheit");
    }

    #[test]
    fn test_textarea_is_raw_text() {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment("<textarea><b>not bold</b> &amp;</textarea><p>after</p>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.children(nodes[0]).len(), 1);
        assert_eq!(doc.text_content(nodes[0]), "<b>not bold</b> &");
        assert_eq!(doc.tag(nodes[1]), Some("p"));
    }

    #[test]
    fn test_comments_and_stray_end_tags() {
        assert_eq!(
            roundtrip("<!-- note --><div>a</span>b</div></div>"),
            "<div>ab</div>"
        );
    }

    #[test]
    fn test_unclosed_elements() {
        assert_eq!(roundtrip("<ul><li>one<li>two"), "<ul><li>one<li>two</li></li></ul>");
    }

    #[test]
    fn test_self_closing_tag() {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment("<div/><span>x</span>");
        assert_eq!(nodes.len(), 2);
        assert!(doc.children(nodes[0]).is_empty());
    }

    #[test]
    fn test_whitespace_text_nodes_are_kept() {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment("<div>\n  <p>x</p>\n</div>");
        let kinds: Vec<_> = doc
            .children(nodes[0])
            .iter()
            .map(|&id| doc.kind(id).unwrap())
            .collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Element, NodeKind::Text]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &unknown; &"), "a <b> AB &unknown; &");
    }
}
