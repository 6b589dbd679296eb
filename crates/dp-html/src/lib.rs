//! HTML parsing into the portal's DOM arena.

mod tokenizer;

use dp_dom::Document;
use dp_dom::NodeId;
use tokenizer::Token;
use tokenizer::is_void;
use tokenizer::tokenize;

/// Parses raw HTML into a DOM document.
///
/// The builder is tolerant rather than standards-exact: unknown end tags are
/// ignored, unclosed elements are closed at end of input, and content that
/// appears before any `<html>` element is placed under a synthesized
/// `<html><body>` pair so every parsed page has a document element.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let tokens = tokenize(input);
        let token_count = tokens.len();
        let document = TreeBuilder::new().build(tokens);
        tracing::trace!(
            token_count,
            node_count = document.node_count(),
            "parsed html document"
        );
        document
    }

    /// Parses and records the URL the document was loaded from.
    pub fn parse_with_url(&self, input: &str, url: &str) -> Document {
        let mut document = self.parse(input);
        document.set_url(url);
        document
    }
}

struct TreeBuilder {
    document: Document,
    stack: Vec<(NodeId, String)>,
}

impl TreeBuilder {
    fn new() -> Self {
        let document = Document::empty();
        let root = document.root();
        Self {
            document,
            stack: vec![(root, String::new())],
        }
    }

    fn build(mut self, tokens: Vec<Token>) -> Document {
        for token in tokens {
            match token {
                Token::Text(text) => {
                    if self.at_root() && text.trim().is_empty() {
                        continue;
                    }
                    self.ensure_body_for_content();
                    let node = self.document.create_text(text);
                    self.append(node);
                }
                Token::Comment(text) => {
                    let node = self.document.create_comment(text);
                    self.append(node);
                }
                Token::Start {
                    name,
                    attrs,
                    self_closing,
                } => self.open(&name, attrs, self_closing),
                Token::End { name } => self.close(&name),
            }
        }
        self.document
    }

    fn at_root(&self) -> bool {
        self.stack.len() == 1
    }

    fn current(&self) -> NodeId {
        self.stack
            .last()
            .map(|(id, _)| *id)
            .unwrap_or(self.document.root())
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        self.document.append_child(parent, node);
    }

    fn is_open(&self, tag: &str) -> bool {
        self.stack.iter().any(|(_, name)| name == tag)
    }

    fn ensure_body_for_content(&mut self) {
        if !self.at_root() {
            return;
        }
        self.open("html", Vec::new(), false);
        self.open("body", Vec::new(), false);
    }

    fn open(&mut self, name: &str, attrs: Vec<(String, String)>, self_closing: bool) {
        match name {
            "html" if self.is_open("html") => {
                self.merge_attrs_into_open("html", attrs);
                return;
            }
            "html" => {
                if let Some(existing) = self.document.document_element() {
                    self.stack.push((existing, "html".to_owned()));
                    self.merge_attrs_into_open("html", attrs);
                    return;
                }
            }
            "head" | "body" if self.is_open(name) => return,
            "head" | "body" if self.at_root() => {
                self.open("html", Vec::new(), false);
            }
            _ if self.at_root() => {
                let wrapper = if is_head_element(name) { "head" } else { "body" };
                self.open("html", Vec::new(), false);
                self.open(wrapper, Vec::new(), false);
            }
            _ => {}
        }

        let node = self.document.create_element(name);
        for (attr, value) in &attrs {
            self.document.set_attribute(node, attr, value);
        }
        self.append(node);

        if !self_closing && !is_void(name) {
            self.stack.push((node, name.to_owned()));
        }
    }

    fn merge_attrs_into_open(&mut self, tag: &str, attrs: Vec<(String, String)>) {
        let Some((node, _)) = self.stack.iter().find(|(_, name)| name == tag).cloned() else {
            return;
        };
        for (attr, value) in attrs {
            if !self.document.has_attribute(node, &attr) {
                self.document.set_attribute(node, &attr, &value);
            }
        }
    }

    fn close(&mut self, name: &str) {
        let Some(position) = self.stack.iter().rposition(|(_, open)| open == name) else {
            return;
        };
        if position == 0 {
            return;
        }
        self.stack.truncate(position);
    }
}

fn is_head_element(tag: &str) -> bool {
    matches!(
        tag,
        "title" | "meta" | "link" | "style" | "script" | "base" | "noscript"
    )
}

#[cfg(test)]
mod tests {
    use super::HtmlParser;

    #[test]
    fn parses_title_and_document_element() {
        let doc = HtmlParser.parse(
            "<!DOCTYPE html><html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title> Main   Page </title></head><body><p>Hi</p></body></html>",
        );
        assert_eq!(doc.title(), "Main Page");
        let Some(html) = doc.document_element() else {
            panic!("missing document element");
        };
        assert_eq!(doc.tag_name(html), Some("html"));
        assert_eq!(
            doc.get_attribute(html, "xmlns"),
            Some("http://www.w3.org/1999/xhtml")
        );
        assert_eq!(doc.body_text(), "Hi");
    }

    #[test]
    fn bare_text_gets_synthesized_body() {
        let doc = HtmlParser.parse(r#"{"detail":"Not Found"}"#);
        assert_eq!(doc.body_text(), r#"{"detail":"Not Found"}"#);
        assert!(doc.document_element().is_some());
    }

    #[test]
    fn anchors_are_collected_in_document_order() {
        let doc = HtmlParser.parse(
            "<body><a href=\"one.html\">1</a><div><a href='two.html'>2</a></div><a>3</a></body>",
        );
        let anchors = doc.elements_by_tag_name("a");
        assert_eq!(anchors.len(), 3);
        assert_eq!(doc.get_attribute(anchors[0], "href"), Some("one.html"));
        assert_eq!(doc.get_attribute(anchors[1], "href"), Some("two.html"));
        assert_eq!(doc.get_attribute(anchors[2], "href"), None);
    }

    #[test]
    fn unclosed_and_mismatched_tags_are_tolerated() {
        let doc = HtmlParser.parse("<html><body><div><span>text</div></p><br>tail");
        assert_eq!(doc.body_text(), "texttail");
        assert_eq!(doc.elements_by_tag_name("br").len(), 1);
    }

    #[test]
    fn base_href_feeds_base_uri() {
        let doc = HtmlParser.parse_with_url(
            "<html><head><base href=\"/static/projects/p/2.0/\"></head><body></body></html>",
            "http://localhost:8080/static/projects/p/2.0/deep/page.html",
        );
        assert_eq!(
            doc.base_uri().as_deref(),
            Some("http://localhost:8080/static/projects/p/2.0/")
        );
    }
}
