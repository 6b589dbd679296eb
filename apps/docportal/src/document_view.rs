//! Renders the frame's document as wrapped text blocks with clickable links.

use dp_dom::Document;
use dp_dom::NodeData;
use dp_dom::NodeId;
use eframe::egui;

const SKIPPED_TAGS: [&str; 7] = [
    "head", "script", "style", "template", "noscript", "iframe", "svg",
];
const BLOCK_TAGS: [&str; 20] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figure",
    "footer", "header", "main", "nav", "ol", "p", "section", "table", "tr", "ul", "li",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    /// Anchor element that receives the click.
    pub link: Option<NodeId>,
    pub strong: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Style {
    link: Option<NodeId>,
    strong: bool,
    code: bool,
    pre: bool,
}

struct Flattener<'a> {
    document: &'a Document,
    blocks: Vec<Block>,
    current: Block,
}

impl Flattener<'_> {
    fn finish(&mut self, next: BlockKind) {
        let kind = std::mem::replace(&mut self.current.kind, next);
        let mut spans = std::mem::take(&mut self.current.spans);
        if kind != BlockKind::Preformatted {
            if let Some(first) = spans.first_mut() {
                first.text = first.text.trim_start().to_owned();
            }
            if let Some(last) = spans.last_mut() {
                last.text = last.text.trim_end().to_owned();
            }
        }
        spans.retain(|span| !span.text.is_empty());
        if !spans.is_empty() {
            self.blocks.push(Block { kind, spans });
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        let text = if style.pre {
            text.to_owned()
        } else {
            collapse_inline(text)
        };
        if text.is_empty() {
            return;
        }
        let previous_ends_with_space = self
            .current
            .spans
            .last()
            .is_none_or(|span| span.text.ends_with(' '));
        let text = if previous_ends_with_space && !style.pre {
            text.trim_start().to_owned()
        } else {
            text
        };
        self.current.spans.push(Span {
            text,
            link: style.link,
            strong: style.strong,
            code: style.code,
        });
    }

    fn walk(&mut self, node: NodeId, style: Style) {
        match self.document.data(node) {
            Some(NodeData::Text(text)) => self.push_text(text, style),
            Some(NodeData::Element(element)) => {
                let tag = element.tag().to_ascii_lowercase();
                if SKIPPED_TAGS.contains(&tag.as_str()) {
                    return;
                }

                let mut style = style;
                match tag.as_str() {
                    "a" if element.attr("href").is_some() => style.link = Some(node),
                    "b" | "strong" | "th" => style.strong = true,
                    "code" | "kbd" | "samp" | "tt" => style.code = true,
                    "br" => {
                        let kind = self.current.kind;
                        self.finish(kind);
                        return;
                    }
                    _ => {}
                }

                let block = block_kind(&tag);
                if let Some(kind) = block {
                    let parent_kind = self.current.kind;
                    self.finish(kind);
                    if kind == BlockKind::Preformatted {
                        style.pre = true;
                        style.code = true;
                    }
                    self.walk_children(node, style);
                    self.finish(parent_kind);
                } else {
                    self.walk_children(node, style);
                }
            }
            Some(NodeData::Document) => self.walk_children(node, style),
            Some(NodeData::Comment(_)) | None => {}
        }
    }

    fn walk_children(&mut self, node: NodeId, style: Style) {
        for child in self.document.children(node) {
            self.walk(*child, style);
        }
    }
}

fn block_kind(tag: &str) -> Option<BlockKind> {
    match tag {
        "h1" => Some(BlockKind::Heading(1)),
        "h2" => Some(BlockKind::Heading(2)),
        "h3" => Some(BlockKind::Heading(3)),
        "h4" | "h5" | "h6" => Some(BlockKind::Heading(4)),
        "pre" => Some(BlockKind::Preformatted),
        "li" | "dt" => Some(BlockKind::ListItem),
        _ if BLOCK_TAGS.contains(&tag) => Some(BlockKind::Paragraph),
        _ => None,
    }
}

/// Whitespace runs become one space; leading and trailing runs are kept as
/// a single space so adjacent inline elements stay separated.
fn collapse_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Flattens the document body into blocks of styled spans.
pub fn layout(document: &Document) -> Vec<Block> {
    let mut flattener = Flattener {
        document,
        blocks: Vec::new(),
        current: Block {
            kind: BlockKind::Paragraph,
            spans: Vec::new(),
        },
    };
    let start = document.body().unwrap_or(document.root());
    flattener.walk(start, Style::default());
    flattener.finish(BlockKind::Paragraph);
    flattener.blocks
}

/// Draws `blocks`; returns the anchor the user clicked, if any.
pub fn show(ui: &mut egui::Ui, blocks: &[Block]) -> Option<NodeId> {
    let mut clicked = None;
    for block in blocks {
        let size = match block.kind {
            BlockKind::Heading(1) => 26.0,
            BlockKind::Heading(2) => 22.0,
            BlockKind::Heading(3) => 18.0,
            BlockKind::Heading(_) => 16.0,
            BlockKind::Paragraph | BlockKind::ListItem | BlockKind::Preformatted => 14.0,
        };
        let heading = matches!(block.kind, BlockKind::Heading(_));

        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            if block.kind == BlockKind::ListItem {
                ui.label("• ");
            }
            for span in &block.spans {
                let mut text = egui::RichText::new(span.text.as_str()).size(size);
                if span.strong || heading {
                    text = text.strong();
                }
                if span.code {
                    text = text.monospace();
                }
                match span.link {
                    Some(anchor) => {
                        if ui.link(text).clicked() {
                            clicked = Some(anchor);
                        }
                    }
                    None => {
                        ui.label(text);
                    }
                }
            }
        });
        ui.add_space(if heading { 8.0 } else { 4.0 });
    }
    clicked
}

#[cfg(test)]
mod tests {
    use super::BlockKind;
    use super::layout;
    use dp_html::HtmlParser;

    #[test]
    fn flattens_blocks_and_links() {
        let document = HtmlParser.parse(
            "<html><head><title>x</title><style>p{}</style></head><body>\
             <h1>Guide</h1>\
             <p>Read the <a href=\"api.html\">API   reference</a> and <b>more</b>.</p>\
             <ul><li>one</li><li>two</li></ul>\
             <pre>a\n  b</pre>\
             <script>ignored()</script>\
             </body></html>",
        );
        let blocks = layout(&document);
        let texts: Vec<String> = blocks.iter().map(|block| block.text()).collect();
        assert_eq!(
            texts,
            ["Guide", "Read the API reference and more.", "one", "two", "a\n  b"]
        );
        assert_eq!(blocks[0].kind, BlockKind::Heading(1));
        assert_eq!(blocks[2].kind, BlockKind::ListItem);
        assert_eq!(blocks[4].kind, BlockKind::Preformatted);

        let link = blocks[1]
            .spans
            .iter()
            .find(|span| span.link.is_some())
            .map(|span| span.text.as_str());
        assert_eq!(link, Some("API reference"));
        assert!(blocks[1].spans.iter().any(|span| span.strong && span.text == "more"));
    }

    #[test]
    fn plain_text_documents_render() {
        let document = HtmlParser.parse("just text");
        let blocks = layout(&document);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "just text");
    }
}
