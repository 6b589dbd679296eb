//! DOM tree data structures for embedded documentation pages.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Only what the portal needs from a third-party page is
//! modelled: elements with attributes and class lists, text, the document
//! title, a per-element `onclick` slot, and click dispatch with
//! `preventDefault` semantics.

use std::fmt;
use std::rc::Rc;
use url::Url;

/// ID used to address nodes in the DOM arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Click event passed to `onclick` handlers while it bubbles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    target: NodeId,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Handler stored in an element's `onclick` slot.
#[derive(Clone)]
pub struct ClickHandler(Rc<dyn Fn(&mut ClickEvent)>);

impl ClickHandler {
    pub fn new(handler: impl Fn(&mut ClickEvent) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    fn call(&self, event: &mut ClickEvent) {
        (self.0)(event);
    }
}

impl fmt::Debug for ClickHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClickHandler(..)")
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    onclick: Option<ClickHandler>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    url: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            url: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// Base URI: the first `<base href>` resolved against the document URL,
    /// otherwise the document URL itself.
    pub fn base_uri(&self) -> Option<String> {
        let document_url = self.url.as_deref().and_then(|raw| Url::parse(raw).ok());
        let base_href = self
            .elements_by_tag_name("base")
            .into_iter()
            .find_map(|id| self.get_attribute(id, "href").map(ToOwned::to_owned));

        match (document_url, base_href) {
            (Some(url), Some(href)) => url
                .join(&href)
                .ok()
                .map(|joined| joined.to_string())
                .or_else(|| Some(url.to_string())),
            (Some(url), None) => Some(url.to_string()),
            (None, Some(href)) => Url::parse(&href).ok().map(|url| url.to_string()),
            (None, None) => None,
        }
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            onclick: None,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Comment(text.into()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Appends a detached node. Attached nodes and unknown ids are ignored.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || child == self.root() {
            return;
        }
        if self.nodes.get(parent.0).is_none() {
            return;
        }
        let Some(node) = self.nodes.get_mut(child.0) else {
            return;
        };
        if node.parent.is_some() {
            return;
        }
        node.parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|node| &node.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match element.attrs.iter_mut().find(|(candidate, _)| *candidate == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => element.attrs.push((name, value.to_owned())),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element
                .attrs
                .retain(|(candidate, _)| !candidate.eq_ignore_ascii_case(name));
        }
    }

    pub fn class_list(&self, id: NodeId) -> Vec<String> {
        self.get_attribute(id, "class")
            .map(|value| value.split_whitespace().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn class_contains(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).iter().any(|candidate| candidate == class)
    }

    pub fn class_add(&mut self, id: NodeId, classes: &[&str]) {
        let mut list = self.class_list(id);
        for class in classes {
            if !list.iter().any(|candidate| candidate == class) {
                list.push((*class).to_owned());
            }
        }
        self.write_class_list(id, &list);
    }

    pub fn class_remove(&mut self, id: NodeId, classes: &[&str]) {
        if self.get_attribute(id, "class").is_none() {
            return;
        }
        let mut list = self.class_list(id);
        list.retain(|candidate| !classes.contains(&candidate.as_str()));
        self.write_class_list(id, &list);
    }

    /// `classList.toggle(class, force)`; returns whether the class is present afterwards.
    pub fn class_toggle(&mut self, id: NodeId, class: &str, force: Option<bool>) -> bool {
        let present = self.class_contains(id, class);
        let wanted = force.unwrap_or(!present);
        if wanted && !present {
            self.class_add(id, &[class]);
        } else if !wanted && present {
            self.class_remove(id, &[class]);
        }
        wanted
    }

    fn write_class_list(&mut self, id: NodeId, list: &[String]) {
        self.set_attribute(id, "class", &list.join(" "));
    }

    /// Elements in document order.
    pub fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_by_tag(self.root(), tag, &mut out);
        out
    }

    fn collect_by_tag(&self, id: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            if self
                .tag_name(*child)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                out.push(*child);
            }
            self.collect_by_tag(*child, tag, out);
        }
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    pub fn head(&self) -> Option<NodeId> {
        self.elements_by_tag_name("head").into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag_name("body").into_iter().next()
    }

    pub fn title(&self) -> String {
        self.elements_by_tag_name("title")
            .into_iter()
            .next()
            .map(|id| collapse_whitespace(&self.text_content(id)))
            .unwrap_or_default()
    }

    /// Replaces the text of the first `<title>`, creating one under `<head>` if needed.
    pub fn set_title(&mut self, title: &str) {
        let existing = self.elements_by_tag_name("title").into_iter().next();
        let title_id = match existing {
            Some(id) => id,
            None => {
                let id = self.create_element("title");
                let parent = self
                    .head()
                    .or_else(|| self.document_element())
                    .unwrap_or(self.root());
                self.append_child(parent, id);
                id
            }
        };

        let children = std::mem::take(&mut self.nodes[title_id.0].children);
        for child in children {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = None;
            }
        }
        let text = self.create_text(title);
        self.append_child(title_id, text);
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, false, &mut out);
        out
    }

    /// Rendered-ish text: script and style contents excluded, outer whitespace trimmed.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, true, &mut out);
        out.trim().to_owned()
    }

    pub fn body_text(&self) -> String {
        self.body()
            .map(|body| self.inner_text(body))
            .unwrap_or_default()
    }

    fn collect_text(&self, id: NodeId, skip_raw: bool, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element(element))
                if skip_raw && matches!(element.tag(), "script" | "style" | "template") => {}
            Some(NodeData::Element(_) | NodeData::Document) => {
                for child in self.children(id) {
                    self.collect_text(*child, skip_raw, out);
                }
            }
            Some(NodeData::Comment(_)) | None => {}
        }
    }

    pub fn set_onclick(&mut self, id: NodeId, handler: Option<ClickHandler>) {
        if let Some(element) = self.element_mut(id) {
            element.onclick = handler;
        }
    }

    pub fn has_onclick(&self, id: NodeId) -> bool {
        self.element(id)
            .is_some_and(|element| element.onclick.is_some())
    }

    /// Number of elements carrying an `onclick` handler.
    pub fn onclick_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(&node.data, NodeData::Element(element) if element.onclick.is_some()))
            .count()
    }

    /// Runs `onclick` handlers from `target` up through its ancestors.
    pub fn dispatch_click(&self, target: NodeId) -> ClickEvent {
        let mut event = ClickEvent {
            target,
            default_prevented: false,
        };
        let mut current = Some(target);
        while let Some(id) = current {
            if let Some(handler) = self.element(id).and_then(|element| element.onclick.clone()) {
                handler.call(&mut event);
            }
            current = self.parent(id);
        }
        event
    }

    /// Nearest ancestor-or-self element with the given tag.
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self
                .tag_name(node)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::ClickHandler;
    use super::Document;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sample() -> (Document, super::NodeId, super::NodeId) {
        let mut doc = Document::empty();
        let html = doc.create_element("HTML");
        let root = doc.root();
        doc.append_child(root, html);
        let body = doc.create_element("body");
        doc.append_child(html, body);
        let anchor = doc.create_element("a");
        doc.append_child(body, anchor);
        let text = doc.create_text(" Hello ");
        doc.append_child(anchor, text);
        (doc, html, anchor)
    }

    #[test]
    fn class_list_operations_follow_dom_semantics() {
        let (mut doc, html, _) = sample();
        doc.class_add(html, &["light-mode", "dark-mode"]);
        assert!(doc.class_contains(html, "light-mode"));
        doc.class_remove(html, &["light-mode", "dark-mode"]);
        assert!(doc.class_list(html).is_empty());

        assert!(doc.class_toggle(html, "dark", Some(true)));
        assert!(doc.class_toggle(html, "dark", Some(true)));
        assert_eq!(doc.class_list(html), vec!["dark".to_owned()]);
        assert!(!doc.class_toggle(html, "dark", None));
        assert!(!doc.class_contains(html, "dark"));
    }

    #[test]
    fn onclick_slot_is_replaced_not_stacked() {
        let (mut doc, _, anchor) = sample();
        let calls = Rc::new(Cell::new(0_u32));
        for _ in 0..3 {
            let calls = Rc::clone(&calls);
            doc.set_onclick(
                anchor,
                Some(ClickHandler::new(move |event| {
                    calls.set(calls.get() + 1);
                    event.prevent_default();
                })),
            );
        }

        assert_eq!(doc.onclick_count(), 1);
        let event = doc.dispatch_click(anchor);
        assert!(event.default_prevented());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn title_is_created_and_replaced() {
        let (mut doc, _, _) = sample();
        assert_eq!(doc.title(), "");
        doc.set_title("First");
        doc.set_title("  Second   page ");
        assert_eq!(doc.title(), "Second page");
        assert_eq!(doc.elements_by_tag_name("title").len(), 1);
    }

    #[test]
    fn base_uri_prefers_base_element() {
        let (mut doc, html, _) = sample();
        doc.set_url("http://localhost:8080/static/projects/p/1.0/a/b.html");
        assert_eq!(
            doc.base_uri().as_deref(),
            Some("http://localhost:8080/static/projects/p/1.0/a/b.html")
        );

        let base = doc.create_element("base");
        doc.set_attribute(base, "HREF", "../");
        doc.append_child(html, base);
        assert_eq!(
            doc.base_uri().as_deref(),
            Some("http://localhost:8080/static/projects/p/1.0/")
        );
    }

    #[test]
    fn inner_text_skips_scripts() {
        let (mut doc, _, anchor) = sample();
        let script = doc.create_element("script");
        let code = doc.create_text("var x = 1;");
        doc.append_child(script, code);
        doc.append_child(anchor, script);
        assert_eq!(doc.body_text(), "Hello");
        assert!(doc.text_content(anchor).contains("var x"));
    }
}
