//! The embedded documentation frame.
//!
//! A [`Frame`] models an isolated browsing context: the host writes its `src`,
//! documents arrive asynchronously through a [`DocumentLoader`], and the host
//! observes the frame only through queued events and its content window.

pub mod color;
pub mod intercept;
pub mod loader;

pub use color::ThemeConvention;
pub use color::apply_color_mode;
pub use intercept::FrameAnchorRewrite;
pub use intercept::LinkTarget;
pub use intercept::intercept;
pub use loader::DocumentLoader;
pub use loader::HttpDocumentLoader;
pub use loader::LoadedDocument;
pub use loader::StaticSiteLoader;

use dp_core::PortalError;
use dp_core::PortalResult;
use dp_dom::Document;
use dp_dom::NodeId;
use dp_html::HtmlParser;
use dp_storage::LocalStorage;
use dp_storage::StorageManager;
use std::collections::VecDeque;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameEventKind {
    /// Fired on the frame element; survives document loads.
    Load,
    /// Fired on the content window; listeners die with the document.
    HashChange,
    /// Fired on the content window; listeners die with the document.
    TitleChange,
}

impl FrameEventKind {
    fn is_window_event(self) -> bool {
        !matches!(self, Self::Load)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Load,
    LoadFailed(PortalError),
    HashChange { old_url: String, new_url: String },
    TitleChange { title: String },
}

impl FrameEvent {
    pub fn kind(&self) -> FrameEventKind {
        match self {
            Self::Load | Self::LoadFailed(_) => FrameEventKind::Load,
            Self::HashChange { .. } => FrameEventKind::HashChange,
            Self::TitleChange { .. } => FrameEventKind::TitleChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// `location.replace`: no new frame history entry.
    Replace,
    Push,
}

/// A document fetch the frame is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub id: u64,
    pub url: Url,
    pub mode: NavigationMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A click handler called `preventDefault`.
    Prevented,
    /// The link opens outside the frame.
    OpenExternal(String),
    /// Same document, only the fragment changed.
    Fragment,
    /// The frame started loading a new document.
    Navigating(Url),
    Ignored,
}

/// The document currently shown by the frame.
#[derive(Debug)]
pub struct ContentWindow {
    location: Url,
    document: Document,
    local_storage: LocalStorage,
    status: u16,
    epoch: u64,
}

impl ContentWindow {
    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn local_storage(&self) -> &LocalStorage {
        &self.local_storage
    }

    /// HTTP status of the response that produced this document.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Increases with every completed document load.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    id: ListenerId,
    kind: FrameEventKind,
    epoch: u64,
}

#[derive(Debug)]
pub struct Frame {
    host: Url,
    storage: StorageManager,
    parser: HtmlParser,
    pending: Option<NavigationRequest>,
    in_flight: Option<NavigationRequest>,
    next_navigation_id: u64,
    next_listener_id: u64,
    epoch: u64,
    window: Option<ContentWindow>,
    history_len: usize,
    listeners: Vec<Listener>,
    events: VecDeque<(u64, FrameEvent)>,
    external_requests: Vec<String>,
}

impl Frame {
    /// Creates an empty frame embedded in a page served from `host_origin`.
    pub fn new(host_origin: &str, storage: StorageManager) -> PortalResult<Self> {
        let host = Url::parse(host_origin).map_err(|_| PortalError::unparseable(host_origin))?;
        Ok(Self {
            host,
            storage,
            parser: HtmlParser,
            pending: None,
            in_flight: None,
            next_navigation_id: 0,
            next_listener_id: 0,
            epoch: 0,
            window: None,
            history_len: 0,
            listeners: Vec::new(),
            events: VecDeque::new(),
            external_requests: Vec::new(),
        })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Assigns `src`, replacing the frame's current entry.
    ///
    /// Returns `false` without navigating when the frame already shows or is
    /// already loading exactly that address, so recomputing the same source
    /// never reloads the frame.
    pub fn set_src(&mut self, src: &str) -> PortalResult<bool> {
        let url = self
            .host
            .join(src)
            .map_err(|_| PortalError::unparseable(src))?;
        let loading = self.pending.as_ref().or(self.in_flight.as_ref());
        let current = match loading {
            Some(request) => Some(&request.url),
            None => self.window.as_ref().map(|window| &window.location),
        };
        if current == Some(&url) {
            return Ok(false);
        }
        self.navigate(url, NavigationMode::Replace);
        Ok(true)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some() || self.in_flight.is_some()
    }

    /// Hands the next fetch to the caller, typically for a worker thread.
    pub fn take_pending_navigation(&mut self) -> Option<NavigationRequest> {
        let request = self.pending.take()?;
        self.in_flight = Some(request.clone());
        Some(request)
    }

    /// Finishes a fetch started by [`Frame::take_pending_navigation`].
    ///
    /// Results for superseded navigations are dropped; returns whether the
    /// result was applied.
    pub fn complete_navigation(&mut self, id: u64, result: PortalResult<LoadedDocument>) -> bool {
        let Some(request) = self.in_flight.take_if(|request| request.id == id) else {
            tracing::debug!(navigation_id = id, "dropping superseded frame navigation");
            return false;
        };

        match result {
            Ok(loaded) => self.commit_document(request.mode, loaded),
            Err(error) => {
                tracing::warn!(url = request.url.as_str(), error = %error, "frame load failed");
                self.window = None;
                self.dispatch(FrameEvent::LoadFailed(error));
            }
        }
        true
    }

    /// Runs any pending navigation to completion on the calling thread.
    pub fn pump(&mut self, loader: &dyn DocumentLoader) -> bool {
        let Some(request) = self.take_pending_navigation() else {
            return false;
        };
        let result = loader.load(&request.url);
        self.complete_navigation(request.id, result)
    }

    /// Accessible content window, or `FrameUnavailable` when nothing is
    /// loaded or the document is cross-origin.
    pub fn content_window(&self) -> PortalResult<&ContentWindow> {
        let window = self
            .window
            .as_ref()
            .ok_or_else(|| PortalError::frame_unavailable("frame has no document yet"))?;
        if window.location.origin() != self.host.origin() {
            return Err(PortalError::frame_unavailable(format!(
                "frame document {} is cross-origin",
                window.location.origin().ascii_serialization()
            )));
        }
        Ok(window)
    }

    pub fn content_window_mut(&mut self) -> PortalResult<&mut ContentWindow> {
        self.content_window()?;
        self.window
            .as_mut()
            .ok_or_else(|| PortalError::frame_unavailable("frame has no document yet"))
    }

    /// The frame's live address, `None` when it cannot be read.
    pub fn location_href(&self) -> Option<String> {
        self.content_window()
            .ok()
            .map(|window| window.location.to_string())
    }

    /// Number of entries in the frame's own session history.
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Subscribes to `kind`. Window events need an accessible document and
    /// are dropped on the next load.
    pub fn add_listener(&mut self, kind: FrameEventKind) -> PortalResult<ListenerId> {
        let epoch = if kind.is_window_event() {
            self.content_window()?.epoch
        } else {
            0
        };
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        let id = ListenerId(self.next_listener_id);
        self.listeners.push(Listener { id, kind, epoch });
        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drains queued events that still have a subscriber.
    pub fn take_events(&mut self) -> Vec<FrameEvent> {
        let queued = std::mem::take(&mut self.events);
        queued
            .into_iter()
            .filter(|(epoch, event)| self.has_listener(event.kind(), *epoch))
            .map(|(_, event)| event)
            .collect()
    }

    /// Changes the embedded document's title, as a page script would.
    pub fn set_document_title(&mut self, title: &str) -> PortalResult<()> {
        let window = self.content_window_mut()?;
        window.document.set_title(title);
        let title = window.document.title();
        self.dispatch(FrameEvent::TitleChange { title });
        Ok(())
    }

    /// Moves the loaded document to `#hash`, as a page script assigning
    /// `location.hash` would. Adds a frame history entry.
    pub fn set_location_hash(&mut self, hash: &str) -> PortalResult<()> {
        let mut url = self.content_window()?.location.clone();
        url.set_fragment(Some(hash.trim_start_matches('#')));
        self.navigate(url, NavigationMode::Push);
        Ok(())
    }

    /// Clicks `node` inside the frame document and performs the default
    /// action unless a handler prevented it.
    pub fn click(&mut self, node: NodeId) -> PortalResult<ClickOutcome> {
        let window = self.content_window()?;
        let document = &window.document;
        if document.dispatch_click(node).default_prevented() {
            return Ok(ClickOutcome::Prevented);
        }

        let Some(anchor) = document.closest(node, "a") else {
            return Ok(ClickOutcome::Ignored);
        };
        let Some(href) = document
            .get_attribute(anchor, "href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
        else {
            return Ok(ClickOutcome::Ignored);
        };
        let opens_new_tab = document
            .get_attribute(anchor, "target")
            .is_some_and(|target| target.eq_ignore_ascii_case("_blank"));

        let base = document
            .base_uri()
            .and_then(|base| Url::parse(&base).ok())
            .unwrap_or_else(|| window.location.clone());
        let resolved = base.join(href).map_err(|_| PortalError::unparseable(href))?;

        if opens_new_tab || !matches!(resolved.scheme(), "http" | "https") {
            tracing::debug!(href = resolved.as_str(), "frame link opens externally");
            self.external_requests.push(resolved.to_string());
            return Ok(ClickOutcome::OpenExternal(resolved.to_string()));
        }

        Ok(match self.navigate(resolved.clone(), NavigationMode::Push) {
            true => ClickOutcome::Fragment,
            false => ClickOutcome::Navigating(resolved),
        })
    }

    /// Drains URLs the frame asked to open in a new browsing context.
    pub fn take_external_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.external_requests)
    }

    /// Starts a navigation. Returns `true` when it was a same-document
    /// fragment change that completed synchronously.
    fn navigate(&mut self, url: Url, mode: NavigationMode) -> bool {
        if let Some(window) = self.window.as_mut() {
            if url.fragment().is_some() && same_document_url(&window.location, &url) {
                let old_url = window.location.to_string();
                window.location = url;
                let new_url = window.location.to_string();
                self.pending = None;
                self.in_flight = None;
                if mode == NavigationMode::Push {
                    self.history_len = self.history_len.saturating_add(1);
                }
                if old_url != new_url {
                    self.dispatch(FrameEvent::HashChange { old_url, new_url });
                }
                return true;
            }
        }

        self.next_navigation_id = self.next_navigation_id.saturating_add(1);
        tracing::debug!(
            navigation_id = self.next_navigation_id,
            url = url.as_str(),
            ?mode,
            "frame navigation started"
        );
        self.in_flight = None;
        self.pending = Some(NavigationRequest {
            id: self.next_navigation_id,
            url,
            mode,
        });
        false
    }

    fn commit_document(&mut self, mode: NavigationMode, loaded: LoadedDocument) {
        let document = if loaded.is_html() {
            self.parser.parse_with_url(&loaded.body, loaded.url.as_str())
        } else {
            plain_text_document(&loaded.body, loaded.url.as_str())
        };

        self.epoch = self.epoch.saturating_add(1);
        let epoch = self.epoch;
        self.listeners
            .retain(|listener| !listener.kind.is_window_event());

        let partition = loaded.url.origin().ascii_serialization();
        self.window = Some(ContentWindow {
            local_storage: self.storage.local_storage(&partition),
            location: loaded.url,
            document,
            status: loaded.status,
            epoch,
        });

        if mode == NavigationMode::Push || self.history_len == 0 {
            self.history_len = self.history_len.saturating_add(1);
        }
        self.dispatch(FrameEvent::Load);
    }

    fn dispatch(&mut self, event: FrameEvent) {
        let epoch = if event.kind().is_window_event() {
            self.epoch
        } else {
            0
        };
        if self.has_listener(event.kind(), epoch) {
            self.events.push_back((epoch, event));
        }
    }

    fn has_listener(&self, kind: FrameEventKind, epoch: u64) -> bool {
        self.listeners
            .iter()
            .any(|listener| listener.kind == kind && listener.epoch == epoch)
    }
}

fn same_document_url(current: &Url, next: &Url) -> bool {
    let mut current = current.clone();
    let mut next = next.clone();
    current.set_fragment(None);
    next.set_fragment(None);
    current == next
}

/// Non-HTML bodies render as preformatted text, like a browser tab.
fn plain_text_document(body: &str, url: &str) -> Document {
    let mut document = Document::empty();
    let root = document.root();
    let html = document.create_element("html");
    let head = document.create_element("head");
    let body_element = document.create_element("body");
    let pre = document.create_element("pre");
    let text = document.create_text(body);
    document.append_child(root, html);
    document.append_child(html, head);
    document.append_child(html, body_element);
    document.append_child(body_element, pre);
    document.append_child(pre, text);
    document.set_url(url);
    document
}

#[cfg(test)]
mod tests {
    use super::ClickOutcome;
    use super::DocumentLoader;
    use super::Frame;
    use super::FrameEvent;
    use super::FrameEventKind;
    use super::StaticSiteLoader;
    use dp_core::NOT_FOUND_SENTINEL;
    use dp_storage::StorageManager;

    const HOST: &str = "http://localhost:8080";

    fn site() -> StaticSiteLoader {
        StaticSiteLoader::new()
            .with_page(
                "/static/projects/p/1.0/index.html",
                r##"<html><head><title>Home</title></head><body>
                    <a id="next" href="guide.html">Guide</a>
                    <a href="#top">Top</a>
                    <a href="https://example.com/" target="_blank">Out</a>
                </body></html>"##,
            )
            .with_page("/static/projects/p/1.0/guide.html", "<title>Guide</title>")
    }

    fn frame() -> Frame {
        match Frame::new(HOST, StorageManager::ephemeral()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    fn anchor(frame: &Frame, index: usize) -> dp_dom::NodeId {
        match frame.content_window() {
            Ok(window) => window.document().elements_by_tag_name("a")[index],
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn same_src_does_not_reload() {
        let site = site();
        let mut frame = frame();
        assert_eq!(frame.set_src("/static/projects/p/1.0/"), Ok(true));
        assert!(frame.pump(&site));
        assert_eq!(frame.set_src("/static/projects/p/1.0/"), Ok(false));
        assert!(!frame.pump(&site));
        assert_eq!(site.load_count(), 1);
        assert_eq!(frame.history_len(), 1);
    }

    #[test]
    fn reassigning_src_after_in_frame_navigation_reloads() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/"), Ok(true)));
        frame.pump(&site);
        assert!(matches!(frame.click(anchor(&frame, 0)), Ok(ClickOutcome::Navigating(_))));
        frame.pump(&site);

        assert_eq!(frame.set_src("/static/projects/p/1.0/"), Ok(true));
        assert!(frame.pump(&site));
        assert_eq!(site.load_count(), 3);
    }

    #[test]
    fn load_events_reach_element_listeners_only() {
        let site = site();
        let mut frame = frame();
        assert!(frame.add_listener(FrameEventKind::HashChange).is_err());
        let load = match frame.add_listener(FrameEventKind::Load) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert!(matches!(frame.set_src("/static/projects/p/1.0/"), Ok(true)));
        frame.pump(&site);
        assert_eq!(frame.take_events(), vec![FrameEvent::Load]);

        assert!(frame.remove_listener(load));
        assert!(matches!(frame.set_src("/static/projects/p/1.0/guide.html"), Ok(true)));
        frame.pump(&site);
        assert!(frame.take_events().is_empty());
    }

    #[test]
    fn window_listeners_are_dropped_on_load() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/"), Ok(true)));
        frame.pump(&site);
        assert!(frame.add_listener(FrameEventKind::TitleChange).is_ok());
        assert!(frame.set_document_title("Renamed").is_ok());
        assert_eq!(
            frame.take_events(),
            vec![FrameEvent::TitleChange {
                title: "Renamed".to_owned()
            }]
        );

        assert!(matches!(frame.set_src("/static/projects/p/1.0/guide.html"), Ok(true)));
        frame.pump(&site);
        assert_eq!(frame.listener_count(), 0);
    }

    #[test]
    fn fragment_src_change_fires_hashchange_without_loading() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/index.html"), Ok(true)));
        frame.pump(&site);
        assert!(frame.add_listener(FrameEventKind::HashChange).is_ok());

        assert!(matches!(frame.set_src("/static/projects/p/1.0/index.html#api"), Ok(true)));
        assert!(!frame.is_loading());
        assert_eq!(site.load_count(), 1);
        assert_eq!(
            frame.location_href().as_deref(),
            Some("http://localhost:8080/static/projects/p/1.0/index.html#api")
        );
        assert!(matches!(
            frame.take_events().as_slice(),
            [FrameEvent::HashChange { .. }]
        ));
    }

    #[test]
    fn scripted_hash_change_stays_in_document() {
        let site = site();
        let mut frame = frame();
        assert!(frame.set_location_hash("top").is_err());

        assert!(matches!(frame.set_src("/static/projects/p/1.0/guide.html"), Ok(true)));
        frame.pump(&site);
        assert!(frame.add_listener(FrameEventKind::HashChange).is_ok());
        let entries = frame.history_len();

        assert!(frame.set_location_hash("#setup").is_ok());
        assert!(!frame.is_loading());
        assert_eq!(site.load_count(), 1);
        assert_eq!(frame.history_len(), entries + 1);
        assert_eq!(
            frame.location_href().as_deref(),
            Some("http://localhost:8080/static/projects/p/1.0/guide.html#setup")
        );
        assert!(matches!(
            frame.take_events().as_slice(),
            [FrameEvent::HashChange { .. }]
        ));
    }

    #[test]
    fn superseded_navigation_results_are_dropped() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/"), Ok(true)));
        let Some(first) = frame.take_pending_navigation() else {
            panic!("expected a navigation");
        };
        assert!(matches!(frame.set_src("/static/projects/p/1.0/guide.html"), Ok(true)));
        let Some(second) = frame.take_pending_navigation() else {
            panic!("expected a navigation");
        };

        assert!(!frame.complete_navigation(first.id, site.load(&first.url)));
        assert!(frame.complete_navigation(second.id, site.load(&second.url)));
        assert_eq!(
            frame.location_href().as_deref(),
            Some("http://localhost:8080/static/projects/p/1.0/guide.html")
        );
    }

    #[test]
    fn clicks_follow_default_actions() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/"), Ok(true)));
        frame.pump(&site);

        let outcome = frame.click(anchor(&frame, 1));
        assert_eq!(outcome, Ok(ClickOutcome::Fragment));
        assert_eq!(frame.history_len(), 2);

        let outcome = frame.click(anchor(&frame, 2));
        assert_eq!(
            outcome,
            Ok(ClickOutcome::OpenExternal("https://example.com/".to_owned()))
        );
        assert_eq!(frame.take_external_requests(), vec!["https://example.com/".to_owned()]);

        let outcome = frame.click(anchor(&frame, 0));
        assert!(matches!(outcome, Ok(ClickOutcome::Navigating(_))));
        assert!(frame.is_loading());
    }

    #[test]
    fn json_not_found_body_renders_as_text() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("/static/projects/p/1.0/missing.html"), Ok(true)));
        frame.pump(&site);
        match frame.content_window() {
            Ok(window) => {
                assert_eq!(window.status(), 404);
                assert_eq!(window.document().body_text(), NOT_FOUND_SENTINEL);
            }
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn cross_origin_documents_are_unavailable() {
        let site = site();
        let mut frame = frame();
        assert!(matches!(frame.set_src("http://other.test/static/projects/p/1.0/"), Ok(true)));
        frame.pump(&site);
        assert!(frame.content_window().is_err());
        assert_eq!(frame.location_href(), None);
    }
}
