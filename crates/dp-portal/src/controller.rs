//! Documentation frame controller.
//!
//! Owns the embedded [`Frame`] and the single authoritative
//! [`ActiveFrameState`]. The host router and the frame can both move the
//! displayed location; every update is tagged with its [`UpdateSource`] and
//! dropped when it would not change anything, so neither side echoes the
//! other.

use crate::context::PortalContext;
use crate::error_view::ErrorView;
use crate::resolve::ResolvedVersion;
use crate::view::DeprecatedBanner;
use dp_core::DocLocation;
use dp_core::NOT_FOUND_SENTINEL;
use dp_core::PortalError;
use dp_core::PortalResult;
use dp_dom::NodeId;
use dp_frame::ClickOutcome;
use dp_frame::Frame;
use dp_frame::FrameEvent;
use dp_frame::FrameEventKind;
use dp_frame::ListenerId;
use dp_frame::LoadedDocument;
use dp_frame::NavigationRequest;
use dp_router::HostHistory;
use dp_uri::parse_frame_location;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for the version lookup.
    Resolving,
    Loaded,
    /// The frame received the server's not-found payload.
    NotFound,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    HostRoute,
    Frame,
}

/// What the frame is displaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFrameState {
    pub location: DocLocation,
    pub latest_version: String,
    pub title: String,
}

/// Identifies one version lookup of one mounted controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTicket {
    mount: u64,
    seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub ticket: ResolveTicket,
    pub project: String,
    pub version: String,
}

type Inbox = Rc<RefCell<VecDeque<DocLocation>>>;

pub struct DocumentationController {
    mount: u64,
    mounted: bool,
    state: ControllerState,
    frame: Frame,
    route: DocLocation,
    active: Option<ActiveFrameState>,
    resolve_seq: u64,
    resolve_pending: bool,
    load_listener: Option<ListenerId>,
    window_listeners: Vec<ListenerId>,
    inbox: Inbox,
    document_title: String,
    error: Option<ErrorView>,
}

impl DocumentationController {
    /// Mounts a controller for `location` and queues the version lookup.
    ///
    /// `mount` must be unique per session so that results addressed to an
    /// earlier controller are recognised as stale.
    pub fn new(ctx: &PortalContext, location: DocLocation, mount: u64) -> PortalResult<Self> {
        let mut frame = Frame::new(&ctx.config().server_url, ctx.storage().clone())?;
        let load_listener = frame.add_listener(FrameEventKind::Load)?;
        tracing::info!(mount, route = %location, "documentation view mounted");

        Ok(Self {
            mount,
            mounted: true,
            state: ControllerState::Resolving,
            frame,
            route: location,
            active: None,
            resolve_seq: 1,
            resolve_pending: true,
            load_listener: Some(load_listener),
            window_listeners: Vec::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            document_title: String::new(),
            error: None,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn active(&self) -> Option<&ActiveFrameState> {
        self.active.as_ref()
    }

    /// Location requested by the host route.
    pub fn route(&self) -> &DocLocation {
        &self.route
    }

    pub fn project(&self) -> &str {
        self.route.project_name()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn document_title(&self) -> &str {
        &self.document_title
    }

    pub fn error(&self) -> Option<&ErrorView> {
        self.error.as_ref()
    }

    pub fn deprecated_banner(&self) -> Option<DeprecatedBanner> {
        if self.state != ControllerState::Loaded {
            return None;
        }
        let active = self.active.as_ref()?;
        DeprecatedBanner::for_location(&active.location, &active.latest_version)
    }

    pub fn take_resolve_request(&mut self) -> Option<ResolveRequest> {
        if !self.mounted || !self.resolve_pending {
            return None;
        }
        self.resolve_pending = false;
        Some(ResolveRequest {
            ticket: ResolveTicket {
                mount: self.mount,
                seq: self.resolve_seq,
            },
            project: self.route.project_name().to_owned(),
            version: self.route.version().to_owned(),
        })
    }

    /// Applies a finished version lookup. Returns `false` for results that
    /// arrive after unmount or after a newer lookup was queued.
    pub fn complete_resolution(
        &mut self,
        ctx: &PortalContext,
        ticket: ResolveTicket,
        result: PortalResult<ResolvedVersion>,
        history: &mut HostHistory,
    ) -> bool {
        let current = ResolveTicket {
            mount: self.mount,
            seq: self.resolve_seq,
        };
        if !self.mounted || ticket != current || self.state != ControllerState::Resolving {
            tracing::debug!(mount = self.mount, "discarding stale version lookup");
            return false;
        }

        let resolved = match result {
            Ok(resolved) => resolved,
            Err(error) => {
                self.fail(ctx, &error);
                return true;
            }
        };

        match resolved.redirect_location(&self.route) {
            Ok(Some(redirected)) => {
                let target = redirected.host_path();
                tracing::info!(from = %self.route, to = target.as_str(), "redirecting alias");
                history.replace(&target);
                self.route = redirected;
            }
            Ok(None) => {}
            Err(error) => {
                self.fail(ctx, &error);
                return true;
            }
        }

        self.active = Some(ActiveFrameState {
            location: self.route.clone(),
            latest_version: resolved.latest,
            title: String::new(),
        });
        self.state = ControllerState::Loaded;
        self.error = None;
        self.load_frame(ctx);
        true
    }

    /// The host route changed to another location of this project.
    pub fn on_route(&mut self, ctx: &PortalContext, location: DocLocation) {
        if !self.mounted {
            return;
        }

        let version_changed = self
            .active
            .as_ref()
            .is_none_or(|active| active.location.version() != location.version());
        if version_changed || location.is_latest_alias() || self.state == ControllerState::Error {
            self.route = location;
            self.begin_resolution();
            return;
        }

        if self.state == ControllerState::NotFound {
            self.state = ControllerState::Loaded;
            self.error = None;
        }
        self.route = location.clone();
        self.reconcile(ctx, location, UpdateSource::HostRoute, None);
    }

    /// Hands the next document fetch to the caller.
    pub fn take_navigation(&mut self) -> Option<NavigationRequest> {
        if !self.mounted {
            return None;
        }
        self.frame.take_pending_navigation()
    }

    /// Applies a document fetch and handles the events it produced.
    pub fn complete_navigation(
        &mut self,
        ctx: &PortalContext,
        id: u64,
        result: PortalResult<LoadedDocument>,
        history: &mut HostHistory,
    ) -> bool {
        if !self.mounted {
            return false;
        }
        let applied = self.frame.complete_navigation(id, result);
        if applied {
            self.process_frame_events(ctx, history);
        }
        applied
    }

    /// Drains frame events in arrival order.
    pub fn process_frame_events(&mut self, ctx: &PortalContext, history: &mut HostHistory) {
        if !self.mounted {
            return;
        }
        for event in self.frame.take_events() {
            match event {
                FrameEvent::Load => self.on_frame_load(ctx, history),
                FrameEvent::LoadFailed(error) => {
                    if self.state == ControllerState::Loaded {
                        self.fail(ctx, &error);
                    }
                }
                FrameEvent::HashChange { new_url, .. } => {
                    tracing::debug!(url = new_url.as_str(), "frame hash changed");
                    self.sync_from_frame(ctx, history);
                }
                FrameEvent::TitleChange { title } => self.mirror_title(title),
            }
        }
    }

    /// Clicks a node inside the frame document.
    ///
    /// Intercepted same-project links push exactly one host history entry.
    pub fn click(
        &mut self,
        ctx: &PortalContext,
        node: NodeId,
        history: &mut HostHistory,
    ) -> PortalResult<ClickOutcome> {
        if !self.mounted {
            return Ok(ClickOutcome::Ignored);
        }
        let outcome = self.frame.click(node)?;

        let requested: Vec<DocLocation> = self.inbox.borrow_mut().drain(..).collect();
        for location in requested {
            let unchanged = self
                .active
                .as_ref()
                .is_some_and(|active| active.location == location);
            if unchanged {
                continue;
            }
            history.push(&location.host_path());
            self.on_route(ctx, location);
        }

        self.process_frame_events(ctx, history);
        Ok(outcome)
    }

    /// Reapplies the color scheme to the loaded document.
    pub fn apply_color_mode(&mut self, ctx: &PortalContext) {
        if !self.mounted {
            return;
        }
        dp_frame::apply_color_mode(&mut self.frame, ctx.effective_color_mode());
    }

    /// Changes the embedded page title, as a page script would.
    pub fn set_frame_title(
        &mut self,
        ctx: &PortalContext,
        title: &str,
        history: &mut HostHistory,
    ) -> PortalResult<()> {
        self.frame.set_document_title(title)?;
        self.process_frame_events(ctx, history);
        Ok(())
    }

    /// Changes the embedded page's fragment, as a page script would.
    pub fn set_frame_hash(
        &mut self,
        ctx: &PortalContext,
        hash: &str,
        history: &mut HostHistory,
    ) -> PortalResult<()> {
        self.frame.set_location_hash(hash)?;
        self.process_frame_events(ctx, history);
        Ok(())
    }

    /// Advances the error countdown; navigates back when it runs out.
    pub fn tick(&mut self, history: &mut HostHistory) -> bool {
        if !self.mounted {
            return false;
        }
        let due = self.error.as_mut().is_some_and(ErrorView::tick);
        if due {
            go_back(history);
        }
        due
    }

    /// The error view's "go back" action.
    pub fn go_back(&mut self, history: &mut HostHistory) -> bool {
        if !self.mounted {
            return false;
        }
        let run = self.error.as_mut().is_some_and(ErrorView::trigger);
        if run {
            go_back(history);
        }
        run
    }

    pub fn take_external_requests(&mut self) -> Vec<String> {
        self.frame.take_external_requests()
    }

    /// Detaches every listener. No state changes after this.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        for id in self.window_listeners.drain(..) {
            self.frame.remove_listener(id);
        }
        if let Some(id) = self.load_listener.take() {
            self.frame.remove_listener(id);
        }
        self.inbox.borrow_mut().clear();
        self.mounted = false;
        tracing::info!(mount = self.mount, "documentation view unmounted");
    }

    fn begin_resolution(&mut self) {
        self.state = ControllerState::Resolving;
        self.error = None;
        self.resolve_seq = self.resolve_seq.saturating_add(1);
        self.resolve_pending = true;
    }

    fn fail(&mut self, ctx: &PortalContext, error: &PortalError) {
        tracing::error!(code = error.code(), error = %error, route = %self.route, "documentation view failed");
        self.state = ControllerState::Error;
        self.error = Some(ErrorView::go_back(error, ctx.config().error_countdown_secs));
    }

    fn load_frame(&mut self, ctx: &PortalContext) {
        let src = self.route.frame_src(&ctx.config().static_prefix);
        match self.frame.set_src(&src) {
            Ok(true) => tracing::debug!(src = src.as_str(), "frame src assigned"),
            Ok(false) => tracing::debug!(src = src.as_str(), "frame already at src"),
            Err(error) => self.fail(ctx, &error),
        }
    }

    fn reconcile(
        &mut self,
        ctx: &PortalContext,
        location: DocLocation,
        source: UpdateSource,
        history: Option<&mut HostHistory>,
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.location == location {
            return;
        }
        tracing::debug!(?source, to = %location, "active location changed");
        active.location = location.clone();

        match source {
            UpdateSource::HostRoute => self.load_frame(ctx),
            UpdateSource::Frame => {
                self.route = location.clone();
                let path = location.host_path();
                if let Some(history) = history {
                    if history.current() != path {
                        history.replace(&path);
                    }
                }
            }
        }
    }

    fn on_frame_load(&mut self, ctx: &PortalContext, history: &mut HostHistory) {
        self.window_listeners.clear();
        let Some((project, version)) = self.active.as_ref().map(|active| {
            (
                active.location.project_name().to_owned(),
                active.location.version().to_owned(),
            )
        }) else {
            return;
        };

        let inbox = Rc::clone(&self.inbox);
        let on_internal_navigate = Rc::new(move |location: DocLocation| {
            inbox.borrow_mut().push_back(location);
        });
        let rewrites = match self.frame.content_window_mut() {
            Ok(window) => dp_frame::intercept(
                window.document_mut(),
                ctx.sanitizer(),
                &project,
                &version,
                on_internal_navigate,
            ),
            Err(error) => {
                tracing::warn!(error = %error, "frame content not accessible");
                return;
            }
        };
        tracing::debug!(anchors = rewrites.len(), "frame anchors intercepted");

        dp_frame::apply_color_mode(&mut self.frame, ctx.effective_color_mode());

        let (body_text, title) = match self.frame.content_window() {
            Ok(window) => (
                window.document().body_text(),
                window.document().title(),
            ),
            Err(error) => {
                tracing::warn!(error = %error, "frame content not accessible");
                return;
            }
        };
        if body_text.trim() == NOT_FOUND_SENTINEL {
            tracing::info!(route = %self.route, "frame page not found");
            self.state = ControllerState::NotFound;
            self.error = Some(ErrorView::go_back(
                &PortalError::PageNotFound,
                ctx.config().error_countdown_secs,
            ));
            return;
        }

        for kind in [FrameEventKind::HashChange, FrameEventKind::TitleChange] {
            match self.frame.add_listener(kind) {
                Ok(id) => self.window_listeners.push(id),
                Err(error) => tracing::warn!(error = %error, ?kind, "failed to attach frame listener"),
            }
        }

        self.mirror_title(title);
        self.sync_from_frame(ctx, history);
    }

    fn mirror_title(&mut self, title: String) {
        if let Some(active) = self.active.as_mut() {
            active.title = title.clone();
        }
        if !title.is_empty() {
            self.document_title = title;
        }
    }

    fn sync_from_frame(&mut self, ctx: &PortalContext, history: &mut HostHistory) {
        let title = self
            .active
            .as_ref()
            .map(|active| active.title.clone())
            .unwrap_or_default();
        let href = self.frame.location_href();
        let Some(parsed) = parse_frame_location(href.as_deref(), &ctx.config().static_prefix, &title)
        else {
            return;
        };
        self.reconcile(ctx, parsed.location, UpdateSource::Frame, Some(history));
    }
}

fn go_back(history: &mut HostHistory) {
    if !history.back() {
        history.push("/");
    }
}

impl std::fmt::Debug for DocumentationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentationController")
            .field("mount", &self.mount)
            .field("mounted", &self.mounted)
            .field("state", &self.state)
            .field("route", &self.route)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
