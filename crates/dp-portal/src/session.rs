//! One portal session: host history, the mounted page and background work.
//!
//! All state lives on the UI thread. Slow work is described as [`Task`]s,
//! which the shell may run anywhere; their [`TaskResult`]s come back through
//! [`PortalSession::complete`] and are dropped when the page that asked for
//! them is gone.

use crate::context::PortalContext;
use crate::controller::DocumentationController;
use crate::controller::ResolveRequest;
use crate::controller::ResolveTicket;
use crate::error_view::ErrorView;
use crate::resolve::ResolvedVersion;
use crate::resolve::resolve_version;
use crate::view::LandingPage;
use crate::view::ShellModel;
use crate::view::VersionDropdownModel;
use crate::view::VersionsOverview;
use dp_api::PortalApi;
use dp_api::listing::ProjectGroup;
use dp_api::listing::group_projects_by_categories;
use dp_core::ColorMode;
use dp_core::EffectiveColorMode;
use dp_core::PortalResult;
use dp_dom::NodeId;
use dp_frame::ClickOutcome;
use dp_frame::DocumentLoader;
use dp_frame::LoadedDocument;
use dp_frame::NavigationRequest;
use dp_router::HostHistory;
use dp_router::HostRoute;

#[derive(Debug)]
pub enum Page {
    Landing(LandingPage),
    Versions(VersionsOverview),
    Documentation(Box<DocumentationController>),
    NotFound { path: String },
    /// A page that could not be mounted at all.
    Failed(ErrorView),
}

/// Background work requested by the session.
#[derive(Debug, Clone)]
pub enum Task {
    LoadLanding { generation: u64 },
    LoadVersions { generation: u64, project: String },
    LoadDropdown { generation: u64, project: String },
    Resolve { generation: u64, request: ResolveRequest },
    LoadDocument { generation: u64, request: NavigationRequest },
    LoadShell,
}

#[derive(Debug)]
pub enum TaskResult {
    Landing {
        generation: u64,
        result: PortalResult<Vec<ProjectGroup>>,
    },
    Versions {
        generation: u64,
        project: String,
        result: PortalResult<Vec<String>>,
    },
    Dropdown {
        generation: u64,
        project: String,
        result: PortalResult<Vec<String>>,
    },
    Resolved {
        generation: u64,
        ticket: ResolveTicket,
        result: PortalResult<ResolvedVersion>,
    },
    Document {
        generation: u64,
        id: u64,
        result: PortalResult<LoadedDocument>,
    },
    Shell(Box<ShellModel>),
}

impl Task {
    /// Performs the blocking part of the task.
    pub fn run(self, api: &dyn PortalApi, loader: &dyn DocumentLoader) -> TaskResult {
        match self {
            Self::LoadLanding { generation } => {
                let result = api.list_projects().and_then(|projects| {
                    let categories = api.list_project_categories()?;
                    Ok(group_projects_by_categories(&projects, &categories))
                });
                TaskResult::Landing { generation, result }
            }
            Self::LoadVersions {
                generation,
                project,
            } => {
                let result = api.list_project_versions(&project);
                TaskResult::Versions {
                    generation,
                    project,
                    result,
                }
            }
            Self::LoadDropdown {
                generation,
                project,
            } => {
                let result = api.list_project_versions(&project);
                TaskResult::Dropdown {
                    generation,
                    project,
                    result,
                }
            }
            Self::Resolve {
                generation,
                request,
            } => TaskResult::Resolved {
                generation,
                ticket: request.ticket,
                result: resolve_version(api, &request.project, &request.version),
            },
            Self::LoadDocument {
                generation,
                request,
            } => TaskResult::Document {
                generation,
                id: request.id,
                result: loader.load(&request.url),
            },
            Self::LoadShell => TaskResult::Shell(Box::new(load_shell(api))),
        }
    }
}

fn load_shell(api: &dyn PortalApi) -> ShellModel {
    fn logged<T>(what: &str, result: PortalResult<T>) -> Option<T> {
        result
            .inspect_err(|error| tracing::error!(what, error = %error, "shell lookup failed"))
            .ok()
    }

    ShellModel {
        app_version: logged("app version", api.app_version()),
        theme: logged("theme plugin", api.theme_plugin()).and_then(|plugin| plugin.fields),
        footer: logged("footer plugin", api.footer_plugin()).and_then(|plugin| plugin.fields),
        search: logged("search plugin", api.orama_plugin()).and_then(|plugin| plugin.fields),
        light_logo: logged("light logo", api.logo_url(EffectiveColorMode::Light)).flatten(),
        dark_logo: logged("dark logo", api.logo_url(EffectiveColorMode::Dark)).flatten(),
    }
}

#[derive(Debug)]
pub struct PortalSession {
    ctx: PortalContext,
    history: HostHistory,
    generation: u64,
    page: Page,
    dropdown: Option<VersionDropdownModel>,
    shell: ShellModel,
    queued: Vec<Task>,
}

impl PortalSession {
    /// Opens the portal at `initial_path` and queues its first loads.
    pub fn new(ctx: PortalContext, initial_path: &str) -> Self {
        let mut session = Self {
            ctx,
            history: HostHistory::new(initial_path),
            generation: 0,
            page: Page::Landing(LandingPage::Loading),
            dropdown: None,
            shell: ShellModel::default(),
            queued: vec![Task::LoadShell],
        };
        session.sync_route();
        session
    }

    pub fn context(&self) -> &PortalContext {
        &self.ctx
    }

    pub fn history(&self) -> &HostHistory {
        &self.history
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn documentation(&self) -> Option<&DocumentationController> {
        match &self.page {
            Page::Documentation(controller) => Some(&**controller),
            _ => None,
        }
    }

    pub fn dropdown(&self) -> Option<&VersionDropdownModel> {
        self.dropdown.as_ref()
    }

    pub fn shell(&self) -> &ShellModel {
        &self.shell
    }

    /// Title for the host window.
    pub fn window_title(&self) -> String {
        match &self.page {
            Page::Documentation(controller) if !controller.document_title().is_empty() => {
                controller.document_title().to_owned()
            }
            _ => crate::view::TEXT_LOGO.to_owned(),
        }
    }

    /// Collects every task that is ready to run.
    pub fn take_tasks(&mut self) -> Vec<Task> {
        let mut tasks = std::mem::take(&mut self.queued);
        if let Page::Documentation(controller) = &mut self.page {
            if let Some(request) = controller.take_resolve_request() {
                tasks.push(Task::Resolve {
                    generation: self.generation,
                    request,
                });
            }
            if let Some(request) = controller.take_navigation() {
                tasks.push(Task::LoadDocument {
                    generation: self.generation,
                    request,
                });
            }
        }
        tasks
    }

    /// Applies a finished task. Returns `false` when its page is gone.
    pub fn complete(&mut self, result: TaskResult) -> bool {
        let generation = self.generation;
        let applied = match result {
            TaskResult::Shell(shell) => {
                self.shell = *shell;
                true
            }
            TaskResult::Landing {
                generation: tag,
                result,
            } if tag == generation => match &mut self.page {
                Page::Landing(page) => {
                    *page = LandingPage::from_result(result);
                    true
                }
                _ => false,
            },
            TaskResult::Versions {
                generation: tag,
                project,
                result,
            } if tag == generation => match &mut self.page {
                Page::Versions(page) => {
                    *page = VersionsOverview::from_result(
                        &project,
                        result,
                        self.ctx.config().error_countdown_secs,
                    );
                    true
                }
                _ => false,
            },
            TaskResult::Dropdown {
                generation: tag,
                project,
                result,
            } if tag == generation => match result {
                Ok(versions) => {
                    let route_version = self
                        .documentation()
                        .map(|controller| controller.route().version().to_owned())
                        .unwrap_or_default();
                    self.dropdown = Some(VersionDropdownModel::new(
                        &project,
                        &route_version,
                        &versions,
                        self.ctx.config().dropdown_recent_versions,
                    ));
                    true
                }
                Err(error) => {
                    tracing::error!(project, error = %error, "failed to load version dropdown");
                    false
                }
            },
            TaskResult::Resolved {
                generation: tag,
                ticket,
                result,
            } if tag == generation => match &mut self.page {
                Page::Documentation(controller) => {
                    controller.complete_resolution(&self.ctx, ticket, result, &mut self.history)
                }
                _ => false,
            },
            TaskResult::Document {
                generation: tag,
                id,
                result,
            } if tag == generation => match &mut self.page {
                Page::Documentation(controller) => {
                    controller.complete_navigation(&self.ctx, id, result, &mut self.history)
                }
                _ => false,
            },
            _ => {
                tracing::debug!(generation, "dropping result for an unmounted page");
                false
            }
        };
        self.refresh_dropdown_selection();
        applied
    }

    /// Runs every task to completion on the calling thread.
    pub fn run_pending(&mut self) {
        let api = self.ctx.api().clone();
        let loader = self.ctx.loader().clone();
        loop {
            let tasks = self.take_tasks();
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                let result = task.run(api.as_ref(), loader.as_ref());
                self.complete(result);
            }
        }
    }

    /// Pushes `path` onto the host history and shows it.
    pub fn navigate(&mut self, path: &str) {
        if self.history.current() == path {
            return;
        }
        self.history.push(path);
        self.sync_route();
    }

    pub fn back(&mut self) -> bool {
        let moved = self.history.back();
        if moved {
            self.sync_route();
        }
        moved
    }

    pub fn forward(&mut self) -> bool {
        let moved = self.history.forward();
        if moved {
            self.sync_route();
        }
        moved
    }

    /// Landing page "Reload Projects".
    pub fn reload_landing(&mut self) {
        if let Page::Landing(page) = &mut self.page {
            *page = LandingPage::Loading;
            self.generation = self.generation.saturating_add(1);
            self.queued.push(Task::LoadLanding {
                generation: self.generation,
            });
        }
    }

    /// Clicks a node in the embedded document.
    pub fn click(&mut self, node: NodeId) -> PortalResult<ClickOutcome> {
        let before = self.history.current().to_owned();
        let outcome = match &mut self.page {
            Page::Documentation(controller) => {
                controller.click(&self.ctx, node, &mut self.history)?
            }
            _ => ClickOutcome::Ignored,
        };
        if self.history.current() != before {
            self.sync_route();
        }
        Ok(outcome)
    }

    /// Applies a fragment change made by the embedded page.
    pub fn set_frame_hash(&mut self, hash: &str) -> PortalResult<()> {
        if let Page::Documentation(controller) = &mut self.page {
            controller.set_frame_hash(&self.ctx, hash, &mut self.history)?;
        }
        Ok(())
    }

    /// Applies a title change made by the embedded page.
    pub fn set_frame_title(&mut self, title: &str) -> PortalResult<()> {
        if let Page::Documentation(controller) = &mut self.page {
            controller.set_frame_title(&self.ctx, title, &mut self.history)?;
        }
        Ok(())
    }

    /// One second elapsed.
    pub fn tick(&mut self) {
        let moved = match &mut self.page {
            Page::Documentation(controller) => controller.tick(&mut self.history),
            Page::Versions(VersionsOverview::Error(view)) | Page::Failed(view) => {
                view.tick() && go_back(&mut self.history)
            }
            _ => false,
        };
        if moved {
            self.sync_route();
        }
    }

    /// The error view's action button.
    pub fn trigger_error_action(&mut self) {
        if matches!(self.page, Page::Landing(LandingPage::Error(_))) {
            self.reload_landing();
            return;
        }
        let moved = match &mut self.page {
            Page::Documentation(controller) => controller.go_back(&mut self.history),
            Page::Versions(VersionsOverview::Error(view)) | Page::Failed(view) => {
                view.trigger() && go_back(&mut self.history)
            }
            _ => false,
        };
        if moved {
            self.sync_route();
        }
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.ctx.set_color_mode(mode);
        if let Page::Documentation(controller) = &mut self.page {
            controller.apply_color_mode(&self.ctx);
        }
    }

    pub fn set_system_prefers_dark(&mut self, prefers_dark: bool) {
        self.ctx.set_system_prefers_dark(prefers_dark);
        if let Page::Documentation(controller) = &mut self.page {
            controller.apply_color_mode(&self.ctx);
        }
    }

    pub fn take_external_requests(&mut self) -> Vec<String> {
        match &mut self.page {
            Page::Documentation(controller) => controller.take_external_requests(),
            _ => Vec::new(),
        }
    }

    /// Brings the mounted page in line with the current history entry.
    fn sync_route(&mut self) {
        let route = self.history.current_route();
        tracing::info!(path = self.history.current(), "host route");

        match route {
            HostRoute::Project { project } => {
                self.history
                    .replace(&HostRoute::latest_documentation(&project));
                self.sync_route();
            }
            HostRoute::Documentation(location) => {
                if let Page::Documentation(controller) = &mut self.page {
                    if controller.project() == location.project_name() {
                        controller.on_route(&self.ctx, location);
                        controller.process_frame_events(&self.ctx, &mut self.history);
                        self.refresh_dropdown_selection();
                        return;
                    }
                }
                let project = location.project_name().to_owned();
                let mount = self.remount();
                match DocumentationController::new(&self.ctx, location, mount) {
                    Ok(controller) => self.page = Page::Documentation(Box::new(controller)),
                    Err(error) => {
                        tracing::error!(error = %error, "failed to mount documentation view");
                        self.page = Page::Failed(ErrorView::go_back(
                            &error,
                            self.ctx.config().error_countdown_secs,
                        ));
                        return;
                    }
                }
                self.queued.push(Task::LoadDropdown {
                    generation: self.generation,
                    project,
                });
            }
            HostRoute::Versions { project } => {
                self.remount();
                self.page = Page::Versions(VersionsOverview::Loading);
                self.queued.push(Task::LoadVersions {
                    generation: self.generation,
                    project,
                });
            }
            HostRoute::Landing => {
                self.remount();
                self.page = Page::Landing(LandingPage::Loading);
                self.queued.push(Task::LoadLanding {
                    generation: self.generation,
                });
            }
            HostRoute::NotFound { path } => {
                self.remount();
                self.page = Page::NotFound { path };
            }
        }
    }

    /// Tears down the current page and starts a new generation.
    fn remount(&mut self) -> u64 {
        if let Page::Documentation(controller) = &mut self.page {
            controller.unmount();
        }
        self.dropdown = None;
        self.queued
            .retain(|task| matches!(task, Task::LoadShell));
        self.generation = self.generation.saturating_add(1);
        self.generation
    }

    fn refresh_dropdown_selection(&mut self) {
        let Some(version) = self
            .documentation()
            .map(|controller| controller.route().version().to_owned())
        else {
            return;
        };
        if let Some(dropdown) = self.dropdown.as_mut() {
            dropdown.select_route_version(&version);
        }
    }
}

fn go_back(history: &mut HostHistory) -> bool {
    if !history.back() {
        history.push("/");
    }
    true
}
