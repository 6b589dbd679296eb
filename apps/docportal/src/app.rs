//! The native shell around a [`PortalSession`].

use crate::document_view;
use crate::document_view::Block;
use crate::logo::DecodedLogo;
use crate::logo::fetch_logo;
use dp_api::PortalApi;
use dp_api::plugins::FooterLinkTarget;
use dp_core::ColorMode;
use dp_core::EffectiveColorMode;
use dp_core::PortalResult;
use dp_dom::NodeId;
use dp_frame::DocumentLoader;
use dp_net::NetStack;
use dp_portal::ControllerState;
use dp_portal::DocumentationController;
use dp_portal::ErrorView;
use dp_portal::Page;
use dp_portal::PortalSession;
use dp_portal::Task;
use dp_portal::TaskResult;
use dp_portal::view::LandingPage;
use dp_portal::view::Logo;
use dp_portal::view::VersionsOverview;
use dp_router::HostRoute;
use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const LOADING_REPAINT_INTERVAL: Duration = Duration::from_millis(50);
const COMPACT_WIDTH: f32 = 720.0;
const LOGO_HEIGHT: f32 = 28.0;
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 65, 65);
const BANNER_COLOR: egui::Color32 = egui::Color32::from_rgb(214, 160, 40);

enum UiAction {
    Navigate(String),
    Back,
    Forward,
    Click(NodeId),
    ErrorAction,
    SetColorMode(ColorMode),
    ToggleSettings,
    OpenUrl { url: String, new_tab: bool },
}

enum LogoSlot {
    Pending,
    Ready(egui::TextureHandle),
    Failed,
}

/// Blocks laid out for one loaded frame document.
struct DocumentCache {
    key: (String, u64),
    blocks: Vec<Block>,
}

pub struct PortalApp {
    session: PortalSession,
    api: Arc<dyn PortalApi>,
    loader: Arc<dyn DocumentLoader>,
    net: NetStack,
    server_url: String,
    results_tx: mpsc::Sender<TaskResult>,
    results_rx: mpsc::Receiver<TaskResult>,
    in_flight: usize,
    last_tick: Instant,
    address_input: String,
    shown_path: String,
    window_title: String,
    show_settings: bool,
    system_dark: Option<bool>,
    visuals: Option<EffectiveColorMode>,
    document: Option<DocumentCache>,
    logos: HashMap<String, LogoSlot>,
    logo_tx: mpsc::Sender<(String, PortalResult<DecodedLogo>)>,
    logo_rx: mpsc::Receiver<(String, PortalResult<DecodedLogo>)>,
}

impl PortalApp {
    pub fn new(session: PortalSession, net: NetStack) -> Self {
        let api = session.context().api().clone();
        let loader = session.context().loader().clone();
        let server_url = session.context().config().server_url.clone();
        let (results_tx, results_rx) = mpsc::channel();
        let (logo_tx, logo_rx) = mpsc::channel();
        let address_input = session.history().current().to_owned();

        Self {
            session,
            api,
            loader,
            net,
            server_url,
            results_tx,
            results_rx,
            in_flight: 0,
            last_tick: Instant::now(),
            shown_path: address_input.clone(),
            address_input,
            window_title: String::new(),
            show_settings: false,
            system_dark: None,
            visuals: None,
            document: None,
            logos: HashMap::new(),
            logo_tx,
            logo_rx,
        }
    }

    fn dispatch_tasks(&mut self, ctx: &egui::Context) {
        for task in self.session.take_tasks() {
            self.spawn_task(ctx, task);
        }
    }

    fn spawn_task(&mut self, ctx: &egui::Context, task: Task) {
        let api = Arc::clone(&self.api);
        let loader = Arc::clone(&self.loader);
        let tx = self.results_tx.clone();
        let repaint = ctx.clone();
        let fallback = task.clone();

        let job = move || {
            let result = task.run(api.as_ref(), loader.as_ref());
            let _ = tx.send(result);
            repaint.request_repaint();
        };

        match thread::Builder::new()
            .name("docportal-task".to_owned())
            .spawn(job)
        {
            Ok(_) => self.in_flight = self.in_flight.saturating_add(1),
            Err(error) => {
                tracing::warn!(%error, "failed to spawn worker, running task inline");
                let result = fallback.run(self.api.as_ref(), self.loader.as_ref());
                self.session.complete(result);
            }
        }
    }

    fn poll_results(&mut self) {
        while let Ok(result) = self.results_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if !self.session.complete(result) {
                tracing::debug!("dropped result for a page that is gone");
            }
        }
    }

    fn poll_logos(&mut self, ctx: &egui::Context) {
        while let Ok((url, result)) = self.logo_rx.try_recv() {
            let slot = match result {
                Ok(decoded) => LogoSlot::Ready(ctx.load_texture(
                    format!("logo:{url}"),
                    egui::ColorImage::from_rgba_unmultiplied(
                        [decoded.width, decoded.height],
                        &decoded.rgba,
                    ),
                    egui::TextureOptions::LINEAR,
                )),
                Err(error) => {
                    tracing::warn!(url, code = error.code(), %error, "logo unavailable");
                    LogoSlot::Failed
                }
            };
            self.logos.insert(url, slot);
        }
    }

    fn request_logo(&mut self, ctx: &egui::Context, url: &str) {
        if self.logos.contains_key(url) {
            return;
        }
        self.logos.insert(url.to_owned(), LogoSlot::Pending);

        let net = self.net.clone();
        let server_url = self.server_url.clone();
        let logo_url = url.to_owned();
        let tx = self.logo_tx.clone();
        let repaint = ctx.clone();
        let job = move || {
            let result = fetch_logo(&net, &server_url, &logo_url);
            let _ = tx.send((logo_url, result));
            repaint.request_repaint();
        };
        if thread::Builder::new()
            .name("docportal-logo".to_owned())
            .spawn(job)
            .is_err()
        {
            self.logos.insert(url.to_owned(), LogoSlot::Failed);
        }
    }

    fn sync_system_theme(&mut self, ctx: &egui::Context) {
        let prefers_dark = ctx.system_theme().map(|theme| theme == egui::Theme::Dark);
        if let Some(prefers_dark) = prefers_dark.filter(|dark| Some(*dark) != self.system_dark) {
            tracing::debug!(prefers_dark, "system color scheme changed");
            self.system_dark = Some(prefers_dark);
            self.session.set_system_prefers_dark(prefers_dark);
        }

        let mode = self.session.context().effective_color_mode();
        if self.visuals != Some(mode) {
            ctx.set_visuals(match mode {
                EffectiveColorMode::Dark => egui::Visuals::dark(),
                EffectiveColorMode::Light => egui::Visuals::light(),
            });
            self.visuals = Some(mode);
        }
    }

    fn sync_window(&mut self, ctx: &egui::Context) {
        let title = self.session.window_title();
        if title != self.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }

        let current = self.session.history().current();
        if current != self.shown_path {
            self.shown_path = current.to_owned();
            self.address_input = current.to_owned();
        }
    }

    fn refresh_document(&mut self) {
        let Some(controller) = self.session.documentation() else {
            self.document = None;
            return;
        };
        let Ok(window) = controller.frame().content_window() else {
            self.document = None;
            return;
        };
        let key = (window.location().to_string(), window.epoch());
        if self.document.as_ref().is_some_and(|cache| cache.key == key) {
            return;
        }
        self.document = Some(DocumentCache {
            key,
            blocks: document_view::layout(window.document()),
        });
    }

    fn apply(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::Navigate(path) => self.session.navigate(&path),
            UiAction::Back => {
                self.session.back();
            }
            UiAction::Forward => {
                self.session.forward();
            }
            UiAction::Click(node) => {
                if let Err(error) = self.session.click(node) {
                    tracing::warn!(code = error.code(), %error, "frame click failed");
                }
            }
            UiAction::ErrorAction => self.session.trigger_error_action(),
            UiAction::SetColorMode(mode) => self.session.set_color_mode(mode),
            UiAction::ToggleSettings => self.show_settings = !self.show_settings,
            UiAction::OpenUrl { url, new_tab } => {
                let open = if new_tab {
                    egui::OpenUrl::new_tab(url)
                } else {
                    egui::OpenUrl::same_tab(url)
                };
                ctx.open_url(open);
            }
        }
    }

    fn render_menu_bar(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>, compact: bool) {
        let mode = self.session.context().effective_color_mode();
        ui.horizontal(|ui| {
            let logo = self.session.shell().logo(mode, compact);
            let clicked = match &logo {
                Logo::Image(url) => match self.logos.get(url) {
                    Some(LogoSlot::Ready(texture)) => ui
                        .add(
                            egui::Image::new(texture)
                                .max_height(LOGO_HEIGHT)
                                .sense(egui::Sense::click()),
                        )
                        .clicked(),
                    _ => ui.link(dp_portal::view::TEXT_LOGO).clicked(),
                },
                Logo::Text(text) => ui.link(egui::RichText::new(*text).strong()).clicked(),
            };
            if clicked {
                actions.push(UiAction::Navigate("/".to_owned()));
            }

            ui.separator();
            let history = self.session.history();
            if ui
                .add_enabled(history.can_go_back(), egui::Button::new("Back"))
                .clicked()
            {
                actions.push(UiAction::Back);
            }
            if ui
                .add_enabled(history.can_go_forward(), egui::Button::new("Forward"))
                .clicked()
            {
                actions.push(UiAction::Forward);
            }

            if let Some(dropdown) = self.session.dropdown() {
                let selected = dropdown
                    .entries
                    .iter()
                    .find(|entry| entry.value == dropdown.selected)
                    .map(|entry| entry.label.clone())
                    .unwrap_or_else(|| dropdown.selected.clone());
                let mut picked = dropdown.selected.clone();
                egui::ComboBox::from_id_salt("version_dropdown")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for entry in &dropdown.entries {
                            ui.selectable_value(&mut picked, entry.value.clone(), &entry.label);
                        }
                    });
                if picked != dropdown.selected {
                    actions.push(UiAction::Navigate(dropdown.on_select(&picked)));
                }
            }

            if ui.button("Settings").clicked() {
                actions.push(UiAction::ToggleSettings);
            }
        });
    }

    fn render_address_bar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.horizontal(|ui| {
            let width = (ui.available_width() - 60.0).max(160.0);
            let response = ui.add_sized(
                [width, 24.0],
                egui::TextEdit::singleline(&mut self.address_input).hint_text("/project/latest/"),
            );
            let pressed_enter =
                response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
            if pressed_enter || ui.button("Go").clicked() {
                let path = self.address_input.trim();
                let path = if path.starts_with('/') {
                    path.to_owned()
                } else {
                    format!("/{path}")
                };
                actions.push(UiAction::Navigate(path));
            }
        });
    }

    fn render_footer(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let shell = self.session.shell();
        ui.horizontal_wrapped(|ui| {
            if let Some(footer) = &shell.footer {
                for group in &footer.links {
                    ui.label(egui::RichText::new(&group.title).strong());
                    for link in &group.links {
                        if ui.link(&link.title).on_hover_text(&link.href).clicked() {
                            actions.push(UiAction::OpenUrl {
                                url: link.href.clone(),
                                new_tab: link.target == FooterLinkTarget::Blank,
                            });
                        }
                    }
                    ui.separator();
                }
                if let Some(copyright) = &footer.copyright {
                    ui.label(copyright);
                }
            }
            if self.in_flight > 0 {
                ui.separator();
                ui.spinner();
            }
        });
    }

    fn render_settings(&self, ctx: &egui::Context, open: &mut bool, actions: &mut Vec<UiAction>) {
        let settings = self
            .session
            .shell()
            .settings(self.session.context().color_mode());
        egui::Window::new("Settings")
            .id(egui::Id::new("settings_window"))
            .open(open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label("Color mode");
                for option in &settings.options {
                    if ui
                        .radio(*option == settings.selected, option.label())
                        .clicked()
                    {
                        actions.push(UiAction::SetColorMode(*option));
                    }
                }
                ui.separator();
                match &settings.app_version {
                    Some(version) => ui.label(format!("Version {version}")),
                    None => ui.label("Version unknown"),
                };
                if let Some(search) = &self.session.shell().search {
                    ui.label(format!("Search provided by {}", search.endpoint));
                }
            });
    }

    fn render_page(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        match self.session.page() {
            Page::Landing(landing) => render_landing(ui, landing, actions),
            Page::Versions(overview) => render_versions(ui, overview, actions),
            Page::Documentation(controller) => {
                self.render_documentation(ui, controller, actions);
            }
            Page::NotFound { path } => {
                ui.heading("Page not found");
                ui.label(format!("Nothing is served at {path}."));
                if ui.button("Go to projects").clicked() {
                    actions.push(UiAction::Navigate("/".to_owned()));
                }
            }
            Page::Failed(view) => render_error(ui, view, actions),
        }
    }

    fn render_documentation(
        &self,
        ui: &mut egui::Ui,
        controller: &DocumentationController,
        actions: &mut Vec<UiAction>,
    ) {
        if let Some(banner) = controller.deprecated_banner() {
            let clicked = egui::Frame::new()
                .fill(BANNER_COLOR)
                .inner_margin(egui::Margin::same(8))
                .show(ui, |ui| {
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(&banner.text).color(egui::Color32::BLACK),
                        )
                        .sense(egui::Sense::click()),
                    )
                    .clicked()
                })
                .inner;
            if clicked {
                actions.push(UiAction::Navigate(banner.target));
            }
        }

        match controller.state() {
            ControllerState::Resolving => {
                ui.centered_and_justified(|ui| ui.spinner());
            }
            ControllerState::NotFound | ControllerState::Error => match controller.error() {
                Some(view) => render_error(ui, view, actions),
                None => {
                    ui.colored_label(ERROR_COLOR, "Documentation unavailable");
                }
            },
            ControllerState::Loaded => match &self.document {
                Some(cache) => {
                    let clicked = egui::ScrollArea::vertical()
                        .id_salt("documentation_scroll")
                        .auto_shrink([false, false])
                        .show(ui, |ui| document_view::show(ui, &cache.blocks))
                        .inner;
                    if let Some(node) = clicked {
                        actions.push(UiAction::Click(node));
                    }
                }
                None => {
                    ui.centered_and_justified(|ui| ui.spinner());
                }
            },
        }
    }
}

fn render_error(ui: &mut egui::Ui, view: &ErrorView, actions: &mut Vec<UiAction>) {
    ui.vertical_centered(|ui| {
        ui.add_space(24.0);
        ui.colored_label(ERROR_COLOR, egui::RichText::new(view.message()).size(18.0));
        if let Some(description) = view.description() {
            ui.label(description);
        }
        if ui.button(view.action_label()).clicked() {
            actions.push(UiAction::ErrorAction);
        }
    });
}

fn render_landing(ui: &mut egui::Ui, landing: &LandingPage, actions: &mut Vec<UiAction>) {
    match landing {
        LandingPage::Loading => {
            ui.centered_and_justified(|ui| ui.spinner());
        }
        LandingPage::Error(view) => render_error(ui, view, actions),
        LandingPage::Loaded(groups) => {
            egui::ScrollArea::vertical()
                .id_salt("landing_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for group in groups {
                        ui.heading(&group.category);
                        for project in &group.projects {
                            if ui.link(&project.display_name).clicked() {
                                actions.push(UiAction::Navigate(
                                    HostRoute::latest_documentation(&project.name),
                                ));
                            }
                        }
                        ui.add_space(12.0);
                    }
                });
        }
    }
}

fn render_versions(ui: &mut egui::Ui, overview: &VersionsOverview, actions: &mut Vec<UiAction>) {
    match overview {
        VersionsOverview::Loading => {
            ui.centered_and_justified(|ui| ui.spinner());
        }
        VersionsOverview::Error(view) => render_error(ui, view, actions),
        VersionsOverview::Loaded { project, groups } => {
            egui::ScrollArea::vertical()
                .id_salt("versions_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading(format!("{project} versions"));
                    for group in groups {
                        ui.label(egui::RichText::new(group.label()).strong());
                        ui.horizontal_wrapped(|ui| {
                            for version in &group.versions {
                                if ui.link(version).clicked() {
                                    actions.push(UiAction::Navigate(format!(
                                        "/{project}/{version}/"
                                    )));
                                }
                            }
                        });
                        ui.add_space(8.0);
                    }
                });
        }
    }
}

impl eframe::App for PortalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_results();
        self.poll_logos(ctx);
        if self.last_tick.elapsed() >= TICK_INTERVAL {
            self.last_tick = Instant::now();
            self.session.tick();
        }
        self.sync_system_theme(ctx);

        for url in self.session.take_external_requests() {
            ctx.open_url(egui::OpenUrl::new_tab(url));
        }

        let compact = ctx.screen_rect().width() < COMPACT_WIDTH;
        let mode = self.session.context().effective_color_mode();
        if let Logo::Image(url) = self.session.shell().logo(mode, compact) {
            self.request_logo(ctx, &url);
        }

        self.refresh_document();
        self.sync_window(ctx);

        let mut actions = Vec::new();
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.render_menu_bar(ui, &mut actions, compact);
            self.render_address_bar(ui, &mut actions);
        });
        egui::TopBottomPanel::bottom("footer_panel").show(ctx, |ui| {
            self.render_footer(ui, &mut actions);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_page(ui, &mut actions);
        });

        let mut show_settings = self.show_settings;
        self.render_settings(ctx, &mut show_settings, &mut actions);
        self.show_settings = show_settings;

        for action in actions {
            self.apply(ctx, action);
        }

        self.dispatch_tasks(ctx);
        if self.in_flight > 0 {
            ctx.request_repaint_after(LOADING_REPAINT_INTERVAL);
        } else {
            ctx.request_repaint_after(TICK_INTERVAL);
        }
    }
}
