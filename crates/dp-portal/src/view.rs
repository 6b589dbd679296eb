//! View models for the shell: banner, dropdown, landing page, versions
//! overview, settings and logo.

use crate::error_view::ErrorView;
use crate::error_view::RELOAD_PROJECTS_LABEL;
use dp_api::listing::DropdownEntry;
use dp_api::listing::ProjectGroup;
use dp_api::listing::VersionGroup;
use dp_api::listing::group_versions_by_major;
use dp_api::listing::is_overview_value;
use dp_api::listing::selected_dropdown_value;
use dp_api::listing::version_dropdown_entries;
use dp_api::plugins::FooterPlugin;
use dp_api::plugins::OramaPlugin;
use dp_api::plugins::ThemePlugin;
use dp_core::ColorMode;
use dp_core::DocLocation;
use dp_core::EffectiveColorMode;
use dp_core::LATEST_ALIAS;
use dp_core::PortalError;
use dp_router::HostRoute;

pub const TEXT_LOGO: &str = "DocPortal";
pub const NO_PROJECTS_MESSAGE: &str = "No projects found";

/// Shown above an outdated version of a documentation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecatedBanner {
    pub text: String,
    /// Host path opened when the banner is activated.
    pub target: String,
}

impl DeprecatedBanner {
    pub fn for_location(location: &DocLocation, latest_version: &str) -> Option<Self> {
        let version = location.version();
        if version == LATEST_ALIAS || version == latest_version {
            return None;
        }
        let project = location.project_name();
        Some(Self {
            text: format!(
                "You're currently reading an old version ({version}) of {project}! \
                 To view the latest version of the documentation, click this banner."
            ),
            target: HostRoute::latest_documentation(project),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDropdownModel {
    pub project: String,
    pub entries: Vec<DropdownEntry>,
    pub selected: String,
    versions: Vec<String>,
}

impl VersionDropdownModel {
    /// `versions` is oldest first, as listed by the server.
    pub fn new(project: &str, route_version: &str, versions: &[String], recent: usize) -> Self {
        Self {
            project: project.to_owned(),
            entries: version_dropdown_entries(versions, recent),
            selected: selected_dropdown_value(route_version, versions),
            versions: versions.to_vec(),
        }
    }

    /// Follows the route to another version of the same project.
    pub fn select_route_version(&mut self, route_version: &str) {
        self.selected = selected_dropdown_value(route_version, &self.versions);
    }

    /// Host path to navigate to when `value` is picked.
    pub fn on_select(&self, value: &str) -> String {
        if is_overview_value(value) {
            HostRoute::Versions {
                project: self.project.clone(),
            }
            .format()
        } else {
            format!("/{}/{value}/", self.project)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingPage {
    Loading,
    Loaded(Vec<ProjectGroup>),
    Error(ErrorView),
}

impl LandingPage {
    /// An empty listing is reported like a failure, with a reload action.
    pub fn from_result(result: Result<Vec<ProjectGroup>, PortalError>) -> Self {
        match result {
            Ok(groups) if groups.is_empty() => {
                Self::Error(ErrorView::manual(NO_PROJECTS_MESSAGE, RELOAD_PROJECTS_LABEL))
            }
            Ok(groups) => Self::Loaded(groups),
            Err(error) => {
                tracing::error!(code = error.code(), error = %error, "failed to load projects");
                Self::Error(ErrorView::manual(
                    &error.user_message(),
                    RELOAD_PROJECTS_LABEL,
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionsOverview {
    Loading,
    Loaded {
        project: String,
        groups: Vec<VersionGroup>,
    },
    Error(ErrorView),
}

impl VersionsOverview {
    pub fn from_result(
        project: &str,
        result: Result<Vec<String>, PortalError>,
        countdown_secs: u32,
    ) -> Self {
        match result {
            Ok(versions) => Self::Loaded {
                project: project.to_owned(),
                groups: group_versions_by_major(&versions),
            },
            Err(error) => {
                tracing::error!(project, code = error.code(), error = %error, "failed to load versions");
                Self::Error(ErrorView::go_back(&error, countdown_secs))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logo {
    Image(String),
    Text(&'static str),
}

/// Server-provided chrome: plugins, app version and fallback logos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellModel {
    pub app_version: Option<String>,
    pub theme: Option<ThemePlugin>,
    pub footer: Option<FooterPlugin>,
    pub search: Option<OramaPlugin>,
    pub light_logo: Option<String>,
    pub dark_logo: Option<String>,
}

impl ShellModel {
    pub fn logo(&self, mode: EffectiveColorMode, compact: bool) -> Logo {
        let fallback = match mode {
            EffectiveColorMode::Light => self.light_logo.as_deref(),
            EffectiveColorMode::Dark => self.dark_logo.as_deref(),
        };
        select_logo(self.theme.as_ref(), fallback, mode, compact)
    }

    pub fn settings(&self, selected: ColorMode) -> SettingsView {
        SettingsView {
            app_version: self.app_version.clone(),
            selected,
            options: ColorMode::ALL.to_vec(),
        }
    }
}

/// Theme logo for `mode`, the small one first in compact layouts, then the
/// server's logo setting, then the text logo.
pub fn select_logo(
    theme: Option<&ThemePlugin>,
    fallback: Option<&str>,
    mode: EffectiveColorMode,
    compact: bool,
) -> Logo {
    let themed = theme.and_then(|theme| {
        let settings = theme.settings(mode);
        let (first, second) = if compact {
            (&settings.logo_url_small, &settings.logo_url)
        } else {
            (&settings.logo_url, &settings.logo_url_small)
        };
        first.as_deref().or(second.as_deref())
    });

    match themed.or(fallback).filter(|url| !url.trim().is_empty()) {
        Some(url) => Logo::Image(url.to_owned()),
        None => Logo::Text(TEXT_LOGO),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub app_version: Option<String>,
    pub selected: ColorMode,
    pub options: Vec<ColorMode>,
}
