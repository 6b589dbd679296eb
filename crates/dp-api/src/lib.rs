//! Client side of the documentation server's REST API.

mod http;
pub mod listing;
mod memory;
mod models;
pub mod plugins;

pub use http::HttpPortalApi;
pub use memory::MemoryPortalApi;
pub use models::Project;
pub use models::ProjectCategory;
pub use models::VersionLookup;
pub use plugins::PluginConfig;

use dp_core::EffectiveColorMode;
use dp_core::PortalResult;
use plugins::FooterPlugin;
use plugins::OramaPlugin;
use plugins::ThemePlugin;
use serde_json::Value;

/// Everything the portal asks of the server.
///
/// Implementations are shared with worker threads.
pub trait PortalApi: Send + Sync {
    /// `GET /api/projects/`
    fn list_projects(&self) -> PortalResult<Vec<Project>>;

    /// `GET /api/project_categories/`
    fn list_project_categories(&self) -> PortalResult<Vec<ProjectCategory>>;

    /// `GET /api/projects/{name}/versions/`, oldest first.
    fn list_project_versions(&self, project: &str) -> PortalResult<Vec<String>>;

    /// `GET /api/projects/{name}/versions/{version}`; `version` may be the
    /// `latest` alias. Fails with `ProjectNotFound` / `VersionNotFound`.
    fn project_version(&self, project: &str, version: &str) -> PortalResult<VersionLookup>;

    /// `GET /api/plugins/{name}/` as raw JSON.
    fn plugin_config(&self, name: &str) -> PortalResult<Value>;

    /// `GET /api/version/`
    fn app_version(&self) -> PortalResult<String>;

    /// `GET /api/settings/logo_url/{mode}`
    fn logo_url(&self, mode: EffectiveColorMode) -> PortalResult<Option<String>>;

    fn theme_plugin(&self) -> PortalResult<PluginConfig<ThemePlugin>> {
        plugins::decode_plugin(self.plugin_config(plugins::THEME_PLUGIN)?)
    }

    fn footer_plugin(&self) -> PortalResult<PluginConfig<FooterPlugin>> {
        plugins::decode_plugin(self.plugin_config(plugins::FOOTER_PLUGIN)?)
    }

    fn orama_plugin(&self) -> PortalResult<PluginConfig<OramaPlugin>> {
        plugins::decode_plugin(self.plugin_config(plugins::ORAMA_PLUGIN)?)
    }
}
