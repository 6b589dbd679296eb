use crate::PortalApi;
use crate::models::Project;
use crate::models::ProjectCategory;
use crate::models::VersionLookup;
use dp_core::EffectiveColorMode;
use dp_core::LATEST_ALIAS;
use dp_core::PortalError;
use dp_core::PortalResult;
use serde_json::Value;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// In-process [`PortalApi`] with server-like answers, for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryPortalApi {
    projects: Vec<Project>,
    categories: Vec<ProjectCategory>,
    versions: BTreeMap<String, Vec<String>>,
    plugins: BTreeMap<String, Value>,
    app_version: String,
    logos: BTreeMap<&'static str, String>,
    version_lookups: AtomicUsize,
}

impl MemoryPortalApi {
    pub fn new() -> Self {
        Self {
            app_version: "0.0.0".to_owned(),
            ..Self::default()
        }
    }

    /// Adds a project whose versions are listed oldest first.
    pub fn with_project(mut self, project: Project, versions: &[&str]) -> Self {
        self.versions.insert(
            project.name.clone(),
            versions.iter().map(|version| (*version).to_owned()).collect(),
        );
        self.projects.push(project);
        self
    }

    pub fn with_category(mut self, category: ProjectCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_plugin(mut self, name: &str, config: Value) -> Self {
        self.plugins.insert(name.to_owned(), config);
        self
    }

    pub fn with_app_version(mut self, version: &str) -> Self {
        self.app_version = version.to_owned();
        self
    }

    pub fn with_logo(mut self, mode: EffectiveColorMode, url: &str) -> Self {
        self.logos.insert(mode.as_str(), url.to_owned());
        self
    }

    /// Number of `project_version` calls answered.
    pub fn version_lookups(&self) -> usize {
        self.version_lookups.load(Ordering::Relaxed)
    }

    fn versions_of(&self, project: &str) -> PortalResult<&[String]> {
        self.versions
            .get(project)
            .map(Vec::as_slice)
            .ok_or_else(|| PortalError::ProjectNotFound {
                message: format!("Project {project} not found"),
            })
    }
}

impl PortalApi for MemoryPortalApi {
    fn list_projects(&self) -> PortalResult<Vec<Project>> {
        Ok(self.projects.clone())
    }

    fn list_project_categories(&self) -> PortalResult<Vec<ProjectCategory>> {
        Ok(self.categories.clone())
    }

    fn list_project_versions(&self, project: &str) -> PortalResult<Vec<String>> {
        self.versions_of(project).map(<[String]>::to_vec)
    }

    fn project_version(&self, project: &str, version: &str) -> PortalResult<VersionLookup> {
        self.version_lookups.fetch_add(1, Ordering::Relaxed);
        let versions = self.versions_of(project)?;
        let latest = versions.last().ok_or_else(|| PortalError::VersionNotFound {
            message: format!("Project {project} has no versions"),
        })?;

        if version == LATEST_ALIAS {
            return Ok(VersionLookup::Pair(latest.clone(), latest.clone()));
        }
        if versions.iter().any(|known| known == version) {
            return Ok(VersionLookup::Pair(version.to_owned(), latest.clone()));
        }
        Err(PortalError::VersionNotFound {
            message: format!("Version {version} of project {project} not found"),
        })
    }

    fn plugin_config(&self, name: &str) -> PortalResult<Value> {
        Ok(self
            .plugins
            .get(name)
            .cloned()
            .unwrap_or_else(|| json!({ "active": false, "name": name })))
    }

    fn app_version(&self) -> PortalResult<String> {
        Ok(self.app_version.clone())
    }

    fn logo_url(&self, mode: EffectiveColorMode) -> PortalResult<Option<String>> {
        Ok(self.logos.get(mode.as_str()).cloned())
    }
}
