//! Version existence check and `latest` alias resolution.

use dp_api::PortalApi;
use dp_core::DocLocation;
use dp_core::LATEST_ALIAS;
use dp_core::PortalResult;

/// Outcome of resolving the routed version of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub project: String,
    pub requested: String,
    /// Concrete version to display, never the alias.
    pub version: String,
    pub latest: String,
}

impl ResolvedVersion {
    /// Whether the address bar has to be rewritten to the concrete version.
    pub fn needs_redirect(&self) -> bool {
        self.requested != self.version
    }

    /// The routed version is an older release.
    pub fn is_deprecated(&self) -> bool {
        self.requested != LATEST_ALIAS && self.requested != self.latest
    }

    /// `location` moved to the concrete version, when it named the alias.
    pub fn redirect_location(&self, location: &DocLocation) -> PortalResult<Option<DocLocation>> {
        if !self.needs_redirect() {
            return Ok(None);
        }
        location.clone().with_version(self.version.clone()).map(Some)
    }
}

/// Confirms `requested` exists and finds the latest version.
///
/// Both lookups finish before the caller shows anything. Failures are
/// returned as-is and never retried.
pub fn resolve_version(
    api: &dyn PortalApi,
    project: &str,
    requested: &str,
) -> PortalResult<ResolvedVersion> {
    let lookup = api.project_version(project, requested)?;
    let latest = match lookup.latest() {
        Some(latest) => latest.to_owned(),
        None if requested == LATEST_ALIAS => lookup.version().to_owned(),
        None => api
            .project_version(project, LATEST_ALIAS)?
            .version()
            .to_owned(),
    };

    let resolved = ResolvedVersion {
        project: project.to_owned(),
        requested: requested.to_owned(),
        version: lookup.version().to_owned(),
        latest,
    };
    tracing::info!(
        project,
        requested,
        version = resolved.version.as_str(),
        latest = resolved.latest.as_str(),
        "version resolved"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::resolve_version;
    use dp_api::MemoryPortalApi;
    use dp_api::Project;
    use dp_core::DocLocation;
    use dp_core::PortalError;

    fn api() -> MemoryPortalApi {
        MemoryPortalApi::new().with_project(Project::new("p", "P", None), &["1.0", "2.0"])
    }

    #[test]
    fn alias_resolves_and_redirects() {
        let resolved = match resolve_version(&api(), "p", "latest") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(resolved.version, "2.0");
        assert!(resolved.needs_redirect());
        assert!(!resolved.is_deprecated());

        let location = match DocLocation::new("p", "latest") {
            Ok(value) => value.with_page("guide.html").with_hash("x"),
            Err(error) => panic!("{error}"),
        };
        let redirected = match resolved.redirect_location(&location) {
            Ok(Some(value)) => value,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(redirected.host_path(), "/p/2.0/guide.html#x");
    }

    #[test]
    fn older_versions_are_deprecated_without_redirect() {
        let resolved = match resolve_version(&api(), "p", "1.0") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert!(!resolved.needs_redirect());
        assert!(resolved.is_deprecated());
        assert_eq!(resolved.latest, "2.0");
    }

    #[test]
    fn unknown_version_is_reported_once() {
        let api = api();
        assert!(matches!(
            resolve_version(&api, "p", "9.9"),
            Err(PortalError::VersionNotFound { .. })
        ));
        assert_eq!(api.version_lookups(), 1);
    }
}
