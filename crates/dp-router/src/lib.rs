//! Host router: route shapes and the host session history.

mod history;

pub use history::HistoryAction;
pub use history::HostHistory;

use dp_core::DocLocation;
use dp_core::LATEST_ALIAS;
use dp_core::SearchParams;

const VERSIONS_SEGMENT: &str = "versions";

/// A parsed host path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRoute {
    /// `/`
    Landing,
    /// `/{project}`; always redirected to the latest documentation.
    Project { project: String },
    /// `/{project}/versions`
    Versions { project: String },
    /// `/{project}/{version}/{*page}` with optional search and hash.
    Documentation(DocLocation),
    NotFound { path: String },
}

impl HostRoute {
    pub fn parse(path: &str) -> Self {
        let (before_hash, hash) = match path.split_once('#') {
            Some((head, hash)) => (head, hash),
            None => (path, ""),
        };
        let (route_path, query) = match before_hash.split_once('?') {
            Some((head, query)) => (head, query),
            None => (before_hash, ""),
        };

        let trimmed = route_path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Self::Landing;
        }

        let mut segments = trimmed.splitn(3, '/');
        let project = segments.next().unwrap_or_default();
        let version = segments.next().unwrap_or_default();
        let page = segments.next();

        match (version, page) {
            ("", None) => Self::Project {
                project: project.to_owned(),
            },
            (VERSIONS_SEGMENT, None | Some("")) => Self::Versions {
                project: project.to_owned(),
            },
            (version, page) => match DocLocation::new(project, version) {
                Ok(location) => Self::Documentation(
                    location
                        .with_page(page.unwrap_or_default())
                        .with_search(SearchParams::parse(query))
                        .with_hash(hash),
                ),
                Err(_) => Self::NotFound {
                    path: path.to_owned(),
                },
            },
        }
    }

    pub fn format(&self) -> String {
        match self {
            Self::Landing => "/".to_owned(),
            Self::Project { project } => format!("/{project}"),
            Self::Versions { project } => format!("/{project}/{VERSIONS_SEGMENT}"),
            Self::Documentation(location) => location.host_path(),
            Self::NotFound { path } => path.clone(),
        }
    }

    /// Where `/{project}` sends the user.
    pub fn latest_documentation(project: &str) -> String {
        format!("/{project}/{LATEST_ALIAS}/")
    }

    pub fn project(&self) -> Option<&str> {
        match self {
            Self::Project { project } | Self::Versions { project } => Some(project),
            Self::Documentation(location) => Some(location.project_name()),
            Self::Landing | Self::NotFound { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HostRoute;

    fn documentation(path: &str) -> dp_core::DocLocation {
        match HostRoute::parse(path) {
            HostRoute::Documentation(location) => location,
            other => panic!("unexpected route {other:?}"),
        }
    }

    #[test]
    fn parses_route_shapes() {
        assert_eq!(HostRoute::parse("/"), HostRoute::Landing);
        assert_eq!(HostRoute::parse(""), HostRoute::Landing);
        assert_eq!(
            HostRoute::parse("/p"),
            HostRoute::Project {
                project: "p".to_owned()
            }
        );
        assert_eq!(
            HostRoute::parse("/p/versions/"),
            HostRoute::Versions {
                project: "p".to_owned()
            }
        );
    }

    #[test]
    fn documentation_route_keeps_page_search_and_hash() {
        let location = documentation("/p/1.0/guide/intro.html?highlight=x#setup");
        assert_eq!(location.project_name(), "p");
        assert_eq!(location.version(), "1.0");
        assert_eq!(location.page(), "guide/intro.html");
        assert_eq!(location.search().get("highlight").as_deref(), Some("x"));
        assert_eq!(location.hash(), "setup");
        assert_eq!(
            HostRoute::Documentation(location).format(),
            "/p/1.0/guide/intro.html?highlight=x#setup"
        );
    }

    #[test]
    fn version_root_has_empty_page() {
        assert_eq!(documentation("/p/1.0").page(), "");
        assert_eq!(documentation("/p/1.0/").page(), "");
        assert_eq!(documentation("/p/1.0/#").hash(), "");
    }

    #[test]
    fn versions_segment_with_page_is_documentation() {
        assert_eq!(documentation("/p/versions/index.html").version(), "versions");
    }

    #[test]
    fn latest_redirect_target() {
        assert_eq!(HostRoute::latest_documentation("p"), "/p/latest/");
    }
}
