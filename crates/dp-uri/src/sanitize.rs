use dp_core::DocLocation;
use dp_core::PortalError;
use dp_core::PortalResult;
use dp_core::STATIC_PROJECTS_PREFIX;
use dp_core::SearchParams;
use url::Origin;
use url::ParseError;
use url::Url;

/// Outcome of classifying a single href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeResult {
    Internal {
        location: DocLocation,
        canonical_href: String,
    },
    External {
        href: String,
    },
}

impl SanitizeResult {
    fn internal(location: DocLocation) -> Self {
        let canonical_href = location.host_path();
        Self::Internal {
            location,
            canonical_href,
        }
    }

    pub fn location(&self) -> Option<&DocLocation> {
        match self {
            Self::Internal { location, .. } => Some(location),
            Self::External { .. } => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// Turns arbitrary hrefs into canonical [`DocLocation`]s for one host origin.
///
/// Classification rules:
///
/// * `http(s)` URLs on another origin, and URLs with any other scheme, are
///   [`SanitizeResult::External`] and are returned unchanged.
/// * Same-origin URLs whose path (after the optional static prefix) starts
///   with `{project}/{version}` are internal. Same-origin URLs with a scheme
///   that do not have that shape are external.
/// * Document-relative hrefs (`page.html`, `../x.html#id`, `?q=1`) are
///   remainders under the override project/version, resolved against that
///   root. Without overrides they must themselves start with
///   `{project}/{version}`.
/// * Anything else fails with [`PortalError::UnparseableUri`].
///
/// The `latest` alias is not special-cased.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    host: Url,
    host_origin: Origin,
    static_prefix: String,
}

impl Sanitizer {
    pub fn new(host_origin: &str) -> PortalResult<Self> {
        Self::with_static_prefix(host_origin, STATIC_PROJECTS_PREFIX)
    }

    pub fn with_static_prefix(host_origin: &str, static_prefix: &str) -> PortalResult<Self> {
        let host = Url::parse(host_origin).map_err(|_| PortalError::unparseable(host_origin))?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(PortalError::unparseable(host_origin));
        }
        let trimmed = static_prefix.trim_matches('/');
        let static_prefix = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        };

        Ok(Self {
            host_origin: host.origin(),
            host,
            static_prefix,
        })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn static_prefix(&self) -> &str {
        &self.static_prefix
    }

    pub fn sanitize(
        &self,
        href: &str,
        override_project: Option<&str>,
        override_version: Option<&str>,
    ) -> PortalResult<SanitizeResult> {
        let trimmed = href.trim();
        if trimmed.is_empty() {
            return Err(PortalError::unparseable(href));
        }

        match Url::parse(trimmed) {
            Ok(url) => Ok(self.classify_absolute(href, &url)),
            Err(ParseError::RelativeUrlWithoutBase) if is_origin_relative(trimmed) => {
                let url = self
                    .host
                    .join(trimmed)
                    .map_err(|_| PortalError::unparseable(href))?;
                if url.origin() != self.host_origin {
                    return Ok(SanitizeResult::External {
                        href: href.to_owned(),
                    });
                }
                self.location_from_url(&url)
                    .map(SanitizeResult::internal)
                    .ok_or_else(|| PortalError::unparseable(href))
            }
            Err(ParseError::RelativeUrlWithoutBase) => {
                self.classify_relative(href, trimmed, override_project, override_version)
            }
            Err(err) => {
                tracing::debug!(href, error = %err, "href failed to parse");
                Err(PortalError::unparseable(href))
            }
        }
    }

    fn classify_absolute(&self, raw: &str, url: &Url) -> SanitizeResult {
        let external = SanitizeResult::External {
            href: raw.to_owned(),
        };
        if !matches!(url.scheme(), "http" | "https") || url.origin() != self.host_origin {
            return external;
        }
        match self.location_from_url(url) {
            Some(location) => SanitizeResult::internal(location),
            None => external,
        }
    }

    fn classify_relative(
        &self,
        raw: &str,
        trimmed: &str,
        override_project: Option<&str>,
        override_version: Option<&str>,
    ) -> PortalResult<SanitizeResult> {
        let (path, query, fragment) = split_relative(trimmed);
        let prefix_without_slash = self.static_prefix.trim_start_matches('/');

        if !prefix_without_slash.is_empty() && path.starts_with(prefix_without_slash) {
            let location = location_from_parts(
                &path[prefix_without_slash.len()..],
                query,
                fragment,
            );
            return location
                .map(SanitizeResult::internal)
                .ok_or_else(|| PortalError::unparseable(raw));
        }

        match (override_project, override_version) {
            (Some(project), Some(version)) => {
                let location = DocLocation::new(project, version)
                    .map_err(|_| PortalError::unparseable(raw))?
                    .with_page(normalize_remainder(path))
                    .with_hash(fragment.unwrap_or_default())
                    .with_search(SearchParams::parse(query.unwrap_or_default()));
                Ok(SanitizeResult::internal(location))
            }
            _ => location_from_parts(path, query, fragment)
                .map(SanitizeResult::internal)
                .ok_or_else(|| PortalError::unparseable(raw)),
        }
    }

    fn location_from_url(&self, url: &Url) -> Option<DocLocation> {
        let path = url.path();
        let rest = path
            .strip_prefix(self.static_prefix.as_str())
            .unwrap_or_else(|| path.trim_start_matches('/'));
        location_from_parts(rest, url.query(), url.fragment())
    }
}

/// Resolves `href` against a document base URI, returning it unchanged when
/// there is no usable base.
pub fn resolve_against_base(base: Option<&str>, href: &str) -> String {
    let trimmed = href.trim();
    base.and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(trimmed).ok())
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|| trimmed.to_owned())
}

fn is_origin_relative(href: &str) -> bool {
    href.starts_with('/')
}

/// Builds a location from `{project}/{version}[/{page}]`.
fn location_from_parts(
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> Option<DocLocation> {
    let mut segments = path.splitn(3, '/');
    let project = segments.next().filter(|segment| !segment.is_empty())?;
    let version = segments.next().filter(|segment| !segment.is_empty())?;
    let page = segments.next().unwrap_or_default();

    DocLocation::new(project, version).ok().map(|location| {
        location
            .with_page(page)
            .with_hash(fragment.unwrap_or_default())
            .with_search(SearchParams::parse(query.unwrap_or_default()))
    })
}

fn split_relative(href: &str) -> (&str, Option<&str>, Option<&str>) {
    let (before_fragment, fragment) = match href.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (href, None),
    };
    let (path, query) = match before_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (before_fragment, None),
    };
    (path, query, fragment)
}

/// Resolves dot segments of a remainder against the project/version root.
fn normalize_remainder(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut trailing_dir = false;
    for segment in path.split('/') {
        trailing_dir = false;
        match segment {
            "" => trailing_dir = true,
            "." => trailing_dir = true,
            ".." => {
                out.pop();
                trailing_dir = true;
            }
            other => out.push(other),
        }
    }

    let mut joined = out.join("/");
    if trailing_dir && !joined.is_empty() {
        joined.push('/');
    }
    joined
}
