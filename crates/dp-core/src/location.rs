use crate::LATEST_ALIAS;
use crate::PortalError;
use crate::PortalResult;
use std::fmt;
use url::form_urlencoded;

/// Ordered query parameters, kept in their raw (still percent-encoded) form
/// so a canonical href reproduces the query exactly as the page emitted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchParams {
    pairs: Vec<(String, Option<String>)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `a=1&b=2`, with or without a leading `?`. Empty segments are dropped.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.to_owned(), Some(value.to_owned())),
                None => (segment.to_owned(), None),
            })
            .collect();

        Self { pairs }
    }

    pub fn push(&mut self, key: &str, value: &str) {
        let key = form_urlencoded::byte_serialize(key.as_bytes()).collect::<String>();
        let value = form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>();
        self.pairs.push((key, Some(value)));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Decoded value of the first parameter named `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        let query = self.to_query();
        form_urlencoded::parse(query.as_bytes())
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.into_owned())
    }

    /// Raw `key=value&...` form without the leading `?`.
    pub fn to_query(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| match value {
                Some(value) => format!("{key}={value}"),
                None => key.clone(),
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

/// Canonical address of a documentation page.
///
/// Project name and version are never empty. The page is a path relative to
/// the project/version root and defaults to the empty string. Values are
/// rebuilt rather than mutated: every `with_*` consumes and returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocLocation {
    project_name: String,
    version: String,
    page: String,
    hash: String,
    search: SearchParams,
}

impl DocLocation {
    pub fn new(project_name: impl Into<String>, version: impl Into<String>) -> PortalResult<Self> {
        let project_name = project_name.into();
        let version = version.into();
        if project_name.trim().is_empty() || version.trim().is_empty() {
            return Err(PortalError::unparseable(format!("{project_name}/{version}")));
        }

        Ok(Self {
            project_name,
            version,
            page: String::new(),
            hash: String::new(),
            search: SearchParams::default(),
        })
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        let page = page.into();
        self.page = page.trim_start_matches('/').to_owned();
        self
    }

    /// Stores the fragment without its leading `#`; an empty fragment stays empty.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        self.hash = hash.strip_prefix('#').unwrap_or(&hash).to_owned();
        self
    }

    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> PortalResult<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(PortalError::unparseable(format!("{}/", self.project_name)));
        }
        self.version = version;
        Ok(self)
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn search(&self) -> &SearchParams {
        &self.search
    }

    pub fn is_latest_alias(&self) -> bool {
        self.version == LATEST_ALIAS
    }

    /// `page[?search][#hash]`, the part of a URL after `{project}/{version}/`.
    pub fn page_suffix(&self) -> String {
        let mut out = self.page.clone();
        if !self.search.is_empty() {
            out.push('?');
            out.push_str(&self.search.to_query());
        }
        if !self.hash.is_empty() {
            out.push('#');
            out.push_str(&self.hash);
        }
        out
    }

    /// Host router path: `/{project}/{version}/{page}[?search][#hash]`.
    pub fn host_path(&self) -> String {
        format!(
            "/{}/{}/{}",
            self.project_name,
            self.version,
            self.page_suffix()
        )
    }

    /// Address loaded inside the embedded frame.
    pub fn frame_src(&self, static_prefix: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            static_prefix.trim_end_matches('/'),
            self.project_name,
            self.version,
            self.page_suffix()
        )
    }

    /// Same document, ignoring the fragment.
    pub fn same_document(&self, other: &Self) -> bool {
        self.project_name == other.project_name
            && self.version == other.version
            && self.page == other.page
            && self.search == other.search
    }
}

impl fmt::Display for DocLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host_path())
    }
}

#[cfg(test)]
mod tests {
    use super::DocLocation;
    use super::SearchParams;

    fn location(project: &str, version: &str) -> DocLocation {
        match DocLocation::new(project, version) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn rejects_empty_project_or_version() {
        assert!(DocLocation::new("", "1.0").is_err());
        assert!(DocLocation::new("project", " ").is_err());
    }

    #[test]
    fn serializes_host_path_and_frame_src() {
        let doc = location("project-one", "6.0")
            .with_page("api/index.html")
            .with_search(SearchParams::parse("?q=term&x"))
            .with_hash("#section");

        assert_eq!(doc.host_path(), "/project-one/6.0/api/index.html?q=term&x#section");
        assert_eq!(
            doc.frame_src("/static/projects/"),
            "/static/projects/project-one/6.0/api/index.html?q=term&x#section"
        );
    }

    #[test]
    fn empty_page_keeps_trailing_slash() {
        let doc = location("meta-project", "1.3.0").with_hash("");
        assert_eq!(doc.page(), "");
        assert_eq!(doc.hash(), "");
        assert_eq!(doc.host_path(), "/meta-project/1.3.0/");
    }

    #[test]
    fn search_params_decode_on_lookup() {
        let mut params = SearchParams::parse("highlight=foo%20bar");
        params.push("area", "a b");
        assert_eq!(params.get("highlight").as_deref(), Some("foo bar"));
        assert_eq!(params.get("area").as_deref(), Some("a b"));
        assert_eq!(params.to_query(), "highlight=foo%20bar&area=a+b");
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn same_document_ignores_fragment() {
        let left = location("p", "1.0").with_page("a.html").with_hash("one");
        let right = location("p", "1.0").with_page("a.html").with_hash("two");
        assert!(left.same_document(&right));
        assert_ne!(left, right);
    }
}
