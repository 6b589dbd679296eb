use dp_core::DocLocation;
use dp_core::SearchParams;
use url::Url;

/// Where the embedded frame currently is, plus its document title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLocation {
    pub location: DocLocation,
    pub title: String,
}

/// Parses the frame's live address.
///
/// Returns `None` when the address is unavailable, not a URL, or not under
/// `static_prefix` (for example `about:blank` before the first load).
pub fn parse_frame_location(
    address: Option<&str>,
    static_prefix: &str,
    title: &str,
) -> Option<FrameLocation> {
    let url = Url::parse(address?).ok()?;
    let prefix = format!("/{}/", static_prefix.trim_matches('/'));
    let rest = url.path().strip_prefix(prefix.as_str())?;

    let mut segments = rest.splitn(3, '/');
    let project = segments.next().filter(|segment| !segment.is_empty())?;
    let version = segments.next().filter(|segment| !segment.is_empty())?;
    let page = segments.next().unwrap_or_default();

    let location = DocLocation::new(project, version)
        .ok()?
        .with_page(page)
        .with_hash(url.fragment().unwrap_or_default())
        .with_search(SearchParams::parse(url.query().unwrap_or_default()));

    Some(FrameLocation {
        location,
        title: title.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::parse_frame_location;

    const PREFIX: &str = "/static/projects/";

    #[test]
    fn parses_page_hash_and_search() {
        let Some(parsed) = parse_frame_location(
            Some("http://localhost:8080/static/projects/p/2.0/guide/intro.html?highlight=x#setup"),
            PREFIX,
            "Intro",
        ) else {
            panic!("expected a location");
        };
        assert_eq!(parsed.location.project_name(), "p");
        assert_eq!(parsed.location.version(), "2.0");
        assert_eq!(parsed.location.page(), "guide/intro.html");
        assert_eq!(parsed.location.hash(), "setup");
        assert_eq!(parsed.location.search().get("highlight").as_deref(), Some("x"));
        assert_eq!(parsed.title, "Intro");
    }

    #[test]
    fn page_root_has_empty_page() {
        let Some(parsed) = parse_frame_location(
            Some("http://localhost:8080/static/projects/p/2.0/"),
            PREFIX,
            "",
        ) else {
            panic!("expected a location");
        };
        assert_eq!(parsed.location.page(), "");
        assert_eq!(parsed.location.hash(), "");
    }

    #[test]
    fn degrades_to_none() {
        assert!(parse_frame_location(None, PREFIX, "").is_none());
        assert!(parse_frame_location(Some("about:blank"), PREFIX, "").is_none());
        assert!(parse_frame_location(Some("not a url"), PREFIX, "").is_none());
        assert!(
            parse_frame_location(Some("http://localhost:8080/p/2.0/index.html"), PREFIX, "")
                .is_none()
        );
        assert!(
            parse_frame_location(Some("http://localhost:8080/static/projects/p"), PREFIX, "")
                .is_none()
        );
    }
}
