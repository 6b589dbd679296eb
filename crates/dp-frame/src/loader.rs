//! Sources of documents for the embedded frame.

use dp_core::NOT_FOUND_SENTINEL;
use dp_core::PortalError;
use dp_core::PortalResult;
use dp_net::ACCEPT_HTML;
use dp_net::NetStack;
use encoding_rs::Encoding;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use url::Url;

/// A fetched document before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub url: Url,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl LoadedDocument {
    pub fn is_html(&self) -> bool {
        is_html_content_type(&self.content_type)
    }
}

/// Fetches documents for frame navigations.
///
/// Implementations must be shareable with worker threads; the frame itself
/// stays on the UI thread and only receives the finished [`LoadedDocument`].
pub trait DocumentLoader: Send + Sync {
    fn load(&self, url: &Url) -> PortalResult<LoadedDocument>;
}

/// In-memory documentation site keyed by URL path.
///
/// Paths ending in `/` are served from `index.html`. Unknown paths answer
/// 404 with the JSON body the documentation server uses.
#[derive(Debug, Default)]
pub struct StaticSiteLoader {
    pages: BTreeMap<String, (String, String)>,
    loads: AtomicUsize,
}

impl StaticSiteLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, path: &str, html: &str) -> Self {
        self.insert(path, html);
        self
    }

    pub fn insert(&mut self, path: &str, html: &str) {
        self.insert_with_type(path, "text/html; charset=utf-8", html);
    }

    pub fn insert_with_type(&mut self, path: &str, content_type: &str, body: &str) {
        self.pages
            .insert(path.to_owned(), (content_type.to_owned(), body.to_owned()));
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl DocumentLoader for StaticSiteLoader {
    fn load(&self, url: &Url) -> PortalResult<LoadedDocument> {
        self.loads.fetch_add(1, Ordering::Relaxed);

        let path = url.path();
        let page = self.pages.get(path).or_else(|| {
            path.ends_with('/')
                .then(|| self.pages.get(&format!("{path}index.html")))
                .flatten()
        });

        Ok(match page {
            Some((content_type, body)) => LoadedDocument {
                url: url.clone(),
                status: 200,
                content_type: content_type.clone(),
                body: body.clone(),
            },
            None => LoadedDocument {
                url: url.clone(),
                status: 404,
                content_type: "application/json".to_owned(),
                body: NOT_FOUND_SENTINEL.to_owned(),
            },
        })
    }
}

/// Loads documentation pages from the documentation server.
#[derive(Debug, Clone)]
pub struct HttpDocumentLoader {
    net: NetStack,
}

impl HttpDocumentLoader {
    pub fn new(net: NetStack) -> Self {
        Self { net }
    }
}

impl DocumentLoader for HttpDocumentLoader {
    fn load(&self, url: &Url) -> PortalResult<LoadedDocument> {
        let fetched = self.net.fetch_following_redirects(url.as_str(), ACCEPT_HTML)?;
        let mut final_url =
            Url::parse(&fetched.url).map_err(|_| PortalError::unparseable(&fetched.url))?;
        if final_url.fragment().is_none() {
            final_url.set_fragment(url.fragment());
        }

        let response = fetched.response;
        let content_type = response.content_type().to_owned();
        let body = decode_text_response(&response.body, &content_type);
        tracing::debug!(
            url = url.as_str(),
            final_url = final_url.as_str(),
            redirects = fetched.redirects,
            status = response.status.as_u16(),
            content_type = content_type.as_str(),
            "frame document fetched"
        );

        Ok(LoadedDocument {
            url: final_url,
            status: response.status.as_u16(),
            content_type,
            body,
        })
    }
}

pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

fn decode_text_response(body: &[u8], content_type: &str) -> String {
    let encoding = detect_response_charset(body, content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    match encoding {
        Some(encoding) => encoding.decode(body).0.into_owned(),
        None => String::from_utf8_lossy(body).into_owned(),
    }
}

fn detect_response_charset(body: &[u8], content_type: &str) -> Option<String> {
    if is_html_content_type(content_type) {
        if let Some(meta_charset) = parse_charset_from_html_prefix(body) {
            return Some(meta_charset);
        }
    }

    parse_charset_from_content_type(content_type)
}

fn parse_charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|part| part.split_once('='))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').trim_matches('\''))
        .find(|label| !label.is_empty())
        .map(str::to_owned)
}

fn parse_charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&body[..body.len().min(8192)]);
    let lower = prefix.to_ascii_lowercase();
    let mut search_start = 0_usize;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let charset_start = search_start + relative + "charset=".len();
        if let Some(label) = parse_charset_label(&prefix[charset_start..]) {
            return Some(label);
        }
        search_start = charset_start;
    }

    None
}

fn parse_charset_label(input: &str) -> Option<String> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;

    let label = if first == '"' || first == '\'' {
        let rest = &trimmed[first.len_utf8()..];
        rest[..rest.find(first)?].trim()
    } else {
        let end = trimmed
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };

    (!label.is_empty()).then(|| label.to_owned())
}

#[cfg(test)]
mod tests {
    use super::DocumentLoader;
    use super::HttpDocumentLoader;
    use super::StaticSiteLoader;
    use super::decode_text_response;
    use super::parse_charset_from_content_type;
    use dp_core::NOT_FOUND_SENTINEL;
    use dp_net::NetConfig;
    use dp_net::NetStack;
    use std::io::Read;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use url::Url;

    fn url(raw: &str) -> Url {
        match Url::parse(raw) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn static_site_serves_index_for_directories() {
        let site = StaticSiteLoader::new()
            .with_page("/static/projects/p/1.0/index.html", "<title>Home</title>");
        let loaded = match site.load(&url("http://localhost:8080/static/projects/p/1.0/")) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(loaded.status, 200);
        assert!(loaded.is_html());
        assert_eq!(site.load_count(), 1);
    }

    #[test]
    fn static_site_answers_missing_pages_with_sentinel() {
        let site = StaticSiteLoader::new();
        let loaded = match site.load(&url("http://localhost:8080/static/projects/p/1.0/nope.html")) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(loaded.status, 404);
        assert_eq!(loaded.body, NOT_FOUND_SENTINEL);
        assert!(!loaded.is_html());
    }

    #[test]
    fn charset_from_header_and_meta() {
        assert_eq!(
            parse_charset_from_content_type("text/html; charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_owned())
        );
        assert_eq!(parse_charset_from_content_type("text/html"), None);

        let latin1 = b"<meta charset=iso-8859-1><p>caf\xe9</p>";
        assert!(decode_text_response(latin1, "text/html").contains("caf\u{e9}"));
        assert_eq!(decode_text_response(b"plain", ""), "plain");
    }

    #[test]
    fn http_loader_reports_the_url_it_was_redirected_to() {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let address = match listener.local_addr() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let body = "<html><head><title>API</title></head><body>ok</body></html>";
        let responses = [
            "HTTP/1.1 307 Temporary Redirect\r\nlocation: /static/projects/p/1.0/api/\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_owned(),
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: text/html; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            ),
        ];
        let server = thread::spawn(move || {
            let mut request_lines = Vec::new();
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return request_lines;
                };
                let mut request = Vec::new();
                let mut buffer = [0_u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    match stream.read(&mut buffer) {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buffer[..read]),
                    }
                }
                let text = String::from_utf8_lossy(&request).into_owned();
                request_lines.push(text.lines().next().unwrap_or_default().to_owned());
                let _ = stream.write_all(response.as_bytes());
            }
            request_lines
        });

        let net = match NetStack::new(NetConfig::default()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let loader = HttpDocumentLoader::new(net);
        let loaded = match loader.load(&url(&format!("http://{address}/static/projects/p/1.0/api#usage"))) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert_eq!(loaded.status, 200);
        assert!(loaded.is_html());
        assert_eq!(loaded.url.path(), "/static/projects/p/1.0/api/");
        assert_eq!(loaded.url.fragment(), Some("usage"));
        assert!(loaded.body.contains("<title>API</title>"));

        let request_lines = match server.join() {
            Ok(value) => value,
            Err(_) => panic!("server thread panicked"),
        };
        assert_eq!(
            request_lines,
            vec![
                "GET /static/projects/p/1.0/api HTTP/1.1".to_owned(),
                "GET /static/projects/p/1.0/api/ HTTP/1.1".to_owned(),
            ]
        );
    }
}
