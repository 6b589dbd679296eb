//! Networking for the portal: URL parsing, HTTP/1.1 messages, and TLS policy.

pub mod client;
pub mod http;
pub mod tls;
pub mod tls_backend;
pub mod transport;
pub mod url;

use client::Http11Client;
use dp_core::PortalError;
use dp_core::PortalResult;
use http::HttpMethod;
use http::HttpRequest;
use std::time::Duration;
use tls::TlsPolicy;
use url::NetUrl;

pub use http::Header;
pub use http::HttpRequestBuilder;
pub use http::HttpResponse;
pub use http::HttpStatusCode;
pub use http::HttpVersion;
pub use tls::TlsVersion;
pub use tls::TrustStoreMode;
pub use url::Scheme;

const DEFAULT_USER_AGENT: &str = concat!("docportal/", env!("CARGO_PKG_VERSION"));
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_JSON: &str = "application/json";
pub const MAX_REDIRECTS: usize = 10;

/// Network settings shared by the API client and the document loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub trust_store_mode: TrustStoreMode,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(15),
            trust_store_mode: TrustStoreMode::WebPkiOnly,
        }
    }
}

/// A response together with the address it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub url: String,
    pub redirects: usize,
    pub response: HttpResponse,
}

/// Runtime network stack.
#[derive(Debug, Clone)]
pub struct NetStack {
    config: NetConfig,
    client: Http11Client,
}

impl NetStack {
    pub fn new(config: NetConfig) -> PortalResult<Self> {
        let policy = TlsPolicy::default().with_trust_store_mode(config.trust_store_mode);
        let client = Http11Client::new(policy, config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn prepare_get(&self, raw_url: &str, accept: &str) -> PortalResult<HttpRequest> {
        let url = NetUrl::parse(raw_url)?;
        HttpRequest::builder(HttpMethod::Get, url)
            .header("User-Agent", &self.config.user_agent)?
            .header("Accept", accept)?
            .header("Accept-Encoding", "gzip, deflate, br")?
            .header("Connection", "close")?
            .build()
    }

    /// Performs a GET and returns the response whatever its status.
    pub fn fetch(&self, raw_url: &str, accept: &str) -> PortalResult<HttpResponse> {
        let request = self.prepare_get(raw_url, accept)?;
        tracing::debug!(url = request.url.as_str(), "fetch");
        self.client.execute(&request)
    }

    /// Performs a GET, following up to [`MAX_REDIRECTS`] redirects.
    ///
    /// A redirect without a `Location` header is returned as is.
    pub fn fetch_following_redirects(
        &self,
        raw_url: &str,
        accept: &str,
    ) -> PortalResult<FetchedResponse> {
        let mut current_url = raw_url.to_owned();
        let mut redirects = 0_usize;

        loop {
            let response = self.fetch(&current_url, accept)?;
            if !response.status.is_redirect() {
                return Ok(FetchedResponse {
                    url: current_url,
                    redirects,
                    response,
                });
            }
            let Some(location) = response.header("location").map(str::to_owned) else {
                return Ok(FetchedResponse {
                    url: current_url,
                    redirects,
                    response,
                });
            };
            if redirects >= MAX_REDIRECTS {
                return Err(PortalError::transport(
                    "net.http.too_many_redirects",
                    format!("too many redirects (>{MAX_REDIRECTS}) while loading {raw_url}"),
                ));
            }

            let next = resolve_redirect_url(&current_url, &location)?;
            tracing::debug!(
                from = current_url.as_str(),
                to = next.as_str(),
                status = response.status.as_u16(),
                "following redirect"
            );
            current_url = next;
            redirects = redirects.saturating_add(1);
        }
    }
}

fn resolve_redirect_url(base_url: &str, location: &str) -> PortalResult<String> {
    let joined = NetUrl::parse(base_url)?
        .as_url()
        .join(location.trim())
        .map_err(|error| {
            PortalError::transport(
                "net.http.redirect_invalid",
                format!("invalid redirect target `{location}`: {error}"),
            )
        })?;
    Ok(NetUrl::from_url(joined)?.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::ACCEPT_HTML;
    use super::ACCEPT_JSON;
    use super::MAX_REDIRECTS;
    use super::NetConfig;
    use super::NetStack;
    use super::resolve_redirect_url;
    use std::io::Read;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Serves one scripted response per connection and returns the base URL.
    fn serve(responses: Vec<String>) -> String {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let address = match listener.local_addr() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request = Vec::new();
                let mut buffer = [0_u8; 1024];
                while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                    match stream.read(&mut buffer) {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buffer[..read]),
                    }
                }
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{address}")
    }

    fn redirect(location: &str) -> String {
        format!(
            "HTTP/1.1 307 Temporary Redirect\r\nlocation: {location}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        )
    }

    fn page(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn stack() -> NetStack {
        match NetStack::new(NetConfig::default()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn prepares_get_with_accept_and_close() {
        let request = match stack().prepare_get("http://localhost:8080/api/project/", ACCEPT_JSON) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert_eq!(request.header("accept"), Some(ACCEPT_JSON));
        assert_eq!(request.header("connection"), Some("close"));
        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert!(request.header("user-agent").is_some_and(|ua| ua.starts_with("docportal/")));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(stack().prepare_get("ftp://example.com/", ACCEPT_JSON).is_err());
    }

    #[test]
    fn follows_relative_redirect_to_final_url() {
        let base = serve(vec![
            redirect("/static/projects/p/1.0/api/"),
            page("<title>API</title>"),
        ]);
        let fetched = match stack()
            .fetch_following_redirects(&format!("{base}/static/projects/p/1.0/api"), ACCEPT_HTML)
        {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert_eq!(fetched.response.status.as_u16(), 200);
        assert_eq!(fetched.redirects, 1);
        assert_eq!(fetched.url, format!("{base}/static/projects/p/1.0/api/"));
        assert_eq!(fetched.response.body, b"<title>API</title>");
    }

    #[test]
    fn redirect_loops_are_capped() {
        let responses = (0..=MAX_REDIRECTS).map(|_| redirect("/loop")).collect();
        let base = serve(responses);
        match stack().fetch_following_redirects(&format!("{base}/loop"), ACCEPT_HTML) {
            Err(error) => assert_eq!(error.code(), "net.http.too_many_redirects"),
            Ok(fetched) => panic!("unexpected {:?}", fetched.url),
        }
    }

    #[test]
    fn redirect_targets_resolve_against_current_url() {
        let resolved = match resolve_redirect_url("http://docs.test/static/projects/p/1.0/api", "api/") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(resolved, "http://docs.test/static/projects/p/1.0/api/");
        assert!(resolve_redirect_url("http://docs.test/", "mailto:x@docs.test").is_err());
    }
}
