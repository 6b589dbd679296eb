//! HTTP request and response types.

use crate::url::NetUrl;
use dp_core::PortalError;
use dp_core::PortalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

/// Header with a wire-safe name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: &str, value: &str) -> PortalResult<Self> {
        if name.is_empty() || !name.bytes().all(is_token_char) {
            return Err(PortalError::transport(
                "net.http.header_name_invalid",
                format!("invalid HTTP header name `{name}`"),
            ));
        }

        if value.bytes().any(|byte| matches!(byte, b'\r' | b'\n' | 0)) {
            return Err(PortalError::transport(
                "net.http.header_value_invalid",
                format!("invalid characters found in HTTP header `{name}`"),
            ));
        }

        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: NetUrl,
    pub headers: Vec<Header>,
}

impl HttpRequest {
    pub fn builder(method: HttpMethod, url: NetUrl) -> HttpRequestBuilder {
        HttpRequestBuilder {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn request_target(&self) -> String {
        self.url.path_and_query()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestBuilder {
    method: HttpMethod,
    url: NetUrl,
    headers: Vec<Header>,
}

impl HttpRequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> PortalResult<Self> {
        if find_header(&self.headers, name).is_some() {
            return Err(PortalError::transport(
                "net.http.duplicate_header",
                format!("header `{name}` must appear at most once"),
            ));
        }
        self.headers.push(Header::new(name, value)?);
        Ok(self)
    }

    pub fn build(mut self) -> PortalResult<HttpRequest> {
        if find_header(&self.headers, "host").is_none() {
            let host = self.url.authority();
            self.headers.insert(0, Header::new("Host", &host)?);
        }

        Ok(HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpStatusCode(u16);

impl HttpStatusCode {
    pub fn new(code: u16) -> PortalResult<Self> {
        if (100..=599).contains(&code) {
            return Ok(Self(code));
        }

        Err(PortalError::transport(
            "net.http.status_invalid",
            format!("status code must be 100-599, got `{code}`"),
        ))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        (200..=299).contains(&self.0)
    }

    pub fn is_redirect(self) -> bool {
        matches!(self.0, 301 | 302 | 303 | 307 | 308)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: HttpVersion,
    pub status: HttpStatusCode,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }
}

fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

fn is_token_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

#[cfg(test)]
mod tests {
    use super::Header;
    use super::HttpMethod;
    use super::HttpRequest;
    use super::HttpStatusCode;
    use crate::url::NetUrl;

    fn url(raw: &str) -> NetUrl {
        match NetUrl::parse(raw) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn host_header_carries_non_default_port() {
        let request = match HttpRequest::builder(HttpMethod::Get, url("http://localhost:8080/api/projects/")).build() {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(request.header("host"), Some("localhost:8080"));
        assert_eq!(request.request_target(), "/api/projects/");
    }

    #[test]
    fn duplicate_and_malformed_headers_are_rejected() {
        let builder = HttpRequest::builder(HttpMethod::Get, url("https://example.com/"));
        let duplicated = builder
            .header("Accept", "text/html")
            .and_then(|builder| builder.header("accept", "*/*"));
        assert!(duplicated.is_err());
        assert!(Header::new("Bad Name", "x").is_err());
        assert!(Header::new("X-Test", "a\r\nb").is_err());
    }

    #[test]
    fn status_code_range_is_enforced() {
        assert!(HttpStatusCode::new(404).is_ok_and(|code| !code.is_success()));
        assert!(HttpStatusCode::new(99).is_err());
        assert!(HttpStatusCode::new(600).is_err());
    }
}
