//! URLs accepted by the network layer.

use dp_core::PortalError;
use dp_core::PortalResult;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Absolute `http(s)` URL with a host, stripped of its fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetUrl {
    parsed: Url,
    scheme: Scheme,
    host: String,
    port: u16,
}

impl NetUrl {
    pub fn parse(input: &str) -> PortalResult<Self> {
        let parsed = Url::parse(input).map_err(|error| {
            PortalError::transport(
                "net.url.invalid",
                format!("failed to parse URL `{input}`: {error}"),
            )
        })?;
        Self::from_url(parsed)
    }

    pub fn from_url(mut parsed: Url) -> PortalResult<Self> {
        if parsed.cannot_be_a_base() {
            return Err(PortalError::transport(
                "net.url.invalid_base",
                format!("`{parsed}` cannot be fetched"),
            ));
        }

        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(PortalError::transport(
                    "net.url.scheme_unsupported",
                    format!("unsupported scheme `{other}`"),
                ));
            }
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| PortalError::transport("net.url.host_missing", "URL must include a host"))?
            .to_ascii_lowercase();
        let port = parsed.port_or_known_default().unwrap_or(scheme.default_port());

        parsed.set_fragment(None);

        Ok(Self {
            parsed,
            scheme,
            host,
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        self.parsed.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.parsed
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }

    /// `host[:port]`, with the port omitted when it is the scheme default.
    pub fn authority(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn path_and_query(&self) -> String {
        let path = match self.parsed.path() {
            "" => "/",
            path => path,
        };
        match self.parsed.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NetUrl;

    #[test]
    fn strips_fragment_and_keeps_query() {
        let url = match NetUrl::parse("http://Docs.Example.com:8080/static/projects/p/1.0/?q=1#x") {
            Ok(url) => url,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(url.host(), "docs.example.com");
        assert_eq!(url.port(), 8080);
        assert_eq!(url.authority(), "docs.example.com:8080");
        assert_eq!(url.path_and_query(), "/static/projects/p/1.0/?q=1");
        assert!(!url.as_str().contains('#'));
    }

    #[test]
    fn rejects_non_http_schemes() {
        match NetUrl::parse("mailto:docs@example.com") {
            Err(error) => assert_eq!(error.code(), "net.url.invalid_base"),
            Ok(url) => panic!("accepted {url:?}"),
        }
        match NetUrl::parse("ftp://example.com/file") {
            Err(error) => assert_eq!(error.code(), "net.url.scheme_unsupported"),
            Ok(url) => panic!("accepted {url:?}"),
        }
    }
}
