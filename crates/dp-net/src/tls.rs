//! TLS policy for portal requests.

use crate::url::NetUrl;
use crate::url::Scheme;
use dp_core::PortalError;
use dp_core::PortalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_2,
    V1_3,
}

/// Which trust anchors verify server certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustStoreMode {
    /// Embedded Mozilla roots only.
    #[default]
    WebPkiOnly,
    /// Embedded roots plus the operating system store, for portals behind
    /// an internal CA.
    WebPkiAndOs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsHandshakeConfig {
    pub server_name: String,
    pub minimum_version: TlsVersion,
    pub maximum_version: TlsVersion,
    pub alpn_protocols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    pub minimum_version: TlsVersion,
    pub maximum_version: TlsVersion,
    pub trust_store_mode: TrustStoreMode,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            minimum_version: TlsVersion::V1_2,
            maximum_version: TlsVersion::V1_3,
            trust_store_mode: TrustStoreMode::WebPkiOnly,
        }
    }
}

impl TlsPolicy {
    pub fn with_trust_store_mode(mut self, mode: TrustStoreMode) -> Self {
        self.trust_store_mode = mode;
        self
    }

    pub fn validate(&self) -> PortalResult<()> {
        if self.minimum_version > self.maximum_version {
            return Err(PortalError::transport(
                "net.tls.invalid_version_range",
                "minimum TLS version cannot be greater than maximum version",
            ));
        }
        Ok(())
    }

    /// Handshake parameters for `https` URLs, `None` for plain `http`.
    pub fn handshake_config_for(&self, url: &NetUrl) -> PortalResult<Option<TlsHandshakeConfig>> {
        self.validate()?;

        match url.scheme() {
            Scheme::Http => Ok(None),
            Scheme::Https => Ok(Some(TlsHandshakeConfig {
                server_name: url.host().to_owned(),
                minimum_version: self.minimum_version,
                maximum_version: self.maximum_version,
                alpn_protocols: vec!["http/1.1".to_owned()],
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TlsPolicy;
    use super::TlsVersion;
    use super::TrustStoreMode;
    use crate::url::NetUrl;

    fn url(raw: &str) -> NetUrl {
        match NetUrl::parse(raw) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn handshake_only_for_https() {
        let policy = TlsPolicy::default();
        assert_eq!(policy.handshake_config_for(&url("http://localhost:8080/")), Ok(None));
        match policy.handshake_config_for(&url("https://docs.example.com/")) {
            Ok(Some(handshake)) => assert_eq!(handshake.server_name, "docs.example.com"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inverted_version_range_is_rejected() {
        let policy = TlsPolicy {
            minimum_version: TlsVersion::V1_3,
            maximum_version: TlsVersion::V1_2,
            ..TlsPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn trust_store_mode_can_be_overridden() {
        let policy = TlsPolicy::default().with_trust_store_mode(TrustStoreMode::WebPkiAndOs);
        assert_eq!(policy.trust_store_mode, TrustStoreMode::WebPkiAndOs);
    }
}
