//! rustls upgrade of a connected TCP stream.

use crate::tls::TlsHandshakeConfig;
use crate::tls::TlsPolicy;
use crate::transport::BoxedIoStream;
use dp_core::PortalError;
use dp_core::PortalResult;
use std::net::TcpStream;

#[cfg(feature = "tls-rustls")]
use crate::tls::TlsVersion;
#[cfg(feature = "tls-rustls")]
use crate::tls::TrustStoreMode;
#[cfg(feature = "tls-rustls")]
use rustls::RootCertStore;
#[cfg(feature = "tls-rustls")]
use rustls::SupportedProtocolVersion;
#[cfg(feature = "tls-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "tls-rustls")]
use std::sync::Arc;

#[cfg(feature = "tls-rustls")]
pub fn connect_tls(
    mut stream: TcpStream,
    handshake: &TlsHandshakeConfig,
    policy: &TlsPolicy,
) -> PortalResult<BoxedIoStream> {
    use rustls::ClientConfig;
    use rustls::ClientConnection;
    use rustls::StreamOwned;

    let versions = supported_versions(handshake.minimum_version, handshake.maximum_version)?;
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&versions)
        .map_err(|error| {
            PortalError::transport(
                "net.tls.config_versions_invalid",
                format!("failed to configure TLS protocol versions: {error}"),
            )
        })?
        .with_root_certificates(root_store(policy)?)
        .with_no_client_auth();
    config.alpn_protocols = handshake
        .alpn_protocols
        .iter()
        .map(|value| value.as_bytes().to_vec())
        .collect();

    let server_name = ServerName::try_from(handshake.server_name.clone()).map_err(|error| {
        PortalError::transport(
            "net.tls.server_name_invalid",
            format!("invalid TLS server name `{}`: {error}", handshake.server_name),
        )
    })?;

    let mut connection = ClientConnection::new(Arc::new(config), server_name).map_err(|error| {
        PortalError::transport(
            "net.tls.connection_init_failed",
            format!(
                "failed to initialize TLS connection for `{}`: {error}",
                handshake.server_name
            ),
        )
    })?;

    connection.complete_io(&mut stream).map_err(|error| {
        PortalError::transport(
            "net.tls.handshake_failed",
            format!("TLS handshake failed for `{}`: {error}", handshake.server_name),
        )
    })?;

    Ok(Box::new(StreamOwned::new(connection, stream)))
}

#[cfg(feature = "tls-rustls")]
fn root_store(policy: &TlsPolicy) -> PortalResult<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if matches!(policy.trust_store_mode, TrustStoreMode::WebPkiAndOs) {
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            tracing::warn!(%error, "operating-system root could not be loaded");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        tracing::debug!(added, ignored, "merged operating-system roots");
    }

    if roots.is_empty() {
        return Err(PortalError::transport(
            "net.tls.root_store_empty",
            "no trust anchors available for TLS verification",
        ));
    }

    Ok(roots)
}

#[cfg(feature = "tls-rustls")]
fn supported_versions(
    minimum: TlsVersion,
    maximum: TlsVersion,
) -> PortalResult<Vec<&'static SupportedProtocolVersion>> {
    let versions: Vec<&'static SupportedProtocolVersion> = [TlsVersion::V1_3, TlsVersion::V1_2]
        .into_iter()
        .filter(|version| *version >= minimum && *version <= maximum)
        .map(|version| match version {
            TlsVersion::V1_2 => &rustls::version::TLS12,
            TlsVersion::V1_3 => &rustls::version::TLS13,
        })
        .collect();

    if versions.is_empty() {
        return Err(PortalError::transport(
            "net.tls.version_set_empty",
            "no supported TLS versions match the requested policy",
        ));
    }

    Ok(versions)
}

#[cfg(not(feature = "tls-rustls"))]
pub fn connect_tls(
    _stream: TcpStream,
    _handshake: &TlsHandshakeConfig,
    _policy: &TlsPolicy,
) -> PortalResult<BoxedIoStream> {
    Err(PortalError::transport(
        "net.tls.backend_unavailable",
        "rustls backend is disabled for this build; enable `dp-net/tls-rustls`",
    ))
}
